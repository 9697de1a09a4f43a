// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PORTÃO DE QUALIDADE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Frases típicas de banners, rodapés e telas de login
pub const BOILERPLATE_PHRASES: &[&str] = &[
    "cookie policy",
    "terms of service",
    "privacy policy",
    "all rights reserved",
    "sign up",
    "log in",
    "subscribe",
];

/// Motivo de reprovação no portão de qualidade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityIssue {
    /// Menos caracteres que o mínimo
    TooShort(usize),
    /// Contém frase de boilerplate
    Boilerplate(&'static str),
}

/// Verifica o texto extraído; `Ok(())` quando é utilizável.
pub fn check_quality(text: &str, min_chars: usize) -> Result<(), QualityIssue> {
    let length = text.chars().count();
    if length < min_chars {
        return Err(QualityIssue::TooShort(length));
    }

    let lowered = text.to_lowercase();
    match BOILERPLATE_PHRASES
        .iter()
        .find(|phrase| lowered.contains(*phrase))
    {
        Some(phrase) => Err(QualityIssue::Boilerplate(phrase)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_fails() {
        assert_eq!(check_quality("short", 100), Err(QualityIssue::TooShort(5)));
    }

    #[test]
    fn test_boilerplate_fails_case_insensitive() {
        let text = format!("{} Please SUBSCRIBE to continue.", "word ".repeat(30));
        assert_eq!(
            check_quality(&text, 100),
            Err(QualityIssue::Boilerplate("subscribe"))
        );
    }

    #[test]
    fn test_good_text_passes() {
        let text = "Rust is a systems programming language focused on safety. ".repeat(3);
        assert_eq!(check_quality(&text, 100), Ok(()));
    }
}
