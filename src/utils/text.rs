// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TEXT UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Utilitários para processamento de texto:
// - Truncation
// - Whitespace
// - Token estimation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Estimativa de tokens por caractere
const CHARS_PER_TOKEN: f32 = 4.0;

/// Marcador anexado a textos truncados
pub const ELLIPSIS: &str = "...";

/// Estima número de tokens em um texto
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() as f32 / CHARS_PER_TOKEN).ceil() as usize
}

/// Colapsa qualquer sequência de whitespace em um espaço e apara as bordas
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Conta palavras em um texto
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Primeiros `max_chars` caracteres (não bytes) do texto.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Trunca para `max_chars` caracteres, anexando [`ELLIPSIS`] se algo foi cortado.
///
/// O resultado tem no máximo `max_chars + ELLIPSIS.len()` caracteres.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let head = take_chars(text, max_chars);
    if head.len() < text.len() {
        format!("{}{}", head, ELLIPSIS)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        let text = "Hello world"; // 11 chars ≈ 3 tokens
        assert!(estimate_tokens(text) >= 2 && estimate_tokens(text) <= 4);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("Hello world test"), 3);
        assert_eq!(word_count("  multiple   spaces  "), 2);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
        assert_eq!(truncate_with_ellipsis("", 3), "");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "ação çé";
        let truncated = truncate_with_ellipsis(text, 4);
        assert_eq!(truncated, "ação...");
        assert!(truncated.chars().count() <= 4 + ELLIPSIS.len());
    }
}
