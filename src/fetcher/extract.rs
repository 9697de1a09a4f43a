// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EXTRAÇÃO DO CONTEÚDO PRINCIPAL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Ignora marcação que não é conteúdo (script, style, nav, footer, aside,
// header, noscript), escolhe a primeira região principal por seletor e
// devolve o texto com whitespace normalizado.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::utils::normalize_whitespace;

/// Elementos descartados antes da extração
pub const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "footer", "aside", "header", "noscript",
];

/// Seletores de conteúdo principal, em ordem de preferência
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    ".post-content",
    ".entry-content",
    ".td-post-content",
    ".single-post-content",
    ".article-body",
    "[role=\"main\"]",
    "#main",
    "#content",
    "body",
];

static SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("seletor de conteúdo é válido"))
        .collect()
});

fn is_stripped(element: &ElementRef<'_>) -> bool {
    STRIPPED_ELEMENTS.contains(&element.value().name())
}

fn inside_stripped(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_stripped(&ancestor))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_stripped(&child_el) {
                        collect_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Extrai o texto principal de um documento HTML.
///
/// Retorna string vazia quando nada é encontrado.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let region = SELECTORS.iter().find_map(|selector| {
        document
            .select(selector)
            .find(|candidate| !is_stripped(candidate) && !inside_stripped(candidate))
    });

    let mut text = String::new();
    match region {
        Some(element) => collect_text(element, &mut text),
        None => collect_text(document.root_element(), &mut text),
    }

    normalize_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article() {
        let html = r#"
            <html><body>
              <header>Site header</header>
              <nav><a href="/">Home</a></nav>
              <article><h1>Title</h1><p>Main   body
                 text.</p><script>var x = 1;</script></article>
              <footer>Footer</footer>
            </body></html>
        "#;
        assert_eq!(extract_main_text(html), "Title Main body text.");
    }

    #[test]
    fn test_selector_order() {
        let html = r#"<html><body>
            <div id="content">generic</div>
            <div class="entry-content">entry</div>
        </body></html>"#;
        assert_eq!(extract_main_text(html), "entry");
    }

    #[test]
    fn test_role_main() {
        let html = r#"<html><body><div>menu</div><div role="main">the content</div></body></html>"#;
        assert_eq!(extract_main_text(html), "the content");
    }

    #[test]
    fn test_falls_back_to_body_without_stripped_markup() {
        let html = r#"<html><head><style>p{}</style></head><body>
            <aside>related</aside><p>Only paragraph</p><noscript>enable js</noscript>
        </body></html>"#;
        assert_eq!(extract_main_text(html), "Only paragraph");
    }

    #[test]
    fn test_article_inside_nav_is_ignored() {
        let html = r#"<html><body>
            <nav><article>teaser</article></nav>
            <main>real content</main>
        </body></html>"#;
        assert_eq!(extract_main_text(html), "real content");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract_main_text(""), "");
    }
}
