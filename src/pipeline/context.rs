// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONTEXTO DE EVIDÊNCIAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Blocos numerados por citação, só crescem. Junto com o conjunto de URLs
// vistas e a lista de fontes forma o estado de uma execução.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;

use crate::types::{SearchResult, SourceList};
use crate::utils::word_count;

/// Contexto de evidências enviado ao modelo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceContext {
    blocks: Vec<String>,
    words: usize,
}

impl EvidenceContext {
    /// Contexto vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Formata um bloco `Source N`
    pub fn format_block(citation: usize, result: &SearchResult, content: &str) -> String {
        format!(
            "Source {}: {}\nTitle: {}\nContent: {}\n---",
            citation,
            result.url,
            result.display_title(),
            content
        )
    }

    /// Anexa o bloco de uma fonte
    pub fn push(&mut self, citation: usize, result: &SearchResult, content: &str) {
        let block = Self::format_block(citation, result, content);
        self.words += word_count(&block);
        self.blocks.push(block);
    }

    /// Palavras acumuladas
    pub fn word_count(&self) -> usize {
        self.words
    }

    /// Quantidade de blocos
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Se não há blocos
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocos em ordem de citação
    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// Texto completo do contexto
    pub fn render(&self) -> String {
        self.blocks.join("\n")
    }
}

/// Estado acumulado durante a fase de busca
#[derive(Debug, Default)]
pub struct ResearchLedger {
    seen: HashSet<String>,
    sources: SourceList,
    context: EvidenceContext,
}

impl ResearchLedger {
    /// Estado vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs já incorporadas
    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Se a URL já foi incorporada
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Registra uma fonte nova e seu bloco de evidência; retorna a citação.
    ///
    /// Chamador garante que a URL ainda não foi vista.
    pub fn admit(&mut self, result: SearchResult, evidence: &str) -> usize {
        self.seen.insert(result.url.clone());
        let citation = self.sources.push(result);
        if let Some(source) = self.sources.get(citation) {
            self.context.push(citation, source, evidence);
        }
        citation
    }

    /// Fontes em ordem de citação
    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    /// Contexto de evidências
    pub fn context(&self) -> &EvidenceContext {
        &self.context
    }

    /// Congela o estado para a geração
    pub fn into_parts(self) -> (SourceList, EvidenceContext) {
        (self.sources, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, title: Option<&str>) -> SearchResult {
        SearchResult {
            title: title.map(String::from),
            url: url.into(),
            snippet: None,
            content: None,
        }
    }

    #[test]
    fn test_block_format() {
        let block = EvidenceContext::format_block(2, &result("https://a.com", None), "text here");
        assert_eq!(block, "Source 2: https://a.com\nTitle: N/A\nContent: text here\n---");
    }

    #[test]
    fn test_ledger_assigns_citations_and_grows_context() {
        let mut ledger = ResearchLedger::new();
        assert_eq!(ledger.admit(result("https://a.com", Some("A")), "alpha beta"), 1);
        assert_eq!(ledger.admit(result("https://b.com", Some("B")), "gamma"), 2);

        assert!(ledger.contains("https://a.com"));
        assert_eq!(ledger.sources().citation_of("https://b.com"), Some(2));
        assert_eq!(ledger.context().len(), 2);
        assert!(ledger.context().render().contains("Source 2: https://b.com\nTitle: B"));
        // "Source 1: url" + "Title: A" + "Content: alpha beta" + "---"
        assert_eq!(ledger.context().blocks()[0].split_whitespace().count(), 9);
        assert_eq!(ledger.context().word_count(), 9 + 8);
    }
}
