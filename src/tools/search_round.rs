//! # Search Round Executor
//!
//! Uma rodada de busca: consulta o provedor, descarta URLs inseguras ou já
//! vistas, lê o conteúdo de cada candidato restante e monta os
//! [`SearchResult`] na ordem do provedor.

use std::collections::HashSet;
use std::sync::Arc;

use crate::fetcher::{is_safe_url, ContentFetcher, FetchOutcome};
use crate::search::{SearchError, SearchProvider};
use crate::types::SearchResult;

/// Resultado de uma rodada
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Resultados (possivelmente vazio se tudo já foi visto ou é inseguro)
    Results(Vec<SearchResult>),
    /// O provedor não encontrou nada
    NoMatches,
    /// O provedor falhou
    ProviderFailed(SearchError),
}

/// Executor de rodadas de busca
pub struct SearchRoundExecutor {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<ContentFetcher>,
}

impl SearchRoundExecutor {
    /// Cria executor com provedor de busca e leitor injetados
    pub fn new(search: Arc<dyn SearchProvider>, fetcher: Arc<ContentFetcher>) -> Self {
        Self { search, fetcher }
    }

    /// Executa uma rodada. Nunca falha: erros do provedor viram `ProviderFailed`.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        already_seen: &HashSet<String>,
    ) -> RoundOutcome {
        let hits = match self.search.search(query, max_results).await {
            Ok(hits) => hits,
            Err(err) => {
                log::warn!("⚠️ Provedor de busca falhou para \"{}\": {}", query, err);
                return RoundOutcome::ProviderFailed(err);
            }
        };

        if hits.is_empty() {
            log::info!("🔍 Nenhum resultado para \"{}\"", query);
            return RoundOutcome::NoMatches;
        }

        let mut round_urls = HashSet::new();
        let candidates: Vec<_> = hits
            .into_iter()
            .filter(|hit| {
                if !is_safe_url(&hit.url) {
                    log::warn!("🚫 Resultado inseguro ignorado: {}", hit.url);
                    return false;
                }
                !already_seen.contains(&hit.url) && round_urls.insert(hit.url.clone())
            })
            .take(max_results)
            .collect();

        let urls: Vec<String> = candidates.iter().map(|hit| hit.url.clone()).collect();
        let outcomes = self.fetcher.fetch_all(&urls).await;

        let results = candidates
            .into_iter()
            .zip(outcomes)
            .map(|(hit, outcome)| {
                let content = match outcome {
                    FetchOutcome::Content(text) => Some(text),
                    FetchOutcome::Rejected(reason) => {
                        log::info!("↩️ {} rejeitada ({}), usando snippet", hit.url, reason);
                        None
                    }
                    FetchOutcome::LowQuality | FetchOutcome::Unavailable => {
                        log::info!("↩️ {} sem conteúdo útil ({:?}), usando snippet", hit.url, outcome);
                        None
                    }
                };
                SearchResult {
                    title: hit.title,
                    url: hit.url,
                    snippet: hit.snippet,
                    content,
                }
            })
            .collect();

        RoundOutcome::Results(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetcherConfig;
    use crate::fetcher::MockHttpClient;
    use crate::search::{MockSearchClient, SearchHit};

    const PAGE: &str = "<html><body><article>Tokio is an asynchronous runtime for Rust. It provides the building blocks for writing network applications with reliability and speed.</article></body></html>";

    fn executor(search: MockSearchClient, http: MockHttpClient) -> (SearchRoundExecutor, Arc<MockHttpClient>) {
        let http = Arc::new(http);
        let fetcher = Arc::new(ContentFetcher::new(
            FetcherConfig::without_delays(),
            http.clone(),
            http.clone(),
        ));
        (SearchRoundExecutor::new(Arc::new(search), fetcher), http)
    }

    #[tokio::test]
    async fn test_results_in_provider_order_with_snippet_fallback() {
        let search = MockSearchClient::new().with_response(
            "tokio",
            vec![
                SearchHit::new("Tokio", "https://tokio.example.com/", "snippet one"),
                SearchHit::new("Down", "https://down.example.com/", "snippet two"),
            ],
        );
        let http = MockHttpClient::new().with_page("https://tokio.example.com/", PAGE);
        let (executor, _) = executor(search, http);

        let RoundOutcome::Results(results) = executor.search("tokio", 5, &HashSet::new()).await else {
            panic!("esperava resultados");
        };
        assert_eq!(results.len(), 2);
        assert!(results[0].content.as_deref().unwrap().starts_with("Tokio is"));
        assert_eq!(results[1].content, None);
        assert_eq!(results[1].evidence_text(), "snippet two");
    }

    #[tokio::test]
    async fn test_seen_unsafe_and_duplicate_urls_are_skipped_before_fetch() {
        let search = MockSearchClient::new().with_response(
            "q",
            vec![
                SearchHit::new("Seen", "https://seen.example.com/", "s"),
                SearchHit::new("Private", "http://10.0.0.5/", "s"),
                SearchHit::new("New", "https://new.example.com/", "s"),
                SearchHit::new("New again", "https://new.example.com/", "s"),
            ],
        );
        let http = MockHttpClient::new().with_page("https://new.example.com/", PAGE);
        let (executor, http) = executor(search, http);

        let seen: HashSet<String> = ["https://seen.example.com/".to_string()].into_iter().collect();
        let RoundOutcome::Results(results) = executor.search("q", 5, &seen).await else {
            panic!("esperava resultados");
        };

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://new.example.com/");
        assert_eq!(http.requested_urls(), vec!["https://new.example.com/"]);
    }

    #[tokio::test]
    async fn test_no_matches_and_provider_failure() {
        let search = MockSearchClient::new()
            .with_failure("broken", SearchError::RateLimitError);
        let (executor, _) = executor(search, MockHttpClient::new());

        assert_eq!(
            executor.search("nothing", 5, &HashSet::new()).await,
            RoundOutcome::NoMatches
        );
        assert!(matches!(
            executor.search("broken", 5, &HashSet::new()).await,
            RoundOutcome::ProviderFailed(SearchError::RateLimitError)
        ));
    }
}
