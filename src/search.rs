// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE DE BUSCA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para o provedor de busca web.
// O provedor só devolve candidatos (título, URL, snippet); a leitura das
// páginas é feita pelo ContentFetcher.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

/// Erros do cliente de busca
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Erro retornado pelo provedor
    #[error("Search API error: {0}")]
    ApiError(String),

    /// Limite de requisições
    #[error("Rate limit exceeded")]
    RateLimitError,

    /// Falha de rede
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Query vazia ou inválida
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Candidato devolvido pelo provedor de busca
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Título do resultado
    pub title: Option<String>,
    /// URL do resultado
    pub url: String,
    /// Descrição/snippet
    pub snippet: Option<String>,
}

impl SearchHit {
    /// Cria um candidato com todos os campos
    pub fn new(title: &str, url: &str, snippet: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            url: url.to_string(),
            snippet: Some(snippet.to_string()),
        }
    }
}

/// Trait principal para provedores de busca
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Busca até `max_results` candidatos, na ordem de relevância do provedor
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO DUCKDUCKGO (HTML)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente para a versão HTML do DuckDuckGo (sem API key)
pub struct DuckDuckGoClient {
    endpoint: String,
    client: reqwest::Client,
}

impl DuckDuckGoClient {
    /// Cria cliente apontando para `html.duckduckgo.com`
    pub fn new() -> Result<Self, SearchError> {
        Self::with_endpoint("https://html.duckduckgo.com/html/")
    }

    /// Cria cliente com endpoint customizado
    pub fn with_endpoint(endpoint: &str) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36")
            .build()
            .map_err(|e| SearchError::ApiError(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("empty query".into()));
        }

        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));
        log::info!("🔍 Buscando: \"{}\"", query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 202 {
            // DDG responde 202 com captcha quando limita
            return Err(SearchError::RateLimitError);
        }
        if !status.is_success() {
            return Err(SearchError::ApiError(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let hits = parse_duckduckgo_html(&body, max_results);
        log::info!("🔍 \"{}\" → {} resultados", query, hits.len());
        Ok(hits)
    }
}

/// Extrai resultados orgânicos da página HTML do DuckDuckGo.
pub fn parse_duckduckgo_html(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result:not(.result--ad)"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(resolve_result_url) else {
            continue;
        };

        let title = collapse(link.text().collect::<String>());
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| collapse(s.text().collect::<String>()))
            .filter(|s| !s.is_empty());

        hits.push(SearchHit {
            title: Some(title).filter(|t| !t.is_empty()),
            url,
            snippet,
        });

        if hits.len() >= max_results {
            break;
        }
    }
    hits
}

fn collapse(text: String) -> String {
    crate::utils::normalize_whitespace(&text)
}

/// Resolve links de redirecionamento do DDG (`/l/?uddg=<url>`)
fn resolve_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = url::Url::parse(&absolute).ok()?;
    let is_redirect = parsed
        .host_str()
        .map(|h| h.ends_with("duckduckgo.com"))
        .unwrap_or(false)
        && parsed.path().starts_with("/l/");

    if is_redirect {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
    } else {
        Some(parsed.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente mock: respostas por query e registro das queries recebidas
#[derive(Debug, Default)]
pub struct MockSearchClient {
    responses: HashMap<String, Result<Vec<SearchHit>, SearchError>>,
    fallback: Option<Result<Vec<SearchHit>, SearchError>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchClient {
    /// Mock sem respostas (toda query devolve lista vazia)
    pub fn new() -> Self {
        Self::default()
    }

    /// Resposta para uma query específica
    pub fn with_response(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.responses.insert(query.to_string(), Ok(hits));
        self
    }

    /// Falha para uma query específica
    pub fn with_failure(mut self, query: &str, error: SearchError) -> Self {
        self.responses.insert(query.to_string(), Err(error));
        self
    }

    /// Resposta para qualquer query não mapeada
    pub fn with_fallback(mut self, result: Result<Vec<SearchHit>, SearchError>) -> Self {
        self.fallback = Some(result);
        self
    }

    /// Queries recebidas, em ordem
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for MockSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }

        let result = self
            .responses
            .get(query)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));

        result.map(|hits| hits.into_iter().take(max_results).collect())
    }
}
