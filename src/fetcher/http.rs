// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE HTTP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait de GET usado pelo ContentFetcher, implementação reqwest e mock
// roteirizável para testes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::robots::{RobotsPolicy, RobotsSource};

/// Erros de transporte HTTP
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// Timeout da requisição
    #[error("Request timed out")]
    Timeout,

    /// Falha genérica de conexão/transporte
    #[error("Transport error: {0}")]
    Transport(String),

    /// Status HTTP não aceito
    #[error("HTTP status {0}")]
    Status(u16),

    /// URL mal formada
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl HttpError {
    /// Se vale a pena tentar de novo (timeout, transporte, 5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            Self::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Resposta HTTP (status + corpo já decodificado)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Código de status
    pub status: u16,
    /// Corpo em texto
    pub body: String,
}

impl HttpResponse {
    /// Resposta 200 com o corpo dado
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Resposta com status arbitrário e corpo vazio
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    /// Se o status é 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET com timeout e headers
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Executa o GET; status não-2xx não é erro
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO REQWEST
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente HTTP real baseado em reqwest
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Cria cliente (segue redirects, sem cookies)
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl RobotsSource for ReqwestHttpClient {
    async fn get_robots(
        &self,
        robots_url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<RobotsPolicy, HttpError> {
        let response = self
            .get(robots_url, timeout, &[("User-Agent", user_agent)])
            .await?;
        RobotsPolicy::from_response(response.status, &response.body)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type Scripted = Result<HttpResponse, HttpError>;

/// Requisição registrada pelo mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// URL requisitada
    pub url: String,
    /// User-Agent enviado
    pub user_agent: Option<String>,
}

/// Cliente HTTP mock.
///
/// Cada URL tem uma fila de respostas; a última se repete. URLs sem roteiro
/// devolvem erro de transporte. robots.txt sem roteiro libera tudo.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    pages: Mutex<HashMap<String, VecDeque<Scripted>>>,
    robots: HashMap<String, Result<RobotsPolicy, HttpError>>,
    requests: Mutex<Vec<RecordedRequest>>,
    robots_requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    /// Mock vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Página HTML com status 200
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.with_responses(url, vec![Ok(HttpResponse::ok(html))])
    }

    /// Sequência de respostas para uma URL
    pub fn with_responses(self, url: &str, responses: Vec<Scripted>) -> Self {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), responses.into());
        }
        self
    }

    /// robots.txt (conteúdo) para a URL `.../robots.txt`
    pub fn with_robots(mut self, robots_url: &str, text: &str) -> Self {
        self.robots
            .insert(robots_url.to_string(), Ok(RobotsPolicy::parse(text)));
        self
    }

    /// Falha ao buscar robots.txt
    pub fn with_robots_error(mut self, robots_url: &str, error: HttpError) -> Self {
        self.robots.insert(robots_url.to_string(), Err(error));
        self
    }

    /// GETs de página recebidos, em ordem
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// URLs de página requisitadas, em ordem
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Buscas de robots.txt recebidas, em ordem
    pub fn robots_requests(&self) -> Vec<RecordedRequest> {
        self.robots_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_response(&self, url: &str) -> Scripted {
        let Ok(mut pages) = self.pages.lock() else {
            return Err(HttpError::Transport("mock poisoned".into()));
        };
        match pages.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::Transport("empty script".into()))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(HttpError::Transport("empty script".into()))),
            None => Err(HttpError::Transport(format!("no route for {}", url))),
        }
    }
}

fn header_value(headers: &[(&str, &str)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.to_string())
}

#[async_trait]
impl HttpFetch for MockHttpClient {
    async fn get(
        &self,
        url: &str,
        _timeout: Duration,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                url: url.to_string(),
                user_agent: header_value(headers, "user-agent"),
            });
        }
        self.next_response(url)
    }
}

#[async_trait]
impl RobotsSource for MockHttpClient {
    async fn get_robots(
        &self,
        robots_url: &str,
        user_agent: &str,
        _timeout: Duration,
    ) -> Result<RobotsPolicy, HttpError> {
        if let Ok(mut requests) = self.robots_requests.lock() {
            requests.push(RecordedRequest {
                url: robots_url.to_string(),
                user_agent: Some(user_agent.to_string()),
            });
        }
        self.robots
            .get(robots_url)
            .cloned()
            .unwrap_or_else(|| Ok(RobotsPolicy::allow_all()))
    }
}
