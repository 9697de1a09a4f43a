// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONTENT FETCHER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Leitura de páginas com:
// - Portão de segurança (sem rede para URLs inseguras)
// - robots.txt por origem (fail-open, com cache)
// - Atraso de cortesia + user-agent aleatório
// - Retry com backoff linear para timeout/transporte/5xx
// - Extração do conteúdo principal e portão de qualidade
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod extract;
mod http;
mod quality;
mod robots;
mod safety;

pub use extract::{extract_main_text, CONTENT_SELECTORS, STRIPPED_ELEMENTS};
pub use http::{HttpError, HttpFetch, HttpResponse, MockHttpClient, RecordedRequest, ReqwestHttpClient};
pub use quality::{check_quality, QualityIssue, BOILERPLATE_PHRASES};
pub use robots::{RobotsPolicy, RobotsSource};
pub use safety::is_safe_url;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::FetcherConfig;
use crate::utils::truncate_with_ellipsis;

/// Identidades de navegador usadas nas leituras
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

/// Escolhe um user-agent aleatório
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Motivo de rejeição sem leitura
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Esquema não-HTTP(S) ou host privado
    UnsafeUrl,
    /// Bloqueado pelo robots.txt
    RobotsDisallowed,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsafeUrl => write!(f, "unsafe URL"),
            Self::RobotsDisallowed => write!(f, "robots disallowed"),
        }
    }
}

/// Resultado de uma leitura
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Texto principal (já truncado)
    Content(String),
    /// Rejeitada antes da leitura
    Rejected(RejectReason),
    /// Texto curto demais ou boilerplate
    LowQuality,
    /// Falha de rede/status após as tentativas
    Unavailable,
}

impl FetchOutcome {
    /// Conteúdo, se houver
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Content(text) => Some(text),
            _ => None,
        }
    }
}

/// Leitor de conteúdo de páginas web
pub struct ContentFetcher {
    config: FetcherConfig,
    http: Arc<dyn HttpFetch>,
    robots: Arc<dyn RobotsSource>,
    // None = robots indisponível (liberado)
    robots_cache: Mutex<HashMap<String, Option<RobotsPolicy>>>,
}

impl ContentFetcher {
    /// Cria leitor com clientes injetados
    pub fn new(
        config: FetcherConfig,
        http: Arc<dyn HttpFetch>,
        robots: Arc<dyn RobotsSource>,
    ) -> Self {
        Self {
            config,
            http,
            robots,
            robots_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Cria leitor usando reqwest para páginas e robots.txt
    pub fn with_reqwest(config: FetcherConfig) -> Result<Self, HttpError> {
        let client = Arc::new(ReqwestHttpClient::new()?);
        Ok(Self::new(config, client.clone(), client))
    }

    /// Configuração em uso
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Lê uma URL e devolve o texto principal.
    ///
    /// Nunca falha: problemas viram `Rejected`, `LowQuality` ou `Unavailable`.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        if !is_safe_url(url) {
            log::warn!("🚫 URL insegura rejeitada: {}", url);
            return FetchOutcome::Rejected(RejectReason::UnsafeUrl);
        }

        let user_agent = random_user_agent();

        if !self.robots_allowed(url, user_agent).await {
            log::info!("🤖 Bloqueada pelo robots.txt: {}", url);
            return FetchOutcome::Rejected(RejectReason::RobotsDisallowed);
        }

        let attempts = self.config.retry_attempts.max(1);
        let headers = [
            ("User-Agent", user_agent),
            ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            ("Accept-Language", "en-US,en;q=0.5"),
        ];

        for attempt in 0..attempts {
            self.politeness_pause().await;

            let failure = match self
                .http
                .get(url, self.config.request_timeout, &headers)
                .await
            {
                Ok(response) if response.is_success() => {
                    return self.process_page(url, &response.body);
                }
                Ok(response) if response.status >= 500 => HttpError::Status(response.status),
                Ok(response) => {
                    log::warn!("⚠️ HTTP {} em {}", response.status, url);
                    return FetchOutcome::Unavailable;
                }
                Err(err) if err.is_retryable() => err,
                Err(err) => {
                    log::warn!("⚠️ Falha ao ler {}: {}", url, err);
                    return FetchOutcome::Unavailable;
                }
            };

            if attempt + 1 < attempts {
                let backoff = self.config.backoff_unit * (attempt + 1);
                log::info!(
                    "🔄 Tentativa {}/{} falhou para {} ({}), aguardando {:?}",
                    attempt + 1,
                    attempts,
                    url,
                    failure,
                    backoff
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            } else {
                log::warn!("⚠️ Desistindo de {} após {} tentativas: {}", url, attempts, failure);
            }
        }

        FetchOutcome::Unavailable
    }

    /// Lê várias URLs com concorrência limitada, preservando a ordem de entrada.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FetchOutcome> {
        let concurrency = self.config.fetch_concurrency.max(1);
        stream::iter(urls.iter())
            .map(|url| self.fetch(url))
            .buffered(concurrency)
            .collect()
            .await
    }

    fn process_page(&self, url: &str, html: &str) -> FetchOutcome {
        let text = extract_main_text(html);

        if let Err(issue) = check_quality(&text, self.config.min_content_quality) {
            log::info!("📉 Conteúdo de baixa qualidade em {}: {:?}", url, issue);
            return FetchOutcome::LowQuality;
        }

        log::debug!("📄 {} caracteres extraídos de {}", text.chars().count(), url);
        FetchOutcome::Content(truncate_with_ellipsis(&text, self.config.max_content_length))
    }

    async fn politeness_pause(&self) {
        let delay = {
            let (min, max) = self.config.politeness_delay;
            if max <= min {
                min
            } else {
                rand::thread_rng().gen_range(min..=max)
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn robots_allowed(&self, url: &str, user_agent: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return true;
        };
        let origin = parsed.origin().ascii_serialization();
        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };

        let cached = self
            .robots_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&origin).cloned());

        let policy = match cached {
            Some(policy) => policy,
            None => {
                let robots_url = format!("{}/robots.txt", origin);
                let policy = match self
                    .robots
                    .get_robots(&robots_url, user_agent, self.robots_timeout())
                    .await
                {
                    Ok(policy) => Some(policy),
                    Err(err) => {
                        log::warn!("⚠️ robots.txt indisponível em {} ({}), seguindo", robots_url, err);
                        None
                    }
                };
                if let Ok(mut cache) = self.robots_cache.lock() {
                    cache.insert(origin, policy.clone());
                }
                policy
            }
        };

        policy
            .map(|p| p.is_allowed(user_agent, &path))
            .unwrap_or(true)
    }

    fn robots_timeout(&self) -> Duration {
        self.config.request_timeout
    }
}
