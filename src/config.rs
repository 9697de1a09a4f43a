// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO PIPELINE, FETCHER E LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Configurações do pipeline de pesquisa, do leitor de páginas e do provedor
// de completions. Todas as configurações podem ser definidas via .env
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::str::FromStr;
use std::time::Duration;

/// Configuração do pipeline (orquestrador).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Máximo de resultados pedidos ao provedor de busca por rodada
    pub max_results: usize,
    /// Máximo de rodadas de busca
    pub max_iterations: usize,
    /// Temperatura da geração do relatório
    pub temperature: f32,
    /// Quantidade de queries pedidas ao planejador
    pub planned_queries: usize,
    /// Acima deste número de palavras o conteúdo é resumido
    pub summarize_threshold_words: usize,
    /// Limite de palavras pedido ao resumidor
    pub summary_max_words: usize,
    /// Orçamento de palavras do contexto de evidências
    pub context_word_budget: usize,
    /// Tokens máximos da geração final
    pub generation_max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            max_iterations: 3,
            temperature: 0.6,
            planned_queries: 3,
            summarize_threshold_words: 400,
            summary_max_words: 250,
            context_word_budget: 3000,
            generation_max_tokens: 2048,
        }
    }
}

/// Configuração do leitor de conteúdo (ContentFetcher).
#[derive(Debug, Clone, PartialEq)]
pub struct FetcherConfig {
    /// Caracteres máximos do conteúdo devolvido (antes do "...")
    pub max_content_length: usize,
    /// Timeout de cada requisição
    pub request_timeout: Duration,
    /// Tentativas de rede por URL
    pub retry_attempts: u32,
    /// Mínimo de caracteres para o conteúdo ser considerado útil
    pub min_content_quality: usize,
    /// Intervalo do atraso de cortesia antes de cada tentativa
    pub politeness_delay: (Duration, Duration),
    /// Unidade do backoff linear (`unit × tentativa`)
    pub backoff_unit: Duration,
    /// Leituras simultâneas dentro de uma rodada
    pub fetch_concurrency: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_content_length: 2000,
            request_timeout: Duration::from_secs(5),
            retry_attempts: 2,
            min_content_quality: 100,
            politeness_delay: (Duration::from_secs(1), Duration::from_secs(3)),
            backoff_unit: Duration::from_millis(500),
            fetch_concurrency: 3,
        }
    }
}

impl FetcherConfig {
    /// Configuração sem atrasos, útil em testes.
    pub fn without_delays() -> Self {
        Self {
            politeness_delay: (Duration::ZERO, Duration::ZERO),
            backoff_unit: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Configuração do provedor de completions (API compatível com OpenAI).
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    /// URL base da API (ex: llama.cpp server, Ollama, OpenAI)
    pub api_base_url: String,
    /// Modelo usado em todas as chamadas
    pub model: String,
    /// Chave da API (opcional para servidores locais)
    pub api_key: Option<String>,
    /// Janela de contexto do modelo, em tokens
    pub n_ctx: usize,
    /// Timeout das chamadas não-streaming
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/v1".to_string(),
            model: "jan-v1-4b".to_string(),
            api_key: None,
            n_ctx: 8192,
            request_timeout: Duration::from_secs(120),
        }
    }
}

// Não vaza a chave em logs
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("n_ctx", &self.n_ctx)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Configuração completa da aplicação
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Pipeline
    pub pipeline: PipelineConfig,
    /// Fetcher
    pub fetcher: FetcherConfig,
    /// LLM
    pub llm: LlmConfig,
}

/// Lê e faz parse de uma variável; valores inválidos são ignorados com log.
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            log::info!("📦 {}={}", name, raw.trim());
            Some(value)
        }
        Err(_) => {
            log::warn!("⚠️ Valor inválido para {}: {:?} (mantendo padrão)", name, raw);
            None
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Carrega configuração do pipeline a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `JANDIVE_MAX_RESULTS` (padrão: 5)
/// - `JANDIVE_MAX_ITERATIONS` (padrão: 3)
/// - `JANDIVE_TEMPERATURE` (padrão: 0.6)
/// - `JANDIVE_CONTEXT_WORD_BUDGET` (padrão: 3000)
pub fn load_pipeline_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();

    if let Some(v) = env_parse::<usize>("JANDIVE_MAX_RESULTS").filter(|v| *v > 0) {
        config.max_results = v;
    }
    if let Some(v) = env_parse::<usize>("JANDIVE_MAX_ITERATIONS") {
        config.max_iterations = v;
    }
    if let Some(v) = env_parse::<f32>("JANDIVE_TEMPERATURE").filter(|v| (0.0..=2.0).contains(v)) {
        config.temperature = v;
    }
    if let Some(v) = env_parse::<usize>("JANDIVE_CONTEXT_WORD_BUDGET").filter(|v| *v > 0) {
        config.context_word_budget = v;
    }

    config
}

/// Carrega configuração do fetcher a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `JANDIVE_MAX_CONTENT_LENGTH` (padrão: 2000 caracteres)
/// - `JANDIVE_REQUEST_TIMEOUT` (padrão: 5 segundos)
/// - `JANDIVE_RETRY_ATTEMPTS` (padrão: 2)
/// - `JANDIVE_MIN_CONTENT_QUALITY` (padrão: 100 caracteres)
/// - `JANDIVE_FETCH_CONCURRENCY` (padrão: 3)
pub fn load_fetcher_config() -> FetcherConfig {
    let mut config = FetcherConfig::default();

    if let Some(v) = env_parse::<usize>("JANDIVE_MAX_CONTENT_LENGTH").filter(|v| *v > 0) {
        config.max_content_length = v;
    }
    if let Some(v) = env_parse::<u64>("JANDIVE_REQUEST_TIMEOUT").filter(|v| *v > 0) {
        config.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = env_parse::<u32>("JANDIVE_RETRY_ATTEMPTS").filter(|v| *v > 0) {
        config.retry_attempts = v;
    }
    if let Some(v) = env_parse::<usize>("JANDIVE_MIN_CONTENT_QUALITY") {
        config.min_content_quality = v;
    }
    if let Some(v) = env_parse::<usize>("JANDIVE_FETCH_CONCURRENCY").filter(|v| *v > 0) {
        config.fetch_concurrency = v;
    }

    config
}

/// Carrega configuração do LLM a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `LLM_API_BASE_URL` (padrão: `http://localhost:8080/v1`)
/// - `LLM_MODEL` (padrão: `jan-v1-4b`)
/// - `LLM_API_KEY` ou `OPENAI_API_KEY` (opcional)
/// - `LLM_N_CTX` (padrão: 8192)
pub fn load_llm_config() -> LlmConfig {
    let mut config = LlmConfig::default();

    if let Some(v) = env_string("LLM_API_BASE_URL") {
        config.api_base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = env_string("LLM_MODEL") {
        config.model = v;
    }
    config.api_key = env_string("LLM_API_KEY").or_else(|| env_string("OPENAI_API_KEY"));
    if let Some(v) = env_parse::<usize>("LLM_N_CTX").filter(|v| *v > 0) {
        config.n_ctx = v;
    }

    log::info!("🔧 LLM: {} @ {} (n_ctx={})", config.model, config.api_base_url, config.n_ctx);
    config
}

/// Carrega toda a configuração da aplicação.
pub fn load_app_config() -> AppConfig {
    AppConfig {
        pipeline: load_pipeline_config(),
        fetcher: load_fetcher_config(),
        llm: load_llm_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.max_iterations, 3);
        assert!((config.temperature - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.summarize_threshold_words, 400);
        assert_eq!(config.context_word_budget, 3000);
        assert_eq!(config.generation_max_tokens, 2048);
    }

    #[test]
    fn test_fetcher_config_default() {
        let config = FetcherConfig::default();
        assert_eq!(config.max_content_length, 2000);
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.min_content_quality, 100);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.politeness_delay,
            (Duration::from_secs(1), Duration::from_secs(3))
        );
    }

    #[test]
    fn test_without_delays() {
        let config = FetcherConfig::without_delays();
        assert_eq!(config.politeness_delay, (Duration::ZERO, Duration::ZERO));
        assert_eq!(config.backoff_unit, Duration::ZERO);
        assert_eq!(config.max_content_length, 2000);
    }

    #[test]
    fn test_llm_config_debug_hides_key() {
        let config = LlmConfig {
            api_key: Some("sk-secret".into()),
            ..LlmConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert_eq!(config.n_ctx, 8192);
    }

    #[test]
    fn test_env_parse_ignores_invalid() {
        std::env::set_var("JANDIVE_TEST_INVALID_NUMBER", "abc");
        assert_eq!(env_parse::<usize>("JANDIVE_TEST_INVALID_NUMBER"), None);
        std::env::set_var("JANDIVE_TEST_VALID_NUMBER", " 7 ");
        assert_eq!(env_parse::<usize>("JANDIVE_TEST_VALID_NUMBER"), Some(7));
    }
}
