//! # JanDive - Assistente de Pesquisa em Rust
//!
//! Este crate implementa um pipeline de pesquisa: dada uma pergunta em
//! linguagem natural, planeja algumas queries de busca, lê e filtra
//! conteúdo da web, comprime trechos longos, monta um contexto de
//! evidências limitado e gera em streaming um relatório com citações
//! `[Source N]`.
//!
//! ## Fluxo
//!
//! ```text
//! initializing → loading_model → planning → searching ⇄ processing → generating → done
//! ```
//!
//! 1. **Planejamento** (`tools::planner`): o modelo sugere queries diversas;
//!    a pergunta original é sempre a primeira
//! 2. **Busca** (`tools::search_round`): cada rodada consulta o provedor e lê
//!    as páginas com o [`fetcher::ContentFetcher`]
//! 3. **Leitura segura** (`fetcher`): portão de segurança, robots.txt,
//!    atraso de cortesia, retry com backoff e portão de qualidade
//! 4. **Resumo** (`tools::summarizer`): conteúdos com mais de 400 palavras
//!    são resumidos
//! 5. **Geração** (`pipeline`): relatório em streaming com as fontes
//!    congeladas
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use jandive::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_app_config();
//!     let llm = ProviderHandle::Deferred(Arc::new(OpenAiLoader::new(config.llm.clone())));
//!     let fetcher = Arc::new(ContentFetcher::with_reqwest(config.fetcher.clone())?);
//!     let pipeline = ResearchPipeline::new(
//!         config.pipeline.clone(),
//!         llm,
//!         Arc::new(DuckDuckGoClient::new()?),
//!         fetcher,
//!     );
//!
//!     let run = pipeline.run(ResearchRequest::new("impacto do Rust em sistemas embarcados")).await;
//!     println!("{}", run.collect_report().await?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tipos fundamentais compartilhados por todo o sistema.
///
/// - [`SearchResult`]: resultado de busca com conteúdo lido
/// - [`SourceList`]: fontes citáveis, somente-anexação
/// - [`DetailLevel`]: nível de detalhe do relatório
/// - [`ConversationTurn`]: turno anterior da conversa
pub mod types;

/// Configuração do pipeline, do leitor de páginas e do provedor de completions.
pub mod config;

/// Provedores de completion (Large Language Models).
///
/// Define a trait `CompletionProvider` e implementações para:
/// - APIs compatíveis com OpenAI (llama.cpp server, Ollama, OpenAI)
/// - Mock para testes
pub mod llm;

/// Provedores de busca web.
///
/// Define a trait `SearchProvider` e implementações para:
/// - DuckDuckGo (HTML, sem API key)
/// - Mock para testes
pub mod search;

/// Leitura segura de páginas web.
///
/// Portão de segurança, robots.txt, retry/backoff, extração do conteúdo
/// principal e portão de qualidade.
pub mod fetcher;

/// Ferramentas chamadas pelo orquestrador (planner, summarizer, rodada de
/// busca, calculadora).
pub mod tools;

/// Orquestrador do pipeline de pesquisa e streaming do relatório.
pub mod pipeline;

/// Utilitários de texto.
pub mod utils;

// Re-exports principais
pub use config::{
    load_app_config, load_fetcher_config, load_llm_config, load_pipeline_config, AppConfig,
    FetcherConfig, LlmConfig, PipelineConfig,
};
pub use fetcher::{ContentFetcher, FetchOutcome};
pub use pipeline::{
    PipelineError, PipelineStage, ReportChunk, ResearchPipeline, ResearchRequest, ResearchRun,
    SearchLoopEnd,
};
pub use types::*;

/// Versão do crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com os tipos mais usados
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::{load_app_config, AppConfig, FetcherConfig, LlmConfig, PipelineConfig};
    pub use crate::fetcher::{ContentFetcher, FetchOutcome, MockHttpClient};
    pub use crate::llm::{
        CompletionProvider, LlmError, MockLlmClient, OpenAiClient, OpenAiLoader, ProviderHandle,
    };
    pub use crate::pipeline::{
        channel_stage_sink, PipelineError, PipelineStage, ReportChunk, ResearchPipeline,
        ResearchRequest, ResearchRun, SearchLoopEnd, StageSink,
    };
    pub use crate::search::{DuckDuckGoClient, MockSearchClient, SearchHit, SearchProvider};
    pub use crate::types::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
