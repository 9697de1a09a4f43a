// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ORQUESTRADOR DO PIPELINE DE PESQUISA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// plan → rodadas de busca (filtrar/resumir) → checagem de orçamento → geração
//
// O estado da busca (URLs vistas, fontes, contexto) pertence só ao
// orquestrador e congela antes da geração. O relatório sai em streaming,
// cada fragmento acompanhado do snapshot das fontes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod context;
mod progress;
pub mod prompts;
mod state;

pub use context::{EvidenceContext, ResearchLedger};
pub use progress::{channel_stage_sink, noop_stage_sink, RecordingSink, StageSink};
pub use prompts::{MODEL_LOAD_FAILURE_MESSAGE, NO_INFORMATION_MESSAGE};
pub use state::{PipelineStage, SearchLoopEnd};

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::fetcher::ContentFetcher;
use crate::llm::{ChatMessage, LlmError, ProviderHandle, TextStream};
use crate::search::SearchProvider;
use crate::tools::{
    evaluate, is_arithmetic_expression, PlannedQuerySet, QueryPlanner, RoundOutcome,
    SearchRoundExecutor, Summarizer,
};
use crate::types::{ConversationTurn, DetailLevel, SourceList};
use crate::utils::{estimate_tokens, word_count};

/// Erros que chegam ao consumidor do pipeline
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// Provedor de completions não carregou
    #[error("Failed to load language model: {0}")]
    ModelLoad(LlmError),

    /// Falha de rede durante a geração
    #[error("Network error during generation: {0}")]
    Network(String),

    /// Outra falha do provedor durante a geração
    #[error("Generation failed: {0}")]
    Generation(LlmError),
}

impl PipelineError {
    /// Se é falha de rede (mensagem específica no chamador)
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Network(msg) => Self::Network(msg),
            other => Self::Generation(other),
        }
    }
}

/// Fragmento do relatório + fontes congeladas
#[derive(Debug, Clone, PartialEq)]
pub struct ReportChunk {
    /// Texto incremental
    pub text: String,
    /// Fontes citáveis (índice + 1 = `[Source N]`)
    pub sources: Arc<SourceList>,
}

/// Sequência de fragmentos do relatório
pub type ReportStream = Pin<Box<dyn Stream<Item = Result<ReportChunk, PipelineError>> + Send>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PEDIDO E EXECUÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pedido de pesquisa
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    /// Pergunta original
    pub query: String,
    /// Modo offline (só calculadora)
    pub offline: bool,
    /// Nível de detalhe do relatório
    pub detail_level: DetailLevel,
    /// Turnos anteriores da conversa
    pub history: Vec<ConversationTurn>,
    /// Sobrescreve a temperatura configurada
    pub temperature: Option<f32>,
    /// Sobrescreve o limite de iterações
    pub max_iterations: Option<usize>,
    /// Sinal de cancelamento externo
    pub cancel: CancellationToken,
}

impl ResearchRequest {
    /// Pedido com valores padrão
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            offline: false,
            detail_level: DetailLevel::Standard,
            history: Vec::new(),
            temperature: None,
            max_iterations: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Define modo offline
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Define nível de detalhe
    pub fn detail_level(mut self, detail: DetailLevel) -> Self {
        self.detail_level = detail;
        self
    }

    /// Define histórico da conversa
    pub fn history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    /// Define temperatura
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Define limite de iterações
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Usa um token de cancelamento existente
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Resultado de uma execução
pub struct ResearchRun {
    /// Id da execução (aparece nos logs)
    pub run_id: Uuid,
    /// Fontes acumuladas (parciais se cancelado)
    pub sources: Arc<SourceList>,
    /// Motivo do fim do loop de busca (None se não houve busca)
    pub search_end: Option<SearchLoopEnd>,
    /// Falha fatal antes da geração (a mensagem fixa sai no stream)
    pub failure: Option<PipelineError>,
    /// Relatório em streaming
    pub stream: ReportStream,
}

impl ResearchRun {
    fn message(
        run_id: Uuid,
        text: impl Into<String>,
        search_end: Option<SearchLoopEnd>,
        failure: Option<PipelineError>,
    ) -> Self {
        let sources = Arc::new(SourceList::new());
        let chunk = ReportChunk {
            text: text.into(),
            sources: sources.clone(),
        };
        Self {
            run_id,
            sources,
            search_end,
            failure,
            stream: Box::pin(futures::stream::iter(vec![Ok(chunk)])),
        }
    }

    fn silent(run_id: Uuid, sources: SourceList, search_end: Option<SearchLoopEnd>) -> Self {
        Self {
            run_id,
            sources: Arc::new(sources),
            search_end,
            failure: None,
            stream: Box::pin(futures::stream::empty()),
        }
    }

    /// Consome o stream e devolve o texto completo
    pub async fn collect_report(self) -> Result<String, PipelineError> {
        let mut report = String::new();
        let mut stream = self.stream;
        while let Some(chunk) = stream.next().await {
            report.push_str(&chunk?.text);
        }
        Ok(report)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ORQUESTRADOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct StageTracker {
    current: PipelineStage,
    sink: StageSink,
    run_id: Uuid,
}

impl StageTracker {
    fn new(sink: StageSink, run_id: Uuid) -> Self {
        sink(PipelineStage::Initializing);
        Self {
            current: PipelineStage::Initializing,
            sink,
            run_id,
        }
    }

    fn enter(&mut self, next: PipelineStage) {
        if next == self.current {
            return;
        }
        if !self.current.can_transition_to(next) {
            log::warn!(
                "⚠️ [{}] Transição inválida {} → {}",
                self.run_id,
                self.current,
                next
            );
            return;
        }
        log::debug!("[{}] {} → {}", self.run_id, self.current, next);
        self.current = next;
        (self.sink)(next);
    }
}

/// Orquestrador do pipeline de pesquisa
pub struct ResearchPipeline {
    config: PipelineConfig,
    llm: ProviderHandle,
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<ContentFetcher>,
    sink: StageSink,
    n_ctx: Option<usize>,
}

impl ResearchPipeline {
    /// Cria pipeline com os provedores injetados
    pub fn new(
        config: PipelineConfig,
        llm: ProviderHandle,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<ContentFetcher>,
    ) -> Self {
        Self {
            config,
            llm,
            search,
            fetcher,
            sink: noop_stage_sink(),
            n_ctx: None,
        }
    }

    /// Define o callback de progresso
    pub fn with_stage_sink(mut self, sink: StageSink) -> Self {
        self.sink = sink;
        self
    }

    /// Ativa o aviso de janela de contexto
    pub fn with_context_window(mut self, n_ctx: usize) -> Self {
        self.n_ctx = Some(n_ctx);
        self
    }

    /// Configuração em uso
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executa a pesquisa até o início da geração.
    ///
    /// Planejamento e busca acontecem aqui; o relatório é produzido pelo
    /// stream devolvido em [`ResearchRun::stream`].
    pub async fn run(&self, request: ResearchRequest) -> ResearchRun {
        let run_id = Uuid::new_v4();
        let cancel = request.cancel.clone();
        let mut stage = StageTracker::new(self.sink.clone(), run_id);

        let max_iterations = request.max_iterations.unwrap_or(self.config.max_iterations);
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        log::info!(
            "🚀 [{}] Pesquisa: \"{}\" (max_iterations={}, temperature={})",
            run_id,
            request.query,
            max_iterations,
            temperature
        );

        if cancel.is_cancelled() {
            stage.enter(PipelineStage::Done);
            return ResearchRun::silent(run_id, SourceList::new(), None);
        }

        stage.enter(PipelineStage::LoadingModel);
        let llm = match self.llm.acquire().await {
            Ok(llm) => llm,
            Err(err) => {
                log::error!("❌ [{}] Falha ao carregar o modelo: {}", run_id, err);
                stage.enter(PipelineStage::Error);
                return ResearchRun::message(
                    run_id,
                    MODEL_LOAD_FAILURE_MESSAGE,
                    None,
                    Some(PipelineError::ModelLoad(err)),
                );
            }
        };

        if request.offline || is_arithmetic_expression(&request.query) {
            log::info!("🧮 [{}] Usando calculadora: {}", run_id, request.query);
            let answer = match evaluate(request.query.trim()) {
                Ok(value) => value.to_string(),
                Err(err) => err.to_string(),
            };
            stage.enter(PipelineStage::Done);
            return ResearchRun::message(run_id, answer, None, None);
        }

        if cancel.is_cancelled() {
            stage.enter(PipelineStage::Done);
            return ResearchRun::silent(run_id, SourceList::new(), Some(SearchLoopEnd::Cancelled));
        }

        stage.enter(PipelineStage::Planning);
        let planned = QueryPlanner::new(llm.clone())
            .plan(&request.query, self.config.planned_queries)
            .await;

        let summarizer = Summarizer::new(llm.clone());
        let (ledger, end) = self
            .search_phase(run_id, &planned, max_iterations, &summarizer, &cancel, &mut stage)
            .await;

        log::info!(
            "🔚 [{}] Loop de busca encerrado: {} ({} fontes, {} palavras)",
            run_id,
            end,
            ledger.sources().len(),
            ledger.context().word_count()
        );

        if end == SearchLoopEnd::Cancelled || cancel.is_cancelled() {
            stage.enter(PipelineStage::Done);
            let (sources, _) = ledger.into_parts();
            return ResearchRun::silent(run_id, sources, Some(SearchLoopEnd::Cancelled));
        }

        if ledger.sources().is_empty() {
            stage.enter(PipelineStage::Done);
            return ResearchRun::message(run_id, NO_INFORMATION_MESSAGE, Some(end), None);
        }

        stage.enter(PipelineStage::Generating);
        let (sources, context) = ledger.into_parts();
        let sources = Arc::new(sources);
        let messages = prompts::report_messages(
            &request.query,
            &context.render(),
            &request.history,
            request.detail_level,
        );
        self.check_context_window(run_id, &messages);

        let stream: ReportStream = match llm
            .stream_chat(&messages, self.config.generation_max_tokens, temperature)
            .await
        {
            Ok(text) => generation_stream(text, sources.clone(), cancel, self.sink.clone(), run_id),
            Err(err) => {
                log::error!("❌ [{}] Falha ao iniciar a geração: {}", run_id, err);
                stage.enter(PipelineStage::Error);
                Box::pin(futures::stream::iter(vec![Err(PipelineError::from(err))]))
            }
        };

        ResearchRun {
            run_id,
            sources,
            search_end: Some(end),
            failure: None,
            stream,
        }
    }

    async fn search_phase(
        &self,
        run_id: Uuid,
        planned: &PlannedQuerySet,
        max_iterations: usize,
        summarizer: &Summarizer,
        cancel: &CancellationToken,
        stage: &mut StageTracker,
    ) -> (ResearchLedger, SearchLoopEnd) {
        let executor = SearchRoundExecutor::new(self.search.clone(), self.fetcher.clone());
        let mut ledger = ResearchLedger::new();

        let mut end = if planned.len() > max_iterations {
            SearchLoopEnd::IterationCap
        } else {
            SearchLoopEnd::QueriesExhausted
        };

        'rounds: for (round, search_query) in planned.iter().take(max_iterations).enumerate() {
            if cancel.is_cancelled() {
                end = SearchLoopEnd::Cancelled;
                break;
            }

            stage.enter(PipelineStage::Searching);
            log::info!("🔍 [{}] Rodada {}: \"{}\"", run_id, round + 1, search_query);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = executor.search(search_query, self.config.max_results, ledger.seen()) => Some(outcome),
            };

            let results = match outcome {
                // Cancelado durante a rodada: resultados descartados
                None => {
                    end = SearchLoopEnd::Cancelled;
                    break;
                }
                Some(_) if cancel.is_cancelled() => {
                    log::info!("⏹️ [{}] Cancelado na rodada {}", run_id, round + 1);
                    end = SearchLoopEnd::Cancelled;
                    break;
                }
                Some(RoundOutcome::ProviderFailed(err)) => {
                    log::warn!("⚠️ [{}] Busca falhou na rodada {}: {}", run_id, round + 1, err);
                    end = SearchLoopEnd::ProviderError;
                    break;
                }
                Some(RoundOutcome::NoMatches) => {
                    log::warn!("⚠️ [{}] Nenhum resultado na rodada {}", run_id, round + 1);
                    end = SearchLoopEnd::NoMatches;
                    break;
                }
                Some(RoundOutcome::Results(results)) => results,
            };

            let new_results: Vec<_> = results
                .into_iter()
                .filter(|r| !ledger.contains(&r.url))
                .collect();
            if new_results.is_empty() {
                log::info!("📭 [{}] Nenhum resultado novo, encerrando busca", run_id);
                end = SearchLoopEnd::Converged;
                break;
            }

            stage.enter(PipelineStage::Processing);
            for result in new_results {
                if ledger.contains(&result.url) {
                    continue;
                }

                let mut evidence = result.evidence_text().to_string();
                if word_count(&evidence) > self.config.summarize_threshold_words {
                    if cancel.is_cancelled() {
                        end = SearchLoopEnd::Cancelled;
                        break 'rounds;
                    }
                    log::info!("✂️ [{}] Resumindo {} ({} palavras)", run_id, result.url, word_count(&evidence));
                    evidence = summarizer
                        .summarize(&evidence, self.config.summary_max_words)
                        .await;
                }

                let citation = ledger.admit(result, &evidence);
                log::debug!("📎 [{}] Fonte {} adicionada", run_id, citation);
            }

            if ledger.context().word_count() > self.config.context_word_budget {
                log::warn!(
                    "⚠️ [{}] Contexto grande ({} palavras), indo para o relatório",
                    run_id,
                    ledger.context().word_count()
                );
                end = SearchLoopEnd::BudgetExceeded;
                break;
            }
        }

        (ledger, end)
    }

    fn check_context_window(&self, run_id: Uuid, messages: &[ChatMessage]) {
        let Some(n_ctx) = self.n_ctx else {
            return;
        };
        let prompt_tokens: usize = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        let needed = prompt_tokens + self.config.generation_max_tokens as usize;
        if needed > n_ctx {
            log::warn!(
                "⚠️ [{}] Prompt (~{} tokens) + geração ({}) excede n_ctx={}",
                run_id,
                prompt_tokens,
                self.config.generation_max_tokens,
                n_ctx
            );
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STREAM DE GERAÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct GenerationState {
    text: TextStream,
    sources: Arc<SourceList>,
    cancel: CancellationToken,
    sink: StageSink,
    run_id: Uuid,
    finished: bool,
}

enum GenerationStep {
    Cancelled,
    Next(Option<Result<String, LlmError>>),
}

fn generation_stream(
    text: TextStream,
    sources: Arc<SourceList>,
    cancel: CancellationToken,
    sink: StageSink,
    run_id: Uuid,
) -> ReportStream {
    let state = GenerationState {
        text,
        sources,
        cancel,
        sink,
        run_id,
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            let step = tokio::select! {
                biased;
                _ = state.cancel.cancelled() => GenerationStep::Cancelled,
                item = state.text.next() => GenerationStep::Next(item),
            };

            match step {
                GenerationStep::Cancelled => {
                    log::info!("⏹️ [{}] Geração cancelada", state.run_id);
                    (state.sink)(PipelineStage::Done);
                    return None;
                }
                GenerationStep::Next(Some(Ok(fragment))) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    let chunk = ReportChunk {
                        text: fragment,
                        sources: state.sources.clone(),
                    };
                    return Some((Ok(chunk), state));
                }
                GenerationStep::Next(Some(Err(err))) => {
                    log::error!("❌ [{}] Falha durante a geração: {}", state.run_id, err);
                    (state.sink)(PipelineStage::Error);
                    state.finished = true;
                    return Some((Err(PipelineError::from(err)), state));
                }
                GenerationStep::Next(None) => {
                    log::info!("✅ [{}] Relatório concluído", state.run_id);
                    (state.sink)(PipelineStage::Done);
                    return None;
                }
            }
        }
    }))
}
