// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROVEDOR DE COMPLETIONS (LLM)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para interação com modelos de linguagem.
// Qualquer servidor com API compatível com OpenAI serve: llama.cpp server,
// Ollama, vLLM ou a própria OpenAI.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Erros do provedor de completions
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// Provedor não pôde ser inicializado
    #[error("Provider load failed: {0}")]
    Load(String),

    /// Erro retornado pela API
    #[error("API error: {0}")]
    Api(String),

    /// Limite de requisições
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Falha de transporte (conexão, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Resposta em formato inesperado
    #[error("Invalid response format: {0}")]
    Parse(String),
}

impl LlmError {
    /// Se a falha é de rede (o chamador pode exibir mensagem específica)
    pub fn is_network(&self) -> bool {
        matches!(self, LlmError::Network(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            LlmError::Network(err.to_string())
        } else if err.is_decode() {
            LlmError::Parse(err.to_string())
        } else {
            LlmError::Api(err.to_string())
        }
    }
}

/// Papel de uma mensagem de chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instrução de sistema
    System,
    /// Mensagem do usuário
    User,
    /// Resposta do modelo
    Assistant,
}

/// Mensagem de chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Papel
    pub role: ChatRole,
    /// Conteúdo
    pub content: String,
}

impl ChatMessage {
    /// Mensagem de sistema
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Mensagem do usuário
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Pedido de completion de texto simples
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Prompt completo
    pub prompt: String,
    /// Tokens máximos gerados
    pub max_tokens: u32,
    /// Temperatura
    pub temperature: f32,
    /// Sequências de parada
    pub stop: Vec<String>,
}

/// Sequência preguiçosa de fragmentos de texto, consumida uma única vez.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Trait principal para provedores de completion
///
/// Define as duas operações usadas pelo pipeline: completion simples
/// (planejamento e resumo) e chat em streaming (relatório final).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Completion de texto simples
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Chat em streaming; cada item é um fragmento incremental de conteúdo
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<TextStream, LlmError>;
}

/// Inicializa (carrega) um provedor sob demanda.
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    /// Carrega o provedor; falha aqui é fatal para a execução
    async fn load(&self) -> Result<Arc<dyn CompletionProvider>, LlmError>;
}

/// Provedor já pronto ou carregado na primeira execução.
#[derive(Clone)]
pub enum ProviderHandle {
    /// Provedor já inicializado (sessão de longa duração)
    Ready(Arc<dyn CompletionProvider>),
    /// Carregado pelo pipeline no estágio `loading_model`
    Deferred(Arc<dyn ProviderLoader>),
}

impl ProviderHandle {
    /// Obtém o provedor, carregando-o se necessário
    pub async fn acquire(&self) -> Result<Arc<dyn CompletionProvider>, LlmError> {
        match self {
            ProviderHandle::Ready(provider) => Ok(Arc::clone(provider)),
            ProviderHandle::Deferred(loader) => loader.load().await,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO OPENAI-COMPATÍVEL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente para APIs compatíveis com OpenAI
pub struct OpenAiClient {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "is_empty_slice")]
    stop: &'a [String],
}

fn is_empty_slice(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
}

#[derive(Deserialize)]
struct ChatStreamChoice {
    delta: Option<ChatDelta>,
}

#[derive(Deserialize)]
struct ChatDelta {
    content: Option<String>,
}

impl OpenAiClient {
    /// Cria o cliente sem verificar o servidor
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Load(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Cria o cliente e verifica que o servidor responde em `GET /models`
    pub async fn connect(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Self::new(config)?;
        let url = client.endpoint("models");

        let response = client
            .authorized(client.client.get(&url))
            .timeout(client.config.request_timeout)
            .send()
            .await
            .map_err(|e| LlmError::Load(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(LlmError::Load(format!("{} → HTTP {}", url, response.status())));
        }

        log::info!("✅ Provedor LLM disponível: {} ({})", client.config.model, client.config.api_base_url);
        Ok(client)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimit);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::Api(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = CompletionBody {
            model: &self.config.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: &request.stop,
        };

        let response = self
            .authorized(self.client.post(self.endpoint("completions")))
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;

        let parsed: CompletionResponse = Self::check_status(response).await?.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| LlmError::Parse("response without choices".into()))
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<TextStream, LlmError> {
        let body = ChatBody {
            model: &self.config.model,
            messages,
            max_tokens,
            temperature,
            stream: true,
        };

        // Sem timeout total: a geração pode levar minutos
        let response = self
            .authorized(self.client.post(self.endpoint("chat/completions")))
            .json(&body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Ok(parse_sse_stream(response.bytes_stream()))
    }
}

/// Carregador que cria um [`OpenAiClient`] verificando o servidor.
pub struct OpenAiLoader {
    config: LlmConfig,
}

impl OpenAiLoader {
    /// Cria o carregador
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProviderLoader for OpenAiLoader {
    async fn load(&self) -> Result<Arc<dyn CompletionProvider>, LlmError> {
        let client = OpenAiClient::connect(self.config.clone()).await?;
        Ok(Arc::new(client))
    }
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    buffer: Vec<u8>,
    exhausted: bool,
    done: bool,
}

/// Converte um corpo `text/event-stream` em fragmentos de conteúdo.
///
/// Linhas `data: {json}` produzem o `delta.content` do primeiro choice;
/// `data: [DONE]` ou o fim do corpo encerram a sequência.
pub fn parse_sse_stream<S, B, E>(byte_stream: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    Box::pin(futures::stream::unfold(
        SseState {
            bytes: Box::pin(byte_stream),
            buffer: Vec::new(),
            exhausted: false,
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }

            loop {
                while let Some(line_end) = state.buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = state.buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();

                    if data == "[DONE]" {
                        state.done = true;
                        return None;
                    }

                    match serde_json::from_str::<ChatStreamChunk>(data) {
                        Ok(chunk) => {
                            let content = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta)
                                .and_then(|d| d.content)
                                .filter(|c| !c.is_empty());
                            if let Some(content) = content {
                                return Some((Ok(content), state));
                            }
                        }
                        Err(e) => log::debug!("Chunk SSE ignorado ({}): {}", e, data),
                    }
                }

                if state.exhausted {
                    state.done = true;
                    return None;
                }

                match state.bytes.next().await {
                    Some(Ok(bytes)) => state.buffer.extend_from_slice(bytes.as_ref()),
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(LlmError::Network(e.to_string())), state));
                    }
                    None => {
                        // Última linha pode chegar sem '\n'
                        state.exhausted = true;
                        if !state.buffer.is_empty() {
                            state.buffer.push(b'\n');
                        }
                    }
                }
            }
        },
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type CompletionFn = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;

/// Cliente mock para testes: respostas programáveis e registro das chamadas.
pub struct MockLlmClient {
    responder: Box<CompletionFn>,
    stream_items: Vec<Result<String, LlmError>>,
    stream_error: Option<LlmError>,
    completions: Mutex<Vec<CompletionRequest>>,
    chats: Mutex<Vec<Vec<ChatMessage>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            responder: Box::new(|_| Ok(String::new())),
            stream_items: vec![Ok("Mock ".into()), Ok("report".into())],
            stream_error: None,
            completions: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlmClient {
    /// Mock com respostas vazias e relatório "Mock report"
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a função que responde às completions
    pub fn with_completion<F>(mut self, responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    /// Respostas fixas em ordem; após o fim, repete a última
    pub fn with_completions(self, responses: Vec<Result<String, LlmError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        let last = Mutex::new(Ok(String::new()));
        self.with_completion(move |_| {
            let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
            let mut last = last.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(next) = queue.pop_front() {
                *last = next;
            }
            last.clone()
        })
    }

    /// Fragmentos devolvidos pelo chat em streaming
    pub fn with_stream(mut self, fragments: Vec<&str>) -> Self {
        self.stream_items = fragments.into_iter().map(|f| Ok(f.to_string())).collect();
        self
    }

    /// Fragmentos seguidos de uma falha no meio do streaming
    pub fn with_stream_interrupted(mut self, fragments: Vec<&str>, error: LlmError) -> Self {
        self.stream_items = fragments.into_iter().map(|f| Ok(f.to_string())).collect();
        self.stream_items.push(Err(error));
        self
    }

    /// Faz o chat em streaming falhar na abertura
    pub fn with_stream_error(mut self, error: LlmError) -> Self {
        self.stream_error = Some(error);
        self
    }

    /// Pedidos de completion recebidos
    pub fn completion_requests(&self) -> Vec<CompletionRequest> {
        self.completions
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Conversas enviadas ao chat em streaming
    pub fn chat_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.chats.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.completions.lock() {
            calls.push(request.clone());
        }
        (self.responder)(request)
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<TextStream, LlmError> {
        if let Ok(mut calls) = self.chats.lock() {
            calls.push(messages.to_vec());
        }
        if let Some(err) = &self.stream_error {
            return Err(err.clone());
        }
        Ok(Box::pin(futures::stream::iter(self.stream_items.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sse(chunks: Vec<&'static str>) -> TextStream {
        let items: Vec<Result<&'static [u8], String>> =
            chunks.into_iter().map(|c| Ok(c.as_bytes())).collect();
        parse_sse_stream(futures::stream::iter(items))
    }

    async fn collect(stream: TextStream) -> Vec<Result<String, LlmError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_sse_yields_content_deltas() {
        let stream = sse(vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
        ]);
        let items: Vec<String> = collect(stream).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(items, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_sse_handles_lines_split_across_chunks() {
        let stream = sse(vec![
            "data: {\"choices\":[{\"del",
            "ta\":{\"content\":\"ok\"}}]}\n",
        ]);
        let items: Vec<String> = collect(stream).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(items, vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_sse_last_line_without_newline() {
        let stream = sse(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]);
        let items: Vec<String> = collect(stream).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(items, vec!["tail".to_string()]);
    }

    #[tokio::test]
    async fn test_sse_transport_error_is_network() {
        let items: Vec<Result<&'static [u8], String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".as_slice()),
            Err("connection reset".to_string()),
        ];
        let results = collect(parse_sse_stream(futures::stream::iter(items))).await;
        assert_eq!(results.len(), 2);
        assert!(matches!(&results[1], Err(e) if e.is_network()));
    }

    #[tokio::test]
    async fn test_mock_client_records_calls() {
        let client = MockLlmClient::new().with_completions(vec![Ok("one".into()), Ok("two".into())]);
        let request = CompletionRequest {
            prompt: "p".into(),
            max_tokens: 10,
            temperature: 0.1,
            stop: vec![],
        };
        assert_eq!(client.complete(&request).await.unwrap(), "one");
        assert_eq!(client.complete(&request).await.unwrap(), "two");
        assert_eq!(client.complete(&request).await.unwrap(), "two");
        assert_eq!(client.completion_requests().len(), 3);

        let stream = client
            .stream_chat(&[ChatMessage::user("hi")], 10, 0.5)
            .await
            .unwrap();
        let text: Vec<String> = collect(stream).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text.concat(), "Mock report");
        assert_eq!(client.chat_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_handle_ready() {
        let handle = ProviderHandle::Ready(Arc::new(MockLlmClient::new()));
        assert!(handle.acquire().await.is_ok());
    }
}
