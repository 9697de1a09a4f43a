//! # Query Planner
//!
//! Pede ao provedor de completions `count` queries de busca diversas para a
//! pergunta do usuário e interpreta a resposta de forma robusta.
//!
//! ## Cadeia de interpretação
//!
//! 1. [`ParsedQueries::Structured`]: a saída é JSON válido
//! 2. [`ParsedQueries::Unstructured`]: strings entre aspas, senão divisão
//!    por vírgula/ponto-e-vírgula/quebra de linha
//!
//! A pergunta original é sempre a primeira query; duplicatas são removidas
//! preservando a ordem. Qualquer falha do provedor resulta em `[query]`.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::llm::{CompletionProvider, CompletionRequest};

/// Tokens máximos pedidos ao planejador
pub const PLANNER_MAX_TOKENS: u32 = 150;

/// Temperatura do planejamento
pub const PLANNER_TEMPERATURE: f32 = 0.4;

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(.*?)""#).expect("regex de aspas é válida"));

static DELIMITERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\n;]").expect("regex de delimitadores é válida"));

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONJUNTO DE QUERIES PLANEJADAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Queries planejadas: sem duplicatas, primeira sempre igual à pergunta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuerySet {
    queries: Vec<String>,
}

impl PlannedQuerySet {
    /// Monta o conjunto a partir dos candidatos extraídos
    pub fn from_candidates<I>(query: &str, candidates: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let queries = std::iter::once(query.to_string())
            .chain(
                candidates
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
            )
            .filter(|q| seen.insert(q.clone()))
            .collect();
        Self { queries }
    }

    /// Conjunto contendo apenas a pergunta original
    pub fn only(query: &str) -> Self {
        Self {
            queries: vec![query.to_string()],
        }
    }

    /// Pergunta original
    pub fn original(&self) -> &str {
        self.queries.first().map(String::as_str).unwrap_or("")
    }

    /// Quantidade de queries
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Se está vazio (nunca, na prática)
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Itera em ordem
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.queries.iter()
    }

    /// Visão em slice
    pub fn as_slice(&self) -> &[String] {
        &self.queries
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// INTERPRETAÇÃO DA SAÍDA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Saída do modelo interpretada
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQueries {
    /// JSON válido (lista, ou valor único convertido em lista)
    Structured(Vec<String>),
    /// Texto livre
    Unstructured(String),
}

impl ParsedQueries {
    /// Tenta JSON estrito; caso contrário guarda o texto bruto.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Array(items)) => {
                Self::Structured(items.into_iter().map(json_to_query).collect())
            }
            Ok(other) => Self::Structured(vec![json_to_query(other)]),
            Err(_) => Self::Unstructured(raw.to_string()),
        }
    }

    /// Candidatos (ainda sem limpeza), aplicando as estratégias de fallback.
    pub fn into_candidates(self) -> Vec<String> {
        match self {
            Self::Structured(queries) => queries,
            Self::Unstructured(raw) => {
                let quoted = extract_quoted(&raw);
                if quoted.is_empty() {
                    split_delimited(&raw)
                } else {
                    quoted
                }
            }
        }
    }
}

fn json_to_query(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Estratégia 1 do texto livre: conteúdo entre aspas duplas
pub fn extract_quoted(raw: &str) -> Vec<String> {
    QUOTED
        .captures_iter(raw)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Estratégia 2 do texto livre: divisão por `,` `;` ou quebra de linha
pub fn split_delimited(raw: &str) -> Vec<String> {
    DELIMITERS.split(raw).map(String::from).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PLANEJADOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Planejador de queries de busca
pub struct QueryPlanner {
    llm: Arc<dyn CompletionProvider>,
}

impl QueryPlanner {
    /// Cria planejador com o provedor dado
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Prompt enviado ao modelo
    pub fn build_prompt(query: &str, count: usize) -> String {
        format!(
            "Based on the user's query, generate {count} diverse and effective search engine queries.\n\
             The queries should be concise and cover different aspects of the original query.\n\
             Return the queries as a JSON list of strings.\n\n\
             User Query: \"{query}\"\n\n\
             JSON Output:\n"
        )
    }

    /// Gera o conjunto de queries. Nunca falha.
    pub async fn plan(&self, query: &str, count: usize) -> PlannedQuerySet {
        let request = CompletionRequest {
            prompt: Self::build_prompt(query, count),
            max_tokens: PLANNER_MAX_TOKENS,
            temperature: PLANNER_TEMPERATURE,
            stop: vec!["\n".to_string()],
        };

        let raw = match self.llm.complete(&request).await {
            Ok(raw) => raw,
            Err(err) => {
                log::error!("❌ Erro ao gerar queries de busca: {}", err);
                return PlannedQuerySet::only(query);
            }
        };

        let parsed = ParsedQueries::parse(&raw);
        if let ParsedQueries::Unstructured(text) = &parsed {
            log::info!("📝 Saída do planejador não é JSON: {:?}, usando fallback", text);
        }

        let planned = PlannedQuerySet::from_candidates(query, parsed.into_candidates());
        log::info!("📋 Queries planejadas: {:?}", planned.as_slice());
        planned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};

    fn planner(response: Result<String, LlmError>) -> (QueryPlanner, Arc<MockLlmClient>) {
        let mock = Arc::new(MockLlmClient::new().with_completions(vec![response]));
        (QueryPlanner::new(mock.clone()), mock)
    }

    #[test]
    fn test_parse_structured_list() {
        assert_eq!(
            ParsedQueries::parse(r#"["a", "b"]"#),
            ParsedQueries::Structured(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_parse_non_list_json_is_wrapped() {
        assert_eq!(
            ParsedQueries::parse(r#""single query""#),
            ParsedQueries::Structured(vec!["single query".into()])
        );
        assert_eq!(
            ParsedQueries::parse("42"),
            ParsedQueries::Structured(vec!["42".into()])
        );
    }

    #[test]
    fn test_unstructured_quoted_strategy() {
        let parsed = ParsedQueries::parse(r#"Here: "rust async", "tokio runtime" and more"#);
        assert!(matches!(parsed, ParsedQueries::Unstructured(_)));
        assert_eq!(parsed.into_candidates(), vec!["rust async", "tokio runtime"]);
    }

    #[test]
    fn test_unstructured_split_strategy() {
        let parsed = ParsedQueries::parse("rust async; tokio runtime, futures");
        assert_eq!(
            parsed.into_candidates(),
            vec!["rust async", " tokio runtime", " futures"]
        );
    }

    #[test]
    fn test_query_set_dedup_and_original_first() {
        let set = PlannedQuerySet::from_candidates(
            "rust",
            vec![" rust ".into(), "".into(), "tokio".into(), "tokio".into(), "  ".into()],
        );
        assert_eq!(set.as_slice(), &["rust".to_string(), "tokio".to_string()]);
        assert_eq!(set.original(), "rust");
    }

    #[tokio::test]
    async fn test_plan_with_json_response() {
        let (planner, mock) = planner(Ok(r#"["rust memory safety", "rust ownership"]"#.into()));
        let set = planner.plan("what is rust", 3).await;

        assert_eq!(
            set.as_slice(),
            &["what is rust", "rust memory safety", "rust ownership"]
        );

        let requests = mock.completion_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 150);
        assert_eq!(requests[0].stop, vec!["\n".to_string()]);
        assert!(requests[0].prompt.contains("generate 3 diverse"));
        assert!(requests[0].prompt.contains("JSON list of strings"));
    }

    #[tokio::test]
    async fn test_plan_provider_failure_returns_only_query() {
        let (planner, _) = planner(Err(LlmError::Network("down".into())));
        let set = planner.plan("what is rust", 3).await;
        assert_eq!(set, PlannedQuerySet::only("what is rust"));
    }

    #[tokio::test]
    async fn test_plan_duplicate_of_query_removed() {
        let (planner, _) = planner(Ok(r#"["what is rust", "rust history"]"#.into()));
        let set = planner.plan("what is rust", 3).await;
        assert_eq!(set.as_slice(), &["what is rust", "rust history"]);
    }
}
