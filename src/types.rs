// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::convert::Infallible;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tipo de URL (alias para String)
pub type Url = String;

/// Resultado de busca já enriquecido com o conteúdo lido da página.
///
/// `url` é a chave de deduplicação. Quando `content` é `None`, o `snippet`
/// do provedor de busca é usado como evidência.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Título da página
    pub title: Option<String>,
    /// URL do resultado
    pub url: Url,
    /// Descrição curta devolvida pelo provedor de busca
    pub snippet: Option<String>,
    /// Conteúdo extraído da página (já truncado)
    pub content: Option<String>,
}

impl SearchResult {
    /// Texto de evidência: conteúdo lido, senão snippet, senão vazio.
    pub fn evidence_text(&self) -> &str {
        self.content
            .as_deref()
            .or(self.snippet.as_deref())
            .unwrap_or("")
    }

    /// Título para exibição (`N/A` quando ausente)
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("N/A")
    }
}

/// Lista de fontes citáveis, somente-anexação.
///
/// O índice + 1 de cada fonte é o número usado em `[Source N]`. Não há
/// operação de remoção ou reordenação: um número de citação atribuído nunca muda.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceList {
    sources: Vec<SearchResult>,
}

impl SourceList {
    /// Cria lista vazia
    pub fn new() -> Self {
        Self::default()
    }

    /// Anexa uma fonte e retorna seu número de citação (1-based)
    pub fn push(&mut self, result: SearchResult) -> usize {
        self.sources.push(result);
        self.sources.len()
    }

    /// Fonte para um número de citação
    pub fn get(&self, citation: usize) -> Option<&SearchResult> {
        citation.checked_sub(1).and_then(|i| self.sources.get(i))
    }

    /// Número de citação atribuído a uma URL, se existir
    pub fn citation_of(&self, url: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.url == url).map(|i| i + 1)
    }

    /// Quantidade de fontes
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Se a lista está vazia
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Itera na ordem de citação
    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.sources.iter()
    }

    /// Visão em slice
    pub fn as_slice(&self) -> &[SearchResult] {
        &self.sources
    }
}

impl<'a> IntoIterator for &'a SourceList {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}

/// Nível de detalhe do relatório final
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    /// No máximo 3 bullet points
    Concise,
    /// Padrão
    #[default]
    Standard,
    /// Inclui estatísticas e citações diretas
    Detailed,
}

/// Conversão case-insensitive; valores desconhecidos viram `Standard`.
impl FromStr for DetailLevel {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_lowercase().as_str() {
            "concise" => Self::Concise,
            "detailed" => Self::Detailed,
            _ => Self::Standard,
        })
    }
}

/// Blocos de raciocínio/ferramenta que modelos locais costumam emitir.
static REASONING_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<(think|thought|plan|tool_call|call|execute|tool_code|tool_output|human_input|response|tool_code_[a-z_]+)>.*?</(think|thought|plan|tool_call|call|execute|tool_code|tool_output|human_input|response|tool_code_[a-z_]+)>",
    )
    .expect("regex de blocos de raciocínio é válida")
});

/// Remove blocos `<think>…</think>` e similares de um texto gerado.
pub fn strip_reasoning_blocks(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").trim().to_string()
}

/// Turno anterior da conversa (pergunta + resposta), somente leitura para o pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Pergunta feita
    pub query: String,
    /// Resposta dada
    pub answer: String,
}

impl ConversationTurn {
    /// Cria turno com a resposta exatamente como fornecida
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
        }
    }

    /// Cria turno a partir de um relatório bruto, limpando blocos de raciocínio
    pub fn from_report(query: impl Into<String>, report: &str) -> Self {
        Self::new(query, strip_reasoning_blocks(report))
    }
}
