//! # Ferramentas do Pipeline
//!
//! Componentes chamados pelo orquestrador, cada um com uma operação
//! nomeada e dependências injetadas.
//!
//! ## Componentes
//!
//! - [`QueryPlanner`]: gera queries de busca diversas a partir da pergunta
//! - [`Summarizer`]: comprime conteúdos longos (fallback por truncamento)
//! - [`SearchRoundExecutor`]: uma rodada de busca + leitura de conteúdo
//! - [`calculator`]: avaliador aritmético protegido

pub mod calculator;
pub mod planner;
pub mod search_round;
pub mod summarizer;

pub use calculator::{evaluate, is_arithmetic_expression, CalcError, Number};
pub use planner::{ParsedQueries, PlannedQuerySet, QueryPlanner};
pub use search_round::{RoundOutcome, SearchRoundExecutor};
pub use summarizer::Summarizer;
