// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADOS DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;

/// Estágio do pipeline - progressão estritamente para frente
///
/// `initializing → loading_model → planning → searching ⇄ processing →
/// generating → done`. Qualquer estágio não-terminal pode ir para `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Carregando configuração da execução
    Initializing,
    /// Obtendo o provedor de completions
    LoadingModel,
    /// Gerando queries de busca
    Planning,
    /// Executando uma rodada de busca
    Searching,
    /// Processando resultados da rodada
    Processing,
    /// Gerando o relatório em streaming
    Generating,
    /// Concluído
    Done,
    /// Falha irrecuperável
    Error,
}

impl PipelineStage {
    /// Nome usado nas notificações de progresso
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::LoadingModel => "loading_model",
            Self::Planning => "planning",
            Self::Searching => "searching",
            Self::Processing => "processing",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Verifica se o estágio é terminal (Done ou Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    fn ordinal(&self) -> u8 {
        match self {
            Self::Initializing => 0,
            Self::LoadingModel => 1,
            Self::Planning => 2,
            Self::Searching | Self::Processing => 3,
            Self::Generating => 4,
            Self::Done => 5,
            Self::Error => 6,
        }
    }

    /// Verifica se uma transição é válida
    pub fn can_transition_to(&self, target: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, target),
            // O loop de busca alterna entre searching e processing
            (Self::Searching, Self::Processing) |
            (Self::Processing, Self::Searching) |
            (_, Self::Error)
        ) || target.ordinal() > self.ordinal()
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Motivo do fim do loop de busca
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLoopEnd {
    /// Todas as queries planejadas foram usadas
    QueriesExhausted,
    /// Limite de iterações atingido
    IterationCap,
    /// O provedor de busca falhou
    ProviderError,
    /// Uma rodada não encontrou nada
    NoMatches,
    /// Nenhum resultado novo na rodada
    Converged,
    /// Contexto passou do orçamento de palavras
    BudgetExceeded,
    /// Cancelado pelo chamador
    Cancelled,
}

impl SearchLoopEnd {
    /// Código curto para logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueriesExhausted => "queries_exhausted",
            Self::IterationCap => "iteration_cap",
            Self::ProviderError => "provider_error",
            Self::NoMatches => "no_matches",
            Self::Converged => "converged",
            Self::BudgetExceeded => "budget_exceeded",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SearchLoopEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::LoadingModel.as_str(), "loading_model");
        assert_eq!(PipelineStage::Generating.to_string(), "generating");
    }

    #[test]
    fn test_forward_transitions() {
        use PipelineStage::*;
        assert!(Initializing.can_transition_to(LoadingModel));
        assert!(LoadingModel.can_transition_to(Planning));
        assert!(Planning.can_transition_to(Searching));
        assert!(Searching.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Searching));
        assert!(Processing.can_transition_to(Generating));
        assert!(Searching.can_transition_to(Done));
        assert!(Generating.can_transition_to(Done));
    }

    #[test]
    fn test_invalid_transitions() {
        use PipelineStage::*;
        assert!(!Planning.can_transition_to(LoadingModel));
        assert!(!Generating.can_transition_to(Searching));
        assert!(!Done.can_transition_to(Error));
        assert!(!Error.can_transition_to(Done));
        assert!(Planning.can_transition_to(Error));
    }
}
