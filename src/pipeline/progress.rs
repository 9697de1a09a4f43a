// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NOTIFICAÇÕES DE PROGRESSO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// O pipeline só produz; quem exibe consome por um canal sem bloquear.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use super::state::PipelineStage;

/// Callback de estágio
pub type StageSink = Arc<dyn Fn(PipelineStage) + Send + Sync>;

/// Sink que descarta as notificações
pub fn noop_stage_sink() -> StageSink {
    Arc::new(|_| {})
}

/// Sink que envia cada estágio para um canal ilimitado.
///
/// Envio nunca bloqueia; se o receptor já foi descartado a notificação é perdida.
pub fn channel_stage_sink(tx: UnboundedSender<PipelineStage>) -> StageSink {
    Arc::new(move |stage| {
        let _ = tx.send(stage);
    })
}

/// Sink que grava os estágios em memória (útil em testes)
#[derive(Clone, Default)]
pub struct RecordingSink {
    stages: Arc<Mutex<Vec<PipelineStage>>>,
}

impl RecordingSink {
    /// Sink vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback que grava neste sink
    pub fn sink(&self) -> StageSink {
        let stages = self.stages.clone();
        Arc::new(move |stage| {
            if let Ok(mut stages) = stages.lock() {
                stages.push(stage);
            }
        })
    }

    /// Estágios recebidos, em ordem
    pub fn stages(&self) -> Vec<PipelineStage> {
        self.stages.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = channel_stage_sink(tx);
        sink(PipelineStage::Planning);
        sink(PipelineStage::Searching);

        assert_eq!(rx.recv().await, Some(PipelineStage::Planning));
        assert_eq!(rx.recv().await, Some(PipelineStage::Searching));
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = channel_stage_sink(tx);
        sink(PipelineStage::Done);
    }

    #[test]
    fn test_recording_sink() {
        let recorder = RecordingSink::new();
        let sink = recorder.sink();
        sink(PipelineStage::Initializing);
        sink(PipelineStage::Done);
        assert_eq!(
            recorder.stages(),
            vec![PipelineStage::Initializing, PipelineStage::Done]
        );
    }
}
