use std::fmt;

use tokio::sync::mpsc;

use crate::shared::entities::InputMode;
use crate::shared::utils::preview;

/// Work item for the session loop. User input, greetings and timer
/// completions all share one queue so turns never overlap.
#[derive(Clone, PartialEq)]
pub enum TurnRequest {
    Greeting,
    User { text: String, mode: InputMode },
    TimerFinished { minutes: f64 },
    Shutdown,
}

impl fmt::Debug for TurnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greeting => f.write_str("Greeting"),
            Self::User { text, mode } => f
                .debug_struct("User")
                .field("text", &preview(text, 24))
                .field("mode", mode)
                .finish(),
            Self::TimerFinished { minutes } => f
                .debug_struct("TimerFinished")
                .field("minutes", minutes)
                .finish(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

#[derive(Clone)]
pub struct TurnTx {
    tx: mpsc::Sender<TurnRequest>,
}

pub struct TurnRx {
    rx: mpsc::Receiver<TurnRequest>,
}

pub fn turn_channel(capacity: usize) -> (TurnTx, TurnRx) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (TurnTx { tx }, TurnRx { rx })
}

impl TurnTx {
    pub async fn send(
        &self,
        request: TurnRequest,
    ) -> Result<(), mpsc::error::SendError<TurnRequest>> {
        self.tx.send(request).await
    }

    pub fn try_send(
        &self,
        request: TurnRequest,
    ) -> Result<(), mpsc::error::TrySendError<TurnRequest>> {
        self.tx.try_send(request)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl TurnRx {
    pub async fn recv(&mut self) -> Option<TurnRequest> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<TurnRequest> {
        self.rx.try_recv().ok()
    }
}
