//! Session loop: the single consumer of the turn-request queue.
//!
//! User input, the opening greeting and timer completions all arrive as
//! `TurnRequest`s and are handled one at a time. The loop ends on a farewell
//! keyword (after a grace delay), an explicit `Shutdown`, Ctrl-C, or when every
//! producer is gone; the avatar is reset in every case.

mod input;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::service::conversation::Orchestrator;
use crate::shared::entities::InputMode;
use crate::shared::error::TurnError;

pub use crate::shared::ports::turn::{turn_channel, TurnRequest, TurnRx, TurnTx};
pub use input::{spawn_input_reader, InputSource};

pub const TURN_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Farewell,
    Shutdown,
    Interrupted,
    QueueClosed,
}

pub struct SessionLoop {
    orchestrator: Arc<Orchestrator>,
    rx: TurnRx,
    turn_done: Arc<Notify>,
}

impl SessionLoop {
    pub fn new(orchestrator: Arc<Orchestrator>, rx: TurnRx) -> Self {
        Self {
            orchestrator,
            rx,
            turn_done: Arc::new(Notify::new()),
        }
    }

    /// Signalled after every user request has been handled.
    pub fn turn_done(&self) -> Arc<Notify> {
        self.turn_done.clone()
    }

    pub async fn run(mut self) -> LoopExit {
        let exit = loop {
            let request = tokio::select! {
                request = self.rx.recv() => request,
                _ = interrupted(tokio::signal::ctrl_c()) => break LoopExit::Interrupted,
            };
            let Some(request) = request else {
                break LoopExit::QueueClosed;
            };
            log::debug!("[session] handling {:?}", request);
            let handled = tokio::select! {
                handled = self.handle(request) => handled,
                _ = interrupted(tokio::signal::ctrl_c()) => break LoopExit::Interrupted,
            };
            if let Some(exit) = handled {
                break exit;
            }
        };
        log::info!("[session] ending ({:?})", exit);
        self.orchestrator.reset_avatar().await;
        exit
    }

    async fn handle(&self, request: TurnRequest) -> Option<LoopExit> {
        match request {
            TurnRequest::Greeting => {
                if let Err(err) = self.orchestrator.run_greeting().await {
                    log::error!("[session] greeting failed: {}", err);
                }
                None
            }
            TurnRequest::TimerFinished { minutes } => {
                if let Err(err) = self.orchestrator.run_timer_notice(minutes).await {
                    log::error!("[session] timer notice failed: {}", err);
                }
                None
            }
            TurnRequest::User { text, mode } => {
                match self.orchestrator.run_turn(&text, mode).await {
                    Ok(_) => {}
                    Err(TurnError::EmptyInput) => log::info!("[session] empty input ignored"),
                    Err(err) => log::error!("[session] turn failed: {}", err),
                }
                let exit = if self.is_farewell(&text) {
                    let grace = self.orchestrator.session_config().farewell_grace;
                    log::info!("[session] farewell received; closing in {:?}", grace);
                    tokio::time::sleep(grace).await;
                    Some(LoopExit::Farewell)
                } else {
                    None
                };
                self.turn_done.notify_one();
                exit
            }
            TurnRequest::Shutdown => Some(LoopExit::Shutdown),
        }
    }

    fn is_farewell(&self, text: &str) -> bool {
        self.orchestrator
            .session_config()
            .farewell_keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSelection {
    Selected(InputMode),
    Interrupted,
}

/// Waits for the input-mode answer from `read`. An interrupt while waiting,
/// or an unsupported answer, resets the avatar before returning.
pub async fn select_input_mode<R, S>(
    orchestrator: &Orchestrator,
    read: R,
    interrupt: S,
) -> anyhow::Result<ModeSelection>
where
    R: Future<Output = anyhow::Result<String>>,
    S: Future<Output = std::io::Result<()>>,
{
    let answer = tokio::select! {
        answer = read => answer,
        _ = interrupted(interrupt) => {
            log::info!("[session] interrupted at the mode prompt");
            orchestrator.reset_avatar().await;
            return Ok(ModeSelection::Interrupted);
        }
    };
    match answer.and_then(|raw| InputMode::from_selection(&raw).map_err(anyhow::Error::from)) {
        Ok(mode) => Ok(ModeSelection::Selected(mode)),
        Err(err) => {
            log::error!("[session] {}", err);
            orchestrator.reset_avatar().await;
            Err(err)
        }
    }
}

/// Resolves once `signal` reports an interrupt. A listener that fails to
/// register is logged and never resolves, so it cannot end the session.
pub async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => log::info!("[session] interrupt received"),
        Err(err) => {
            log::error!("[session] failed to listen for interrupts: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivered_interrupt_resolves() {
        let waited = tokio::time::timeout(Duration::from_secs(1), interrupted(async { Ok::<(), std::io::Error>(()) })).await;
        assert!(waited.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_listener_never_resolves() {
        let signal = async { Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "no handler")) };
        let waited = tokio::time::timeout(Duration::from_secs(60), interrupted(signal)).await;
        assert!(waited.is_err());
    }
}
