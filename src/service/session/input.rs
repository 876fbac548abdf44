use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::shared::entities::InputMode;
use crate::shared::ports::ai::SpeechCapturePort;
use crate::shared::ports::turn::{TurnRequest, TurnTx};
use crate::shared::utils::preview;

const LISTEN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Where user turns come from.
pub enum InputSource {
    /// Line-oriented text, normally stdin.
    Lines(Box<dyn BufRead + Send>),
    Voice(Arc<dyn SpeechCapturePort>),
}

impl InputSource {
    pub fn stdin() -> Self {
        InputSource::Lines(Box::new(std::io::BufReader::new(std::io::stdin())))
    }

    pub fn mode(&self) -> InputMode {
        match self {
            InputSource::Lines(_) => InputMode::Manual,
            InputSource::Voice(_) => InputMode::Voice,
        }
    }
}

/// Feeds user input into the turn queue. After each submitted input the
/// reader waits on `turn_done` so the next line is read only once the
/// previous turn has been dispatched. The quit token (or end of input)
/// enqueues `Shutdown`.
pub fn spawn_input_reader(
    source: InputSource,
    tx: TurnTx,
    turn_done: Arc<Notify>,
    quit_token: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match source {
            InputSource::Lines(reader) => read_lines(reader, tx, turn_done, quit_token).await,
            InputSource::Voice(capture) => listen_loop(capture, tx, turn_done).await,
        }
    })
}

async fn read_lines(
    mut reader: Box<dyn BufRead + Send>,
    tx: TurnTx,
    turn_done: Arc<Notify>,
    quit_token: String,
) {
    loop {
        let read = tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            let result = reader.read_line(&mut line).map(|n| (n, line));
            (reader, result)
        })
        .await;
        let (returned, result) = match read {
            Ok(pair) => pair,
            Err(err) => {
                log::error!("[input] reader task failed: {}", err);
                let _ = tx.send(TurnRequest::Shutdown).await;
                return;
            }
        };
        reader = returned;

        let line = match result {
            Ok((0, _)) => {
                log::info!("[input] end of input");
                let _ = tx.send(TurnRequest::Shutdown).await;
                return;
            }
            Ok((_, line)) => line.trim().to_string(),
            Err(err) => {
                log::error!("[input] read failed: {}", err);
                let _ = tx.send(TurnRequest::Shutdown).await;
                return;
            }
        };

        if line == quit_token {
            log::info!("[input] quit requested");
            let _ = tx.send(TurnRequest::Shutdown).await;
            return;
        }
        let request = TurnRequest::User {
            text: line,
            mode: InputMode::Manual,
        };
        if tx.send(request).await.is_err() {
            return;
        }
        turn_done.notified().await;
    }
}

async fn listen_loop(capture: Arc<dyn SpeechCapturePort>, tx: TurnTx, turn_done: Arc<Notify>) {
    loop {
        if tx.is_closed() {
            return;
        }
        let recognition = match capture.listen().await {
            Ok(recognition) => recognition,
            Err(err) => {
                log::warn!("[input] speech capture failed: {}", err);
                tokio::time::sleep(LISTEN_RETRY_DELAY).await;
                continue;
            }
        };
        if !recognition.recognized {
            continue;
        }
        log::info!("[input] heard: {}", preview(&recognition.text, 60));
        let request = TurnRequest::User {
            text: recognition.text,
            mode: InputMode::Voice,
        };
        if tx.send(request).await.is_err() {
            return;
        }
        turn_done.notified().await;
    }
}
