use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::shared::entities::{Phase, Turn, TurnId};

/// Runs `fut` and returns its output with the wall-clock time it took.
pub(crate) async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let started = Instant::now();
    let output = fut.await;
    (output, started.elapsed())
}

/// Turn-scoped clock used to tag log lines with the turn id and the time
/// elapsed since the turn was accepted.
pub(crate) struct TurnClock {
    tag: String,
    started: Instant,
}

impl TurnClock {
    pub(crate) fn start(id: &TurnId) -> Self {
        Self {
            tag: id.short(),
            started: Instant::now(),
        }
    }

    pub(crate) fn tag(&self) -> &str {
        &self.tag
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn phase_failed(&self, phase: Phase, err: impl fmt::Display) {
        log::warn!(
            "[turn {}] phase={} failed at {}ms: {}",
            self.tag,
            phase,
            self.elapsed().as_millis(),
            err
        );
    }
}

/// One summary line per turn: total plus every recorded phase/task duration.
pub(crate) fn emit(turn: &Turn) {
    let phases = render_timings(turn);
    log::info!(
        "[metrics] turn={} kind={:?} mode={} total={}ms emotion={} mood={} image={} task={} {}",
        turn.id.short(),
        turn.kind,
        turn.mode.as_str(),
        turn.total.as_millis(),
        turn.emotion,
        turn.mood.value(),
        turn.image_required,
        turn.task_matched,
        phases
    );
    if !turn.dispatch.all_delivered() {
        log::info!(
            "[metrics] turn={} avatar dispatch incomplete: {:?}",
            turn.id.short(),
            turn.dispatch
        );
    }
}

fn render_timings(turn: &Turn) -> String {
    turn.timings
        .entries()
        .iter()
        .map(|(phase, elapsed)| format!("{}={}ms", phase, elapsed.as_millis()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::entities::{InputMode, TurnKind};

    #[tokio::test(start_paused = true)]
    async fn timed_measures_the_future() {
        let (value, took) = timed(async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            7
        })
        .await;
        assert_eq!(value, 7);
        assert!(took >= Duration::from_millis(250));
    }

    #[test]
    fn timings_render_in_recording_order() {
        let mut turn = Turn::new(TurnKind::User, "x", InputMode::Manual);
        turn.timings.record(Phase::Intent, Duration::from_millis(12));
        turn.timings.record(Phase::Generation, Duration::from_millis(900));
        assert_eq!(render_timings(&turn), "intent=12ms generation=900ms");
    }
}
