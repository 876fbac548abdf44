//! Conversation orchestration: one turn from raw input to avatar dispatch.
//!
//! Phases run in a fixed order and each boundary is a join point:
//! pre-analysis (intent ∥ image need), prompt assembly, generation,
//! post-analysis (translation ∥ emotion ∥ mood ∥ synthesis), dispatch.
//! Only generation can fail a turn; every other phase falls back to a default.

mod metrics;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use tokio::time::Instant;

use crate::service::ai::image_required_from;
use crate::service::skills::{format_minutes, SkillDispatcher};
use crate::shared::config::{self, SessionConfig};
use crate::shared::entities::{
    AvatarOutcome, DispatchReport, Emotion, InputMode, MoodValue, Phase, SkillResult, Turn,
    TurnKind,
};
use crate::shared::error::TurnError;
use crate::shared::ports::ai::AiServices;
use crate::shared::ports::avatar::{AvatarFuture, AvatarPort, SubtitlePort};
use crate::shared::ports::screenshot::{ScreenshotPort, WindowRef};
use crate::shared::utils::preview;

use self::metrics::{timed, TurnClock};

const TIMER_NOTICE_PROMPT: &str = "タイマーが終了しました。終了のお知らせをしてください。";

pub struct Orchestrator {
    ai: Arc<dyn AiServices>,
    avatar: Arc<dyn AvatarPort>,
    subtitle: Arc<dyn SubtitlePort>,
    screenshot: Arc<dyn ScreenshotPort>,
    skills: SkillDispatcher,
    session: SessionConfig,
    voice_path: PathBuf,
    screenshot_path: PathBuf,
    app_name: String,
    bound_window: Mutex<Option<WindowRef>>,
    turn_lock: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    /// File paths, the capture target app and session settings come from the
    /// environment; override them with the `with_*` builders.
    pub fn new(
        ai: Arc<dyn AiServices>,
        avatar: Arc<dyn AvatarPort>,
        subtitle: Arc<dyn SubtitlePort>,
        screenshot: Arc<dyn ScreenshotPort>,
        skills: SkillDispatcher,
    ) -> Self {
        let shot = config::screenshot_config();
        Self {
            ai,
            avatar,
            subtitle,
            screenshot,
            skills,
            session: config::session_config().clone(),
            voice_path: config::tts_config().voice_path.clone(),
            screenshot_path: shot.image_path.clone(),
            app_name: shot.default_app_name.clone(),
            bound_window: Mutex::new(None),
            turn_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_paths(mut self, voice_path: PathBuf, screenshot_path: PathBuf) -> Self {
        self.voice_path = voice_path;
        self.screenshot_path = screenshot_path;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Resolves the capture target window for manual-mode turns.
    pub async fn bind_window(&self) -> Option<WindowRef> {
        let found = self.screenshot.locate_window(self.app_name.clone()).await;
        match &found {
            Some(window) => log::info!("[turn] capture target {} -> window {}", self.app_name, window),
            None => log::warn!("[turn] capture target {} not found; full screen will be used", self.app_name),
        }
        *self.window_slot() = found.clone();
        found
    }

    fn window_slot(&self) -> MutexGuard<'_, Option<WindowRef>> {
        match self.bound_window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn neutral_mood(&self) -> MoodValue {
        MoodValue::new(u32::from(self.session.neutral_mood)).unwrap_or(MoodValue::NEUTRAL)
    }

    /// Runs one user turn. Blank manual input is an error; blank voice input
    /// (nothing recognized) skips the turn.
    pub async fn run_turn(
        &self,
        user_input: &str,
        mode: InputMode,
    ) -> Result<Option<Turn>, TurnError> {
        let text = user_input.trim();
        if text.is_empty() {
            return match mode {
                InputMode::Manual => Err(TurnError::EmptyInput),
                InputMode::Voice => {
                    log::info!("[turn] nothing recognized; turn skipped");
                    Ok(None)
                }
            };
        }

        let _guard = self.turn_lock.lock().await;
        let mut turn = Turn::new(TurnKind::User, text, mode);
        let clock = TurnClock::start(&turn.id);
        log::info!(
            "[turn {}] {} input: {}",
            clock.tag(),
            mode.as_str(),
            preview(text, 80)
        );

        let (pre, pre_took) = timed(async {
            tokio::join!(
                timed(self.skills.dispatch(text)),
                timed(self.needs_image(text, &clock)),
            )
        })
        .await;
        let ((skill, intent_took), (image_required, image_took)) = pre;
        turn.timings.record(Phase::Intent, intent_took);
        turn.timings.record(Phase::ImageRequirement, image_took);
        turn.timings.record(Phase::PreAnalysis, pre_took);
        turn.task_matched = skill.matched;
        turn.image_required = image_required;

        let assembly = Instant::now();
        turn.prompt = assemble_prompt(text, &skill);
        turn.timings.record(Phase::PromptAssembly, assembly.elapsed());

        let response = self.generate(&mut turn, &clock).await?;
        turn.response = response;
        let mood_subject = turn.prompt.clone();
        self.finish(&mut turn, &clock, mood_subject).await;
        Ok(Some(turn))
    }

    /// Opening turn: the model greets the user based on the current time.
    pub async fn run_greeting(&self) -> Result<Turn, TurnError> {
        let prompt = format!(
            "【現在時刻は{}です。ユーザーに挨拶してください。】",
            Local::now().format("%H:%M:%S")
        );
        self.run_scripted(TurnKind::Greeting, prompt).await
    }

    pub async fn run_timer_notice(&self, minutes: f64) -> Result<Turn, TurnError> {
        log::info!("[turn] timer of {} finished", format_minutes(minutes));
        self.run_scripted(TurnKind::TimerNotice, TIMER_NOTICE_PROMPT.to_string())
            .await
    }

    /// Puts the avatar back to rest: blank subtitle, neutral face and mood.
    pub async fn reset_avatar(&self) -> DispatchReport {
        let _guard = self.turn_lock.lock().await;
        let subtitle = self.subtitle.update_subtitle(" ".to_string()).await;
        let expression = self
            .avatar
            .set_expression(Emotion::Normal.as_str().to_string())
            .await;
        let mood = self.avatar.set_mood(self.neutral_mood().value()).await;
        log::info!("[turn] avatar reset (subtitle={:?} expression={:?} mood={:?})", subtitle, expression, mood);
        DispatchReport {
            subtitle: Some(subtitle),
            expression: Some(expression),
            mood: Some(mood),
            ..DispatchReport::default()
        }
    }

    async fn run_scripted(&self, kind: TurnKind, prompt: String) -> Result<Turn, TurnError> {
        let _guard = self.turn_lock.lock().await;
        let mut turn = Turn::new(kind, String::new(), InputMode::Manual);
        turn.prompt = prompt;
        let clock = TurnClock::start(&turn.id);
        log::info!("[turn {}] {:?}: {}", clock.tag(), kind, preview(&turn.prompt, 80));

        let response = self.generate(&mut turn, &clock).await?;
        turn.response = response;
        self.finish(&mut turn, &clock, String::new()).await;
        Ok(turn)
    }

    async fn needs_image(&self, text: &str, clock: &TurnClock) -> bool {
        match self.ai.detect_image_requirement(text.to_string()).await {
            Ok(raw) => image_required_from(&raw),
            Err(err) => {
                clock.phase_failed(Phase::ImageRequirement, err);
                false
            }
        }
    }

    /// Voice turns follow whatever window is in front; manual turns use the
    /// bound application window.
    async fn capture_screen(&self, mode: InputMode) -> bool {
        let window = match mode {
            InputMode::Voice => self.screenshot.frontmost_window().await,
            InputMode::Manual => {
                let bound = self.window_slot().clone();
                match bound {
                    Some(window) => Some(window),
                    None => self.bind_window().await,
                }
            }
        };
        self.screenshot
            .capture(window, self.screenshot_path.clone())
            .await
    }

    async fn generate(&self, turn: &mut Turn, clock: &TurnClock) -> Result<String, TurnError> {
        let mut image = None;
        if turn.image_required {
            let (captured, took) = timed(self.capture_screen(turn.mode)).await;
            turn.timings.record(Phase::Screenshot, took);
            if captured {
                image = Some(self.screenshot_path.clone());
            } else {
                clock.phase_failed(Phase::Screenshot, "capture failed; answering from text only");
            }
        }

        let prompt = turn.prompt.clone();
        let (result, took) = match image {
            Some(path) => timed(self.ai.generate_with_image(prompt, path)).await,
            None => timed(self.ai.generate(prompt)).await,
        };
        turn.timings.record(Phase::Generation, took);
        match result {
            Ok(response) => {
                log::info!("[turn {}] response: {}", clock.tag(), preview(&response, 80));
                Ok(response)
            }
            Err(err) => {
                clock.phase_failed(Phase::Generation, &err);
                Err(TurnError::Generation(err))
            }
        }
    }

    /// Post-analysis, dispatch and metrics. Nothing here can fail the turn.
    async fn finish(&self, turn: &mut Turn, clock: &TurnClock, mood_subject: String) {
        let response = turn.response.clone();
        let ((translation, emotion, mood, voice), post_took) = timed(async {
            tokio::join!(
                timed(self.ai.translate(response.clone())),
                timed(self.ai.classify_emotion(response.clone())),
                timed(self.ai.score_mood(mood_subject, response.clone())),
                timed(self.ai.synth_to_wav(response.clone(), self.voice_path.clone())),
            )
        })
        .await;

        let (translation, took) = translation;
        turn.timings.record(Phase::Translation, took);
        turn.translation = translation.unwrap_or_else(|err| {
            clock.phase_failed(Phase::Translation, err);
            String::new()
        });

        let (emotion, took) = emotion;
        turn.timings.record(Phase::Emotion, took);
        turn.emotion = match emotion {
            Ok(raw) => Emotion::extract_from(&raw),
            Err(err) => {
                clock.phase_failed(Phase::Emotion, err);
                Emotion::Normal
            }
        };

        let (mood, took) = mood;
        turn.timings.record(Phase::Mood, took);
        turn.mood = match mood {
            Ok(raw) => MoodValue::extract(&raw).unwrap_or_else(|err| {
                clock.phase_failed(Phase::Mood, format!("{} in {:?}", err, preview(&raw, 40)));
                self.neutral_mood()
            }),
            Err(err) => {
                clock.phase_failed(Phase::Mood, err);
                self.neutral_mood()
            }
        };

        let (voice, took) = voice;
        turn.timings.record(Phase::Synthesis, took);
        turn.voice_path = match voice {
            Ok(path) => Some(path),
            Err(err) => {
                clock.phase_failed(Phase::Synthesis, err);
                None
            }
        };
        turn.timings.record(Phase::PostAnalysis, post_took);

        let (report, took) = timed(self.dispatch(turn, clock)).await;
        turn.dispatch = report;
        turn.timings.record(Phase::Dispatch, took);
        turn.total = clock.elapsed();
        metrics::emit(turn);
    }

    /// Subtitle, expression, motion, mood, voice, bilingual subtitle; strictly
    /// in that order. The voice trigger is skipped when nothing was synthesized.
    async fn dispatch(&self, turn: &Turn, clock: &TurnClock) -> DispatchReport {
        let label = turn.emotion.as_str().to_string();
        let subtitle = deliver(clock, "subtitle", self.subtitle.update_subtitle(turn.subtitle_text())).await;
        let expression = deliver(clock, "expression", self.avatar.set_expression(label.clone())).await;
        let motion = deliver(clock, "motion", self.avatar.play_motion(label)).await;
        let mood = deliver(clock, "mood", self.avatar.set_mood(turn.mood.value())).await;
        let voice = match turn.voice_path {
            Some(_) => Some(deliver(clock, "voice", self.avatar.play_voice()).await),
            None => None,
        };
        let avatar_subtitle = deliver(
            clock,
            "avatar_subtitle",
            self.avatar
                .send_subtitle(turn.response.clone(), turn.translation.clone()),
        )
        .await;
        DispatchReport {
            subtitle: Some(subtitle),
            expression: Some(expression),
            motion: Some(motion),
            mood: Some(mood),
            voice,
            avatar_subtitle: Some(avatar_subtitle),
        }
    }
}

async fn deliver(clock: &TurnClock, target: &str, call: AvatarFuture) -> AvatarOutcome {
    let outcome = call.await;
    match &outcome {
        AvatarOutcome::Delivered | AvatarOutcome::Disabled => {}
        other => clock.phase_failed(Phase::Dispatch, format!("{} -> {:?}", target, other)),
    }
    outcome
}

/// Folds a matched skill hint into the prompt; otherwise the input goes through as is.
pub fn assemble_prompt(input: &str, skill: &SkillResult) -> String {
    if skill.matched && !skill.hint.is_empty() {
        format!("【{}これを踏まえて次のメッセージに返答して。】\n\n{}", skill.hint, input)
    } else {
        input.to_string()
    }
}
