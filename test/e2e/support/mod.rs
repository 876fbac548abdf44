#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aituber_backend::service::skills::SkillDispatcher;
use aituber_backend::service::Orchestrator;
use aituber_backend::shared::config::SessionConfig;
use aituber_backend::shared::entities::AvatarOutcome;
use aituber_backend::shared::error::{
    EmotionError, ImageRequirementError, IntentError, LlmError, SkillError, TranslateError,
    TtsError,
};
use aituber_backend::shared::ports::ai::{
    AiFuture, DialoguePort, EmotionPort, ImageRequirementPort, IntentPort, MoodPort,
    TranslatorPort, TtsPort,
};
use aituber_backend::shared::ports::avatar::{AvatarFuture, AvatarPort, SubtitlePort};
use aituber_backend::shared::ports::screenshot::{ScreenshotFuture, ScreenshotPort, WindowRef};
use aituber_backend::shared::ports::skills::{
    EncyclopediaPage, EncyclopediaPort, MusicPort, NewsArticle, NewsPort, Paper,
    PaperSearchPort, SkillFuture, WeatherPort,
};
use aituber_backend::shared::ports::turn::TurnTx;

/// Shared call log; every double appends `name:detail` entries in call order.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.snapshot().iter().position(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.snapshot().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.snapshot().iter().any(|e| e == entry)
    }
}

/// Inference double. `None` answers fail the corresponding call.
#[derive(Clone)]
pub struct ScriptedAi {
    pub events: Events,
    pub response: Option<String>,
    pub translation: Option<String>,
    pub emotion: Option<String>,
    pub mood: Option<String>,
    pub image_answer: Option<String>,
    pub synth_ok: bool,
    pub generation_delay: Duration,
}

impl ScriptedAi {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            response: Some("こんにちは、元気ですか？".to_string()),
            translation: Some("Hello, how are you?".to_string()),
            emotion: Some("happy".to_string()),
            mood: Some("70".to_string()),
            image_answer: Some("不要".to_string()),
            synth_ok: true,
            generation_delay: Duration::ZERO,
        }
    }
}

impl DialoguePort for ScriptedAi {
    fn generate(&self, prompt: String) -> AiFuture<Result<String, LlmError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events.push(format!("generate:{}", prompt));
            tokio::time::sleep(this.generation_delay).await;
            this.events.push(format!("generated:{}", prompt));
            this.response
                .clone()
                .ok_or_else(|| LlmError::GenerationFailed("scripted failure".to_string()))
        })
    }

    fn generate_with_image(
        &self,
        prompt: String,
        image: PathBuf,
    ) -> AiFuture<Result<String, LlmError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events
                .push(format!("generate_with_image:{}:{}", prompt, image.display()));
            this.response
                .clone()
                .ok_or_else(|| LlmError::GenerationFailed("scripted failure".to_string()))
        })
    }
}

impl TranslatorPort for ScriptedAi {
    fn translate(&self, text: String) -> AiFuture<Result<String, TranslateError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events.push(format!("translate:{}", text));
            this.translation
                .clone()
                .ok_or_else(|| TranslateError::TranslationFailed("scripted".to_string()))
        })
    }
}

impl EmotionPort for ScriptedAi {
    fn classify_emotion(&self, text: String) -> AiFuture<Result<String, EmotionError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events.push(format!("emotion:{}", text));
            this.emotion
                .clone()
                .ok_or_else(|| EmotionError::AnalysisFailed("scripted".to_string()))
        })
    }
}

impl MoodPort for ScriptedAi {
    fn score_mood(&self, user_text: String, _response: String) -> AiFuture<Result<String, LlmError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events.push(format!("score_mood:{}", user_text));
            this.mood
                .clone()
                .ok_or_else(|| LlmError::GenerationFailed("scripted".to_string()))
        })
    }
}

impl ImageRequirementPort for ScriptedAi {
    fn detect_image_requirement(
        &self,
        text: String,
    ) -> AiFuture<Result<String, ImageRequirementError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events.push(format!("image_requirement:{}", text));
            this.image_answer
                .clone()
                .ok_or_else(|| ImageRequirementError::DetectionFailed("scripted".to_string()))
        })
    }
}

impl TtsPort for ScriptedAi {
    fn synth_to_wav(&self, text: String, path: PathBuf) -> AiFuture<Result<PathBuf, TtsError>> {
        let this = self.clone();
        Box::pin(async move {
            this.events.push(format!("synth:{}", text));
            if !this.synth_ok {
                return Err(TtsError::SynthesisFailed("engine down".to_string()));
            }
            tokio::fs::write(&path, b"RIFF")
                .await
                .map_err(|e| TtsError::SynthesisFailed(e.to_string()))?;
            Ok(path)
        })
    }
}

pub struct FixedIntent {
    pub answer: Result<String, String>,
}

impl FixedIntent {
    pub fn answering(raw: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(raw.to_string()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: Err("classifier offline".to_string()),
        })
    }
}

impl IntentPort for FixedIntent {
    fn classify_intent(&self, _text: String) -> AiFuture<Result<String, IntentError>> {
        let answer = self.answer.clone();
        Box::pin(async move { answer.map_err(IntentError::ClassificationFailed) })
    }
}

/// Every skill call fails; the pipeline tests only use clock/timer tasks.
pub struct NoSkills;

impl WeatherPort for NoSkills {
    fn forecast(&self, _city: String, _day_label: String) -> SkillFuture<String> {
        Box::pin(async { Err(SkillError::NoResult) })
    }
}

impl NewsPort for NoSkills {
    fn pick_headline(&self, _country: String, _category: String) -> SkillFuture<NewsArticle> {
        Box::pin(async { Err(SkillError::NoResult) })
    }
}

impl MusicPort for NoSkills {
    fn play_track(&self, _query: String) -> SkillFuture<String> {
        Box::pin(async { Err(SkillError::NoResult) })
    }

    fn pause(&self) -> SkillFuture<()> {
        Box::pin(async { Err(SkillError::NoResult) })
    }

    fn next_track(&self) -> SkillFuture<()> {
        Box::pin(async { Err(SkillError::NoResult) })
    }
}

impl EncyclopediaPort for NoSkills {
    fn lookup(&self, _query: String) -> SkillFuture<EncyclopediaPage> {
        Box::pin(async { Err(SkillError::NoResult) })
    }
}

impl PaperSearchPort for NoSkills {
    fn search(&self, _keyword: String) -> SkillFuture<Vec<Paper>> {
        Box::pin(async { Err(SkillError::NoResult) })
    }
}

/// Avatar and subtitle double answering every call with `outcome`.
pub struct RecordingAvatar {
    pub events: Events,
    pub outcome: AvatarOutcome,
}

impl RecordingAvatar {
    pub fn new(events: Events) -> Arc<Self> {
        Arc::new(Self {
            events,
            outcome: AvatarOutcome::Delivered,
        })
    }

    fn record(&self, entry: String) -> AvatarFuture {
        self.events.push(entry);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

impl AvatarPort for RecordingAvatar {
    fn set_expression(&self, expression: String) -> AvatarFuture {
        self.record(format!("expression:{}", expression))
    }

    fn play_motion(&self, emotion: String) -> AvatarFuture {
        self.record(format!("motion:{}", emotion))
    }

    fn set_mood(&self, mood: u8) -> AvatarFuture {
        self.record(format!("mood:{}", mood))
    }

    fn play_voice(&self) -> AvatarFuture {
        self.record("voice".to_string())
    }

    fn send_subtitle(&self, japanese: String, english: String) -> AvatarFuture {
        self.record(format!("avatar_subtitle:{}|{}", japanese, english))
    }
}

impl SubtitlePort for RecordingAvatar {
    fn update_subtitle(&self, text: String) -> AvatarFuture {
        self.record(format!("subtitle:{}", text))
    }
}

/// Screenshot double; a successful capture writes a small file to the path.
pub struct FakeScreen {
    pub events: Events,
    pub window: Option<WindowRef>,
    pub capture_ok: bool,
}

impl FakeScreen {
    pub fn new(events: Events, capture_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            events,
            window: Some(WindowRef("101".to_string())),
            capture_ok,
        })
    }
}

impl ScreenshotPort for FakeScreen {
    fn locate_window(&self, app_name: String) -> ScreenshotFuture<Option<WindowRef>> {
        self.events.push(format!("locate_window:{}", app_name));
        let window = self.window.clone();
        Box::pin(async move { window })
    }

    fn frontmost_window(&self) -> ScreenshotFuture<Option<WindowRef>> {
        self.events.push("frontmost_window");
        Box::pin(async { Some(WindowRef("front".to_string())) })
    }

    fn capture(&self, window: Option<WindowRef>, path: PathBuf) -> ScreenshotFuture<bool> {
        let label = window.map(|w| w.0).unwrap_or_else(|| "screen".to_string());
        self.events.push(format!("capture:{}", label));
        let ok = self.capture_ok;
        Box::pin(async move { ok && tokio::fs::write(&path, b"PNG").await.is_ok() })
    }
}

pub fn session_config(grace: Duration) -> SessionConfig {
    SessionConfig {
        farewell_grace: grace,
        ..SessionConfig::default()
    }
}

pub fn voice_path(dir: &Path) -> PathBuf {
    dir.join("voice.wav")
}

pub fn screenshot_path(dir: &Path) -> PathBuf {
    dir.join("screenshot.png")
}

pub struct Harness {
    pub ai: ScriptedAi,
    pub intent: Arc<dyn IntentPort>,
    pub avatar: Arc<RecordingAvatar>,
    pub screen: Arc<FakeScreen>,
    pub timers: Option<TurnTx>,
}

impl Harness {
    pub fn new(events: &Events) -> Self {
        Self {
            ai: ScriptedAi::new(events.clone()),
            intent: FixedIntent::answering(r#"{"status":"no_match"}"#),
            avatar: RecordingAvatar::new(events.clone()),
            screen: FakeScreen::new(events.clone(), true),
            timers: None,
        }
    }

    pub fn build(self, dir: &Path) -> Orchestrator {
        let mut skills = SkillDispatcher::new(self.intent, Arc::new(NoSkills));
        if let Some(tx) = self.timers {
            skills = skills.with_timer_queue(tx);
        }
        Orchestrator::new(
            Arc::new(self.ai),
            self.avatar.clone(),
            self.avatar,
            self.screen,
            skills,
        )
        .with_paths(voice_path(dir), screenshot_path(dir))
        .with_app_name("Viewer")
        .with_session_config(session_config(Duration::from_millis(50)))
    }
}
