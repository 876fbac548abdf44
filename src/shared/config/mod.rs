use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Timeouts {
    pub ai_http: Duration,
    pub avatar_http: Duration,
    pub avatar_probe: Duration,
    pub skill_http: Duration,
    pub asr_listen: Duration,
}

impl Timeouts {
    fn from_env() -> Self {
        // Defaults: inference 120s, avatar 2s (probe 1s), skills 10s, listening 60s.
        // Env: AI_HTTP_TIMEOUT_MS / AVATAR_HTTP_TIMEOUT_MS / AVATAR_PROBE_TIMEOUT_MS /
        //      SKILL_HTTP_TIMEOUT_MS / ASR_LISTEN_TIMEOUT_MS.
        Self {
            ai_http: env_duration_ms("AI_HTTP_TIMEOUT_MS", 120_000),
            avatar_http: env_duration_ms("AVATAR_HTTP_TIMEOUT_MS", 2_000),
            avatar_probe: env_duration_ms("AVATAR_PROBE_TIMEOUT_MS", 1_000),
            skill_http: env_duration_ms("SKILL_HTTP_TIMEOUT_MS", 10_000),
            asr_listen: env_duration_ms("ASR_LISTEN_TIMEOUT_MS", 60_000),
        }
    }
}

static TIMEOUTS: OnceLock<Timeouts> = OnceLock::new();

pub fn timeouts() -> &'static Timeouts {
    TIMEOUTS.get_or_init(Timeouts::from_env)
}

#[derive(Clone, Debug)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Clone, Debug)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub mode: LogMode,
    pub format: LogFormat,
    pub dir: Option<String>,
    pub file_name: String,
}

impl LoggingConfig {
    fn from_env() -> Self {
        let dir_env = std::env::var("LOG_DIR").ok();
        let format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let mode = match std::env::var("LOG_MODE").ok().as_deref() {
            Some("file") => LogMode::File,
            Some("stdout") => LogMode::Stdout,
            _ if dir_env.is_some() => LogMode::File,
            _ => LogMode::Stdout,
        };
        let dir = match mode {
            LogMode::File => Some(dir_env.unwrap_or_else(|| "logs".to_string())),
            LogMode::Stdout => None,
        };
        let file_name =
            std::env::var("LOG_FILE_NAME").unwrap_or_else(|_| "aituber.log".to_string());

        Self {
            mode,
            format,
            dir,
            file_name,
        }
    }
}

static LOGGING: OnceLock<LoggingConfig> = OnceLock::new();

pub fn logging_config() -> &'static LoggingConfig {
    LOGGING.get_or_init(LoggingConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_translate_api_key: Option<String>,
    pub gemini_api_base: String,
    pub dialogue_model: String,
    pub analyzer_model: String,
    pub persona_prompt_path: PathBuf,
    pub task_definitions_path: Option<PathBuf>,
}

impl AiConfig {
    /// Reads the inference settings.
    ///
    /// - `GEMINI_API_KEY`: key for every session.
    /// - `GEMINI_TRANSLATE_API_KEY`: key for the translation session; falls back to `GEMINI_API_KEY`.
    /// - `GEMINI_API_BASE`: defaults to the public Generative Language endpoint.
    /// - `GEMINI_DIALOGUE_MODEL`: defaults to `"gemini-1.5-flash"`.
    /// - `GEMINI_ANALYZER_MODEL`: model for translation/emotion/mood/intent/image sessions,
    ///   defaults to `"gemini-2.0-flash-lite"`.
    /// - `PERSONA_PROMPT_PATH`: persona system prompt file for the dialogue session.
    /// - `TASK_DEFINITIONS_PATH`: optional YAML task catalogue.
    fn from_env() -> Self {
        let gemini_api_key = env_non_empty("GEMINI_API_KEY");
        Self {
            gemini_translate_api_key: env_non_empty("GEMINI_TRANSLATE_API_KEY")
                .or_else(|| gemini_api_key.clone()),
            gemini_api_key,
            gemini_api_base: std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            dialogue_model: std::env::var("GEMINI_DIALOGUE_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            analyzer_model: std::env::var("GEMINI_ANALYZER_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash-lite".to_string()),
            persona_prompt_path: PathBuf::from(std::env::var("PERSONA_PROMPT_PATH").unwrap_or_else(
                |_| "assets/characters/Sample/data/Sample_system_prompt.txt".to_string(),
            )),
            task_definitions_path: env_non_empty("TASK_DEFINITIONS_PATH").map(PathBuf::from),
        }
    }
}

static AI_CONFIG: OnceLock<AiConfig> = OnceLock::new();

pub fn ai_config() -> &'static AiConfig {
    AI_CONFIG.get_or_init(AiConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct AvatarConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl AvatarConfig {
    fn from_env() -> Self {
        Self {
            enabled: env_bool("AVATAR_ENABLED", true),
            base_url: std::env::var("AVATAR_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
        }
    }
}

static AVATAR_CONFIG: OnceLock<AvatarConfig> = OnceLock::new();

pub fn avatar_config() -> &'static AvatarConfig {
    AVATAR_CONFIG.get_or_init(AvatarConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct TtsConfig {
    pub engine_url: String,
    pub speaker: u64,
    pub voice_path: PathBuf,
    /// Reading substitutions applied before synthesis, in order.
    pub readings: Vec<(String, String)>,
}

impl TtsConfig {
    fn from_env() -> Self {
        // AivisSpeech listens on 10101; VOICEVOX on 50021 with the same API.
        Self {
            engine_url: std::env::var("TTS_ENGINE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:10101".to_string()),
            speaker: env_u64("TTS_SPEAKER_ID", 888_753_760),
            voice_path: PathBuf::from(
                std::env::var("TTS_VOICE_PATH").unwrap_or_else(|_| "data/voice/voice.wav".to_string()),
            ),
            readings: std::env::var("TTS_READINGS")
                .map(|raw| parse_readings(&raw))
                .unwrap_or_default(),
        }
    }
}

static TTS_CONFIG: OnceLock<TtsConfig> = OnceLock::new();

pub fn tts_config() -> &'static TtsConfig {
    TTS_CONFIG.get_or_init(TtsConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct AsrConfig {
    pub whisper_url: String,
    /// Shell command recording one utterance into `{path}`.
    pub record_command: String,
    pub wav_path: PathBuf,
}

impl AsrConfig {
    fn from_env() -> Self {
        Self {
            whisper_url: std::env::var("WHISPER_URL")
                .unwrap_or_else(|_| "http://localhost:9000/transcribe".to_string()),
            record_command: std::env::var("ASR_RECORD_COMMAND").unwrap_or_else(|_| {
                "sox -q -d -r 16000 -c 1 -b 16 {path} silence 1 0.1 1% 1 1.5 1% trim 0 60"
                    .to_string()
            }),
            wav_path: PathBuf::from(
                std::env::var("ASR_WAV_PATH").unwrap_or_else(|_| "data/voice/question.wav".to_string()),
            ),
        }
    }
}

static ASR_CONFIG: OnceLock<AsrConfig> = OnceLock::new();

pub fn asr_config() -> &'static AsrConfig {
    ASR_CONFIG.get_or_init(AsrConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct ScreenshotConfig {
    pub image_path: PathBuf,
    pub default_app_name: String,
    /// Capture command; `{window}` and `{path}` are substituted.
    pub capture_command: String,
    /// Capture command used when no window id could be resolved.
    pub fullscreen_command: String,
    /// Prints the window id of `{app}` on stdout.
    pub window_lookup_command: Option<String>,
    /// Prints the window id of the frontmost window on stdout.
    pub frontmost_command: Option<String>,
}

impl ScreenshotConfig {
    fn from_env() -> Self {
        Self {
            image_path: PathBuf::from(
                std::env::var("SCREENSHOT_PATH")
                    .unwrap_or_else(|_| "data/image/screenshot.png".to_string()),
            ),
            default_app_name: std::env::var("SCREENSHOT_APP_NAME")
                .unwrap_or_else(|_| "Google Chrome".to_string()),
            capture_command: std::env::var("SCREENSHOT_COMMAND")
                .unwrap_or_else(|_| "screencapture -x -o -l {window} {path}".to_string()),
            fullscreen_command: std::env::var("SCREENSHOT_FULLSCREEN_COMMAND")
                .unwrap_or_else(|_| "screencapture -x {path}".to_string()),
            window_lookup_command: env_non_empty("WINDOW_LOOKUP_COMMAND")
                .or_else(|| platform_default(MACOS_WINDOW_LOOKUP)),
            frontmost_command: env_non_empty("FRONTMOST_WINDOW_COMMAND")
                .or_else(|| platform_default(MACOS_FRONTMOST_WINDOW)),
        }
    }
}

// CGWindowIDs (what `screencapture -l` takes) from the on-screen window list,
// front to back; layer 0 skips the menu bar and overlays.
const MACOS_WINDOW_LOOKUP: &str = r#"osascript -l JavaScript -e 'ObjC.import("CoreGraphics"); (function () { var list = ObjC.castRefToObject($.CGWindowListCopyWindowInfo($.kCGWindowListOptionOnScreenOnly, 0)); for (var i = 0; i < list.count; i++) { var w = list.objectAtIndex(i); if (w.objectForKey("kCGWindowOwnerName").js === "{app}" && w.objectForKey("kCGWindowLayer").js === 0) { return String(w.objectForKey("kCGWindowNumber").js); } } return ""; })()'"#;
const MACOS_FRONTMOST_WINDOW: &str = r#"osascript -l JavaScript -e 'ObjC.import("CoreGraphics"); (function () { var list = ObjC.castRefToObject($.CGWindowListCopyWindowInfo($.kCGWindowListOptionOnScreenOnly, 0)); for (var i = 0; i < list.count; i++) { var w = list.objectAtIndex(i); if (w.objectForKey("kCGWindowLayer").js === 0) { return String(w.objectForKey("kCGWindowNumber").js); } } return ""; })()'"#;

/// Window lookup defaults only exist where `screencapture` does.
fn platform_default(command: &str) -> Option<String> {
    cfg!(target_os = "macos").then(|| command.to_string())
}

static SCREENSHOT_CONFIG: OnceLock<ScreenshotConfig> = OnceLock::new();

pub fn screenshot_config() -> &'static ScreenshotConfig {
    SCREENSHOT_CONFIG.get_or_init(ScreenshotConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub quit_token: String,
    pub farewell_keywords: Vec<String>,
    pub farewell_grace: Duration,
    pub neutral_mood: u8,
}

impl SessionConfig {
    fn from_env() -> Self {
        let farewell_keywords = std::env::var("FAREWELL_KEYWORDS")
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|_| vec!["さよなら".to_string()]);
        Self {
            quit_token: std::env::var("QUIT_TOKEN").unwrap_or_else(|_| "q".to_string()),
            farewell_keywords,
            farewell_grace: env_duration_ms("FAREWELL_GRACE_MS", 3_000),
            neutral_mood: env_u8_bounded("NEUTRAL_MOOD", 50, 100),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quit_token: "q".to_string(),
            farewell_keywords: vec!["さよなら".to_string()],
            farewell_grace: Duration::from_secs(3),
            neutral_mood: 50,
        }
    }
}

static SESSION_CONFIG: OnceLock<SessionConfig> = OnceLock::new();

pub fn session_config() -> &'static SessionConfig {
    SESSION_CONFIG.get_or_init(SessionConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct SkillsConfig {
    pub weather_api_base: String,
    pub news_api_base: String,
    pub news_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub wikipedia_lang: String,
    pub wikipedia_sentences: u32,
    pub arxiv_api_base: String,
    pub arxiv_max_results: u32,
}

impl SkillsConfig {
    fn from_env() -> Self {
        Self {
            weather_api_base: std::env::var("WEATHER_API_BASE")
                .unwrap_or_else(|_| "https://weather.tsukumijima.net/api/forecast".to_string()),
            news_api_base: std::env::var("NEWS_API_BASE")
                .unwrap_or_else(|_| "https://newsapi.org/v2/top-headlines".to_string()),
            news_api_key: env_non_empty("NEWS_API_KEY"),
            spotify_client_id: env_non_empty("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: env_non_empty("SPOTIFY_CLIENT_SECRET"),
            spotify_refresh_token: env_non_empty("SPOTIFY_REFRESH_TOKEN"),
            wikipedia_lang: std::env::var("WIKIPEDIA_LANG").unwrap_or_else(|_| "ja".to_string()),
            wikipedia_sentences: env_u32("WIKIPEDIA_SENTENCES", 3),
            arxiv_api_base: std::env::var("ARXIV_API_BASE")
                .unwrap_or_else(|_| "http://export.arxiv.org/api/query".to_string()),
            arxiv_max_results: env_u32("ARXIV_MAX_RESULTS", 5),
        }
    }
}

static SKILLS_CONFIG: OnceLock<SkillsConfig> = OnceLock::new();

pub fn skills_config() -> &'static SkillsConfig {
    SKILLS_CONFIG.get_or_init(SkillsConfig::from_env)
}

fn env_duration_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(key, default_ms))
}

fn env_bool(key: &str, default_value: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default_value)
}

fn env_u32(key: &str, default_value: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default_value)
}

fn env_u64(key: &str, default_value: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn env_u8_bounded(key: &str, default_value: u8, max: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|v| *v <= max)
        .unwrap_or(default_value)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `"桜夜=さよ,TK256=ティーケー"` -> ordered (from, to) pairs.
fn parse_readings(raw: &str) -> Vec<(String, String)> {
    split_list(raw)
        .into_iter()
        .filter_map(|pair| {
            let (from, to) = pair.split_once('=')?;
            let from = from.trim();
            if from.is_empty() {
                return None;
            }
            Some((from.to_string(), to.trim().to_string()))
        })
        .collect()
}
