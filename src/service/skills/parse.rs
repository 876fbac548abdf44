use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CheckTime,
    CheckDate,
    SetTimer,
    CheckWeather,
    GetNews,
    PlayMusic,
    PauseMusic,
    NextTrack,
    WikipediaSearch,
    PaperSearch,
}

impl TaskKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "check_time" => Some(Self::CheckTime),
            "check_date" => Some(Self::CheckDate),
            "set_timer" => Some(Self::SetTimer),
            "check_weather" | "check_wether" => Some(Self::CheckWeather),
            "get_news" => Some(Self::GetNews),
            "spotify_play_music" => Some(Self::PlayMusic),
            "spotify_pause_music" => Some(Self::PauseMusic),
            "spotify_next_track" => Some(Self::NextTrack),
            "wikipedia_search" => Some(Self::WikipediaSearch),
            "paper_search" => Some(Self::PaperSearch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckTime => "check_time",
            Self::CheckDate => "check_date",
            Self::SetTimer => "set_timer",
            Self::CheckWeather => "check_weather",
            Self::GetNews => "get_news",
            Self::PlayMusic => "spotify_play_music",
            Self::PauseMusic => "spotify_pause_music",
            Self::NextTrack => "spotify_next_track",
            Self::WikipediaSearch => "wikipedia_search",
            Self::PaperSearch => "paper_search",
        }
    }
}

/// Extracted fields. The classifier returns either an object keyed by field
/// name or a positional array, so both shapes are kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFields(Value);

impl TaskFields {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// First non-empty value among `keys` when the fields are an object.
    pub fn get(&self, keys: &[&str]) -> Option<String> {
        let map = self.0.as_object()?;
        keys.iter()
            .filter_map(|key| map.get(*key))
            .find_map(scalar_text)
    }

    /// Positional first value: array head, first object value, or a bare scalar.
    pub fn first(&self) -> Option<String> {
        match &self.0 {
            Value::Array(items) => items.iter().find_map(scalar_text),
            Value::Object(map) => map.values().find_map(scalar_text),
            other => scalar_text(other),
        }
    }

    pub fn nth(&self, index: usize) -> Option<String> {
        match &self.0 {
            Value::Array(items) => items.get(index).and_then(scalar_text),
            Value::Object(map) => map.values().nth(index).and_then(scalar_text),
            _ => None,
        }
    }

    /// Named lookup first, then position.
    pub fn get_or_nth(&self, keys: &[&str], index: usize) -> Option<String> {
        self.get(keys).or_else(|| self.nth(index))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskClassification {
    Matched { task: TaskKind, fields: TaskFields },
    NoMatch,
    ParseError(String),
}

#[derive(Deserialize)]
struct ClassifierPayload {
    status: String,
    #[serde(default)]
    task_name: Option<String>,
    #[serde(default)]
    fields: Value,
}

/// Strict parse of the intent classifier's raw output.
pub fn parse_classification(raw: &str) -> TaskClassification {
    let Some(json) = extract_json_object(raw) else {
        return TaskClassification::ParseError("no JSON object in classifier output".to_string());
    };
    let payload = match serde_json::from_str::<ClassifierPayload>(json) {
        Ok(payload) => payload,
        Err(err) => return TaskClassification::ParseError(err.to_string()),
    };
    match payload.status.trim() {
        "no_match" => TaskClassification::NoMatch,
        "matched" => {
            let name = payload.task_name.unwrap_or_default();
            match TaskKind::from_name(&name) {
                Some(task) => TaskClassification::Matched {
                    task,
                    fields: TaskFields::new(payload.fields),
                },
                None => TaskClassification::ParseError(format!("unknown task: {:?}", name)),
            }
        }
        other => TaskClassification::ParseError(format!("unknown status: {:?}", other)),
    }
}

/// Span from the first `{` to the last `}`, after removing a markdown fence.
fn extract_json_object(raw: &str) -> Option<&str> {
    let body = strip_code_fence(raw);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn strip_code_fence(input: &str) -> &str {
    let mut s = input.trim();
    if let Some(stripped) = s.strip_prefix("```") {
        s = stripped.trim_start();
        if let Some(rest) = s.strip_prefix("json") {
            s = rest;
        }
        if let Some(end) = s.rfind("```") {
            s = &s[..end];
        }
    }
    s.trim()
}
