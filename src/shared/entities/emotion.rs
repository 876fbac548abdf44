use std::fmt;

/// Avatar emotion labels. Declaration order is the extraction priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Emotion {
    #[default]
    Normal,
    Angry,
    Sad,
    Happy,
    Excited,
    Blush,
    Surprised,
    Sleepy,
    Thinking,
    Relax,
    Goodbye,
}

impl Emotion {
    pub const ALL: [Emotion; 11] = [
        Emotion::Normal,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Happy,
        Emotion::Excited,
        Emotion::Blush,
        Emotion::Surprised,
        Emotion::Sleepy,
        Emotion::Thinking,
        Emotion::Relax,
        Emotion::Goodbye,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Normal => "normal",
            Emotion::Angry => "angry",
            Emotion::Sad => "sad",
            Emotion::Happy => "happy",
            Emotion::Excited => "excited",
            Emotion::Blush => "blush",
            Emotion::Surprised => "surprised",
            Emotion::Sleepy => "sleepy",
            Emotion::Thinking => "thinking",
            Emotion::Relax => "relax",
            Emotion::Goodbye => "goodbye",
        }
    }

    /// First canonical label contained in `text` (case-insensitive), else `Normal`.
    pub fn extract_from(text: &str) -> Emotion {
        let lowered = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|emotion| lowered.contains(emotion.as_str()))
            .unwrap_or_default()
    }

    /// Exact label lookup, including the legacy expression names.
    pub fn from_label(label: &str) -> Option<Emotion> {
        let label = label.trim().to_lowercase();
        if let Some(found) = Self::ALL.into_iter().find(|e| e.as_str() == label) {
            return Some(found);
        }
        match label.as_str() {
            "neutral" => Some(Emotion::Normal),
            "smile" => Some(Emotion::Happy),
            "cry" | "worry" => Some(Emotion::Sad),
            "laugh" => Some(Emotion::Excited),
            _ => None,
        }
    }

    /// Motion lookup for arbitrary labels; unknown labels play the `normal` clip.
    pub fn motion_for_label(label: &str) -> &'static str {
        Self::from_label(label).unwrap_or_default().motion_clip()
    }

    pub fn motion_clip(self) -> &'static str {
        match self {
            Emotion::Normal | Emotion::Relax => "Relax",
            Emotion::Angry => "Angry",
            Emotion::Sad => "Sad",
            Emotion::Happy => "Clapping",
            Emotion::Excited => "Jump",
            Emotion::Blush => "Blush",
            Emotion::Surprised => "Surprised",
            Emotion::Sleepy => "Sleepy",
            Emotion::Thinking => "Thinking",
            Emotion::Goodbye => "Goodbye",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
