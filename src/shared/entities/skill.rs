/// Outcome of one skill dispatch; `hint` is folded into the next prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillResult {
    pub matched: bool,
    pub hint: String,
}

impl SkillResult {
    pub fn matched(hint: impl Into<String>) -> Self {
        Self {
            matched: true,
            hint: hint.into(),
        }
    }

    pub fn unmatched() -> Self {
        Self::default()
    }

    /// Not matched; `hint` says why and is only logged, never prompted.
    pub fn failed(hint: impl Into<String>) -> Self {
        Self {
            matched: false,
            hint: hint.into(),
        }
    }
}
