//! Seed prompts for the inference sessions.
//!
//! Each prompt has a short built-in default and can be replaced by
//! `prompts/<name>.local.txt` next to the working directory or the executable.
//! The persona prompt is read from `PERSONA_PROMPT_PATH` first.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::shared::config;

const DEFAULT_PERSONA_PROMPT: &str = "あなたは配信者として振る舞うAITuberです。\
親しみやすい口調で、120文字以内で返答してください。";

const DEFAULT_TRANSLATION_PROMPT: &str = "あなたは翻訳機です。\
与えられたテキストを英語に翻訳してください。回答は翻訳結果のみにしてください。";

const DEFAULT_EMOTION_PROMPT: &str = "あなたは感情分析をするAIです。\
与えられたテキストから話者の感情を判定し、次のラベルから最も適切なものを1つだけ英語で出力してください: \
normal, angry, sad, happy, excited, blush, surprised, sleepy, thinking, relax, goodbye。\
出力はラベル名のみにしてください。";

const DEFAULT_MOOD_PROMPT: &str = "あなたは対話中のAITuberの機嫌を分析するAIです。\
ユーザーとAITuberの発言から、AITuberの現在のご機嫌度を0〜100の整数で出力してください。\
0は非常に不機嫌、100はとても機嫌が良い状態です。判断が難しい場合は50を基準にしてください。\
出力は数値のみにしてください。";

const DEFAULT_IMAGE_PROMPT: &str = "あなたは画像の必要性を判断するAIです。\
ユーザーの発言が現在の画面や視覚的な要素に依存している場合のみ「必要」、\
それ以外は「不要」と答えてください。出力は「必要」か「不要」のみにしてください。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Persona,
    Translation,
    Emotion,
    Mood,
    ImageRequirement,
}

impl PromptKind {
    fn file_stem(self) -> &'static str {
        match self {
            PromptKind::Persona => "persona",
            PromptKind::Translation => "translation",
            PromptKind::Emotion => "emotion",
            PromptKind::Mood => "mood",
            PromptKind::ImageRequirement => "image_requirement",
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            PromptKind::Persona => DEFAULT_PERSONA_PROMPT,
            PromptKind::Translation => DEFAULT_TRANSLATION_PROMPT,
            PromptKind::Emotion => DEFAULT_EMOTION_PROMPT,
            PromptKind::Mood => DEFAULT_MOOD_PROMPT,
            PromptKind::ImageRequirement => DEFAULT_IMAGE_PROMPT,
        }
    }

    fn cache(self) -> &'static OnceLock<String> {
        static PERSONA: OnceLock<String> = OnceLock::new();
        static TRANSLATION: OnceLock<String> = OnceLock::new();
        static EMOTION: OnceLock<String> = OnceLock::new();
        static MOOD: OnceLock<String> = OnceLock::new();
        static IMAGE: OnceLock<String> = OnceLock::new();
        match self {
            PromptKind::Persona => &PERSONA,
            PromptKind::Translation => &TRANSLATION,
            PromptKind::Emotion => &EMOTION,
            PromptKind::Mood => &MOOD,
            PromptKind::ImageRequirement => &IMAGE,
        }
    }
}

/// Loads every prompt once so missing override files are reported at startup.
pub fn init_prompts() {
    for kind in [
        PromptKind::Persona,
        PromptKind::Translation,
        PromptKind::Emotion,
        PromptKind::Mood,
        PromptKind::ImageRequirement,
    ] {
        let _ = prompt(kind);
    }
}

pub fn prompt(kind: PromptKind) -> String {
    kind.cache()
        .get_or_init(|| {
            let persona_path = match kind {
                PromptKind::Persona => Some(config::ai_config().persona_prompt_path.clone()),
                _ => None,
            };
            resolve_prompt(kind, persona_path.as_deref())
        })
        .clone()
}

fn resolve_prompt(kind: PromptKind, explicit: Option<&Path>) -> String {
    if let Some(text) = explicit.and_then(read_non_empty) {
        return text;
    }
    let file_name = format!("{}.local.txt", kind.file_stem());
    let candidates = [
        PathBuf::from("prompts").join(&file_name),
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("prompts").join(&file_name)))
            .unwrap_or_default(),
    ];
    for path in candidates {
        if let Some(text) = read_non_empty(&path) {
            log::info!("[prompt] {} loaded from {}", kind.file_stem(), path.display());
            return text;
        }
    }
    if kind == PromptKind::Persona {
        log::warn!("[prompt] persona prompt file not found, using built-in default");
    }
    kind.default_text().to_string()
}

fn read_non_empty(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
