use std::path::Path;

use serde::Deserialize;

/// One classifiable task: what triggers it and which fields to extract.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskDefinition {
    pub task_name: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl TaskDefinition {
    fn new(task_name: &str, conditions: &[&str], fields: &[&str]) -> Self {
        Self {
            task_name: task_name.to_string(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

pub fn default_catalogue() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new("check_time", &["現在時刻を尋ねている", "今何時か聞いている"], &[]),
        TaskDefinition::new("check_date", &["今日の日付を尋ねている", "今日が何日か聞いている"], &[]),
        TaskDefinition::new(
            "set_timer",
            &["タイマーをセットしてほしい", "指定の時間が経ったら知らせてほしい"],
            &["time（分単位の数値）"],
        ),
        TaskDefinition::new(
            "check_weather",
            &["天気を知りたい", "天気予報を尋ねている"],
            &["対象日（今日・明日・明後日）", "対象地域"],
        ),
        TaskDefinition::new(
            "get_news",
            &["ニュースを知りたい", "最近の出来事を尋ねている"],
            &["country（日本・アメリカ・中国・韓国）", "category（business, entertainment, general, health, science, sports, technology）"],
        ),
        TaskDefinition::new("spotify_play_music", &["曲を再生してほしい"], &["曲名"]),
        TaskDefinition::new("spotify_pause_music", &["音楽を止めてほしい"], &[]),
        TaskDefinition::new("spotify_next_track", &["次の曲にしてほしい"], &[]),
        TaskDefinition::new(
            "wikipedia_search",
            &["Wikipediaで調べてほしい", "言葉の意味を調べてほしい"],
            &["検索キーワード"],
        ),
        TaskDefinition::new("paper_search", &["論文を探してほしい"], &["検索キーワード（英語）"]),
    ]
}

/// Catalogue from `path` when given and readable, built-in defaults otherwise.
/// JSON task files load too, since YAML is a superset.
pub fn load_catalogue(path: Option<&Path>) -> Vec<TaskDefinition> {
    let Some(path) = path else {
        return default_catalogue();
    };
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_yaml::from_str::<Vec<TaskDefinition>>(&text) {
            Ok(tasks) if !tasks.is_empty() => tasks,
            Ok(_) => {
                log::warn!("[skill] task catalogue {:?} is empty. Using default.", path);
                default_catalogue()
            }
            Err(err) => {
                log::warn!(
                    "[skill] failed to parse task catalogue {:?}: {}. Using default.",
                    path,
                    err
                );
                default_catalogue()
            }
        },
        Err(err) => {
            log::warn!(
                "[skill] task catalogue not found {:?}: {}. Using default.",
                path,
                err
            );
            default_catalogue()
        }
    }
}

/// System prompt for the intent session.
pub fn build_prompt(tasks: &[TaskDefinition]) -> String {
    let mut prompt = String::from(
        "あなたはタスク判定器です。以下のタスク定義に基づいて、与えられた入力がどのタスクに該当するかを判定してください。\n\
該当する場合は、タスク名と抽出された情報を JSON 形式で出力してください。\n\n【タスク定義】\n",
    );
    for task in tasks {
        prompt.push_str(&format!("タスク名: {}\n", task.task_name));
        let conditions: Vec<String> = task.conditions.iter().map(|c| format!("「{}」", c)).collect();
        prompt.push_str(&format!("  条件: {}\n", conditions.join("、")));
        prompt.push_str("  抽出項目:\n");
        for field in &task.fields {
            prompt.push_str(&format!("    - {}\n", field));
        }
        prompt.push('\n');
    }
    prompt.push_str(
        "【出力形式】\n\
タスクに該当する場合は以下の形式で返してください(statusは必ず\"matched\"にしてください):\n\
{\"status\": \"matched\", \"task_name\": タスク名, \"fields\": [\"抽出項目（複数可）\"]}\n\n\
タスクに該当しない場合は、以下のように返して下さい:\n\
{\"status\": \"no_match\"}\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalogue_covers_all_tasks() {
        let names: Vec<String> = default_catalogue().into_iter().map(|t| t.task_name).collect();
        for expected in [
            "check_time",
            "check_date",
            "set_timer",
            "check_weather",
            "get_news",
            "spotify_play_music",
            "spotify_pause_music",
            "spotify_next_track",
            "wikipedia_search",
            "paper_search",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn prompt_lists_tasks_conditions_and_fields() {
        let prompt = build_prompt(&[TaskDefinition::new("set_timer", &["タイマー", "計って"], &["time"])]);
        assert!(prompt.contains("タスク名: set_timer"));
        assert!(prompt.contains("条件: 「タイマー」、「計って」"));
        assert!(prompt.contains("    - time"));
        assert!(prompt.contains("\"no_match\""));
    }

    #[test]
    fn json_task_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task_definitions.json");
        std::fs::write(
            &path,
            r#"[{"task_name": "check_time", "conditions": ["時間"], "fields": []}]"#,
        )
        .unwrap();
        let tasks = load_catalogue(Some(&path));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_name, "check_time");
    }

    #[test]
    fn broken_or_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.yaml");
        std::fs::write(&path, "task_name: [unclosed").unwrap();
        assert_eq!(load_catalogue(Some(&path)), default_catalogue());
        assert_eq!(
            load_catalogue(Some(&dir.path().join("missing.yaml"))),
            default_catalogue()
        );
        assert_eq!(load_catalogue(None), default_catalogue());
    }
}
