mod support;

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::net::TcpListener;

use aituber_backend::interface::HttpAvatarClient;
use aituber_backend::shared::config::AvatarConfig;
use aituber_backend::shared::entities::{Emotion, InputMode, Phase, TurnKind};
use aituber_backend::shared::error::TurnError;

use support::{screenshot_path, Events, FakeScreen, FixedIntent, Harness};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const AVATAR_ORDER: [&str; 6] = [
    "subtitle:",
    "expression:",
    "motion:",
    "mood:",
    "voice",
    "avatar_subtitle:",
];

#[tokio::test]
async fn plain_greeting_turn_runs_text_only() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    let turn = orchestrator
        .run_turn("こんにちは", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;

    assert_eq!(turn.kind, TurnKind::User);
    assert!(!turn.task_matched);
    assert!(!turn.image_required);
    assert_eq!(turn.prompt, "こんにちは");
    assert_eq!(turn.response, "こんにちは、元気ですか？");
    assert_eq!(turn.translation, "Hello, how are you?");
    assert_eq!(turn.emotion, Emotion::Happy);
    assert!(turn.mood.value() <= 100);
    assert_eq!(turn.mood.value(), 70);
    assert!(turn.voice_path.as_ref().is_some_and(|p| p.exists()));
    assert!(turn.dispatch.all_delivered());

    assert!(events.contains("generate:こんにちは"));
    assert_eq!(events.count("generate_with_image"), 0);
    assert_eq!(events.count("capture:"), 0);
    assert!(events.contains("subtitle:こんにちは、元気ですか？ <br> Hello, how are you?"));
    assert!(events.contains("avatar_subtitle:こんにちは、元気ですか？|Hello, how are you?"));

    for phase in [
        Phase::PreAnalysis,
        Phase::Intent,
        Phase::ImageRequirement,
        Phase::Generation,
        Phase::PostAnalysis,
        Phase::Translation,
        Phase::Emotion,
        Phase::Mood,
        Phase::Synthesis,
        Phase::Dispatch,
    ] {
        assert!(turn.timings.get(phase).is_some(), "missing timing for {}", phase);
    }
    assert!(turn.timings.get(Phase::Screenshot).is_none());
    Ok(())
}

#[tokio::test]
async fn avatar_calls_follow_fixed_order() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    orchestrator.run_turn("今日は何する？", InputMode::Manual).await?;

    let positions: Vec<usize> = AVATAR_ORDER
        .iter()
        .map(|prefix| events.position(prefix).ok_or(*prefix))
        .collect::<Result<_, _>>()?;
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "order: {:?}", events.snapshot());
    // Post-analysis finishes before anything reaches the avatar.
    assert!(events.position("synth:").ok_or("no synth")? < positions[0]);
    Ok(())
}

#[tokio::test]
async fn intent_failure_still_yields_a_response() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.intent = FixedIntent::failing();
    let orchestrator = harness.build(dir.path());

    let turn = orchestrator
        .run_turn("天気どう？", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert!(!turn.task_matched);
    assert_eq!(turn.prompt, "天気どう？");
    assert!(!turn.response.is_empty());
    Ok(())
}

#[tokio::test]
async fn matched_clock_task_wraps_the_prompt() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.intent = FixedIntent::answering(r#"{"status":"matched","task_name":"check_time"}"#);
    let orchestrator = harness.build(dir.path());

    let turn = orchestrator
        .run_turn("今何時？", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert!(turn.task_matched);
    assert!(turn.prompt.starts_with("【現在時刻は"));
    assert!(turn
        .prompt
        .ends_with("これを踏まえて次のメッセージに返答して。】\n\n今何時？"));
    assert!(events.contains(&format!("generate:{}", turn.prompt)));
    // The mood scorer sees the assembled prompt.
    assert!(events.contains(&format!("score_mood:{}", turn.prompt)));
    Ok(())
}

#[tokio::test]
async fn out_of_range_mood_falls_back_to_neutral() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.mood = Some("137".to_string());
    harness.ai.emotion = Some("よくわからない".to_string());
    let orchestrator = harness.build(dir.path());

    let turn = orchestrator
        .run_turn("どう思う？", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert_eq!(turn.mood.value(), 50);
    assert_eq!(turn.emotion, Emotion::Normal);
    assert!(events.contains("mood:50"));
    assert!(events.contains("expression:normal"));
    Ok(())
}

#[tokio::test]
async fn unreachable_avatar_does_not_fail_the_turn() -> TestResult {
    let dir = tempdir()?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let avatar = Arc::new(HttpAvatarClient::new(
        &AvatarConfig {
            enabled: true,
            base_url: format!("http://{}", addr),
        },
        Duration::from_millis(300),
        Duration::from_millis(300),
    )?);
    assert!(!avatar.probe().await);

    let events = Events::default();
    let harness = Harness::new(&events);
    let orchestrator = aituber_backend::service::Orchestrator::new(
        Arc::new(harness.ai),
        avatar.clone(),
        avatar,
        FakeScreen::new(events.clone(), true),
        aituber_backend::service::SkillDispatcher::new(harness.intent, Arc::new(support::NoSkills)),
    )
    .with_paths(support::voice_path(dir.path()), screenshot_path(dir.path()));

    let turn = orchestrator
        .run_turn("こんにちは", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert!(!turn.response.is_empty());
    let report = &turn.dispatch;
    let outcomes = [
        &report.subtitle,
        &report.expression,
        &report.motion,
        &report.mood,
        &report.voice,
        &report.avatar_subtitle,
    ];
    for outcome in outcomes {
        let outcome = outcome.as_ref().ok_or("call not attempted")?;
        assert!(!outcome.is_success());
    }
    assert!(!report.all_delivered());
    Ok(())
}

#[tokio::test]
async fn screenshot_turn_attaches_the_capture() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.image_answer = Some("画像が必要です".to_string());
    let orchestrator = harness.build(dir.path());

    let turn = orchestrator
        .run_turn("この画面どう？", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert!(turn.image_required);
    assert!(events.contains("locate_window:Viewer"));
    assert!(events.contains("capture:101"));
    let expected = format!(
        "generate_with_image:この画面どう？:{}",
        screenshot_path(dir.path()).display()
    );
    assert!(events.contains(&expected));
    assert!(turn.timings.get(Phase::Screenshot).is_some());

    // Voice turns follow the frontmost window instead of the bound one.
    orchestrator.run_turn("これは何？", InputMode::Voice).await?;
    assert!(events.contains("frontmost_window"));
    assert!(events.contains("capture:front"));
    assert_eq!(events.count("locate_window:"), 1);
    Ok(())
}

#[tokio::test]
async fn failed_capture_falls_back_to_text_generation() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.image_answer = Some("必要".to_string());
    harness.screen = FakeScreen::new(events.clone(), false);
    let orchestrator = harness.build(dir.path());

    let turn = orchestrator
        .run_turn("見て", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert!(turn.image_required);
    assert_eq!(events.count("generate_with_image"), 0);
    assert!(events.contains("generate:見て"));
    Ok(())
}

#[tokio::test]
async fn failed_synthesis_skips_the_voice_trigger() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.synth_ok = false;
    harness.ai.translation = None;
    let orchestrator = harness.build(dir.path());

    let turn = orchestrator
        .run_turn("歌って", InputMode::Manual)
        .await?
        .ok_or("turn skipped")?;
    assert!(turn.voice_path.is_none());
    assert!(turn.dispatch.voice.is_none());
    assert_eq!(turn.translation, "");
    assert_eq!(events.count("voice"), 0);
    assert!(events.position("avatar_subtitle:").is_some());
    Ok(())
}

#[tokio::test]
async fn generation_failure_aborts_before_dispatch() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.response = None;
    let orchestrator = harness.build(dir.path());

    let result = orchestrator.run_turn("ねえ", InputMode::Manual).await;
    assert!(matches!(result, Err(TurnError::Generation(_))));
    assert_eq!(events.count("translate:"), 0);
    assert_eq!(events.count("subtitle:"), 0);
    assert_eq!(events.count("expression:"), 0);
    Ok(())
}

#[tokio::test]
async fn blank_input_depends_on_mode() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    assert!(matches!(
        orchestrator.run_turn("  ", InputMode::Manual).await,
        Err(TurnError::EmptyInput)
    ));
    assert!(orchestrator.run_turn("", InputMode::Voice).await?.is_none());
    assert!(events.snapshot().is_empty());
    Ok(())
}

#[tokio::test]
async fn greeting_scores_mood_without_user_text() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    let turn = orchestrator.run_greeting().await?;
    assert_eq!(turn.kind, TurnKind::Greeting);
    assert!(turn.prompt.starts_with("【現在時刻は"));
    assert!(turn.prompt.ends_with("ユーザーに挨拶してください。】"));
    assert!(events.contains("score_mood:"));
    assert_eq!(events.count("image_requirement:"), 0);
    assert!(turn.timings.get(Phase::Intent).is_none());

    let notice = orchestrator.run_timer_notice(3.0).await?;
    assert_eq!(notice.kind, TurnKind::TimerNotice);
    assert_eq!(notice.prompt, "タイマーが終了しました。終了のお知らせをしてください。");
    Ok(())
}

#[tokio::test]
async fn concurrent_turns_are_serialized() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.generation_delay = Duration::from_millis(40);
    let orchestrator = Arc::new(harness.build(dir.path()));

    let first = orchestrator.clone();
    let second = orchestrator.clone();
    let (a, b) = tokio::join!(
        async move { first.run_turn("ひとつめ", InputMode::Manual).await },
        async move { second.run_turn("ふたつめ", InputMode::Manual).await },
    );
    a?;
    b?;

    // Each generation is followed by that turn's dispatch before the next one starts.
    let markers: Vec<String> = events
        .snapshot()
        .into_iter()
        .filter(|e| e.starts_with("generate:") || e.starts_with("avatar_subtitle:"))
        .map(|e| e.split(':').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        markers,
        ["generate", "avatar_subtitle", "generate", "avatar_subtitle"]
    );
    Ok(())
}

#[tokio::test]
async fn reset_restores_the_resting_pose() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    let report = orchestrator.reset_avatar().await;
    assert!(report.all_delivered());
    assert_eq!(
        events.snapshot(),
        ["subtitle: ", "expression:normal", "mood:50"]
    );
    Ok(())
}
