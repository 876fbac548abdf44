mod support;

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use aituber_backend::service::session::{
    select_input_mode, spawn_input_reader, turn_channel, InputSource, LoopExit, ModeSelection,
    SessionLoop, TurnRequest,
};
use aituber_backend::shared::entities::InputMode;

use support::{Events, FixedIntent, Harness};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const TIMER_PROMPT: &str = "generate:タイマーが終了しました。終了のお知らせをしてください。";

#[tokio::test]
async fn farewell_ends_the_session_after_grace() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Arc::new(Harness::new(&events).build(dir.path()));
    let (tx, rx) = turn_channel(8);

    tx.send(TurnRequest::User {
        text: "もう寝るね、さよなら".to_string(),
        mode: InputMode::Manual,
    })
    .await?;
    let started = Instant::now();
    let exit = SessionLoop::new(orchestrator, rx).run().await;

    assert_eq!(exit, LoopExit::Farewell);
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(events.contains("generate:もう寝るね、さよなら"));
    let tail: Vec<String> = events.snapshot().into_iter().rev().take(3).rev().collect();
    assert_eq!(tail, ["subtitle: ", "expression:normal", "mood:50"]);
    Ok(())
}

#[tokio::test]
async fn scripted_requests_run_in_queue_order() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Arc::new(Harness::new(&events).build(dir.path()));
    let (tx, rx) = turn_channel(8);

    tx.send(TurnRequest::Greeting).await?;
    tx.send(TurnRequest::TimerFinished { minutes: 1.0 }).await?;
    tx.send(TurnRequest::Shutdown).await?;
    tx.send(TurnRequest::User {
        text: "届かない".to_string(),
        mode: InputMode::Manual,
    })
    .await?;

    let exit = SessionLoop::new(orchestrator, rx).run().await;
    assert_eq!(exit, LoopExit::Shutdown);

    let greeting = events.position("generate:【現在時刻は").ok_or("no greeting")?;
    let timer = events.position(TIMER_PROMPT).ok_or("no timer notice")?;
    assert!(greeting < timer);
    assert!(!events.contains("generate:届かない"));
    Ok(())
}

#[tokio::test]
async fn generation_failure_keeps_the_loop_alive() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let mut harness = Harness::new(&events);
    harness.ai.response = None;
    let orchestrator = Arc::new(harness.build(dir.path()));
    let (tx, rx) = turn_channel(8);

    for text in ["一回目", "二回目"] {
        tx.send(TurnRequest::User {
            text: text.to_string(),
            mode: InputMode::Manual,
        })
        .await?;
    }
    drop(tx);

    let exit = SessionLoop::new(orchestrator, rx).run().await;
    assert_eq!(exit, LoopExit::QueueClosed);
    assert!(events.contains("generate:一回目"));
    assert!(events.contains("generate:二回目"));
    assert!(events.contains("expression:normal"));
    Ok(())
}

#[tokio::test]
async fn timer_skill_reenters_through_the_queue() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let (tx, rx) = turn_channel(8);
    let mut harness = Harness::new(&events);
    harness.intent = FixedIntent::answering(
        r#"{"status":"matched","task_name":"set_timer","fields":{"time":"0.001"}}"#,
    );
    harness.timers = Some(tx.clone());
    let orchestrator = Arc::new(harness.build(dir.path()));

    let session = tokio::spawn(SessionLoop::new(orchestrator, rx).run());
    tx.send(TurnRequest::User {
        text: "タイマーをセットして".to_string(),
        mode: InputMode::Manual,
    })
    .await?;

    tokio::time::timeout(Duration::from_secs(5), async {
        while !events.contains(TIMER_PROMPT) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    tx.send(TurnRequest::Shutdown).await?;

    assert_eq!(session.await?, LoopExit::Shutdown);
    let user_turn = events
        .position("generate:【")
        .ok_or("timer hint missing from prompt")?;
    let notice = events.position(TIMER_PROMPT).ok_or("no timer notice")?;
    assert!(user_turn < notice);
    Ok(())
}

#[tokio::test]
async fn typed_input_drives_the_loop_until_quit() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Arc::new(Harness::new(&events).build(dir.path()));
    let (tx, rx) = turn_channel(8);

    let session = SessionLoop::new(orchestrator, rx);
    let source = InputSource::Lines(Box::new(Cursor::new(
        "おはよう\n元気？\nq\nこれは読まれない\n".as_bytes().to_vec(),
    )));
    assert_eq!(source.mode(), InputMode::Manual);
    let reader = spawn_input_reader(source, tx, session.turn_done(), "q".to_string());

    assert_eq!(session.run().await, LoopExit::Shutdown);
    reader.await?;
    assert!(events.contains("generate:おはよう"));
    assert!(events.contains("generate:元気？"));
    assert!(!events.contains("generate:これは読まれない"));
    assert!(events.position("generate:おはよう") < events.position("generate:元気？"));
    Ok(())
}

#[tokio::test]
async fn interrupt_at_mode_prompt_resets_the_avatar() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    let never_answered = std::future::pending::<anyhow::Result<String>>();
    let selection = select_input_mode(&orchestrator, never_answered, async {
        Ok::<(), std::io::Error>(())
    })
    .await?;

    assert_eq!(selection, ModeSelection::Interrupted);
    assert_eq!(
        events.snapshot(),
        ["subtitle: ", "expression:normal", "mood:50"]
    );
    Ok(())
}

#[tokio::test]
async fn unsupported_mode_resets_then_fails() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    let result = select_input_mode(
        &orchestrator,
        async { Ok::<_, anyhow::Error>("2\n".to_string()) },
        std::future::pending::<std::io::Result<()>>(),
    )
    .await;

    assert!(result.is_err());
    assert!(events.contains("expression:normal"));
    assert!(events.contains("mood:50"));
    Ok(())
}

#[tokio::test]
async fn valid_mode_leaves_the_avatar_alone() -> TestResult {
    let dir = tempdir()?;
    let events = Events::default();
    let orchestrator = Harness::new(&events).build(dir.path());

    let selection = select_input_mode(
        &orchestrator,
        async { Ok::<_, anyhow::Error>("1\n".to_string()) },
        std::future::pending::<std::io::Result<()>>(),
    )
    .await?;

    assert_eq!(selection, ModeSelection::Selected(InputMode::Voice));
    assert!(events.snapshot().is_empty());
    Ok(())
}
