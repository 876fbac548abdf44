use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use aituber_backend::interface::{CommandScreenshot, HttpAvatarClient, NoopAvatar};
use aituber_backend::service::ai::{init_prompts, DefaultAiPort, GeminiServices, SpeechSynthesizer, WhisperCapture};
use aituber_backend::service::session::{
    select_input_mode, spawn_input_reader, turn_channel, InputSource, ModeSelection, SessionLoop,
    TurnRequest, TURN_QUEUE_CAPACITY,
};
use aituber_backend::service::skills::{build_prompt, load_catalogue, HttpSkills, SkillDispatcher};
use aituber_backend::service::Orchestrator;
use aituber_backend::shared::config;
use aituber_backend::shared::entities::InputMode;
use aituber_backend::shared::logging;
use aituber_backend::shared::ports::avatar::{AvatarPort, SubtitlePort};

const MODE_PROMPT: &str = "手入力:0 音声認識:1 ";

/// Builds the runtime by hand so a stdin read still blocked at exit does not
/// keep the process alive.
fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn run() -> anyhow::Result<()> {
    logging::init();
    init_prompts();

    let ai_cfg = config::ai_config();
    let catalogue = load_catalogue(ai_cfg.task_definitions_path.as_deref());
    log::info!("[main] {} skill tasks loaded", catalogue.len());
    let gemini = GeminiServices::from_config(build_prompt(&catalogue))?;
    let tts = SpeechSynthesizer::from_config()?;
    let ai = Arc::new(DefaultAiPort::new(gemini.clone(), tts));

    let (avatar, subtitle): (Arc<dyn AvatarPort>, Arc<dyn SubtitlePort>) =
        if config::avatar_config().enabled {
            let client = Arc::new(HttpAvatarClient::connect().await?);
            (client.clone() as Arc<dyn AvatarPort>, client as Arc<dyn SubtitlePort>)
        } else {
            log::info!("[main] avatar control disabled");
            let noop = Arc::new(NoopAvatar::new());
            (noop.clone() as Arc<dyn AvatarPort>, noop as Arc<dyn SubtitlePort>)
        };

    let (tx, rx) = turn_channel(TURN_QUEUE_CAPACITY);
    let skills = SkillDispatcher::new(Arc::new(gemini), Arc::new(HttpSkills::from_config()?))
        .with_timer_queue(tx.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        ai,
        avatar,
        subtitle,
        Arc::new(CommandScreenshot::from_config()),
        skills,
    ));

    orchestrator.reset_avatar().await;

    let selection =
        select_input_mode(&orchestrator, read_mode(), tokio::signal::ctrl_c()).await?;
    let mode = match selection {
        ModeSelection::Selected(mode) => mode,
        ModeSelection::Interrupted => return Ok(()),
    };
    log::info!("[main] input mode: {}", mode.as_str());

    let source = match mode {
        InputMode::Manual => {
            orchestrator.bind_window().await;
            InputSource::stdin()
        }
        InputMode::Voice => InputSource::Voice(Arc::new(WhisperCapture::from_config()?)),
    };

    tx.send(TurnRequest::Greeting)
        .await
        .context("turn queue closed before the greeting")?;
    let session = SessionLoop::new(orchestrator, rx);
    let reader = spawn_input_reader(
        source,
        tx,
        session.turn_done(),
        config::session_config().quit_token.clone(),
    );

    let exit = session.run().await;
    reader.abort();
    log::info!("[main] session finished ({:?})", exit);
    Ok(())
}

async fn read_mode() -> anyhow::Result<String> {
    tokio::task::spawn_blocking(|| {
        print!("{}", MODE_PROMPT);
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok::<_, std::io::Error>(line)
    })
    .await
    .context("mode prompt task failed")?
    .context("failed to read input mode")
}
