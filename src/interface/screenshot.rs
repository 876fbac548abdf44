use std::path::PathBuf;
use std::time::Duration;

use crate::shared::config::{self, ScreenshotConfig};
use crate::shared::ports::screenshot::{ScreenshotFuture, ScreenshotPort, WindowRef};
use crate::shared::utils::fill_template;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Screen capture through shell command templates (`screencapture` on macOS by default).
#[derive(Clone, Debug)]
pub struct CommandScreenshot {
    capture_command: String,
    fullscreen_command: String,
    window_lookup_command: Option<String>,
    frontmost_command: Option<String>,
}

impl CommandScreenshot {
    pub fn from_config() -> Self {
        Self::new(config::screenshot_config())
    }

    pub fn new(cfg: &ScreenshotConfig) -> Self {
        Self {
            capture_command: cfg.capture_command.clone(),
            fullscreen_command: cfg.fullscreen_command.clone(),
            window_lookup_command: cfg.window_lookup_command.clone(),
            frontmost_command: cfg.frontmost_command.clone(),
        }
    }
}

async fn run_shell(command: &str) -> Option<std::process::Output> {
    let run = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(COMMAND_TIMEOUT, run).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(err)) => {
            log::warn!("[screenshot] failed to spawn command: {}", err);
            None
        }
        Err(_) => {
            log::warn!("[screenshot] command timed out after {:?}", COMMAND_TIMEOUT);
            None
        }
    }
}

/// First non-empty stdout line of a successful command.
async fn window_from_command(command: String) -> Option<WindowRef> {
    let output = run_shell(&command).await?;
    if !output.status.success() {
        log::warn!("[screenshot] window lookup exited with {}", output.status);
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| WindowRef(line.to_string()))
}

impl ScreenshotPort for CommandScreenshot {
    fn locate_window(&self, app_name: String) -> ScreenshotFuture<Option<WindowRef>> {
        let template = self.window_lookup_command.clone();
        Box::pin(async move {
            let template = template?;
            let found = window_from_command(fill_template(&template, &[("app", app_name.as_str())])).await;
            if found.is_none() {
                log::info!("[screenshot] no window found for {}", app_name);
            }
            found
        })
    }

    fn frontmost_window(&self) -> ScreenshotFuture<Option<WindowRef>> {
        let template = self.frontmost_command.clone();
        Box::pin(async move { window_from_command(template?).await })
    }

    fn capture(&self, window: Option<WindowRef>, path: PathBuf) -> ScreenshotFuture<bool> {
        let this = self.clone();
        Box::pin(async move {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                if let Err(err) = tokio::fs::create_dir_all(dir).await {
                    log::warn!("[screenshot] failed to create {}: {}", dir.display(), err);
                    return false;
                }
            }
            let _ = tokio::fs::remove_file(&path).await;
            let path_str = path.to_string_lossy().to_string();
            let command = match &window {
                Some(window) => fill_template(
                    &this.capture_command,
                    &[("window", window.0.as_str()), ("path", path_str.as_str())],
                ),
                None => fill_template(&this.fullscreen_command, &[("path", path_str.as_str())]),
            };
            let Some(output) = run_shell(&command).await else {
                return false;
            };
            if !output.status.success() {
                log::warn!("[screenshot] capture exited with {}", output.status);
                return false;
            }
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.len() > 0 => true,
                _ => {
                    log::warn!("[screenshot] capture produced no file at {}", path.display());
                    false
                }
            }
        })
    }
}
