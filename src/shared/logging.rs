use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Once;

use chrono::Local;

use crate::shared::config::{self, LogFormat, LogMode};

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn";

/// Installs the global logger on first call. Later calls are no-ops.
///
/// Output goes to stdout or `LOG_DIR/LOG_FILE_NAME` as text or JSON lines; a file
/// that cannot be opened falls back to stdout with a warning.
pub fn init() {
    INIT.call_once(|| {
        let mut deferred = Vec::new();
        let cfg = config::logging_config().clone();
        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(DEFAULT_FILTER),
        );

        let format = cfg.format.clone();
        builder.format(move |buf, record| {
            let ts = Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            match format {
                LogFormat::Json => {
                    let line = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", line)
                }
                LogFormat::Text => writeln!(buf, "{} {:<5} {}", ts, record.level(), record.args()),
            }
        });

        match (&cfg.mode, cfg.dir.as_ref()) {
            (LogMode::File, Some(dir)) => {
                if let Err(err) = std::fs::create_dir_all(dir) {
                    deferred.push(format!("[logging] failed to create log dir {}: {}", dir, err));
                }
                let path = std::path::Path::new(dir).join(&cfg.file_name);
                match OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(file) => {
                        builder.target(env_logger::Target::Pipe(Box::new(file)));
                    }
                    Err(err) => {
                        deferred.push(format!(
                            "[logging] failed to open log file ({}): {}",
                            path.display(),
                            err
                        ));
                        builder.target(env_logger::Target::Stdout);
                    }
                }
            }
            _ => {
                builder.target(env_logger::Target::Stdout);
            }
        }

        let _ = builder.try_init();
        for warning in deferred {
            log::warn!("{}", warning);
        }
    });
}
