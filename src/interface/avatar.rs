use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::shared::config::{self, AvatarConfig};
use crate::shared::entities::{AvatarOutcome, Emotion};
use crate::shared::ports::avatar::{AvatarFuture, AvatarPort, SubtitlePort};

#[derive(Clone, Debug, Default)]
pub struct NoopAvatar;

impl NoopAvatar {
    pub fn new() -> Self {
        Self
    }
}

impl AvatarPort for NoopAvatar {
    fn set_expression(&self, _expression: String) -> AvatarFuture {
        Box::pin(async move { AvatarOutcome::Disabled })
    }

    fn play_motion(&self, _emotion: String) -> AvatarFuture {
        Box::pin(async move { AvatarOutcome::Disabled })
    }

    fn set_mood(&self, _mood: u8) -> AvatarFuture {
        Box::pin(async move { AvatarOutcome::Disabled })
    }

    fn play_voice(&self) -> AvatarFuture {
        Box::pin(async move { AvatarOutcome::Disabled })
    }

    fn send_subtitle(&self, _japanese: String, _english: String) -> AvatarFuture {
        Box::pin(async move { AvatarOutcome::Disabled })
    }
}

impl SubtitlePort for NoopAvatar {
    fn update_subtitle(&self, _text: String) -> AvatarFuture {
        Box::pin(async move { AvatarOutcome::Disabled })
    }
}

/// Client for the avatar control server. Reachability is probed once; calls
/// against a server that failed the probe short-circuit to `Unreachable`.
#[derive(Clone)]
pub struct HttpAvatarClient {
    client: Client,
    base_url: String,
    enabled: bool,
    probe_timeout: Duration,
    available: Arc<AtomicBool>,
}

impl HttpAvatarClient {
    pub fn new(cfg: &AvatarConfig, timeout: Duration, probe_timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            enabled: cfg.enabled,
            probe_timeout,
            available: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Builds the client from `avatar_config()` and probes the server.
    pub async fn connect() -> Result<Self, reqwest::Error> {
        let timeouts = config::timeouts();
        let client = Self::new(config::avatar_config(), timeouts.avatar_http, timeouts.avatar_probe)?;
        client.probe().await;
        Ok(client)
    }

    /// `GET /`; only a 2xx answer counts as available.
    pub async fn probe(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let ok = self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false);
        self.available.store(ok, Ordering::SeqCst);
        if ok {
            log::info!("[avatar] control server reachable at {}", self.base_url);
        } else {
            log::warn!(
                "[avatar] control server not reachable at {}; avatar calls will be skipped",
                self.base_url
            );
        }
        ok
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn post(&self, path: &'static str, body: Value) -> AvatarFuture {
        let this = self.clone();
        Box::pin(async move {
            if !this.enabled {
                return AvatarOutcome::Disabled;
            }
            if !this.is_available() {
                return AvatarOutcome::Unreachable("avatar server unavailable".to_string());
            }
            let url = format!("{}{}", this.base_url, path);
            match this.client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => AvatarOutcome::Delivered,
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    log::warn!("[avatar] {} rejected with {}", path, status);
                    AvatarOutcome::Rejected(status)
                }
                Err(err) => {
                    log::warn!("[avatar] {} failed: {}", path, err);
                    AvatarOutcome::Unreachable(err.to_string())
                }
            }
        })
    }
}

fn canonical_label(label: &str) -> Emotion {
    Emotion::from_label(label).unwrap_or_default()
}

impl AvatarPort for HttpAvatarClient {
    fn set_expression(&self, expression: String) -> AvatarFuture {
        let emotion = canonical_label(&expression);
        self.post("/expression", serde_json::json!({ "expression": emotion.as_str() }))
    }

    fn play_motion(&self, emotion: String) -> AvatarFuture {
        let emotion = canonical_label(&emotion);
        self.post(
            "/vrm/motion",
            serde_json::json!({ "emotion": emotion.as_str(), "motion": emotion.motion_clip() }),
        )
    }

    fn set_mood(&self, mood: u8) -> AvatarFuture {
        self.post("/mood", serde_json::json!({ "mood_value": mood.min(100) }))
    }

    fn play_voice(&self) -> AvatarFuture {
        self.post("/voice", serde_json::json!({ "action": "play" }))
    }

    fn send_subtitle(&self, japanese: String, english: String) -> AvatarFuture {
        self.post(
            "/subtitle",
            serde_json::json!({ "japanese": japanese, "english": english }),
        )
    }
}

impl SubtitlePort for HttpAvatarClient {
    fn update_subtitle(&self, text: String) -> AvatarFuture {
        self.post("/subtitle", serde_json::json!({ "text": text }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn config_for(base_url: String) -> AvatarConfig {
        AvatarConfig {
            enabled: true,
            base_url,
        }
    }

    /// Reads one request: headers plus a `Content-Length` body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let Some(split) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&data[..split]).to_string();
            let body_len = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= split + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    /// Answers the `GET /` probe with `probe_status` and every other request
    /// with `status`, recording what was sent.
    async fn spawn_server(probe_status: u16, status: u16) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                let code = if request.starts_with("GET / ") {
                    probe_status
                } else {
                    status
                };
                log.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    code
                );
                let _ = socket.write_all(reply.as_bytes()).await;
            }
        });
        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn unreachable_server_short_circuits() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpAvatarClient::new(
            &config_for(format!("http://{}", addr)),
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(!client.probe().await);
        let outcome = client.set_expression("happy".to_string()).await;
        assert!(matches!(outcome, AvatarOutcome::Unreachable(_)));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn delivered_and_rejected_outcomes() {
        let (url, seen) = spawn_server(200, 200).await;
        let client = HttpAvatarClient::new(&config_for(url), Duration::from_secs(2), Duration::from_secs(1)).unwrap();
        assert!(client.probe().await);
        assert_eq!(client.play_motion("smile".to_string()).await, AvatarOutcome::Delivered);
        let heads = seen.lock().unwrap().clone();
        assert!(heads.iter().any(|h| h.starts_with("POST /vrm/motion")));
        assert!(heads.iter().any(|h| h.contains("\"motion\":\"Clapping\"")));

        let (url, _) = spawn_server(200, 500).await;
        let client = HttpAvatarClient::new(&config_for(url), Duration::from_secs(2), Duration::from_secs(1)).unwrap();
        assert!(client.probe().await);
        assert_eq!(client.set_mood(70).await, AvatarOutcome::Rejected(500));
    }

    #[tokio::test]
    async fn error_status_on_probe_means_unavailable() {
        let (url, seen) = spawn_server(404, 200).await;
        let client = HttpAvatarClient::new(&config_for(url), Duration::from_secs(2), Duration::from_secs(1)).unwrap();
        assert!(!client.probe().await);
        assert!(!client.is_available());
        let outcome = client.set_expression("happy".to_string()).await;
        assert!(matches!(outcome, AvatarOutcome::Unreachable(_)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_client_never_calls_out() {
        let cfg = AvatarConfig {
            enabled: false,
            base_url: "http://127.0.0.1:9".to_string(),
        };
        let client = HttpAvatarClient::new(&cfg, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        assert!(!client.probe().await);
        assert_eq!(client.play_voice().await, AvatarOutcome::Disabled);
    }

    #[test]
    fn noop_avatar_reports_disabled() {
        let avatar = NoopAvatar::new();
        let outcome = tokio_test::block_on(avatar.update_subtitle(" ".to_string()));
        assert_eq!(outcome, AvatarOutcome::Disabled);
    }
}
