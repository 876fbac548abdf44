use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

pub type ScreenshotFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Window handle as understood by the capture backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRef(pub String);

impl fmt::Display for WindowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait ScreenshotPort: Send + Sync {
    fn locate_window(&self, app_name: String) -> ScreenshotFuture<Option<WindowRef>>;
    fn frontmost_window(&self) -> ScreenshotFuture<Option<WindowRef>>;
    /// `window = None` captures the whole screen. Returns whether a file was written.
    fn capture(&self, window: Option<WindowRef>, path: PathBuf) -> ScreenshotFuture<bool>;
}
