use colorclock_types::DEFAULT_WINDOW_SECONDS;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TICK_MS: u64 = 1_000;
const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Countdown window `W` in seconds.
    pub window_seconds: u32,
    /// Interval between ticks in milliseconds.
    pub tick_ms: u64,
    /// SQLite database path; an in-memory store is used when unset.
    pub database_path: Option<PathBuf>,
    /// Start ticking at boot instead of waiting for `POST /start-timer`.
    pub start_clock: bool,
    pub http_body_limit_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            tick_ms: DEFAULT_TICK_MS,
            database_path: None,
            start_clock: false,
            http_body_limit_bytes: Some(DEFAULT_HTTP_BODY_LIMIT_BYTES),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.window_seconds == 0 {
            return Err("window_seconds must be greater than zero");
        }
        if self.tick_ms == 0 {
            return Err("tick_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}
