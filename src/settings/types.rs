use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::frame_loop::DEFAULT_REPORT_EVERY;
use crate::stream::server::DEFAULT_ADDR;
use crate::stream::slot::DEFAULT_SEND_TIMEOUT;

pub const REPLAY_VAR: &str = "HANDSTREAM_REPLAY";
pub const PREVIEW_VAR: &str = "HANDSTREAM_PREVIEW";
pub const STOP_KEY_VAR: &str = "HANDSTREAM_STOP_KEY";
pub const REPORT_EVERY_VAR: &str = "HANDSTREAM_REPORT_EVERY";

/// Runtime knobs. Defaults plus environment overrides; there is no config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    /// Recorded landmark file; the synthetic hand is used when unset.
    pub replay_path: Option<PathBuf>,
    /// Where the annotated preview JPEG goes; no preview when unset.
    pub preview_path: Option<PathBuf>,
    /// Watch stdin for the stop key while the preview is on.
    pub stop_key: bool,
    pub report_every: u64,
    /// How long one write may block before the client is dropped as stalled.
    pub send_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(DEFAULT_ADDR),
            replay_path: None,
            preview_path: None,
            stop_key: true,
            report_every: DEFAULT_REPORT_EVERY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl Settings {
    /// Defaults overridden by the `HANDSTREAM_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let stop_key = get(STOP_KEY_VAR)
            .map(|value| !matches!(value.trim(), "0" | "false"))
            .unwrap_or(defaults.stop_key);
        let report_every = match get(REPORT_EVERY_VAR) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("ignoring {REPORT_EVERY_VAR}={value}: not a frame count");
                defaults.report_every
            }),
            None => defaults.report_every,
        };

        Self {
            replay_path: get(REPLAY_VAR).map(PathBuf::from),
            preview_path: get(PREVIEW_VAR).map(PathBuf::from),
            stop_key,
            report_every,
            ..defaults
        }
    }
}
