//! The CLI surface and shared run configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// A rate-paced HTTP/1.1 load generator that replays a recorded ammo corpus
/// against one target, driving the achieved request rate along a linear
/// ramp.
#[derive(Parser, Debug, Clone)]
#[command(name = "slinger", version, about, long_about = None)]
pub struct Args {
    /// Path to the .ammo file.
    #[arg(long = "ammo")]
    pub ammo: PathBuf,

    /// Target host:port.
    #[arg(long = "target", default_value = "127.0.0.1:80")]
    pub target: String,

    /// Send requests over https instead of http.
    #[arg(long = "tls")]
    pub tls: bool,

    /// Number of concurrent workers.
    #[arg(long = "w", default_value_t = 1000)]
    pub workers: usize,

    /// RPS to start the ramp at.
    #[arg(long = "low", default_value_t = 200.0)]
    pub low: f64,

    /// RPS to finish the ramp at.
    #[arg(long = "high", default_value_t = 2000.0)]
    pub high: f64,

    /// Total test duration.
    #[arg(long = "d", default_value = "120s", value_parser = parse_duration)]
    pub duration: Duration,

    /// Cycle the ammo corpus if it can't otherwise sustain the schedule.
    #[arg(long = "cycle")]
    pub cycle: bool,

    /// Per-request timeout.
    #[arg(long = "timeout", default_value = "2s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Log verbosity filter, e.g. "info", "debug", "slinger=trace". Falls
    /// back to `RUST_LOG` when unset.
    #[arg(long = "log-level", env = "RUST_LOG")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.target)
    }
}
