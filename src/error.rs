use std::path::PathBuf;

/// Errors that can abort a run. The tool is a measurement instrument: any of
/// these invalidates the measurement, so none are recovered internally.
#[derive(thiserror::Error, Debug)]
pub enum GunError {
    #[error("can't open ammo file {path}: {source}")]
    AmmoOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't read bullet header at offset {offset} in {path}: {source}")]
    BulletHeaderRead {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse bullet length at offset {offset} in {path}: {source}")]
    BulletLength {
        path: PathBuf,
        offset: u64,
        #[source]
        source: IntError,
    },

    #[error("truncated bullet at offset {offset} in {path}: expected {expected} bytes, got {got}")]
    BulletTruncated {
        path: PathBuf,
        offset: u64,
        expected: usize,
        got: usize,
    },

    #[error("can't parse HTTP request for bullet {index} in {path}: {reason}")]
    BulletMalformed {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error(
        "ammo file {path} contains {have} requests, but {need} are needed to produce \
         {low}->{high} RPS load over {duration:?}; generate more bullets or pass --cycle"
    )]
    Shortfall {
        path: PathBuf,
        have: usize,
        need: usize,
        low: f64,
        high: f64,
        duration: std::time::Duration,
    },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid target {0}: {1}")]
    InvalidTarget(String, #[source] url::ParseError),
}

/// Mirrors the integer-parsing laws of the ammo bullet-length header.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntError {
    #[error("empty integer")]
    Empty,
    #[error("unexpected first char found, expecting 0-9")]
    UnexpectedFirstChar,
    #[error("unexpected trailing char found, expecting 0-9")]
    UnexpectedTrailingChar,
    #[error("too long int")]
    TooLong,
}
