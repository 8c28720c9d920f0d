//! Cassette format for recording and replaying port interactions.
//!
//! A live run started with `SYNC_RECORD=<dir>` writes one cassette per port.
//! Replaying those cassettes re-runs the sync offline against exactly the
//! directory and backend answers that were observed.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading, writing, or replaying cassettes.
#[derive(Debug, Error)]
pub enum CassetteError {
    /// A cassette file or directory could not be read or written.
    #[error("cassette I/O on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A cassette file is not valid YAML for the cassette format.
    #[error("failed to parse cassette {path}: {source}")]
    Parse {
        /// Cassette file.
        path: PathBuf,
        /// YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A cassette could not be serialized.
    #[error("failed to encode cassette: {0}")]
    Encode(String),

    /// A recorded output does not match the port's return type.
    #[error("failed to decode recorded {port}::{method} output: {message}")]
    Decode {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Decoder error text.
        message: String,
    },

    /// The recording session directory already exists.
    #[error("cassette directory already exists: {0}")]
    AlreadyExists(PathBuf),

    /// A recorder was still shared when the session finished.
    #[error("recording adapter for {0} still has references")]
    StillShared(&'static str),

    /// Replay asked for an interaction the cassette does not have.
    #[error("cassette exhausted: no more {port}::{method} interactions (recorded {recorded})")]
    Exhausted {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// How many interactions for this pair the cassette held.
        recorded: usize,
    },

    /// Replay was asked a different question than the one recorded.
    #[error("{port}::{method} seq={seq} was recorded with input {recorded} but replayed with {actual}")]
    InputMismatch {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Sequence number of the recorded interaction.
        seq: u64,
        /// Recorded input.
        recorded: serde_json::Value,
        /// Input seen during replay.
        actual: serde_json::Value,
    },

    /// A port has no cassette loaded.
    #[error("no cassette loaded for port {0}")]
    Unconfigured(&'static str),
}
