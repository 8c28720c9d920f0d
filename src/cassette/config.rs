//! Locating the per-port cassettes of a recorded session.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;
use super::CassetteError;

/// File name of the directory port cassette inside a session directory.
pub const DIRECTORY_CASSETTE: &str = "directory.cassette.yaml";

/// File name of the backend port cassette inside a session directory.
pub const BACKEND_CASSETTE: &str = "backend.cassette.yaml";

/// Per-port cassette file paths. Ports without a cassette answer every
/// call with an error during replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CassetteConfig {
    /// Path to the directory port cassette.
    pub directory: Option<PathBuf>,
    /// Path to the backend port cassette.
    pub backend: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
#[derive(Debug)]
pub struct PortReplayers {
    /// Replayer for the directory port.
    pub directory: Option<CassetteReplayer>,
    /// Replayer for the backend port.
    pub backend: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Uses whichever port cassettes exist in a recorded session directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not a directory.
    pub fn from_session_dir(dir: &Path) -> Result<Self, CassetteError> {
        if !dir.is_dir() {
            return Err(CassetteError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "not a session directory",
                ),
            });
        }
        let existing = |file: &str| Some(dir.join(file)).filter(|path| path.is_file());
        Ok(Self {
            directory: existing(DIRECTORY_CASSETTE),
            backend: existing(BACKEND_CASSETTE),
        })
    }

    /// Loads all configured cassette files.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, CassetteError> {
        let load = |path: &PathBuf| Cassette::load(path).map(|c| CassetteReplayer::new(&c));
        Ok(PortReplayers {
            directory: self.directory.as_ref().map(load).transpose()?,
            backend: self.backend.as_ref().map(load).transpose()?,
        })
    }
}
