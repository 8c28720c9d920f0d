//! Recording and replay sessions managing one cassette per port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use super::config::{CassetteConfig, BACKEND_CASSETTE, DIRECTORY_CASSETTE};
use super::recorder::CassetteRecorder;
use super::replayer::CassetteReplayer;
use super::CassetteError;

/// Manages one `CassetteRecorder` per port for a recording session.
///
/// All cassettes of a session are stored in a timestamped directory under
/// the requested root.
pub struct RecordingSession {
    /// Recorder for directory interactions.
    pub directory: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for backend interactions.
    pub backend: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates `<root>/<timestamp>/` and a recorder for each port.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory already exists or cannot
    /// be created.
    pub fn new(root: &Path) -> Result<Self, CassetteError> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = root.join(&timestamp);

        if output_dir.exists() {
            return Err(CassetteError::AlreadyExists(output_dir));
        }
        std::fs::create_dir_all(&output_dir).map_err(|source| CassetteError::Io {
            path: output_dir.clone(),
            source,
        })?;

        let make_recorder = |file: &str, port: &str| {
            let name = format!("{timestamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(output_dir.join(file), name)))
        };

        Ok(Self {
            directory: make_recorder(DIRECTORY_CASSETTE, "directory"),
            backend: make_recorder(BACKEND_CASSETTE, "backend"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every cassette and returns the session directory.
    ///
    /// The recording adapters must have been dropped first. A port that saw
    /// no calls still gets an (empty) cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorder is still shared or a file cannot be
    /// written.
    pub fn finish(self) -> Result<PathBuf, CassetteError> {
        fn finish_one(
            arc: Arc<Mutex<CassetteRecorder>>,
            port: &'static str,
        ) -> Result<(), CassetteError> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| CassetteError::StillShared(port))?
                .into_inner()
                // A poisoned recorder still holds every completed interaction.
                .unwrap_or_else(PoisonError::into_inner);
            if recorder.is_empty() {
                warn!(port, "No interactions recorded");
            } else {
                debug!(port, interactions = recorder.len(), "Writing cassette");
            }
            recorder.finish()?;
            Ok(())
        }

        finish_one(self.directory, "directory")?;
        finish_one(self.backend, "backend")?;
        Ok(self.output_dir)
    }
}

/// Shared replayers for a replay run, one per port with a cassette.
///
/// The replaying adapters hold clones of these handles; after the pass the
/// session reports recorded interactions that were never asked for.
#[derive(Debug, Default)]
pub struct ReplaySession {
    /// Replayer for the directory port, if its cassette exists.
    pub directory: Option<Arc<Mutex<CassetteReplayer>>>,
    /// Replayer for the backend port, if its cassette exists.
    pub backend: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplaySession {
    /// Loads every cassette named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured cassette cannot be read or parsed.
    pub fn load(config: &CassetteConfig) -> Result<Self, CassetteError> {
        let replayers = config.load_all()?;
        let share = |replayer| Arc::new(Mutex::new(replayer));
        Ok(Self {
            directory: replayers.directory.map(share),
            backend: replayers.backend.map(share),
        })
    }

    /// Ports that still have recorded interactions, with how many are left.
    #[must_use]
    pub fn unconsumed(&self) -> Vec<(&'static str, usize)> {
        [("directory", &self.directory), ("backend", &self.backend)]
            .into_iter()
            .filter_map(|(port, replayer)| {
                let replayer = replayer.as_ref()?;
                let remaining = replayer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remaining();
                (remaining > 0).then_some((port, remaining))
            })
            .collect()
    }
}
