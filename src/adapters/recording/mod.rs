//! Recording adapters that capture interactions to cassettes.

pub mod backend;
pub mod directory;

pub use backend::RecordingBackend;
pub use directory::RecordingDirectory;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;

/// Records a port call and its full `Result`.
///
/// The result is stored with serde's externally tagged `Result` encoding
/// (`{"Ok": ..}` / `{"Err": ..}`) so replaying adapters can rebuild the
/// exact error type. Recording problems never fail the wrapped call.
pub(crate) fn record_result<I, T, E>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    I: Serialize,
    T: Serialize,
    E: Serialize,
{
    let encoded = serde_json::to_value(input)
        .and_then(|i| Ok((i, serde_json::to_value(result)?)));
    let (input_json, output_json) = match encoded {
        Ok(pair) => pair,
        Err(e) => {
            warn!(port, method, error = %e, "Skipping unrecordable interaction");
            return;
        }
    };

    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input_json, output_json),
        Err(_) => warn!(
            port,
            method,
            "Recorder lock poisoned, interaction not recorded"
        ),
    }
}
