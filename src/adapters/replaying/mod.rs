//! Replaying adapters that answer port calls from recorded cassettes.

pub mod backend;
pub mod directory;

pub use backend::ReplayingBackend;
pub use directory::ReplayingDirectory;

use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::CassetteError;

/// Replays the next `port::method` interaction as the port's `Result`.
///
/// Mirror of `recording::record_result`: the input is encoded the same way
/// it was recorded and the stored `{"Ok": ..}` / `{"Err": ..}` output is
/// decoded back into `Result<T, E>`.
pub(crate) fn replay_result<I, T, E>(
    replayer: Option<&Mutex<CassetteReplayer>>,
    port: &'static str,
    method: &str,
    input: &I,
) -> Result<Result<T, E>, CassetteError>
where
    I: Serialize,
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    let decode_error = |message: String| CassetteError::Decode {
        port: port.to_string(),
        method: method.to_string(),
        message,
    };

    let replayer = replayer.ok_or(CassetteError::Unconfigured(port))?;
    let input = serde_json::to_value(input)
        .map_err(|e| decode_error(e.to_string()))?;
    let output = {
        let mut guard = replayer
            .lock()
            .map_err(|_| decode_error("replayer lock poisoned".into()))?;
        guard.next_output(port, method, &input)?
    };
    serde_json::from_value(output)
        .map_err(|e| decode_error(e.to_string()))
}
