//! Replays recorded interactions from a cassette.

use std::collections::HashMap;

use super::format::{Cassette, Interaction};
use super::CassetteError;

/// Key for indexing interactions by port and method.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct PortMethodKey {
    port: String,
    method: String,
}

/// Serves interactions from a loaded cassette, in recorded order per
/// port/method pair.
///
/// Each replayed call must present the same input that was recorded, so a
/// replay against a changed configuration fails instead of silently
/// answering a different question.
#[derive(Debug)]
pub struct CassetteReplayer {
    queues: HashMap<PortMethodKey, Vec<Interaction>>,
    cursors: HashMap<PortMethodKey, usize>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<PortMethodKey, Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = PortMethodKey {
                port: interaction.port.clone(),
                method: interaction.method.clone(),
            };
            queues.entry(key).or_default().push(interaction.clone());
        }
        Self {
            queues,
            cursors: HashMap::new(),
        }
    }

    /// Returns the recorded output of the next `port::method` interaction.
    ///
    /// # Errors
    ///
    /// Returns [`CassetteError::Exhausted`] when no interaction is left for
    /// the pair and [`CassetteError::InputMismatch`] when `input` differs
    /// from the recorded input. A mismatched interaction is not consumed.
    pub fn next_output(
        &mut self,
        port: &str,
        method: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, CassetteError> {
        let key = PortMethodKey {
            port: port.to_string(),
            method: method.to_string(),
        };
        let queue = self.queues.get(&key).map(Vec::as_slice).unwrap_or_default();
        let cursor = self.cursors.entry(key).or_insert(0);

        let interaction = queue.get(*cursor).ok_or_else(|| CassetteError::Exhausted {
            port: port.to_string(),
            method: method.to_string(),
            recorded: queue.len(),
        })?;

        if interaction.input != *input {
            return Err(CassetteError::InputMismatch {
                port: port.to_string(),
                method: method.to_string(),
                seq: interaction.seq,
                recorded: interaction.input.clone(),
                actual: input.clone(),
            });
        }

        *cursor += 1;
        Ok(interaction.output.clone())
    }

    /// Number of interactions not yet replayed, across all pairs.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues
            .iter()
            .map(|(key, queue)| queue.len() - self.cursors.get(key).copied().unwrap_or(0))
            .sum()
    }
}
