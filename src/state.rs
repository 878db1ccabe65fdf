use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The sole persisted record: number of the upcoming call plus the agenda
/// topics proposed for it. Stored as one human-editable JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallState {
    pub call_number: u32,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Default for CallState {
    fn default() -> Self {
        Self {
            call_number: 9,
            topics: Vec::new(),
        }
    }
}

/// Load-modify-save store for [`CallState`]. Every read loads the full file,
/// every write replaces it. Single process, a handful of writes per week —
/// no locking.
pub struct CallStateStore {
    path: PathBuf,
}

impl CallStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A missing file is not an error (defaults apply, nothing is created).
    /// An unparsable file is: the operator must repair or delete it rather
    /// than have the bot silently discard proposed topics.
    pub fn load(&self) -> Result<CallState> {
        if !self.path.exists() {
            return Ok(CallState::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read call state: {}", self.path.display()))?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "Corrupt call state file {} — repair or delete it",
                self.path.display()
            )
        })
    }

    pub fn save(&self, state: &CallState) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, &json)
            .with_context(|| format!("Failed to write call state: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace call state: {}", self.path.display()))?;
        Ok(())
    }

    pub fn next_call_number(&self) -> Result<u32> {
        Ok(self.load()?.call_number)
    }

    /// The one compound mutation: bump the counter and clear the agenda in a
    /// single save, so no intermediate state ever hits disk.
    pub fn advance_after_publish(&self) -> Result<u32> {
        let mut state = self.load()?;
        state.call_number += 1;
        state.topics.clear();
        self.save(&state)?;
        Ok(state.call_number)
    }

    pub fn add_topic(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("Topic text must not be empty");
        }
        let mut state = self.load()?;
        state.topics.push(text.to_string());
        self.save(&state)
    }

    pub fn set_call_number(&self, n: u32) -> Result<()> {
        if n == 0 {
            anyhow::bail!("Call number must be positive");
        }
        let mut state = self.load()?;
        state.call_number = n;
        self.save(&state)
    }
}
