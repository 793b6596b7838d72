use std::sync::Mutex;

use anyhow::{anyhow, Result};

pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Keeps the last copied text. Stands in for a system clipboard in headless
/// runs and tests.
#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ClipboardWriter for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| anyhow!("clipboard buffer poisoned"))?;
        *guard = Some(text.to_string());
        Ok(())
    }
}

pub struct MissingClipboard;

impl ClipboardWriter for MissingClipboard {
    fn write_text(&self, _text: &str) -> Result<()> {
        Err(anyhow!("clipboard is unavailable"))
    }
}
