//
// line_tokenizer.rs
//

//! A reference tokenizer collaborator (§6): buffer bytes, strip NULs,
//! split on CR, left-strip the remainder, emit non-empty stripped
//! lines. A trailing partial segment is held back and only flushed
//! after a short debounce of inactivity, so a single logical line that
//! arrives split across two transport packets isn't fragmented into two
//! tokens. Grounded in style on `vector`'s `DelayQueue`-based multi-line
//! aggregator (`line_agg.rs`): buffer-until-quiet rather than
//! buffer-until-delimiter alone.

use tokio::time::{Duration, Instant};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

pub struct LineTokenizer {
    buffer: Vec<u8>,
    pending_since: Option<Instant>,
    debounce: Duration,
}

impl LineTokenizer {
    pub fn new() -> Self {
        LineTokenizer {
            buffer: Vec::new(),
            pending_since: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        LineTokenizer { debounce, ..LineTokenizer::new() }
    }

    /// Appends `bytes` (NULs stripped) and returns every complete line
    /// found so far.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|&b| b != 0));

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\r') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = Self::strip(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }

        self.pending_since = if self.buffer.is_empty() { None } else { Some(Instant::now()) };
        lines
    }

    /// The instant at which a pending partial line should be flushed if
    /// no further bytes have arrived by then.
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.pending_since.map(|since| since + self.debounce)
    }

    /// Force-emits whatever partial line is buffered. Called by the
    /// host once `flush_deadline` has passed with no new bytes.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        self.pending_since = None;
        Self::strip(&raw)
    }

    fn strip(raw: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for LineTokenizer {
    fn default() -> Self {
        Self::new()
    }
}
