//! Incremental decoder for streamed chat replies
//!
//! Ollama streams one JSON object per line. Bytes arrive in arbitrary
//! chunks, so partial lines are buffered until their newline shows up.

use crate::errors::{AgentError, Result};
use serde::Deserialize;

/// Maximum bytes held while waiting for a newline (1MB)
pub const MAX_LINE_BUFFER: usize = 1_048_576;

/// Turns streamed bytes into reply text pieces
#[derive(Debug, Default)]
pub struct ChatStreamDecoder {
    buffer: Vec<u8>,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<StreamMessage>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    content: String,
}

impl ChatStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the final line has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk, returning the non-empty text pieces it completed
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        if self.buffer.len() + bytes.len() > MAX_LINE_BUFFER {
            return Err(AgentError::Transport(format!(
                "Stream line exceeds {} bytes",
                MAX_LINE_BUFFER
            )));
        }
        self.buffer.extend_from_slice(bytes);

        let mut pieces = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(piece) = self.decode_line(&line)? {
                pieces.push(piece);
            }
        }
        Ok(pieces)
    }

    /// Decode whatever is left once the byte stream has ended
    pub fn finish(&mut self) -> Result<Option<String>> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest)
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Option<String>> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let line: StreamLine = serde_json::from_str(text)
            .map_err(|e| AgentError::Transport(format!("Bad stream line: {}", e)))?;
        if let Some(error) = line.error {
            return Err(AgentError::Transport(error));
        }
        self.done |= line.done;

        Ok(line
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty()))
    }
}
