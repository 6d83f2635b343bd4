//! Line assembly for the operator protocol.
//!
//! Bytes arrive from a UART or a bridge in arbitrary chunks. The parser
//! collects them until a line terminator and hands out complete lines.
//!
//! - `\n` terminates a line
//! - `\r` is dropped wherever it appears
//! - Blank lines are skipped
//! - An over-long line is discarded up to its terminator and reported once

use heapless::String;

/// Maximum accepted line length in bytes (excluding the terminator)
pub const MAX_LINE_LEN: usize = 96;

/// A complete received line
pub type Line = String<MAX_LINE_LEN>;

/// Errors that can occur while assembling lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded `MAX_LINE_LEN` and was dropped
    TooLong,
    /// Line contained bytes that are not valid UTF-8
    InvalidUtf8,
}

impl LineError {
    /// Reply token for this error
    pub fn as_token(&self) -> &'static str {
        match self {
            LineError::TooLong => "LINE_TOO_LONG",
            LineError::InvalidUtf8 => "INVALID_UTF8",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Collecting bytes of the current line
    Collecting,
    /// Dropping bytes until the next terminator
    Discarding,
}

/// State machine for assembling incoming lines
#[derive(Debug, Clone)]
pub struct LineParser {
    state: ParseState,
    buffer: heapless::Vec<u8, MAX_LINE_LEN>,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Create a new line parser
    pub fn new() -> Self {
        Self {
            state: ParseState::Collecting,
            buffer: heapless::Vec::new(),
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::Collecting;
        self.buffer.clear();
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(line))` when a complete non-blank line is assembled,
    /// `Ok(None)` when more bytes are needed, or `Err` when a line had to be
    /// dropped.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, LineError> {
        match (self.state, byte) {
            (_, b'\r') => Ok(None),
            (ParseState::Discarding, b'\n') => {
                self.reset();
                Ok(None)
            }
            (ParseState::Discarding, _) => Ok(None),
            (ParseState::Collecting, b'\n') => {
                let result = match core::str::from_utf8(&self.buffer) {
                    Ok(text) if text.trim().is_empty() => Ok(None),
                    Ok(text) => {
                        let mut line = Line::new();
                        // Cannot overflow: buffer and line share a capacity
                        let _ = line.push_str(text.trim());
                        Ok(Some(line))
                    }
                    Err(_) => Err(LineError::InvalidUtf8),
                };
                self.reset();
                result
            }
            (ParseState::Collecting, _) => {
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = ParseState::Discarding;
                    return Err(LineError::TooLong);
                }
                Ok(None)
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete line found, if any.
    /// Remaining bytes after a complete line are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Line>, LineError> {
        for &byte in bytes {
            if let Some(line) = self.feed(byte)? {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}
