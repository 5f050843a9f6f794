//! Line stream: lazy, rewindable input
//!
//! Lines are pulled from a [`LineSource`] one at a time. While a speculative
//! attempt is open (see [`LineStream::checkpoint`]) every pulled line is kept
//! in a replay buffer so the attempt can be undone; once no attempt is open,
//! lines behind the cursor are released.
//!
//! Guarantees:
//! - Input is never read ahead of the line currently being tested
//! - Rewinding restores exactly the lines handed out since the checkpoint
//! - Line numbers count every physical line, including skipped blank ones

use std::collections::VecDeque;
use std::io::{BufRead, Seek, SeekFrom};

use tracing::trace;

use crate::{is_blank, Result};

// ── Sources ───────────────────────────────────────────────

/// Pull-based producer of raw lines
pub trait LineSource {
    /// Restart from the first line
    fn rewind(&mut self) -> Result<()>;

    /// Next line without its terminator, or `None` at end of input
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Lines of an in-memory string
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        StrSource { text, offset: 0 }
    }
}

impl LineSource for StrSource<'_> {
    fn rewind(&mut self) -> Result<()> {
        self.offset = 0;
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        if self.offset >= self.text.len() {
            return Ok(None);
        }
        let rest = &self.text[self.offset..];
        let (line, consumed) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.offset += consumed;
        Ok(Some(line.strip_suffix('\r').unwrap_or(line).to_string()))
    }
}

/// Lines of any seekable buffered reader (files, cursors)
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    start: u64,
}

impl<R: BufRead + Seek> ReaderSource<R> {
    /// Wrap a reader; `rewind` returns to its current position
    pub fn new(mut reader: R) -> Result<Self> {
        let start = reader.stream_position()?;
        Ok(ReaderSource { reader, start })
    }
}

impl<R: BufRead + Seek> LineSource for ReaderSource<R> {
    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(self.start))?;
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

// ── Stream ────────────────────────────────────────────────

/// A line with its 1-based physical position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

/// Opaque position returned by [`LineStream::checkpoint`]
#[derive(Debug)]
#[must_use]
pub struct Checkpoint {
    position: usize,
}

/// Buffer-and-replay cursor over a [`LineSource`]
#[derive(Debug)]
pub struct LineStream<S> {
    source: S,
    skip_blank: bool,
    /// Pulled lines not yet released; `buffer[0]` sits at `base`
    buffer: VecDeque<Line>,
    base: usize,
    /// Index of the next line to hand out
    cursor: usize,
    /// Physical lines read so far
    physical: usize,
    /// Open speculative attempts
    depth: usize,
    exhausted: bool,
}

impl<S: LineSource> LineStream<S> {
    pub fn new(source: S, skip_blank: bool) -> Self {
        LineStream {
            source,
            skip_blank,
            buffer: VecDeque::new(),
            base: 0,
            cursor: 0,
            physical: 0,
            depth: 0,
            exhausted: false,
        }
    }

    /// Start over from the first line of the source
    pub fn reset(&mut self) -> Result<()> {
        self.source.rewind()?;
        self.buffer.clear();
        self.base = 0;
        self.cursor = 0;
        self.physical = 0;
        self.depth = 0;
        self.exhausted = false;
        Ok(())
    }

    /// The line at the cursor, pulling it from the source if needed
    pub fn peek(&mut self) -> Result<Option<&Line>> {
        while self.cursor >= self.base + self.buffer.len() {
            if !self.pull()? {
                return Ok(None);
            }
        }
        Ok(self.buffer.get(self.cursor - self.base))
    }

    /// Move past the line at the cursor
    pub fn advance(&mut self) {
        if self.cursor < self.base + self.buffer.len() {
            self.cursor += 1;
            self.release();
        }
    }

    /// Lines handed out so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Whether the source has no more lines past the cursor
    pub fn is_exhausted(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Open a speculative attempt at the current position
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            position: self.cursor,
        }
    }

    /// Undo every line handed out since `checkpoint`
    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        trace!(from = self.cursor, to = checkpoint.position, "rewinding stream");
        self.cursor = checkpoint.position;
        self.close();
    }

    /// Keep every line handed out since `checkpoint`
    pub fn commit(&mut self, _checkpoint: Checkpoint) {
        self.close();
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.release();
    }

    /// Drop lines behind the cursor once nothing can rewind to them
    fn release(&mut self) {
        if self.depth > 0 {
            return;
        }
        while self.base < self.cursor && !self.buffer.is_empty() {
            self.buffer.pop_front();
            self.base += 1;
        }
    }

    fn pull(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        loop {
            let Some(text) = self.source.next_line()? else {
                self.exhausted = true;
                return Ok(false);
            };
            self.physical += 1;
            if self.skip_blank && is_blank(&text) {
                trace!(line = self.physical, "skipping blank line");
                continue;
            }
            trace!(line = self.physical, "pulled line");
            self.buffer.push_back(Line {
                number: self.physical,
                text,
            });
            return Ok(true);
        }
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

// ── Tests ─────────────────────────────────────────────────
