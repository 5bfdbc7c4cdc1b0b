//! Interactive terminal frontend.
//!
//! Raw-mode keyboard polling for the dispatch loop: once per tick the
//! pending event queue is drained and only the last typed character is
//! kept, so holding a key does not build a backlog of stale commands.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Key substituted for Ctrl-C, so an interactive run can always be
/// ended the way a terminal user expects.
pub const QUIT_KEY: char = 'q';

/// Errors raised while attaching the terminal
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to enter raw terminal mode: {0}")]
    RawMode(#[source] io::Error),
}

/// Raw-mode keyboard source.
///
/// The terminal switches to raw mode at construction and is restored
/// when the value is dropped, including on panic unwind.
pub struct TermKeys(());

impl TermKeys {
    pub fn new() -> Result<Self, ConsoleError> {
        enable_raw_mode().map_err(ConsoleError::RawMode)?;
        Ok(Self(()))
    }

    /// Drain every pending key event and return the last typed
    /// character, if any. Ctrl-C maps to [`QUIT_KEY`].
    pub fn poll(&mut self) -> Option<char> {
        let mut last = None;
        while event::poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if let Some(ch) = key_char(&key) {
                    last = Some(ch);
                }
            }
        }
        last
    }
}

impl Drop for TermKeys {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// The character a key event contributes, or `None` for releases,
/// repeats of non-character keys and modifiers.
fn key_char(key: &KeyEvent) -> Option<char> {
    // Guard on Press so terminals that report release events too do
    // not double-fire.
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(QUIT_KEY),
        KeyCode::Char(ch) => Some(ch),
        _ => None,
    }
}

/// Paces an interactive run to one tick per `tick_ms` of wall time.
///
/// A late tick resynchronizes instead of bursting catch-up ticks, so a
/// stall shows up as lost wall time rather than a fast-forward.
pub struct TickPacer {
    tick: Duration,
    next: Instant,
}

impl TickPacer {
    pub fn new(tick_ms: u64) -> Self {
        let tick = Duration::from_millis(tick_ms);
        Self {
            tick,
            next: Instant::now() + tick,
        }
    }

    /// Sleep until the next tick boundary.
    pub fn pace(&mut self) {
        let now = Instant::now();
        if now < self.next {
            thread::sleep(self.next - now);
            self.next += self.tick;
        } else {
            self.next = now + self.tick;
        }
    }
}

/// `Write` adapter that rewrites `\n` to `\r\n`.
///
/// In raw mode the terminal no longer translates line feeds, which
/// turns multi-line log output into a staircase. Handing the tracing
/// layer a writer wrapped in this keeps logs readable without leaving
/// raw mode.
pub struct RawModeWriter<W> {
    inner: W,
}

impl<W: Write> RawModeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for RawModeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&byte| byte == b'\n') {
            match chunk.split_last() {
                Some((b'\n', line)) => {
                    self.inner.write_all(line)?;
                    self.inner.write_all(b"\r\n")?;
                }
                _ => self.inner.write_all(chunk)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_events_yield_their_character() {
        let key = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE);
        assert_eq!(key_char(&key), Some('f'));
    }

    #[test]
    fn release_events_are_ignored() {
        let key = KeyEvent::new_with_kind(
            KeyCode::Char('f'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(key_char(&key), None);
    }

    #[test]
    fn ctrl_c_maps_to_the_quit_key() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_char(&key), Some(QUIT_KEY));
    }

    #[test]
    fn non_character_keys_yield_nothing() {
        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(key_char(&key), None);
    }

    #[test]
    fn pacer_holds_the_loop_to_the_tick_length() {
        let mut pacer = TickPacer::new(5);
        let start = Instant::now();
        pacer.pace();
        pacer.pace();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn writer_rewrites_line_feeds() {
        let mut out = Vec::new();
        RawModeWriter::new(&mut out)
            .write_all(b"tick 1\ntick 2\n")
            .unwrap();
        assert_eq!(out, b"tick 1\r\ntick 2\r\n");
    }

    #[test]
    fn writer_passes_plain_text_through() {
        let mut out = Vec::new();
        RawModeWriter::new(&mut out).write_all(b"no newline").unwrap();
        assert_eq!(out, b"no newline");
    }
}
