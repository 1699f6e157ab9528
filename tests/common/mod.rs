//! Shared fakes for the host-level tests: recording PWM driver, instant
//! delay, scripted byte source, capturing serial sink, and a 16x2 text
//! screen grid.

#![allow(dead_code)]

use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use arm_pilot::menu::{ROW2, TextScreen};
use arm_pilot::protocol::ByteSource;
use arm_pilot::pwm::PwmChannels;

// ============================================================================
// RecordingPwm
// ============================================================================

/// Everything a [`RecordingPwm`] has been asked to do.
#[derive(Debug, Default)]
pub struct PwmLog {
    pub configured_hz: Vec<u16>,
    /// `(channel, on, off)` per duty write, in call order.
    pub writes: Vec<(u8, u16, u16)>,
    pub all_off_calls: usize,
}

/// PWM driver fake that records every call. Clones share one log, so a
/// test can keep a handle while the servo bank owns the driver.
#[derive(Clone, Debug, Default)]
pub struct RecordingPwm {
    log: Rc<RefCell<PwmLog>>,
}

impl RecordingPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return the duty writes recorded so far.
    pub fn take_writes(&self) -> Vec<(u8, u16, u16)> {
        core::mem::take(&mut self.log.borrow_mut().writes)
    }

    /// The most recent duty write for one channel.
    pub fn last_write_for(&self, channel: u8) -> Option<(u8, u16, u16)> {
        self.log
            .borrow()
            .writes
            .iter()
            .rev()
            .find(|(recorded, _, _)| *recorded == channel)
            .copied()
    }

    pub fn all_off_calls(&self) -> usize {
        self.log.borrow().all_off_calls
    }
}

impl PwmChannels for RecordingPwm {
    fn configure(&mut self, freq_hz: u16) {
        self.log.borrow_mut().configured_hz.push(freq_hz);
    }

    fn set_duty(&mut self, channel: u8, on: u16, off: u16) {
        self.log.borrow_mut().writes.push((channel, on, off));
    }

    fn all_off(&mut self) {
        self.log.borrow_mut().all_off_calls += 1;
    }
}

// ============================================================================
// FakeDelay
// ============================================================================

/// Completes instantly, recording each requested nap in nanoseconds.
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub naps_ns: Vec<u32>,
}

impl embedded_hal_async::delay::DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.naps_ns.push(ns);
    }
}

// ============================================================================
// ScriptSource
// ============================================================================

/// [`ByteSource`] over a fixed script. Running past the end is a test
/// bug, so it panics rather than hanging.
#[derive(Debug)]
pub struct ScriptSource {
    bytes: VecDeque<u8>,
}

impl ScriptSource {
    pub fn new(script: &str) -> Self {
        Self {
            bytes: script.bytes().collect(),
        }
    }

    pub fn from_bytes(script: &[u8]) -> Self {
        Self {
            bytes: script.iter().copied().collect(),
        }
    }
}

impl ByteSource for ScriptSource {
    async fn next_byte(&mut self) -> u8 {
        self.bytes.pop_front().expect("byte script exhausted")
    }
}

// ============================================================================
// SinkWriter
// ============================================================================

/// Serial transmit sink capturing everything written.
#[derive(Debug, Default)]
pub struct SinkWriter {
    pub bytes: Vec<u8>,
}

impl SinkWriter {
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.bytes).expect("reply was not UTF-8")
    }
}

impl embedded_io_async::ErrorType for SinkWriter {
    type Error = Infallible;
}

impl embedded_io_async::Write for SinkWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

// ============================================================================
// FakeScreen
// ============================================================================

/// 16x2 character grid with DDRAM-style cursor addressing.
pub struct FakeScreen {
    cells: [[u8; 16]; 2],
    row: usize,
    column: usize,
}

impl Default for FakeScreen {
    fn default() -> Self {
        Self {
            cells: [[b' '; 16]; 2],
            row: 0,
            column: 0,
        }
    }
}

impl FakeScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// One display row as text, trailing blanks trimmed.
    pub fn row(&self, row: usize) -> String {
        String::from_utf8_lossy(&self.cells[row])
            .trim_end()
            .to_string()
    }
}

impl TextScreen for FakeScreen {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn set_cursor(&mut self, position: u8) {
        if position >= ROW2 {
            self.row = 1;
            self.column = usize::from(position - ROW2);
        } else {
            self.row = 0;
            self.column = usize::from(position);
        }
    }

    fn print(&mut self, text: &str) {
        for &byte in text.as_bytes() {
            if self.column < 16 {
                self.cells[self.row][self.column] = byte;
                self.column += 1;
            }
        }
    }
}
