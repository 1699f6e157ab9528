//! Firmware building blocks for a multi-servo robot arm on Pico 1 and 2.
//!
//! The arm is driven by a PCA9685 16-channel PWM expander over I2C. This
//! crate owns the servo state and motion engine ([`engine::ServoBank`]), the
//! newline-terminated serial command protocol ([`protocol`]), and the LCD
//! keypad menu ([`menu`]). Hardware access goes through narrow trait seams
//! ([`pwm::PwmChannels`], [`menu::TextScreen`], [`protocol::ByteSource`]) so
//! every piece of control logic also compiles and tests on the host.
//!
//! # Glossary
//!
//! - **Channel:** one addressable servo output slot (0..N-1, canonical N=6;
//!   the PCA9685 has 16).
//! - **Duty value:** 12-bit (0-4095) on/off tick pair controlling pulse
//!   timing within the fixed 50 Hz frame.
//! - **POSE:** instantaneous, independent multi-channel angle set.
//! - **MOVE:** time-bounded, linearly interpolated, synchronized
//!   multi-channel angle transition.
#![cfg_attr(not(feature = "host"), no_std)]
#![cfg_attr(not(feature = "host"), no_main)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(not(feature = "arm"), not(feature = "host")))]
compile_error!("Must enable the 'arm' architecture feature for embedded builds");

// These modules require embassy_rp and are excluded when testing on host
#[cfg(not(feature = "host"))]
pub mod char_lcd;
pub mod engine;
mod error;
pub mod keypad;
pub mod menu;
pub mod protocol;
pub mod pwm;
pub mod ring;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
