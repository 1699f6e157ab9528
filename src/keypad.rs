//! Analog keypad: five buttons on a single ADC pin, decoded by threshold.
//!
//! LCD keypad shields share one resistor ladder, so each button produces a
//! distinct voltage. [`button_from_level`] is the pure decode (unit-testable
//! on the host); [`Keypad`] owns the ADC and turns held buttons into a
//! stream of repeat events.

#[cfg(not(feature = "host"))]
use embassy_time::Timer;

// ============================================================================
// Constants
// ============================================================================

/// Threshold table for the resistor ladder, in 10-bit ADC counts.
/// Values measured on the stock shield; anything above the last band is
/// "nothing pressed" (the pin idles near full scale).
const RIGHT_MAX: u16 = 50;
const UP_MAX: u16 = 250;
const DOWN_MAX: u16 = 450;
const LEFT_MAX: u16 = 650;
const SELECT_MAX: u16 = 850;

/// Poll interval while no button is down.
#[cfg(not(feature = "host"))]
const POLL_MS: u64 = 10;

/// Hold-off after an event, so a held button repeats at a usable rate
/// instead of once per poll.
#[cfg(not(feature = "host"))]
const REPEAT_MS: u64 = 150;

// ============================================================================
// Button
// ============================================================================

/// One of the five keypad buttons, or nothing pressed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, defmt::Format)]
pub enum Button {
    /// Nothing pressed (pin near full scale).
    None,
    /// Right button (lowest voltage band).
    Right,
    /// Up button.
    Up,
    /// Down button.
    Down,
    /// Left button.
    Left,
    /// Select button (highest pressed band).
    Select,
}

/// Decode a raw ADC reading (10-bit scale) into a button.
#[must_use]
pub fn button_from_level(level: u16) -> Button {
    match level {
        0..RIGHT_MAX => Button::Right,
        RIGHT_MAX..UP_MAX => Button::Up,
        UP_MAX..DOWN_MAX => Button::Down,
        DOWN_MAX..LEFT_MAX => Button::Left,
        LEFT_MAX..SELECT_MAX => Button::Select,
        _ => Button::None,
    }
}

// ============================================================================
// Keypad Virtual Device
// ============================================================================

/// The keypad's ADC pin, polled into button events.
///
/// [`next_event()`](Self::next_event) waits for a press and applies the
/// repeat hold-off, so callers just loop on events.
#[cfg(not(feature = "host"))]
pub struct Keypad<'a> {
    adc: embassy_rp::adc::Adc<'a, embassy_rp::adc::Async>,
    pin: embassy_rp::adc::Channel<'a>,
}

#[cfg(not(feature = "host"))]
impl<'a> Keypad<'a> {
    /// Wrap a configured ADC and the keypad channel.
    #[must_use]
    pub fn new(adc: embassy_rp::adc::Adc<'a, embassy_rp::adc::Async>, pin: embassy_rp::adc::Channel<'a>) -> Self {
        Self { adc, pin }
    }

    /// Sample once and decode. Read errors count as no press.
    pub async fn read(&mut self) -> Button {
        let level = self.adc.read(&mut self.pin).await.unwrap_or(u16::MAX);
        // The RP2040 ADC is 12-bit; the threshold table is 10-bit.
        button_from_level(level >> 2)
    }

    /// Wait for the next button event.
    ///
    /// Holding a button yields one event per [`REPEAT_MS`], which is what
    /// drives menu value stepping.
    pub async fn next_event(&mut self) -> Button {
        loop {
            let button = self.read().await;
            if button != Button::None {
                Timer::after_millis(REPEAT_MS).await;
                return button;
            }
            Timer::after_millis(POLL_MS).await;
        }
    }
}
