//! Servo state and command engine: the single source of truth for every
//! channel's angle and pulse width.
//!
//! [`ServoBank`] owns per-channel state, validates and clamps commands, and
//! executes the two multi-channel operations:
//!
//! - **POSE** ([`ServoBank::execute_pose`]): instant, independent angle set.
//! - **MOVE** ([`ServoBank::execute_move`]): time-bounded, linearly
//!   interpolated transition where all channels arrive together.
//!
//! The engine drives hardware through the [`PwmChannels`](crate::pwm::PwmChannels)
//! seam and sleeps through [`embedded_hal_async::delay::DelayNs`], so motion
//! timing is fully testable without hardware or real delays.

use embedded_hal_async::delay::DelayNs;

use crate::pwm::{PCA9685_PWM_FULL, PwmChannels};

/// Canonical number of servo channels on the arm.
pub const NUM_SERVOS: usize = 6;

/// Pulse width (µs) commanding 0°.
pub const SERVO_MIN_PULSE_US: u16 = 500;

/// Pulse width (µs) commanding 180°.
pub const SERVO_MAX_PULSE_US: u16 = 2_500;

/// Pulse width (µs) commanding the 90° center position.
pub const SERVO_CENTER_PULSE_US: u16 = 1_500;

/// PWM frame period (µs) at the 50 Hz servo refresh rate.
const FRAME_PERIOD_US: u32 = 20_000;

/// Interpolation step interval (ms). Fixed at the PWM refresh period:
/// updating faster than the expander refreshes is meaningless.
pub const MOVE_STEP_MS: u32 = 20;

/// Largest accepted pulse width (µs): one full frame.
pub const MAX_PULSE_US: u16 = 20_000;

/// Largest commandable angle (degrees).
pub const MAX_ANGLE: u8 = 180;

/// Angle every channel starts at.
pub const CENTER_ANGLE: u8 = 90;

/// Map a pulse width to a 12-bit off-tick: `round(us * 4096 / 20000)`,
/// clamped to the 12-bit range.
#[must_use]
pub fn duty_from_pulse_us(pulse_us: u16) -> u16 {
    let ticks = (u32::from(pulse_us) * u32::from(PCA9685_PWM_FULL) + FRAME_PERIOD_US / 2)
        / FRAME_PERIOD_US;
    ticks.min(u32::from(PCA9685_PWM_FULL) - 1) as u16
}

/// Map an angle to a pulse width: `MIN + angle * (MAX - MIN) / 180`,
/// integer truncating division.
#[must_use]
pub fn pulse_us_from_angle(angle: u8) -> u16 {
    let span = u32::from(SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US);
    SERVO_MIN_PULSE_US + (u32::from(angle) * span / u32::from(MAX_ANGLE)) as u16
}

/// Per-channel servo state plus the operations that mutate it.
///
/// All channels come up at 90° (≈1500 µs). The angle API keeps `angle` and
/// `pulse_width_us` consistent; the pulse API deliberately does not touch
/// `angle`, so calibration can probe raw pulse widths without lying about
/// position.
///
/// # Example
///
/// ```rust
/// use arm_pilot::engine::ServoBank;
/// use arm_pilot::pwm::PwmChannels;
///
/// struct NullPwm;
/// impl PwmChannels for NullPwm {
///     fn configure(&mut self, _freq_hz: u16) {}
///     fn set_duty(&mut self, _channel: u8, _on: u16, _off: u16) {}
///     fn all_off(&mut self) {}
/// }
///
/// let mut bank: ServoBank<NullPwm, 6> = ServoBank::new(NullPwm);
/// bank.set_angle(0, 45);
/// assert_eq!(bank.get_angle(0), 45);
/// bank.set_pulse_us(0, 700); // calibration: angle stays 45
/// assert_eq!(bank.get_angle(0), 45);
/// assert_eq!(bank.get_pulse_us(0), 700);
/// ```
pub struct ServoBank<D, const N: usize = NUM_SERVOS> {
    pwm: D,
    angles: [u8; N],
    pulse_us: [u16; N],
}

impl<D: PwmChannels, const N: usize> ServoBank<D, N> {
    /// Take ownership of the channel driver and center every channel.
    pub fn new(pwm: D) -> Self {
        let mut bank = Self {
            pwm,
            angles: [CENTER_ANGLE; N],
            pulse_us: [SERVO_CENTER_PULSE_US; N],
        };
        for channel in 0..N as u8 {
            bank.write_pulse(channel, SERVO_CENTER_PULSE_US);
        }
        bank
    }

    /// Number of configured channels.
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        N
    }

    /// Set one channel's position in degrees.
    ///
    /// Out-of-range channels are a no-op. The angle is clamped to
    /// `0..=180` (never rejected, never wrapped); the matching pulse width
    /// is recomputed and one duty write is issued.
    pub fn set_angle(&mut self, channel: u8, angle: u8) {
        let Some(slot) = self.angles.get_mut(usize::from(channel)) else {
            return;
        };
        let angle = angle.min(MAX_ANGLE);
        let pulse = pulse_us_from_angle(angle);
        *slot = angle;
        self.pulse_us[usize::from(channel)] = pulse;
        self.write_pulse(channel, pulse);
    }

    /// Set one channel's raw pulse width in microseconds (calibration).
    ///
    /// Clamped to one full frame (20000 µs). Does NOT recompute the stored
    /// angle; calibration intentionally decouples the two.
    pub fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) {
        let Some(slot) = self.pulse_us.get_mut(usize::from(channel)) else {
            return;
        };
        let pulse = pulse_us.min(MAX_PULSE_US);
        *slot = pulse;
        self.write_pulse(channel, pulse);
    }

    /// Current commanded angle, or the 90° default for an invalid channel.
    #[must_use]
    pub fn get_angle(&self, channel: u8) -> u8 {
        self.angles
            .get(usize::from(channel))
            .copied()
            .unwrap_or(CENTER_ANGLE)
    }

    /// Current pulse width, or the 1500 µs default for an invalid channel.
    #[must_use]
    pub fn get_pulse_us(&self, channel: u8) -> u16 {
        self.pulse_us
            .get(usize::from(channel))
            .copied()
            .unwrap_or(SERVO_CENTER_PULSE_US)
    }

    /// POSE: apply [`set_angle`](Self::set_angle) to channels
    /// `0..angles.len()` in order, each taking effect immediately.
    ///
    /// Extra entries beyond the configured channel count are silently
    /// ignored (behaves exactly like a full-length pose).
    pub fn execute_pose(&mut self, angles: &[u8]) {
        let count = angles.len().min(N);
        for (channel, &angle) in angles.iter().take(count).enumerate() {
            self.set_angle(channel as u8, angle);
        }
    }

    /// MOVE: sweep channels `0..targets.len()` from their current angles to
    /// `targets` over `duration_ms`, all arriving together.
    ///
    /// Steps every 20 ms (the PWM refresh period); `num_steps =
    /// max(1, duration_ms / 20)`, so a duration under 20 ms is an instant
    /// one-step jump. Start angles and deltas are snapshotted before any
    /// channel moves. Interpolated positions go straight to the duty
    /// registers without updating stored state; after the sweep, each
    /// stored angle is snapped to its exact target so truncation during
    /// interpolation never causes drift.
    ///
    /// Cooperative-blocking: this occupies the calling task for the full
    /// duration. There is no cancellation.
    pub async fn execute_move(
        &mut self,
        duration_ms: u16,
        targets: &[u8],
        delay: &mut impl DelayNs,
    ) {
        let count = targets.len().min(N);
        if count == 0 {
            return;
        }

        let num_steps = (u32::from(duration_ms) / MOVE_STEP_MS).max(1);

        // Snapshot before anything moves: interpolation must use the state
        // at call time, not state updated mid-sweep.
        let mut start = [0_i32; N];
        let mut delta = [0_i32; N];
        for index in 0..count {
            start[index] = i32::from(self.angles[index]);
            delta[index] = i32::from(targets[index]) - start[index];
        }

        for step in 0..=num_steps {
            // Fixed-point progress, 0..=1000. Truncating division: only the
            // final step is guaranteed to land on exactly 1000.
            let factor = (step * 1000 / num_steps) as i32;
            for index in 0..count {
                let angle = (start[index] + delta[index] * factor / 1000)
                    .clamp(0, i32::from(MAX_ANGLE)) as u8;
                self.write_pulse(index as u8, pulse_us_from_angle(angle));
            }
            if step < num_steps {
                delay.delay_ms(MOVE_STEP_MS).await;
            }
        }

        // Exact arrival regardless of rounding during the sweep.
        for index in 0..count {
            self.angles[index] = targets[index].min(MAX_ANGLE);
        }
    }

    /// Stop driving every channel; servos relax and can move freely.
    /// Stored positions are kept, so the next command resumes from them.
    pub fn relax_all(&mut self) {
        self.pwm.all_off();
    }

    /// One duty write, bypassing stored state.
    fn write_pulse(&mut self, channel: u8, pulse_us: u16) {
        self.pwm.set_duty(channel, 0, duty_from_pulse_us(pulse_us));
    }
}
