//! Channel driver for the PCA9685 16-channel 12-bit PWM expander.
//!
//! The servo engine talks to the expander through the [`PwmChannels`]
//! trait, so a recording fake can stand in for the chip in host tests.
//! [`Pca9685`] is the real implementation over a blocking
//! [`embedded_hal::i2c::I2c`] bus.
//!
//! The PCA9685 I2C protocol has no application-level acknowledgment, so bus
//! errors are absorbed here and not surfaced to the command layer.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Default I2C address fixed by the board's address strapping.
pub const PCA9685_DEFAULT_ADDRESS: u8 = 0x40;

/// Number of output channels on the expander.
pub const PCA9685_CHANNELS: u8 = 16;

/// Counts per PWM frame (12-bit resolution).
pub const PCA9685_PWM_FULL: u16 = 4096;

/// Internal oscillator frequency (Hz), used for prescale computation.
const OSC_HZ: u32 = 25_000_000;

// Register map (datasheet section 7.3).
const REG_MODE1: u8 = 0x00;
const REG_MODE2: u8 = 0x01;
const REG_LED0_ON_L: u8 = 0x06;
const REG_ALL_LED_OFF_L: u8 = 0xFC;
const REG_ALL_LED_OFF_H: u8 = 0xFD;
const REG_PRESCALE: u8 = 0xFE;

// MODE1 bits.
const MODE1_RESTART: u8 = 0x80;
const MODE1_AI: u8 = 0x20;
const MODE1_SLEEP: u8 = 0x10;
const MODE1_ALLCALL: u8 = 0x01;

// MODE2 bits.
const MODE2_OUTDRV: u8 = 0x04;

// ALL_LED_OFF_H full-off bit.
const ALL_OFF_FULL: u8 = 0x10;

/// Abstract 12-bit duty output, the seam between the servo engine and the
/// physical expander.
///
/// Out-of-range channels are silently ignored; there are no channels beyond
/// the hardware maximum to report about.
pub trait PwmChannels {
    /// Set the PWM frequency for every channel. Must be called once at
    /// startup with 50 Hz for standard analog servos.
    fn configure(&mut self, freq_hz: u16);

    /// Write one channel's on/off tick pair (each in `0..=4095`).
    fn set_duty(&mut self, channel: u8, on: u16, off: u16);

    /// Force every channel's output off regardless of prior duty.
    fn all_off(&mut self);
}

/// PCA9685 over a blocking I2C bus.
///
/// # Example
///
/// ```rust,no_run
/// use arm_pilot::pwm::{PCA9685_DEFAULT_ADDRESS, Pca9685, PwmChannels};
/// use embedded_hal::{delay::DelayNs, i2c::I2c};
///
/// fn bring_up<B: I2c, D: DelayNs>(bus: B, delay: D) -> Pca9685<B, D> {
///     let mut pwm = Pca9685::new(bus, delay, PCA9685_DEFAULT_ADDRESS);
///     pwm.set_duty(0, 0, 307); // ~1.5 ms pulse at 50 Hz
///     pwm
/// }
/// ```
pub struct Pca9685<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Pca9685<I2C, D> {
    /// Create the driver and run the chip's wake-up sequence: restart,
    /// sleep, 50 Hz prescale, then wake with register auto-increment and
    /// totem-pole outputs.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        let mut this = Self {
            i2c,
            delay,
            address,
        };
        this.write_reg(REG_MODE1, MODE1_RESTART);
        this.delay.delay_ms(10);
        this.write_reg(REG_MODE1, MODE1_SLEEP);
        this.delay.delay_ms(1);
        this.configure(50);
        this.write_reg(REG_MODE1, MODE1_AI | MODE1_ALLCALL);
        this.delay.delay_ms(1);
        this.write_reg(REG_MODE2, MODE2_OUTDRV);
        this
    }

    /// Release the underlying bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn write_reg(&mut self, reg: u8, value: u8) {
        // No-ack from the chip is not recoverable at this layer.
        let _ = self.i2c.write(self.address, &[reg, value]);
    }
}

impl<I2C: I2c, D: DelayNs> PwmChannels for Pca9685<I2C, D> {
    fn configure(&mut self, freq_hz: u16) {
        // prescale = round(osc / (4096 * freq)) - 1
        let denom = u32::from(PCA9685_PWM_FULL) * u32::from(freq_hz);
        let prescale = (OSC_HZ.wrapping_add(denom / 2) / denom).saturating_sub(1) as u8;

        // Prescale is only writable while the chip sleeps.
        let awake = MODE1_AI | MODE1_ALLCALL;
        self.write_reg(REG_MODE1, awake | MODE1_SLEEP);
        self.write_reg(REG_PRESCALE, prescale);
        self.write_reg(REG_MODE1, awake);
        self.delay.delay_ms(1);
        self.write_reg(REG_MODE1, awake | MODE1_RESTART);
    }

    fn set_duty(&mut self, channel: u8, on: u16, off: u16) {
        if channel >= PCA9685_CHANNELS {
            return;
        }
        // 4-register block per channel, written in one auto-increment burst.
        let reg = REG_LED0_ON_L + channel * 4;
        let _ = self.i2c.write(
            self.address,
            &[
                reg,
                (on & 0xFF) as u8,
                (on >> 8) as u8,
                (off & 0xFF) as u8,
                (off >> 8) as u8,
            ],
        );
    }

    fn all_off(&mut self) {
        self.write_reg(REG_ALL_LED_OFF_L, 0x00);
        self.write_reg(REG_ALL_LED_OFF_H, ALL_OFF_FULL);
    }
}
