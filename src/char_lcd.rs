//! HD44780-class 16x2 character display over a 4-bit GPIO bus.
//!
//! Write-only wiring (R/W strapped to ground), so timing is by worst-case
//! busy delays instead of busy-flag polling. Implements [`TextScreen`] for
//! the menu.

use embassy_rp::gpio::Output;
use embassy_time::{Duration, block_for};

use crate::menu::TextScreen;

/// Enable pulse width. The controller needs >450 ns; 1 µs is comfortable.
const ENABLE_PULSE_US: u64 = 1;

/// Settle time after an ordinary command or data write.
const COMMAND_US: u64 = 50;

/// Settle time after clear/home, the two slow commands.
const CLEAR_MS: u64 = 2;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06; // increment, no shift
const CMD_DISPLAY_ON: u8 = 0x0C; // display on, cursor off
const CMD_FUNCTION_4BIT: u8 = 0x28; // 4-bit, 2 lines, 5x8 font
const CMD_SET_DDRAM: u8 = 0x80;

/// A 16x2 character display on six GPIO lines (RS, EN, D4-D7).
pub struct CharLcd<'a> {
    rs: Output<'a>,
    en: Output<'a>,
    data: [Output<'a>; 4],
}

impl<'a> CharLcd<'a> {
    /// Take ownership of the control and data lines and run the 4-bit
    /// initialization sequence. The display is left cleared, cursor off.
    #[must_use]
    pub fn new(rs: Output<'a>, en: Output<'a>, data: [Output<'a>; 4]) -> Self {
        let mut lcd = Self { rs, en, data };
        // Power-on: the controller may be in 8-bit mode; the 0x3,0x3,0x3,0x2
        // nibble dance forces it into a known 4-bit state.
        block_for(Duration::from_millis(50));
        lcd.rs.set_low();
        lcd.write_nibble(0x3);
        block_for(Duration::from_millis(5));
        lcd.write_nibble(0x3);
        block_for(Duration::from_micros(150));
        lcd.write_nibble(0x3);
        block_for(Duration::from_micros(150));
        lcd.write_nibble(0x2);
        block_for(Duration::from_micros(150));

        lcd.command(CMD_FUNCTION_4BIT);
        lcd.command(CMD_DISPLAY_ON);
        lcd.command(CMD_ENTRY_MODE);
        lcd.command(CMD_CLEAR);
        block_for(Duration::from_millis(CLEAR_MS));
        lcd
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            pin.set_level(((nibble >> bit) & 1 == 1).into());
        }
        self.en.set_high();
        block_for(Duration::from_micros(ENABLE_PULSE_US));
        self.en.set_low();
        block_for(Duration::from_micros(ENABLE_PULSE_US));
    }

    fn write_byte(&mut self, byte: u8, is_data: bool) {
        if is_data {
            self.rs.set_high();
        } else {
            self.rs.set_low();
        }
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0F);
        block_for(Duration::from_micros(COMMAND_US));
    }

    fn command(&mut self, command: u8) {
        self.write_byte(command, false);
    }
}

impl TextScreen for CharLcd<'_> {
    fn clear(&mut self) {
        self.command(CMD_CLEAR);
        block_for(Duration::from_millis(CLEAR_MS));
    }

    fn set_cursor(&mut self, position: u8) {
        self.command(CMD_SET_DDRAM | position);
    }

    fn print(&mut self, text: &str) {
        for &byte in text.as_bytes() {
            self.write_byte(byte, true);
        }
    }
}
