//! Full robot-arm controller: six servos on a PCA9685, LCD keypad menu,
//! and a serial command line on UART0.
//!
//! Button mode runs the menu; typing `START` on the serial link switches
//! to serial mode until `STOP`.
//!
//! Wiring:
//! - PCA9685 on I2C0 (SDA GPIO 16, SCL GPIO 17), servos on channels 0-5
//! - 16x2 LCD in 4-bit mode: RS GPIO 8, EN GPIO 9, D4-D7 GPIO 4-7
//! - Keypad resistor ladder on ADC GPIO 26
//! - Serial console on UART0 (TX GPIO 0, RX GPIO 1), 115200 8N1

#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::panic;

use arm_pilot::engine::{NUM_SERVOS, ServoBank};
use arm_pilot::keypad::Keypad;
use arm_pilot::menu::{Menu, TextScreen as _};
use arm_pilot::Result;
use arm_pilot::char_lcd::CharLcd;
use arm_pilot::protocol::{self, RingSource};
use arm_pilot::pwm::{PCA9685_DEFAULT_ADDRESS, Pca9685};
use arm_pilot::ring::RxRing;
use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_rp::adc::{self, Adc, Channel};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, BufferedUart, BufferedUartRx};
use embassy_time::Delay;
use embedded_io_async::{Read as _, Write as _};
use heapless::String;
use static_cell::ConstStaticCell;
use {defmt::info, defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => adc::InterruptHandler;
    UART0_IRQ => uart::BufferedInterruptHandler<UART0>;
});

/// Receive ring between the UART pump task and the line reader.
static RX_RING: RxRing<64> = RxRing::new();

static TX_BUFFER: ConstStaticCell<[u8; 256]> = ConstStaticCell::new([0; 256]);
static RX_BUFFER: ConstStaticCell<[u8; 64]> = ConstStaticCell::new([0; 64]);

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<core::convert::Infallible> {
    let p = embassy_rp::init(Default::default());

    info!("arm controller starting");

    // Servo bank on the PCA9685. Construction centers every servo.
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_17, p.PIN_16, i2c::Config::default());
    let pwm = Pca9685::new(i2c, Delay, PCA9685_DEFAULT_ADDRESS);
    let mut bank: ServoBank<_, NUM_SERVOS> = ServoBank::new(pwm);

    // LCD and keypad.
    let mut lcd = CharLcd::new(
        Output::new(p.PIN_8, Level::Low),
        Output::new(p.PIN_9, Level::Low),
        [
            Output::new(p.PIN_4, Level::Low),
            Output::new(p.PIN_5, Level::Low),
            Output::new(p.PIN_6, Level::Low),
            Output::new(p.PIN_7, Level::Low),
        ],
    );
    let adc = Adc::new(p.ADC, Irqs, adc::Config::default());
    let mut keypad = Keypad::new(adc, Channel::new_pin(p.PIN_26, Pull::None));

    // Serial console: UART0 split, receive side pumped into the ring.
    let uart = BufferedUart::new(
        p.UART0,
        p.PIN_0,
        p.PIN_1,
        Irqs,
        TX_BUFFER.take(),
        RX_BUFFER.take(),
        uart::Config::default(),
    );
    let (mut tx, rx) = uart.split();
    spawner.spawn(rx_pump(rx))?;

    tx.write_all(b"\n=== Robot Arm Controller ===\nType START for serial mode\n")
        .await?;

    let mut menu: Menu<NUM_SERVOS> = Menu::new();
    menu.reset(&bank);
    menu.show(&bank, &mut lcd);

    let mut source = RingSource::new(&RX_RING);
    let mut delay = Delay;
    let mut line: String<{ protocol::CMD_BUFFER_SIZE }> = String::new();
    loop {
        match select(
            keypad.next_event(),
            protocol::read_line(&mut source, &mut line),
        )
        .await
        {
            Either::First(button) => {
                menu.handle(button, &mut bank, &mut lcd, &mut delay).await;
            }
            Either::Second(()) => {
                if line.eq_ignore_ascii_case("START") {
                    info!("entering serial mode");
                    lcd.clear();
                    lcd.print("Serial Mode");
                    protocol::run_session(&mut bank, &mut source, &mut tx, &mut delay).await?;
                    info!("back to button mode");
                    menu.reset(&bank);
                    menu.show(&bank, &mut lcd);
                } else {
                    let mut reply: String<{ protocol::REPLY_BUFFER_SIZE }> = String::new();
                    if line.eq_ignore_ascii_case("HELP") {
                        let _ = protocol::write_help(&mut reply);
                    }
                    let _ = reply.push_str("Type START to enter serial mode\n");
                    tx.write_all(reply.as_bytes()).await?;
                }
            }
        }
    }
}

/// Move received bytes into the shared ring. Overflow drops bytes; the
/// line reader's bounded buffer makes that harmless.
#[embassy_executor::task]
async fn rx_pump(mut rx: BufferedUartRx<'static>) -> ! {
    let mut byte = [0u8; 1];
    loop {
        if let Ok(count) = rx.read(&mut byte).await {
            for &value in byte.iter().take(count) {
                let _ = RX_RING.push(value);
            }
        }
    }
}
