//! Minimal servo-bank exercise: cycle the arm through a few poses with
//! synchronized moves. No LCD, keypad, or serial, just the PCA9685 on
//! I2C0 (SDA GPIO 16, SCL GPIO 17).

#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use arm_pilot::engine::{CENTER_ANGLE, NUM_SERVOS, ServoBank};
use arm_pilot::pwm::{PCA9685_DEFAULT_ADDRESS, Pca9685};
use embassy_executor::Spawner;
use embassy_rp::i2c::{self, I2c};
use embassy_time::{Delay, Timer};
use {defmt::info, defmt_rtt as _, panic_probe as _};

const POSES: [[u8; NUM_SERVOS]; 3] = [
    [90, 45, 120, 90, 60, 30],
    [30, 120, 60, 45, 90, 150],
    [CENTER_ANGLE; NUM_SERVOS],
];

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    let i2c = I2c::new_blocking(p.I2C0, p.PIN_17, p.PIN_16, i2c::Config::default());
    let pwm = Pca9685::new(i2c, Delay, PCA9685_DEFAULT_ADDRESS);
    let mut bank: ServoBank<_, NUM_SERVOS> = ServoBank::new(pwm);

    info!("pose sweep starting");
    let mut delay = Delay;
    loop {
        for pose in &POSES {
            info!("moving to {}", pose);
            bank.execute_move(2000, pose, &mut delay).await;
            Timer::after_millis(500).await;
        }
    }
}
