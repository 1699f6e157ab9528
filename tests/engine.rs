#![allow(missing_docs)]
//! Host-level tests for the servo engine: clamping, angle/pulse mapping,
//! POSE, and the synchronized MOVE interpolation.

mod common;

use arm_pilot::engine::{
    CENTER_ANGLE, NUM_SERVOS, ServoBank, duty_from_pulse_us, pulse_us_from_angle,
};
use common::{FakeDelay, RecordingPwm};
use embassy_futures::block_on;

fn bank() -> (ServoBank<RecordingPwm, NUM_SERVOS>, RecordingPwm) {
    let pwm = RecordingPwm::new();
    let bank = ServoBank::new(pwm.clone());
    (bank, pwm)
}

#[test]
fn angle_to_pulse_mapping_matches_expected() {
    assert_eq!(pulse_us_from_angle(0), 500);
    assert_eq!(pulse_us_from_angle(45), 1000);
    assert_eq!(pulse_us_from_angle(90), 1500);
    assert_eq!(pulse_us_from_angle(180), 2500);
    // Truncating division: 49 degrees is 500 + 49*2000/180 = 1044 (not 1044.4).
    assert_eq!(pulse_us_from_angle(49), 1044);
}

#[test]
fn pulse_to_duty_rounding_matches_expected() {
    assert_eq!(duty_from_pulse_us(0), 0);
    assert_eq!(duty_from_pulse_us(1500), 307);
    assert_eq!(duty_from_pulse_us(2500), 512);
    // Full-frame pulse clamps to the 12-bit ceiling.
    assert_eq!(duty_from_pulse_us(20_000), 4095);
}

#[test]
fn startup_centers_every_channel() {
    let (bank, pwm) = bank();
    let writes = pwm.take_writes();
    assert_eq!(writes.len(), NUM_SERVOS);
    for (channel, write) in writes.iter().enumerate() {
        assert_eq!(*write, (channel as u8, 0, duty_from_pulse_us(1500)));
    }
    assert_eq!(bank.get_angle(0), CENTER_ANGLE);
    assert_eq!(bank.get_pulse_us(0), 1500);
}

#[test]
fn set_angle_clamps_to_180() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();

    bank.set_angle(2, 250);
    assert_eq!(bank.get_angle(2), 180);
    assert_eq!(bank.get_pulse_us(2), 2500);
    assert_eq!(pwm.take_writes(), vec![(2, 0, duty_from_pulse_us(2500))]);
}

#[test]
fn set_angle_out_of_range_channel_is_noop() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();

    bank.set_angle(NUM_SERVOS as u8, 45);
    assert!(pwm.take_writes().is_empty());
    // Invalid channels read back as the center defaults.
    assert_eq!(bank.get_angle(NUM_SERVOS as u8), CENTER_ANGLE);
    assert_eq!(bank.get_pulse_us(NUM_SERVOS as u8), 1500);
}

#[test]
fn calibration_pulse_does_not_touch_angle() {
    let (mut bank, _pwm) = bank();

    bank.set_angle(0, 45);
    bank.set_pulse_us(0, 700);
    assert_eq!(bank.get_angle(0), 45);
    assert_eq!(bank.get_pulse_us(0), 700);

    // Pulse clamps to one full frame.
    bank.set_pulse_us(0, 30_000);
    assert_eq!(bank.get_pulse_us(0), 20_000);
    assert_eq!(bank.get_angle(0), 45);
}

#[test]
fn pose_applies_in_order_and_ignores_extras() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();

    bank.execute_pose(&[10, 20, 30, 40, 50, 60, 70, 80]);
    let writes = pwm.take_writes();
    assert_eq!(writes.len(), NUM_SERVOS);
    for (channel, write) in writes.iter().enumerate() {
        let angle = 10 * (channel as u8 + 1);
        assert_eq!(
            *write,
            (
                channel as u8,
                0,
                duty_from_pulse_us(pulse_us_from_angle(angle))
            )
        );
        assert_eq!(bank.get_angle(channel as u8), angle);
    }
}

#[test]
fn pose_shorter_than_bank_leaves_rest_alone() {
    let (mut bank, _pwm) = bank();
    bank.execute_pose(&[0, 180]);
    assert_eq!(bank.get_angle(0), 0);
    assert_eq!(bank.get_angle(1), 180);
    for channel in 2..NUM_SERVOS as u8 {
        assert_eq!(bank.get_angle(channel), CENTER_ANGLE);
    }
}

#[test]
fn move_1000ms_runs_51_frames_and_50_sleeps() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();
    let mut delay = FakeDelay::default();

    block_on(bank.execute_move(1000, &[180], &mut delay));

    // 1000 ms / 20 ms = 50 steps, written at both endpoints: 51 frames.
    let writes = pwm.take_writes();
    assert_eq!(writes.len(), 51);
    // Frame 0 is the unmoved start position.
    assert_eq!(writes[0], (0, 0, duty_from_pulse_us(1500)));
    // Final frame is exactly the target.
    assert_eq!(writes[50], (0, 0, duty_from_pulse_us(2500)));
    // One 20 ms sleep between frames, none after the last.
    assert_eq!(delay.naps_ns, vec![20_000_000; 50]);
}

#[test]
fn move_interpolates_with_truncating_progress() {
    let (mut bank, pwm) = bank();
    bank.set_angle(0, 0);
    pwm.take_writes();
    let mut delay = FakeDelay::default();

    block_on(bank.execute_move(1000, &[49], &mut delay));

    // Halfway (step 25, factor 500): 0 + 49*500/1000 truncates to 24.
    let writes = pwm.take_writes();
    assert_eq!(
        writes[25],
        (0, 0, duty_from_pulse_us(pulse_us_from_angle(24)))
    );
    assert_eq!(bank.get_angle(0), 49);
}

#[test]
fn move_factor_truncation_scenario_490_gives_134() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();
    let mut delay = FakeDelay::default();

    // 1020 ms -> 51 interpolation steps. At step 25 the fixed-point
    // progress is 25*1000/51 = 490, so from 90 toward 180 the channel
    // sits at 90 + 90*490/1000 = 134.
    block_on(bank.execute_move(1020, &[180], &mut delay));

    let writes = pwm.take_writes();
    assert_eq!(writes.len(), 52);
    assert_eq!(
        writes[25],
        (0, 0, duty_from_pulse_us(pulse_us_from_angle(134)))
    );
    assert_eq!(bank.get_angle(0), 180);
}

#[test]
fn move_all_channels_arrive_together() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();
    let mut delay = FakeDelay::default();

    let targets = [0, 45, 135, 180, 10, 170];
    block_on(bank.execute_move(500, &targets, &mut delay));

    // 25 steps, 26 frames, all six channels per frame.
    assert_eq!(pwm.take_writes().len(), 26 * NUM_SERVOS);
    assert_eq!(delay.naps_ns.len(), 25);
    for (channel, &target) in targets.iter().enumerate() {
        assert_eq!(bank.get_angle(channel as u8), target);
    }
}

#[test]
fn move_under_one_step_is_instant_jump() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();
    let mut delay = FakeDelay::default();

    block_on(bank.execute_move(0, &[180], &mut delay));

    // num_steps clamps to 1: start frame, one sleep, target frame.
    let writes = pwm.take_writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1], (0, 0, duty_from_pulse_us(2500)));
    assert_eq!(delay.naps_ns.len(), 1);
    assert_eq!(bank.get_angle(0), 180);
}

#[test]
fn move_with_no_targets_does_nothing() {
    let (mut bank, pwm) = bank();
    pwm.take_writes();
    let mut delay = FakeDelay::default();

    block_on(bank.execute_move(1000, &[], &mut delay));

    assert!(pwm.take_writes().is_empty());
    assert!(delay.naps_ns.is_empty());
}

#[test]
fn move_clamps_targets_above_180() {
    let (mut bank, _pwm) = bank();
    let mut delay = FakeDelay::default();

    block_on(bank.execute_move(100, &[255], &mut delay));
    assert_eq!(bank.get_angle(0), 180);
}

#[test]
fn relax_all_releases_channels_but_keeps_state() {
    let (mut bank, pwm) = bank();
    bank.set_angle(3, 120);

    bank.relax_all();
    assert_eq!(pwm.all_off_calls(), 1);
    assert_eq!(bank.get_angle(3), 120);
}
