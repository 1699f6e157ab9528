//! Button-driven menu on a 16x2 character display.
//!
//! Four entries: live motor jog, pulse calibration, staged POSE, and staged
//! MOVE. Motors and Calibration write to the servo bank as you step;
//! POSE and MOVE edit a staging buffer and only touch hardware on Select.
//!
//! All cursors clamp at their bounds (no wraparound), so a held Left or
//! Right parks at the edge instead of cycling.

use core::fmt::Write as _;

use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::engine::ServoBank;
use crate::keypad::Button;
use crate::pwm::PwmChannels;

// ============================================================================
// Constants
// ============================================================================

/// Degrees per Up/Down step in the Motors and POSE/MOVE screens.
const ANGLE_STEP: u8 = 5;

/// Microseconds per Up/Down step in the Calibration screen.
const PULSE_STEP_US: u16 = 10;

/// Milliseconds per Up/Down step in the MOVE duration screen.
const DURATION_STEP_MS: u16 = 100;

/// MOVE duration bounds, inclusive.
const DURATION_MIN_MS: u16 = 100;
const DURATION_MAX_MS: u16 = 9900;

/// Number of top-level menu entries.
const MENU_ITEMS: u8 = 4;

/// How long result banners ("POSE Executed!" etc.) stay up.
const BANNER_MS: u32 = 1000;

/// DDRAM address of the second display row.
pub const ROW2: u8 = 0x40;

// ============================================================================
// TextScreen
// ============================================================================

/// Minimal cursor-addressable text output, as HD44780-class displays
/// present it. Hardware wraps the real display; tests record a 16x2 grid.
pub trait TextScreen {
    /// Blank the display and home the cursor.
    fn clear(&mut self);
    /// Move the cursor to a DDRAM address ([`ROW2`] starts row two).
    fn set_cursor(&mut self, position: u8);
    /// Write text at the cursor.
    fn print(&mut self, text: &str);
}

// ============================================================================
// Menu state machine
// ============================================================================

/// Which screen the menu is on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, defmt::Format)]
pub enum MenuScreen {
    /// Top-level entry list.
    Main,
    /// Live angle jog, one servo at a time.
    Motors,
    /// Live pulse-width trim, one servo at a time.
    Calibration,
    /// Staged multi-servo set; Select commits instantly.
    Pose,
    /// Staged MOVE, duration entry step.
    MoveDuration,
    /// Staged MOVE, per-servo angle entry step; Select runs the move.
    MoveAngles,
}

/// Menu cursor state plus the POSE/MOVE staging buffer.
///
/// `N` is the servo count; the staging buffer holds one target angle per
/// servo and persists across visits so a tweaked pose can be re-run.
pub struct Menu<const N: usize> {
    screen: MenuScreen,
    selection: u8,
    servo: u8,
    duration_ms: u16,
    staged: [u8; N],
}

impl<const N: usize> Default for Menu<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Menu<N> {
    /// Fresh menu at the top level with a centered staging buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            screen: MenuScreen::Main,
            selection: 0,
            servo: 0,
            duration_ms: 1000,
            staged: [crate::engine::CENTER_ANGLE; N],
        }
    }

    /// Current screen (tests assert on this).
    #[must_use]
    pub fn screen(&self) -> MenuScreen {
        self.screen
    }

    /// Staged angle for one servo.
    #[must_use]
    pub fn staged_angle(&self, channel: u8) -> u8 {
        self.staged.get(usize::from(channel)).copied().unwrap_or(0)
    }

    /// Staged MOVE duration.
    #[must_use]
    pub fn duration_ms(&self) -> u16 {
        self.duration_ms
    }

    /// Return to the top level and seed the staging buffer from the bank's
    /// current angles. Called when button mode (re)gains control.
    pub fn reset<D: PwmChannels>(&mut self, bank: &ServoBank<D, N>) {
        self.screen = MenuScreen::Main;
        self.selection = 0;
        self.servo = 0;
        for (channel, slot) in self.staged.iter_mut().enumerate() {
            *slot = bank.get_angle(channel as u8);
        }
    }

    /// Redraw the current screen.
    pub fn show<D: PwmChannels>(&self, bank: &ServoBank<D, N>, screen: &mut impl TextScreen) {
        screen.clear();
        match self.screen {
            MenuScreen::Main => self.show_main(screen),
            MenuScreen::Motors => {
                print_line(screen, 0, "M");
                print_u16(screen, u16::from(self.servo));
                screen.print(" Ang:");
                print_u16(screen, u16::from(bank.get_angle(self.servo)));
                print_line(screen, ROW2, "L/R=Srv U/D=Ang");
            }
            MenuScreen::Calibration => {
                print_line(screen, 0, "M");
                print_u16(screen, u16::from(self.servo));
                screen.print(" ");
                print_u16(screen, bank.get_pulse_us(self.servo));
                screen.print("us");
                print_line(screen, ROW2, "L/R=Srv U/D=us");
            }
            MenuScreen::Pose => {
                print_line(screen, 0, "POSE M");
                print_u16(screen, u16::from(self.servo));
                screen.print(":");
                print_u16(screen, u16::from(self.staged_angle(self.servo)));
                print_line(screen, ROW2, "L/R=Srv SEL=Exec");
            }
            MenuScreen::MoveDuration => {
                print_line(screen, 0, "MOVE Duration");
                screen.set_cursor(ROW2);
                print_u16(screen, self.duration_ms);
                screen.print("ms  SEL=Next");
            }
            MenuScreen::MoveAngles => {
                print_line(screen, 0, "MOVE M");
                print_u16(screen, u16::from(self.servo));
                screen.print(":");
                print_u16(screen, u16::from(self.staged_angle(self.servo)));
                print_line(screen, ROW2, "L/R=Srv SEL=Exec");
            }
        }
    }

    fn show_main(&self, screen: &mut impl TextScreen) {
        const LABELS: [&str; MENU_ITEMS as usize] =
            ["1.Motors", "2.Calibration", "3.POSE", "4.MOVE"];
        // Two visible rows; the window slides so the selection stays on
        // screen and carries the `>` cursor.
        let top = usize::from(self.selection).min(LABELS.len() - 2);
        for (row, position) in [(top, 0), (top + 1, ROW2)] {
            screen.set_cursor(position);
            screen.print(if row == usize::from(self.selection) {
                ">"
            } else {
                " "
            });
            screen.print(LABELS[row]);
        }
    }

    /// Apply one button event, updating state, the servo bank, and the
    /// display. A MOVE commit blocks here for its whole duration.
    pub async fn handle<D: PwmChannels>(
        &mut self,
        button: Button,
        bank: &mut ServoBank<D, N>,
        screen: &mut impl TextScreen,
        delay: &mut impl DelayNs,
    ) {
        if button == Button::None {
            return;
        }
        match self.screen {
            MenuScreen::Main => self.handle_main(button),
            MenuScreen::Motors => self.handle_motors(button, bank),
            MenuScreen::Calibration => self.handle_calibration(button, bank),
            MenuScreen::Pose => {
                if self.handle_staged(button) {
                    bank.execute_pose(&self.staged);
                    banner(screen, "POSE Executed!");
                    delay.delay_ms(BANNER_MS).await;
                    self.screen = MenuScreen::Main;
                }
            }
            MenuScreen::MoveDuration => self.handle_duration(button),
            MenuScreen::MoveAngles => {
                if self.handle_staged(button) {
                    banner(screen, "Moving...");
                    let staged = self.staged;
                    bank.execute_move(self.duration_ms, &staged, delay).await;
                    banner(screen, "MOVE Complete!");
                    delay.delay_ms(BANNER_MS).await;
                    self.screen = MenuScreen::Main;
                }
            }
        }
        self.show(bank, screen);
    }

    fn handle_main(&mut self, button: Button) {
        match button {
            Button::Up => self.selection = self.selection.saturating_sub(1),
            Button::Down => self.selection = (self.selection + 1).min(MENU_ITEMS - 1),
            Button::Select | Button::Right => {
                self.servo = 0;
                self.screen = match self.selection {
                    0 => MenuScreen::Motors,
                    1 => MenuScreen::Calibration,
                    2 => MenuScreen::Pose,
                    _ => MenuScreen::MoveDuration,
                };
            }
            Button::Left | Button::None => {}
        }
    }

    fn handle_motors<D: PwmChannels>(&mut self, button: Button, bank: &mut ServoBank<D, N>) {
        match button {
            Button::Left if self.servo == 0 => self.screen = MenuScreen::Main,
            Button::Left => self.servo -= 1,
            Button::Right => self.servo = (self.servo + 1).min(N as u8 - 1),
            Button::Up => {
                let angle = bank.get_angle(self.servo).saturating_add(ANGLE_STEP);
                bank.set_angle(self.servo, angle);
            }
            Button::Down => {
                let angle = bank.get_angle(self.servo).saturating_sub(ANGLE_STEP);
                bank.set_angle(self.servo, angle);
            }
            Button::Select => self.screen = MenuScreen::Main,
            Button::None => {}
        }
    }

    fn handle_calibration<D: PwmChannels>(&mut self, button: Button, bank: &mut ServoBank<D, N>) {
        match button {
            Button::Left if self.servo == 0 => self.screen = MenuScreen::Main,
            Button::Left => self.servo -= 1,
            Button::Right => self.servo = (self.servo + 1).min(N as u8 - 1),
            Button::Up => {
                let pulse = bank.get_pulse_us(self.servo).saturating_add(PULSE_STEP_US);
                bank.set_pulse_us(self.servo, pulse);
            }
            Button::Down => {
                let pulse = bank.get_pulse_us(self.servo).saturating_sub(PULSE_STEP_US);
                bank.set_pulse_us(self.servo, pulse);
            }
            Button::Select => self.screen = MenuScreen::Main,
            Button::None => {}
        }
    }

    /// Shared POSE / MOVE-angles editing. Returns true on Select (commit).
    fn handle_staged(&mut self, button: Button) -> bool {
        match button {
            Button::Left if self.servo == 0 => self.screen = MenuScreen::Main,
            Button::Left => self.servo -= 1,
            Button::Right => self.servo = (self.servo + 1).min(N as u8 - 1),
            Button::Up => {
                let slot = &mut self.staged[usize::from(self.servo)];
                *slot = slot.saturating_add(ANGLE_STEP).min(crate::engine::MAX_ANGLE);
            }
            Button::Down => {
                let slot = &mut self.staged[usize::from(self.servo)];
                *slot = slot.saturating_sub(ANGLE_STEP);
            }
            Button::Select => return true,
            Button::None => {}
        }
        false
    }

    fn handle_duration(&mut self, button: Button) {
        match button {
            Button::Up => {
                self.duration_ms = (self.duration_ms + DURATION_STEP_MS).min(DURATION_MAX_MS);
            }
            Button::Down => {
                self.duration_ms = self
                    .duration_ms
                    .saturating_sub(DURATION_STEP_MS)
                    .max(DURATION_MIN_MS);
            }
            Button::Select | Button::Right => {
                self.servo = 0;
                self.screen = MenuScreen::MoveAngles;
            }
            Button::Left => self.screen = MenuScreen::Main,
            Button::None => {}
        }
    }
}

// ============================================================================
// Rendering helpers
// ============================================================================

fn print_line(screen: &mut impl TextScreen, position: u8, text: &str) {
    screen.set_cursor(position);
    screen.print(text);
}

fn print_u16(screen: &mut impl TextScreen, value: u16) {
    let mut text: String<8> = String::new();
    let _ = write!(text, "{value}");
    screen.print(&text);
}

/// Full-screen status message.
fn banner(screen: &mut impl TextScreen, text: &str) {
    screen.clear();
    screen.print(text);
}
