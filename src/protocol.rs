//! Serial command-line protocol: parse, dispatch, reply.
//!
//! One newline-terminated line in, one reply out. Keywords are
//! case-insensitive. Channel indices are a single hex digit (`0`-`F`), so
//! the wire format scales to the expander's 16 channels even though the arm
//! uses six.
//!
//! | Command | Format |
//! |---|---|
//! | Set angle | `S<hex>:<0-180>` |
//! | Set pulse | `P<hex>:<0-20000>` (calibration) |
//! | Multi-set | `POSE <a1>,<a2>,...` |
//! | Timed move | `MOVE <ms> <a1>,<a2>,...` |
//! | Query | `GET <hex>` |
//! | Help | `HELP` |
//! | Exit mode | `STOP` |
//!
//! Multi-character keywords are matched before the single-letter `S`/`P`
//! prefixes, so `STOP` can never be misread as a malformed servo command.
//! Every accepted mutation replies `OK`; every rejection replies a specific
//! error token and leaves all state untouched (list parsing is atomic).
//!
//! The session model lives here too: [`wait_for_start`] watches an idle
//! link for `START`, then [`run_session`] loops read-dispatch-reply until
//! `STOP`.

use core::fmt;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::Write;
use heapless::{String, Vec};

use crate::engine::{MAX_ANGLE, MAX_PULSE_US, ServoBank};
use crate::pwm::PwmChannels;

/// Line buffer capacity, including room for the terminator.
pub const CMD_BUFFER_SIZE: usize = 32;

/// Reply buffer capacity. The multi-line HELP text is the largest reply
/// (a little under 900 bytes); heapless strings reject a write that does
/// not fit whole, so this must hold all of it.
pub const REPLY_BUFFER_SIZE: usize = 1024;

/// A parsed, validated command, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<const N: usize> {
    /// `S<hex>:<angle>` - set one channel's angle.
    SetAngle {
        /// Target channel, already validated against `N`.
        channel: u8,
        /// Angle in degrees, already validated to `0..=180`.
        angle: u8,
    },
    /// `P<hex>:<pulse>` - set one channel's raw pulse width (calibration).
    SetPulse {
        /// Target channel, already validated against `N`.
        channel: u8,
        /// Pulse width in microseconds, already validated to `0..=20000`.
        pulse_us: u16,
    },
    /// `POSE <a1>,<a2>,...` - instant multi-channel set.
    Pose(Vec<u8, N>),
    /// `MOVE <ms> <a1>,<a2>,...` - synchronized interpolated move.
    Move {
        /// Total move duration in milliseconds.
        duration_ms: u16,
        /// Target angles for channels `0..len`.
        angles: Vec<u8, N>,
    },
    /// `GET <hex>` - query one channel's angle.
    Get {
        /// Channel to query.
        channel: u8,
    },
    /// `HELP` - print the command summary.
    Help,
    /// `STOP` - leave serial mode.
    Stop,
}

/// Which command shape a syntax error occurred in (selects the reply text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdKind {
    /// `S<hex>:<angle>` or `P<hex>:<pulse>`.
    Servo,
    /// `POSE ...`
    Pose,
    /// `MOVE ...`
    Move,
    /// `GET ...`
    Get,
}

/// Why a line was rejected. Rendered as the wire error token; rejected
/// commands never mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdError {
    /// The line matched no known command.
    Unknown,
    /// The command keyword was recognized but the shape was malformed.
    Syntax(CmdKind),
    /// Channel index out of the configured range.
    InvalidChannel,
    /// An angle exceeded 180.
    InvalidAngle,
    /// A pulse width exceeded 20000 µs.
    InvalidPulse,
    /// More angles than configured channels.
    TooManyServos,
}

/// Did the dispatched line end the session?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading commands.
    Continue,
    /// `STOP` was processed; leave serial mode.
    Exit,
}

/// Uppercase hex digit for a value `0..=15`.
#[must_use]
pub fn hex_char(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        10..=15 => (b'A' + (value - 10)) as char,
        _ => '?',
    }
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Left-to-right scanner over a command line.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.bump();
        }
    }

    /// Parse an unsigned decimal number. Fails if the first character is
    /// not a digit or the value overflows 16 bits.
    fn parse_u16(&mut self) -> Option<u16> {
        let mut value: u32 = 0;
        let mut digits = 0;
        while let Some(byte @ b'0'..=b'9') = self.peek() {
            value = value * 10 + u32::from(byte - b'0');
            if value > u32::from(u16::MAX) {
                return None;
            }
            digits += 1;
            self.bump();
        }
        (digits > 0).then_some(value as u16)
    }

    /// Consume a comma separator (with optional surrounding whitespace) or
    /// end-of-line. Anything else is a stray character.
    fn skip_comma(&mut self) -> bool {
        self.skip_whitespace();
        match self.peek() {
            Some(b',') => {
                self.bump();
                true
            }
            None => true,
            Some(_) => false,
        }
    }
}

/// Parse a comma-separated angle list. Atomic: any failure yields an error
/// and no angles.
fn parse_angle_list<const N: usize>(
    scanner: &mut Scanner<'_>,
    kind: CmdKind,
) -> Result<Vec<u8, N>, CmdError> {
    let mut angles: Vec<u8, N> = Vec::new();
    loop {
        scanner.skip_whitespace();
        if scanner.at_end() {
            break;
        }
        let value = scanner.parse_u16().ok_or(CmdError::Syntax(kind))?;
        if value > u16::from(MAX_ANGLE) {
            return Err(CmdError::InvalidAngle);
        }
        if angles.push(value as u8).is_err() {
            return Err(CmdError::TooManyServos);
        }
        if !scanner.skip_comma() {
            return Err(CmdError::Syntax(kind));
        }
    }
    if angles.is_empty() {
        return Err(CmdError::Syntax(kind));
    }
    Ok(angles)
}

/// Parse the `<hex>:<number>` tail shared by `S` and `P`.
fn parse_channel_value<const N: usize>(rest: &[u8]) -> Result<(u8, u16), CmdError> {
    // Minimum shape: one hex digit, a colon, one digit.
    let (&channel_byte, rest) = rest.split_first().ok_or(CmdError::Syntax(CmdKind::Servo))?;
    let channel = hex_digit(channel_byte).ok_or(CmdError::InvalidChannel)?;
    if usize::from(channel) >= N {
        return Err(CmdError::InvalidChannel);
    }
    let (&colon, rest) = rest.split_first().ok_or(CmdError::Syntax(CmdKind::Servo))?;
    if colon != b':' {
        return Err(CmdError::Syntax(CmdKind::Servo));
    }
    let mut scanner = Scanner {
        bytes: rest,
        pos: 0,
    };
    let value = scanner
        .parse_u16()
        .ok_or(CmdError::Syntax(CmdKind::Servo))?;
    if !scanner.at_end() {
        return Err(CmdError::Syntax(CmdKind::Servo));
    }
    Ok((channel, value))
}

fn keyword_with_space(line: &str, keyword: &str) -> bool {
    line.len() > keyword.len()
        && line.as_bytes().get(keyword.len()) == Some(&b' ')
        && line
            .get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}

/// Parse one line into a command.
///
/// Returns `Ok(None)` for an empty line (nothing to do, no reply).
/// Keyword commands are checked before the `S`/`P` prefixes; see the
/// [module docs](self) for the precedence rationale.
pub fn parse_line<const N: usize>(line: &str) -> Result<Option<Command<N>>, CmdError> {
    if line.is_empty() {
        return Ok(None);
    }

    if line.eq_ignore_ascii_case("STOP") {
        return Ok(Some(Command::Stop));
    }
    if line.eq_ignore_ascii_case("HELP") {
        return Ok(Some(Command::Help));
    }

    if keyword_with_space(line, "GET") {
        let rest = line.as_bytes().get(4..).unwrap_or_default();
        // Exactly one hex digit naming a configured channel.
        let [channel_byte] = rest else {
            return Err(CmdError::Syntax(CmdKind::Get));
        };
        let channel = hex_digit(*channel_byte).ok_or(CmdError::Syntax(CmdKind::Get))?;
        if usize::from(channel) >= N {
            return Err(CmdError::Syntax(CmdKind::Get));
        }
        return Ok(Some(Command::Get { channel }));
    }

    if keyword_with_space(line, "POSE") {
        let mut scanner = Scanner::new(line);
        scanner.pos = 5;
        let angles = parse_angle_list::<N>(&mut scanner, CmdKind::Pose)?;
        return Ok(Some(Command::Pose(angles)));
    }

    if keyword_with_space(line, "MOVE") {
        let mut scanner = Scanner::new(line);
        scanner.pos = 5;
        scanner.skip_whitespace();
        let duration_ms = scanner
            .parse_u16()
            .ok_or(CmdError::Syntax(CmdKind::Move))?;
        scanner.skip_whitespace();
        let angles = parse_angle_list::<N>(&mut scanner, CmdKind::Move)?;
        return Ok(Some(Command::Move {
            duration_ms,
            angles,
        }));
    }

    match line.as_bytes().first() {
        Some(b'S' | b's') => {
            let rest = line.as_bytes().get(1..).unwrap_or_default();
            let (channel, value) = parse_channel_value::<N>(rest)?;
            if value > u16::from(MAX_ANGLE) {
                return Err(CmdError::InvalidAngle);
            }
            Ok(Some(Command::SetAngle {
                channel,
                angle: value as u8,
            }))
        }
        Some(b'P' | b'p') => {
            let rest = line.as_bytes().get(1..).unwrap_or_default();
            let (channel, value) = parse_channel_value::<N>(rest)?;
            if value > MAX_PULSE_US {
                return Err(CmdError::InvalidPulse);
            }
            Ok(Some(Command::SetPulse {
                channel,
                pulse_us: value,
            }))
        }
        _ => Err(CmdError::Unknown),
    }
}

/// Render the error token for a rejected line.
fn write_error<const N: usize>(error: CmdError, out: &mut impl fmt::Write) -> fmt::Result {
    let top = hex_char(N.saturating_sub(1) as u8);
    match error {
        CmdError::Unknown => writeln!(out, "ERROR: Unknown command (type HELP for list)"),
        CmdError::Syntax(CmdKind::Servo) => writeln!(out, "ERROR: Invalid command format"),
        CmdError::Syntax(CmdKind::Pose) => writeln!(out, "ERROR: Invalid POSE format"),
        CmdError::Syntax(CmdKind::Move) => writeln!(out, "ERROR: Invalid MOVE format"),
        CmdError::Syntax(CmdKind::Get) => writeln!(out, "ERROR: Invalid GET command"),
        CmdError::InvalidChannel => {
            writeln!(out, "ERROR: Invalid servo (must be 0-{top} hex)")
        }
        CmdError::InvalidAngle => writeln!(out, "ERROR: Invalid angle (must be 0-180)"),
        CmdError::InvalidPulse => writeln!(out, "ERROR: Invalid pulse (must be 0-20000)"),
        CmdError::TooManyServos => writeln!(out, "ERROR: Too many servos (max {top})"),
    }
}

/// Write the multi-line HELP summary.
pub fn write_help(out: &mut impl fmt::Write) -> fmt::Result {
    out.write_str(concat!(
        "\n=== Robot Arm Serial Commands ===\n",
        "START              - Enter serial control mode\n",
        "STOP               - Exit serial control mode\n",
        "S<n>:<angle>       - Set servo n to angle (0-180)\n",
        "                     n = 0-9,A-F (hex)\n",
        "                     Example: S0:90, S5:45, SA:120\n",
        "P<n>:<pulse>       - Set servo n pulse width in us (0-20000)\n",
        "                     Example: P0:1500 (calibration)\n",
        "POSE <angles>      - Set multiple servos instantly\n",
        "                     Example: POSE 90,45,120,90,60,30\n",
        "                     Sets servos 0,1,2,3,4,5\n",
        "MOVE <ms> <angles> - Smooth move over duration (ms)\n",
        "                     Example: MOVE 2000 90,45,120,90,60,30\n",
        "                     All servos finish simultaneously\n",
        "GET <n>            - Query servo n position\n",
        "                     Example: GET 0, GET A\n",
        "HELP               - Show this help message\n",
        "=====================================\n",
    ))
}

/// Parse and execute one line, writing the reply to `out`.
///
/// Rejected lines produce an error token and leave the servo bank
/// untouched. A `MOVE` line blocks here for its whole duration; nothing
/// else runs until it lands (no cancellation anywhere in the firmware).
///
/// # Errors
///
/// Only if the reply overflows `out`.
pub async fn handle_line<D: PwmChannels, const N: usize>(
    line: &str,
    bank: &mut ServoBank<D, N>,
    delay: &mut impl DelayNs,
    out: &mut impl fmt::Write,
) -> Result<Outcome, fmt::Error> {
    let command = match parse_line::<N>(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(Outcome::Continue),
        Err(error) => {
            write_error::<N>(error, out)?;
            return Ok(Outcome::Continue);
        }
    };

    match command {
        Command::SetAngle { channel, angle } => {
            bank.set_angle(channel, angle);
            writeln!(out, "OK")?;
        }
        Command::SetPulse { channel, pulse_us } => {
            bank.set_pulse_us(channel, pulse_us);
            writeln!(out, "OK")?;
        }
        Command::Pose(angles) => {
            bank.execute_pose(&angles);
            writeln!(out, "OK")?;
        }
        Command::Move {
            duration_ms,
            angles,
        } => {
            bank.execute_move(duration_ms, &angles, delay).await;
            writeln!(out, "OK")?;
        }
        Command::Get { channel } => {
            writeln!(
                out,
                "SERVO {}: {} degrees",
                hex_char(channel),
                bank.get_angle(channel)
            )?;
        }
        Command::Help => write_help(out)?,
        Command::Stop => {
            writeln!(out, "OK")?;
            writeln!(out, "Exiting serial mode")?;
            return Ok(Outcome::Exit);
        }
    }
    Ok(Outcome::Continue)
}

/// Asynchronous byte supplier for the line reader.
///
/// On hardware this is the receive ring fed by the UART task; in tests it
/// is a scripted byte sequence.
pub trait ByteSource {
    /// Wait indefinitely for the next byte. There are no timeouts.
    async fn next_byte(&mut self) -> u8;
}

/// Read one full line into `buf`: bounded, backspace-editable, terminated
/// by CR or LF.
///
/// NULs are ignored, empty lines are skipped (filters the second half of
/// CRLF), backspace (0x08/0x7F) deletes, and only printable ASCII is
/// accepted. Input beyond the buffer capacity is silently dropped.
pub async fn read_line<const CAP: usize>(rx: &mut impl ByteSource, buf: &mut String<CAP>) {
    buf.clear();
    loop {
        let byte = rx.next_byte().await;
        match byte {
            0 => {}
            b'\r' | b'\n' => {
                if !buf.is_empty() {
                    return;
                }
            }
            0x08 | 0x7F => {
                buf.pop();
            }
            0x20..=0x7E => {
                let _ = buf.push(byte as char);
            }
            _ => {}
        }
    }
}

/// Watch an idle link until a `START` line arrives.
///
/// `HELP` gets the command summary; anything else gets a hint. Returns
/// when serial mode should begin.
///
/// # Errors
///
/// Propagates transport write errors.
pub async fn wait_for_start<W: Write>(
    rx: &mut impl ByteSource,
    tx: &mut W,
) -> Result<(), W::Error> {
    let mut line: String<CMD_BUFFER_SIZE> = String::new();
    loop {
        read_line(rx, &mut line).await;
        if line.eq_ignore_ascii_case("START") {
            return Ok(());
        }
        let mut reply: String<REPLY_BUFFER_SIZE> = String::new();
        if line.eq_ignore_ascii_case("HELP") {
            let _ = write_help(&mut reply);
        }
        let _ = reply.push_str("Type START to enter serial mode\n");
        tx.write_all(reply.as_bytes()).await?;
    }
}

/// Run serial mode: banner, then read-dispatch-reply until `STOP`.
///
/// # Errors
///
/// Propagates transport write errors.
pub async fn run_session<R, W, D, const N: usize>(
    bank: &mut ServoBank<D, N>,
    rx: &mut R,
    tx: &mut W,
    delay: &mut impl DelayNs,
) -> Result<(), W::Error>
where
    R: ByteSource,
    W: Write,
    D: PwmChannels,
{
    tx.write_all(
        concat!(
            "OK\n",
            "\n=== SERIAL MODE ACTIVE ===\n",
            "Type HELP for command list\n",
            "Type STOP to exit\n\n",
        )
        .as_bytes(),
    )
    .await?;

    let mut line: String<CMD_BUFFER_SIZE> = String::new();
    loop {
        tx.write_all(b"> ").await?;
        read_line(rx, &mut line).await;

        let mut reply: String<REPLY_BUFFER_SIZE> = String::new();
        let outcome = handle_line(&line, bank, delay, &mut reply)
            .await
            .unwrap_or(Outcome::Continue);
        tx.write_all(reply.as_bytes()).await?;

        if outcome == Outcome::Exit {
            break;
        }
    }

    tx.write_all(b"\n=== BUTTON MODE ACTIVE ===\n").await?;
    Ok(())
}

/// [`ByteSource`] over the shared receive ring, polling at 1 ms when empty.
#[cfg(not(feature = "host"))]
pub struct RingSource<'a, const N: usize> {
    ring: &'a crate::ring::RxRing<N>,
}

#[cfg(not(feature = "host"))]
impl<'a, const N: usize> RingSource<'a, N> {
    /// Wrap the consumer side of a receive ring.
    #[must_use]
    pub const fn new(ring: &'a crate::ring::RxRing<N>) -> Self {
        Self { ring }
    }

    /// Whether a byte is waiting (used by the idle dispatch loop).
    #[must_use]
    pub fn has_input(&self) -> bool {
        !self.ring.is_empty()
    }
}

#[cfg(not(feature = "host"))]
impl<const N: usize> ByteSource for RingSource<'_, N> {
    async fn next_byte(&mut self) -> u8 {
        loop {
            if let Some(byte) = self.ring.pop() {
                return byte;
            }
            embassy_time::Timer::after_millis(1).await;
        }
    }
}
