//! Single-byte serial command channel.
//!
//! A Bluetooth serial module (HC-05/HC-06 class) forwards one ASCII byte per
//! button press. Bytes are matched case-insensitively; each recognised command
//! is answered with a fixed CRLF-terminated acknowledgement, anything else is
//! dropped without a reply.
//!
//! ```text
//!   A  auto (follow)     S  stop (manual)
//!   F  forward           B  backward
//!   L  spin left         R  spin right
//!   +  speed up          -  speed down
//!   T  ping
//! ```

use embedded_io::{Read, ReadReady, Write};

/// Banner written once the link is up.
pub const BANNER: &[u8] = b"Ready. Send A,S,F,B,L,R,+,-,T\r\n";

/// Robot commands accepted over the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Hand control back to the follow strategy.
    Auto,
    /// Stop and stay stopped.
    Stop,
    Forward,
    Back,
    Left,
    Right,
    SpeedUp,
    SpeedDown,
    /// Link check, acknowledged only.
    Ping,
}

impl Command {
    /// Decode a received byte. Unknown and non-ASCII bytes yield `None`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_uppercase() {
            b'A' => Some(Command::Auto),
            b'S' => Some(Command::Stop),
            b'F' => Some(Command::Forward),
            b'B' => Some(Command::Back),
            b'L' => Some(Command::Left),
            b'R' => Some(Command::Right),
            b'+' => Some(Command::SpeedUp),
            b'-' => Some(Command::SpeedDown),
            b'T' => Some(Command::Ping),
            _ => None,
        }
    }

    /// Acknowledgement written back after the command is applied.
    pub fn ack(self) -> &'static [u8] {
        match self {
            Command::Auto => b"Mode: AUTO\r\n",
            Command::Stop => b"STOP\r\n",
            Command::Forward => b"FORWARD\r\n",
            Command::Back => b"BACKWARD\r\n",
            Command::Left => b"LEFT\r\n",
            Command::Right => b"RIGHT\r\n",
            Command::SpeedUp => b"SPEED UP\r\n",
            Command::SpeedDown => b"SPEED DOWN\r\n",
            Command::Ping => b"PICO OK\r\n",
        }
    }
}

/// Non-blocking reader/acknowledger over a byte serial port.
pub struct CommandChannel<U> {
    uart: U,
}

impl<U> CommandChannel<U>
where
    U: Read + ReadReady + Write,
{
    pub fn new(uart: U) -> Self {
        Self { uart }
    }

    /// Take one buffered byte if there is one. Never blocks; read errors are
    /// treated as "nothing received".
    pub fn poll(&mut self) -> Option<u8> {
        match self.uart.read_ready() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(error) => {
                tracing::debug!(?error, "serial read_ready failed");
                return None;
            }
        }

        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(error) => {
                tracing::debug!(?error, "serial read failed");
                None
            }
        }
    }

    /// Poll and decode in one step.
    pub fn next_command(&mut self) -> Option<Command> {
        let byte = self.poll()?;
        let command = Command::from_byte(byte);
        if command.is_none() {
            tracing::trace!(byte, "ignoring unknown command byte");
        }
        command
    }

    pub fn acknowledge(
        &mut self,
        command: Command,
    ) {
        self.send(command.ack());
    }

    /// Write the boot banner.
    pub fn announce(&mut self) {
        self.send(BANNER);
    }

    fn send(
        &mut self,
        bytes: &[u8],
    ) {
        if let Err(error) = self.uart.write_all(bytes).and_then(|_| self.uart.flush()) {
            tracing::error!(?error, "failed to write to serial link");
        }
    }

    pub fn release(self) -> U {
        self.uart
    }
}
