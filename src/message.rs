//! Guard protocol wire vocabulary.
//!
//! Commands travel as short uppercase ASCII datagrams between the
//! controller and the actuator. Every command is an idempotent absolute
//! instruction, never a delta, so lost or duplicated datagrams are
//! harmless: the next command simply restates the desired state.
//!
//! | Wire form | Meaning |
//! |-----------|---------|
//! | `MARCO` | Discovery request (broadcast) |
//! | `POLO` | Discovery reply (unicast to the asker) |
//! | `CONTROL <F\|R\|N> <0-100>` | Direction letter and speed percent |
//! | `STOP` | Stop the locomotive / leave automatic mode |
//! | `AUTO` | Request automatic (bounce) mode |
//! | `BOUNCE` | Automatic mode acknowledged |
//! | `FORWARD_END` / `REVERSE_END` | End-sensor notifications |
//! | `ERROR` | Peer-reported fault |
//! | `ECHO <text>` | Diagnostic echo of unparseable traffic |
//!
//! Parsing returns `Option`: garbled input is `None` and the receiver
//! echoes it back for diagnostics rather than faulting.

use core::fmt::Write;

use heapless::String;

use crate::traits::network::MAX_DATAGRAM;
use crate::traits::LeverDirection;

/// Encoded wire message buffer.
pub type WireString = String<MAX_DATAGRAM>;

/// One guard protocol command.
///
/// # Example
///
/// ```rust
/// use rs_shunter::message::Message;
/// use rs_shunter::traits::LeverDirection;
///
/// let msg = Message::parse(b"CONTROL F 40").unwrap();
/// assert_eq!(
///     msg,
///     Message::Control {
///         direction: LeverDirection::Forward,
///         speed: 40,
///     }
/// );
/// assert_eq!(msg.encode().as_str(), "CONTROL F 40");
///
/// assert_eq!(Message::parse(b"MARCO\n"), Some(Message::Marco));
/// assert_eq!(Message::parse(b"gibberish"), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Message {
    /// Discovery request.
    Marco,
    /// Discovery reply.
    Polo,
    /// Direction and speed command.
    Control {
        /// Commanded direction (`N` means brake to rest).
        direction: LeverDirection,
        /// Commanded speed, percent of maximum.
        speed: u8,
    },
    /// Stop the locomotive / leave automatic mode.
    Stop,
    /// Request automatic (bounce) operation.
    Auto,
    /// Automatic operation acknowledged.
    Bounce,
    /// The forward-end sensor fired.
    ForwardEnd,
    /// The reverse-end sensor fired.
    ReverseEnd,
    /// Peer-reported fault.
    Error,
    /// Diagnostic echo (payload is not interpreted).
    Echo,
}

impl Message {
    /// Parse a received datagram. `None` for anything garbled.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = core::str::from_utf8(payload).ok()?;
        let mut tokens = text.split_ascii_whitespace();

        let message = match tokens.next()? {
            "MARCO" => Message::Marco,
            "POLO" => Message::Polo,
            "STOP" => Message::Stop,
            "AUTO" => Message::Auto,
            "BOUNCE" => Message::Bounce,
            "FORWARD_END" => Message::ForwardEnd,
            "REVERSE_END" => Message::ReverseEnd,
            "ERROR" => Message::Error,
            // echoed payloads are diagnostics; the content is not re-parsed
            "ECHO" => return Some(Message::Echo),
            "CONTROL" => {
                let mut letter = tokens.next()?.chars();
                let direction = LeverDirection::from_letter(letter.next()?)?;
                if letter.next().is_some() {
                    return None;
                }
                let speed: u8 = tokens.next()?.parse().ok()?;
                if speed > 100 {
                    return None;
                }
                Message::Control { direction, speed }
            }
            _ => return None,
        };

        // trailing junk after a complete command is garbled traffic
        if tokens.next().is_some() {
            return None;
        }
        Some(message)
    }

    /// Encode for the wire.
    pub fn encode(&self) -> WireString {
        let mut out = WireString::new();
        // the buffer is sized for the longest command; writes cannot fail
        let _ = match self {
            Message::Marco => out.push_str("MARCO"),
            Message::Polo => out.push_str("POLO"),
            Message::Stop => out.push_str("STOP"),
            Message::Auto => out.push_str("AUTO"),
            Message::Bounce => out.push_str("BOUNCE"),
            Message::ForwardEnd => out.push_str("FORWARD_END"),
            Message::ReverseEnd => out.push_str("REVERSE_END"),
            Message::Error => out.push_str("ERROR"),
            Message::Echo => out.push_str("ECHO"),
            Message::Control { direction, speed } => {
                write!(out, "CONTROL {} {}", direction.letter(), speed).map_err(|_| ())
            }
        };
        out
    }
}

/// Build the diagnostic echo for an unparseable datagram: `ECHO ` plus as
/// much of the original payload as fits.
pub fn echo_reply(payload: &[u8]) -> WireString {
    let mut out = WireString::new();
    let _ = out.push_str("ECHO ");
    for &byte in payload {
        let c = if byte.is_ascii() && !byte.is_ascii_control() {
            byte as char
        } else {
            '?'
        };
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
