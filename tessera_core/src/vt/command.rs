//! In-band widget control.
//!
//! Programs running in the terminal create and manage widgets by writing
//! a vendor OSC sequence:
//!
//! ```text
//! ESC ] 99999 ; <plugin> ; A|R ; <x> ; <y> ; <w> ; <h> ; <base94 payload> ST
//! ESC ] 99999 ; <plugin> ; D|S|C ; <widget id> ST
//! ```
//!
//! `A` and `R` create a widget at absolute cells or at an offset from the
//! cursor. `D` deletes, `S` stops and `C` continues a widget by the numeric
//! id the coordinator assigned. A zero width or height lets the widget pick
//! its natural size. ST is `ESC \` or BEL.
//!
//! `vte` drops OSC strings it does not know and caps their length, so
//! [`OscSplitter`] lifts these sequences out of the byte stream before the
//! parser sees it.

use std::fmt::Write as _;

use thiserror::Error;

use crate::index::Point;
use crate::widget::PositionMode;

/// OSC number reserved for widget commands.
pub const WIDGET_OSC: u32 = 99999;

const PREFIX: &[u8] = b"\x1b]99999;";

/// Longest command body kept. Longer sequences are dropped whole.
const MAX_BODY: usize = 16 * 1024 * 1024;

/// A widget request decoded from terminal output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetCommand {
    Create(CreateWidget),
    Delete(u64),
    Stop(u64),
    /// Resume a stopped widget.
    Start(u64),
}

/// Parameters of an in-band create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWidget {
    /// `plugin` or `plugin.kind`.
    pub plugin: String,
    pub position: PositionMode,
    pub x: i32,
    pub y: i32,
    /// Cells; 0 means natural size.
    pub width: u32,
    pub height: u32,
    pub payload: String,
    /// Cursor when the sequence ended.
    pub cursor: Point,
    /// Scroll count of the active buffer at that moment.
    pub scrolled: u64,
    /// The alternate screen was active.
    pub alt_screen: bool,
}

impl CreateWidget {
    /// The placement as an argument string for `WidgetParams::parse`.
    pub fn args(&self) -> String {
        let mut args = format!("-x {} -y {}", self.x, self.y);
        if self.width > 0 {
            let _ = write!(args, " -w {}", self.width);
        }
        if self.height > 0 {
            let _ = write!(args, " -h {}", self.height);
        }
        if self.position == PositionMode::Relative {
            args.push_str(" --relative");
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("missing `{0}`")]
    Missing(&'static str),
    #[error("unknown mode `{0}`")]
    UnknownMode(String),
    #[error("`{field}` is not a valid number: `{value}`")]
    Number { field: &'static str, value: String },
    #[error("payload is not valid base94")]
    Base94,
    #[error("sequence is not UTF-8")]
    Utf8,
}

/// Parse the body that follows `99999;`.
pub fn parse(body: &[u8]) -> Result<WidgetCommand, CommandError> {
    let body = std::str::from_utf8(body).map_err(|_| CommandError::Utf8)?;
    // The payload alphabet includes ';', so it takes the rest.
    let mut fields = body.splitn(7, ';');
    let plugin = fields
        .next()
        .filter(|p| !p.is_empty())
        .ok_or(CommandError::Missing("plugin"))?;
    let mode = fields.next().ok_or(CommandError::Missing("mode"))?;

    let position = match mode {
        "A" => PositionMode::Absolute,
        "R" => PositionMode::Relative,
        "D" => return Ok(WidgetCommand::Delete(number("id", fields.next())?)),
        "S" => return Ok(WidgetCommand::Stop(number("id", fields.next())?)),
        "C" => return Ok(WidgetCommand::Start(number("id", fields.next())?)),
        other => return Err(CommandError::UnknownMode(other.to_owned())),
    };

    let x = number("x", fields.next())?;
    let y = number("y", fields.next())?;
    let width = number("w", fields.next())?;
    let height = number("h", fields.next())?;
    let payload = decode_base94(fields.next().unwrap_or_default())?;
    let payload = String::from_utf8(payload).map_err(|_| CommandError::Utf8)?;

    Ok(WidgetCommand::Create(CreateWidget {
        plugin: plugin.to_owned(),
        position,
        x,
        y,
        width,
        height,
        payload,
        cursor: Point::default(),
        scrolled: 0,
        alt_screen: false,
    }))
}

fn number<T: std::str::FromStr>(field: &'static str, raw: Option<&str>) -> Result<T, CommandError> {
    let raw = raw.ok_or(CommandError::Missing(field))?;
    raw.trim().parse().map_err(|_| CommandError::Number {
        field,
        value: raw.to_owned(),
    })
}

/// Two characters from `!`..=`~` per byte, high digit first.
pub fn decode_base94(text: &str) -> Result<Vec<u8>, CommandError> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(CommandError::Base94);
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let value = base94_digit(pair[0])? * 94 + base94_digit(pair[1])?;
            u8::try_from(value).map_err(|_| CommandError::Base94)
        })
        .collect()
}

pub fn encode_base94(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(b'!' + b / 94));
        out.push(char::from(b'!' + b % 94));
    }
    out
}

fn base94_digit(b: u8) -> Result<u16, CommandError> {
    if (b'!'..=b'~').contains(&b) {
        Ok(u16::from(b - b'!'))
    } else {
        Err(CommandError::Base94)
    }
}

/// A run of ordinary output or one complete command body.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    Bytes(&'a [u8]),
    Command(Vec<u8>),
}

/// Separates widget sequences from the rest of the stream. Sequences and
/// their prefixes may straddle `split` calls.
#[derive(Debug, Default)]
pub(crate) struct OscSplitter {
    /// Bytes of `PREFIX` matched so far.
    matched: usize,
    in_body: bool,
    /// ESC seen inside the body; the next byte ends it.
    body_esc: bool,
    body: Vec<u8>,
    overflow: bool,
}

impl OscSplitter {
    /// Hand `input` to `emit` in stream order, with widget sequences
    /// replaced by their bodies.
    pub(crate) fn split(&mut self, mut input: &[u8], emit: &mut dyn FnMut(Piece<'_>)) {
        while !input.is_empty() {
            if self.in_body {
                input = self.body_step(input, emit);
            } else if self.matched == 0 {
                let Some(esc) = input.iter().position(|&b| b == 0x1b) else {
                    emit(Piece::Bytes(input));
                    return;
                };
                if esc > 0 {
                    emit(Piece::Bytes(&input[..esc]));
                }
                self.matched = 1;
                input = &input[esc + 1..];
            } else if input[0] == PREFIX[self.matched] {
                self.matched += 1;
                input = &input[1..];
                if self.matched == PREFIX.len() {
                    self.matched = 0;
                    self.in_body = true;
                    self.body.clear();
                    self.overflow = false;
                }
            } else {
                // Not ours: release what was held and look at this byte
                // again from the ground state.
                emit(Piece::Bytes(&PREFIX[..self.matched]));
                self.matched = 0;
            }
        }
    }

    fn body_step<'a>(&mut self, input: &'a [u8], emit: &mut dyn FnMut(Piece<'_>)) -> &'a [u8] {
        for (i, &b) in input.iter().enumerate() {
            if self.body_esc {
                self.body_esc = false;
                self.finish(emit);
                // A bare ESC also ends the string; the byte after it is
                // ordinary output again.
                return if b == b'\\' { &input[i + 1..] } else { &input[i..] };
            }
            match b {
                0x07 => {
                    self.finish(emit);
                    return &input[i + 1..];
                }
                0x1b => self.body_esc = true,
                // CAN and SUB cancel the string.
                0x18 | 0x1a => {
                    self.in_body = false;
                    self.body.clear();
                    return &input[i + 1..];
                }
                _ if self.body.len() < MAX_BODY => self.body.push(b),
                _ => self.overflow = true,
            }
        }
        &[]
    }

    fn finish(&mut self, emit: &mut dyn FnMut(Piece<'_>)) {
        self.in_body = false;
        if self.overflow {
            log::warn!("dropped widget sequence longer than {MAX_BODY} bytes");
            self.body.clear();
            return;
        }
        emit(Piece::Command(std::mem::take(&mut self.body)));
    }
}

#[cfg(test)]
mod tests;
