//! Geometry command stream decoding.
//!
//! A feature's geometry is a flat `u32` sequence of command integers, each
//! followed by its parameters. The low three bits of a command integer are
//! the command id and the remaining bits its repeat count. MoveTo and LineTo
//! take one zigzag-encoded `(dx, dy)` pair per repeat; ClosePath takes none.

use thiserror::Error;

pub const MOVE_TO: u32 = 1;
pub const LINE_TO: u32 = 2;
pub const CLOSE_PATH: u32 = 7;

#[inline]
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline]
pub fn zigzag_encode(delta: i32) -> u32 {
    ((delta << 1) ^ (delta >> 31)) as u32
}

/// Packs a command id and repeat count into a command integer.
#[inline]
pub fn command_integer(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandId {
    MoveTo,
    LineTo,
    ClosePath,
}

impl CommandId {
    fn from_id(id: u32) -> Option<Self> {
        match id {
            MOVE_TO => Some(CommandId::MoveTo),
            LINE_TO => Some(CommandId::LineTo),
            CLOSE_PATH => Some(CommandId::ClosePath),
            _ => None,
        }
    }
}

/// One repeat of a command, with its deltas already zigzag-decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveTo { dx: i32, dy: i32 },
    LineTo { dx: i32, dy: i32 },
    ClosePath,
}

impl Command {
    pub fn id(&self) -> u32 {
        match self {
            Command::MoveTo { .. } => MOVE_TO,
            Command::LineTo { .. } => LINE_TO,
            Command::ClosePath => CLOSE_PATH,
        }
    }
}

/// Conditions that end interpretation of the rest of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command id {command} at offset {offset}")]
    Unknown { command: u32, offset: usize },
    #[error("command parameters cut short at offset {offset}")]
    Truncated { offset: usize },
}

/// Lazily expands a command stream into single-repeat commands.
///
/// After the first error the iterator is exhausted.
pub struct CommandDecoder<'a> {
    stream: &'a [u32],
    pos: usize,
    pending: Option<(CommandId, u32)>,
    failed: bool,
}

impl<'a> CommandDecoder<'a> {
    pub fn new(stream: &'a [u32]) -> Self {
        CommandDecoder {
            stream,
            pos: 0,
            pending: None,
            failed: false,
        }
    }

    fn emit(&mut self, id: CommandId) -> Result<Command, CommandError> {
        if id == CommandId::ClosePath {
            return Ok(Command::ClosePath);
        }
        let (Some(&x), Some(&y)) = (self.stream.get(self.pos), self.stream.get(self.pos + 1)) else {
            self.failed = true;
            return Err(CommandError::Truncated { offset: self.pos });
        };
        self.pos += 2;

        let (dx, dy) = (zigzag_decode(x), zigzag_decode(y));
        Ok(match id {
            CommandId::MoveTo => Command::MoveTo { dx, dy },
            _ => Command::LineTo { dx, dy },
        })
    }
}

impl Iterator for CommandDecoder<'_> {
    type Item = Result<Command, CommandError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }

            if let Some((id, remaining)) = self.pending {
                if remaining > 0 {
                    self.pending = Some((id, remaining - 1));
                    return Some(self.emit(id));
                }
                self.pending = None;
            }

            let offset = self.pos;
            let value = *self.stream.get(offset)?;
            self.pos += 1;

            match CommandId::from_id(value & 0x7) {
                Some(id) => self.pending = Some((id, value >> 3)),
                None => {
                    self.failed = true;
                    return Some(Err(CommandError::Unknown {
                        command: value & 0x7,
                        offset,
                    }));
                }
            }
        }
    }
}

/// Pen position in tile-local integer space.
///
/// Deltas accumulate over a feature's whole stream, across parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub x: i64,
    pub y: i64,
}

impl Cursor {
    pub fn advance(&mut self, dx: i32, dy: i32) -> (i64, i64) {
        self.x += i64::from(dx);
        self.y += i64::from(dy);
        (self.x, self.y)
    }
}

// Encodes absolute tile positions into a command stream for tests.
#[cfg(test)]
pub(crate) struct StreamBuilder {
    out: Vec<u32>,
    cursor: (i64, i64),
}

#[cfg(test)]
impl StreamBuilder {
    pub(crate) fn new() -> Self {
        StreamBuilder {
            out: Vec::new(),
            cursor: (0, 0),
        }
    }

    fn points(mut self, id: u32, points: &[(i64, i64)]) -> Self {
        self.out.push(command_integer(id, points.len() as u32));
        for &(x, y) in points {
            self.out.push(zigzag_encode((x - self.cursor.0) as i32));
            self.out.push(zigzag_encode((y - self.cursor.1) as i32));
            self.cursor = (x, y);
        }
        self
    }

    pub(crate) fn move_to(self, points: &[(i64, i64)]) -> Self {
        self.points(MOVE_TO, points)
    }

    pub(crate) fn line_to(self, points: &[(i64, i64)]) -> Self {
        self.points(LINE_TO, points)
    }

    pub(crate) fn close(mut self) -> Self {
        self.out.push(command_integer(CLOSE_PATH, 1));
        self
    }

    pub(crate) fn raw(mut self, value: u32) -> Self {
        self.out.push(value);
        self
    }

    pub(crate) fn build(self) -> Vec<u32> {
        self.out
    }
}
