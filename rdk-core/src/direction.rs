use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Horizontal motion direction of the signal dots, and the two possible
/// participant responses.
///
/// Serialized as the integers `-1` (left) and `1` (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid direction value {0}, expected -1 or 1")]
pub struct InvalidDirection(pub i8);

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Left, Direction::Right];

    pub fn sign(self) -> i8 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    pub fn from_i8(value: i8) -> Result<Self, InvalidDirection> {
        match value {
            -1 => Ok(Direction::Left),
            1 => Ok(Direction::Right),
            other => Err(InvalidDirection(other)),
        }
    }

    /// Unit translation vector in field coordinates (+x right).
    pub fn unit_vector(self) -> (f32, f32) {
        (self.sign() as f32, 0.0)
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        direction.sign()
    }
}

impl TryFrom<i8> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Direction::from_i8(value)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sign())
    }
}
