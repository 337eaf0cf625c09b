//! Grid primitives: positions and facing directions.
//!
//! The board is a fixed grid in screen coordinates: `x` grows right,
//! `y` grows down, so `Up` is `y - 1`.

use std::fmt;

/// A grid cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// The off-board sentinel.
    pub const INVALID: Self = Self { x: -1, y: -1 };

    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn up(self) -> Self {
        Self::new(self.x, self.y - 1)
    }

    #[must_use]
    pub const fn down(self) -> Self {
        Self::new(self.x, self.y + 1)
    }

    #[must_use]
    pub const fn left(self) -> Self {
        Self::new(self.x - 1, self.y)
    }

    #[must_use]
    pub const fn right(self) -> Self {
        Self::new(self.x + 1, self.y)
    }

    /// The neighbouring cell one tile away in `direction`.
    #[must_use]
    pub const fn shifted(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => self.up(),
            Direction::Down => self.down(),
            Direction::Left => self.left(),
            Direction::Right => self.right(),
        }
    }

    /// Manhattan-distance-1 neighbourhood.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A pin facing or cable heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours() {
        let p = Position::new(3, 3);
        assert_eq!(p.up(), Position::new(3, 2));
        assert_eq!(p.down(), Position::new(3, 4));
        assert_eq!(p.left(), Position::new(2, 3));
        assert_eq!(p.right(), Position::new(4, 3));
        for d in Direction::ALL {
            assert!(p.is_adjacent(p.shifted(d)));
        }
    }

    #[test]
    fn adjacency_excludes_diagonals_and_self() {
        let p = Position::new(0, 0);
        assert!(!p.is_adjacent(p));
        assert!(!p.is_adjacent(Position::new(1, 1)));
        assert!(!p.is_adjacent(Position::new(2, 0)));
    }
}
