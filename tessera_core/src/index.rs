//! Type-safe coordinates for the visible screen.
//!
//! `Line` and `Column` keep row and column values from being swapped at
//! compile time. `Point` is a single cell position and `Rect` a half-open
//! cell rectangle, the unit of damage reported by the VT interpreter.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Generate arithmetic and conversion impls for a newtype index wrapper.
macro_rules! index_ops {
    ($ty:ident) => {
        impl From<usize> for $ty {
            fn from(val: usize) -> Self {
                Self(val)
            }
        }

        impl From<$ty> for usize {
            fn from(val: $ty) -> Self {
                val.0
            }
        }

        impl Add<usize> for $ty {
            type Output = Self;

            fn add(self, rhs: usize) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl AddAssign<usize> for $ty {
            fn add_assign(&mut self, rhs: usize) {
                self.0 += rhs;
            }
        }

        impl Sub<usize> for $ty {
            type Output = Self;

            fn sub(self, rhs: usize) -> Self {
                Self(self.0.saturating_sub(rhs))
            }
        }

        impl SubAssign<usize> for $ty {
            fn sub_assign(&mut self, rhs: usize) {
                self.0 = self.0.saturating_sub(rhs);
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

/// Visible line index, 0 at the top of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Line(pub usize);

index_ops!(Line);

/// Column index, 0 at the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Column(pub usize);

index_ops!(Column);

/// A cell position on the visible screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub line: Line,
    pub column: Column,
}

impl Point {
    pub fn new(line: Line, column: Column) -> Self {
        Self { line, column }
    }
}

/// Half-open cell rectangle: lines `top..bottom`, columns `left..right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Rect {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self { top, left, bottom, right }
    }

    /// The rectangle covering a whole `cols` x `lines` screen.
    pub fn full(cols: usize, lines: usize) -> Self {
        Self::new(0, 0, lines, cols)
    }

    /// A single cell.
    pub fn cell(line: usize, col: usize) -> Self {
        Self::new(line, col, line + 1, col + 1)
    }

    /// Lines `top..bottom` across all `cols` columns.
    pub fn lines(top: usize, bottom: usize, cols: usize) -> Self {
        Self::new(top, 0, bottom, cols)
    }

    pub fn is_empty(&self) -> bool {
        self.top >= self.bottom || self.left >= self.right
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }

    /// Clip to a `cols` x `lines` screen.
    #[must_use]
    pub fn clamp(self, cols: usize, lines: usize) -> Self {
        Self {
            top: self.top.min(lines),
            left: self.left.min(cols),
            bottom: self.bottom.min(lines),
            right: self.right.min(cols),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.top..self.bottom).contains(&point.line.0)
            && (self.left..self.right).contains(&point.column.0)
    }

    /// Number of cells covered.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.bottom - self.top) * (self.right - self.left)
        }
    }
}
