//! The ob1 data field.
//!
//! The machine has exactly three pieces of state the program can touch:
//! - a 16×16 grid of bits, addressed as (x, y) with (0, 0) at the bottom left
//! - a single flag bit
//! - a pointer selecting the "current" bit of the grid

use serde::Serialize;

/// Width and height of the data field.
pub const FIELD_SIZE: usize = 16;

/// Largest valid coordinate on either axis.
pub const MAX_COORD: usize = FIELD_SIZE - 1;

/// A position in the data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Pointer {
    pub x: usize,
    pub y: usize,
}

impl Pointer {
    /// The HOME position, bottom left.
    pub const HOME: Pointer = Pointer { x: 0, y: 0 };

    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Direction of a single pointer step.
///
/// Up increases y and Down decreases it, so row 0 is the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
}

/// A step that would have left the field.
///
/// The pointer has already been pinned to the boundary when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped(pub Pointer);

/// The 16×16 bit grid together with the flag and the pointer.
///
/// Serialize only: every way in goes through the checked setters, so the
/// pointer is always on the field.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct BitField {
    /// Rows indexed by y, each holding 16 bits indexed by x.
    rows: [[bool; FIELD_SIZE]; FIELD_SIZE],
    flag: bool,
    pointer: Pointer,
}

impl BitField {
    /// Create a cleared field with the pointer at HOME.
    pub fn new() -> Self {
        Self {
            rows: [[false; FIELD_SIZE]; FIELD_SIZE],
            flag: false,
            pointer: Pointer::HOME,
        }
    }

    /// Read the bit at (x, y).
    ///
    /// # Panics
    /// Panics if either coordinate is outside 0-15.
    #[inline]
    pub fn get_bit(&self, x: usize, y: usize) -> bool {
        check_coords(x, y);
        self.rows[y][x]
    }

    /// Write the bit at (x, y).
    ///
    /// # Panics
    /// Panics if either coordinate is outside 0-15.
    #[inline]
    pub fn set_bit(&mut self, x: usize, y: usize, value: bool) {
        check_coords(x, y);
        self.rows[y][x] = value;
    }

    pub fn flag(&self) -> bool {
        self.flag
    }

    pub fn set_flag(&mut self, value: bool) {
        self.flag = value;
    }

    pub fn pointer(&self) -> Pointer {
        self.pointer
    }

    /// Place the pointer at (x, y).
    ///
    /// # Panics
    /// Panics if either coordinate is outside 0-15.
    pub fn set_pointer(&mut self, x: usize, y: usize) {
        check_coords(x, y);
        self.pointer = Pointer { x, y };
    }

    /// Return the pointer to HOME. Never fails.
    pub fn home(&mut self) {
        self.pointer = Pointer::HOME;
    }

    /// Move the pointer one cell.
    ///
    /// A step off the edge leaves the pointer on the boundary and reports
    /// `Clamped`, even when the pointer was already sitting there.
    pub fn try_step(&mut self, direction: Direction) -> Result<Pointer, Clamped> {
        let Pointer { x, y } = self.pointer;
        let (x, y) = match direction {
            Direction::Right => (x as isize + 1, y as isize),
            Direction::Left => (x as isize - 1, y as isize),
            Direction::Up => (x as isize, y as isize + 1),
            Direction::Down => (x as isize, y as isize - 1),
        };

        let in_range = |v: isize| (0..FIELD_SIZE as isize).contains(&v);
        let clamp = |v: isize| v.clamp(0, MAX_COORD as isize) as usize;

        self.pointer = Pointer { x: clamp(x), y: clamp(y) };
        if in_range(x) && in_range(y) {
            Ok(self.pointer)
        } else {
            Err(Clamped(self.pointer))
        }
    }

    /// The bit under the pointer.
    #[inline]
    pub fn data(&self) -> bool {
        self.rows[self.pointer.y][self.pointer.x]
    }

    /// Overwrite the bit under the pointer.
    #[inline]
    pub fn set_data(&mut self, value: bool) {
        self.rows[self.pointer.y][self.pointer.x] = value;
    }

    /// Swap the bit under the pointer with the flag.
    pub fn exchange(&mut self) {
        let data = self.data();
        self.set_data(self.flag);
        self.flag = data;
    }

    /// Row `y`, x = 0 first.
    ///
    /// # Panics
    /// Panics if `y` is outside 0-15.
    pub fn row(&self, y: usize) -> &[bool; FIELD_SIZE] {
        assert!(y < FIELD_SIZE, "Row {} out of range (0-{})", y, MAX_COORD);
        &self.rows[y]
    }

    /// Number of set bits in the grid.
    pub fn count_ones(&self) -> usize {
        self.rows.iter().flatten().filter(|&&b| b).count()
    }
}

fn check_coords(x: usize, y: usize) {
    assert!(
        x < FIELD_SIZE && y < FIELD_SIZE,
        "Field coordinate ({}, {}) out of range (0-{})",
        x, y, MAX_COORD
    );
}

impl Default for BitField {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BitField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitField")
            .field("set_bits", &self.count_ones())
            .field("flag", &self.flag)
            .field("pointer", &self.pointer)
            .finish()
    }
}
