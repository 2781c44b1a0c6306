//! Translation from logical device addresses to pairs of lines.
//!
//! Two addressing schemes are supported, both counting from 1:
//!
//! - **Row / column**: `row` picks the row line, `col` counts the devices of
//!   that row left to right. Because a row never pairs with its own line,
//!   columns at or past the diagonal are shifted one line to the right:
//!   `col < row` selects line `col`, otherwise line `col + 1`.
//! - **Linear index**: devices numbered row by row, `N - 1` per row, from 1 to
//!   `N * (N - 1)`.
//!
//! Row `r`, column `c` and index `(r - 1) * (N - 1) + c` name the same device.
//! `row == col` is rejected, so the device in column `r` of row `r` is only
//! reachable by its linear index.
//!
//! The [`Polarity`] decides which end of the device the row line is: the
//! arithmetic above produces a row line `x` and a column line `y`, and
//! common-anode wiring makes `x` the anode while common-cathode makes it the
//! cathode.

use crate::{compute_node_count, Address, ConfigError, DiodeNode, Error, Polarity};

/// Maps addresses of an `N` line matrix to [`DiodeNode`]s.
///
/// Holds the wiring: the lines in row order and the polarity. Both are fixed
/// for the lifetime of the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMapper<P, const N: usize> {
    pins: [P; N],
    polarity: Polarity,
}

impl<P: Copy + Eq, const N: usize> AddressMapper<P, N> {
    /// Validate the wiring.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::TooFewPins`] for fewer than two lines
    /// - [`ConfigError::TooManyPins`] for more than 255 lines
    /// - [`ConfigError::DuplicatePin`] if a line is listed twice
    pub fn new(pins: [P; N], polarity: Polarity) -> Result<Self, ConfigError> {
        if N < 2 {
            return Err(ConfigError::TooFewPins { count: N });
        }
        if N > usize::from(u8::MAX) {
            return Err(ConfigError::TooManyPins { count: N });
        }
        for (second, pin) in pins.iter().enumerate() {
            if let Some(first) = pins[..second].iter().position(|other| other == pin) {
                return Err(ConfigError::DuplicatePin { first, second });
            }
        }
        Ok(Self { pins, polarity })
    }

    /// Lines in row order.
    pub fn pins(&self) -> &[P; N] {
        &self.pins
    }

    /// Wiring polarity.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Number of addressable devices, `N * (N - 1)`.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        compute_node_count(N)
    }

    /// Device at 1-based `row` and `col`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if `row` is not in `1..=N`, `col` is not in
    /// `1..N`, or `row == col`.
    pub fn node(&self, row: u8, col: u8) -> Result<DiodeNode<P>, Error> {
        let invalid = Error::InvalidAddress {
            address: Address::RowCol { row, col },
        };
        if row == 0 || col == 0 || row == col {
            return Err(invalid);
        }
        let (row, col) = (usize::from(row), usize::from(col));
        let column_line = if col < row { col - 1 } else { col };
        self.orient(row - 1, column_line).ok_or(invalid)
    }

    /// Device at 1-based linear `index`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if `index` is not in `1..=N * (N - 1)`.
    pub fn node_at(&self, index: u16) -> Result<DiodeNode<P>, Error> {
        let invalid = Error::InvalidAddress {
            address: Address::Index(index),
        };
        if index == 0 || usize::from(index) > self.node_count() {
            return Err(invalid);
        }
        let slot = usize::from(index) - 1;
        let row = slot / (N - 1);
        let col = slot % (N - 1);
        let column_line = if col < row { col } else { col + 1 };
        self.orient(row, column_line).ok_or(invalid)
    }

    /// Linear index of the device at `row`, `col`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] under the same rules as [`Self::node`].
    pub fn row_col_to_index(&self, row: u8, col: u8) -> Result<u16, Error> {
        self.node(row, col)?;
        let index = (usize::from(row) - 1) * (N - 1) + usize::from(col);
        // N <= 255 keeps every index below 64771
        Ok(index as u16)
    }

    fn orient(&self, row_line: usize, column_line: usize) -> Option<DiodeNode<P>> {
        let x = *self.pins.get(row_line)?;
        let y = *self.pins.get(column_line)?;
        Some(match self.polarity {
            Polarity::CommonAnode => DiodeNode::new(x, y),
            Polarity::CommonCathode => DiodeNode::new(y, x),
        })
    }
}
