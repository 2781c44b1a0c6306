//! Error types returned by the matrix controller.
//!
//! All errors are plain values without heap allocation so they can be
//! returned from `no_std` code. A failed call never changes the active node
//! or the pin state.

use derive_more::{Display, Error};

/// A logical device address as given by the caller, kept for error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    /// 1-based row and column.
    #[display("row {row}, column {col}")]
    RowCol {
        /// Row, starting at 1
        row: u8,
        /// Column, starting at 1
        col: u8,
    },
    /// 1-based linear node index.
    #[display("index {_0}")]
    Index(u16),
}

/// Reasons a pin list cannot be wired as a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A matrix needs at least two lines to form a single node.
    #[display("{count} pins given, at least 2 are needed")]
    TooFewPins {
        /// Number of pins supplied
        count: usize,
    },
    /// Rows and columns are addressed with `u8`.
    #[display("{count} pins given, at most 255 are supported")]
    TooManyPins {
        /// Number of pins supplied
        count: usize,
    },
    /// The same physical pin appears twice in the pin list.
    #[display("pins at positions {first} and {second} are the same line")]
    DuplicatePin {
        /// Position of the first occurrence
        first: usize,
        /// Position of the repeated occurrence
        second: usize,
    },
    /// The pin number does not exist on the port driver.
    #[display("pin {pin} is outside the driver's ports")]
    PinOutOfRange {
        /// Offending pin number
        pin: u8,
    },
    /// A matrix line is not one of the lines the pin driver was set up with.
    #[display("pin at position {position} is not owned by the driver")]
    PinNotOwned {
        /// Position of the line in the matrix pin list
        position: usize,
    },
}

/// Errors returned by [`crate::Charlieplex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The wiring given at construction is not usable.
    #[display("invalid wiring: {_0}")]
    InvalidConfig(#[error(source)] ConfigError),
    /// The address does not name a node of this matrix.
    #[display("{address} is not a node of this matrix")]
    InvalidAddress {
        /// The rejected address
        address: Address,
    },
    /// Turning the node off would also turn off the node that is lit.
    #[display("node shares a drive pin with the active node in the opposite role")]
    Conflict,
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}
