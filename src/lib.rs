//! Driver for Charlieplexed diode matrices (LED matrices).
//!
//! ## How Charlieplexing Works
//!
//! A Charlieplexed matrix connects N tri-state lines so that every ordered pair of
//! distinct lines has one diode between them. That gives N·(N-1) individually
//! addressable devices from N pins, compared to N² / 4 for a classic row/column
//! matrix of the same pin count.
//!
//! ### Pin states
//! - **Drive high** – the line sources current into the anode of the selected diode
//! - **Drive low** – the line sinks current from the cathode of the selected diode
//! - **Float** – the line is a high-impedance input and takes no part in the circuit
//!
//! To light the diode between lines `a` (anode) and `b` (cathode), `a` is driven
//! high, `b` is driven low and every other line floats. Any other line left driven
//! would open a second current path through another diode, so only **one** device
//! can be lit at a time. Showing a picture means sweeping through the lit devices
//! faster than the eye can follow; that refresh loop belongs to the caller.
//!
//! ### Grid layout
//! ```text
//!              (-) C A T H O D E
//!          (+)     1  2  3  4  5
//!           A  1   X  .  .  .  .
//!           N  2   .  X  .  .  .
//!           O  3   .  .  X  .  .
//!           D  4   .  .  .  X  .
//!           E  5   .  .  .  .  X
//! ```
//! A line cannot be both anode and cathode of the same device, so the diagonal is
//! missing and every row holds N-1 devices. Rows and columns are numbered from 1
//! and columns skip the diagonal: on row 1 the columns 1..=4 are lines 2..=5,
//! on row 3 they are lines 1, 2, 4, 5.
//!
//! ### Switching devices
//! Moving the lit device from one pair of lines to another is where things go
//! wrong in a naive driver: releasing the old pair and driving the new pair pin by
//! pin passes through intermediate states that light a third device or briefly
//! short two driven lines. The node state machine reuses pins the two
//! devices have in common, floats only the pins that are no longer needed, and
//! hands the whole transition to the [`driver::PinDriver`] as one batch.
//!
//! ## Crate layout
//!
//! 1. [`address::AddressMapper`] turns a row/column or linear index into a
//!    [`DiodeNode`], honouring the [`Polarity`] of the wiring.
//! 2. An internal node state machine tracks the single active node and decides
//!    which pin roles change.
//! 3. [`driver::PinDriver`] is implemented by the platform. The
//!    [`driver::port::PortDriver`] covers MCUs with 8-bit direction and
//!    level registers (AVR style), batching a whole transition into one
//!    register update per port.
//! 4. [`Charlieplex`] ties them together and is what applications use. It is
//!    also an `embedded-graphics` [`DrawTarget`](embedded_graphics::draw_target::DrawTarget)
//!    over [`BinaryColor`](embedded_graphics::pixelcolor::BinaryColor).
//!
//! ## Example
//! ```rust
//! use charlieplex_matrix::driver::port::{MemoryPorts, PortDriver};
//! use charlieplex_matrix::{Charlieplex, DiodeNode, Polarity};
//!
//! // five lines on pins 2..=6 of port 0
//! const PINS: [u8; 5] = [2, 3, 4, 5, 6];
//!
//! let driver = PortDriver::<_, 1>::new(MemoryPorts::<1>::new(), &PINS).unwrap();
//! let mut matrix = Charlieplex::new(PINS, Polarity::CommonAnode, driver).unwrap();
//!
//! matrix.turn_on(1, 3).unwrap();
//! assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 5)));
//!
//! matrix.turn_on_index(1).unwrap();
//! assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 3)));
//!
//! matrix.clear();
//! assert_eq!(matrix.active_node(), None);
//! ```
//!
//! ## Available Feature Flags
//!
//! ### `defmt` Feature
//! Implements `defmt::Format` for the public value types and emits `defmt`
//! trace/debug events on every node transition. Without the feature nothing
//! is logged.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod address;
pub mod driver;
mod error;
mod graphics;
mod matrix;
mod node;
#[cfg(test)]
mod testing;

pub use error::{Address, ConfigError, Error};
pub use matrix::Charlieplex;

/// Electrical state a matrix line can be commanded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinRole {
    /// Output, driven to the supply rail
    DriveHigh,
    /// Output, driven to ground
    DriveLow,
    /// High-impedance input
    #[default]
    Float,
}

/// Which end of a device the row lines connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Rows are anodes, columns are cathodes
    #[default]
    CommonAnode,
    /// Rows are cathodes, columns are anodes
    CommonCathode,
}

/// The two lines of one device in the matrix.
///
/// `positive` is driven high and `negative` driven low to light it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiodeNode<P> {
    positive: P,
    negative: P,
}

impl<P> DiodeNode<P> {
    /// Create a node from its anode and cathode lines.
    pub const fn new(positive: P, negative: P) -> Self {
        Self { positive, negative }
    }
}

impl<P: Copy + Eq> DiodeNode<P> {
    /// Line connected to the anode.
    #[must_use]
    pub fn positive(&self) -> P {
        self.positive
    }

    /// Line connected to the cathode.
    #[must_use]
    pub fn negative(&self) -> P {
        self.negative
    }

    /// Role `pin` takes while this node is lit.
    #[must_use]
    pub fn role_of(&self, pin: P) -> PinRole {
        if pin == self.positive {
            PinRole::DriveHigh
        } else if pin == self.negative {
            PinRole::DriveLow
        } else {
            PinRole::Float
        }
    }

    /// Both lines paired with the role that lights the node.
    #[must_use]
    pub fn drives(&self) -> [(P, PinRole); 2] {
        [
            (self.positive, PinRole::DriveHigh),
            (self.negative, PinRole::DriveLow),
        ]
    }
}

/// Computes the number of devices a matrix of `pins` lines can address.
///
/// # Arguments
///
/// * `pins` - Number of tri-state lines
///
/// # Returns
///
/// `pins * (pins - 1)`, or 0 for fewer than two lines
#[must_use]
pub const fn compute_node_count(pins: usize) -> usize {
    if pins < 2 {
        0
    } else {
        pins * (pins - 1)
    }
}
