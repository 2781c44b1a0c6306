//! Tracking of the single lit device and the pin changes between devices.
//!
//! ```text
//!            activate(n)              deactivate(n)
//! Inactive ─────────────▶ Active(n) ───────────────▶ Inactive
//!                         │      ▲
//!                         └──────┘ activate(m)
//! ```
//!
//! `reset` returns to `Inactive` from anywhere. A deactivation that would
//! disturb the lit device is refused and leaves everything as it was.

use crate::driver::PinDriver;
use crate::{DiodeNode, Error, PinRole};

/// How a line of the device being lit relates to the device lit now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reuse {
    /// Already driven in the role it needs
    Retained,
    /// Driven, but in the opposite role
    Reversed,
    /// Floating
    Fresh,
}

impl Reuse {
    fn classify<P: Copy + Eq>(active: Option<&DiodeNode<P>>, pin: P, wanted: PinRole) -> Self {
        match current_role(active, pin) {
            PinRole::Float => Self::Fresh,
            role if role == wanted => Self::Retained,
            _ => Self::Reversed,
        }
    }
}

/// How a line of the device being turned off relates to the device lit now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    /// Driven by the lit device in the same role
    Match,
    /// Driven by the lit device in the opposite role
    Conflict,
    /// Not driven
    Clear,
}

impl Overlap {
    fn classify<P: Copy + Eq>(active: Option<&DiodeNode<P>>, pin: P, role: PinRole) -> Self {
        match current_role(active, pin) {
            PinRole::Float => Self::Clear,
            current if current == role => Self::Match,
            _ => Self::Conflict,
        }
    }
}

fn current_role<P: Copy + Eq>(active: Option<&DiodeNode<P>>, pin: P) -> PinRole {
    active.map_or(PinRole::Float, |node| node.role_of(pin))
}

/// Holds the lit device and turns node changes into pin driver batches.
///
/// Every operation ends in at most one [`PinDriver::commit`].
pub struct NodeStateMachine<D: PinDriver> {
    driver: D,
    active: Option<DiodeNode<D::Pin>>,
}

impl<D: PinDriver> NodeStateMachine<D> {
    /// Start with no device lit. The driver is not touched; call
    /// [`Self::reset`] to bring the lines to a known state.
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            active: None,
        }
    }

    /// The lit device, if any.
    pub fn active(&self) -> Option<DiodeNode<D::Pin>> {
        self.active
    }

    /// The pin driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Give back the pin driver.
    pub fn release(self) -> D {
        self.driver
    }

    /// Light `node`, turning off whatever was lit.
    ///
    /// Lines `node` shares with the lit device in the same role are left
    /// alone, lines of the old device that `node` does not use are floated.
    /// Activating the lit device again issues no changes.
    pub fn activate(&mut self, node: DiodeNode<D::Pin>) {
        debug_assert!(node.positive() != node.negative());
        let previous = self.active;

        for (pin, wanted) in node.drives() {
            match Reuse::classify(previous.as_ref(), pin, wanted) {
                Reuse::Retained => {}
                Reuse::Reversed | Reuse::Fresh => self.driver.set_role(pin, wanted),
            }
        }
        if let Some(previous) = previous {
            for (pin, _) in previous.drives() {
                if node.role_of(pin) == PinRole::Float {
                    self.driver.set_role(pin, PinRole::Float);
                }
            }
        }

        self.driver.commit();
        self.active = Some(node);

        #[cfg(feature = "defmt")]
        defmt::trace!("node activated, previous node: {}", previous.is_some());
    }

    /// Turn `node` off without disturbing the lit device.
    ///
    /// - `node` is the lit device: both lines float and nothing is lit after.
    /// - `node` shares no line with the lit device: its lines float, which is
    ///   already the case.
    /// - `node` shares one line with the lit device in the same role: it is
    ///   dark already, the other line floats and the lit device stays lit.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] if a line of `node` is driven by the lit device in
    /// the opposite role. Nothing is changed.
    pub fn deactivate(&mut self, node: DiodeNode<D::Pin>) -> Result<(), Error> {
        let active = self.active.as_ref();
        let positive = Overlap::classify(active, node.positive(), PinRole::DriveHigh);
        let negative = Overlap::classify(active, node.negative(), PinRole::DriveLow);

        match (positive, negative) {
            (Overlap::Conflict, _) | (_, Overlap::Conflict) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("deactivate refused, node conflicts with the active node");
                return Err(Error::Conflict);
            }
            (Overlap::Clear, Overlap::Clear) => {
                self.driver.set_role(node.positive(), PinRole::Float);
                self.driver.set_role(node.negative(), PinRole::Float);
            }
            (Overlap::Match, Overlap::Match) => {
                self.driver.set_role(node.positive(), PinRole::Float);
                self.driver.set_role(node.negative(), PinRole::Float);
                self.active = None;

                #[cfg(feature = "defmt")]
                defmt::trace!("active node deactivated");
            }
            (Overlap::Match, Overlap::Clear) => {
                self.driver.set_role(node.negative(), PinRole::Float);
            }
            (Overlap::Clear, Overlap::Match) => {
                self.driver.set_role(node.positive(), PinRole::Float);
            }
        }

        self.driver.commit();
        Ok(())
    }

    /// Turn off the lit device, if any.
    pub fn clear(&mut self) {
        if let Some(active) = self.active {
            // the active node always matches itself
            let released = self.deactivate(active);
            debug_assert!(released.is_ok());
        }
    }

    /// Float every line in `pins` and forget the lit device, whatever state
    /// the driver was left in.
    pub fn reset(&mut self, pins: &[D::Pin]) {
        self.driver.reset();
        for &pin in pins {
            self.driver.set_role(pin, PinRole::Float);
        }
        self.driver.commit();
        self.active = None;

        #[cfg(feature = "defmt")]
        defmt::debug!("matrix reset, {} lines floating", pins.len());
    }
}

impl<D> core::fmt::Debug for NodeStateMachine<D>
where
    D: PinDriver + core::fmt::Debug,
    D::Pin: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeStateMachine")
            .field("driver", &self.driver)
            .field("active", &self.active)
            .finish()
    }
}
