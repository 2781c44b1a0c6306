//! The pin driver seam between the node logic and the hardware.
//!
//! A [`PinDriver`] collects the role changes of one node transition and applies
//! them with a single [`PinDriver::commit`]. Implementations decide how "single"
//! that is on their platform: the [`port::PortDriver`] turns a batch into one
//! read-modify-write per direction and level register.

pub mod port;

use crate::PinRole;

/// Batched access to the matrix lines.
///
/// The pending batch is an image of the role of every line the driver was
/// configured with. It starts with every line floating and carries over from
/// one commit to the next, so a line that is not touched in a batch keeps the
/// role it had.
pub trait PinDriver {
    /// Platform identifier of one line.
    type Pin: Copy + Eq;

    /// Record the role `pin` takes at the next commit. Within one batch the
    /// last role set for a pin wins.
    fn set_role(&mut self, pin: Self::Pin, role: PinRole);

    /// Whether `pin` is one of the lines this driver can set.
    fn owns(&self, pin: Self::Pin) -> bool;

    /// Apply the pending batch to the hardware in one step.
    fn commit(&mut self);

    /// Discard pending changes and return the image to every line floating.
    /// The hardware is untouched until the next commit.
    fn reset(&mut self);
}

impl<D: PinDriver + ?Sized> PinDriver for &mut D {
    type Pin = D::Pin;

    fn set_role(&mut self, pin: Self::Pin, role: PinRole) {
        (**self).set_role(pin, role);
    }

    fn owns(&self, pin: Self::Pin) -> bool {
        (**self).owns(pin)
    }

    fn commit(&mut self) {
        (**self).commit();
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
