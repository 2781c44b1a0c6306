//! Batched driver for MCUs with 8-bit direction and level registers.
//!
//! This is the AVR model (`DDRx`/`PORTx`), also found on many other small
//! MCUs: every port has a direction register (bit set = output) and a level
//! register (bit set = high). Lines are numbered port-major, so line `n` is bit
//! `n % 8` of port `n / 8`. On an ATmega328 with `PORTS = 2` that puts Arduino
//! pins 0..=7 on port D and 8..=13 on port B.
//!
//! # Batching
//! [`PortDriver::set_role`] only edits an in-memory image of the two registers.
//! [`PortDriver::commit`] merges the images into the registers, touching
//! only the bits of configured lines:
//!
//! ```text
//! reg = (reg & !configured) | image
//! ```
//!
//! The merge runs in three passes over all ports so no line is ever driven
//! with a stale level:
//! 1. lines that go to `Float` leave output mode (direction),
//! 2. all levels are written,
//! 3. lines that are driven enter output mode (direction).
//!
//! Registers whose value does not change are not written.
//!
//! # Example
//! ```rust
//! use charlieplex_matrix::driver::port::{MemoryPorts, PortDriver, Register};
//! use charlieplex_matrix::driver::PinDriver;
//! use charlieplex_matrix::PinRole;
//!
//! let mut driver = PortDriver::<_, 2>::new(MemoryPorts::<2>::new(), &[2, 3, 9]).unwrap();
//! driver.set_role(3, PinRole::DriveHigh);
//! driver.set_role(9, PinRole::DriveLow);
//! driver.commit();
//!
//! let ports = driver.registers();
//! assert_eq!(ports.value(0, Register::Direction), 0b0000_1000);
//! assert_eq!(ports.value(0, Register::Level), 0b0000_1000);
//! assert_eq!(ports.value(1, Register::Direction), 0b0000_0010);
//! assert_eq!(ports.value(1, Register::Level), 0b0000_0000);
//! ```

use bitfield::{bitfield, Bit, BitMut};

use super::PinDriver;
use crate::{ConfigError, PinRole};

/// The two registers of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Data direction, bit set = output
    Direction,
    /// Output level, bit set = high
    Level,
}

/// Raw access to the port registers.
///
/// Implement this over the memory-mapped registers of the target MCU. Reads and
/// writes are whole 8-bit registers.
pub trait PortRegisters {
    /// Current value of `register` on `port`.
    fn read(&self, port: usize, register: Register) -> u8;

    /// Overwrite `register` on `port`.
    fn write(&mut self, port: usize, register: Register, value: u8);
}

impl<R: PortRegisters + ?Sized> PortRegisters for &mut R {
    fn read(&self, port: usize, register: Register) -> u8 {
        (**self).read(port, register)
    }

    fn write(&mut self, port: usize, register: Register, value: u8) {
        (**self).write(port, register, value);
    }
}

bitfield! {
    /// Image of one 8-bit port register.
    ///
    /// Bit `n` belongs to line `port * 8 + n`.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    struct PortBits(u8);
    impl Debug;
    pub u8, bits, set_bits: 7, 0;
}

impl PortBits {
    pub const fn new() -> Self {
        Self(0)
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
struct PortImage {
    configured: PortBits,
    direction: PortBits,
    level: PortBits,
}

impl PortImage {
    const fn new() -> Self {
        Self {
            configured: PortBits::new(),
            direction: PortBits::new(),
            level: PortBits::new(),
        }
    }

    fn set_role(&mut self, bit: usize, role: PinRole) {
        let (output, high) = match role {
            PinRole::DriveHigh => (true, true),
            PinRole::DriveLow => (true, false),
            PinRole::Float => (false, false),
        };
        self.direction.set_bit(bit, output);
        self.level.set_bit(bit, high);
    }

    fn role(&self, bit: usize) -> PinRole {
        match (self.direction.bit(bit), self.level.bit(bit)) {
            (true, true) => PinRole::DriveHigh,
            (true, false) => PinRole::DriveLow,
            (false, _) => PinRole::Float,
        }
    }

    fn float_all(&mut self) {
        self.direction.set_bits(0);
        self.level.set_bits(0);
    }

    /// Bits of the register that belong to other users of the port.
    fn foreign(&self) -> u8 {
        !self.configured.bits()
    }
}

const fn locate(pin: u8) -> (usize, usize) {
    ((pin / 8) as usize, (pin % 8) as usize)
}

/// [`PinDriver`] that batches a transition into one update per port register.
///
/// # Type Parameters
/// - `R`: Register access, see [`PortRegisters`]
/// - `PORTS`: Number of 8-bit ports the lines are spread over
pub struct PortDriver<R, const PORTS: usize> {
    registers: R,
    ports: [PortImage; PORTS],
}

impl<R: PortRegisters, const PORTS: usize> PortDriver<R, PORTS> {
    /// Create a driver owning the lines in `pins`.
    ///
    /// All lines start floating in the image; the registers are not touched
    /// until the first [`commit`](PinDriver::commit).
    ///
    /// # Errors
    ///
    /// [`ConfigError::PinOutOfRange`] if a line is beyond `PORTS * 8`.
    pub fn new(registers: R, pins: &[u8]) -> Result<Self, ConfigError> {
        let mut ports = [PortImage::new(); PORTS];
        for &pin in pins {
            let (port, bit) = locate(pin);
            let image = ports
                .get_mut(port)
                .ok_or(ConfigError::PinOutOfRange { pin })?;
            image.configured.set_bit(bit, true);
        }
        Ok(Self { registers, ports })
    }

    /// Role of `pin` in the pending image, `None` for lines this driver does
    /// not own.
    #[must_use]
    pub fn role(&self, pin: u8) -> Option<PinRole> {
        let (port, bit) = locate(pin);
        let image = self.ports.get(port)?;
        image.configured.bit(bit).then(|| image.role(bit))
    }

    /// The register access.
    pub fn registers(&self) -> &R {
        &self.registers
    }

    /// Give back the register access.
    pub fn release(self) -> R {
        self.registers
    }

    fn write_changed(&mut self, port: usize, register: Register, old: u8, new: u8) {
        if old != new {
            self.registers.write(port, register, new);
        }
    }
}

impl<R: PortRegisters, const PORTS: usize> PinDriver for PortDriver<R, PORTS> {
    type Pin = u8;

    fn set_role(&mut self, pin: u8, role: PinRole) {
        let (port, bit) = locate(pin);
        match self.ports.get_mut(port) {
            Some(image) if image.configured.bit(bit) => image.set_role(bit, role),
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("PortDriver: line {} is not configured, ignoring {}", pin, role);
            }
        }
    }

    fn owns(&self, pin: u8) -> bool {
        self.role(pin).is_some()
    }

    fn commit(&mut self) {
        let mut direction = [0u8; PORTS];
        let mut level = [0u8; PORTS];
        for (port, image) in self.ports.iter().enumerate() {
            if image.configured.bits() == 0 {
                continue;
            }
            direction[port] = self.registers.read(port, Register::Direction);
            level[port] = self.registers.read(port, Register::Level);
        }

        // release first, so floated lines are inputs before any level changes
        let mut released = direction;
        for (port, image) in self.ports.iter().enumerate() {
            released[port] &= image.foreign() | image.direction.bits();
        }
        for port in 0..PORTS {
            self.write_changed(port, Register::Direction, direction[port], released[port]);
        }

        for port in 0..PORTS {
            let image = self.ports[port];
            let next = (level[port] & image.foreign()) | image.level.bits();
            self.write_changed(port, Register::Level, level[port], next);
        }

        for port in 0..PORTS {
            let image = self.ports[port];
            let next = (released[port] & image.foreign()) | image.direction.bits();
            self.write_changed(port, Register::Direction, released[port], next);
        }
    }

    fn reset(&mut self) {
        for image in &mut self.ports {
            image.float_all();
        }
    }
}

impl<R, const PORTS: usize> core::fmt::Debug for PortDriver<R, PORTS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PortDriver")
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

/// In-memory register file.
///
/// Stands in for the real registers on the host, in tests and in benches, and
/// counts the register writes a commit costs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPorts<const PORTS: usize> {
    direction: [u8; PORTS],
    level: [u8; PORTS],
    writes: usize,
}

impl<const PORTS: usize> MemoryPorts<PORTS> {
    /// All registers zero: every line an input.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_values([0; PORTS], [0; PORTS])
    }

    /// Registers preset to the given values, as left by other code sharing
    /// the ports.
    #[must_use]
    pub const fn with_values(direction: [u8; PORTS], level: [u8; PORTS]) -> Self {
        Self {
            direction,
            level,
            writes: 0,
        }
    }

    /// Current register value, 0 for ports that do not exist.
    #[must_use]
    pub fn value(&self, port: usize, register: Register) -> u8 {
        let file = match register {
            Register::Direction => &self.direction,
            Register::Level => &self.level,
        };
        file.get(port).copied().unwrap_or(0)
    }

    /// Number of register writes so far.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl<const PORTS: usize> Default for MemoryPorts<PORTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const PORTS: usize> PortRegisters for MemoryPorts<PORTS> {
    fn read(&self, port: usize, register: Register) -> u8 {
        self.value(port, register)
    }

    fn write(&mut self, port: usize, register: Register, value: u8) {
        let file = match register {
            Register::Direction => &mut self.direction,
            Register::Level => &mut self.level,
        };
        if let Some(slot) = file.get_mut(port) {
            *slot = value;
            self.writes += 1;
        }
    }
}
