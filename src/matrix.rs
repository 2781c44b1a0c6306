use crate::address::AddressMapper;
use crate::driver::PinDriver;
use crate::node::NodeStateMachine;
use crate::{ConfigError, DiodeNode, Error, Polarity};

/// A Charlieplexed matrix of `N` lines driven through `D`.
///
/// At most one device is lit at any time. Every call finishes in a bounded
/// number of steps and commits at most one batch to the driver, so it can be
/// called from a tight refresh loop. Sharing between threads or interrupt
/// handlers needs a lock around the whole controller.
///
/// # Type Parameters
/// - `D`: The [`PinDriver`] for the platform
/// - `N`: Number of lines, 2 to 255
///
/// # Example
/// ```rust
/// use charlieplex_matrix::driver::port::{MemoryPorts, PortDriver};
/// use charlieplex_matrix::{Charlieplex, Error, Polarity};
///
/// const PINS: [u8; 4] = [8, 9, 10, 11];
///
/// let driver = PortDriver::<_, 2>::new(MemoryPorts::<2>::new(), &PINS).unwrap();
/// let mut matrix = Charlieplex::new(PINS, Polarity::CommonCathode, driver).unwrap();
///
/// // sweep every device once
/// for index in 1..=matrix.node_count() as u16 {
///     matrix.turn_on_index(index).unwrap();
/// }
///
/// // turning off a device that shares a line with the lit one the other way
/// // round is refused
/// matrix.turn_on(1, 2).unwrap();
/// assert_eq!(matrix.turn_off(3, 1), Err(Error::Conflict));
/// assert_eq!(matrix.turn_off(1, 2), Ok(()));
/// ```
pub struct Charlieplex<D: PinDriver, const N: usize> {
    pub(crate) mapper: AddressMapper<D::Pin, N>,
    pub(crate) nodes: NodeStateMachine<D>,
}

impl<D: PinDriver, const N: usize> Charlieplex<D, N> {
    /// Take over the lines in `pins`, listed in row order, and float them all.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for fewer than 2 or more than 255 lines, a
    /// line listed twice, or a line `driver` does not own.
    pub fn new(pins: [D::Pin; N], polarity: Polarity, driver: D) -> Result<Self, Error> {
        let mapper = AddressMapper::new(pins, polarity)?;
        if let Some(position) = pins.iter().position(|&pin| !driver.owns(pin)) {
            return Err(ConfigError::PinNotOwned { position }.into());
        }
        let mut matrix = Self {
            mapper,
            nodes: NodeStateMachine::new(driver),
        };
        matrix.reset();
        Ok(matrix)
    }

    /// Light the device at 1-based `row` and `col`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if there is no such device; nothing changes.
    pub fn turn_on(&mut self, row: u8, col: u8) -> Result<(), Error> {
        let node = self.mapper.node(row, col)?;
        self.nodes.activate(node);
        Ok(())
    }

    /// Turn off the device at 1-based `row` and `col`.
    ///
    /// Succeeds without effect on the lit device when the device is not lit.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] if there is no such device
    /// - [`Error::Conflict`] if it shares a line with the lit device in the
    ///   opposite role
    pub fn turn_off(&mut self, row: u8, col: u8) -> Result<(), Error> {
        let node = self.mapper.node(row, col)?;
        self.nodes.deactivate(node)
    }

    /// Light the device at 1-based linear `index`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if `index` is not in `1..=N * (N - 1)`.
    pub fn turn_on_index(&mut self, index: u16) -> Result<(), Error> {
        let node = self.mapper.node_at(index)?;
        self.nodes.activate(node);
        Ok(())
    }

    /// Turn off the device at 1-based linear `index`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::turn_off`].
    pub fn turn_off_index(&mut self, index: u16) -> Result<(), Error> {
        let node = self.mapper.node_at(index)?;
        self.nodes.deactivate(node)
    }

    /// Turn off whatever is lit.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Float every line and forget the lit device. Use after the lines may
    /// have been changed behind the controller's back.
    pub fn reset(&mut self) {
        self.nodes.reset(self.mapper.pins());
    }

    /// The lit device, if any.
    pub fn active_node(&self) -> Option<DiodeNode<D::Pin>> {
        self.nodes.active()
    }

    /// Lines in row order.
    pub fn pins(&self) -> &[D::Pin; N] {
        self.mapper.pins()
    }

    /// Wiring polarity.
    pub fn polarity(&self) -> Polarity {
        self.mapper.polarity()
    }

    /// Number of addressable devices, `N * (N - 1)`.
    pub fn node_count(&self) -> usize {
        self.mapper.node_count()
    }

    /// The address translation for this wiring.
    pub fn mapper(&self) -> &AddressMapper<D::Pin, N> {
        &self.mapper
    }

    /// The pin driver.
    pub fn driver(&self) -> &D {
        self.nodes.driver()
    }

    /// Give back the pin driver. The lines keep their current roles.
    pub fn release(self) -> D {
        self.nodes.release()
    }
}

impl<D, const N: usize> core::fmt::Debug for Charlieplex<D, N>
where
    D: PinDriver + core::fmt::Debug,
    D::Pin: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Charlieplex")
            .field("pins", self.mapper.pins())
            .field("polarity", &self.mapper.polarity())
            .field("active", &self.nodes.active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::format;
    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::driver::port::{MemoryPorts, PortDriver, Register};
    use crate::testing::RecordingDriver;
    use crate::{Address, PinRole};

    const PINS: [u8; 5] = [2, 3, 4, 5, 6];

    type TestMatrix = Charlieplex<RecordingDriver, 5>;

    fn matrix(polarity: Polarity) -> TestMatrix {
        Charlieplex::new(PINS, polarity, RecordingDriver::new(&PINS)).unwrap()
    }

    /// Lines not floating after the last commit.
    fn lit(matrix: &TestMatrix) -> Vec<(u8, PinRole)> {
        matrix.driver().driven()
    }

    /// Checks the hardware shows exactly the active node, or nothing.
    fn assert_single_active(matrix: &TestMatrix) {
        match matrix.active_node() {
            Some(node) => {
                let mut expected = vec![
                    (node.positive(), PinRole::DriveHigh),
                    (node.negative(), PinRole::DriveLow),
                ];
                expected.sort_by_key(|(pin, _)| *pin);
                assert_eq!(lit(matrix), expected);
            }
            None => assert!(lit(matrix).is_empty()),
        }
    }

    #[test]
    fn test_new_floats_all_lines() {
        let matrix = matrix(Polarity::CommonAnode);
        assert_eq!(matrix.active_node(), None);
        assert_eq!(matrix.driver().batches.len(), 1);
        assert_eq!(matrix.driver().resets, 1);
        assert!(lit(&matrix).is_empty());
    }

    #[test]
    fn test_new_rejects_bad_wiring() {
        let result = Charlieplex::new([2u8], Polarity::CommonAnode, RecordingDriver::new(&[2]));
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidConfig(ConfigError::TooFewPins { count: 1 })
        );

        let result = Charlieplex::new(
            [2u8, 3, 2],
            Polarity::CommonAnode,
            RecordingDriver::new(&[2, 3]),
        );
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidConfig(ConfigError::DuplicatePin {
                first: 0,
                second: 2
            })
        );
    }

    #[test]
    fn test_new_rejects_lines_the_driver_does_not_own() {
        let result = Charlieplex::new(
            PINS,
            Polarity::CommonAnode,
            RecordingDriver::new(&[2, 3, 4]),
        );
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidConfig(ConfigError::PinNotOwned { position: 3 })
        );

        let driver = PortDriver::<_, 1>::new(MemoryPorts::<1>::new(), &[2, 3, 4]).unwrap();
        let result = Charlieplex::new(PINS, Polarity::CommonAnode, driver);
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidConfig(ConfigError::PinNotOwned { position: 3 })
        );
    }

    #[test]
    fn test_concrete_transition() {
        let mut matrix = matrix(Polarity::CommonAnode);

        matrix.turn_on(1, 3).unwrap();
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 5)));
        assert_eq!(lit(&matrix), vec![(2, PinRole::DriveHigh), (5, PinRole::DriveLow)]);

        matrix.turn_on_index(1).unwrap();
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 3)));
        // line 5 released, line 3 driven low, line 2 kept high without a command
        assert_eq!(
            matrix.driver().last_batch_sorted(),
            vec![(3, PinRole::DriveLow), (5, PinRole::Float)]
        );
        assert_eq!(lit(&matrix), vec![(2, PinRole::DriveHigh), (3, PinRole::DriveLow)]);
    }

    #[test]
    fn test_common_cathode_turn_on() {
        let mut matrix = matrix(Polarity::CommonCathode);
        matrix.turn_on(1, 3).unwrap();
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(5, 2)));
        assert_eq!(lit(&matrix), vec![(2, PinRole::DriveLow), (5, PinRole::DriveHigh)]);
    }

    #[test]
    fn test_invalid_address_changes_nothing() {
        let mut matrix = matrix(Polarity::CommonAnode);
        matrix.turn_on(2, 4).unwrap();
        let batches = matrix.driver().batches.len();

        assert_eq!(
            matrix.turn_on(3, 3),
            Err(Error::InvalidAddress {
                address: Address::RowCol { row: 3, col: 3 }
            })
        );
        assert_eq!(
            matrix.turn_off(0, 1),
            Err(Error::InvalidAddress {
                address: Address::RowCol { row: 0, col: 1 }
            })
        );
        assert_eq!(
            matrix.turn_on_index(21),
            Err(Error::InvalidAddress {
                address: Address::Index(21)
            })
        );
        assert_eq!(
            matrix.turn_off_index(0),
            Err(Error::InvalidAddress {
                address: Address::Index(0)
            })
        );

        assert_eq!(matrix.driver().batches.len(), batches);
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(3, 6)));
    }

    #[test]
    fn test_turn_on_twice_same_hardware() {
        let mut matrix = matrix(Polarity::CommonAnode);
        matrix.turn_on(4, 2).unwrap();
        let hardware = matrix.driver().hardware.clone();

        matrix.turn_on(4, 2).unwrap();
        assert_eq!(matrix.driver().hardware, hardware);
        assert!(matrix.driver().last_batch().is_empty());
    }

    #[test]
    fn test_turn_off_conflict() {
        let mut matrix = matrix(Polarity::CommonAnode);
        // (2, 5)
        matrix.turn_on(1, 3).unwrap();
        let batches = matrix.driver().batches.len();

        // row 4 column 1 is (5, 2): the reverse of the lit device
        assert_eq!(matrix.turn_off(4, 1), Err(Error::Conflict));
        // index 13 is row 4 column 1 as well
        assert_eq!(matrix.turn_off_index(13), Err(Error::Conflict));
        // row 4 column 2 is (5, 3): line 5 would switch from cathode to anode
        assert_eq!(matrix.turn_off(4, 2), Err(Error::Conflict));

        assert_eq!(matrix.driver().batches.len(), batches);
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 5)));
        assert_single_active(&matrix);
    }

    #[test]
    fn test_turn_off_unlit_device() {
        let mut matrix = matrix(Polarity::CommonAnode);
        matrix.turn_on(1, 3).unwrap();

        // index 6 is (3, 4), sharing nothing with (2, 5)
        assert_eq!(matrix.turn_off_index(6), Ok(()));
        // (3, 5) shares the cathode
        assert_eq!(matrix.turn_off(2, 3), Ok(()));
        // (2, 3) shares the anode
        assert_eq!(matrix.turn_off_index(1), Ok(()));

        assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 5)));
        assert_single_active(&matrix);
    }

    #[test]
    fn test_round_trip() {
        for polarity in [Polarity::CommonAnode, Polarity::CommonCathode] {
            let mut matrix = matrix(polarity);
            for index in 1..=20 {
                matrix.turn_on_index(index).unwrap();
                assert_eq!(matrix.turn_off_index(index), Ok(()));
                assert_eq!(matrix.active_node(), None);
                assert!(lit(&matrix).is_empty());
            }
            for row in 1..=5 {
                for col in 1..5 {
                    if row == col {
                        continue;
                    }
                    matrix.turn_on(row, col).unwrap();
                    assert_eq!(matrix.turn_off(row, col), Ok(()));
                    assert_eq!(matrix.active_node(), None);
                }
            }
        }
    }

    #[test]
    fn test_single_active_over_sequence() {
        let mut matrix = matrix(Polarity::CommonAnode);
        // deterministic pseudo random walk through every operation
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let index = (seed % 22) as u16;
            match seed % 7 {
                0 | 1 | 2 => {
                    let _ = matrix.turn_on_index(index);
                }
                3 | 4 => {
                    let _ = matrix.turn_off_index(index);
                }
                5 => matrix.clear(),
                _ => {
                    let row = (seed % 6) as u8;
                    let col = ((seed >> 8) % 6) as u8;
                    let _ = matrix.turn_on(row, col);
                }
            }
            assert_single_active(&matrix);
        }
    }

    #[test]
    fn test_clear() {
        let mut matrix = matrix(Polarity::CommonAnode);
        matrix.clear();
        assert_eq!(matrix.active_node(), None);

        matrix.turn_on(5, 1).unwrap();
        matrix.clear();
        assert_eq!(matrix.active_node(), None);
        assert!(lit(&matrix).is_empty());
    }

    #[test]
    fn test_reset_recovers() {
        let mut matrix = matrix(Polarity::CommonAnode);
        matrix.turn_on(3, 1).unwrap();
        let _ = matrix.turn_off(1, 3);
        matrix.turn_on_index(17).unwrap();

        matrix.reset();
        assert_eq!(matrix.active_node(), None);
        assert!(lit(&matrix).is_empty());
        assert_eq!(matrix.driver().resets, 2);

        // usable again after a reset
        matrix.turn_on(1, 2).unwrap();
        assert_single_active(&matrix);
    }

    #[test]
    fn test_accessors() {
        let matrix = matrix(Polarity::CommonCathode);
        assert_eq!(matrix.pins(), &PINS);
        assert_eq!(matrix.polarity(), Polarity::CommonCathode);
        assert_eq!(matrix.node_count(), 20);
        assert_eq!(matrix.mapper().node_count(), 20);
    }

    #[test]
    fn test_debug() {
        let mut matrix = matrix(Polarity::CommonAnode);
        matrix.turn_on(1, 3).unwrap();
        let debug = format!("{matrix:?}");
        assert!(debug.starts_with("Charlieplex { pins: [2, 3, 4, 5, 6]"));
        assert!(debug.contains("active: Some(DiodeNode { positive: 2, negative: 5 })"));
    }

    #[test]
    fn test_port_driver_end_to_end() {
        // Arduino Uno: pins 2..=7 on port D (0), 8..=13 on port B (1)
        const UNO: [u8; 12] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];
        let driver = PortDriver::<_, 2>::new(MemoryPorts::<2>::new(), &UNO).unwrap();
        let mut matrix = Charlieplex::new(UNO, Polarity::CommonAnode, driver).unwrap();

        // row 1 column 11 is line 13
        matrix.turn_on(1, 11).unwrap();
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(2, 13)));
        let ports = matrix.driver().registers();
        assert_eq!(ports.value(0, Register::Direction), 0b0000_0100);
        assert_eq!(ports.value(0, Register::Level), 0b0000_0100);
        assert_eq!(ports.value(1, Register::Direction), 0b0010_0000);
        assert_eq!(ports.value(1, Register::Level), 0);

        matrix.turn_on(12, 1).unwrap();
        assert_eq!(matrix.active_node(), Some(DiodeNode::new(13, 2)));
        let ports = matrix.driver().registers();
        assert_eq!(ports.value(0, Register::Direction), 0b0000_0100);
        assert_eq!(ports.value(0, Register::Level), 0);
        assert_eq!(ports.value(1, Register::Direction), 0b0010_0000);
        assert_eq!(ports.value(1, Register::Level), 0b0010_0000);

        matrix.clear();
        let ports = matrix.release().release();
        assert_eq!(ports.value(0, Register::Direction), 0);
        assert_eq!(ports.value(1, Register::Direction), 0);
        assert_eq!(ports.value(0, Register::Level), 0);
        assert_eq!(ports.value(1, Register::Level), 0);
    }
}
