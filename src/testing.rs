//! Fake pin driver that records every committed batch.

extern crate std;

use std::collections::BTreeMap;
use std::vec::Vec;

use crate::driver::PinDriver;
use crate::PinRole;

/// Keeps the batches handed to `commit` and the resulting line roles.
#[derive(Debug, Default)]
pub(crate) struct RecordingDriver {
    pending: Vec<(u8, PinRole)>,
    /// Every committed batch, in commit order
    pub batches: Vec<Vec<(u8, PinRole)>>,
    /// Role of every line after the last commit
    pub hardware: BTreeMap<u8, PinRole>,
    /// Number of `reset` calls
    pub resets: usize,
}

impl RecordingDriver {
    pub fn new(pins: &[u8]) -> Self {
        Self {
            hardware: pins.iter().map(|&pin| (pin, PinRole::Float)).collect(),
            ..Self::default()
        }
    }

    pub fn role(&self, pin: u8) -> PinRole {
        self.hardware.get(&pin).copied().unwrap_or_default()
    }

    /// Lines that are not floating, sorted by pin.
    pub fn driven(&self) -> Vec<(u8, PinRole)> {
        self.hardware
            .iter()
            .filter(|(_, role)| **role != PinRole::Float)
            .map(|(&pin, &role)| (pin, role))
            .collect()
    }

    /// Last committed batch.
    pub fn last_batch(&self) -> &[(u8, PinRole)] {
        self.batches.last().map_or(&[], Vec::as_slice)
    }

    /// Last committed batch, sorted by pin.
    pub fn last_batch_sorted(&self) -> Vec<(u8, PinRole)> {
        let mut batch = self.last_batch().to_vec();
        batch.sort_by_key(|(pin, _)| *pin);
        batch
    }
}

impl PinDriver for RecordingDriver {
    type Pin = u8;

    fn set_role(&mut self, pin: u8, role: PinRole) {
        self.pending.push((pin, role));
    }

    fn owns(&self, pin: u8) -> bool {
        self.hardware.contains_key(&pin)
    }

    fn commit(&mut self) {
        for &(pin, role) in &self.pending {
            self.hardware.insert(pin, role);
        }
        self.batches.push(core::mem::take(&mut self.pending));
    }

    fn reset(&mut self) {
        self.pending = self
            .hardware
            .keys()
            .map(|&pin| (pin, PinRole::Float))
            .collect();
        self.resets += 1;
    }
}
