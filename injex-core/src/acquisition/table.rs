//! Shared measurement table
//!
//! Single writer (the ADC interrupt), single reader per slot (the
//! foreground loop). The reader sets the slot's busy bit for the duration
//! of its read; the writer skips the slot while the bit is set, so a
//! reader sees a value at most one round-robin cycle old and never a
//! half-written one.

use portable_atomic::{AtomicU16, AtomicU8, Ordering};

use crate::config::{AdcConfig, MAX_CHANNELS};

fn slot_index(slot: u8) -> usize {
    usize::from(slot) % MAX_CHANNELS
}

fn slot_bit(slot: u8) -> u8 {
    1 << slot_index(slot)
}

/// Latest reading of every channel in the round-robin sequence
pub struct MeasurementTable {
    readings: [AtomicU16; MAX_CHANNELS],
    busy: AtomicU8,
    classification: AtomicU8,
    cycle_ticks: AtomicU16,
}

impl MeasurementTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            readings: [const { AtomicU16::new(0) }; MAX_CHANNELS],
            busy: AtomicU8::new(0),
            classification: AtomicU8::new(0),
            cycle_ticks: AtomicU16::new(0),
        }
    }

    /// Hold a slot's busy bit until the guard is dropped
    pub fn lock(&self, slot: u8) -> SlotGuard<'_> {
        self.busy.fetch_or(slot_bit(slot), Ordering::Acquire);
        SlotGuard { table: self, slot }
    }

    /// Read a slot under its busy bit
    pub fn read(&self, slot: u8) -> u16 {
        self.lock(slot).value()
    }

    /// Check if a slot's busy bit is set
    pub fn is_busy(&self, slot: u8) -> bool {
        self.busy.load(Ordering::Acquire) & slot_bit(slot) != 0
    }

    /// Publish a conversion result
    ///
    /// The classification bit always follows the new value (high byte
    /// nonzero is "on"). The reading itself is dropped while the slot is
    /// busy. Returns `true` when the reading was stored.
    pub fn publish(&self, slot: u8, value: u16) -> bool {
        let bit = slot_bit(slot);
        if value > 0xFF {
            self.classification.fetch_or(bit, Ordering::Release);
        } else {
            self.classification.fetch_and(!bit, Ordering::Release);
        }

        if self.busy.load(Ordering::Acquire) & bit != 0 {
            return false;
        }
        self.readings[slot_index(slot)].store(value, Ordering::Release);
        true
    }

    /// Classification bits, one per slot
    pub fn classification(&self) -> u8 {
        self.classification.load(Ordering::Acquire)
    }

    /// Classification bit of one slot
    pub fn is_on(&self, slot: u8) -> bool {
        self.classification() & slot_bit(slot) != 0
    }

    /// Ticks taken by the last complete round-robin cycle
    pub fn cycle_ticks(&self) -> u16 {
        self.cycle_ticks.load(Ordering::Acquire)
    }

    pub(crate) fn set_cycle_ticks(&self, ticks: u16) {
        self.cycle_ticks.store(ticks, Ordering::Release);
    }
}

impl Default for MeasurementTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Busy bit held on one measurement slot
///
/// The bit is released on drop.
pub struct SlotGuard<'a> {
    table: &'a MeasurementTable,
    slot: u8,
}

impl SlotGuard<'_> {
    /// Value stored in the locked slot
    pub fn value(&self) -> u16 {
        self.table.readings[slot_index(self.slot)].load(Ordering::Acquire)
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.table
            .busy
            .fetch_and(!slot_bit(self.slot), Ordering::Release);
    }
}

/// Named view of the table for the sensors the core cares about
#[derive(Clone, Copy)]
pub struct SensorReader<'a> {
    table: &'a MeasurementTable,
    throttle_slot: u8,
    lambda_slot: u8,
    battery_slot: u8,
}

impl<'a> SensorReader<'a> {
    /// Bind the sensor roles of a channel table
    pub fn new(table: &'a MeasurementTable, config: &AdcConfig) -> Self {
        Self {
            table,
            throttle_slot: config.throttle_slot,
            lambda_slot: config.lambda_slot,
            battery_slot: config.battery_slot,
        }
    }

    /// Throttle position (0..=1023)
    pub fn throttle(&self) -> u16 {
        self.table.read(self.throttle_slot)
    }

    /// Oxygen sensor reading (0..=1023)
    pub fn lambda(&self) -> u16 {
        self.table.read(self.lambda_slot)
    }

    /// Battery voltage above the classification threshold
    pub fn battery_on(&self) -> bool {
        self.table.is_on(self.battery_slot)
    }

    /// Classification bits of every sampled channel
    pub fn digital_inputs(&self) -> u8 {
        self.table.classification()
    }

    /// Ticks taken by the last complete round-robin cycle
    pub fn cycle_ticks(&self) -> u16 {
        self.table.cycle_ticks()
    }

    /// Underlying table
    pub fn table(&self) -> &'a MeasurementTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_read() {
        let table = MeasurementTable::new();
        assert!(table.publish(2, 700));
        assert_eq!(table.read(2), 700);
        assert!(table.is_on(2));
        assert!(!table.is_busy(2));
    }

    #[test]
    fn test_busy_slot_keeps_old_value() {
        let table = MeasurementTable::new();
        table.publish(1, 100);

        let guard = table.lock(1);
        assert!(table.is_busy(1));
        assert!(!table.publish(1, 900));
        assert_eq!(guard.value(), 100);
        // Classification follows the conversion even while busy
        assert!(table.is_on(1));
        drop(guard);

        assert!(!table.is_busy(1));
        assert!(table.publish(1, 900));
        assert_eq!(table.read(1), 900);
    }

    #[test]
    fn test_guard_only_blocks_its_slot() {
        let table = MeasurementTable::new();
        let _guard = table.lock(0);
        assert!(table.publish(1, 5));
        assert!(!table.publish(0, 5));
    }

    #[test]
    fn test_classification_threshold() {
        let table = MeasurementTable::new();
        table.publish(3, 0x100);
        table.publish(4, 0xFF);
        assert_eq!(table.classification(), 0b0000_1000);
        table.publish(3, 0x0FF);
        assert_eq!(table.classification(), 0);
    }

    #[test]
    fn test_sensor_reader_roles() {
        let table = MeasurementTable::new();
        let config = AdcConfig::default();
        let sensors = SensorReader::new(&table, &config);

        table.publish(config.throttle_slot, 512);
        table.publish(config.lambda_slot, 140);
        table.publish(config.battery_slot, 800);

        assert_eq!(sensors.throttle(), 512);
        assert_eq!(sensors.lambda(), 140);
        assert!(sensors.battery_on());
        assert_eq!(sensors.digital_inputs(), 0b0000_1010);
    }
}
