//! Inter-task communication channels

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Largest payload the soft serial accepts in one write
pub const SERIAL_FRAME_LEN: usize = 31;

/// Channel capacity for outgoing serial frames
const SERIAL_TX_CHANNEL_SIZE: usize = 4;

/// Bytes queued in one soft serial write
pub type SerialFrame = Vec<u8, SERIAL_FRAME_LEN>;

/// Outgoing frames for the serial task
pub static SERIAL_TX: Channel<CriticalSectionRawMutex, SerialFrame, SERIAL_TX_CHANNEL_SIZE> =
    Channel::new();
