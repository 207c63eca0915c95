//! Lambda capture buffer
//!
//! Lifecycle: idle, armed (decimation ratio nonzero), filled, idle again
//! once the consumer takes the packet. Only one capture is ever in flight
//! and arming is ignored until the previous packet has been taken.

use injex_protocol::lambda::{
    EngineState, LambdaPacket, ENGINE_STATE_LEN, ENGINE_STATE_OFFSET, LAMBDA_ELAPSED_OFFSET,
    LAMBDA_HEADER, LAMBDA_PACKET_LEN, LAMBDA_SAMPLES_OFFSET, LAMBDA_SAMPLE_COUNT,
};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

/// Packet buffer shared by the requester, the ADC interrupt and the consumer
pub struct LambdaCapture {
    buffer: [AtomicU8; LAMBDA_PACKET_LEN],
    decimation: AtomicU8,
    filled: AtomicBool,
}

impl LambdaCapture {
    /// Create an idle capture
    pub const fn new() -> Self {
        Self {
            buffer: [const { AtomicU8::new(0) }; LAMBDA_PACKET_LEN],
            decimation: AtomicU8::new(0),
            filled: AtomicBool::new(false),
        }
    }

    /// Request a capture, one sample every `decimation` lambda conversions
    ///
    /// The engine state is stamped into the packet header. Returns `false`
    /// without touching the buffer when `decimation` is zero, a capture is
    /// in flight or the previous packet has not been taken.
    pub fn arm(&self, decimation: u8, state: &EngineState) -> bool {
        if decimation == 0 || self.is_in_flight() || self.is_filled() {
            return false;
        }

        self.buffer[0].store(LAMBDA_HEADER, Ordering::Relaxed);
        for (i, byte) in state.to_bytes().iter().enumerate() {
            self.buffer[ENGINE_STATE_OFFSET + i].store(*byte, Ordering::Relaxed);
        }
        self.decimation.store(decimation, Ordering::Release);
        true
    }

    /// Check if a capture is armed and still collecting samples
    pub fn is_in_flight(&self) -> bool {
        self.decimation.load(Ordering::Acquire) != 0
    }

    /// Check if a complete packet is waiting for the consumer
    pub fn is_filled(&self) -> bool {
        self.filled.load(Ordering::Acquire)
    }

    /// Take the filled packet, sealed with its checksum
    ///
    /// Clears the filled flag so the next request can arm the buffer.
    pub fn take(&self) -> Option<[u8; LAMBDA_PACKET_LEN]> {
        if !self.is_filled() {
            return None;
        }

        let mut packet = [0u8; LAMBDA_PACKET_LEN];
        for (dst, src) in packet.iter_mut().zip(self.buffer.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        LambdaPacket::seal(&mut packet);
        self.filled.store(false, Ordering::Release);
        Some(packet)
    }

    /// Engine state stamped by the last request
    pub fn engine_state(&self) -> EngineState {
        let mut bytes = [0u8; ENGINE_STATE_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.buffer[ENGINE_STATE_OFFSET + i].load(Ordering::Relaxed);
        }
        EngineState::from_bytes(&bytes)
    }

    pub(crate) fn decimation(&self) -> u8 {
        self.decimation.load(Ordering::Acquire)
    }

    pub(crate) fn write_sample(&self, index: usize, sample: u8) {
        if index < LAMBDA_SAMPLE_COUNT {
            self.buffer[LAMBDA_SAMPLES_OFFSET + index].store(sample, Ordering::Relaxed);
        }
    }

    pub(crate) fn complete(&self, elapsed_ticks: u16) {
        let [lo, hi] = elapsed_ticks.to_le_bytes();
        self.buffer[LAMBDA_ELAPSED_OFFSET].store(lo, Ordering::Relaxed);
        self.buffer[LAMBDA_ELAPSED_OFFSET + 1].store(hi, Ordering::Relaxed);
        self.decimation.store(0, Ordering::Release);
        self.filled.store(true, Ordering::Release);
    }
}

impl Default for LambdaCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> EngineState {
        EngineState {
            combustion_counter: 42,
            period_ticks: 5000,
            pulse_width_ticks: 700,
            throttle: 300,
        }
    }

    #[test]
    fn test_arm_stamps_header() {
        let capture = LambdaCapture::new();
        assert!(capture.arm(2, &state()));
        assert!(capture.is_in_flight());
        assert_eq!(capture.decimation(), 2);
        assert_eq!(capture.engine_state(), state());
    }

    #[test]
    fn test_arm_ratio_zero_is_ignored() {
        let capture = LambdaCapture::new();
        assert!(!capture.arm(0, &state()));
        assert!(!capture.is_in_flight());
    }

    #[test]
    fn test_single_capture_in_flight() {
        let capture = LambdaCapture::new();
        assert!(capture.arm(1, &state()));
        let other = EngineState {
            combustion_counter: 7,
            ..state()
        };
        assert!(!capture.arm(3, &other));
        assert_eq!(capture.decimation(), 1);
        assert_eq!(capture.engine_state(), state());
    }

    #[test]
    fn test_take_seals_and_releases() {
        let capture = LambdaCapture::new();
        assert_eq!(capture.take(), None);

        capture.arm(1, &state());
        for i in 0..LAMBDA_SAMPLE_COUNT {
            capture.write_sample(i, i as u8);
        }
        capture.complete(0x0102);
        assert!(capture.is_filled());
        assert!(!capture.is_in_flight());
        assert!(!capture.arm(1, &state()));

        let packet = capture.take().unwrap();
        let parsed = LambdaPacket::parse(&packet).unwrap();
        assert_eq!(parsed.engine_state, state());
        assert_eq!(parsed.samples[31], 31);
        assert_eq!(parsed.elapsed_ticks, 0x0102);

        assert!(!capture.is_filled());
        assert!(capture.arm(1, &state()));
    }
}
