//! Bit-level half-duplex software serial
//!
//! 8N1 frames on two pins: a receive pin with a falling-edge interrupt and
//! a transmit pin, both clocked by one compare timer. The edge interrupt
//! catches the start bit; every later bit is sampled or driven from the
//! timer interrupt at one-bit intervals.
//!
//! ```text
//!          ┌──┐  ┌─────┐     ┌───────────
//!  idle ───┘  └──┘     └─ ─ ─┘  stop / linger
//!      start  b0  b1 ...  b7
//!        ▲ edge  ▲ timer (mid-bit)
//! ```
//!
//! Byte queues are lock-free rings shared with the foreground loop.

mod engine;
mod ring;

pub use engine::{LineMode, SerialError, SerialQueues, SoftSerial, RX_QUEUE_LEN, TX_QUEUE_LEN};
pub use ring::ByteRing;
