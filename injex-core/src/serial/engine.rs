//! Software serial state machine
//!
//! Two interrupt sources drive it: the receive-pin falling edge
//! ([`SoftSerial::on_start_edge`]) and the bit timer compare match
//! ([`SoftSerial::on_bit_timer`]).

use injex_hal::gpio::{EdgeInterrupt, InputPin, OutputPin};
use injex_hal::timer::CompareTimer;

use super::ByteRing;
use crate::config::SerialConfig;

/// Receive queue slots
pub const RX_QUEUE_LEN: usize = 48;

/// Transmit queue slots
pub const TX_QUEUE_LEN: usize = 32;

/// Bit index of the stop bit sample while receiving
const RX_STOP_BIT: u8 = 9;

/// Bit index at which a sent frame is complete (stop bit held two bit times)
const TX_DONE_BIT: u8 = 10;

/// Errors from queueing bytes for transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Nothing to send
    Empty,
    /// Longer than the transmit queue can ever hold
    TooLong,
    /// Not enough free space in the transmit queue right now
    QueueFull,
}

/// Line state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineMode {
    /// Line high, waiting for a start bit
    Idle,
    /// Shifting a byte in, or lingering after one
    Receiving,
    /// Shifting a byte out
    Sending,
}

/// Byte queues shared between the serial interrupts and the foreground loop
pub struct SerialQueues {
    rx: ByteRing<RX_QUEUE_LEN>,
    tx: ByteRing<TX_QUEUE_LEN>,
}

impl SerialQueues {
    /// Create empty queues
    pub const fn new() -> Self {
        Self {
            rx: ByteRing::new(),
            tx: ByteRing::new(),
        }
    }

    /// Received bytes not yet read
    pub fn available(&self) -> usize {
        self.rx.len()
    }

    /// Take the oldest received byte
    pub fn read(&self) -> Option<u8> {
        self.rx.pop()
    }

    /// Bytes waiting to be sent
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Largest payload a single write can queue
    pub fn tx_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl Default for SerialQueues {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Frame {
    bit: u8,
    shift: u8,
}

/// Half-duplex bit-banged UART
pub struct SoftSerial<'a, Rx, Tx, E, T> {
    rx: Rx,
    tx: Tx,
    edge: E,
    timer: T,
    config: SerialConfig,
    queues: &'a SerialQueues,
    mode: LineMode,
    rx_frame: Frame,
    tx_frame: Frame,
}

impl<'a, Rx, Tx, E, T> SoftSerial<'a, Rx, Tx, E, T>
where
    Rx: InputPin,
    Tx: OutputPin,
    E: EdgeInterrupt,
    T: CompareTimer,
{
    /// Create an engine; call [`begin`](Self::begin) to start listening
    pub fn new(
        rx: Rx,
        tx: Tx,
        edge: E,
        timer: T,
        config: SerialConfig,
        queues: &'a SerialQueues,
    ) -> Self {
        Self {
            rx,
            tx,
            edge,
            timer,
            config,
            queues,
            mode: LineMode::Idle,
            rx_frame: Frame::default(),
            tx_frame: Frame::default(),
        }
    }

    /// Drive the line idle and wait for a start bit
    pub fn begin(&mut self) {
        self.tx.set_high();
        self.timer.stop();
        self.timer.reset();
        self.timer.enable_interrupt();
        self.listen(LineMode::Idle);
    }

    /// Receive-pin falling edge interrupt
    pub fn on_start_edge(&mut self) {
        if self.mode == LineMode::Sending {
            return;
        }

        self.edge.disable();
        self.mode = LineMode::Receiving;
        self.rx_frame = Frame::default();

        // First sample in the middle of the start bit
        self.timer.stop();
        self.timer.reset();
        self.timer.set_period(self.config.sample_delay_ticks);
        self.timer.start();
    }

    /// Bit timer compare interrupt
    pub fn on_bit_timer(&mut self) {
        match self.mode {
            LineMode::Receiving => self.receive_bit(),
            LineMode::Sending => self.send_bit(),
            LineMode::Idle => self.timer.stop(),
        }
    }

    fn receive_bit(&mut self) {
        let bit = self.rx_frame.bit;
        let linger_end = RX_STOP_BIT + self.config.linger_bits.max(1);

        if bit == 0 {
            if self.rx.is_high() {
                // Start bit did not hold, treat the edge as noise
                self.listen(LineMode::Idle);
                return;
            }
            self.timer.set_period(self.config.bit_ticks);
        } else if bit < RX_STOP_BIT {
            if self.rx.is_high() {
                self.rx_frame.shift |= 1 << (bit - 1);
            } else {
                self.rx_frame.shift &= !(1 << (bit - 1));
            }
        } else if bit == RX_STOP_BIT {
            self.queues.rx.push_overwrite(self.rx_frame.shift);
            // Stay in Receiving for a few bit times to catch the next byte
            self.listen(LineMode::Receiving);
        } else if bit >= linger_end {
            self.mode = LineMode::Idle;
            if !self.prepare_to_send() {
                self.listen(LineMode::Idle);
            }
            return;
        }

        self.rx_frame.bit += 1;
    }

    fn send_bit(&mut self) {
        let bit = self.tx_frame.bit;

        if bit < 8 {
            self.tx.set_state(self.tx_frame.shift & (1 << bit) != 0);
        } else if bit == 8 {
            self.tx.set_high();
        } else if bit >= TX_DONE_BIT {
            self.listen(LineMode::Idle);
            self.prepare_to_send();
            return;
        }

        self.tx_frame.bit += 1;
    }

    /// Re-enable start-bit detection in `Idle` or `Receiving` mode
    ///
    /// `Idle` also stops the bit timer. `Sending` is not a listening mode
    /// and is treated as `Idle`.
    pub fn listen(&mut self, mode: LineMode) {
        let mode = match mode {
            LineMode::Receiving => LineMode::Receiving,
            _ => LineMode::Idle,
        };
        if mode == LineMode::Idle {
            self.timer.stop();
        }
        // Edges latched while shifting are data bits, not start bits
        self.edge.clear_pending();
        self.mode = mode;
        self.edge.enable();
    }

    /// Start shifting out the next queued byte if the line allows it
    ///
    /// Returns `true` when a frame was started.
    pub fn prepare_to_send(&mut self) -> bool {
        if self.queues.tx.is_empty() {
            return false;
        }
        if !self.config.force_send && self.mode != LineMode::Idle {
            return false;
        }
        let Some(byte) = self.queues.tx.pop() else {
            return false;
        };

        self.edge.disable();
        self.mode = LineMode::Sending;
        self.tx_frame = Frame {
            bit: 0,
            shift: byte,
        };

        self.timer.stop();
        self.timer.reset();
        self.timer.set_period(self.config.bit_ticks);
        self.timer.start();
        // Start bit
        self.tx.set_low();
        true
    }

    /// Queue bytes for transmission and start sending when the line is idle
    ///
    /// Succeeds once the bytes are queued, even if sending is deferred
    /// until a reception finishes.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        if bytes.is_empty() {
            return Err(SerialError::Empty);
        }
        if bytes.len() > self.queues.tx.capacity() {
            return Err(SerialError::TooLong);
        }
        if !self.queues.tx.push_slice(bytes) {
            return Err(SerialError::QueueFull);
        }

        self.prepare_to_send();
        Ok(())
    }

    /// Current line state
    pub fn mode(&self) -> LineMode {
        self.mode
    }

    /// Shared byte queues
    pub fn queues(&self) -> &'a SerialQueues {
        self.queues
    }

    /// Receive pin, for waiting on a start edge
    pub fn rx_mut(&mut self) -> &mut Rx {
        &mut self.rx
    }

    /// Access the edge interrupt
    pub fn edge(&self) -> &E {
        &self.edge
    }

    /// Edge interrupt, for latching an edge seen on the pin
    pub fn edge_mut(&mut self) -> &mut E {
        &mut self.edge
    }
}
