//! SockInstr: talk to SCPI test equipment over raw sockets from Rust.
//!
//! Bench instruments that expose a raw socket port (oscilloscopes, signal
//! generators, power supplies) all speak the same transport dialect: ASCII
//! commands terminated by a linefeed, ASCII query responses terminated the
//! same way, and bulk transfers wrapped in IEEE-488.2 definite-length binary
//! blocks. This crate provides that transport layer once, through the
//! [`InstrumentInterface`] trait, so instrument drivers only have to supply
//! the command set of their device.
//!
//! The trait is built on two primitives, a single receive call and a raw
//! write. Everything else, command sending, line-oriented queries, exact
//! byte-count reads that survive partial delivery, and binary block framing,
//! is provided on top of them. Any port that implements [`std::io::Read`]
//! and [`std::io::Write`] can be wrapped in an [`Instrument`]; for the
//! common case of an instrument listening on a TCP socket, use
//! [`TcpIpInterface`].
//!
//! # Example
//!
//! ```no_run
//! use sockinstr::{InstrumentInterface, TcpIpInterface};
//!
//! let mut scope = TcpIpInterface::try_new("192.168.141.136:4000").unwrap();
//! let idn = scope.query("*idn?").unwrap();
//! println!("Connected to: {idn}");
//! ```
//!
//! # Testing drivers
//!
//! Driver crates should be tested against the loopback doubles
//! ([`LoopbackInterfaceString`] for line-oriented exchanges,
//! [`LoopbackInterfaceBytes`] for binary ones). The doubles deliver one byte
//! per receive call, so a driver that passes its loopback tests is known to
//! handle worst-case partial delivery from a real socket.
//!
//! # License
//!
//! Licensed under either of
//!
//! - Apache License, Version 2.0 ([LICENSE-APACHE](http://www.apache.org/licenses/LICENSE-2.0))
//! - MIT license ([LICENSE-MIT](http://opensource.org/licenses/MIT))
//!
//! at your option.

#![warn(missing_docs)]

mod block;
mod instrument;
mod loopback;
mod tcp_ip;

pub use instrument::Instrument;
pub use loopback::{LoopbackInterfaceBytes, LoopbackInterfaceString};
pub use tcp_ip::TcpIpInterface;

use log::debug;
use thiserror::Error;

/// Chunk size for terminator-delimited receives.
const RECV_CHUNK: usize = 1024;

/// The error enum for all instruments.
///
/// Transports and instrument drivers return this error type for everything
/// that can go wrong on the wire, so that drivers can propagate transport,
/// framing, and response-parsing failures alike with the `?` operator. All
/// variants are terminal for the operation that produced them; nothing in
/// this crate retries internally, the calling layer decides whether to
/// repeat a transfer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstrumentError {
    /// The channel index requested is out of range.
    #[error(
        "Channel with index {idx} is out of range. Number of channels available: {nof_channels}"
    )]
    ChannelIndexOutOfRange {
        /// Index of the channel that is out of range.
        idx: usize,
        /// Total number of channels.
        nof_channels: usize,
    },
    /// The byte source reported end-of-stream while more bytes were owed.
    #[error("Connection closed by the instrument before the transfer completed.")]
    Disconnected,
    /// A file requested from the instrument's mass storage was not present
    /// in its directory listing.
    #[error("File \"{file}\" not found on the instrument (directory: {directory})")]
    FileNotFound {
        /// Name of the file that was looked up.
        file: String,
        /// Directory the instrument reported as its working directory.
        directory: String,
    },
    /// A binary block header could not be parsed.
    #[error("Invalid binary block header: {0}")]
    InvalidBlockHeader(String),
    /// The byte following a binary payload was not the expected linefeed.
    #[error("Binary payload not followed by a linefeed, got byte {found:#04x}")]
    BlockTerminator {
        /// The byte that was received instead of the linefeed.
        found: u8,
    },
    /// Error when reading from/writing to an interface. See [`std::io::Error`] for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Instrument response could not be parsed because it was unexpected by the driver. This
    /// error contains the response that was received from the instrument.
    #[error("Response from instrument could not be parsed. Response was: {0}")]
    ResponseParseError(String),
}

/// The `InstrumentInterface` trait defines the transport seam for controlling instruments.
///
/// Implementors provide the two primitives [`read_some`](Self::read_some)
/// and [`write_raw`](Self::write_raw); the trait builds command sending,
/// line-oriented queries, exact reads, and binary block framing on top of
/// them. Stateful implementors should also override the terminator
/// accessors so that drivers can configure the end-of-line convention of
/// their device.
pub trait InstrumentInterface {
    /// Receive some bytes from the instrument into `buf`.
    ///
    /// A single underlying receive call: it may deliver fewer bytes than
    /// `buf` holds, and `Ok(0)` means the instrument closed the connection.
    ///
    /// # Arguments
    /// * `buf` - Buffer to receive into.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, InstrumentError>;

    /// Write raw bytes to the instrument and flush the port.
    ///
    /// # Arguments
    /// * `data` - The bytes to send, exactly as given.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError>;

    /// Get the current terminator of the interface.
    fn get_terminator(&self) -> &str {
        "\n"
    }

    /// Set the terminator of an interface from a `&str`.
    ///
    /// # Arguments
    /// * `_terminator` - A string slice that will be appended to commands and
    ///   expected at the end of responses.
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Send a command to the instrument.
    ///
    /// This function takes the command, appends the terminator, and writes it
    /// to the instrument.
    ///
    /// # Arguments
    /// * `cmd` - A string slice that will be sent to the instrument.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        let cmd = format!("{}{}", cmd, self.get_terminator());
        self.write_raw(cmd.as_bytes())
    }

    /// Query the instrument with a command and return the response as a String.
    ///
    /// Sends the command with [`sendcmd`](Self::sendcmd), then reads until
    /// the final byte of the terminator and returns the trimmed response.
    /// Blocks until the terminator arrives or the transport fails.
    ///
    /// # Arguments
    /// * `cmd` - The command to send to the instrument for which we expect a response.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.sendcmd(cmd)?;
        let eol = self
            .get_terminator()
            .as_bytes()
            .last()
            .copied()
            .unwrap_or(b'\n');
        let raw = self.read_until(eol)?;
        Ok(String::from_utf8_lossy(&raw).trim().to_string())
    }

    /// Read exactly `buf.len()` bytes from the instrument.
    ///
    /// Re-issues the underlying receive call until the buffer is full.
    /// Already-received bytes are never re-requested; a short delivery only
    /// shrinks the remaining tail. Fails with
    /// [`InstrumentError::Disconnected`] if the instrument closes the
    /// connection first.
    ///
    /// # Arguments
    /// * `buf` - Buffer that will be filled completely.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_some(&mut buf[filled..])?;
            if n == 0 {
                return Err(InstrumentError::Disconnected);
            }
            filled += n;
        }
        Ok(())
    }

    /// Read from the instrument until the last received byte is `terminator`.
    ///
    /// Accumulates receives of up to 1 KiB and returns everything that was
    /// read, including the terminator byte.
    ///
    /// # Arguments
    /// * `terminator` - The byte that ends the response.
    fn read_until(&mut self, terminator: u8) -> Result<Vec<u8>, InstrumentError> {
        let mut response: Vec<u8> = Vec::new();
        let mut chunk = [0u8; RECV_CHUNK];
        loop {
            let n = self.read_some(&mut chunk)?;
            if n == 0 {
                return Err(InstrumentError::Disconnected);
            }
            response.extend_from_slice(&chunk[..n]);
            if response[response.len() - 1] == terminator {
                return Ok(response);
            }
        }
    }

    /// Read an IEEE-488.2 definite-length binary block and return its payload.
    ///
    /// The instrument announces bulk data as `#<D><length digits><payload>`
    /// followed by a single linefeed. This routine reads a fixed 15 byte
    /// probe (large enough for the longest possible header), parses the
    /// header out of it, tops the buffer up to the announced length, and
    /// returns exactly the declared payload bytes. Probe bytes beyond the
    /// header are part of the payload and are retained.
    ///
    /// Fails with [`InstrumentError::InvalidBlockHeader`] on a malformed
    /// header and [`InstrumentError::BlockTerminator`] if the payload is not
    /// followed by a linefeed. The payload is returned whole or not at all.
    fn read_block(&mut self) -> Result<Vec<u8>, InstrumentError> {
        let mut buf = vec![0u8; block::PROBE_LEN];
        self.read_exact(&mut buf)?;
        let header = block::BlockHeader::parse(&buf)?;
        debug!(
            "binary block: {} length digits, {} payload bytes",
            header.digit_count(),
            header.declared_len()
        );

        // One growable buffer: the probe seeds it, the remainder of the
        // frame (payload tail plus linefeed) is read straight into it.
        let total = header.frame_len();
        if total > buf.len() {
            let have = buf.len();
            buf.resize(total, 0);
            self.read_exact(&mut buf[have..])?;
        }

        let last = buf[total - 1];
        if last != block::TERMINATOR {
            return Err(InstrumentError::BlockTerminator { found: last });
        }
        buf.truncate(total - 1);
        buf.drain(..header.payload_start());
        Ok(buf)
    }
}
