//! This module provides the main implementation of the instrument interface trait.
//!
//! It can be used with any type that implements [`std::io::Read`] and
//! [`std::io::Write`], such as [`std::net::TcpStream`].

use std::time::Duration;

use crate::{InstrumentError, InstrumentInterface};

/// A general instrument interface that can be built from any port that implements
/// [`std::io::Read`] and [`std::io::Write`].
///
/// This struct is the bridge between a raw byte port and the
/// [`InstrumentInterface`] trait: it holds the port, the terminator, and the
/// timeout the port was configured with. For TCP connections, the
/// [`crate::TcpIpInterface`] shortcuts construct it for you.
///
/// # Example
///
/// ```no_run
/// use std::{net::TcpStream, time::Duration};
///
/// use sockinstr::Instrument;
///
/// let port = TcpStream::connect("192.168.10.1:4000").unwrap();
/// let interface = Instrument::new(port, Duration::from_secs(3));
/// ```
pub struct Instrument<P: std::io::Read + std::io::Write> {
    port: P,
    terminator: String,
    timeout: Duration,
}

impl<P: std::io::Read + std::io::Write> Instrument<P> {
    /// Create a new instance of [`Instrument`] with a given port.
    ///
    /// # Arguments
    /// * `port` - The byte port the instrument is reachable on.
    /// * `timeout` - The timeout the port was configured with. The interface
    ///   itself never enforces it; it is kept so that callers can report it.
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            terminator: "\n".to_string(),
            timeout,
        }
    }

    /// Get the timeout the underlying port was configured with.
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

impl<P: std::io::Read + std::io::Write> InstrumentInterface for Instrument<P> {
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, InstrumentError> {
        Ok(self.port.read(buf)?)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }
}
