//! This module provides the interface for an instrument controlled via TCP/IP.
//!
//! It includes a blocking implementation built on the [`std::net::TcpStream`]
//! struct.

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{Instrument, InstrumentError};

/// A blocking TCP/IP interface using the [`std::net::TcpStream`] struct.
#[derive(Debug)]
pub struct TcpIpInterface {}

impl TcpIpInterface {
    /// Try to create a new TCP/IP connected [`Instrument`].
    ///
    /// The terminator is by default set to `"\n"`, but can be changed using
    /// the `set_terminator` function. Read and write timeouts are set to
    /// three seconds; we do not want to block indefinitely, as this is not
    /// wanted for instrument communications. A blocked transfer can only be
    /// cancelled by the timeout closing the call, which surfaces as an
    /// [`InstrumentError::Io`].
    ///
    /// # Arguments
    /// * `sock_addr` - Socket address, e.g., `"192.168.0.10:4000"`.
    pub fn try_new<A: ToSocketAddrs>(
        sock_addr: A,
    ) -> Result<Instrument<TcpStream>, InstrumentError> {
        Self::try_new_with_timeout(sock_addr, Duration::from_secs(3))
    }

    /// Try to create a new TCP/IP connected [`Instrument`] with a given timeout.
    ///
    /// Large waveform transfers at low sample rates can take longer than the
    /// default three seconds, so the timeout is configurable here.
    ///
    /// # Arguments
    /// * `sock_addr` - Socket address.
    /// * `timeout` - Read and write timeout for the socket.
    pub fn try_new_with_timeout<A: ToSocketAddrs>(
        sock_addr: A,
        timeout: Duration,
    ) -> Result<Instrument<TcpStream>, InstrumentError> {
        let stream = TcpStream::connect(sock_addr)?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        Ok(Instrument::new(stream, timeout))
    }
}
