//! A Rust driver for Tektronix 4/5/6 series MSO oscilloscopes.
//!
//! The driver speaks SCPI over the scope's raw socket port (default 4000)
//! and covers the transfer-heavy part of the command set: binary curve
//! transfers, screen image fetching through the instrument's filesystem, and
//! the `wfmoutpre` scaling queries needed to place raw samples on the
//! voltage and time axes. Anything that changes acquisition state is
//! synchronized with an `*opc?` handshake before the driver moves on; the
//! socket itself gives no ordering guarantee.
//!
//! Saved `.wfm` files fetched off the instrument are decoded by the
//! `tekwfm` crate, not here.
//!
//! # Example
//!
//! ```no_run
//! use sockinstr::TcpIpInterface;
//! use tektronix_mso::{CurveEncoding, TekMso};
//!
//! let interface = TcpIpInterface::try_new("192.168.141.136:4000").unwrap();
//! let mut scope = TekMso::try_new(interface).unwrap();
//!
//! println!("Connected to: {}", scope.identify().unwrap());
//!
//! // Transfer channel 1 as 2-byte signed levels and scale to volts.
//! let record_len = scope.record_length().unwrap();
//! scope.select_source(1).unwrap();
//! scope.configure_transfer(1, record_len, CurveEncoding::Int16).unwrap();
//! let raw = scope.read_curve().unwrap();
//! let vertical = scope.vertical_scaling().unwrap();
//! let volts = vertical.scale_curve(&CurveEncoding::Int16.levels(&raw));
//! ```
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

mod filesystem;
mod scaling;

pub use filesystem::DirEntry;
pub use scaling::{CurveEncoding, HorizontalScaling, VerticalScaling};

use std::sync::{Arc, Mutex};

use log::debug;

use sockinstr::{InstrumentError, InstrumentInterface};

/// Number of analog channels on the scopes this driver targets.
const NUM_CHANNELS: usize = 8;

/// A Rust driver for Tektronix MSO oscilloscopes on a raw socket.
///
/// Works with any interface that implements the
/// [`sockinstr::InstrumentInterface`] trait; in production that is a
/// [`sockinstr::TcpIpInterface`], in tests a loopback double.
pub struct TekMso<T: InstrumentInterface> {
    interface: Arc<Mutex<T>>,
}

impl<T: InstrumentInterface> TekMso<T> {
    /// Create a new MSO driver instance with the given instrument interface.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the `InstrumentInterface` trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        let mut intf = interface;
        intf.set_terminator("\n");
        Ok(TekMso {
            interface: Arc::new(Mutex::new(intf)),
        })
    }

    /// Query model, serial number, and firmware version as a string.
    pub fn identify(&mut self) -> Result<String, InstrumentError> {
        self.query("*idn?")
    }

    /// Clear the event status register and error queue.
    pub fn clear_status(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd("*cls")
    }

    /// Send the raw-socket device clear flag.
    ///
    /// Behaves like a VISA device clear on instruments that support the
    /// socket control flags; discards the instrument's output queue.
    pub fn device_clear(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd("!d")
    }

    /// Block until the instrument reports all pending operations complete.
    ///
    /// Issues `*opc?`; the response must be `1`.
    pub fn wait_for_completion(&mut self) -> Result<(), InstrumentError> {
        let resp = self.query("*opc?")?;
        match resp.as_str() {
            "1" => Ok(()),
            _ => Err(InstrumentError::ResponseParseError(resp)),
        }
    }

    /// Query the event status register.
    pub fn event_status(&mut self) -> Result<i32, InstrumentError> {
        let resp = self.query("*esr?")?;
        resp.parse()
            .map_err(|_| InstrumentError::ResponseParseError(resp))
    }

    /// Query all queued event codes and messages.
    ///
    /// Also clears the event queue on the instrument.
    pub fn all_events(&mut self) -> Result<String, InstrumentError> {
        self.query("allev?")
    }

    /// Turn the display of the given channels on or off.
    ///
    /// Traces left on screen slow large transfers down considerably, so
    /// curve readout usually wants them off.
    ///
    /// # Arguments
    /// * `channels` - Channel numbers, 1 through 8.
    /// * `on` - Desired display state.
    pub fn set_channel_display(
        &mut self,
        channels: &[usize],
        on: bool,
    ) -> Result<(), InstrumentError> {
        for &channel in channels {
            Self::check_channel(channel)?;
        }
        let state = if on { "ON" } else { "OFF" };
        for &channel in channels {
            self.sendcmd(&format!("disp:glob:ch{channel}:state {state}"))?;
        }
        self.wait_for_completion()
    }

    /// Select the channel the next `curve?` query transfers.
    ///
    /// Only a single source is allowed per curve query.
    ///
    /// # Arguments
    /// * `channel` - Channel number, 1 through 8.
    pub fn select_source(&mut self, channel: usize) -> Result<(), InstrumentError> {
        Self::check_channel(channel)?;
        self.sendcmd(&format!("data:source ch{channel}"))?;
        self.wait_for_completion()
    }

    /// Configure the transfer window and encoding for `curve?` queries.
    ///
    /// Uses `SRIBINARY` (signed little-endian integer) encoding throughout.
    ///
    /// # Arguments
    /// * `start` - First sample of the record to transfer, 1-based.
    /// * `stop` - Last sample of the record to transfer.
    /// * `encoding` - Bytes per transferred sample.
    pub fn configure_transfer(
        &mut self,
        start: usize,
        stop: usize,
        encoding: CurveEncoding,
    ) -> Result<(), InstrumentError> {
        self.sendcmd("data:encdg SRIBINARY")?;
        self.sendcmd(&format!("data:start {start}"))?;
        self.sendcmd(&format!("data:stop {stop}"))?;
        self.sendcmd(&format!("wfmoutpre:byt_n {}", encoding.width()))?;
        self.wait_for_completion()
    }

    /// Query the current record length in samples.
    pub fn record_length(&mut self) -> Result<usize, InstrumentError> {
        let resp = self.query("horizontal:recordlength?")?;
        resp.parse()
            .map_err(|_| InstrumentError::ResponseParseError(resp))
    }

    /// Transfer the selected source's curve as raw sample bytes.
    ///
    /// Issues `curve?` and reads the binary block response. The raw bytes
    /// are ADC levels in the configured encoding; combine
    /// [`CurveEncoding::levels`] and [`VerticalScaling::scale_curve`] to get
    /// volts.
    pub fn read_curve(&mut self) -> Result<Vec<u8>, InstrumentError> {
        let mut intf = self
            .interface
            .lock()
            .expect("Mutex should not be poisoned");
        intf.sendcmd("curve?")?;
        intf.read_block()
    }

    /// Query the byte width the next curve transfer uses.
    pub fn curve_encoding(&mut self) -> Result<CurveEncoding, InstrumentError> {
        let resp = self.query("wfmoutpre:byt_n?")?;
        CurveEncoding::from_width(&resp)
    }

    /// Query the vertical scaling factors of the selected source.
    pub fn vertical_scaling(&mut self) -> Result<VerticalScaling, InstrumentError> {
        Ok(VerticalScaling {
            volts_per_level: self.query_f64("wfmoutpre:ymult?")?,
            offset_volts: self.query_f64("wfmoutpre:yzero?")?,
            position_levels: self.query_f64("wfmoutpre:yoff?")?,
        })
    }

    /// Query the horizontal scaling factors of the selected source.
    pub fn horizontal_scaling(&mut self) -> Result<HorizontalScaling, InstrumentError> {
        Ok(HorizontalScaling {
            pre_trigger_points: self.query_f64("wfmoutpre:pt_off?")?,
            seconds_per_point: self.query_f64("wfmoutpre:xincr?")?,
            trigger_correction: self.query_f64("wfmoutpre:xzero?")?,
        })
    }

    /// Query the instrument's home directory.
    pub fn home_directory(&mut self) -> Result<String, InstrumentError> {
        self.query("filesystem:homedir?")
    }

    /// Query the instrument's current working directory.
    pub fn current_directory(&mut self) -> Result<String, InstrumentError> {
        self.query("filesystem:cwd?")
    }

    /// Change the instrument's current working directory.
    ///
    /// # Arguments
    /// * `dir` - Target directory on the instrument.
    pub fn change_directory(&mut self, dir: &str) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("filesystem:cwd {dir}"))
    }

    /// List the instrument's current working directory.
    pub fn directory_listing(&mut self) -> Result<Vec<DirEntry>, InstrumentError> {
        let resp = self.query("filesystem:ldir?")?;
        Ok(filesystem::parse_listing(&resp))
    }

    /// Look up a file's size in bytes via the directory listing.
    ///
    /// The read buffer for a file transfer must be sized exactly, so the
    /// size comes from the listing rather than from guessing. Fails with
    /// [`InstrumentError::FileNotFound`] (naming the instrument's working
    /// directory) if no entry matches exactly.
    ///
    /// # Arguments
    /// * `file` - File name as it appears in the listing, without quotes.
    pub fn file_size(&mut self, file: &str) -> Result<u64, InstrumentError> {
        let listing = self.directory_listing()?;
        match filesystem::find_entry(&listing, file) {
            Some(entry) => entry.size_bytes(),
            None => {
                let directory = self.current_directory()?;
                Err(InstrumentError::FileNotFound {
                    file: file.to_string(),
                    directory,
                })
            }
        }
    }

    /// Delete a file from the instrument's mass storage.
    ///
    /// # Arguments
    /// * `file` - File name relative to the working directory.
    pub fn delete_file(&mut self, file: &str) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("filesystem:delete \"{file}\""))?;
        self.wait_for_completion()
    }

    /// Fetch a screen capture from the instrument.
    ///
    /// Saves the screen to a temporary file on the instrument, reads the
    /// file back over the socket, and deletes it again to keep the
    /// instrument's disk clean. Returns the image file's bytes (PNG for the
    /// usual save formats).
    ///
    /// # Arguments
    /// * `remote_name` - Temporary file name on the instrument, e.g. `temp.png`.
    pub fn fetch_screen(&mut self, remote_name: &str) -> Result<Vec<u8>, InstrumentError> {
        debug!("saving screen image to \"{remote_name}\" on the instrument");
        self.sendcmd(&format!("save:image \"{remote_name}\""))?;
        self.wait_for_completion()?;

        let size = self.file_size(remote_name)?;
        debug!("reading {size} bytes of image data");
        let data = {
            let mut intf = self
                .interface
                .lock()
                .expect("Mutex should not be poisoned");
            intf.sendcmd(&format!("filesystem:readfile \"{remote_name}\""))?;
            // Read-to-buffer flag of the raw socket protocol.
            intf.sendcmd("!r")?;
            let mut data = vec![0u8; size as usize];
            intf.read_exact(&mut data)?;

            // A single linefeed closes the transfer.
            let mut tail = [0u8; 1];
            intf.read_exact(&mut tail)?;
            if tail[0] != b'\n' {
                return Err(InstrumentError::BlockTerminator { found: tail[0] });
            }
            data
        };

        self.delete_file(remote_name)?;
        Ok(data)
    }

    /// Validate an analog channel number.
    fn check_channel(idx: usize) -> Result<(), InstrumentError> {
        if idx == 0 || idx > NUM_CHANNELS {
            return Err(InstrumentError::ChannelIndexOutOfRange {
                idx,
                nof_channels: NUM_CHANNELS,
            });
        }
        Ok(())
    }

    /// Send a command to the instrument.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        self.interface
            .lock()
            .expect("Mutex should not be poisoned")
            .sendcmd(cmd)
    }

    /// Query the instrument and return the trimmed response.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.interface
            .lock()
            .expect("Mutex should not be poisoned")
            .query(cmd)
    }

    /// Query the instrument for a floating point value.
    fn query_f64(&mut self, cmd: &str) -> Result<f64, InstrumentError> {
        let resp = self.query(cmd)?;
        resp.parse()
            .map_err(|_| InstrumentError::ResponseParseError(resp))
    }
}
