//! TekWfm: read Tektronix `:WFM#003` waveform files from Rust.
//!
//! 4/5/6 series oscilloscopes save acquisitions as `.wfm` container files: a
//! fixed 838 byte header describing the acquisition, an optional table of
//! FastFrame timestamps, and the raw curve data. This crate parses the
//! header, validates that the file is one of the layouts the reader
//! understands, and converts the curve into voltage-scaled `f64` samples,
//! one record per FastFrame.
//!
//! # Example
//!
//! ```no_run
//! let wfm = tekwfm::read_file("capture_ch1.wfm").unwrap();
//!
//! println!("{} records of {} samples", wfm.record_count(), wfm.samples_per_record());
//! let volts = wfm.record(0).unwrap();
//! let time = wfm.time_axis();
//! println!("first sample: {} V at {} s", volts[0], time[0]);
//! ```
//!
//! Decoding is a pure function of the file bytes; use [`decode`] directly if
//! the container arrived over some other channel than the filesystem.
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

mod header;
#[cfg(test)]
mod testutil;
mod waveform;

pub use header::{SampleFormat, WfmHeader};
pub use waveform::{Waveform, decode, read_file};

use thiserror::Error;

/// The error enum for waveform decoding.
///
/// Every variant is terminal: a failed decode yields no partial waveform.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WfmError {
    /// IO error while reading a waveform file from disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The input does not contain the full fixed-size header.
    #[error("Waveform header requires 838 bytes, got {0}")]
    MalformedHeader(usize),
    /// A header field does not carry the single value this reader supports.
    #[error("Unsupported value for {field}: got {found}, expected {expected}")]
    UnsupportedField {
        /// Name of the offending header field.
        field: &'static str,
        /// The value found in the file.
        found: i64,
        /// The value a supported file carries.
        expected: i64,
    },
    /// The version tag is not the supported `:WFM#003`.
    #[error("Unsupported waveform version: {0}")]
    UnsupportedVersion(String),
    /// The sample encoding code / byte width pair is not understood.
    #[error("Unsupported sample format: code {code} with {bytes_per_sample} bytes per sample")]
    UnsupportedSampleFormat {
        /// Explicit dimension format code from the header.
        code: i32,
        /// Bytes per raw sample from the header.
        bytes_per_sample: i8,
    },
    /// The input ends before the data the header announces.
    #[error("Waveform file truncated: need {needed} bytes, have {available}")]
    TruncatedFile {
        /// Bytes the header-announced layout requires.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },
}
