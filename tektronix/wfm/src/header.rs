//! Parsing and validation of the fixed 838 byte waveform file header.

use crate::WfmError;

/// Total length of the fixed header.
pub(crate) const HEADER_LEN: usize = 838;

/// The only waveform version this reader supports.
const SUPPORTED_VERSION: &[u8; 8] = b":WFM#003";

/// Value of the byte-order field for little-endian files.
const LITTLE_ENDIAN_MARKER: u16 = 0x0f0f;

/// Byte offsets of the header fields used by this reader.
///
/// The header is a packed little-endian record; every field sits at a fixed
/// offset from the start of the file. The comment gives the primitive stored
/// there.
mod offset {
    pub const BYTE_ORDER: usize = 0; // u16
    pub const VERSION: usize = 2; // 8 ASCII bytes
    pub const BYTES_PER_SAMPLE: usize = 15; // i8
    pub const CURVE_OFFSET: usize = 16; // i32
    pub const FRAME_COUNT: usize = 72; // u32, stored as count - 1
    pub const FASTFRAME_FLAG: usize = 78; // u32
    pub const IMPLICIT_DIM_COUNT: usize = 114; // u32
    pub const EXPLICIT_DIM_COUNT: usize = 118; // u32
    pub const RECORD_TYPE: usize = 122; // u32
    pub const SUMMARY_FRAME: usize = 154; // i16
    pub const VOLT_SCALE: usize = 168; // f64
    pub const VOLT_OFFSET: usize = 176; // f64
    pub const FORMAT_CODE: usize = 240; // i32
    pub const EXPLICIT_DIM1_TYPE: usize = 244; // u32
    pub const TIME_SCALE: usize = 488; // f64
    pub const TIME_START: usize = 496; // f64
    pub const TIME_BASE: usize = 768; // u32
    pub const TRIGGER_FRAC: usize = 788; // f64
    pub const DATE_FRAC: usize = 796; // f64
    pub const DATE: usize = 804; // i32
    pub const PRE_TRIM_BYTES: usize = 822; // u32
    pub const POST_TRIM_BYTES: usize = 826; // u32
    pub const CURVE_BYTES: usize = 830; // u32
}

/// Bounds-checked little-endian field reader.
///
/// All field extraction funnels through this reader so that offsets and
/// widths live in exactly one place per field and a bad offset can never
/// panic.
pub(crate) struct FieldReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        FieldReader { bytes }
    }

    fn slice<const N: usize>(&self, offset: usize) -> Result<[u8; N], WfmError> {
        self.bytes
            .get(offset..offset + N)
            .and_then(|s| s.try_into().ok())
            .ok_or(WfmError::MalformedHeader(self.bytes.len()))
    }

    pub(crate) fn u16_at(&self, offset: usize) -> Result<u16, WfmError> {
        Ok(u16::from_le_bytes(self.slice(offset)?))
    }

    pub(crate) fn i16_at(&self, offset: usize) -> Result<i16, WfmError> {
        Ok(i16::from_le_bytes(self.slice(offset)?))
    }

    pub(crate) fn u32_at(&self, offset: usize) -> Result<u32, WfmError> {
        Ok(u32::from_le_bytes(self.slice(offset)?))
    }

    pub(crate) fn i32_at(&self, offset: usize) -> Result<i32, WfmError> {
        Ok(i32::from_le_bytes(self.slice(offset)?))
    }

    pub(crate) fn i8_at(&self, offset: usize) -> Result<i8, WfmError> {
        Ok(i8::from_le_bytes(self.slice(offset)?))
    }

    pub(crate) fn f64_at(&self, offset: usize) -> Result<f64, WfmError> {
        Ok(f64::from_le_bytes(self.slice(offset)?))
    }

    pub(crate) fn bytes8_at(&self, offset: usize) -> Result<[u8; 8], WfmError> {
        self.slice(offset)
    }
}

/// Check a header invariant, naming the field in the error.
fn check(field: &'static str, found: u32, expected: u32) -> Result<(), WfmError> {
    if found == expected {
        Ok(())
    } else {
        Err(WfmError::UnsupportedField {
            field,
            found: found.into(),
            expected: expected.into(),
        })
    }
}

/// Numeric encoding of the raw curve samples.
///
/// Only three of the encodings the format can express ever come out of the
/// scopes this reader targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 8 bit integer levels (code 7, 1 byte per sample).
    Int8,
    /// Signed 16 bit integer levels (code 0, 2 bytes per sample).
    Int16,
    /// IEEE 754 single precision samples (code 4, 4 bytes per sample).
    Float32,
}

impl SampleFormat {
    /// Resolve the format from the header's code / byte-width pair.
    fn from_code_and_width(code: i32, bytes_per_sample: i8) -> Result<Self, WfmError> {
        match (code, bytes_per_sample) {
            (7, 1) => Ok(SampleFormat::Int8),
            (0, 2) => Ok(SampleFormat::Int16),
            (4, 4) => Ok(SampleFormat::Float32),
            _ => Err(WfmError::UnsupportedSampleFormat {
                code,
                bytes_per_sample,
            }),
        }
    }

    /// Bytes occupied by one raw sample.
    pub fn width(&self) -> usize {
        match self {
            SampleFormat::Int8 => 1,
            SampleFormat::Int16 => 2,
            SampleFormat::Float32 => 4,
        }
    }
}

/// The decoded waveform file header.
///
/// Offsets and trim counts are kept in bytes, exactly as stored in the file;
/// the value-count helpers divide by the sample width.
#[derive(Debug, Clone)]
pub struct WfmHeader {
    /// Version tag of the file, always `:WFM#003` for a supported file.
    pub version: String,
    /// Byte offset of the curve data from the start of the file.
    pub curve_offset: i32,
    /// Numeric encoding of the raw samples.
    pub sample_format: SampleFormat,
    /// Number of records in the file (FastFrame count, at least 1).
    pub record_count: usize,
    /// Whether a FastFrame timestamp table follows the header.
    pub fastframe: bool,
    /// Summary-frame indicator, diagnostic only.
    pub summary_frame: i16,
    /// Volts per raw level.
    pub volt_scale: f64,
    /// Reference voltage added after scaling.
    pub volt_offset: f64,
    /// Seconds per sample.
    pub time_scale: f64,
    /// Time of the first retained sample, in seconds relative to the trigger.
    pub time_start: f64,
    /// Sub-sample trigger correction of the first record, in seconds.
    pub trigger_frac: f64,
    /// Sub-second fraction of the acquisition date of the first record.
    pub date_frac: f64,
    /// Integer acquisition date of the first record.
    pub date: i32,
    /// Leading curve bytes (per record) outside the retained region.
    pub pre_trim_bytes: u32,
    /// Byte offset (per record) where the retained region ends.
    pub post_trim_bytes: u32,
    /// Total curve bytes per record.
    pub curve_bytes: u32,
}

impl WfmHeader {
    /// Parse and validate the header from the start of a waveform file.
    ///
    /// `bytes` is the whole file (or at least its first 838 bytes). Any
    /// invariant violation fails with an error naming the field; there are
    /// no warnings and no partially-valid headers.
    pub fn parse(bytes: &[u8]) -> Result<Self, WfmError> {
        if bytes.len() < HEADER_LEN {
            return Err(WfmError::MalformedHeader(bytes.len()));
        }
        let r = FieldReader::new(&bytes[..HEADER_LEN]);

        let byte_order = r.u16_at(offset::BYTE_ORDER)?;
        check("byte_order", byte_order.into(), LITTLE_ENDIAN_MARKER.into())?;

        let version = r.bytes8_at(offset::VERSION)?;
        if &version != SUPPORTED_VERSION {
            return Err(WfmError::UnsupportedVersion(
                String::from_utf8_lossy(&version).into_owned(),
            ));
        }

        check(
            "implicit_dim_count",
            r.u32_at(offset::IMPLICIT_DIM_COUNT)?,
            1,
        )?;
        check(
            "explicit_dim_count",
            r.u32_at(offset::EXPLICIT_DIM_COUNT)?,
            1,
        )?;
        // 2 is the vector record type; everything else (pixel maps etc.) is
        // out of scope.
        check("record_type", r.u32_at(offset::RECORD_TYPE)?, 2)?;
        check(
            "explicit_dim1_type",
            r.u32_at(offset::EXPLICIT_DIM1_TYPE)?,
            0,
        )?;
        check("time_base", r.u32_at(offset::TIME_BASE)?, 0)?;

        let sample_format = SampleFormat::from_code_and_width(
            r.i32_at(offset::FORMAT_CODE)?,
            r.i8_at(offset::BYTES_PER_SAMPLE)?,
        )?;

        Ok(WfmHeader {
            version: String::from_utf8_lossy(&version).into_owned(),
            curve_offset: r.i32_at(offset::CURVE_OFFSET)?,
            sample_format,
            record_count: r.u32_at(offset::FRAME_COUNT)? as usize + 1,
            fastframe: r.u32_at(offset::FASTFRAME_FLAG)? == 1,
            summary_frame: r.i16_at(offset::SUMMARY_FRAME)?,
            volt_scale: r.f64_at(offset::VOLT_SCALE)?,
            volt_offset: r.f64_at(offset::VOLT_OFFSET)?,
            time_scale: r.f64_at(offset::TIME_SCALE)?,
            time_start: r.f64_at(offset::TIME_START)?,
            trigger_frac: r.f64_at(offset::TRIGGER_FRAC)?,
            date_frac: r.f64_at(offset::DATE_FRAC)?,
            date: r.i32_at(offset::DATE)?,
            pre_trim_bytes: r.u32_at(offset::PRE_TRIM_BYTES)?,
            post_trim_bytes: r.u32_at(offset::POST_TRIM_BYTES)?,
            curve_bytes: r.u32_at(offset::CURVE_BYTES)?,
        })
    }

    /// Raw values stored per record.
    pub fn available_values(&self) -> usize {
        self.curve_bytes as usize / self.sample_format.width()
    }

    /// Leading values per record outside the retained region.
    pub fn pre_values(&self) -> usize {
        self.pre_trim_bytes as usize / self.sample_format.width()
    }

    /// Trailing values per record outside the retained region.
    pub fn post_values(&self) -> usize {
        self.curve_bytes.saturating_sub(self.post_trim_bytes) as usize
            / self.sample_format.width()
    }

    /// Index range of the retained (physically meaningful) values per record.
    ///
    /// Degenerate trim counts clamp to an empty range rather than wrapping.
    pub fn retained_range(&self) -> std::ops::Range<usize> {
        let stop = self.available_values().saturating_sub(self.post_values());
        let start = self.pre_values().min(stop);
        start..stop
    }
}
