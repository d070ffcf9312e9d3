//! Scaling factors for raw `curve?` transfers.
//!
//! A curve transfer delivers raw ADC levels; the `wfmoutpre` preamble
//! carries the factors to place them on the voltage and time axes. The
//! structs here hold those factors and apply them.

use sockinstr::InstrumentError;

/// Byte width of raw curve samples in `SRIBINARY` encoding.
///
/// Analog channels transfer as signed little-endian integers of one or two
/// bytes per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveEncoding {
    /// One byte per sample.
    Int8,
    /// Two bytes per sample, least significant byte first.
    Int16,
}

impl CurveEncoding {
    /// Parse a `wfmoutpre:byt_n?` response.
    pub(crate) fn from_width(resp: &str) -> Result<Self, InstrumentError> {
        match resp.trim() {
            "1" => Ok(CurveEncoding::Int8),
            "2" => Ok(CurveEncoding::Int16),
            _ => Err(InstrumentError::ResponseParseError(resp.to_string())),
        }
    }

    /// Bytes per raw sample.
    pub fn width(&self) -> usize {
        match self {
            CurveEncoding::Int8 => 1,
            CurveEncoding::Int16 => 2,
        }
    }

    /// Convert raw curve bytes into ADC levels.
    pub fn levels(&self, raw: &[u8]) -> Vec<f64> {
        match self {
            CurveEncoding::Int8 => raw.iter().map(|&b| f64::from(b as i8)).collect(),
            CurveEncoding::Int16 => raw
                .chunks_exact(2)
                .map(|c| f64::from(i16::from_le_bytes([c[0], c[1]])))
                .collect(),
        }
    }
}

/// Vertical scaling factors from the `wfmoutpre` preamble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalScaling {
    /// Volts per ADC level (`ymult`).
    pub volts_per_level: f64,
    /// Reference voltage added after scaling (`yzero`).
    pub offset_volts: f64,
    /// Reference position in levels, subtracted before scaling (`yoff`).
    pub position_levels: f64,
}

impl VerticalScaling {
    /// Place a single ADC level on the voltage axis.
    pub fn scale(&self, level: f64) -> f64 {
        (level - self.position_levels) * self.volts_per_level + self.offset_volts
    }

    /// Place a whole curve of ADC levels on the voltage axis.
    pub fn scale_curve(&self, levels: &[f64]) -> Vec<f64> {
        levels.iter().map(|&level| self.scale(level)).collect()
    }
}

/// Horizontal scaling factors from the `wfmoutpre` preamble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalScaling {
    /// Seconds per sample (`xincr`).
    pub seconds_per_point: f64,
    /// Sub-sample trigger correction in seconds (`xzero`).
    pub trigger_correction: f64,
    /// Samples recorded ahead of the trigger (`pt_off`).
    pub pre_trigger_points: f64,
}

impl HorizontalScaling {
    /// Time of the first sample relative to the trigger.
    pub fn start_time(&self) -> f64 {
        -self.pre_trigger_points * self.seconds_per_point + self.trigger_correction
    }

    /// Materialize the time axis for a record of `points` samples.
    pub fn time_axis(&self, points: usize) -> Vec<f64> {
        let t0 = self.start_time();
        (0..points)
            .map(|i| t0 + i as f64 * self.seconds_per_point)
            .collect()
    }
}
