//! Decoding of the curve region and FastFrame timestamps into scaled samples.

use std::path::Path;

use log::debug;

use crate::WfmError;
use crate::header::{FieldReader, HEADER_LEN, SampleFormat, WfmHeader};

/// Length of one FastFrame timestamp record trailing the header.
const FRAME_STAMP_LEN: usize = 24;

/// A fully decoded waveform: voltage-scaled samples plus per-record
/// timestamp metadata.
///
/// Samples are stored record-contiguous; [`record`](Waveform::record) hands
/// out one record's retained samples as a slice. The decoded data is
/// immutable and owned by whoever requested the decode; nothing is shared or
/// cached.
#[derive(Debug)]
pub struct Waveform {
    /// The parsed file header.
    pub header: WfmHeader,
    samples: Vec<f64>,
    samples_per_record: usize,
    /// Sub-sample trigger corrections, one per record, in seconds.
    pub trigger_frac: Vec<f64>,
    /// Sub-second date fractions, one per record.
    pub date_frac: Vec<f64>,
    /// Integer acquisition dates, one per record.
    pub date: Vec<i32>,
}

impl Waveform {
    /// Number of records (FastFrames) in the waveform, at least 1.
    pub fn record_count(&self) -> usize {
        self.header.record_count
    }

    /// Retained samples per record after pre/post trimming.
    pub fn samples_per_record(&self) -> usize {
        self.samples_per_record
    }

    /// All retained samples, record-contiguous, in volts.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Voltage samples of a single record, or `None` if `idx` is out of range.
    pub fn record(&self, idx: usize) -> Option<&[f64]> {
        if idx >= self.header.record_count {
            return None;
        }
        let start = idx * self.samples_per_record;
        Some(&self.samples[start..start + self.samples_per_record])
    }

    /// Time of the first retained sample, in seconds relative to the trigger.
    pub fn time_start(&self) -> f64 {
        self.header.time_start
    }

    /// Seconds per sample.
    pub fn time_scale(&self) -> f64 {
        self.header.time_scale
    }

    /// Materialize the time axis shared by all records.
    ///
    /// The axis is the linear function `time_start + i * time_scale`; it is
    /// provided for convenience, plots with many million points may prefer
    /// to compute it on the fly.
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.samples_per_record)
            .map(|i| self.header.time_start + i as f64 * self.header.time_scale)
            .collect()
    }
}

/// Decode a complete waveform file from its raw bytes.
///
/// Validates the header, reads the FastFrame timestamp table if one is
/// present, and converts the retained part of every record to volts via
/// `value * volt_scale + volt_offset` in double precision. Fails without
/// producing any samples if the header is unsupported or the input is
/// shorter than the layout it announces.
pub fn decode(bytes: &[u8]) -> Result<Waveform, WfmError> {
    let header = WfmHeader::parse(bytes)?;
    let record_count = header.record_count;

    // Record 0 timestamps come from the header itself, the rest from the
    // trailing stamp table.
    let mut trigger_frac = vec![0.0; record_count];
    let mut date_frac = vec![0.0; record_count];
    let mut date = vec![0i32; record_count];
    trigger_frac[0] = header.trigger_frac;
    date_frac[0] = header.date_frac;
    date[0] = header.date;

    if header.fastframe {
        let table_len = (record_count - 1) * FRAME_STAMP_LEN;
        let table = bytes
            .get(HEADER_LEN..HEADER_LEN + table_len)
            .ok_or(WfmError::TruncatedFile {
                needed: HEADER_LEN + table_len,
                available: bytes.len(),
            })?;
        for (idx, rec) in table.chunks_exact(FRAME_STAMP_LEN).enumerate() {
            // Each record: u32 state (unused), trigger fraction, date
            // fraction, integer date.
            let r = FieldReader::new(rec);
            trigger_frac[idx + 1] = r.f64_at(4)?;
            date_frac[idx + 1] = r.f64_at(12)?;
            date[idx + 1] = r.i32_at(20)?;
        }
    }

    let width = header.sample_format.width();
    let available = header.available_values();
    let record_bytes = available * width;
    let retained = header.retained_range();

    let curve_len = record_bytes
        .checked_mul(record_count)
        .ok_or(WfmError::TruncatedFile {
            needed: usize::MAX,
            available: bytes.len(),
        })?;
    let needed = i128::from(header.curve_offset) + curve_len as i128;
    if header.curve_offset < 0 || needed > bytes.len() as i128 {
        return Err(WfmError::TruncatedFile {
            needed: usize::try_from(needed.max(0)).unwrap_or(usize::MAX),
            available: bytes.len(),
        });
    }
    let curve_start = header.curve_offset as usize;

    let volt_scale = header.volt_scale;
    let volt_offset = header.volt_offset;
    let samples_per_record = retained.len();
    let mut samples = Vec::with_capacity(samples_per_record * record_count);
    for rec_idx in 0..record_count {
        let base = curve_start + rec_idx * record_bytes;
        let rec = &bytes[base + retained.start * width..base + retained.end * width];
        match header.sample_format {
            SampleFormat::Int8 => samples.extend(
                rec.iter()
                    .map(|&b| f64::from(b as i8) * volt_scale + volt_offset),
            ),
            SampleFormat::Int16 => samples.extend(rec.chunks_exact(2).map(|c| {
                f64::from(i16::from_le_bytes([c[0], c[1]])) * volt_scale + volt_offset
            })),
            SampleFormat::Float32 => samples.extend(rec.chunks_exact(4).map(|c| {
                f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])) * volt_scale + volt_offset
            })),
        }
    }

    debug!(
        "decoded waveform: {} records x {} samples, format {:?}",
        record_count, samples_per_record, header.sample_format
    );

    Ok(Waveform {
        header,
        samples,
        samples_per_record,
        trigger_frac,
        date_frac,
        date,
    })
}

/// Read and decode a waveform file from disk.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Waveform, WfmError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::WfmBuilder;

    fn i16_curve(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn f32_curve(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn int16_samples_are_scaled() {
        let bytes = WfmBuilder::new()
            .format(0, 2)
            .scaling(0.5, 1.0)
            .curve_len(6)
            .trim(0, 6)
            .curve(i16_curve(&[2, 4, 6]))
            .build();
        let wfm = decode(&bytes).unwrap();

        assert_eq!(wfm.record_count(), 1);
        assert_eq!(wfm.samples_per_record(), 3);
        assert_eq!(wfm.samples(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn int8_samples_are_signed() {
        let bytes = WfmBuilder::new()
            .scaling(2.0, 0.0)
            .curve_len(3)
            .trim(0, 3)
            .curve(vec![0xFF, 0x00, 0x01]) // -1, 0, 1
            .build();
        let wfm = decode(&bytes).unwrap();

        assert_eq!(wfm.samples(), &[-2.0, 0.0, 2.0]);
    }

    #[test]
    fn float32_samples_pass_through_scaling() {
        let bytes = WfmBuilder::new()
            .format(4, 4)
            .scaling(2.0, 0.5)
            .curve_len(8)
            .trim(0, 8)
            .curve(f32_curve(&[0.5, -1.5]))
            .build();
        let wfm = decode(&bytes).unwrap();

        assert_eq!(wfm.samples(), &[1.5, -2.5]);
    }

    #[test]
    fn trimming_removes_leading_and_trailing_values() {
        let bytes = WfmBuilder::new()
            .curve_len(10)
            .trim(2, 8)
            .curve((0..10).collect())
            .build();
        let wfm = decode(&bytes).unwrap();

        // 2 pre values and 10 - 8 = 2 post values are discarded.
        assert_eq!(wfm.samples_per_record(), 6);
        assert_eq!(wfm.samples(), &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn fastframe_timestamps_seed_from_header_then_table() {
        let bytes = WfmBuilder::new()
            .records(3, true)
            .header_stamp(1.5e-9, 0.25, 19_700_101)
            .stamp(2.5e-9, 0.50, 19_700_102)
            .stamp(3.5e-9, 0.75, 19_700_103)
            .curve_len(4)
            .trim(0, 4)
            .curve((0..12).collect())
            .build();
        let wfm = decode(&bytes).unwrap();

        assert_eq!(wfm.record_count(), 3);
        assert_eq!(wfm.trigger_frac, vec![1.5e-9, 2.5e-9, 3.5e-9]);
        assert_eq!(wfm.date_frac, vec![0.25, 0.50, 0.75]);
        assert_eq!(wfm.date, vec![19_700_101, 19_700_102, 19_700_103]);
    }

    #[test]
    fn records_are_column_slices_of_the_curve() {
        let bytes = WfmBuilder::new()
            .records(2, true)
            .stamp(0.0, 0.0, 0)
            .curve_len(4)
            .trim(1, 3)
            .curve((10..18).collect())
            .build();
        let wfm = decode(&bytes).unwrap();

        // Per record 4 values, retained range 1..3.
        assert_eq!(wfm.record(0).unwrap(), &[11.0, 12.0]);
        assert_eq!(wfm.record(1).unwrap(), &[15.0, 16.0]);
        assert_eq!(wfm.record(2), None);
    }

    #[test]
    fn no_fastframe_flag_skips_the_stamp_table() {
        // Multiple records but no stamp table: the flag decides.
        let bytes = WfmBuilder::new()
            .records(2, false)
            .header_stamp(7.0e-9, 0.1, 42)
            .curve_len(2)
            .trim(0, 2)
            .curve((0..4).collect())
            .build();
        let wfm = decode(&bytes).unwrap();

        assert_eq!(wfm.trigger_frac, vec![7.0e-9, 0.0]);
        assert_eq!(wfm.date, vec![42, 0]);
    }

    #[test]
    fn missing_stamp_table_is_truncation() {
        let bytes = WfmBuilder::new()
            .records(2, true)
            .curve_len(0)
            .build();
        match decode(&bytes).unwrap_err() {
            WfmError::TruncatedFile { needed, available } => {
                assert_eq!(needed, 838 + 24);
                assert_eq!(available, 838);
            }
            other => panic!("Expected TruncatedFile, got {other:?}"),
        }
    }

    #[test]
    fn missing_curve_bytes_is_truncation() {
        let bytes = WfmBuilder::new()
            .curve_len(100)
            .trim(0, 100)
            .curve(vec![0u8; 10])
            .build();
        match decode(&bytes).unwrap_err() {
            WfmError::TruncatedFile { needed, available } => {
                assert_eq!(needed, 838 + 100);
                assert_eq!(available, 848);
            }
            other => panic!("Expected TruncatedFile, got {other:?}"),
        }
    }

    #[test]
    fn fully_trimmed_record_is_empty() {
        let bytes = WfmBuilder::new()
            .curve_len(4)
            .trim(4, 0)
            .curve((0..4).collect())
            .build();
        let wfm = decode(&bytes).unwrap();

        assert_eq!(wfm.samples_per_record(), 0);
        assert_eq!(wfm.record(0).unwrap(), &[] as &[f64]);
    }

    #[test]
    fn time_axis_is_linear_from_header() {
        let bytes = WfmBuilder::new()
            .timing(-1.0e-6, 1.0e-7)
            .curve_len(3)
            .trim(0, 3)
            .curve((0..3).collect())
            .build();
        let wfm = decode(&bytes).unwrap();

        let axis = wfm.time_axis();
        let expected = [-1.0e-6, -9.0e-7, -8.0e-7];
        assert_eq!(axis.len(), expected.len());
        for (got, exp) in axis.iter().zip(expected.iter()) {
            assert!((got - exp).abs() < 1e-18, "{got} != {exp}");
        }
    }
}
