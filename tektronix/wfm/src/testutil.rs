//! Builder for synthetic waveform files, shared by the unit tests.

/// Builds a waveform file byte-by-byte: a valid single-record int8 header by
/// default, customized per test.
///
/// `build` assembles header, FastFrame stamp table, and curve bytes, and
/// points the header's curve offset right behind the stamp table. Trim
/// offsets are never set implicitly; tests that carry curve data call
/// [`WfmBuilder::trim`] themselves.
pub(crate) struct WfmBuilder {
    header: Vec<u8>,
    stamps: Vec<u8>,
    curve: Vec<u8>,
}

impl WfmBuilder {
    pub(crate) fn new() -> Self {
        let mut header = vec![0u8; 838];
        header[0..2].copy_from_slice(&0x0f0fu16.to_le_bytes());
        header[2..10].copy_from_slice(b":WFM#003");
        header[114..118].copy_from_slice(&1u32.to_le_bytes()); // implicit dims
        header[118..122].copy_from_slice(&1u32.to_le_bytes()); // explicit dims
        header[122..126].copy_from_slice(&2u32.to_le_bytes()); // vector record
        let builder = WfmBuilder {
            header,
            stamps: Vec::new(),
            curve: Vec::new(),
        };
        builder.format(7, 1).scaling(1.0, 0.0)
    }

    pub(crate) fn put_u16(mut self, offset: usize, value: u16) -> Self {
        self.header[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn put_u32(mut self, offset: usize, value: u32) -> Self {
        self.header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn put_i32(mut self, offset: usize, value: i32) -> Self {
        self.header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn put_f64(mut self, offset: usize, value: f64) -> Self {
        self.header[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn version(mut self, tag: &[u8; 8]) -> Self {
        self.header[2..10].copy_from_slice(tag);
        self
    }

    pub(crate) fn format(mut self, code: i32, bytes_per_sample: i8) -> Self {
        self.header[15] = bytes_per_sample as u8;
        self.put_i32(240, code)
    }

    pub(crate) fn scaling(self, volt_scale: f64, volt_offset: f64) -> Self {
        self.put_f64(168, volt_scale).put_f64(176, volt_offset)
    }

    pub(crate) fn timing(self, time_start: f64, time_scale: f64) -> Self {
        self.put_f64(496, time_start).put_f64(488, time_scale)
    }

    pub(crate) fn records(self, count: u32, fastframe: bool) -> Self {
        self.put_u32(72, count - 1)
            .put_u32(78, fastframe.into())
    }

    pub(crate) fn header_stamp(self, trigger_frac: f64, date_frac: f64, date: i32) -> Self {
        self.put_f64(788, trigger_frac)
            .put_f64(796, date_frac)
            .put_i32(804, date)
    }

    /// Append one 24 byte FastFrame timestamp record behind the header.
    pub(crate) fn stamp(mut self, trigger_frac: f64, date_frac: f64, date: i32) -> Self {
        self.stamps.extend_from_slice(&0u32.to_le_bytes());
        self.stamps.extend_from_slice(&trigger_frac.to_le_bytes());
        self.stamps.extend_from_slice(&date_frac.to_le_bytes());
        self.stamps.extend_from_slice(&date.to_le_bytes());
        self
    }

    pub(crate) fn trim(self, pre_bytes: u32, post_offset: u32) -> Self {
        self.put_u32(822, pre_bytes).put_u32(826, post_offset)
    }

    /// Set the per-record curve byte length announced by the header.
    pub(crate) fn curve_len(self, bytes_per_record: u32) -> Self {
        self.put_u32(830, bytes_per_record)
    }

    /// Append raw curve bytes (all records, record-contiguous).
    pub(crate) fn curve(mut self, data: Vec<u8>) -> Self {
        self.curve = data;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let curve_offset = (838 + self.stamps.len()) as i32;
        let built = self.put_i32(16, curve_offset);
        let mut out = built.header;
        out.extend_from_slice(&built.stamps);
        out.extend_from_slice(&built.curve);
        out
    }
}
