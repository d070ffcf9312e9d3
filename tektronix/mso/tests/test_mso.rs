//! Tests for the Tektronix MSO driver against the loopback doubles.

use rstest::*;

use sockinstr::{InstrumentError, LoopbackInterfaceBytes, LoopbackInterfaceString};

use tektronix_mso::{CurveEncoding, TekMso};

// Type aliases for the two loopback flavors.
type MsoStr = TekMso<LoopbackInterfaceString>;
type MsoBytes = TekMso<LoopbackInterfaceBytes>;

/// Prepare a driver over the string loopback with the given exchange.
fn crt_inst(host2inst: Vec<&str>, inst2host: Vec<&str>) -> MsoStr {
    let h2i = host2inst.iter().map(|s| s.to_string()).collect();
    let i2h = inst2host.iter().map(|s| s.to_string()).collect();
    let interface = LoopbackInterfaceString::new(h2i, i2h, "\n");
    TekMso::try_new(interface).unwrap()
}

/// Prepare a driver over the bytes loopback; terminators are scripted
/// explicitly here.
fn crt_inst_bytes(host2inst: Vec<Vec<u8>>, inst2host: Vec<Vec<u8>>) -> MsoBytes {
    let interface = LoopbackInterfaceBytes::new(host2inst, inst2host);
    TekMso::try_new(interface).unwrap()
}

/// Frame a payload the way the instrument does: `#<D><digits><payload>\n`.
fn frame(payload: &[u8]) -> Vec<u8> {
    let digits = payload.len().to_string();
    let mut out = format!("#{}{}", digits.len(), digits).into_bytes();
    out.extend_from_slice(payload);
    out.push(b'\n');
    out
}

#[fixture]
fn emp_inst() -> MsoStr {
    crt_inst(vec![], vec![])
}

/// This test initializes the instrument with empty vectors, which should always pass.
#[rstest]
fn test_initialization(_emp_inst: MsoStr) {}

#[rstest]
fn test_identify() {
    let mut inst = crt_inst(
        vec!["*idn?"],
        vec!["TEKTRONIX,MSO68B,C000001,CF:91.1CT FV:1.44.3"],
    );
    assert_eq!(
        inst.identify().unwrap(),
        "TEKTRONIX,MSO68B,C000001,CF:91.1CT FV:1.44.3"
    );
}

#[rstest]
fn test_clear_status() {
    let mut inst = crt_inst(vec!["*cls"], vec![]);
    inst.clear_status().unwrap();
}

#[rstest]
fn test_wait_for_completion() {
    let mut inst = crt_inst(vec!["*opc?"], vec!["1"]);
    inst.wait_for_completion().unwrap();
}

#[rstest]
fn test_wait_for_completion_unexpected_response() {
    let mut inst = crt_inst(vec!["*opc?"], vec!["0"]);
    match inst.wait_for_completion() {
        Err(InstrumentError::ResponseParseError(resp)) => assert_eq!(resp, "0"),
        other => panic!("Expected ResponseParseError, got {other:?}"),
    }
}

#[rstest]
fn test_event_status() {
    let mut inst = crt_inst(vec!["*esr?"], vec!["32"]);
    assert_eq!(inst.event_status().unwrap(), 32);
}

#[rstest]
fn test_set_channel_display() {
    let mut inst = crt_inst(
        vec![
            "disp:glob:ch1:state ON",
            "disp:glob:ch3:state ON",
            "*opc?",
        ],
        vec!["1"],
    );
    inst.set_channel_display(&[1, 3], true).unwrap();
}

#[rstest]
#[case(0)]
#[case(9)]
fn test_channel_out_of_range(mut emp_inst: MsoStr, #[case] channel: usize) {
    match emp_inst.select_source(channel) {
        Err(InstrumentError::ChannelIndexOutOfRange { idx, nof_channels }) => {
            assert_eq!(idx, channel);
            assert_eq!(nof_channels, 8);
        }
        other => panic!("Expected ChannelIndexOutOfRange, got {other:?}"),
    }
}

#[rstest]
fn test_configure_transfer() {
    let mut inst = crt_inst(
        vec![
            "data:encdg SRIBINARY",
            "data:start 1",
            "data:stop 1000",
            "wfmoutpre:byt_n 2",
            "*opc?",
        ],
        vec!["1"],
    );
    inst.configure_transfer(1, 1000, CurveEncoding::Int16)
        .unwrap();
}

#[rstest]
fn test_record_length() {
    let mut inst = crt_inst(vec!["horizontal:recordlength?"], vec!["12500000"]);
    assert_eq!(inst.record_length().unwrap(), 12_500_000);
}

#[rstest]
fn test_read_curve() {
    let payload: Vec<u8> = (0..200u32).map(|i| (i % 256) as u8).collect();
    let mut inst = crt_inst_bytes(vec![b"curve?\n".to_vec()], vec![frame(&payload)]);
    assert_eq!(inst.read_curve().unwrap(), payload);
}

#[rstest]
fn test_vertical_scaling() {
    let mut inst = crt_inst(
        vec![
            "wfmoutpre:ymult?",
            "wfmoutpre:yzero?",
            "wfmoutpre:yoff?",
        ],
        vec!["0.004", "0.0", "-50.0"],
    );
    let vs = inst.vertical_scaling().unwrap();
    assert_eq!(vs.volts_per_level, 0.004);
    assert_eq!(vs.offset_volts, 0.0);
    assert_eq!(vs.position_levels, -50.0);
    assert_eq!(vs.scale(-50.0), 0.0);
}

#[rstest]
fn test_horizontal_scaling() {
    let mut inst = crt_inst(
        vec![
            "wfmoutpre:pt_off?",
            "wfmoutpre:xincr?",
            "wfmoutpre:xzero?",
        ],
        vec!["500", "1e-9", "0.0"],
    );
    let hs = inst.horizontal_scaling().unwrap();
    assert_eq!(hs.start_time(), -5.0e-7);
}

#[rstest]
fn test_curve_encoding_query() {
    let mut inst = crt_inst(vec!["wfmoutpre:byt_n?"], vec!["2"]);
    assert_eq!(inst.curve_encoding().unwrap(), CurveEncoding::Int16);
}

#[rstest]
fn test_directory_listing() {
    let mut inst = crt_inst(
        vec!["filesystem:ldir?"],
        vec!["\"temp.png\",FILE,12345,2024-05-01,12:00;\"setup.set\",FILE,678,2024-05-02,08:30"],
    );
    let listing = inst.directory_listing().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].name, "temp.png");
    assert_eq!(listing[0].size_bytes().unwrap(), 12345);
}

#[rstest]
fn test_file_size_found() {
    let mut inst = crt_inst(
        vec!["filesystem:ldir?"],
        vec!["\"temp.png\",FILE,12345,2024-05-01,12:00"],
    );
    assert_eq!(inst.file_size("temp.png").unwrap(), 12345);
}

#[rstest]
fn test_file_size_not_found() {
    let mut inst = crt_inst(
        vec!["filesystem:ldir?", "filesystem:cwd?"],
        vec![
            "\"other.png\",FILE,12345,2024-05-01,12:00",
            "C:/Users/Tek/screenshots",
        ],
    );
    match inst.file_size("temp.png") {
        Err(InstrumentError::FileNotFound { file, directory }) => {
            assert_eq!(file, "temp.png");
            assert_eq!(directory, "C:/Users/Tek/screenshots");
        }
        other => panic!("Expected FileNotFound, got {other:?}"),
    }
}

/// The complete screen fetch sequence, byte-accurate including every `*opc?`
/// synchronization and the trailing linefeed of the file transfer.
#[rstest]
fn test_fetch_screen() {
    let image = b"\x89PNG fake image data".to_vec();
    let mut transfer = image.clone();
    transfer.push(b'\n');

    let listing = format!("\"temp.png\",FILE,{},2024-05-01,12:00\n", image.len());

    let mut inst = crt_inst_bytes(
        vec![
            b"save:image \"temp.png\"\n".to_vec(),
            b"*opc?\n".to_vec(),
            b"filesystem:ldir?\n".to_vec(),
            b"filesystem:readfile \"temp.png\"\n".to_vec(),
            b"!r\n".to_vec(),
            b"filesystem:delete \"temp.png\"\n".to_vec(),
            b"*opc?\n".to_vec(),
        ],
        vec![
            b"1\n".to_vec(),
            listing.into_bytes(),
            transfer,
            b"1\n".to_vec(),
        ],
    );

    assert_eq!(inst.fetch_screen("temp.png").unwrap(), image);
}

/// A transfer that does not end in a linefeed fails and the temporary file
/// is left alone (no delete is attempted).
#[rstest]
fn test_fetch_screen_missing_linefeed() {
    let image = b"\x89PNG fake image data".to_vec();
    let mut transfer = image.clone();
    transfer.push(b'X');

    let listing = format!("\"temp.png\",FILE,{},2024-05-01,12:00\n", image.len());

    let mut inst = crt_inst_bytes(
        vec![
            b"save:image \"temp.png\"\n".to_vec(),
            b"*opc?\n".to_vec(),
            b"filesystem:ldir?\n".to_vec(),
            b"filesystem:readfile \"temp.png\"\n".to_vec(),
            b"!r\n".to_vec(),
        ],
        vec![b"1\n".to_vec(), listing.into_bytes(), transfer],
    );

    match inst.fetch_screen("temp.png") {
        Err(InstrumentError::BlockTerminator { found: b'X' }) => (),
        other => panic!("Expected BlockTerminator, got {other:?}"),
    }
}
