// End-to-end decoding of Saleae CSV exports
use std::io::Write;
use std::path::Path;
use tcan_spi_decoder::{
    DecodedRecord, Decoder, DecoderConfig, DecoderError, RecordFilter, SpiEvent, TimingLimit,
};

const HEADER: &str = "name,type,start_time,duration,mosi,miso";

/// Build CSV rows for one chip-select session, bytes 1 us apart
fn session_rows(t0_us: u64, bytes: &[(u8, u8)]) -> Vec<String> {
    let secs = |us: u64| format!("{:.9}", us as f64 * 1e-6);
    let mut rows = vec![format!("SPI,enable,{},0,,", secs(t0_us))];
    for (i, (mosi, miso)) in bytes.iter().enumerate() {
        let start = t0_us + 1 + i as u64;
        rows.push(format!(
            "SPI,result,{},0.000000800,0x{:02X},0x{:02X}",
            secs(start),
            mosi,
            miso
        ));
    }
    rows.push(format!("SPI,disable,{},0,,", secs(t0_us + 2 + bytes.len() as u64)));
    rows
}

fn mosi(bytes: &[u8]) -> Vec<(u8, u8)> {
    bytes.iter().map(|&b| (b, 0x00)).collect()
}

fn write_capture(rows: &[String]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

fn decode_file(config: DecoderConfig, rows: &[String]) -> Vec<DecodedRecord> {
    let file = write_capture(rows);
    let mut decoder = Decoder::new(config);
    decoder
        .decode_file(file.path())
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn decodes_register_write() {
    let rows = session_rows(0, &mosi(&[0x61, 0x08, 0x04, 0x01, 0x11, 0x22, 0x33, 0x44]));
    let records = decode_file(DecoderConfig::new(), &rows);

    assert_eq!(records.len(), 1);
    match &records[0] {
        DecodedRecord::Write(access) => {
            assert_eq!(access.address_hex(), "0804");
            assert_eq!(access.name, "TIMESTAMP_PRESCALER");
            assert_eq!(access.data, "11223344");
            assert_eq!(access.id, None);
            // Payload starts with the fifth byte, 5 us after CS
            assert_eq!(access.start, 5_000);
            assert_eq!(access.end, 8_800);
        }
        other => panic!("expected write, got {:?}", other),
    }
}

#[test]
fn unlisted_register_is_unknown() {
    let rows = session_rows(0, &mosi(&[0x61, 0x08, 0x40, 0x01, 0x11, 0x22, 0x33, 0x44]));
    let records = decode_file(DecoderConfig::new(), &rows);

    let access = records[0].access().unwrap();
    assert_eq!(access.address_hex(), "0840");
    assert_eq!(access.name, "unknown");
    assert_eq!(access.data, "11223344");
}

#[test]
fn decodes_register_read_from_miso() {
    let bytes = [
        (0x41, 0x00),
        (0x10, 0x00),
        (0x00, 0x00),
        (0x01, 0x00),
        (0x00, 0x32),
        (0x00, 0x33),
        (0x00, 0x32),
        (0x00, 0x14),
    ];
    let records = decode_file(DecoderConfig::new(), &session_rows(100, &bytes));

    assert_eq!(records.len(), 1);
    match &records[0] {
        DecodedRecord::Read(access) => {
            assert_eq!(access.name, "MCAN_CREL");
            assert_eq!(access.data, "32333214");
            // Read starts at the opcode byte
            assert_eq!(access.start, 1_000);
        }
        other => panic!("expected read, got {:?}", other),
    }
}

#[test]
fn tx_buffer_write_carries_identifier() {
    let t0 = (0x7E8u32 << 18).to_be_bytes();
    let mut bytes = vec![0x61, 0x84, 0x10, 0x02];
    bytes.extend_from_slice(&t0);
    bytes.extend_from_slice(&[0x00, 0x08, 0x00, 0x00]);
    let records = decode_file(DecoderConfig::new(), &session_rows(0, &mosi(&bytes)));

    let access = records[0].access().unwrap();
    assert_eq!(access.address_hex(), "8410");
    assert_eq!(access.id, Some(0x7E8));
    assert_eq!(access.data.len(), 16);
}

#[test]
fn chip_select_mid_payload_discards_transaction() {
    let mut rows = session_rows(0, &mosi(&[0x61, 0x10, 0x18, 0x02, 0x01, 0x02, 0x03]));
    // Drop the disable row so the next enable interrupts the transaction
    rows.pop();
    rows.extend(session_rows(50, &mosi(&[0x41, 0x10, 0x18, 0x00])));
    let records = decode_file(DecoderConfig::new(), &rows);

    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], DecodedRecord::Read(_)));
}

#[test]
fn invalid_opcode_then_transaction() {
    let rows = session_rows(0, &mosi(&[0xFF, 0x41, 0x00, 0x0C, 0x00]));
    let records = decode_file(DecoderConfig::new(), &rows);

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0],
        DecodedRecord::CommandError {
            byte: 0xFF,
            start: 1_000,
            end: 1_800
        }
    );
    assert_eq!(records[1].access().unwrap().name, "STATUS");
}

#[test]
fn write_filter_hides_reads() {
    let mut rows = session_rows(0, &mosi(&[0x41, 0x08, 0x00, 0x00]));
    rows.extend(session_rows(20, &mosi(&[0x61, 0x08, 0x00, 0x00])));
    let records = decode_file(DecoderConfig::new().with_filter(RecordFilter::Write), &rows);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].access().unwrap().name, "MODES_AND_PINS");
    assert!(matches!(records[0], DecodedRecord::Write(_)));
}

#[test]
fn reports_timing_violations() {
    let config = DecoderConfig::new()
        .with_filter(RecordFilter::TimingViolations)
        .with_cs_to_first_byte(2_000)
        .with_byte_to_byte(150)
        .with_last_byte_to_cs(500);
    let records = decode_file(config, &session_rows(0, &mosi(&[0x41, 0x00, 0x00, 0x00])));

    // Byte gaps are 200 ns, last byte to CS is 1200 ns
    let limits: Vec<TimingLimit> = records
        .iter()
        .map(|r| match r {
            DecodedRecord::TimingViolation(v) => v.limit,
            other => panic!("expected timing violation, got {:?}", other),
        })
        .collect();
    assert_eq!(
        limits,
        vec![
            TimingLimit::ByteToByte,
            TimingLimit::ByteToByte,
            TimingLimit::ByteToByte,
            TimingLimit::LastByteToCs,
        ]
    );
}

#[test]
fn decode_events_matches_file_decoding() {
    let bytes = [0x61, 0x10, 0x54, 0x01, 0xDE, 0xAD, 0xBE, 0xEF];
    let from_file = decode_file(DecoderConfig::new(), &session_rows(0, &mosi(&bytes)));

    let mut events = vec![Ok(SpiEvent::SessionStart { timestamp: 0 })];
    for (i, &b) in bytes.iter().enumerate() {
        let start = 1_000 + i as u64 * 1_000;
        events.push(Ok(SpiEvent::transfer(start, start + 800, b, 0x00)));
    }
    let mut decoder = Decoder::default();
    let from_events: Vec<DecodedRecord> = decoder
        .decode_events(events)
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(from_file, from_events);
}

#[test]
fn missing_capture_is_an_error() {
    let mut decoder = Decoder::default();
    let result = decoder.decode_file(Path::new("/nonexistent/capture.csv"));
    assert!(matches!(result, Err(DecoderError::CaptureParse(_))));
}
