mod common;

use std::io::Write;

use ortho_core::error::OrthoError;
use ortho_core::frame::Frame;
use ortho_core::io::flight_log::{load_flight_logs, read_flight_log};
use ortho_core::io::image_io::{load_frame, save_frame};
use ortho_core::io::ser::SerReader;
use ortho_core::io::video::{open_video, VideoDecoder};

use common::{build_ser_header_full, build_ser_with_timestamps, textured_scene, write_flight_log};

#[test]
fn test_flight_logs_merge_and_sort_stably() {
    let dir = tempfile::tempdir().unwrap();
    write_flight_log(
        &dir.path().join("a.csv"),
        &[(2000.0, 1.0, 1.0), (0.0, 2.0, 2.0), (1000.0, 3.0, 3.0)],
    );
    write_flight_log(
        &dir.path().join("b.CSV"),
        &[(1000.0, 4.0, 4.0), (500.0, 5.0, 5.0)],
    );
    std::fs::write(dir.path().join("ignored.txt"), "timestamp_ms\n").unwrap();

    let log = load_flight_logs(dir.path()).unwrap();
    let order: Vec<(f64, f64)> = log.iter().map(|p| (p.timestamp_ms, p.latitude)).collect();
    assert_eq!(
        order,
        vec![
            (0.0, 2.0),
            (500.0, 5.0),
            (1000.0, 3.0),
            (1000.0, 4.0),
            (2000.0, 1.0)
        ]
    );
}

#[test]
fn test_missing_log_dir_yields_no_records() {
    let dir = tempfile::tempdir().unwrap();
    let log = load_flight_logs(&dir.path().join("nope")).unwrap();
    assert!(log.is_empty());
}

#[test]
fn test_malformed_row_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "timestamp_ms,latitude,longitude,altitude").unwrap();
    writeln!(f, "0,10.0,20.0,100").unwrap();
    writeln!(f, "1000,north,20.0,").unwrap();
    drop(f);

    match read_flight_log(&path) {
        Err(OrthoError::FlightLog { line, message, .. }) => {
            assert_eq!(line, 3);
            assert!(message.contains("latitude"));
        }
        other => panic!("expected FlightLog error, got {other:?}"),
    }
}

#[test]
fn test_altitude_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alt.csv");
    std::fs::write(
        &path,
        "\u{feff}TimeStamp_MS,Latitude,Longitude,Altitude\n\n0,1.5,2.5,120.0\n10,1.6,2.6,\n",
    )
    .unwrap();

    let log = read_flight_log(&path).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].altitude, Some(120.0));
    assert_eq!(log[1].altitude, None);
}

#[test]
fn test_ser_trailer_timestamps() {
    let planes: Vec<_> = (0..3).map(|i| textured_scene(8, 12, i)).collect();
    let data = build_ser_with_timestamps(12, 8, &planes, &[0, 40, 1000]);
    let mut f = tempfile::Builder::new().suffix(".ser").tempfile().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    let reader = SerReader::open(f.path()).unwrap();
    assert_eq!(reader.frame_count(), 3);
    assert_eq!(reader.timestamp_ms(1), 40.0);
    assert_eq!(reader.timestamp_ms(2), 1000.0);

    let mut decoder = open_video(f.path()).unwrap();
    let mut count = 0;
    while let Some(frame) = decoder.next_frame().unwrap() {
        assert_eq!((frame.width(), frame.height()), (12, 8));
        assert_eq!(frame.metadata.source, f.path());
        count += 1;
    }
    assert_eq!(count, 3);
}

#[test]
fn test_ser_without_trailer_uses_frame_index() {
    let mut data = build_ser_header_full(4, 4, 8, 2, 0);
    data.extend_from_slice(&[128u8; 32]);
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    let reader = SerReader::open(f.path()).unwrap();
    let expected = 1000.0 / 30.0;
    assert!((reader.timestamp_ms(1) - expected).abs() < 1e-9);
}

#[test]
fn test_rgb_ser_is_three_planes() {
    let mut data = build_ser_header_full(2, 1, 8, 1, 101);
    // BGR samples for two pixels.
    data.extend_from_slice(&[10, 20, 30, 40, 50, 60]);
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    let frame = SerReader::open(f.path()).unwrap().read_frame(0).unwrap();
    assert_eq!(frame.channels(), 3);
    assert!((frame.planes[0][[0, 0]] - 30.0 / 255.0).abs() < 1e-6);
    assert!((frame.planes[2][[0, 1]] - 40.0 / 255.0).abs() < 1e-6);
}

#[test]
fn test_truncated_ser_is_rejected() {
    let mut data = build_ser_header_full(16, 16, 8, 4, 0);
    data.extend_from_slice(&[0u8; 100]);
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    assert!(matches!(SerReader::open(f.path()), Err(OrthoError::InvalidSer(_))));
}

#[test]
fn test_oversized_ser_header_is_rejected() {
    let mut data = build_ser_header_full(0x7fff_ffff, 0x7fff_ffff, 16, 1, 100);
    data.extend_from_slice(&[0u8; 64]);
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    assert!(matches!(SerReader::open(f.path()), Err(OrthoError::InvalidSer(_))));

    // Fits in memory arithmetic but not in the file.
    let mut data = build_ser_header_full(0x7fff_ffff, 4, 8, 0x7fff_ffff, 0);
    data.extend_from_slice(&[0u8; 64]);
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    assert!(matches!(SerReader::open(f.path()), Err(OrthoError::InvalidSer(_))));
}

#[test]
fn test_png_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    let plane = textured_scene(10, 14, 6);
    save_frame(&Frame::mono(plane.clone(), 8), &path).unwrap();

    let loaded = load_frame(&path).unwrap();
    assert_eq!(loaded.channels(), 1);
    assert_eq!(loaded.original_bit_depth, 8);
    assert_eq!(loaded.metadata.source, path);
    for (a, b) in loaded.planes[0].iter().zip(plane.iter()) {
        assert!((a - b).abs() <= 0.5 / 255.0 + 1e-6);
    }
}

#[test]
fn test_unsupported_video_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.webm");
    std::fs::write(&path, b"").unwrap();
    assert!(matches!(open_video(&path), Err(OrthoError::Video(_))));
}
