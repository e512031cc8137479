//! Integration tests for tabrw library usage.
//!
//! These tests verify that the library can be used as a dependency
//! from external projects.

use tabrw::{GpVersion, QUARTER_TIME, Song, TabError, parse, write, write_file};

/// Test that all major types are accessible from the library.
#[test]
fn test_types_accessible() {
    // This test verifies that the public API types compile and are usable.
    // If any re-export is missing, this test will fail to compile.

    fn _assert_types() {
        let _: fn(&[u8]) -> Result<Song, TabError> = parse;
        let _: fn(&Song, GpVersion) -> Result<Vec<u8>, TabError> = write;
        let _: i64 = QUARTER_TIME;
    }
}

/// Test error handling for invalid data.
#[test]
fn test_parse_error() {
    let invalid_data = vec![0u8; 10]; // Not a valid GP file
    let result = parse(&invalid_data);

    assert!(result.is_err(), "Should return error for invalid data");
    let err = result.unwrap_err();
    assert!(
        matches!(err, TabError::UnrecognizedFormat(_)),
        "Should be an UnrecognizedFormat error"
    );
}

/// A truncated but correctly signed file fails with the input
/// position instead of producing a partial song.
#[test]
fn test_truncated_input() {
    let mut data = vec![0u8; 40];
    let signature = b"FICHIER GUITAR PRO v3.00";
    data[0] = signature.len() as u8;
    data[1..=signature.len()].copy_from_slice(signature);

    let result = parse(&data);
    assert!(
        matches!(
            result,
            Err(TabError::TruncatedInput { .. }) | Err(TabError::MalformedRecord { .. })
        ),
        "truncated file must not parse: {result:?}"
    );
}

/// A failed write must not create the output file at all.
#[test]
fn test_failed_write_leaves_no_file() {
    let mut song = Song::default();
    song.measure_headers
        .push(tabrw::MeasureHeader::default());
    // track intentionally left without measures to violate the invariant
    song.tracks.push(tabrw::Track::default());

    let path = std::env::temp_dir().join("tabrw-failed-write.gp5");
    let _ = std::fs::remove_file(&path);
    let result = write_file(&song, &path, GpVersion::GP5_10);
    assert!(result.is_err());
    assert!(!path.exists(), "failed write must not leave a file behind");
}
