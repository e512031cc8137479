//! tabrw - Guitar Pro 3/4/5 tablature reader and writer
//!
//! This library provides:
//! - Parsing of Guitar Pro 3/4/5 (.gp3, .gp4, .gp5) files into a typed song model
//! - Writing the song model back into any of the supported dialects
//! - Fixed-point duration and timeline arithmetic over the model
//!
//! # Example
//!
//! ```no_run
//! use tabrw::{parse_file, write_file, GpVersion};
//!
//! let song = parse_file("song.gp5").unwrap();
//! println!("{} tracks, {} measures", song.tracks.len(), song.measure_headers.len());
//! write_file(&song, "song.gp4", GpVersion::GP4_06).unwrap();
//! ```

use std::fs;
use std::path::Path;

use nom::error::ErrorKind;

pub mod error;
pub mod model;
pub mod parser;
pub mod writer;

// Re-export main types for convenience
pub use error::TabError;
pub use model::duration::{Duration, QUARTER_TIME, Tuplet};
pub use model::song::{
    Beat, BeatEffects, Chord, GpVersion, Measure, MeasureHeader, MidiChannel, Note, NoteEffect,
    Song, Track, Voice,
};

use model::song::MAX_VOICES;
use parser::gp3_parser::Gp3Parser;
use parser::gp4_parser::Gp4Parser;
use parser::gp5_parser::Gp5Parser;
use parser::primitive_parser::parse_byte_size_string;
use writer::{gp3_writer, gp4_writer, gp5_writer};

/// Map the 30-byte version field to a dialect, distinguishing files
/// that are not tablature at all from revisions this crate does not
/// read.
fn detect_version(data: &[u8]) -> Result<GpVersion, TabError> {
    let (_, signature) = parse_byte_size_string(30)(data).map_err(|_| {
        TabError::UnrecognizedFormat("input shorter than the version field".to_string())
    })?;
    match signature.as_str() {
        "FICHIER GUITAR PRO v3.00" => Ok(GpVersion::GP3),
        "FICHIER GUITAR PRO v4.00" => Ok(GpVersion::GP4),
        "FICHIER GUITAR PRO v4.06" | "FICHIER GUITAR PRO L4.06" => Ok(GpVersion::GP4_06),
        "FICHIER GUITAR PRO v5.00" => Ok(GpVersion::GP5),
        "FICHIER GUITAR PRO v5.10" => Ok(GpVersion::GP5_10),
        other if other.starts_with("FICHIER GUITAR PRO") || other.starts_with("CLIPBOARD") => {
            Err(TabError::UnsupportedVersion(other.to_string()))
        }
        other => Err(TabError::UnrecognizedFormat(other.to_string())),
    }
}

/// Translate a parser failure into the library error, carrying the
/// byte offset where the grammar stopped.
fn map_parse_error(data: &[u8], err: nom::Err<nom::error::Error<&[u8]>>) -> TabError {
    match err {
        nom::Err::Incomplete(_) => TabError::TruncatedInput { offset: data.len() },
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = data.len() - e.input.len();
            if e.code == ErrorKind::Eof {
                TabError::TruncatedInput { offset }
            } else {
                TabError::MalformedRecord {
                    offset,
                    reason: format!("{:?}", e.code),
                }
            }
        }
    }
}

/// Parse a complete tablature byte image into a [`Song`].
pub fn parse(data: &[u8]) -> Result<Song, TabError> {
    let version = detect_version(data)?;
    log::debug!("Parsing {version:?} data ({} bytes)", data.len());
    let rest = &data[31..];
    let song = Song {
        version,
        ..Song::default()
    };
    match version {
        GpVersion::GP3 => {
            let mut parser = Gp3Parser::new(song);
            parser
                .parse_song_data(rest)
                .map_err(|err| map_parse_error(data, err))?;
            Ok(parser.take_song())
        }
        GpVersion::GP4 | GpVersion::GP4_06 => {
            let mut parser = Gp4Parser::new(song);
            parser
                .parse_song_data(rest)
                .map_err(|err| map_parse_error(data, err))?;
            Ok(parser.take_song())
        }
        GpVersion::GP5 | GpVersion::GP5_10 => {
            let mut parser = Gp5Parser::new(song);
            parser
                .parse_song_data(rest)
                .map_err(|err| map_parse_error(data, err))?;
            Ok(parser.take_song())
        }
    }
}

/// The structural invariants serialization relies on. Appending a
/// measure header without backfilling every track is caller
/// responsibility; it is caught here rather than silently fixed up.
fn validate(song: &Song) -> Result<(), TabError> {
    for track in &song.tracks {
        if track.measures.len() != song.measure_headers.len() {
            return Err(TabError::MalformedRecord {
                offset: 0,
                reason: format!(
                    "track {} holds {} measures for {} measure headers",
                    track.number,
                    track.measures.len(),
                    song.measure_headers.len()
                ),
            });
        }
        let string_count = track.strings.len().min(7) as i8;
        for measure in &track.measures {
            if measure.voices.len() != MAX_VOICES {
                return Err(TabError::MalformedRecord {
                    offset: 0,
                    reason: format!(
                        "track {} holds a measure with {} voices",
                        track.number,
                        measure.voices.len()
                    ),
                });
            }
            for voice in &measure.voices {
                for beat in &voice.beats {
                    let mut seen = 0u8;
                    for note in &beat.notes {
                        if note.string < 1 || note.string > string_count {
                            return Err(TabError::MalformedRecord {
                                offset: 0,
                                reason: format!(
                                    "note on string {} of a {string_count}-string track",
                                    note.string
                                ),
                            });
                        }
                        let bit = 1u8 << (note.string - 1);
                        if seen & bit != 0 {
                            return Err(TabError::MalformedRecord {
                                offset: 0,
                                reason: format!("two notes on string {} in one beat", note.string),
                            });
                        }
                        seen |= bit;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Serialize `song` into a complete byte image of the requested
/// dialect. The caller names the target version explicitly; the
/// version the song was parsed from does not constrain it.
pub fn write(song: &Song, version: GpVersion) -> Result<Vec<u8>, TabError> {
    validate(song)?;
    log::debug!("Writing {version:?} data");
    match version {
        GpVersion::GP3 => gp3_writer::write_song(song),
        GpVersion::GP4 | GpVersion::GP4_06 => gp4_writer::write_song(song, version),
        GpVersion::GP5 | GpVersion::GP5_10 => gp5_writer::write_song(song, version),
    }
}

/// Read and parse a tablature file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Song, TabError> {
    let data = fs::read(path)?;
    parse(&data)
}

/// Serialize `song` and commit it to `path` in one call, so a failed
/// write never leaves a truncated file behind.
pub fn write_file(song: &Song, path: impl AsRef<Path>, version: GpVersion) -> Result<(), TabError> {
    let buffer = write(song, version)?;
    fs::write(path, buffer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::song::MeasureHeader;

    #[test]
    fn version_ordering_drives_grammar_gates() {
        assert!(GpVersion::GP3 < GpVersion::GP4);
        assert!(GpVersion::GP4 < GpVersion::GP4_06);
        assert!(GpVersion::GP4_06 < GpVersion::GP5);
        assert!(GpVersion::GP5 < GpVersion::GP5_10);
    }

    #[test]
    fn unknown_signature_is_unrecognized() {
        let mut data = vec![0u8; 64];
        data[0] = 4;
        data[1..5].copy_from_slice(b"RIFF");
        let err = parse(&data).unwrap_err();
        assert!(matches!(err, TabError::UnrecognizedFormat(_)));
    }

    #[test]
    fn known_signature_with_unknown_revision_is_unsupported() {
        let mut data = vec![0u8; 64];
        let signature = b"FICHIER GUITAR PRO v6.00";
        data[0] = signature.len() as u8;
        data[1..=signature.len()].copy_from_slice(signature);
        let err = parse(&data).unwrap_err();
        assert!(matches!(err, TabError::UnsupportedVersion(_)));
    }

    #[test]
    fn short_input_is_unrecognized() {
        let err = parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, TabError::UnrecognizedFormat(_)));
    }

    #[test]
    fn write_rejects_header_measure_count_mismatch() {
        let mut song = Song::default();
        song.measure_headers.push(MeasureHeader::default());
        song.measure_headers.push(MeasureHeader::default());
        let mut track = Track::new_for_song(&song, 1);
        track.measures.pop();
        song.tracks.push(track);
        let err = write(&song, GpVersion::GP5_10).unwrap_err();
        assert!(matches!(err, TabError::MalformedRecord { .. }));
    }

    #[test]
    fn write_rejects_duplicate_strings_in_a_beat() {
        let mut song = Song::default();
        song.measure_headers.push(MeasureHeader::default());
        let mut track = Track::new_for_song(&song, 1);
        let beat = Beat {
            notes: vec![Note::default(), Note::default()],
            ..Beat::default()
        };
        track.measures[0].voices[0].beats.push(beat);
        song.tracks.push(track);
        let err = write(&song, GpVersion::GP5_10).unwrap_err();
        assert!(matches!(err, TabError::MalformedRecord { .. }));
    }
}
