//! Reader for the version 4 dialect.
//!
//! Version 4 keeps the version 3 structure and grows the effect
//! records: beat and note effects gain a second flag byte, the tremolo
//! bar becomes a full point curve, and the chord diagram moves to a
//! byte-packed layout. The leaf parsers here are version-gated because
//! version 5 reuses them with slightly different record shapes.

use nom::multi::count;
use nom::{IResult, Parser};

use crate::model::duration::{Duration, EIGHTH, QUARTER_TIME, SIXTEENTH};
use crate::model::song::{
    Barre, Beat, BeatEffects, BeatStatus, BeatStrokeDirection, Chord, Fingering, GpVersion,
    GraceEffect, GraceEffectTransition, HarmonicEffect, HarmonicType, LyricLine, Lyrics, Measure,
    Note, NoteType, Octave, PitchClass, SlapEffect, SlideType, Song, TremoloPickingEffect,
    TrillEffect, TripletFeel, unpack_velocity,
};
use crate::parser::gp3_parser;
use crate::parser::primitive_parser::{
    parse_bool, parse_i8, parse_int, parse_int_byte_sized_string, parse_int_sized_string,
    parse_padded_byte_size_string, parse_u8, skip,
};

/// The lyrics block: a bound track number and five lines, each with a
/// starting measure and an int-prefixed text.
pub fn parse_lyrics(i: &[u8]) -> IResult<&[u8], Lyrics> {
    let (mut i, track_choice) = parse_int(i)?;
    log::debug!("Parsing lyrics bound to track {track_choice}");
    let mut lines = Vec::with_capacity(5);
    for _ in 0..5 {
        let (inner, starting_measure) = parse_int(i)?;
        let (inner, text) = parse_int_sized_string(inner)?;
        i = inner;
        lines.push(LyricLine {
            starting_measure,
            text,
        });
    }
    Ok((
        i,
        Lyrics {
            track_choice,
            lines,
        },
    ))
}

/// Beat effects in the two-flag-byte layout of versions 4 and 5. The
/// stroke speed bytes swapped their direction meaning in version 5.
pub fn parse_beat_effects<'a>(
    effect: &'a mut BeatEffects,
    version: GpVersion,
) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
    move |i| {
        let (i, flags1) = parse_u8(i)?;
        let (mut i, flags2) = parse_u8(i)?;
        effect.vibrato = flags1 & 0x02 != 0 || effect.vibrato;
        effect.fade_in = flags1 & 0x10 != 0;
        if flags1 & 0x20 != 0 {
            let (inner, slap) = parse_u8(i)?;
            i = inner;
            effect.slap_effect = SlapEffect::from_byte(slap);
        }
        if flags2 & 0x04 != 0 {
            let (inner, bar) = gp3_parser::parse_bend(i)?;
            i = inner;
            effect.tremolo_bar = bar;
        }
        if flags1 & 0x40 != 0 {
            let (inner, stroke) = gp3_parser::parse_beat_stroke(i)?;
            i = inner;
            effect.stroke = if version >= GpVersion::GP5 {
                stroke.swap_direction()
            } else {
                stroke
            };
        }
        effect.has_rasgueado = flags2 & 0x01 != 0;
        if flags2 & 0x02 != 0 {
            let (inner, direction) = parse_u8(i)?;
            i = inner;
            effect.pick_stroke = BeatStrokeDirection::from_byte(direction);
        }
        Ok((i, ()))
    }
}

/// A grace note. Version 5 reordered the fields and moved the dead
/// flag out of the fret value.
pub fn parse_grace(version: GpVersion) -> impl FnMut(&[u8]) -> IResult<&[u8], GraceEffect> {
    move |i| {
        if version < GpVersion::GP5 {
            return gp3_parser::parse_grace(i);
        }
        let (i, fret) = parse_i8(i)?;
        let (i, dynamic) = parse_u8(i)?;
        let (i, transition) = parse_i8(i)?;
        let (i, duration_byte) = parse_u8(i)?;
        let (i, flags) = parse_u8(i)?;
        Ok((
            i,
            GraceEffect {
                fret,
                velocity: unpack_velocity(dynamic as i8),
                duration: 1u16 << 7u32.saturating_sub(u32::from(duration_byte)),
                is_dead: flags & 0x01 != 0,
                is_on_beat: flags & 0x02 != 0,
                transition: GraceEffectTransition::from_i8(transition),
            },
        ))
    }
}

/// Slides: one signed value before version 5, a bitmask from there on.
pub fn parse_slides(version: GpVersion) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<SlideType>> {
    move |i| {
        let (i, raw) = parse_i8(i)?;
        let slides = if version >= GpVersion::GP5 {
            let mut slides = Vec::new();
            if raw & 0x01 != 0 {
                slides.push(SlideType::ShiftSlideTo);
            }
            if raw & 0x02 != 0 {
                slides.push(SlideType::LegatoSlideTo);
            }
            if raw & 0x04 != 0 {
                slides.push(SlideType::OutDownwards);
            }
            if raw & 0x08 != 0 {
                slides.push(SlideType::OutUpwards);
            }
            if raw & 0x10 != 0 {
                slides.push(SlideType::IntoFromBelow);
            }
            if raw & 0x20 != 0 {
                slides.push(SlideType::IntoFromAbove);
            }
            slides
        } else {
            vec![SlideType::from_i8(raw)]
        };
        Ok((i, slides))
    }
}

/// A harmonic record. Version 4 packs everything into one type byte,
/// using 15/17/22 for artificial harmonics relative to the played
/// fret; version 5 stores the pitch and octave explicitly.
pub fn parse_harmonic(
    version: GpVersion,
    note_value: i16,
) -> impl FnMut(&[u8]) -> IResult<&[u8], HarmonicEffect> {
    move |i| {
        let (mut i, harmonic_type) = parse_i8(i)?;
        log::debug!("Parsing harmonic type {harmonic_type}");
        let mut effect = HarmonicEffect::default();
        match harmonic_type {
            1 => effect.kind = HarmonicType::Natural,
            2 if version >= GpVersion::GP5 => {
                let (inner, semitone) = parse_u8(i)?;
                let (inner, accidental) = parse_i8(inner)?;
                let (inner, octave) = parse_u8(inner)?;
                i = inner;
                effect.kind = HarmonicType::Artificial;
                effect.pitch = Some(PitchClass {
                    just: (semitone % 12) as i8,
                    accidental,
                });
                effect.octave = Some(Octave::from_byte(octave));
            }
            3 => {
                effect.kind = HarmonicType::Tapped;
                if version >= GpVersion::GP5 {
                    let (inner, fret) = parse_i8(i)?;
                    i = inner;
                    effect.right_hand_fret = Some(fret);
                }
            }
            4 => effect.kind = HarmonicType::Pinch,
            5 => effect.kind = HarmonicType::Semi,
            15 => {
                effect.kind = HarmonicType::Artificial;
                effect.pitch = Some(PitchClass::from_semitone(((note_value + 7) % 12) as i8));
                effect.octave = Some(Octave::Ottava);
            }
            17 => {
                effect.kind = HarmonicType::Artificial;
                effect.pitch = Some(PitchClass::from_semitone((note_value % 12) as i8));
                effect.octave = Some(Octave::Quindicesima);
            }
            22 => {
                effect.kind = HarmonicType::Artificial;
                effect.pitch = Some(PitchClass::from_semitone((note_value % 12) as i8));
                effect.octave = Some(Octave::Ottava);
            }
            unknown => {
                log::debug!("Unknown harmonic type {unknown}, keeping natural");
                effect.kind = HarmonicType::Natural;
            }
        }
        Ok((i, effect))
    }
}

pub fn parse_tremolo_picking(i: &[u8]) -> IResult<&[u8], TremoloPickingEffect> {
    let (i, raw) = parse_i8(i)?;
    let value = TremoloPickingEffect::from_tremolo_value(raw).unwrap_or(EIGHTH);
    Ok((
        i,
        TremoloPickingEffect {
            duration: Duration::new(value),
        },
    ))
}

pub fn parse_trill(i: &[u8]) -> IResult<&[u8], TrillEffect> {
    let (i, fret) = parse_i8(i)?;
    let (i, period) = parse_i8(i)?;
    let value = TrillEffect::from_trill_period(period).unwrap_or(SIXTEENTH);
    Ok((
        i,
        TrillEffect {
            fret,
            duration: Duration::new(value),
        },
    ))
}

/// Note effects in the two-flag-byte layout of versions 4 and 5.
pub fn parse_note_effects<'a>(
    note: &'a mut Note,
    version: GpVersion,
) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
    move |i| {
        let fret = note.value;
        let effect = &mut note.effect;
        let (i, flags1) = parse_u8(i)?;
        let (mut i, flags2) = parse_u8(i)?;
        effect.hammer = flags1 & 0x02 != 0;
        effect.let_ring = flags1 & 0x08 != 0;
        effect.staccato = flags2 & 0x01 != 0;
        effect.palm_mute = flags2 & 0x02 != 0;
        effect.vibrato = flags2 & 0x40 != 0 || effect.vibrato;
        if flags1 & 0x01 != 0 {
            let (inner, bend) = gp3_parser::parse_bend(i)?;
            i = inner;
            effect.bend = bend;
        }
        if flags1 & 0x10 != 0 {
            let (inner, grace) = parse_grace(version)(i)?;
            i = inner;
            effect.grace = Some(grace);
        }
        if flags2 & 0x04 != 0 {
            let (inner, tremolo_picking) = parse_tremolo_picking(i)?;
            i = inner;
            effect.tremolo_picking = Some(tremolo_picking);
        }
        if flags2 & 0x08 != 0 {
            let (inner, slides) = parse_slides(version)(i)?;
            i = inner;
            effect.slides = slides;
        }
        if flags2 & 0x10 != 0 {
            let (inner, harmonic) = parse_harmonic(version, fret)(i)?;
            i = inner;
            effect.harmonic = Some(harmonic);
        }
        if flags2 & 0x20 != 0 {
            let (inner, trill) = parse_trill(i)?;
            i = inner;
            effect.trill = Some(trill);
        }
        Ok((i, ()))
    }
}

/// A chord diagram in the version 4 and 5 layouts: a header bool picks
/// the old version 3 record or the byte-packed diagram.
pub fn parse_chord(string_count: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Chord> {
    move |i| {
        let (i, new_format) = parse_bool(i)?;
        let mut chord = Chord {
            length: string_count as u8,
            new_format,
            strings: vec![-1; string_count],
            ..Chord::default()
        };
        let (i, ()) = if new_format {
            parse_new_chord(i, &mut chord)?
        } else {
            gp3_parser::parse_old_chord(i, &mut chord)?
        };
        Ok((i, chord))
    }
}

/// The byte-packed diagram: harmony bytes, a fixed 22-byte name field,
/// up to five barres, omission bools and fingerings.
fn parse_new_chord<'a>(i: &'a [u8], chord: &mut Chord) -> IResult<&'a [u8], ()> {
    let (i, sharp) = parse_bool(i)?;
    chord.sharp = Some(sharp);
    let (i, ()) = skip(i, 3)?;
    let (i, root) = parse_u8(i)?;
    chord.root = Some(PitchClass::from_semitone((root % 12) as i8));
    let (i, kind) = parse_u8(i)?;
    chord.kind = Some(kind);
    let (i, extension) = parse_u8(i)?;
    chord.extension = Some(extension);
    let (i, bass) = parse_int(i)?;
    chord.bass = Some(PitchClass::from_semitone(bass.rem_euclid(12) as i8));
    let (i, tonality) = parse_int(i)?;
    chord.tonality = Some(tonality as u8);
    let (i, add) = parse_bool(i)?;
    chord.add = Some(add);
    let (i, (name, name_padding)) = parse_padded_byte_size_string(22)(i)?;
    chord.name = name;
    chord.name_padding = name_padding;
    let (i, fifth) = parse_u8(i)?;
    chord.fifth = Some(fifth);
    let (i, ninth) = parse_u8(i)?;
    chord.ninth = Some(ninth);
    let (i, eleventh) = parse_u8(i)?;
    chord.eleventh = Some(eleventh);
    let (mut i, first_fret) = parse_int(i)?;
    chord.first_fret = first_fret;
    for index in 0..7 {
        let (inner, fret) = parse_int(i)?;
        i = inner;
        if index < chord.strings.len() {
            chord.strings[index] = fret;
        }
    }
    let (i, barre_count) = parse_u8(i)?;
    let (i, barre_frets) = count(parse_u8, 5).parse(i)?;
    let (i, barre_starts) = count(parse_u8, 5).parse(i)?;
    let (i, barre_ends) = count(parse_u8, 5).parse(i)?;
    chord.barres = barre_frets
        .iter()
        .zip(&barre_starts)
        .zip(&barre_ends)
        .take(barre_count.min(5) as usize)
        .map(|((&fret, &start), &end)| Barre {
            fret: i32::from(fret),
            start: i32::from(start),
            end: i32::from(end),
        })
        .collect();
    let (i, omissions) = count(parse_bool, 7).parse(i)?;
    chord.omissions = omissions;
    let (i, ()) = skip(i, 1)?;
    let (i, fingerings) = count(parse_i8, 7).parse(i)?;
    chord.fingerings = fingerings.into_iter().map(Fingering::from_i8).collect();
    let (i, show) = parse_bool(i)?;
    chord.show = Some(show);
    Ok((i, ()))
}

pub struct Gp4Parser {
    song: Song,
    tempo: i32,
}

impl Gp4Parser {
    pub const fn new(song: Song) -> Self {
        Self { song, tempo: 0 }
    }

    pub fn take_song(&mut self) -> Song {
        std::mem::take(&mut self.song)
    }

    /// Everything after the version field: score information, triplet
    /// feel, lyrics, tempo, key, octave, channels, counts, headers,
    /// tracks and the measures.
    pub fn parse_song_data<'a>(&'a mut self, i: &'a [u8]) -> IResult<&'a [u8], ()> {
        let (i, song_info) = gp3_parser::parse_song_info(self.song.version)(i)?;
        self.song.song_info = song_info;
        let (i, triplet_feel) = parse_bool(i)?;
        self.song.triplet_feel = Some(triplet_feel);
        let (i, lyrics) = parse_lyrics(i)?;
        self.song.lyrics = Some(lyrics);
        let (i, tempo) = parse_int(i)?;
        log::debug!("Song tempo: {tempo}");
        self.song.tempo.value = tempo;
        self.tempo = tempo;
        let (i, key) = parse_int(i)?;
        self.song.key_signature = key as i8;
        let (i, octave) = parse_i8(i)?;
        self.song.octave = i32::from(octave);
        let (i, midi_channels) = gp3_parser::parse_midi_channels(i)?;
        self.song.midi_channels = midi_channels;
        let (i, (measure_count, track_count)) = (parse_int, parse_int).parse(i)?;
        log::debug!("Song has {measure_count} measures on {track_count} tracks");
        let feel = if triplet_feel {
            TripletFeel::Eighth
        } else {
            TripletFeel::None
        };
        let (i, measure_headers) = gp3_parser::parse_measure_headers(measure_count, tempo, feel)(i)?;
        self.song.measure_headers = measure_headers;
        let (i, ()) = self.parse_tracks(track_count.max(0) as usize)(i)?;
        let (i, ()) = self.parse_measures()(i)?;
        Ok((i, ()))
    }

    fn parse_tracks(&mut self, track_count: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let mut i = i;
            for number in 1..=track_count {
                let (inner, track) = gp3_parser::parse_track(
                    number,
                    &mut self.song.midi_channels,
                    self.song.version,
                )(i)?;
                i = inner;
                self.song.tracks.push(track);
            }
            Ok((i, ()))
        }
    }

    fn parse_measures(&mut self) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let mut i = i;
            let mut start = QUARTER_TIME;
            let measure_count = self.song.measure_headers.len();
            let track_count = self.song.tracks.len();
            for measure_index in 0..measure_count {
                self.song.measure_headers[measure_index].start = start;
                self.song.measure_headers[measure_index].tempo = self.tempo;
                for track_index in 0..track_count {
                    let (inner, ()) = self.parse_measure(track_index)(i)?;
                    i = inner;
                }
                start += self.song.measure_headers[measure_index].length();
            }
            Ok((i, ()))
        }
    }

    fn parse_measure(&mut self, track_index: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            self.song.tracks[track_index].measures.push(Measure::default());
            self.parse_voice(track_index, 0)(i)
        }
    }

    fn parse_voice(
        &mut self,
        track_index: usize,
        voice_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let (mut i, beat_count) = parse_int(i)?;
            log::debug!("Parsing {beat_count} beats");
            for _ in 0..beat_count.max(0) {
                let (inner, ()) = self.parse_beat(track_index, voice_index)(i)?;
                i = inner;
            }
            Ok((i, ()))
        }
    }

    fn parse_beat(
        &mut self,
        track_index: usize,
        voice_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let (mut i, flags) = parse_u8(i)?;
            let mut beat = Beat::default();
            if flags & 0x40 != 0 {
                let (inner, status) = parse_u8(i)?;
                i = inner;
                beat.status = BeatStatus::from_byte(status);
            }
            let (inner, duration) = gp3_parser::parse_duration(flags)(i)?;
            i = inner;
            beat.duration = duration;
            if flags & 0x02 != 0 {
                let string_count = self.song.tracks[track_index].strings.len();
                let (inner, chord) = parse_chord(string_count)(i)?;
                i = inner;
                beat.effect.chord = Some(chord);
            }
            if flags & 0x04 != 0 {
                let (inner, text) = parse_int_byte_sized_string(i)?;
                i = inner;
                beat.text = Some(text);
            }
            if flags & 0x08 != 0 {
                let (inner, ()) = parse_beat_effects(&mut beat.effect, self.song.version)(i)?;
                i = inner;
            }
            if flags & 0x10 != 0 {
                let (inner, change) =
                    gp3_parser::parse_mix_table_change(self.song.version)(i)?;
                i = inner;
                if let Some(tempo) = &change.tempo {
                    self.tempo = tempo.value;
                }
                beat.effect.mix_table_change = Some(change);
            }
            let (inner, ()) = self.parse_notes(track_index, voice_index, &mut beat)(i)?;
            i = inner;
            if let Some(measure) = self.song.tracks[track_index].measures.last_mut() {
                measure.voices[voice_index].beats.push(beat);
            }
            Ok((i, ()))
        }
    }

    fn parse_notes<'a>(
        &'a mut self,
        track_index: usize,
        voice_index: usize,
        beat: &'a mut Beat,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
        move |i| {
            let (mut i, string_flags) = parse_u8(i)?;
            let string_count = self.song.tracks[track_index].strings.len().min(7);
            for string_number in 1..=string_count as i8 {
                if string_flags & (1u8 << (7 - string_number)) != 0 {
                    let mut note = Note {
                        string: string_number,
                        ..Note::default()
                    };
                    let (inner, ()) = self.parse_note(track_index, voice_index, &mut note)(i)?;
                    i = inner;
                    beat.notes.push(note);
                }
            }
            Ok((i, ()))
        }
    }

    fn parse_note<'a>(
        &'a self,
        track_index: usize,
        voice_index: usize,
        note: &'a mut Note,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
        move |i| {
            let (mut i, flags) = parse_u8(i)?;
            note.effect.heavy_accentuated = flags & 0x02 != 0;
            note.effect.ghost_note = flags & 0x04 != 0;
            note.effect.accentuated = flags & 0x40 != 0;
            if flags & 0x20 != 0 {
                let (inner, kind) = parse_u8(i)?;
                i = inner;
                note.kind = NoteType::from_byte(kind);
            }
            if flags & 0x01 != 0 {
                let (inner, value) = parse_i8(i)?;
                let (inner, tuplet) = parse_i8(inner)?;
                i = inner;
                note.independent_duration = Some((value, tuplet));
            }
            if flags & 0x10 != 0 {
                let (inner, dynamic) = parse_i8(i)?;
                i = inner;
                note.velocity = unpack_velocity(dynamic);
            }
            if flags & 0x20 != 0 {
                let (inner, fret) = parse_i8(i)?;
                i = inner;
                let value = if note.kind == NoteType::Tie {
                    gp3_parser::tied_note_value(
                        &self.song.tracks,
                        note.string,
                        track_index,
                        voice_index,
                    )
                } else {
                    i16::from(fret)
                };
                note.value = value.clamp(0, 99);
            }
            if flags & 0x80 != 0 {
                let (inner, left) = parse_i8(i)?;
                let (inner, right) = parse_i8(inner)?;
                i = inner;
                note.effect.left_hand_finger = Fingering::from_i8(left);
                note.effect.right_hand_finger = Fingering::from_i8(right);
            }
            if flags & 0x08 != 0 {
                let (inner, ()) = parse_note_effects(note, self.song.version)(i)?;
                i = inner;
            }
            Ok((i, ()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lyrics_read_five_lines() {
        let mut data = Vec::new();
        data.extend_from_slice(&1i32.to_le_bytes());
        for line in 0..5i32 {
            data.extend_from_slice(&(line + 1).to_le_bytes());
            data.extend_from_slice(&2i32.to_le_bytes());
            data.extend_from_slice(b"la");
        }
        let (rest, lyrics) = parse_lyrics(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(lyrics.track_choice, 1);
        assert_eq!(lyrics.lines.len(), 5);
        assert_eq!(lyrics.lines[2].starting_measure, 3);
        assert_eq!(lyrics.lines[2].text, "la");
    }

    #[test]
    fn slides_decode_single_value_before_version_5() {
        let (_rest, slides) = parse_slides(GpVersion::GP4)(&[2]).unwrap();
        assert_eq!(slides, vec![SlideType::LegatoSlideTo]);
    }

    #[test]
    fn slides_decode_bitmask_from_version_5() {
        let (_rest, slides) = parse_slides(GpVersion::GP5)(&[0x01 | 0x20]).unwrap();
        assert_eq!(slides, vec![SlideType::ShiftSlideTo, SlideType::IntoFromAbove]);
    }

    #[test]
    fn artificial_harmonic_synthesizes_pitch_in_version_4() {
        let (_rest, harmonic) = parse_harmonic(GpVersion::GP4, 5)(&[15i8 as u8]).unwrap();
        assert_eq!(harmonic.kind, HarmonicType::Artificial);
        assert_eq!(harmonic.pitch.map(|p| p.just), Some(0));
        assert_eq!(harmonic.octave, Some(Octave::Ottava));
    }

    #[test]
    fn artificial_harmonic_reads_pitch_in_version_5() {
        let data = [2i8 as u8, 4, -1i8 as u8, 1];
        let (rest, harmonic) = parse_harmonic(GpVersion::GP5, 0)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(harmonic.kind, HarmonicType::Artificial);
        assert_eq!(
            harmonic.pitch,
            Some(PitchClass {
                just: 4,
                accidental: -1
            })
        );
        assert_eq!(harmonic.octave, Some(Octave::Ottava));
    }

    #[test]
    fn tapped_harmonic_reads_fret_in_version_5() {
        let (_rest, harmonic) = parse_harmonic(GpVersion::GP5_10, 0)(&[3, 12]).unwrap();
        assert_eq!(harmonic.kind, HarmonicType::Tapped);
        assert_eq!(harmonic.right_hand_fret, Some(12));
    }

    #[test]
    fn grace_reads_version_5_flags() {
        let data = [7, 4, 2, 1, 0x03];
        let (rest, grace) = parse_grace(GpVersion::GP5_10)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(grace.fret, 7);
        assert_eq!(grace.transition, GraceEffectTransition::Bend);
        assert_eq!(grace.duration, crate::model::duration::SIXTY_FOURTH);
        assert!(grace.is_dead);
        assert!(grace.is_on_beat);
    }

    #[test]
    fn tremolo_picking_maps_speed_to_duration() {
        let (_rest, tp) = parse_tremolo_picking(&[2]).unwrap();
        assert_eq!(tp.duration.value, SIXTEENTH);
    }

    #[test]
    fn trill_reads_fret_and_period() {
        let (_rest, trill) = parse_trill(&[5, 2]).unwrap();
        assert_eq!(trill.fret, 5);
        assert_eq!(trill.duration.value, crate::model::duration::THIRTY_SECOND);
    }
}
