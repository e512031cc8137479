//! Reader for the version 5 dialect.
//!
//! Version 5 keeps the version 3/4 record grammar for beats and notes
//! but surrounds it with new blocks: page setup, RSE master effect,
//! navigation directions, per-track RSE settings, two voices per
//! measure, and a second flag word on beats and notes. Revision 5.10
//! additionally carries equalizers and effect name strings.

use nom::multi::count;
use nom::{IResult, Parser};

use crate::model::duration::QUARTER_TIME;
use crate::model::song::{
    Beat, BeatDisplay, BeatStatus, Directions, Fingering, GpVersion, KeySignature, LineBreak,
    Measure, MeasureHeader, MixTableChange, MixTableItem, Note, NoteType, Octave, Padding,
    PageSetup, Point, RseEqualizer, RseInstrument, RseMasterEffect, Song, Track, TrackRse,
    TripletFeel, TupletBracket, VoiceDirection, WahEffect, unpack_velocity,
};
use crate::parser::gp3_parser;
use crate::parser::gp4_parser;
use crate::parser::primitive_parser::{
    parse_bool, parse_f64, parse_i8, parse_int, parse_int_byte_sized_string, parse_short, parse_u8,
    skip,
};

/// An equalizer: `knobs` band faders plus one gain fader, all raw
/// signed bytes.
pub fn parse_equalizer(knobs: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], RseEqualizer> {
    move |i| {
        let (i, mut values) = count(parse_i8, knobs + 1).parse(i)?;
        let gain = values.pop().unwrap_or(0);
        Ok((
            i,
            RseEqualizer {
                knobs: values,
                gain,
            },
        ))
    }
}

/// The RSE master effect block, stored only by revision 5.10: master
/// volume, one reserved integer and a ten-band equalizer.
pub fn parse_master_effect(i: &[u8]) -> IResult<&[u8], RseMasterEffect> {
    let (i, volume) = parse_int(i)?;
    let (i, ()) = skip(i, 4)?;
    let (i, equalizer) = parse_equalizer(10)(i)?;
    Ok((
        i,
        RseMasterEffect {
            volume,
            reverb: 0,
            equalizer: Some(equalizer),
        },
    ))
}

/// The page setup block: page geometry, header/footer flags and the
/// ten template strings. The two copyright lines come back joined.
pub fn parse_page_setup(i: &[u8]) -> IResult<&[u8], PageSetup> {
    log::debug!("Parsing page setup");
    let (i, x) = parse_int(i)?;
    let (i, y) = parse_int(i)?;
    let (i, left) = parse_int(i)?;
    let (i, right) = parse_int(i)?;
    let (i, top) = parse_int(i)?;
    let (i, bottom) = parse_int(i)?;
    let (i, score_size_percent) = parse_int(i)?;
    let (i, header_and_footer) = parse_short(i)?;
    let (i, title) = parse_int_byte_sized_string(i)?;
    let (i, subtitle) = parse_int_byte_sized_string(i)?;
    let (i, artist) = parse_int_byte_sized_string(i)?;
    let (i, album) = parse_int_byte_sized_string(i)?;
    let (i, words) = parse_int_byte_sized_string(i)?;
    let (i, music) = parse_int_byte_sized_string(i)?;
    let (i, word_and_music) = parse_int_byte_sized_string(i)?;
    let (i, copyright_first) = parse_int_byte_sized_string(i)?;
    let (i, copyright_second) = parse_int_byte_sized_string(i)?;
    let (i, page_number) = parse_int_byte_sized_string(i)?;
    Ok((
        i,
        PageSetup {
            page_size: Point { x, y },
            page_margin: Padding {
                left,
                right,
                top,
                bottom,
            },
            score_size_percent,
            header_and_footer,
            title,
            subtitle,
            artist,
            album,
            words,
            music,
            word_and_music,
            copyright: format!("{copyright_first}\n{copyright_second}"),
            page_number,
        },
    ))
}

/// The 19 navigation sign slots, each a measure number or -1.
pub fn parse_directions(i: &[u8]) -> IResult<&[u8], Directions> {
    let (i, signs) = count(parse_short, 19).parse(i)?;
    let mut array = [-1i16; 19];
    array.copy_from_slice(&signs);
    Ok((i, Directions::from_array(array)))
}

/// An RSE instrument reference. Revision 5.00 still stores the effect
/// number as a short plus one reserved byte.
pub fn parse_rse_instrument(
    version: GpVersion,
) -> impl FnMut(&[u8]) -> IResult<&[u8], RseInstrument> {
    move |i| {
        let (i, instrument) = parse_int(i)?;
        let (i, unknown) = parse_int(i)?;
        let (i, sound_bank) = parse_int(i)?;
        let (i, effect_number) = if version == GpVersion::GP5 {
            let (i, short) = parse_short(i)?;
            let (i, ()) = skip(i, 1)?;
            (i, i32::from(short))
        } else {
            parse_int(i)?
        };
        Ok((
            i,
            RseInstrument {
                instrument,
                unknown,
                sound_bank,
                effect_number,
                effect: None,
                effect_category: None,
            },
        ))
    }
}

/// Per-track RSE settings: humanize, three reserved integers, twelve
/// reserved bytes, the instrument, and from 5.10 a three-band
/// equalizer and the effect name strings.
pub fn parse_track_rse(version: GpVersion) -> impl FnMut(&[u8]) -> IResult<&[u8], TrackRse> {
    move |i| {
        let (i, humanize) = parse_u8(i)?;
        // three reserved integers (0, 0, 100) and twelve reserved bytes
        let (i, ()) = skip(i, 24)?;
        let (i, mut instrument) = parse_rse_instrument(version)(i)?;
        let (i, equalizer) = if version > GpVersion::GP5 {
            let (i, equalizer) = parse_equalizer(3)(i)?;
            let (i, effect) = parse_int_byte_sized_string(i)?;
            let (i, effect_category) = parse_int_byte_sized_string(i)?;
            instrument.effect = Some(effect);
            instrument.effect_category = Some(effect_category);
            (i, Some(equalizer))
        } else {
            (i, None)
        };
        Ok((
            i,
            TrackRse {
                humanize,
                instrument,
                equalizer,
            },
        ))
    }
}

/// Measure headers of the version 5 dialect: a blank byte between
/// headers, byte-granular time signatures with beam groups, marker
/// before key, and a per-header triplet feel byte.
pub fn parse_measure_headers(
    measure_count: i32,
    song_tempo: i32,
) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<MeasureHeader>> {
    move |i| {
        let mut i = i;
        let mut headers: Vec<MeasureHeader> = Vec::with_capacity(measure_count.max(0) as usize);
        for number in 1..=measure_count.max(0) {
            if number > 1 {
                let (inner, ()) = skip(i, 1)?;
                i = inner;
            }
            let (inner, flags) = parse_u8(i)?;
            i = inner;
            log::debug!("Parsing measure header {number}, flags {flags:#04x}");
            let mut header = MeasureHeader {
                tempo: song_tempo,
                ..MeasureHeader::default()
            };
            if flags & 0x01 != 0 {
                let (inner, numerator) = parse_i8(i)?;
                i = inner;
                header.time_signature.numerator = numerator;
            } else if let Some(previous) = headers.last() {
                header.time_signature.numerator = previous.time_signature.numerator;
            }
            if flags & 0x02 != 0 {
                let (inner, denominator) = parse_i8(i)?;
                i = inner;
                header.time_signature.denominator.value = denominator.max(0) as u16;
            } else if let Some(previous) = headers.last() {
                header.time_signature.denominator.value =
                    previous.time_signature.denominator.value;
            }
            header.repeat_open = flags & 0x04 != 0;
            if flags & 0x08 != 0 {
                let (inner, close) = parse_i8(i)?;
                i = inner;
                header.repeat_close = close;
            }
            if flags & 0x20 != 0 {
                let (inner, marker) = gp3_parser::parse_marker(i)?;
                i = inner;
                header.marker = Some(marker);
            }
            if flags & 0x40 != 0 {
                let (inner, root) = parse_i8(i)?;
                let (inner, kind) = parse_i8(inner)?;
                i = inner;
                header.key_signature = KeySignature::new(root, kind != 0);
            } else if let Some(previous) = headers.last() {
                header.key_signature = previous.key_signature;
            }
            if flags & 0x10 != 0 {
                let (inner, alternative) = parse_u8(i)?;
                i = inner;
                header.repeat_alternative = alternative;
            }
            header.double_bar = flags & 0x80 != 0;
            if header.repeat_close > -1 {
                header.repeat_close -= 1;
            }
            if flags & 0x03 != 0 {
                let (inner, beams) = count(parse_u8, 4).parse(i)?;
                i = inner;
                header.time_signature.beams.copy_from_slice(&beams);
            } else if let Some(previous) = headers.last() {
                header.time_signature.beams = previous.time_signature.beams;
            }
            if flags & 0x10 == 0 {
                let (inner, ()) = skip(i, 1)?;
                i = inner;
            }
            let (inner, feel) = parse_u8(i)?;
            i = inner;
            header.triplet_feel = TripletFeel::from_byte(feel);
            headers.push(header);
        }
        Ok((i, headers))
    }
}

pub struct Gp5Parser {
    song: Song,
    tempo: i32,
}

impl Gp5Parser {
    pub const fn new(song: Song) -> Self {
        Self { song, tempo: 0 }
    }

    pub fn take_song(&mut self) -> Song {
        std::mem::take(&mut self.song)
    }

    /// Everything after the version field, in on-disk order: score
    /// information, lyrics, master effect, page setup, tempo, key,
    /// octave, channels, directions, master reverb, counts, headers,
    /// tracks and the measures.
    pub fn parse_song_data<'a>(&'a mut self, i: &'a [u8]) -> IResult<&'a [u8], ()> {
        let version = self.song.version;
        let (i, song_info) = gp3_parser::parse_song_info(version)(i)?;
        self.song.song_info = song_info;
        let (i, lyrics) = gp4_parser::parse_lyrics(i)?;
        self.song.lyrics = Some(lyrics);
        let (i, mut master_effect) = if version > GpVersion::GP5 {
            parse_master_effect(i)?
        } else {
            (i, RseMasterEffect::default())
        };
        let (i, page_setup) = parse_page_setup(i)?;
        self.song.page_setup = Some(page_setup);
        let (i, tempo_name) = parse_int_byte_sized_string(i)?;
        let (i, tempo) = parse_int(i)?;
        log::debug!("Song tempo: {tempo} {tempo_name:?}");
        self.song.tempo.value = tempo;
        self.song.tempo.name = Some(tempo_name);
        self.tempo = tempo;
        let (i, hide_tempo) = if version > GpVersion::GP5 {
            let (i, hide) = parse_bool(i)?;
            (i, Some(hide))
        } else {
            (i, None)
        };
        self.song.hide_tempo = hide_tempo;
        let (i, key) = parse_i8(i)?;
        self.song.key_signature = key;
        let (i, octave) = parse_int(i)?;
        self.song.octave = octave;
        let (i, midi_channels) = gp3_parser::parse_midi_channels(i)?;
        self.song.midi_channels = midi_channels;
        let (i, directions) = parse_directions(i)?;
        self.song.directions = Some(directions);
        let (i, master_reverb) = parse_int(i)?;
        master_effect.reverb = master_reverb;
        self.song.master_effect = Some(master_effect);
        let (i, (measure_count, track_count)) = (parse_int, parse_int).parse(i)?;
        log::debug!("Song has {measure_count} measures on {track_count} tracks");
        let (i, measure_headers) = parse_measure_headers(measure_count, tempo)(i)?;
        self.song.measure_headers = measure_headers;
        let (i, ()) = self.parse_tracks(track_count.max(0) as usize)(i)?;
        let (i, ()) = skip(i, if version == GpVersion::GP5 { 2 } else { 1 })?;
        let (i, ()) = self.parse_measures()(i)?;
        Ok((i, ()))
    }

    fn parse_tracks(&mut self, track_count: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let mut i = i;
            for number in 1..=track_count {
                let (inner, track) = self.parse_track(number)(i)?;
                i = inner;
                self.song.tracks.push(track);
            }
            Ok((i, ()))
        }
    }

    /// A version 5 track: the version 3 record extended with a
    /// notation settings word, auto accentuation, the channel bank and
    /// the RSE block. Revision 5.00 pads every track, 5.10 only the
    /// first.
    fn parse_track(&mut self, number: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Track> + '_ {
        move |i| {
            let version = self.song.version;
            let i = if number == 1 || version == GpVersion::GP5 {
                let (i, ()) = skip(i, 1)?;
                i
            } else {
                i
            };
            let (i, mut track) =
                gp3_parser::parse_track(number, &mut self.song.midi_channels, version)(i)?;
            let (i, settings_flags) = parse_short(i)?;
            track.settings_flags = Some(settings_flags);
            let (i, auto_accentuation) = parse_u8(i)?;
            track.auto_accentuation = Some(auto_accentuation);
            let (i, bank) = parse_u8(i)?;
            if let Ok(index) = usize::try_from(track.channel_index) {
                if let Some(channel) = self.song.midi_channels.get_mut(index) {
                    channel.bank = bank;
                }
            }
            let (i, rse) = parse_track_rse(version)(i)?;
            track.rse = Some(rse);
            Ok((i, track))
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

    /// One version 5 measure: both voices, then the line break byte.
    /// Files in the wild omit the very last byte, so a missing line
    /// break decodes as none.
    fn parse_measure(&mut self, track_index: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            self.song.tracks[track_index].measures.push(Measure::default());
            let (i, ()) = self.parse_voice(track_index, 0)(i)?;
            let (i, ()) = self.parse_voice(track_index, 1)(i)?;
            let (i, line_break) = if i.is_empty() {
                (i, 0)
            } else {
                parse_u8(i)?
            };
            if let Some(measure) = self.song.tracks[track_index].measures.last_mut() {
                measure.line_break = LineBreak::from_byte(line_break);
            }
            Ok((i, ()))
        }
    }

    fn parse_voice(
        &mut self,
        track_index: usize,
        voice_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let (mut i, beat_count) = parse_int(i)?;
            log::debug!("Parsing {beat_count} beats in voice {voice_index}");
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
                let (inner, chord) = gp4_parser::parse_chord(string_count)(i)?;
                i = inner;
                beat.effect.chord = Some(chord);
            }
            if flags & 0x04 != 0 {
                let (inner, text) = parse_int_byte_sized_string(i)?;
                i = inner;
                beat.text = Some(text);
            }
            if flags & 0x08 != 0 {
                let (inner, ()) =
                    gp4_parser::parse_beat_effects(&mut beat.effect, self.song.version)(i)?;
                i = inner;
            }
            if flags & 0x10 != 0 {
                let (inner, change) = self.parse_mix_table_change()(i)?;
                i = inner;
                if let Some(tempo) = &change.tempo {
                    self.tempo = tempo.value;
                }
                beat.effect.mix_table_change = Some(change);
            }
            let (inner, ()) = self.parse_notes(track_index, voice_index, &mut beat)(i)?;
            i = inner;
            let (inner, flags2) = parse_short(i)?;
            i = inner;
            if flags2 & 0x0010 != 0 {
                beat.octave = Octave::Ottava;
            }
            if flags2 & 0x0020 != 0 {
                beat.octave = Octave::OttavaBassa;
            }
            if flags2 & 0x0040 != 0 {
                beat.octave = Octave::Quindicesima;
            }
            if flags2 & 0x0100 != 0 {
                beat.octave = Octave::QuindicesimaBassa;
            }
            let mut display = BeatDisplay {
                break_beam: flags2 & 0x0001 != 0,
                force_beam: flags2 & 0x0004 != 0,
                break_secondary_tuplet: flags2 & 0x1000 != 0,
                force_bracket: flags2 & 0x2000 != 0,
                ..BeatDisplay::default()
            };
            if flags2 & 0x0002 != 0 {
                display.beam_direction = VoiceDirection::Down;
            }
            if flags2 & 0x0008 != 0 {
                display.beam_direction = VoiceDirection::Up;
            }
            if flags2 & 0x0200 != 0 {
                display.tuplet_bracket = TupletBracket::Start;
            }
            if flags2 & 0x0400 != 0 {
                display.tuplet_bracket = TupletBracket::End;
            }
            if flags2 & 0x0800 != 0 {
                let (inner, break_secondary) = parse_u8(i)?;
                i = inner;
                display.break_secondary = break_secondary;
            }
            beat.display = display;
            if let Some(measure) = self.song.tracks[track_index].measures.last_mut() {
                measure.voices[voice_index].beats.push(beat);
            }
            Ok((i, ()))
        }
    }

    /// The version 5 mix table: parameters interleaved with the RSE
    /// instrument and tempo name, then durations, flags, the wah pedal
    /// position and the effect name strings.
    pub fn parse_mix_table_change(
        &self,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], MixTableChange> + '_ {
        move |i| {
            let version = self.song.version;
            let (i, instrument) = parse_i8(i)?;
            let (i, rse) = parse_rse_instrument(version)(i)?;
            let (i, ()) = if version == GpVersion::GP5 {
                skip(i, 1)?
            } else {
                (i, ())
            };
            let (i, volume) = parse_i8(i)?;
            let (i, balance) = parse_i8(i)?;
            let (i, chorus) = parse_i8(i)?;
            let (i, reverb) = parse_i8(i)?;
            let (i, phaser) = parse_i8(i)?;
            let (i, tremolo) = parse_i8(i)?;
            let (i, tempo_name) = parse_int_byte_sized_string(i)?;
            let (i, tempo) = parse_int(i)?;
            let item = |value: i32| {
                Some(MixTableItem {
                    value,
                    ..MixTableItem::default()
                })
            };
            let mut change = MixTableChange {
                tempo_name: Some(tempo_name),
                ..MixTableChange::default()
            };
            if instrument >= 0 {
                change.instrument = item(i32::from(instrument));
                change.rse = Some(rse);
            }
            if volume >= 0 {
                change.volume = item(i32::from(volume));
            }
            if balance >= 0 {
                change.balance = item(i32::from(balance));
            }
            if chorus >= 0 {
                change.chorus = item(i32::from(chorus));
            }
            if reverb >= 0 {
                change.reverb = item(i32::from(reverb));
            }
            if phaser >= 0 {
                change.phaser = item(i32::from(phaser));
            }
            if tremolo >= 0 {
                change.tremolo = item(i32::from(tremolo));
            }
            if tempo >= 0 {
                change.tempo = item(tempo);
            }
            let mut i = i;
            for slot in [
                &mut change.volume,
                &mut change.balance,
                &mut change.chorus,
                &mut change.reverb,
                &mut change.phaser,
                &mut change.tremolo,
            ] {
                if let Some(item) = slot.as_mut() {
                    let (inner, duration) = parse_i8(i)?;
                    i = inner;
                    item.duration = duration;
                }
            }
            if let Some(item) = change.tempo.as_mut() {
                let (inner, duration) = parse_i8(i)?;
                i = inner;
                item.duration = duration;
                if version > GpVersion::GP5 {
                    let (inner, hide) = parse_bool(i)?;
                    i = inner;
                    change.hide_tempo = hide;
                }
            }
            let (inner, flags) = parse_u8(i)?;
            i = inner;
            if let Some(item) = change.volume.as_mut() {
                item.all_tracks = flags & 0x01 != 0;
            }
            if let Some(item) = change.balance.as_mut() {
                item.all_tracks = flags & 0x02 != 0;
            }
            if let Some(item) = change.chorus.as_mut() {
                item.all_tracks = flags & 0x04 != 0;
            }
            if let Some(item) = change.reverb.as_mut() {
                item.all_tracks = flags & 0x08 != 0;
            }
            if let Some(item) = change.phaser.as_mut() {
                item.all_tracks = flags & 0x10 != 0;
            }
            if let Some(item) = change.tremolo.as_mut() {
                item.all_tracks = flags & 0x20 != 0;
            }
            change.use_rse = flags & 0x40 != 0;
            let (inner, wah_value) = parse_i8(i)?;
            i = inner;
            if wah_value >= 0 {
                change.wah = Some(WahEffect {
                    value: wah_value,
                    display: flags & 0x80 != 0,
                });
            }
            if version > GpVersion::GP5 {
                let (inner, effect) = parse_int_byte_sized_string(i)?;
                let (inner, effect_category) = parse_int_byte_sized_string(inner)?;
                i = inner;
                if let Some(rse) = change.rse.as_mut() {
                    rse.effect = Some(effect);
                    rse.effect_category = Some(effect_category);
                }
            }
            Ok((i, change))
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

    /// A version 5 note: the version 3 flags reinterpreted (0x01 is
    /// now a duration percent), a second flag byte for swapped
    /// accidentals, then the effect record.
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
            if flags & 0x01 != 0 {
                let (inner, percent) = parse_f64(i)?;
                i = inner;
                note.duration_percent = percent;
            }
            let (inner, flags2) = parse_u8(i)?;
            i = inner;
            note.swap_accidentals = flags2 & 0x02 != 0;
            if flags & 0x08 != 0 {
                let (inner, ()) = gp4_parser::parse_note_effects(note, self.song.version)(i)?;
                i = inner;
            }
            Ok((i, ()))
        }
    }
}
