//! Reader for the version 3 dialect.
//!
//! The record parsers that later dialects reuse unchanged (score
//! information, colors, channels, headers, tracks, bends, graces) live
//! here as free functions; the stateful walk over measures and beats is
//! done by [`Gp3Parser`].

use nom::multi::count;
use nom::{IResult, Parser};

use crate::model::duration::{
    Duration, EIGHTH, HUNDRED_TWENTY_EIGHTH, QUARTER, QUARTER_TIME, SIXTEENTH, SIXTY_FOURTH,
    THIRTY_SECOND, Tuplet,
};
use crate::model::song::{
    BEND_EFFECT_MAX_POSITION, Barre, Beat, BeatEffects, BeatStatus, BeatStroke,
    BeatStrokeDirection, BendEffect, BendPoint, BendType, Chord, Color, DEFAULT_PERCUSSION_CHANNEL,
    Fingering, GP_BEND_POSITION, GP_BEND_SEMITONE, GpVersion, GraceEffect, GraceEffectTransition,
    HarmonicEffect, HarmonicType, KeySignature, Marker, Measure, MeasureHeader, MidiChannel,
    MixTableChange, MixTableItem, Note, NoteEffect, NoteType, PitchClass, SEMITONE_LENGTH,
    SlapEffect, SlideType, Song, SongInfo, Track, TripletFeel, unpack_channel_param,
    unpack_velocity,
};
use crate::parser::primitive_parser::{
    parse_bool, parse_i8, parse_int, parse_int_byte_sized_string, parse_padded_byte_size_string,
    parse_u8, skip,
};

/// Score information: the title block strings followed by the notice
/// lines. Version 5 carries a separate music credit after the words.
pub fn parse_song_info(version: GpVersion) -> impl FnMut(&[u8]) -> IResult<&[u8], SongInfo> {
    move |i| {
        let (i, name) = parse_int_byte_sized_string(i)?;
        let (i, subtitle) = parse_int_byte_sized_string(i)?;
        let (i, artist) = parse_int_byte_sized_string(i)?;
        let (i, album) = parse_int_byte_sized_string(i)?;
        let (i, words) = parse_int_byte_sized_string(i)?;
        let (i, music) = if version >= GpVersion::GP5 {
            let (i, music) = parse_int_byte_sized_string(i)?;
            (i, Some(music))
        } else {
            (i, None)
        };
        let (i, copyright) = parse_int_byte_sized_string(i)?;
        let (i, tab_author) = parse_int_byte_sized_string(i)?;
        let (i, instructions) = parse_int_byte_sized_string(i)?;
        let (i, notice_count) = parse_int(i)?;
        log::debug!("Parsing song info: {name:?} by {artist:?}, {notice_count} notice lines");
        let (i, notices) =
            count(parse_int_byte_sized_string, notice_count.max(0) as usize).parse(i)?;
        Ok((
            i,
            SongInfo {
                name,
                subtitle,
                artist,
                album,
                words,
                music,
                copyright,
                tab_author,
                instructions,
                notices,
            },
        ))
    }
}

/// Three color bytes and one blank byte.
pub fn parse_color(i: &[u8]) -> IResult<&[u8], Color> {
    let (i, r) = parse_u8(i)?;
    let (i, g) = parse_u8(i)?;
    let (i, b) = parse_u8(i)?;
    let (i, ()) = skip(i, 1)?;
    Ok((i, Color { r, g, b }))
}

pub fn parse_marker(i: &[u8]) -> IResult<&[u8], Marker> {
    let (i, title) = parse_int_byte_sized_string(i)?;
    let (i, color) = parse_color(i)?;
    Ok((i, Marker { title, color }))
}

/// The 64-entry channel table (4 ports of 16 channels). A percussion
/// channel storing instrument -1 comes back as 0.
pub fn parse_midi_channels(i: &[u8]) -> IResult<&[u8], Vec<MidiChannel>> {
    let mut i = i;
    let mut channels = Vec::with_capacity(64);
    for number in 0..64u8 {
        let mut channel = MidiChannel::new(number);
        let (inner, instrument) = parse_int(i)?;
        i = inner;
        channel.instrument = if channel.is_percussion() && instrument == -1 {
            0
        } else {
            instrument
        };
        let (inner, params) = count(parse_i8, 6).parse(i)?;
        i = inner;
        channel.volume = unpack_channel_param(params[0]);
        channel.balance = unpack_channel_param(params[1]);
        channel.chorus = unpack_channel_param(params[2]);
        channel.reverb = unpack_channel_param(params[3]);
        channel.phaser = unpack_channel_param(params[4]);
        channel.tremolo = unpack_channel_param(params[5]);
        // trailing bytes kept for version 3.0 compatibility
        let (inner, ()) = skip(i, 2)?;
        i = inner;
        channels.push(channel);
    }
    Ok((i, channels))
}

/// The stored byte is the number of the last covered ending; expand it
/// to a bitmask and subtract the endings earlier measures of the same
/// repeat group already claimed.
fn repeat_alternative_mask(value: u8, headers: &[MeasureHeader]) -> u8 {
    let mut existing = 0u8;
    for header in headers.iter().rev() {
        if header.repeat_open {
            break;
        }
        existing |= header.repeat_alternative;
    }
    let mask = ((1u16 << value.min(8)) - 1) as u8;
    mask ^ existing
}

/// Measure headers of the version 3 and 4 dialects: one flag byte per
/// header, fields present only when flagged, time and key signatures
/// propagated from the previous header otherwise.
pub fn parse_measure_headers(
    measure_count: i32,
    song_tempo: i32,
    triplet_feel: TripletFeel,
) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<MeasureHeader>> {
    move |i| {
        let mut i = i;
        let mut headers: Vec<MeasureHeader> = Vec::with_capacity(measure_count.max(0) as usize);
        for number in 1..=measure_count.max(0) {
            let (inner, flags) = parse_u8(i)?;
            i = inner;
            log::debug!("Parsing measure header {number}, flags {flags:#04x}");
            let mut header = MeasureHeader {
                tempo: song_tempo,
                triplet_feel,
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
            if flags & 0x10 != 0 {
                let (inner, raw) = parse_u8(i)?;
                i = inner;
                header.repeat_alternative = repeat_alternative_mask(raw, &headers);
            }
            if flags & 0x20 != 0 {
                let (inner, marker) = parse_marker(i)?;
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
            header.double_bar = flags & 0x80 != 0;
            headers.push(header);
        }
        Ok((i, headers))
    }
}

/// A track record. The flag byte grows display and RSE bits from
/// version 5 on; resolving the channel pair mutates the song channel
/// table the same way the original software does.
pub fn parse_track<'a>(
    number: usize,
    channels: &'a mut [MidiChannel],
    version: GpVersion,
) -> impl FnMut(&[u8]) -> IResult<&[u8], Track> + 'a {
    move |i| {
        log::debug!("Parsing track {number}");
        let (i, flags) = parse_u8(i)?;
        let mut track = Track {
            number: number as i32,
            percussion: flags & 0x01 != 0,
            twelve_stringed: flags & 0x02 != 0,
            banjo: flags & 0x04 != 0,
            ..Track::default()
        };
        if version >= GpVersion::GP5 {
            track.visible = flags & 0x08 != 0;
            track.solo = flags & 0x10 != 0;
            track.mute = flags & 0x20 != 0;
            track.use_rse = flags & 0x40 != 0;
            track.indicate_tuning = flags & 0x80 != 0;
        }
        let (i, (name, name_padding)) = parse_padded_byte_size_string(40)(i)?;
        log::debug!("Track name: {name:?}");
        track.name = name;
        track.name_padding = name_padding;
        let (i, string_count) = parse_int(i)?;
        let (i, tunings) = count(parse_int, 7).parse(i)?;
        track.strings = tunings
            .into_iter()
            .take(string_count.max(0) as usize)
            .collect();
        let (i, midi_port) = parse_int(i)?;
        track.midi_port = midi_port;
        let (i, ()) = parse_track_channel(i, &mut track, channels)?;
        let (i, fret_count) = parse_int(i)?;
        track.fret_count = fret_count;
        let (i, offset) = parse_int(i)?;
        track.offset = offset;
        let (i, color) = parse_color(i)?;
        track.color = color;
        Ok((i, track))
    }
}

/// Two one-based integers: channel table index and effect channel.
pub fn parse_track_channel<'a>(
    i: &'a [u8],
    track: &mut Track,
    channels: &mut [MidiChannel],
) -> IResult<&'a [u8], ()> {
    let (i, index) = parse_int(i)?;
    let (i, effect_channel) = parse_int(i)?;
    let index = index - 1;
    let effect_channel = effect_channel - 1;
    track.effect_channel = effect_channel;
    match usize::try_from(index).ok().and_then(|n| channels.get_mut(n)) {
        Some(channel) => {
            if channel.instrument < 0 {
                channel.instrument = 0;
            }
            if !channel.is_percussion() && (0..=255).contains(&effect_channel) {
                channel.effect_channel = effect_channel as u8;
            }
            if channel.channel == DEFAULT_PERCUSSION_CHANNEL {
                track.percussion = true;
            }
            track.channel_index = index;
        }
        None => track.channel_index = -1,
    }
    Ok((i, ()))
}

/// A beat duration: one exponent byte, plus a tuplet integer when the
/// beat flags announce one.
pub fn parse_duration(flags: u8) -> impl FnMut(&[u8]) -> IResult<&[u8], Duration> {
    move |i| {
        let (i, exponent) = parse_i8(i)?;
        let mut duration = Duration {
            value: 1u16 << (i32::from(exponent) + 2).clamp(0, 7),
            dotted: flags & 0x01 != 0,
            ..Duration::default()
        };
        if flags & 0x20 == 0 {
            return Ok((i, duration));
        }
        let (i, enters) = parse_int(i)?;
        duration.tuplet = match enters {
            3 => Tuplet::new(3, 2),
            5 => Tuplet::new(5, 4),
            6 => Tuplet::new(6, 4),
            7 => Tuplet::new(7, 4),
            9..=13 => Tuplet::new(enters as u8, 8),
            unknown => {
                log::debug!("Unknown tuplet {unknown}, keeping plain duration");
                Tuplet::default()
            }
        };
        Ok((i, duration))
    }
}

fn scale_bend(raw: i32, numerator: i32, denominator: i32) -> i32 {
    (f64::from(raw) * f64::from(numerator) / f64::from(denominator)).round() as i32
}

/// A bend record: type byte, overall value, then the curve points with
/// positions rescaled from sixtieths to the 0..=12 range.
pub fn parse_bend(i: &[u8]) -> IResult<&[u8], Option<BendEffect>> {
    let (i, kind) = parse_i8(i)?;
    let (i, value) = parse_int(i)?;
    let (mut i, point_count) = parse_int(i)?;
    let mut points = Vec::with_capacity(point_count.max(0) as usize);
    for _ in 0..point_count.max(0) {
        let (inner, raw_position) = parse_int(i)?;
        let (inner, raw_value) = parse_int(inner)?;
        let (inner, vibrato) = parse_bool(inner)?;
        i = inner;
        points.push(BendPoint {
            position: scale_bend(raw_position, BEND_EFFECT_MAX_POSITION, GP_BEND_POSITION),
            value: scale_bend(raw_value, SEMITONE_LENGTH, GP_BEND_SEMITONE),
            vibrato,
        });
    }
    if points.is_empty() {
        return Ok((i, None));
    }
    Ok((
        i,
        Some(BendEffect {
            kind: BendType::from_i8(kind),
            value,
            points,
        }),
    ))
}

/// A grace note of the version 3 and 4 dialects. A fret of -1 marks a
/// dead grace note; on-beat graces do not exist before version 5.
pub fn parse_grace(i: &[u8]) -> IResult<&[u8], GraceEffect> {
    let (i, fret) = parse_i8(i)?;
    let (i, dynamic) = parse_u8(i)?;
    let (i, duration_byte) = parse_u8(i)?;
    let (i, transition) = parse_i8(i)?;
    Ok((
        i,
        GraceEffect {
            fret,
            velocity: unpack_velocity(dynamic as i8),
            duration: 1u16 << 7u32.saturating_sub(u32::from(duration_byte)),
            is_dead: fret == -1,
            is_on_beat: false,
            transition: GraceEffectTransition::from_i8(transition),
        },
    ))
}

/// The only whammy figure version 3 knows is a dip: one depth integer,
/// expanded into a symmetric three-point curve.
fn parse_tremolo_bar(i: &[u8]) -> IResult<&[u8], BendEffect> {
    let (i, value) = parse_int(i)?;
    let dip = (f64::from(-value) / f64::from(GP_BEND_SEMITONE)).round() as i32;
    let points = vec![
        BendPoint {
            position: 0,
            value: 0,
            vibrato: false,
        },
        BendPoint {
            position: BEND_EFFECT_MAX_POSITION / 2,
            value: dip,
            vibrato: false,
        },
        BendPoint {
            position: BEND_EFFECT_MAX_POSITION,
            value: 0,
            vibrato: false,
        },
    ];
    Ok((
        i,
        BendEffect {
            kind: BendType::Dip,
            value,
            points,
        },
    ))
}

const fn stroke_speed(raw: i8) -> u16 {
    match raw {
        1 => HUNDRED_TWENTY_EIGHTH,
        2 => SIXTY_FOURTH,
        3 => THIRTY_SECOND,
        4 => SIXTEENTH,
        5 => EIGHTH,
        6 => QUARTER,
        _ => SIXTY_FOURTH,
    }
}

/// Down speed then up speed; an up stroke wins when both are set.
pub fn parse_beat_stroke(i: &[u8]) -> IResult<&[u8], BeatStroke> {
    let (i, down) = parse_i8(i)?;
    let (i, up) = parse_i8(i)?;
    let stroke = if up > 0 {
        BeatStroke {
            direction: BeatStrokeDirection::Up,
            value: stroke_speed(up),
        }
    } else if down > 0 {
        BeatStroke {
            direction: BeatStrokeDirection::Down,
            value: stroke_speed(down),
        }
    } else {
        BeatStroke::default()
    };
    Ok((i, stroke))
}

/// A chord diagram: a header bool selects the old or the new layout.
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
            parse_old_chord(i, &mut chord)?
        };
        Ok((i, chord))
    }
}

/// Old-layout chord: a name and, when the first fret is nonzero, six
/// fret integers of which the track's strings are kept.
pub fn parse_old_chord<'a>(i: &'a [u8], chord: &mut Chord) -> IResult<&'a [u8], ()> {
    let (i, name) = parse_int_byte_sized_string(i)?;
    chord.name = name;
    let (mut i, first_fret) = parse_int(i)?;
    chord.first_fret = first_fret;
    if first_fret != 0 {
        for index in 0..6 {
            let (inner, fret) = parse_int(i)?;
            i = inner;
            if index < chord.strings.len() {
                chord.strings[index] = fret;
            }
        }
    }
    Ok((i, ()))
}

/// New-layout chord as version 3 stores it: harmony described in
/// integers, a fixed 22-byte name field, and up to two barres.
fn parse_new_chord<'a>(i: &'a [u8], chord: &mut Chord) -> IResult<&'a [u8], ()> {
    let (i, sharp) = parse_bool(i)?;
    chord.sharp = Some(sharp);
    let (i, ()) = skip(i, 3)?;
    let (i, root) = parse_int(i)?;
    chord.root = Some(PitchClass::from_semitone(root.rem_euclid(12) as i8));
    let (i, kind) = parse_int(i)?;
    chord.kind = Some(kind as u8);
    let (i, extension) = parse_int(i)?;
    chord.extension = Some(extension as u8);
    let (i, bass) = parse_int(i)?;
    chord.bass = Some(PitchClass::from_semitone(bass.rem_euclid(12) as i8));
    let (i, tonality) = parse_int(i)?;
    chord.tonality = Some(tonality as u8);
    let (i, add) = parse_bool(i)?;
    chord.add = Some(add);
    let (i, (name, name_padding)) = parse_padded_byte_size_string(22)(i)?;
    chord.name = name;
    chord.name_padding = name_padding;
    let (i, fifth) = parse_int(i)?;
    chord.fifth = Some(fifth as u8);
    let (i, ninth) = parse_int(i)?;
    chord.ninth = Some(ninth as u8);
    let (i, eleventh) = parse_int(i)?;
    chord.eleventh = Some(eleventh as u8);
    let (mut i, first_fret) = parse_int(i)?;
    chord.first_fret = first_fret;
    for index in 0..6 {
        let (inner, fret) = parse_int(i)?;
        i = inner;
        if index < chord.strings.len() {
            chord.strings[index] = fret;
        }
    }
    let (i, barre_count) = parse_int(i)?;
    let (i, barre_frets) = count(parse_int, 2).parse(i)?;
    let (i, barre_starts) = count(parse_int, 2).parse(i)?;
    let (i, barre_ends) = count(parse_int, 2).parse(i)?;
    chord.barres = barre_frets
        .iter()
        .zip(&barre_starts)
        .zip(&barre_ends)
        .take(barre_count.max(0) as usize)
        .map(|((&fret, &start), &end)| Barre { fret, start, end })
        .collect();
    let (i, omissions) = count(parse_bool, 7).parse(i)?;
    chord.omissions = omissions;
    let (i, ()) = skip(i, 1)?;
    Ok((i, ()))
}

/// Mix table change: seven signed bytes and a tempo integer, each -1
/// when unchanged, followed by a duration byte per changed parameter.
/// Version 4 appends an all-tracks flag byte.
pub fn parse_mix_table_change(
    version: GpVersion,
) -> impl FnMut(&[u8]) -> IResult<&[u8], MixTableChange> {
    move |i| {
        let (i, instrument) = parse_i8(i)?;
        let (i, volume) = parse_i8(i)?;
        let (i, balance) = parse_i8(i)?;
        let (i, chorus) = parse_i8(i)?;
        let (i, reverb) = parse_i8(i)?;
        let (i, phaser) = parse_i8(i)?;
        let (i, tremolo) = parse_i8(i)?;
        let (i, tempo) = parse_int(i)?;
        let item = |value: i32| {
            Some(MixTableItem {
                value,
                ..MixTableItem::default()
            })
        };
        let mut change = MixTableChange::default();
        if instrument >= 0 {
            change.instrument = item(i32::from(instrument));
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
            change.hide_tempo = false;
        }
        if version >= GpVersion::GP4 {
            let (inner, flags) = parse_i8(i)?;
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
        }
        Ok((i, change))
    }
}

/// Beat effects in the version 3 layout: one flag byte. Harmonic flags
/// land on the note effect template because this dialect applies them
/// to every note of the beat.
fn parse_beat_effects<'a>(
    effect: &'a mut BeatEffects,
    note_effect: &'a mut NoteEffect,
) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
    move |i| {
        let (mut i, flags) = parse_u8(i)?;
        note_effect.vibrato = flags & 0x01 != 0 || note_effect.vibrato;
        effect.vibrato = flags & 0x02 != 0 || effect.vibrato;
        effect.fade_in = flags & 0x10 != 0;
        if flags & 0x20 != 0 {
            let (inner, slap) = parse_u8(i)?;
            i = inner;
            effect.slap_effect = SlapEffect::from_byte(slap);
            if effect.slap_effect == SlapEffect::None {
                let (inner, bar) = parse_tremolo_bar(i)?;
                i = inner;
                effect.tremolo_bar = Some(bar);
            } else {
                let (inner, ()) = skip(i, 4)?;
                i = inner;
            }
        }
        if flags & 0x40 != 0 {
            let (inner, stroke) = parse_beat_stroke(i)?;
            i = inner;
            effect.stroke = stroke;
        }
        if flags & 0x04 != 0 {
            note_effect.harmonic = Some(HarmonicEffect::default());
        }
        if flags & 0x08 != 0 {
            note_effect.harmonic = Some(HarmonicEffect {
                kind: HarmonicType::Artificial,
                ..HarmonicEffect::default()
            });
        }
        Ok((i, ()))
    }
}

/// Note effects in the version 3 layout: one flag byte, then a bend
/// and a grace note when flagged.
fn parse_note_effects<'a>(effect: &'a mut NoteEffect) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
    move |i| {
        let (mut i, flags) = parse_u8(i)?;
        effect.hammer = flags & 0x02 != 0;
        effect.let_ring = flags & 0x08 != 0;
        if flags & 0x01 != 0 {
            let (inner, bend) = parse_bend(i)?;
            i = inner;
            effect.bend = bend;
        }
        if flags & 0x10 != 0 {
            let (inner, grace) = parse_grace(i)?;
            i = inner;
            effect.grace = Some(grace);
        }
        if flags & 0x04 != 0 {
            effect.slides = vec![SlideType::ShiftSlideTo];
        }
        Ok((i, ()))
    }
}

pub struct Gp3Parser {
    song: Song,
    tempo: i32,
}

impl Gp3Parser {
    pub const fn new(song: Song) -> Self {
        Self { song, tempo: 0 }
    }

    pub fn take_song(&mut self) -> Song {
        std::mem::take(&mut self.song)
    }

    /// Everything after the 30-byte version field: score information,
    /// triplet feel, tempo, key, channels, counts, headers, tracks and
    /// finally the measures in measure-major order.
    pub fn parse_song_data<'a>(&'a mut self, i: &'a [u8]) -> IResult<&'a [u8], ()> {
        let (i, song_info) = parse_song_info(self.song.version)(i)?;
        self.song.song_info = song_info;
        let (i, triplet_feel) = parse_bool(i)?;
        self.song.triplet_feel = Some(triplet_feel);
        let (i, tempo) = parse_int(i)?;
        log::debug!("Song tempo: {tempo}");
        self.song.tempo.value = tempo;
        self.tempo = tempo;
        let (i, key) = parse_int(i)?;
        self.song.key_signature = key as i8;
        let (i, midi_channels) = parse_midi_channels(i)?;
        self.song.midi_channels = midi_channels;
        let (i, (measure_count, track_count)) = (parse_int, parse_int).parse(i)?;
        log::debug!("Song has {measure_count} measures on {track_count} tracks");
        let feel = if triplet_feel {
            TripletFeel::Eighth
        } else {
            TripletFeel::None
        };
        let (i, measure_headers) = parse_measure_headers(measure_count, tempo, feel)(i)?;
        self.song.measure_headers = measure_headers;
        let (i, ()) = self.parse_tracks(track_count.max(0) as usize)(i)?;
        let (i, ()) = self.parse_measures()(i)?;
        Ok((i, ()))
    }

    fn parse_tracks(&mut self, track_count: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i| {
            let mut i = i;
            for number in 1..=track_count {
                let (inner, track) =
                    parse_track(number, &mut self.song.midi_channels, self.song.version)(i)?;
                i = inner;
                self.song.tracks.push(track);
            }
            Ok((i, ()))
        }
    }

    /// Measures come measure-major: for each header, one measure per
    /// track. The running start tick and tempo are recorded on the
    /// headers along the way.
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
            // the measure is registered before its beats so tie lookups
            // can scan the track up to the current position
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
            let (inner, duration) = parse_duration(flags)(i)?;
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
            let mut note_effect = NoteEffect::default();
            if flags & 0x08 != 0 {
                let (inner, ()) = parse_beat_effects(&mut beat.effect, &mut note_effect)(i)?;
                i = inner;
            }
            if flags & 0x10 != 0 {
                let (inner, change) = parse_mix_table_change(self.song.version)(i)?;
                i = inner;
                if let Some(tempo) = &change.tempo {
                    self.tempo = tempo.value;
                }
                beat.effect.mix_table_change = Some(change);
            }
            let (inner, ()) = self.parse_notes(track_index, voice_index, &mut beat, &note_effect)(i)?;
            i = inner;
            if let Some(measure) = self.song.tracks[track_index].measures.last_mut() {
                measure.voices[voice_index].beats.push(beat);
            }
            Ok((i, ()))
        }
    }

    /// One byte of string presence bits (string 1 on bit 6 down to
    /// string 7 on bit 0), then a note record per set bit.
    fn parse_notes<'a>(
        &'a mut self,
        track_index: usize,
        voice_index: usize,
        beat: &'a mut Beat,
        note_effect: &'a NoteEffect,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
        move |i| {
            let (mut i, string_flags) = parse_u8(i)?;
            let string_count = self.song.tracks[track_index].strings.len().min(7);
            for string_number in 1..=string_count as i8 {
                if string_flags & (1u8 << (7 - string_number)) != 0 {
                    let mut note = Note {
                        string: string_number,
                        effect: note_effect.clone(),
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
                    tied_note_value(&self.song.tracks, note.string, track_index, voice_index)
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
                let (inner, ()) = parse_note_effects(&mut note.effect)(i)?;
                i = inner;
            }
            Ok((i, ()))
        }
    }

}

/// Fret of the most recent note on the same string, scanning the same
/// voice backwards through the track. -1 when no note is found.
pub fn tied_note_value(
    tracks: &[Track],
    string: i8,
    track_index: usize,
    voice_index: usize,
) -> i16 {
    for measure in tracks[track_index].measures.iter().rev() {
        let Some(voice) = measure.voices.get(voice_index) else {
            continue;
        };
        for beat in voice.beats.iter().rev() {
            if beat.status != BeatStatus::Empty {
                for note in &beat.notes {
                    if note.string == string {
                        return note.value;
                    }
                }
            }
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_alternative_expands_to_bitmask() {
        assert_eq!(repeat_alternative_mask(2, &[]), 0b11);
        assert_eq!(repeat_alternative_mask(1, &[]), 0b01);
    }

    #[test]
    fn repeat_alternative_subtracts_existing_endings() {
        let headers = vec![
            MeasureHeader {
                repeat_open: true,
                ..MeasureHeader::default()
            },
            MeasureHeader {
                repeat_alternative: 0b01,
                ..MeasureHeader::default()
            },
        ];
        assert_eq!(repeat_alternative_mask(2, &headers), 0b10);
    }

    #[test]
    fn repeat_alternative_scan_stops_at_repeat_open() {
        let headers = vec![
            MeasureHeader {
                repeat_alternative: 0b01,
                ..MeasureHeader::default()
            },
            MeasureHeader {
                repeat_open: true,
                ..MeasureHeader::default()
            },
        ];
        assert_eq!(repeat_alternative_mask(1, &headers), 0b01);
    }

    #[test]
    fn duration_byte_is_an_exponent() {
        let (rest, duration) = parse_duration(0)(&[0]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(duration.value, 4);
        assert!(!duration.dotted);

        let (_rest, duration) = parse_duration(0x01)(&[-2i8 as u8]).unwrap();
        assert_eq!(duration.value, 1);
        assert!(duration.dotted);
    }

    #[test]
    fn duration_reads_flagged_tuplet() {
        let mut data = vec![1u8];
        data.extend_from_slice(&3i32.to_le_bytes());
        let (rest, duration) = parse_duration(0x20)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(duration.value, 8);
        assert_eq!(duration.tuplet, Tuplet::new(3, 2));
    }

    #[test]
    fn bend_points_are_rescaled() {
        let mut data = vec![1u8]; // bend
        data.extend_from_slice(&100i32.to_le_bytes());
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.push(0);
        data.extend_from_slice(&30i32.to_le_bytes());
        data.extend_from_slice(&50i32.to_le_bytes());
        data.push(1);
        let (rest, bend) = parse_bend(&data).unwrap();
        assert!(rest.is_empty());
        let bend = bend.unwrap();
        assert_eq!(bend.kind, BendType::Bend);
        assert_eq!(bend.value, 100);
        assert_eq!(bend.points[1].position, 6);
        assert_eq!(bend.points[1].value, 2);
        assert!(bend.points[1].vibrato);
    }

    #[test]
    fn bend_without_points_is_absent() {
        let mut data = vec![1u8];
        data.extend_from_slice(&100i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        let (_rest, bend) = parse_bend(&data).unwrap();
        assert!(bend.is_none());
    }

    #[test]
    fn grace_note_decodes_duration_and_dead_fret() {
        let (rest, grace) = parse_grace(&[-1i8 as u8, 2, 1, 2]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(grace.fret, -1);
        assert!(grace.is_dead);
        assert_eq!(grace.velocity, 31);
        assert_eq!(grace.duration, SIXTY_FOURTH);
        assert_eq!(grace.transition, GraceEffectTransition::Bend);
    }

    #[test]
    fn beat_stroke_prefers_up_direction() {
        let (_rest, stroke) = parse_beat_stroke(&[4, 3]).unwrap();
        assert_eq!(stroke.direction, BeatStrokeDirection::Up);
        assert_eq!(stroke.value, THIRTY_SECOND);

        let (_rest, stroke) = parse_beat_stroke(&[4, 0]).unwrap();
        assert_eq!(stroke.direction, BeatStrokeDirection::Down);
        assert_eq!(stroke.value, SIXTEENTH);

        let (_rest, stroke) = parse_beat_stroke(&[0, 0]).unwrap();
        assert_eq!(stroke, BeatStroke::default());
    }

    fn channel_table_bytes(percussion_instrument: i32) -> Vec<u8> {
        let mut data = Vec::new();
        for number in 0..64 {
            let instrument = if number == 9 { percussion_instrument } else { 24 };
            data.extend_from_slice(&instrument.to_le_bytes());
            data.extend_from_slice(&[13, 8, 0, 0, 0, 0]);
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn midi_channels_normalize_percussion_instrument() {
        let data = channel_table_bytes(-1);
        let (rest, channels) = parse_midi_channels(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(channels.len(), 64);
        assert_eq!(channels[9].instrument, 0);
        assert_eq!(channels[0].instrument, 24);
        assert_eq!(channels[0].volume, unpack_channel_param(13));
        assert_eq!(channels[0].balance, unpack_channel_param(8));
    }

    #[test]
    fn measure_headers_propagate_signatures() {
        let mut data = vec![0x03u8, 3, 8];
        data.push(0x00);
        let (rest, headers) = parse_measure_headers(2, 90, TripletFeel::None)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(headers[0].time_signature.numerator, 3);
        assert_eq!(headers[0].time_signature.denominator.value, 8);
        assert_eq!(headers[1].time_signature.numerator, 3);
        assert_eq!(headers[1].time_signature.denominator.value, 8);
        assert_eq!(headers[0].tempo, 90);
    }

    #[test]
    fn measure_header_reads_flagged_fields() {
        let mut data = vec![0x04 | 0x08 | 0x10 | 0x40u8];
        data.push(2); // repeat close
        data.push(1); // repeat alternative
        data.push(-1i8 as u8); // key root
        data.push(1); // minor
        let (rest, headers) = parse_measure_headers(1, 120, TripletFeel::Eighth)(&data).unwrap();
        assert!(rest.is_empty());
        let header = &headers[0];
        assert!(header.repeat_open);
        assert_eq!(header.repeat_close, 2);
        assert_eq!(header.repeat_alternative, 0b01);
        assert_eq!(header.key_signature, KeySignature::new(-1, true));
        assert_eq!(header.triplet_feel, TripletFeel::Eighth);
    }

    #[test]
    fn mix_table_reads_durations_for_changed_values() {
        let mut data = vec![-1i8 as u8, 10, -1i8 as u8, -1i8 as u8, -1i8 as u8, -1i8 as u8, -1i8 as u8];
        data.extend_from_slice(&140i32.to_le_bytes());
        data.push(4); // volume duration
        data.push(0); // tempo duration
        let (rest, change) = parse_mix_table_change(GpVersion::GP3)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            change.volume,
            Some(MixTableItem {
                value: 10,
                duration: 4,
                all_tracks: false
            })
        );
        assert!(change.instrument.is_none());
        assert_eq!(change.tempo.map(|t| t.value), Some(140));
    }

    #[test]
    fn mix_table_reads_gp4_all_tracks_flags() {
        let mut data = vec![-1i8 as u8, 10, -1i8 as u8, -1i8 as u8, -1i8 as u8, -1i8 as u8, -1i8 as u8];
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.push(4); // volume duration
        data.push(0x01); // all-tracks flags
        let (rest, change) = parse_mix_table_change(GpVersion::GP4)(&data).unwrap();
        assert!(rest.is_empty());
        assert!(change.volume.unwrap().all_tracks);
        assert!(change.tempo.is_none());
    }

    #[test]
    fn old_chord_reads_track_strings_only() {
        let mut chord = Chord {
            length: 6,
            strings: vec![-1; 6],
            ..Chord::default()
        };
        let mut data = Vec::new();
        data.extend_from_slice(&3i32.to_le_bytes());
        data.push(2);
        data.extend_from_slice(b"C5");
        data.extend_from_slice(&1i32.to_le_bytes());
        for fret in [3i32, 5, 5, -1, -1, -1] {
            data.extend_from_slice(&fret.to_le_bytes());
        }
        let (rest, ()) = parse_old_chord(&data, &mut chord).unwrap();
        assert!(rest.is_empty());
        assert_eq!(chord.name, "C5");
        assert_eq!(chord.first_fret, 1);
        assert_eq!(chord.strings, vec![3, 5, 5, -1, -1, -1]);
    }

    #[test]
    fn tremolo_bar_dip_synthesizes_three_points() {
        let data = 100i32.to_le_bytes();
        let (_rest, bar) = parse_tremolo_bar(&data).unwrap();
        assert_eq!(bar.kind, BendType::Dip);
        assert_eq!(bar.value, 100);
        assert_eq!(bar.points.len(), 3);
        assert_eq!(bar.points[1].position, 6);
        assert_eq!(bar.points[1].value, -4);
    }
}
