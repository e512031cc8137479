//! Writer for the version 3 dialect.
//!
//! The record writers shared by the later dialects (score information,
//! channels, colors, headers, tracks, bends, graces, strokes, mix
//! tables) live here as free functions; [`write_song`] drives the full
//! version 3 byte image.

use crate::error::TabError;
use crate::model::duration::{
    Duration, EIGHTH, HUNDRED_TWENTY_EIGHTH, QUARTER, SIXTEENTH, SIXTY_FOURTH, THIRTY_SECOND,
};
use crate::model::song::{
    BEND_EFFECT_MAX_POSITION, Beat, BeatStroke, BeatStrokeDirection, BendEffect, Chord, Color,
    DEFAULT_VELOCITY, GP_BEND_POSITION, GP_BEND_SEMITONE, GpVersion, GraceEffect, HarmonicType,
    Marker, MeasureHeader, MidiChannel, MixTableChange, Note, NoteType, SEMITONE_LENGTH,
    SlapEffect, SlideType, Song, Track, pack_channel_param, pack_velocity,
};
use crate::writer::primitive_writer::ByteWriter;

/// Reject durations the dialect cannot put on the wire.
pub fn check_duration(duration: &Duration, version: GpVersion) -> Result<(), TabError> {
    if duration.double_dotted {
        return Err(TabError::UnsupportedFeature(
            "double-dotted durations are decode-only".to_string(),
        ));
    }
    if !duration.tuplet.is_default() {
        if !duration.tuplet.is_supported() {
            return Err(TabError::UnsupportedFeature(format!(
                "tuplet {}:{} is not representable",
                duration.tuplet.enters, duration.tuplet.times
            )));
        }
        if version < GpVersion::GP5 && duration.tuplet.enters == 13 {
            return Err(TabError::UnsupportedFeature(
                "13-tuplets require the version 5 dialect".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn write_song_info(w: &mut ByteWriter, song: &Song, version: GpVersion) -> Result<(), TabError> {
    let info = &song.song_info;
    w.write_int_byte_size_string(&info.name)?;
    w.write_int_byte_size_string(&info.subtitle)?;
    w.write_int_byte_size_string(&info.artist)?;
    w.write_int_byte_size_string(&info.album)?;
    w.write_int_byte_size_string(&info.words)?;
    if version >= GpVersion::GP5 {
        w.write_int_byte_size_string(info.music.as_deref().unwrap_or_default())?;
    }
    w.write_int_byte_size_string(&info.copyright)?;
    w.write_int_byte_size_string(&info.tab_author)?;
    w.write_int_byte_size_string(&info.instructions)?;
    w.write_i32(info.notices.len() as i32);
    for notice in &info.notices {
        w.write_int_byte_size_string(notice)?;
    }
    Ok(())
}

pub fn write_color(w: &mut ByteWriter, color: Color) {
    w.write_u8(color.r);
    w.write_u8(color.g);
    w.write_u8(color.b);
    w.write_placeholder(1);
}

pub fn write_marker(w: &mut ByteWriter, marker: &Marker) -> Result<(), TabError> {
    w.write_int_byte_size_string(&marker.title)?;
    write_color(w, marker.color);
    Ok(())
}

/// The 64-entry channel table. Percussion channels with instrument 0
/// go back to the wire as -1, undoing the read normalization.
pub fn write_midi_channels(w: &mut ByteWriter, channels: &[MidiChannel]) {
    for number in 0..64u8 {
        let default;
        let channel = match channels.get(number as usize) {
            Some(channel) => channel,
            None => {
                default = MidiChannel::new(number);
                &default
            }
        };
        if channel.is_percussion() && channel.instrument == 0 {
            w.write_i32(-1);
        } else {
            w.write_i32(channel.instrument);
        }
        w.write_i8(pack_channel_param(channel.volume));
        w.write_i8(pack_channel_param(channel.balance));
        w.write_i8(pack_channel_param(channel.chorus));
        w.write_i8(pack_channel_param(channel.reverb));
        w.write_i8(pack_channel_param(channel.phaser));
        w.write_i8(pack_channel_param(channel.tremolo));
        // trailing bytes kept for version 3.0 compatibility
        w.write_placeholder(2);
    }
}

/// Collapse an alternate-ending bitmask back to the stored byte: the
/// number of the ending after the last contiguous covered one.
pub fn pack_repeat_alternative(mask: u8) -> u8 {
    let mut last = 0u8;
    let mut first_one = false;
    for bit in 0..=8u8 {
        last = bit;
        if u16::from(mask) & (1u16 << bit) != 0 {
            first_one = true;
        } else if first_one {
            break;
        }
    }
    last
}

fn pack_measure_header_flags(header: &MeasureHeader, previous: Option<&MeasureHeader>) -> u8 {
    let mut flags = 0u8;
    match previous {
        Some(previous) => {
            if header.time_signature.numerator != previous.time_signature.numerator {
                flags |= 0x01;
            }
            if header.time_signature.denominator.value != previous.time_signature.denominator.value
            {
                flags |= 0x02;
            }
            if header.key_signature != previous.key_signature {
                flags |= 0x40;
            }
        }
        None => flags |= 0x01 | 0x02 | 0x40,
    }
    if header.repeat_open {
        flags |= 0x04;
    }
    if header.repeat_close > -1 {
        flags |= 0x08;
    }
    if header.repeat_alternative != 0 {
        flags |= 0x10;
    }
    if header.marker.is_some() {
        flags |= 0x20;
    }
    if header.double_bar {
        flags |= 0x80;
    }
    flags
}

/// Measure headers of the version 3 and 4 dialects: one flag byte per
/// header, a field only when it differs from the previous header.
pub fn write_measure_headers(
    w: &mut ByteWriter,
    headers: &[MeasureHeader],
) -> Result<(), TabError> {
    let mut previous: Option<&MeasureHeader> = None;
    for header in headers {
        let flags = pack_measure_header_flags(header, previous);
        w.write_u8(flags);
        if flags & 0x01 != 0 {
            w.write_i8(header.time_signature.numerator);
        }
        if flags & 0x02 != 0 {
            w.write_i8(header.time_signature.denominator.value as i8);
        }
        if flags & 0x08 != 0 {
            w.write_i8(header.repeat_close);
        }
        if flags & 0x10 != 0 {
            w.write_u8(pack_repeat_alternative(header.repeat_alternative));
        }
        if flags & 0x20 != 0 {
            if let Some(marker) = &header.marker {
                write_marker(w, marker)?;
            }
        }
        if flags & 0x40 != 0 {
            w.write_i8(header.key_signature.key);
            w.write_i8(i8::from(header.key_signature.is_minor));
        }
        previous = Some(header);
    }
    Ok(())
}

fn pack_track_flags(track: &Track, version: GpVersion) -> u8 {
    let mut flags = 0u8;
    if track.percussion {
        flags |= 0x01;
    }
    if track.twelve_stringed {
        flags |= 0x02;
    }
    if track.banjo {
        flags |= 0x04;
    }
    if version >= GpVersion::GP5 {
        if track.visible {
            flags |= 0x08;
        }
        if track.solo {
            flags |= 0x10;
        }
        if track.mute {
            flags |= 0x20;
        }
        if track.use_rse {
            flags |= 0x40;
        }
        if track.indicate_tuning {
            flags |= 0x80;
        }
    }
    flags
}

/// A track record: flags, the fixed 40-byte name field, tuning table,
/// port, one-based channel pair, frets, capo offset and color.
pub fn write_track(w: &mut ByteWriter, track: &Track, version: GpVersion) -> Result<(), TabError> {
    w.write_u8(pack_track_flags(track, version));
    w.write_padded_string(&track.name, &track.name_padding, 40)?;
    w.write_i32(track.strings.len() as i32);
    for index in 0..7 {
        w.write_i32(track.strings.get(index).copied().unwrap_or(0));
    }
    w.write_i32(track.midi_port);
    w.write_i32(track.channel_index + 1);
    w.write_i32(track.effect_channel + 1);
    w.write_i32(track.fret_count);
    w.write_i32(track.offset);
    write_color(w, track.color);
    Ok(())
}

/// The duration byte is the note value's power-of-two exponent less
/// two; the tuplet integer follows only when the beat flags announce
/// one.
pub fn write_duration(w: &mut ByteWriter, duration: &Duration, flags: u8) {
    w.write_i8(duration.value.trailing_zeros() as i8 - 2);
    if flags & 0x20 != 0 {
        w.write_i32(i32::from(duration.tuplet.enters));
    }
}

/// A bend curve, positions rescaled from the 0..=12 range back to
/// sixtieths and values back to quarter-tone units.
pub fn write_bend(w: &mut ByteWriter, bend: &BendEffect) {
    w.write_i8(bend.kind.to_i8());
    w.write_i32(bend.value);
    w.write_i32(bend.points.len() as i32);
    for point in &bend.points {
        w.write_i32(point.position * GP_BEND_POSITION / BEND_EFFECT_MAX_POSITION);
        w.write_i32(point.value * GP_BEND_SEMITONE / SEMITONE_LENGTH);
        w.write_bool(point.vibrato);
    }
}

/// A version 3/4 grace note: fret, packed dynamic, duration exponent
/// and transition.
pub fn write_grace(w: &mut ByteWriter, grace: &GraceEffect) {
    w.write_i8(grace.fret);
    w.write_u8(pack_velocity(grace.velocity) as u8);
    w.write_u8((8 - (16 - grace.duration.leading_zeros())) as u8);
    w.write_i8(grace.transition.to_i8());
}

pub const fn stroke_speed_byte(value: u16) -> i8 {
    match value {
        HUNDRED_TWENTY_EIGHTH => 1,
        SIXTY_FOURTH => 2,
        THIRTY_SECOND => 3,
        SIXTEENTH => 4,
        EIGHTH => 5,
        QUARTER => 6,
        _ => 1,
    }
}

/// Down speed then up speed, zero for the unused direction.
pub fn write_beat_stroke(w: &mut ByteWriter, stroke: &BeatStroke) {
    let (down, up) = match stroke.direction {
        BeatStrokeDirection::Up => (0, stroke_speed_byte(stroke.value)),
        BeatStrokeDirection::Down => (stroke_speed_byte(stroke.value), 0),
        BeatStrokeDirection::None => (0, 0),
    };
    w.write_i8(down);
    w.write_i8(up);
}

pub fn write_old_chord(w: &mut ByteWriter, chord: &Chord) -> Result<(), TabError> {
    w.write_int_byte_size_string(&chord.name)?;
    w.write_i32(chord.first_fret);
    if chord.first_fret != 0 {
        for index in 0..6 {
            w.write_i32(chord.strings.get(index).copied().unwrap_or(-1));
        }
    }
    Ok(())
}

/// The version 3 new-layout chord: harmony integers, the fixed
/// 22-byte name field and up to two barres.
fn write_new_chord(w: &mut ByteWriter, chord: &Chord) -> Result<(), TabError> {
    w.write_bool(chord.sharp.unwrap_or(false));
    w.write_placeholder(3);
    w.write_i32(chord.root.map_or(0, |p| i32::from(p.just)));
    w.write_i32(chord.kind.map_or(0, i32::from));
    w.write_i32(chord.extension.map_or(0, i32::from));
    w.write_i32(chord.bass.map_or(0, |p| i32::from(p.just)));
    w.write_i32(chord.tonality.map_or(0, i32::from));
    w.write_bool(chord.add.unwrap_or(false));
    w.write_padded_string(&chord.name, &chord.name_padding, 22)?;
    w.write_i32(chord.fifth.map_or(0, i32::from));
    w.write_i32(chord.ninth.map_or(0, i32::from));
    w.write_i32(chord.eleventh.map_or(0, i32::from));
    w.write_i32(chord.first_fret);
    for index in 0..6 {
        w.write_i32(chord.strings.get(index).copied().unwrap_or(-1));
    }
    let barres = &chord.barres[..chord.barres.len().min(2)];
    w.write_i32(barres.len() as i32);
    for index in 0..2 {
        w.write_i32(barres.get(index).map_or(0, |b| b.fret));
    }
    for index in 0..2 {
        w.write_i32(barres.get(index).map_or(0, |b| b.start));
    }
    for index in 0..2 {
        w.write_i32(barres.get(index).map_or(0, |b| b.end));
    }
    for index in 0..7 {
        w.write_bool(chord.omissions.get(index).copied().unwrap_or(true));
    }
    w.write_placeholder(1);
    Ok(())
}

pub fn write_chord(w: &mut ByteWriter, chord: &Chord) -> Result<(), TabError> {
    w.write_bool(chord.new_format);
    if chord.new_format {
        write_new_chord(w, chord)
    } else {
        write_old_chord(w, chord)
    }
}

/// The version 3/4 mix table: seven signed bytes and a tempo integer,
/// -1 for unchanged parameters, one duration byte per changed one.
/// Version 4 appends the all-tracks flag byte.
pub fn write_mix_table_change(
    w: &mut ByteWriter,
    change: &MixTableChange,
    version: GpVersion,
) -> Result<(), TabError> {
    if version < GpVersion::GP4 {
        let any_all_tracks = [
            &change.volume,
            &change.balance,
            &change.chorus,
            &change.reverb,
            &change.phaser,
            &change.tremolo,
        ]
        .iter()
        .any(|item| item.is_some_and(|i| i.all_tracks));
        if any_all_tracks {
            return Err(TabError::UnsupportedFeature(
                "all-tracks mix changes require the version 4 dialect".to_string(),
            ));
        }
    }
    if change.wah.is_some() || change.rse.is_some() {
        return Err(TabError::UnsupportedFeature(
            "wah and RSE mix changes require the version 5 dialect".to_string(),
        ));
    }
    if change.tempo_name.as_deref().is_some_and(|name| !name.is_empty()) || change.hide_tempo {
        return Err(TabError::UnsupportedFeature(
            "named and hidden tempo changes require the version 5 dialect".to_string(),
        ));
    }
    w.write_i8(change.instrument.map_or(-1, |item| item.value as i8));
    w.write_i8(change.volume.map_or(-1, |item| item.value as i8));
    w.write_i8(change.balance.map_or(-1, |item| item.value as i8));
    w.write_i8(change.chorus.map_or(-1, |item| item.value as i8));
    w.write_i8(change.reverb.map_or(-1, |item| item.value as i8));
    w.write_i8(change.phaser.map_or(-1, |item| item.value as i8));
    w.write_i8(change.tremolo.map_or(-1, |item| item.value as i8));
    w.write_i32(change.tempo.map_or(-1, |item| item.value));
    for item in [
        &change.volume,
        &change.balance,
        &change.chorus,
        &change.reverb,
        &change.phaser,
        &change.tremolo,
        &change.tempo,
    ]
    .into_iter()
    .flatten()
    {
        w.write_i8(item.duration);
    }
    if version >= GpVersion::GP4 {
        let mut flags = 0u8;
        let items = [
            &change.volume,
            &change.balance,
            &change.chorus,
            &change.reverb,
            &change.phaser,
            &change.tremolo,
        ];
        for (index, item) in items.iter().enumerate() {
            if item.is_some_and(|i| i.all_tracks) {
                flags |= 1 << index;
            }
        }
        w.write_i8(flags as i8);
    }
    Ok(())
}

/// Note order on the wire: ascending string number, announced by the
/// string presence bitmask.
pub fn sorted_note_indices(notes: &[Note]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..notes.len()).collect();
    indices.sort_by_key(|&index| notes[index].string);
    indices
}

pub fn string_flags(notes: &[Note]) -> u8 {
    notes
        .iter()
        .fold(0u8, |flags, note| flags | 1 << (7 - note.string))
}

fn beat_flags(beat: &Beat, needs_effects: bool, needs_mix: bool) -> u8 {
    let mut flags = 0u8;
    if beat.duration.dotted {
        flags |= 0x01;
    }
    if beat.effect.chord.is_some() {
        flags |= 0x02;
    }
    if beat.text.is_some() {
        flags |= 0x04;
    }
    if needs_effects {
        flags |= 0x08;
    }
    if needs_mix {
        flags |= 0x10;
    }
    if !beat.duration.tuplet.is_default() {
        flags |= 0x20;
    }
    if beat.status != crate::model::song::BeatStatus::Normal {
        flags |= 0x40;
    }
    flags
}

/// Version 3 beat effects: a single flag byte covering beat vibrato,
/// per-note vibrato and harmonic presence, fade-in, slap/tremolo and
/// stroke.
fn write_beat_effects(w: &mut ByteWriter, beat: &Beat) -> Result<(), TabError> {
    let effect = &beat.effect;
    if effect.has_rasgueado || effect.pick_stroke != BeatStrokeDirection::None {
        return Err(TabError::UnsupportedFeature(
            "rasgueado and pick strokes require the version 4 dialect".to_string(),
        ));
    }
    let note_vibrato = beat.notes.iter().any(|note| note.effect.vibrato);
    let natural = beat.notes.iter().any(|note| {
        note.effect
            .harmonic
            .as_ref()
            .is_some_and(|h| h.kind == HarmonicType::Natural)
    });
    let artificial = beat.notes.iter().any(|note| {
        note.effect
            .harmonic
            .as_ref()
            .is_some_and(|h| h.kind != HarmonicType::Natural)
    });
    let mut flags = 0u8;
    if note_vibrato {
        flags |= 0x01;
    }
    if effect.vibrato {
        flags |= 0x02;
    }
    if natural {
        flags |= 0x04;
    }
    if artificial {
        flags |= 0x08;
    }
    if effect.fade_in {
        flags |= 0x10;
    }
    if effect.slap_effect != SlapEffect::None || effect.tremolo_bar.is_some() {
        flags |= 0x20;
    }
    if effect.stroke != BeatStroke::default() {
        flags |= 0x40;
    }
    w.write_u8(flags);
    if flags & 0x20 != 0 {
        w.write_u8(effect.slap_effect.to_byte());
        w.write_i32(effect.tremolo_bar.as_ref().map_or(0, |bar| bar.value));
    }
    if flags & 0x40 != 0 {
        write_beat_stroke(w, &effect.stroke);
    }
    Ok(())
}

fn beat_needs_effects(beat: &Beat) -> bool {
    !beat.effect.is_default()
        || beat.notes.iter().any(|note| note.effect.vibrato)
        || beat.notes.iter().any(|note| note.effect.harmonic.is_some())
}

/// What the version 3 note effect record can carry.
fn check_note_effect(note: &Note) -> Result<(), TabError> {
    let effect = &note.effect;
    if effect.staccato
        || effect.palm_mute
        || effect.trill.is_some()
        || effect.tremolo_picking.is_some()
    {
        return Err(TabError::UnsupportedFeature(
            "staccato, palm mute, trill and tremolo picking require the version 4 dialect"
                .to_string(),
        ));
    }
    for slide in &effect.slides {
        if !matches!(slide, SlideType::ShiftSlideTo | SlideType::LegatoSlideTo) {
            return Err(TabError::UnsupportedFeature(
                "only shift and legato slides fit the version 3 dialect".to_string(),
            ));
        }
    }
    if effect.grace.is_some_and(|grace| grace.is_on_beat) {
        return Err(TabError::UnsupportedFeature(
            "on-beat grace notes require the version 5 dialect".to_string(),
        ));
    }
    Ok(())
}

fn note_needs_effects(note: &Note) -> bool {
    let effect = &note.effect;
    effect.bend.is_some()
        || effect.hammer
        || effect.let_ring
        || effect.grace.is_some()
        || !effect.slides.is_empty()
}

fn write_note_effects(w: &mut ByteWriter, note: &Note) {
    let effect = &note.effect;
    let mut flags = 0u8;
    if effect.bend.is_some() {
        flags |= 0x01;
    }
    if effect.hammer {
        flags |= 0x02;
    }
    if !effect.slides.is_empty() {
        flags |= 0x04;
    }
    if effect.let_ring {
        flags |= 0x08;
    }
    if effect.grace.is_some() {
        flags |= 0x10;
    }
    w.write_u8(flags);
    if let Some(bend) = &effect.bend {
        write_bend(w, bend);
    }
    if let Some(grace) = &effect.grace {
        write_grace(w, grace);
    }
}

fn write_note(w: &mut ByteWriter, note: &Note) -> Result<(), TabError> {
    check_note_effect(note)?;
    if note.swap_accidentals || (note.duration_percent - 1.0).abs() >= 1e-3 {
        return Err(TabError::UnsupportedFeature(
            "swapped accidentals and duration percent require the version 5 dialect".to_string(),
        ));
    }
    let needs_effects = note_needs_effects(note);
    let mut flags = 0u8;
    if note.independent_duration.is_some() {
        flags |= 0x01;
    }
    if note.effect.heavy_accentuated {
        flags |= 0x02;
    }
    if note.effect.ghost_note {
        flags |= 0x04;
    }
    if needs_effects {
        flags |= 0x08;
    }
    if note.velocity != DEFAULT_VELOCITY {
        flags |= 0x10;
    }
    flags |= 0x20;
    if note.effect.is_fingering() {
        flags |= 0x80;
    }
    w.write_u8(flags);
    w.write_u8(note.kind.to_byte());
    if let Some((value, tuplet)) = note.independent_duration {
        w.write_i8(value);
        w.write_i8(tuplet);
    }
    if flags & 0x10 != 0 {
        w.write_i8(pack_velocity(note.velocity));
    }
    let fret = if note.kind == NoteType::Tie {
        0
    } else {
        note.value as i8
    };
    w.write_i8(fret);
    if flags & 0x80 != 0 {
        w.write_i8(note.effect.left_hand_finger.to_i8());
        w.write_i8(note.effect.right_hand_finger.to_i8());
    }
    if needs_effects {
        write_note_effects(w, note);
    }
    Ok(())
}

fn write_beat(w: &mut ByteWriter, beat: &Beat, version: GpVersion) -> Result<(), TabError> {
    check_duration(&beat.duration, version)?;
    let needs_effects = beat_needs_effects(beat);
    let needs_mix = beat.effect.mix_table_change.is_some();
    let flags = beat_flags(beat, needs_effects, needs_mix);
    w.write_u8(flags);
    if flags & 0x40 != 0 {
        w.write_u8(beat.status.to_byte());
    }
    write_duration(w, &beat.duration, flags);
    if let Some(chord) = &beat.effect.chord {
        write_chord(w, chord)?;
    }
    if let Some(text) = &beat.text {
        w.write_int_byte_size_string(text)?;
    }
    if needs_effects {
        write_beat_effects(w, beat)?;
    }
    if let Some(change) = &beat.effect.mix_table_change {
        write_mix_table_change(w, change, version)?;
    }
    w.write_u8(string_flags(&beat.notes));
    for index in sorted_note_indices(&beat.notes) {
        write_note(w, &beat.notes[index])?;
    }
    Ok(())
}

fn write_measures(w: &mut ByteWriter, song: &Song) -> Result<(), TabError> {
    for measure_index in 0..song.measure_headers.len() {
        for track in &song.tracks {
            let measure = &track.measures[measure_index];
            if measure.voices.get(1).is_some_and(|voice| !voice.beats.is_empty()) {
                return Err(TabError::UnsupportedFeature(
                    "a second voice requires the version 5 dialect".to_string(),
                ));
            }
            let voice = &measure.voices[0];
            w.write_i32(voice.beats.len() as i32);
            for beat in &voice.beats {
                write_beat(w, beat, GpVersion::GP3)?;
            }
        }
    }
    Ok(())
}

/// The complete version 3 byte image for `song`.
pub fn write_song(song: &Song) -> Result<Vec<u8>, TabError> {
    let mut w = ByteWriter::new();
    w.write_byte_size_string(GpVersion::GP3.version_string(), 30)?;
    write_song_info(&mut w, song, GpVersion::GP3)?;
    w.write_bool(song.triplet_feel.unwrap_or(false));
    w.write_i32(song.tempo.value);
    w.write_i32(i32::from(song.key_signature));
    write_midi_channels(&mut w, &song.midi_channels);
    w.write_i32(song.measure_headers.len() as i32);
    w.write_i32(song.tracks.len() as i32);
    write_measure_headers(&mut w, &song.measure_headers)?;
    for track in &song.tracks {
        write_track(&mut w, track, GpVersion::GP3)?;
    }
    write_measures(&mut w, song)?;
    w.write_i32(0);
    log::debug!("Wrote {} bytes of version 3 data", w.len());
    Ok(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::duration::Tuplet;
    use crate::model::song::{KeySignature, TripletFeel};
    use crate::parser::gp3_parser;

    #[test]
    fn repeat_alternative_packs_back_to_last_ending() {
        assert_eq!(pack_repeat_alternative(0b01), 1);
        assert_eq!(pack_repeat_alternative(0b11), 2);
        assert_eq!(pack_repeat_alternative(0b10), 2);
    }

    #[test]
    fn measure_headers_round_trip() {
        let headers = vec![
            MeasureHeader {
                repeat_open: true,
                ..MeasureHeader::default()
            },
            MeasureHeader {
                repeat_close: 2,
                repeat_alternative: 0b01,
                key_signature: KeySignature::new(-2, true),
                double_bar: true,
                ..MeasureHeader::default()
            },
        ];
        let mut w = ByteWriter::new();
        write_measure_headers(&mut w, &headers).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) =
            gp3_parser::parse_measure_headers(2, 120, TripletFeel::None)(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, headers);
    }

    #[test]
    fn track_round_trips_with_name_padding() {
        let track = Track {
            name: "Guitar".to_string(),
            name_padding: vec![0xAA; 34],
            strings: vec![64, 59, 55, 50, 45, 40],
            ..Track::default()
        };
        let mut w = ByteWriter::new();
        write_track(&mut w, &track, GpVersion::GP3).unwrap();
        let bytes = w.into_bytes();
        let mut channels = MidiChannel::default_channels();
        let (rest, parsed) = gp3_parser::parse_track(1, &mut channels, GpVersion::GP3)(&bytes)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.name, track.name);
        assert_eq!(parsed.name_padding, track.name_padding);
        assert_eq!(parsed.strings, track.strings);
        assert_eq!(parsed.effect_channel, track.effect_channel);
    }

    #[test]
    fn bend_round_trips_through_rescaling() {
        let bend = BendEffect {
            kind: crate::model::song::BendType::Bend,
            value: 100,
            points: vec![
                crate::model::song::BendPoint {
                    position: 0,
                    value: 0,
                    vibrato: false,
                },
                crate::model::song::BendPoint {
                    position: 6,
                    value: 2,
                    vibrato: true,
                },
            ],
        };
        let mut w = ByteWriter::new();
        write_bend(&mut w, &bend);
        let bytes = w.into_bytes();
        let (rest, parsed) = gp3_parser::parse_bend(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, Some(bend));
    }

    #[test]
    fn mix_table_round_trips() {
        let change = MixTableChange {
            volume: Some(crate::model::song::MixTableItem {
                value: 10,
                duration: 4,
                all_tracks: false,
            }),
            tempo: Some(crate::model::song::MixTableItem {
                value: 140,
                duration: 0,
                all_tracks: false,
            }),
            ..MixTableChange::default()
        };
        let mut w = ByteWriter::new();
        write_mix_table_change(&mut w, &change, GpVersion::GP3).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) =
            gp3_parser::parse_mix_table_change(GpVersion::GP3)(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, change);
    }

    #[test]
    fn thirteen_tuplet_is_rejected_before_version_5() {
        let duration = Duration {
            tuplet: Tuplet::new(13, 8),
            ..Duration::default()
        };
        let err = check_duration(&duration, GpVersion::GP4).unwrap_err();
        assert!(matches!(err, TabError::UnsupportedFeature(_)));
        assert!(check_duration(&duration, GpVersion::GP5).is_ok());
    }

    #[test]
    fn double_dotted_is_refused_on_write() {
        let duration = Duration {
            double_dotted: true,
            ..Duration::default()
        };
        let err = check_duration(&duration, GpVersion::GP5_10).unwrap_err();
        assert!(matches!(err, TabError::UnsupportedFeature(_)));
    }
}
