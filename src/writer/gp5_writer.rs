//! Writer for the version 5 dialect.
//!
//! Mirrors the version 5 reader byte for byte, including the reserved
//! regions: inter-header blanks, track padding, the three reserved RSE
//! integers and the revision-dependent effect number encoding.

use crate::error::TabError;
use crate::model::song::{
    Beat, Directions, GpVersion, Lyrics, MixTableChange, Note, NoteType, Octave, PageSetup,
    RseEqualizer, RseInstrument, RseMasterEffect, Song, Track, TrackRse, TupletBracket,
    VoiceDirection, DEFAULT_VELOCITY, pack_velocity,
};
use crate::writer::gp3_writer;
use crate::writer::gp4_writer;
use crate::writer::primitive_writer::ByteWriter;

/// Default notation settings word: tablature and standard notation on.
const DEFAULT_TRACK_SETTINGS: i16 = 0x0003;

fn write_equalizer(w: &mut ByteWriter, equalizer: Option<&RseEqualizer>, bands: usize) {
    for index in 0..bands {
        let knob = equalizer.and_then(|eq| eq.knobs.get(index).copied()).unwrap_or(0);
        w.write_i8(knob);
    }
    w.write_i8(equalizer.map_or(0, |eq| eq.gain));
}

/// The RSE master effect block, revision 5.10 only.
fn write_master_effect(w: &mut ByteWriter, effect: Option<&RseMasterEffect>) {
    let volume = effect.map_or(100, |e| e.volume);
    w.write_i32(volume);
    w.write_i32(0);
    write_equalizer(w, effect.and_then(|e| e.equalizer.as_ref()), 10);
}

fn write_page_setup(w: &mut ByteWriter, setup: &PageSetup) -> Result<(), TabError> {
    w.write_i32(setup.page_size.x);
    w.write_i32(setup.page_size.y);
    w.write_i32(setup.page_margin.left);
    w.write_i32(setup.page_margin.right);
    w.write_i32(setup.page_margin.top);
    w.write_i32(setup.page_margin.bottom);
    w.write_i32(setup.score_size_percent);
    w.write_i16(setup.header_and_footer);
    w.write_int_byte_size_string(&setup.title)?;
    w.write_int_byte_size_string(&setup.subtitle)?;
    w.write_int_byte_size_string(&setup.artist)?;
    w.write_int_byte_size_string(&setup.album)?;
    w.write_int_byte_size_string(&setup.words)?;
    w.write_int_byte_size_string(&setup.music)?;
    w.write_int_byte_size_string(&setup.word_and_music)?;
    let (first, second) = setup
        .copyright
        .split_once('\n')
        .unwrap_or((setup.copyright.as_str(), ""));
    w.write_int_byte_size_string(first)?;
    w.write_int_byte_size_string(second)?;
    w.write_int_byte_size_string(&setup.page_number)?;
    Ok(())
}

fn write_directions(w: &mut ByteWriter, directions: Option<&Directions>) {
    let array = directions.copied().unwrap_or_default().as_array();
    for sign in array {
        w.write_i16(sign);
    }
}

fn write_rse_instrument(w: &mut ByteWriter, instrument: &RseInstrument, version: GpVersion) {
    w.write_i32(instrument.instrument);
    w.write_i32(instrument.unknown);
    w.write_i32(instrument.sound_bank);
    if version == GpVersion::GP5 {
        w.write_i16(instrument.effect_number as i16);
        w.write_placeholder(1);
    } else {
        w.write_i32(instrument.effect_number);
    }
}

fn write_rse_instrument_effect(
    w: &mut ByteWriter,
    instrument: Option<&RseInstrument>,
) -> Result<(), TabError> {
    w.write_int_byte_size_string(
        instrument.and_then(|i| i.effect.as_deref()).unwrap_or_default(),
    )?;
    w.write_int_byte_size_string(
        instrument
            .and_then(|i| i.effect_category.as_deref())
            .unwrap_or_default(),
    )?;
    Ok(())
}

fn write_track_rse(
    w: &mut ByteWriter,
    rse: Option<&TrackRse>,
    version: GpVersion,
) -> Result<(), TabError> {
    let default = TrackRse::default();
    let rse = rse.unwrap_or(&default);
    w.write_u8(rse.humanize);
    // three reserved integers and twelve reserved bytes
    w.write_i32(0);
    w.write_i32(0);
    w.write_i32(100);
    w.write_placeholder(12);
    write_rse_instrument(w, &rse.instrument, version);
    if version > GpVersion::GP5 {
        write_equalizer(w, rse.equalizer.as_ref(), 3);
        write_rse_instrument_effect(w, Some(&rse.instrument))?;
    }
    Ok(())
}

fn write_track(
    w: &mut ByteWriter,
    track: &Track,
    number: usize,
    song: &Song,
    version: GpVersion,
) -> Result<(), TabError> {
    if number == 1 || version == GpVersion::GP5 {
        w.write_placeholder(1);
    }
    gp3_writer::write_track(w, track, version)?;
    w.write_i16(track.settings_flags.unwrap_or(DEFAULT_TRACK_SETTINGS));
    w.write_u8(track.auto_accentuation.unwrap_or(0));
    let bank = usize::try_from(track.channel_index)
        .ok()
        .and_then(|index| song.midi_channels.get(index))
        .map_or(0, |channel| channel.bank);
    w.write_u8(bank);
    write_track_rse(w, track.rse.as_ref(), version)
}

fn write_measure_headers(w: &mut ByteWriter, song: &Song) -> Result<(), TabError> {
    let mut previous: Option<&crate::model::song::MeasureHeader> = None;
    for header in &song.measure_headers {
        let mut flags = 0u8;
        match previous {
            Some(prev) => {
                if header.time_signature.numerator != prev.time_signature.numerator {
                    flags |= 0x01;
                }
                if header.time_signature.denominator.value != prev.time_signature.denominator.value
                {
                    flags |= 0x02;
                }
                if header.time_signature.beams != prev.time_signature.beams {
                    flags |= 0x03;
                }
                if header.key_signature != prev.key_signature {
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
        if previous.is_some() {
            w.write_placeholder(1);
        }
        w.write_u8(flags);
        if flags & 0x01 != 0 {
            w.write_i8(header.time_signature.numerator);
        }
        if flags & 0x02 != 0 {
            w.write_i8(header.time_signature.denominator.value as i8);
        }
        if flags & 0x08 != 0 {
            w.write_i8(header.repeat_close + 1);
        }
        if flags & 0x20 != 0 {
            if let Some(marker) = &header.marker {
                gp3_writer::write_marker(w, marker)?;
            }
        }
        if flags & 0x40 != 0 {
            w.write_i8(header.key_signature.key);
            w.write_i8(i8::from(header.key_signature.is_minor));
        }
        if flags & 0x10 != 0 {
            w.write_u8(header.repeat_alternative);
        }
        if flags & 0x03 != 0 {
            for beam in header.time_signature.beams {
                w.write_u8(beam);
            }
        }
        if flags & 0x10 == 0 {
            w.write_placeholder(1);
        }
        w.write_u8(header.triplet_feel.to_byte());
        previous = Some(header);
    }
    Ok(())
}

/// The version 5 mix table, parameters interleaved with the RSE
/// instrument and tempo name.
fn write_mix_table_change(
    w: &mut ByteWriter,
    change: &MixTableChange,
    version: GpVersion,
) -> Result<(), TabError> {
    let default_rse = RseInstrument::default();
    let rse = change.rse.as_ref().unwrap_or(&default_rse);
    w.write_i8(change.instrument.map_or(-1, |item| item.value as i8));
    write_rse_instrument(w, rse, version);
    if version == GpVersion::GP5 {
        w.write_placeholder(1);
    }
    w.write_i8(change.volume.map_or(-1, |item| item.value as i8));
    w.write_i8(change.balance.map_or(-1, |item| item.value as i8));
    w.write_i8(change.chorus.map_or(-1, |item| item.value as i8));
    w.write_i8(change.reverb.map_or(-1, |item| item.value as i8));
    w.write_i8(change.phaser.map_or(-1, |item| item.value as i8));
    w.write_i8(change.tremolo.map_or(-1, |item| item.value as i8));
    w.write_int_byte_size_string(change.tempo_name.as_deref().unwrap_or_default())?;
    w.write_i32(change.tempo.map_or(-1, |item| item.value));
    for item in [
        &change.volume,
        &change.balance,
        &change.chorus,
        &change.reverb,
        &change.phaser,
        &change.tremolo,
    ]
    .into_iter()
    .flatten()
    {
        w.write_i8(item.duration);
    }
    if let Some(item) = &change.tempo {
        w.write_i8(item.duration);
        if version > GpVersion::GP5 {
            w.write_bool(change.hide_tempo);
        }
    }
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
    if change.use_rse {
        flags |= 0x40;
    }
    if change.wah.is_some_and(|wah| wah.display) {
        flags |= 0x80;
    }
    w.write_u8(flags);
    w.write_i8(change.wah.map_or(-1, |wah| wah.value));
    if version > GpVersion::GP5 {
        write_rse_instrument_effect(w, change.rse.as_ref())?;
    }
    Ok(())
}

fn write_note(w: &mut ByteWriter, note: &Note, version: GpVersion) -> Result<(), TabError> {
    if note.independent_duration.is_some() {
        return Err(TabError::UnsupportedFeature(
            "time-independent note durations are not representable in the version 5 dialect"
                .to_string(),
        ));
    }
    let effect = &note.effect;
    let needs_effects = effect.bend.is_some()
        || effect.grace.is_some()
        || effect.tremolo_picking.is_some()
        || !effect.slides.is_empty()
        || effect.harmonic.is_some()
        || effect.trill.is_some()
        || effect.hammer
        || effect.let_ring
        || effect.palm_mute
        || effect.staccato
        || effect.vibrato;
    let mut flags = 0u8;
    if (note.duration_percent - 1.0).abs() >= 1e-3 {
        flags |= 0x01;
    }
    if effect.heavy_accentuated {
        flags |= 0x02;
    }
    if effect.ghost_note {
        flags |= 0x04;
    }
    if needs_effects {
        flags |= 0x08;
    }
    if note.velocity != DEFAULT_VELOCITY {
        flags |= 0x10;
    }
    flags |= 0x20;
    if effect.accentuated {
        flags |= 0x40;
    }
    if effect.is_fingering() {
        flags |= 0x80;
    }
    w.write_u8(flags);
    w.write_u8(note.kind.to_byte());
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
        w.write_i8(effect.left_hand_finger.to_i8());
        w.write_i8(effect.right_hand_finger.to_i8());
    }
    if flags & 0x01 != 0 {
        w.write_f64(note.duration_percent);
    }
    let mut flags2 = 0u8;
    if note.swap_accidentals {
        flags2 |= 0x02;
    }
    w.write_u8(flags2);
    if needs_effects {
        gp4_writer::write_note_effects(w, note, version)?;
    }
    Ok(())
}

fn write_beat(w: &mut ByteWriter, beat: &Beat, version: GpVersion) -> Result<(), TabError> {
    gp3_writer::check_duration(&beat.duration, version)?;
    let needs_effects = !beat.effect.is_default();
    let needs_mix = beat.effect.mix_table_change.is_some();
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
    w.write_u8(flags);
    if flags & 0x40 != 0 {
        w.write_u8(beat.status.to_byte());
    }
    gp3_writer::write_duration(w, &beat.duration, flags);
    if let Some(chord) = &beat.effect.chord {
        gp4_writer::write_chord(w, chord)?;
    }
    if let Some(text) = &beat.text {
        w.write_int_byte_size_string(text)?;
    }
    if needs_effects {
        gp4_writer::write_beat_effects(w, beat, version)?;
    }
    if let Some(change) = &beat.effect.mix_table_change {
        write_mix_table_change(w, change, version)?;
    }
    w.write_u8(gp3_writer::string_flags(&beat.notes));
    for index in gp3_writer::sorted_note_indices(&beat.notes) {
        write_note(w, &beat.notes[index], version)?;
    }
    let display = &beat.display;
    let mut flags2 = 0i16;
    if display.break_beam {
        flags2 |= 0x0001;
    }
    if display.beam_direction == VoiceDirection::Down {
        flags2 |= 0x0002;
    }
    if display.force_beam {
        flags2 |= 0x0004;
    }
    if display.beam_direction == VoiceDirection::Up {
        flags2 |= 0x0008;
    }
    match beat.octave {
        Octave::Ottava => flags2 |= 0x0010,
        Octave::OttavaBassa => flags2 |= 0x0020,
        Octave::Quindicesima => flags2 |= 0x0040,
        Octave::QuindicesimaBassa => flags2 |= 0x0100,
        Octave::None => {}
    }
    if display.tuplet_bracket == TupletBracket::Start {
        flags2 |= 0x0200;
    }
    if display.tuplet_bracket == TupletBracket::End {
        flags2 |= 0x0400;
    }
    if display.break_secondary != 0 {
        flags2 |= 0x0800;
    }
    if display.break_secondary_tuplet {
        flags2 |= 0x1000;
    }
    if display.force_bracket {
        flags2 |= 0x2000;
    }
    w.write_i16(flags2);
    if flags2 & 0x0800 != 0 {
        w.write_u8(display.break_secondary);
    }
    Ok(())
}

fn write_measures(w: &mut ByteWriter, song: &Song, version: GpVersion) -> Result<(), TabError> {
    for measure_index in 0..song.measure_headers.len() {
        for track in &song.tracks {
            let measure = &track.measures[measure_index];
            for voice_index in 0..2 {
                let beats: &[Beat] = measure
                    .voices
                    .get(voice_index)
                    .map_or(&[], |voice| voice.beats.as_slice());
                w.write_i32(beats.len() as i32);
                for beat in beats {
                    write_beat(w, beat, version)?;
                }
            }
            w.write_u8(measure.line_break.to_byte());
        }
    }
    Ok(())
}

/// The complete version 5 byte image for `song`.
pub fn write_song(song: &Song, version: GpVersion) -> Result<Vec<u8>, TabError> {
    let mut w = ByteWriter::new();
    w.write_byte_size_string(version.version_string(), 30)?;
    gp3_writer::write_song_info(&mut w, song, version)?;
    write_lyrics_block(&mut w, song)?;
    if version > GpVersion::GP5 {
        write_master_effect(&mut w, song.master_effect.as_ref());
    }
    let default_setup = PageSetup::default();
    write_page_setup(&mut w, song.page_setup.as_ref().unwrap_or(&default_setup))?;
    w.write_int_byte_size_string(song.tempo.name.as_deref().unwrap_or_default())?;
    w.write_i32(song.tempo.value);
    if version > GpVersion::GP5 {
        w.write_bool(song.hide_tempo.unwrap_or(false));
    }
    w.write_i8(song.key_signature);
    w.write_i32(song.octave);
    gp3_writer::write_midi_channels(&mut w, &song.midi_channels);
    write_directions(&mut w, song.directions.as_ref());
    w.write_i32(song.master_effect.as_ref().map_or(0, |effect| effect.reverb));
    w.write_i32(song.measure_headers.len() as i32);
    w.write_i32(song.tracks.len() as i32);
    write_measure_headers(&mut w, song)?;
    for (index, track) in song.tracks.iter().enumerate() {
        write_track(&mut w, track, index + 1, song, version)?;
    }
    w.write_placeholder(if version == GpVersion::GP5 { 2 } else { 1 });
    write_measures(&mut w, song, version)?;
    log::debug!("Wrote {} bytes of version 5 data", w.len());
    Ok(w.into_bytes())
}

fn write_lyrics_block(w: &mut ByteWriter, song: &Song) -> Result<(), TabError> {
    let default = Lyrics::default();
    gp4_writer::write_lyrics(w, song.lyrics.as_ref().unwrap_or(&default))
}
