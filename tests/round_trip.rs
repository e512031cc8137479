//! Round-trip tests over synthetic songs for every supported dialect.
//!
//! Each test writes a hand-built song, parses the image back, writes it
//! again and checks that the second image is byte-identical and the
//! reparsed song structurally equal. This exercises the full grammar of
//! each dialect in both directions.

use tabrw::model::duration::{EIGHTH, QUARTER, SIXTEENTH, THIRTY_SECOND, Tuplet, WHOLE};
use tabrw::model::song::{
    Beat, BeatStatus, BeatStroke, BeatStrokeDirection, BendEffect, BendPoint, BendType, Chord,
    Color, Directions, GraceEffect, GraceEffectTransition, HarmonicEffect, HarmonicType, LineBreak,
    Lyrics, Marker, MeasureHeader, MidiChannel, MixTableChange, MixTableItem, NoteType, Octave,
    PitchClass, RseEqualizer, RseInstrument, RseMasterEffect, SlapEffect, SlideType, TrackRse,
    TremoloPickingEffect, TrillEffect, TupletBracket, VoiceDirection, WahEffect,
};
use tabrw::{Duration, GpVersion, Note, Song, TabError, Track, parse, write};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write, parse, rewrite: the second image must match the first byte
/// for byte and the reparsed song must equal the first parse.
fn round_trip(song: &Song, version: GpVersion) -> Song {
    let first = write(song, version).expect("write failed");
    let parsed = parse(&first).expect("parse failed");
    let second = write(&parsed, version).expect("rewrite failed");
    if first != second {
        let position = first
            .iter()
            .zip(&second)
            .position(|(a, b)| a != b)
            .unwrap_or(first.len().min(second.len()));
        panic!(
            "byte images differ at offset {position} ({} vs {} bytes) for {version:?}",
            first.len(),
            second.len()
        );
    }
    let reparsed = parse(&second).expect("reparse failed");
    assert_eq!(parsed, reparsed);
    assert_eq!(parsed.version, version);
    parsed
}

fn base_song(header_count: usize) -> Song {
    let mut song = Song {
        midi_channels: MidiChannel::default_channels(),
        ..Song::default()
    };
    song.song_info.name = "Round Trip".to_string();
    song.song_info.artist = "tabrw".to_string();
    song.song_info.notices = vec!["first notice".to_string()];
    for _ in 0..header_count {
        song.measure_headers.push(MeasureHeader::default());
    }
    let track = Track::new_for_song(&song, 1);
    song.tracks.push(track);
    song
}

fn note(string: i8, value: i16) -> Note {
    Note {
        string,
        value,
        kind: NoteType::Normal,
        ..Note::default()
    }
}

fn beat(value: u16, notes: Vec<Note>) -> Beat {
    Beat {
        duration: Duration::new(value),
        notes,
        ..Beat::default()
    }
}

fn rest(value: u16) -> Beat {
    Beat {
        status: BeatStatus::Rest,
        duration: Duration::new(value),
        ..Beat::default()
    }
}

#[test]
fn gp3_round_trip() {
    init_logs();
    let mut song = base_song(2);
    song.triplet_feel = Some(false);
    song.measure_headers[1].marker = Some(Marker {
        title: "Chorus".to_string(),
        color: Color::RED,
    });
    song.measure_headers[1].repeat_close = 2;

    let mut bent = note(1, 5);
    bent.effect.bend = Some(BendEffect {
        kind: BendType::Bend,
        value: 100,
        points: vec![
            BendPoint {
                position: 0,
                value: 0,
                vibrato: false,
            },
            BendPoint {
                position: 12,
                value: 4,
                vibrato: false,
            },
        ],
    });
    bent.effect.hammer = true;
    let mut graced = note(2, 7);
    graced.effect.grace = Some(GraceEffect {
        fret: 5,
        duration: THIRTY_SECOND,
        transition: GraceEffectTransition::Hammer,
        ..GraceEffect::default()
    });
    graced.effect.let_ring = true;

    let mut stroked = beat(QUARTER, vec![note(1, 3), note(2, 3)]);
    stroked.effect.stroke = BeatStroke {
        direction: BeatStrokeDirection::Down,
        value: SIXTEENTH,
    };
    stroked.effect.fade_in = true;
    let mut mixed = beat(QUARTER, vec![note(3, 0)]);
    mixed.effect.mix_table_change = Some(MixTableChange {
        volume: Some(MixTableItem {
            value: 10,
            duration: 4,
            all_tracks: false,
        }),
        tempo: Some(MixTableItem {
            value: 90,
            duration: 0,
            all_tracks: false,
        }),
        ..MixTableChange::default()
    });
    let mut texted = beat(QUARTER, vec![note(1, 0)]);
    texted.text = Some("verse".to_string());
    let mut dotted = beat(EIGHTH, vec![note(4, 2)]);
    dotted.duration.dotted = true;

    let voice = &mut song.tracks[0].measures[0].voices[0];
    voice.beats.push(beat(QUARTER, vec![bent, graced]));
    voice.beats.push(stroked);
    voice.beats.push(mixed);
    voice.beats.push(rest(QUARTER));
    let voice = &mut song.tracks[0].measures[1].voices[0];
    voice.beats.push(texted);
    voice.beats.push(dotted);

    round_trip(&song, GpVersion::GP3);
}

#[test]
fn gp3_old_chord_round_trip() {
    init_logs();
    let mut song = base_song(1);
    let chord = Chord {
        length: 6,
        new_format: false,
        name: "C5".to_string(),
        first_fret: 1,
        strings: vec![3, 5, 5, -1, -1, -1],
        ..Chord::default()
    };
    let mut chorded = beat(WHOLE, vec![note(1, 3)]);
    chorded.effect.chord = Some(chord.clone());
    song.tracks[0].measures[0].voices[0].beats.push(chorded);

    let parsed = round_trip(&song, GpVersion::GP3);
    let parsed_chord = parsed.tracks[0].measures[0].voices[0].beats[0]
        .effect
        .chord
        .as_ref()
        .expect("chord lost in round trip");
    assert_eq!(parsed_chord, &chord);
}

#[test]
fn gp4_round_trip() {
    init_logs();
    let mut song = base_song(2);
    song.triplet_feel = Some(true);
    song.lyrics = Some(Lyrics {
        track_choice: 1,
        lines: {
            let mut lines = Lyrics::default().lines;
            lines[0].text = "la la la".to_string();
            lines
        },
    });

    let mut expressive = note(1, 5);
    expressive.effect.staccato = true;
    expressive.effect.palm_mute = true;
    expressive.effect.vibrato = true;
    expressive.effect.accentuated = true;
    let mut trilled = note(2, 5);
    trilled.effect.trill = Some(TrillEffect {
        fret: 7,
        duration: Duration::new(SIXTEENTH),
    });
    trilled.effect.heavy_accentuated = true;
    let mut picked = note(3, 2);
    picked.effect.tremolo_picking = Some(TremoloPickingEffect {
        duration: Duration::new(SIXTEENTH),
    });
    picked.effect.slides = vec![SlideType::ShiftSlideTo];
    let mut harmonic_note = note(4, 5);
    harmonic_note.effect.harmonic = Some(HarmonicEffect {
        kind: HarmonicType::Artificial,
        pitch: Some(PitchClass::from_semitone(0)),
        octave: Some(Octave::Ottava),
        right_hand_fret: None,
    });
    let mut independent = note(5, 3);
    independent.independent_duration = Some((1, 3));

    let mut slapped = beat(QUARTER, vec![expressive, trilled]);
    slapped.effect.slap_effect = SlapEffect::Slapping;
    slapped.effect.has_rasgueado = true;
    let mut whammy = beat(QUARTER, vec![picked]);
    whammy.effect.tremolo_bar = Some(BendEffect {
        kind: BendType::Dip,
        value: 100,
        points: vec![
            BendPoint {
                position: 0,
                value: 0,
                vibrato: false,
            },
            BendPoint {
                position: 6,
                value: -4,
                vibrato: false,
            },
            BendPoint {
                position: 12,
                value: 0,
                vibrato: false,
            },
        ],
    });
    let mut picked_stroke = beat(QUARTER, vec![harmonic_note]);
    picked_stroke.effect.pick_stroke = BeatStrokeDirection::Up;
    let mut all_tracks_mix = beat(QUARTER, vec![independent]);
    all_tracks_mix.effect.mix_table_change = Some(MixTableChange {
        volume: Some(MixTableItem {
            value: 12,
            duration: 2,
            all_tracks: true,
        }),
        ..MixTableChange::default()
    });

    let voice = &mut song.tracks[0].measures[0].voices[0];
    voice.beats.push(slapped);
    voice.beats.push(whammy);
    voice.beats.push(picked_stroke);
    voice.beats.push(all_tracks_mix);
    let tuplet_beat = Beat {
        duration: Duration {
            tuplet: Tuplet::new(3, 2),
            ..Duration::new(EIGHTH)
        },
        notes: vec![note(1, 1)],
        ..Beat::default()
    };
    song.tracks[0].measures[1].voices[0]
        .beats
        .extend(vec![tuplet_beat; 3]);

    for version in [GpVersion::GP4, GpVersion::GP4_06] {
        round_trip(&song, version);
    }
}

#[test]
fn gp4_new_chord_round_trip() {
    init_logs();
    let mut song = base_song(1);
    let chord = Chord {
        length: 6,
        new_format: true,
        sharp: Some(true),
        root: Some(PitchClass::from_semitone(0)),
        kind: Some(1),
        extension: Some(0),
        bass: Some(PitchClass::from_semitone(0)),
        tonality: Some(0),
        add: Some(false),
        name: "C".to_string(),
        name_padding: vec![0; 21],
        fifth: Some(0),
        ninth: Some(0),
        eleventh: Some(0),
        first_fret: 1,
        strings: vec![0, 1, 0, 2, 3, -1],
        barres: vec![],
        omissions: vec![true; 7],
        fingerings: vec![tabrw::model::song::Fingering::Open; 7],
        show: Some(true),
    };
    let mut chorded = beat(WHOLE, vec![note(1, 0)]);
    chorded.effect.chord = Some(chord.clone());
    song.tracks[0].measures[0].voices[0].beats.push(chorded);

    let parsed = round_trip(&song, GpVersion::GP4_06);
    let parsed_chord = parsed.tracks[0].measures[0].voices[0].beats[0]
        .effect
        .chord
        .as_ref()
        .expect("chord lost in round trip");
    assert_eq!(parsed_chord, &chord);
}

fn gp5_song(version: GpVersion) -> Song {
    let mut song = base_song(2);
    song.song_info.music = Some("Composer".to_string());
    song.tempo.name = Some("Moderate".to_string());
    song.lyrics = Some(Lyrics::default());
    song.page_setup = Some(tabrw::model::song::PageSetup::default());
    song.directions = Some(Directions {
        coda: 2,
        ..Directions::default()
    });
    song.master_effect = Some(if version > GpVersion::GP5 {
        RseMasterEffect {
            volume: 110,
            reverb: 3,
            equalizer: Some(RseEqualizer {
                knobs: vec![0; 10],
                gain: 0,
            }),
        }
    } else {
        RseMasterEffect {
            volume: 0,
            reverb: 3,
            equalizer: None,
        }
    });
    if version > GpVersion::GP5 {
        song.hide_tempo = Some(false);
    }

    let track = &mut song.tracks[0];
    track.settings_flags = Some(0x0003);
    track.auto_accentuation = Some(0);
    track.rse = Some(TrackRse {
        humanize: 30,
        instrument: RseInstrument {
            instrument: 25,
            unknown: 1,
            sound_bank: -1,
            effect_number: -1,
            effect: (version > GpVersion::GP5).then(String::new),
            effect_category: (version > GpVersion::GP5).then(String::new),
        },
        equalizer: (version > GpVersion::GP5).then(|| RseEqualizer {
            knobs: vec![0; 3],
            gain: 0,
        }),
    });

    song.measure_headers[1].time_signature.beams = [3, 3, 2, 4];
    song.measure_headers[1].triplet_feel = tabrw::model::song::TripletFeel::Eighth;
    song.measure_headers[1].repeat_close = 1;

    let mut stretched = note(1, 5);
    stretched.duration_percent = 0.5;
    stretched.swap_accidentals = true;
    let mut tapped = note(2, 7);
    tapped.effect.harmonic = Some(HarmonicEffect {
        kind: HarmonicType::Tapped,
        pitch: None,
        octave: None,
        right_hand_fret: Some(12),
    });
    let mut pitched = note(3, 4);
    pitched.effect.harmonic = Some(HarmonicEffect {
        kind: HarmonicType::Artificial,
        pitch: Some(PitchClass {
            just: 4,
            accidental: 0,
        }),
        octave: Some(Octave::Ottava),
        right_hand_fret: None,
    });
    let mut graced = note(4, 9);
    graced.effect.grace = Some(GraceEffect {
        fret: 7,
        duration: THIRTY_SECOND,
        is_on_beat: true,
        transition: GraceEffectTransition::Slide,
        ..GraceEffect::default()
    });
    let mut sliding = note(5, 2);
    sliding.effect.slides = vec![SlideType::LegatoSlideTo, SlideType::OutUpwards];

    let mut displayed = beat(QUARTER, vec![stretched, tapped]);
    displayed.octave = Octave::Ottava;
    displayed.display.break_beam = true;
    displayed.display.beam_direction = VoiceDirection::Up;
    displayed.display.break_secondary = 2;
    displayed.display.tuplet_bracket = TupletBracket::Start;
    let mut wah_change = beat(QUARTER, vec![pitched]);
    wah_change.effect.mix_table_change = Some(MixTableChange {
        tempo_name: Some(String::new()),
        wah: Some(WahEffect {
            value: 60,
            display: true,
        }),
        use_rse: false,
        ..MixTableChange::default()
    });
    let mut swapped_stroke = beat(QUARTER, vec![graced]);
    swapped_stroke.effect.stroke = BeatStroke {
        direction: BeatStrokeDirection::Up,
        value: THIRTY_SECOND,
    };

    let measure = &mut song.tracks[0].measures[0];
    measure.voices[0].beats.push(displayed);
    measure.voices[0].beats.push(wah_change);
    measure.voices[0].beats.push(swapped_stroke);
    measure.voices[0].beats.push(rest(QUARTER));
    measure.voices[1].beats.push(beat(WHOLE, vec![sliding]));
    measure.line_break = LineBreak::Break;

    // tied note resolving to the previous fret on the same string
    let first = beat(QUARTER, vec![note(1, 5)]);
    let mut tied_note = note(1, 5);
    tied_note.kind = NoteType::Tie;
    let tied = beat(QUARTER, vec![tied_note]);
    let voice = &mut song.tracks[0].measures[1].voices[0];
    voice.beats.push(first);
    voice.beats.push(tied);

    song
}

#[test]
fn gp5_round_trip_both_revisions() {
    init_logs();
    for version in [GpVersion::GP5, GpVersion::GP5_10] {
        let song = gp5_song(version);
        let parsed = round_trip(&song, version);
        let tied = &parsed.tracks[0].measures[1].voices[0].beats[1].notes[0];
        assert_eq!(tied.kind, NoteType::Tie);
        assert_eq!(tied.value, 5);
    }
}

#[test]
fn minimal_gp5_one_whole_note() {
    init_logs();
    let mut song = base_song(1);
    song.tracks[0].measures[0].voices[0]
        .beats
        .push(beat(WHOLE, vec![note(1, 0)]));

    let parsed = round_trip(&song, GpVersion::GP5_10);
    let voice = &parsed.tracks[0].measures[0].voices[0];
    assert_eq!(voice.beats.len(), 1);
    let notes = &voice.beats[0].notes;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].string, 1);
    assert_eq!(notes[0].value, 0);
    assert_eq!(voice.start_in_measure(0), 0);
}

#[test]
fn triplet_eighths_fill_a_four_four_measure() {
    init_logs();
    let mut song = base_song(1);
    let triplet_eighth = Beat {
        duration: Duration {
            tuplet: Tuplet::new(3, 2),
            ..Duration::new(EIGHTH)
        },
        notes: vec![note(1, 0)],
        ..Beat::default()
    };
    song.tracks[0].measures[0].voices[0].beats = vec![triplet_eighth; 12];

    let parsed = round_trip(&song, GpVersion::GP5_10);
    let voice = &parsed.tracks[0].measures[0].voices[0];
    let total: i64 = voice.beats.iter().map(|b| b.duration.time()).sum();
    let measure_length = parsed.measure_headers[0].length();
    assert_eq!(total, measure_length);
    let uncompressed: i64 = voice
        .beats
        .iter()
        .map(|b| Duration::new(b.duration.value).time())
        .sum();
    assert_eq!(uncompressed, measure_length * 3 / 2);
}

#[test]
fn beat_without_optionals_stays_bare() {
    init_logs();
    let mut song = base_song(1);
    song.tracks[0].measures[0].voices[0]
        .beats
        .push(beat(WHOLE, vec![note(1, 0)]));

    let parsed = round_trip(&song, GpVersion::GP5_10);
    let parsed_beat = &parsed.tracks[0].measures[0].voices[0].beats[0];
    assert!(parsed_beat.text.is_none());
    assert!(parsed_beat.effect.chord.is_none());
    assert!(parsed_beat.effect.mix_table_change.is_none());
    assert!(parsed_beat.effect.tremolo_bar.is_none());
    assert!(parsed_beat.effect.is_default());
    assert!(parsed_beat.notes[0].effect.is_default());
}

#[test]
fn measure_equality_ignores_header_differences() {
    init_logs();
    let mut song_a = base_song(1);
    song_a.tracks[0].measures[0].voices[0]
        .beats
        .push(beat(WHOLE, vec![note(1, 0)]));
    let mut song_b = song_a.clone();
    song_b.measure_headers[0].marker = Some(Marker {
        title: "Intro".to_string(),
        color: Color::BLACK,
    });

    assert_eq!(song_a.tracks[0].measures[0], song_b.tracks[0].measures[0]);
    assert_ne!(song_a, song_b);
    let measure_diffs = song_a.tracks[0]
        .measures
        .iter()
        .zip(&song_b.tracks[0].measures)
        .filter(|(a, b)| a != b)
        .count();
    assert_eq!(measure_diffs, 0);
}

#[test]
fn thirteen_tuplet_cannot_reach_older_dialects() {
    init_logs();
    let mut song = base_song(1);
    let beat_13 = Beat {
        duration: Duration {
            tuplet: Tuplet::new(13, 8),
            ..Duration::new(SIXTEENTH)
        },
        notes: vec![note(1, 0)],
        ..Beat::default()
    };
    song.tracks[0].measures[0].voices[0].beats.push(beat_13);

    assert!(write(&song, GpVersion::GP5_10).is_ok());
    for version in [GpVersion::GP3, GpVersion::GP4, GpVersion::GP4_06] {
        let err = write(&song, version).unwrap_err();
        assert!(matches!(err, TabError::UnsupportedFeature(_)));
    }
}

#[test]
fn second_voice_cannot_reach_older_dialects() {
    init_logs();
    let mut song = base_song(1);
    song.tracks[0].measures[0].voices[1]
        .beats
        .push(beat(WHOLE, vec![note(1, 0)]));

    assert!(write(&song, GpVersion::GP5).is_ok());
    let err = write(&song, GpVersion::GP3).unwrap_err();
    assert!(matches!(err, TabError::UnsupportedFeature(_)));
}

#[test]
fn same_song_reaches_every_dialect() {
    init_logs();
    let mut song = base_song(1);
    song.tracks[0].measures[0].voices[0]
        .beats
        .push(beat(WHOLE, vec![note(1, 3)]));

    for version in [
        GpVersion::GP3,
        GpVersion::GP4,
        GpVersion::GP4_06,
        GpVersion::GP5,
        GpVersion::GP5_10,
    ] {
        round_trip(&song, version);
    }
}
