//! The song model: every entity a tablature file materializes into.
//!
//! All entities are value records compared and hashed structurally so they
//! can serve as diff and mapping keys. Two exclusions apply: a measure
//! header's `start`/`tempo` bookkeeping and a song's `version` do not take
//! part in equality. A `Measure` stores no reference to its header at all;
//! headers are resolved positionally through [`Song`].

use std::hash::{Hash, Hasher};

use crate::model::duration::{Duration, EIGHTH, SIXTEENTH, SIXTY_FOURTH, THIRTY_SECOND};

pub const MAX_VOICES: usize = 2;

pub const SHARP_NOTES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const DEFAULT_PERCUSSION_CHANNEL: u8 = 9;
pub const DEFAULT_PERCUSSION_BANK: u8 = 128;
pub const DEFAULT_BANK: u8 = 0;

pub const MIN_VELOCITY: i16 = 15;
pub const VELOCITY_INCREMENT: i16 = 16;
pub const DEFAULT_VELOCITY: i16 = MIN_VELOCITY + VELOCITY_INCREMENT * 5; // FORTE

/// Convert a stored dynamic byte to a MIDI-like velocity.
pub const fn unpack_velocity(dynamic: i8) -> i16 {
    MIN_VELOCITY + VELOCITY_INCREMENT * dynamic as i16 - VELOCITY_INCREMENT
}

/// Inverse of [`unpack_velocity`].
pub const fn pack_velocity(velocity: i16) -> i8 {
    ((velocity + VELOCITY_INCREMENT - MIN_VELOCITY) / VELOCITY_INCREMENT) as i8
}

pub const BEND_EFFECT_MAX_POSITION: i32 = 12;
pub const GP_BEND_POSITION: i32 = 60;
pub const GP_BEND_SEMITONE: i32 = 25;
pub const SEMITONE_LENGTH: i32 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Default)]
pub enum GpVersion {
    #[default]
    GP3,
    GP4,
    GP4_06,
    GP5,
    GP5_10,
}

impl GpVersion {
    /// Canonical signature written into the 30-byte version field.
    pub const fn version_string(self) -> &'static str {
        match self {
            GpVersion::GP3 => "FICHIER GUITAR PRO v3.00",
            GpVersion::GP4 => "FICHIER GUITAR PRO v4.00",
            GpVersion::GP4_06 => "FICHIER GUITAR PRO v4.06",
            GpVersion::GP5 => "FICHIER GUITAR PRO v5.00",
            GpVersion::GP5_10 => "FICHIER GUITAR PRO v5.10",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Song {
    /// Version the song was parsed from; not part of equality.
    pub version: GpVersion,
    pub song_info: SongInfo,
    pub triplet_feel: Option<bool>,
    pub lyrics: Option<Lyrics>,
    pub master_effect: Option<RseMasterEffect>,
    pub page_setup: Option<PageSetup>,
    pub tempo: Tempo,
    pub hide_tempo: Option<bool>,
    pub key_signature: i8,
    pub octave: i32,
    pub midi_channels: Vec<MidiChannel>,
    pub directions: Option<Directions>,
    pub measure_headers: Vec<MeasureHeader>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SongInfo {
    pub name: String,
    pub subtitle: String,
    pub artist: String,
    pub album: String,
    pub words: String,
    /// Separate music credit, present from version 5 on.
    pub music: Option<String>,
    pub copyright: String,
    pub tab_author: String,
    pub instructions: String,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LyricLine {
    pub starting_measure: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lyrics {
    pub track_choice: i32,
    pub lines: Vec<LyricLine>,
}

impl Default for Lyrics {
    fn default() -> Self {
        Lyrics {
            track_choice: 0,
            lines: vec![
                LyricLine {
                    starting_measure: 1,
                    text: String::new(),
                };
                5
            ],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Padding {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// Bit flags of `PageSetup::header_and_footer`.
pub const HEADER_FOOTER_ALL: i16 = 0x1FF;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageSetup {
    pub page_size: Point,
    pub page_margin: Padding,
    /// Score size as a raw percentage, 100 = full size.
    pub score_size_percent: i32,
    pub header_and_footer: i16,
    pub title: String,
    pub subtitle: String,
    pub artist: String,
    pub album: String,
    pub words: String,
    pub music: String,
    pub word_and_music: String,
    /// Two display lines joined with `'\n'`.
    pub copyright: String,
    pub page_number: String,
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup {
            page_size: Point { x: 210, y: 297 },
            page_margin: Padding {
                left: 10,
                right: 10,
                top: 15,
                bottom: 10,
            },
            score_size_percent: 100,
            header_and_footer: HEADER_FOOTER_ALL,
            title: "%title%".to_string(),
            subtitle: "%subtitle%".to_string(),
            artist: "%artist%".to_string(),
            album: "%album%".to_string(),
            words: "Words by %words%".to_string(),
            music: "Music by %music%".to_string(),
            word_and_music: "Words & Music by %WORDSMUSIC%".to_string(),
            copyright: "Copyright %copyright%\n\
                        All Rights Reserved - International Copyright Secured"
                .to_string(),
            page_number: "Page %N%/%P%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RseEqualizer {
    /// Raw band knobs as stored on disk (tenths of a dB, negated).
    pub knobs: Vec<i8>,
    pub gain: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RseMasterEffect {
    pub volume: i32,
    pub reverb: i32,
    pub equalizer: Option<RseEqualizer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RseInstrument {
    pub instrument: i32,
    pub unknown: i32,
    pub sound_bank: i32,
    pub effect_number: i32,
    pub effect: Option<String>,
    pub effect_category: Option<String>,
}

impl Default for RseInstrument {
    fn default() -> Self {
        RseInstrument {
            instrument: -1,
            unknown: 1,
            sound_bank: -1,
            effect_number: -1,
            effect: None,
            effect_category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TrackRse {
    pub humanize: u8,
    pub instrument: RseInstrument,
    pub equalizer: Option<RseEqualizer>,
}

/// Navigation sign positions: for each sign, the 1-based measure number it
/// points at, or -1 when the sign is absent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Directions {
    pub coda: i16,
    pub double_coda: i16,
    pub segno: i16,
    pub segno_segno: i16,
    pub fine: i16,
    pub da_capo: i16,
    pub da_capo_al_coda: i16,
    pub da_capo_al_double_coda: i16,
    pub da_capo_al_fine: i16,
    pub da_segno: i16,
    pub da_segno_al_coda: i16,
    pub da_segno_al_double_coda: i16,
    pub da_segno_al_fine: i16,
    pub da_segno_segno: i16,
    pub da_segno_segno_al_coda: i16,
    pub da_segno_segno_al_double_coda: i16,
    pub da_segno_segno_al_fine: i16,
    pub da_coda: i16,
    pub da_double_coda: i16,
}

impl Default for Directions {
    fn default() -> Self {
        Directions::from_array([-1; 19])
    }
}

impl Directions {
    /// Signs in on-disk order.
    pub const fn as_array(&self) -> [i16; 19] {
        [
            self.coda,
            self.double_coda,
            self.segno,
            self.segno_segno,
            self.fine,
            self.da_capo,
            self.da_capo_al_coda,
            self.da_capo_al_double_coda,
            self.da_capo_al_fine,
            self.da_segno,
            self.da_segno_al_coda,
            self.da_segno_al_double_coda,
            self.da_segno_al_fine,
            self.da_segno_segno,
            self.da_segno_segno_al_coda,
            self.da_segno_segno_al_double_coda,
            self.da_segno_segno_al_fine,
            self.da_coda,
            self.da_double_coda,
        ]
    }

    pub const fn from_array(signs: [i16; 19]) -> Self {
        Directions {
            coda: signs[0],
            double_coda: signs[1],
            segno: signs[2],
            segno_segno: signs[3],
            fine: signs[4],
            da_capo: signs[5],
            da_capo_al_coda: signs[6],
            da_capo_al_double_coda: signs[7],
            da_capo_al_fine: signs[8],
            da_segno: signs[9],
            da_segno_al_coda: signs[10],
            da_segno_al_double_coda: signs[11],
            da_segno_al_fine: signs[12],
            da_segno_segno: signs[13],
            da_segno_segno_al_coda: signs[14],
            da_segno_segno_al_double_coda: signs[15],
            da_segno_segno_al_fine: signs[16],
            da_coda: signs[17],
            da_double_coda: signs[18],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tempo {
    pub value: i32,
    pub name: Option<String>,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            value: 120,
            name: None,
        }
    }
}

/// Channel parameters live in "channel short" space: the wire stores a
/// signed byte, scaled by [`unpack_channel_param`] on read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MidiChannel {
    pub channel: u8,
    pub effect_channel: u8,
    pub instrument: i32,
    pub volume: i16,
    pub balance: i16,
    pub chorus: i16,
    pub reverb: i16,
    pub phaser: i16,
    pub tremolo: i16,
    pub bank: u8,
}

/// Scale a raw channel byte up to its short representation.
pub fn unpack_channel_param(raw: i8) -> i16 {
    (((raw as i16) << 3) - 1).clamp(-1, i16::MAX) + 1
}

/// Inverse of [`unpack_channel_param`].
pub fn pack_channel_param(value: i16) -> i8 {
    ((value >> 3) - 1).clamp(-128, 126) as i8 + 1
}

impl MidiChannel {
    pub fn new(channel: u8) -> Self {
        let bank = if channel % 16 == DEFAULT_PERCUSSION_CHANNEL {
            DEFAULT_PERCUSSION_BANK
        } else {
            DEFAULT_BANK
        };
        MidiChannel {
            channel,
            effect_channel: channel,
            instrument: 25,
            volume: 104,
            balance: 64,
            chorus: 0,
            reverb: 0,
            phaser: 0,
            tremolo: 0,
            bank,
        }
    }

    /// The 64 channels a file always carries, at their defaults.
    pub fn default_channels() -> Vec<MidiChannel> {
        (0..64).map(MidiChannel::new).collect()
    }

    pub fn is_percussion(&self) -> bool {
        self.channel % 16 == DEFAULT_PERCUSSION_CHANNEL
    }
}

pub const KEY_SIGNATURES: [&str; 34] = [
    "F♭ major",
    "C♭ major",
    "G♭ major",
    "D♭ major",
    "A♭ major",
    "E♭ major",
    "B♭ major",
    "F major",
    "C major",
    "G major",
    "D major",
    "A major",
    "E major",
    "B major",
    "F# major",
    "C# major",
    "G# major",
    "D♭ minor",
    "A♭ minor",
    "E♭ minor",
    "B♭ minor",
    "F minor",
    "C minor",
    "G minor",
    "D minor",
    "A minor",
    "E minor",
    "B minor",
    "F# minor",
    "C# minor",
    "G# minor",
    "D# minor",
    "A# minor",
    "E# minor",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeySignature {
    pub key: i8,
    pub is_minor: bool,
}

impl KeySignature {
    pub const fn new(key: i8, is_minor: bool) -> Self {
        KeySignature { key, is_minor }
    }
}

impl Default for KeySignature {
    fn default() -> Self {
        KeySignature::new(0, false)
    }
}

impl std::fmt::Display for KeySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let index: usize = if self.is_minor {
            (23i8 + self.key) as usize
        } else {
            (8i8 + self.key) as usize
        };
        write!(f, "{}", KEY_SIGNATURES[index])
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TripletFeel {
    #[default]
    None,
    Eighth,
    Sixteenth,
    Unknown(u8),
}

impl TripletFeel {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            0 => TripletFeel::None,
            1 => TripletFeel::Eighth,
            2 => TripletFeel::Sixteenth,
            v => TripletFeel::Unknown(v),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            TripletFeel::None => 0,
            TripletFeel::Eighth => 1,
            TripletFeel::Sixteenth => 2,
            TripletFeel::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    pub title: String,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    pub numerator: i8,
    pub denominator: Duration,
    /// Beam grouping, four eighth-note counts; only meaningful from
    /// version 5 on.
    pub beams: [u8; 4],
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: Duration::default(),
            beams: [2, 2, 2, 2],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeasureHeader {
    /// Absolute tick where the measure starts; bookkeeping, not content.
    pub start: i64,
    /// Tempo in effect at this measure; bookkeeping, not content.
    pub tempo: i32,
    pub time_signature: TimeSignature,
    pub key_signature: KeySignature,
    pub marker: Option<Marker>,
    pub repeat_open: bool,
    /// Number of repeats, -1 when the measure does not close a repeat.
    pub repeat_close: i8,
    /// Bitmask of alternate endings covered by this measure.
    pub repeat_alternative: u8,
    pub double_bar: bool,
    pub triplet_feel: TripletFeel,
}

impl Default for MeasureHeader {
    fn default() -> Self {
        MeasureHeader {
            start: crate::model::duration::QUARTER_TIME,
            tempo: 120,
            time_signature: TimeSignature::default(),
            key_signature: KeySignature::default(),
            marker: None,
            repeat_open: false,
            repeat_close: -1,
            repeat_alternative: 0,
            double_bar: false,
            triplet_feel: TripletFeel::None,
        }
    }
}

impl MeasureHeader {
    /// Measure length in ticks, from the time signature.
    pub fn length(&self) -> i64 {
        self.time_signature.numerator as i64 * self.time_signature.denominator.time()
    }
}

// start and tempo are excluded: they are derived timeline state, not
// musical content
impl PartialEq for MeasureHeader {
    fn eq(&self, other: &Self) -> bool {
        self.time_signature == other.time_signature
            && self.key_signature == other.key_signature
            && self.marker == other.marker
            && self.repeat_open == other.repeat_open
            && self.repeat_close == other.repeat_close
            && self.repeat_alternative == other.repeat_alternative
            && self.double_bar == other.double_bar
            && self.triplet_feel == other.triplet_feel
    }
}

impl Eq for MeasureHeader {}

impl Hash for MeasureHeader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.time_signature.hash(state);
        self.key_signature.hash(state);
        self.marker.hash(state);
        self.repeat_open.hash(state);
        self.repeat_close.hash(state);
        self.repeat_alternative.hash(state);
        self.double_bar.hash(state);
        self.triplet_feel.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    pub number: i32,
    pub name: String,
    /// Trailing bytes of the fixed-width name field, kept verbatim so the
    /// field round-trips byte-exactly.
    pub name_padding: Vec<u8>,
    pub percussion: bool,
    pub twelve_stringed: bool,
    pub banjo: bool,
    pub visible: bool,
    pub solo: bool,
    pub mute: bool,
    pub use_rse: bool,
    pub indicate_tuning: bool,
    /// Tuning, first string first.
    pub strings: Vec<i32>,
    pub midi_port: i32,
    /// 0-based index into the song's channel table, -1 when out of range.
    pub channel_index: i32,
    pub effect_channel: i32,
    pub fret_count: i32,
    pub offset: i32,
    pub color: Color,
    /// Raw notation settings word, present from version 5 on.
    pub settings_flags: Option<i16>,
    pub auto_accentuation: Option<u8>,
    pub rse: Option<TrackRse>,
    pub measures: Vec<Measure>,
}

impl Default for Track {
    fn default() -> Self {
        Track {
            number: 1,
            name: String::new(),
            name_padding: vec![],
            percussion: false,
            twelve_stringed: false,
            banjo: false,
            visible: true,
            solo: false,
            mute: false,
            use_rse: false,
            indicate_tuning: false,
            strings: vec![64, 59, 55, 50, 45, 40],
            midi_port: 1,
            channel_index: 0,
            effect_channel: 1,
            fret_count: 24,
            offset: 0,
            color: Color::RED,
            settings_flags: None,
            auto_accentuation: None,
            rse: None,
            measures: vec![],
        }
    }
}

impl Track {
    /// Build a track holding one default measure per existing header, so the
    /// header/measure count invariant holds from the start.
    pub fn new_for_song(song: &Song, number: i32) -> Track {
        let measures = song
            .measure_headers
            .iter()
            .map(|_| Measure::default())
            .collect();
        Track {
            number,
            name: format!("Track {number}"),
            measures,
            ..Track::default()
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum LineBreak {
    #[default]
    None,
    Break,
    Protect,
    Unknown(u8),
}

impl LineBreak {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            0 => LineBreak::None,
            1 => LineBreak::Break,
            2 => LineBreak::Protect,
            v => LineBreak::Unknown(v),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            LineBreak::None => 0,
            LineBreak::Break => 1,
            LineBreak::Protect => 2,
            LineBreak::Unknown(v) => v,
        }
    }
}

/// One measure of one track. Headers live on the song; a measure carries
/// only its voices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Measure {
    pub voices: Vec<Voice>,
    pub line_break: LineBreak,
}

impl Default for Measure {
    fn default() -> Self {
        Measure {
            voices: vec![Voice::default(); MAX_VOICES],
            line_break: LineBreak::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Voice {
    pub beats: Vec<Beat>,
}

impl Voice {
    /// Tick offset of the beat at `beat_index` from the measure start, the
    /// sum of all preceding beat durations. 0 for the first beat.
    pub fn start_in_measure(&self, beat_index: usize) -> i64 {
        self.beats
            .iter()
            .take(beat_index)
            .map(|b| b.duration.time())
            .sum()
    }

    #[deprecated(note = "use `start_in_measure`")]
    pub fn real_start(&self, beat_index: usize) -> i64 {
        self.start_in_measure(beat_index)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BeatStatus {
    Empty,
    #[default]
    Normal,
    Rest,
    Unknown(u8),
}

impl BeatStatus {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            0 => BeatStatus::Empty,
            1 => BeatStatus::Normal,
            2 => BeatStatus::Rest,
            v => BeatStatus::Unknown(v),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            BeatStatus::Empty => 0,
            BeatStatus::Normal => 1,
            BeatStatus::Rest => 2,
            BeatStatus::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Octave {
    #[default]
    None,
    Ottava,
    Quindicesima,
    OttavaBassa,
    QuindicesimaBassa,
}

impl Octave {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            1 => Octave::Ottava,
            2 => Octave::Quindicesima,
            3 => Octave::OttavaBassa,
            4 => Octave::QuindicesimaBassa,
            _ => Octave::None,
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Octave::None => 0,
            Octave::Ottava => 1,
            Octave::Quindicesima => 2,
            Octave::OttavaBassa => 3,
            Octave::QuindicesimaBassa => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum VoiceDirection {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TupletBracket {
    #[default]
    None,
    Start,
    End,
}

/// Layout hints attached to a beat from version 5 on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct BeatDisplay {
    pub break_beam: bool,
    pub force_beam: bool,
    pub beam_direction: VoiceDirection,
    pub tuplet_bracket: TupletBracket,
    pub break_secondary: u8,
    pub break_secondary_tuplet: bool,
    pub force_bracket: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Beat {
    pub status: BeatStatus,
    pub duration: Duration,
    /// Sorted by string number; string numbers unique within the beat.
    pub notes: Vec<Note>,
    pub text: Option<String>,
    pub effect: BeatEffects,
    pub octave: Octave,
    pub display: BeatDisplay,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BeatStrokeDirection {
    #[default]
    None,
    Up,
    Down,
}

impl BeatStrokeDirection {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            1 => BeatStrokeDirection::Up,
            2 => BeatStrokeDirection::Down,
            _ => BeatStrokeDirection::None,
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            BeatStrokeDirection::None => 0,
            BeatStrokeDirection::Up => 1,
            BeatStrokeDirection::Down => 2,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct BeatStroke {
    pub direction: BeatStrokeDirection,
    /// Stroke speed as a note value (4..=128), 0 when absent.
    pub value: u16,
}

impl BeatStroke {
    /// The version 5 wire order stores the speed bytes the other way
    /// around.
    pub const fn swap_direction(self) -> Self {
        let direction = match self.direction {
            BeatStrokeDirection::Up => BeatStrokeDirection::Down,
            BeatStrokeDirection::Down => BeatStrokeDirection::Up,
            BeatStrokeDirection::None => BeatStrokeDirection::None,
        };
        BeatStroke {
            direction,
            value: self.value,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SlapEffect {
    #[default]
    None,
    Tapping,
    Slapping,
    Popping,
    Unknown(u8),
}

impl SlapEffect {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            0 => SlapEffect::None,
            1 => SlapEffect::Tapping,
            2 => SlapEffect::Slapping,
            3 => SlapEffect::Popping,
            v => SlapEffect::Unknown(v),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            SlapEffect::None => 0,
            SlapEffect::Tapping => 1,
            SlapEffect::Slapping => 2,
            SlapEffect::Popping => 3,
            SlapEffect::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BeatEffects {
    pub stroke: BeatStroke,
    pub has_rasgueado: bool,
    pub pick_stroke: BeatStrokeDirection,
    pub fade_in: bool,
    pub vibrato: bool,
    pub slap_effect: SlapEffect,
    pub chord: Option<Chord>,
    pub tremolo_bar: Option<BendEffect>,
    pub mix_table_change: Option<MixTableChange>,
}

impl BeatEffects {
    /// True when nothing here would reach the wire. The chord and mix-table
    /// attachments do not count; they have their own presence flags.
    pub fn is_default(&self) -> bool {
        self.stroke == BeatStroke::default()
            && !self.has_rasgueado
            && self.pick_stroke == BeatStrokeDirection::None
            && !self.fade_in
            && !self.vibrato
            && self.slap_effect == SlapEffect::None
            && self.tremolo_bar.is_none()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct MixTableItem {
    pub value: i32,
    pub duration: i8,
    pub all_tracks: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WahEffect {
    /// -1 none, 0..=100 pedal position.
    pub value: i8,
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MixTableChange {
    pub instrument: Option<MixTableItem>,
    pub rse: Option<RseInstrument>,
    pub volume: Option<MixTableItem>,
    pub balance: Option<MixTableItem>,
    pub chorus: Option<MixTableItem>,
    pub reverb: Option<MixTableItem>,
    pub phaser: Option<MixTableItem>,
    pub tremolo: Option<MixTableItem>,
    pub tempo_name: Option<String>,
    pub tempo: Option<MixTableItem>,
    pub hide_tempo: bool,
    pub use_rse: bool,
    pub wah: Option<WahEffect>,
}

impl MixTableChange {
    /// A change that only moves the wah pedal.
    pub fn is_just_wah(&self) -> bool {
        self.instrument.is_none()
            && self.volume.is_none()
            && self.balance.is_none()
            && self.chorus.is_none()
            && self.reverb.is_none()
            && self.phaser.is_none()
            && self.tremolo.is_none()
            && self.tempo.is_none()
            && self.wah.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PitchClass {
    /// Semitone 0..=11.
    pub just: i8,
    /// flat (-1), none (0) or sharp (1).
    pub accidental: i8,
}

impl PitchClass {
    pub const fn from_semitone(semitone: i8) -> Self {
        PitchClass {
            just: semitone.rem_euclid(12),
            accidental: 0,
        }
    }

    pub const fn actual_value(&self) -> i8 {
        (self.just + self.accidental).rem_euclid(12)
    }

    pub fn note(&self) -> &'static str {
        SHARP_NOTES[self.actual_value() as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barre {
    pub fret: i32,
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Chord {
    /// String count of the owning track.
    pub length: u8,
    pub new_format: bool,
    pub sharp: Option<bool>,
    pub root: Option<PitchClass>,
    pub kind: Option<u8>,
    pub extension: Option<u8>,
    pub bass: Option<PitchClass>,
    pub tonality: Option<u8>,
    pub add: Option<bool>,
    pub name: String,
    /// Trailing bytes of the fixed-width name field, kept verbatim.
    pub name_padding: Vec<u8>,
    pub fifth: Option<u8>,
    pub ninth: Option<u8>,
    pub eleventh: Option<u8>,
    pub first_fret: i32,
    /// Fret per string, -1 for unplayed strings.
    pub strings: Vec<i32>,
    pub barres: Vec<Barre>,
    pub omissions: Vec<bool>,
    pub fingerings: Vec<Fingering>,
    pub show: Option<bool>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Fingering {
    #[default]
    Open,
    Thumb,
    Index,
    Middle,
    Annular,
    Little,
    Unknown(i8),
}

impl Fingering {
    pub const fn from_i8(value: i8) -> Self {
        match value {
            -1 => Fingering::Open,
            0 => Fingering::Thumb,
            1 => Fingering::Index,
            2 => Fingering::Middle,
            3 => Fingering::Annular,
            4 => Fingering::Little,
            v => Fingering::Unknown(v),
        }
    }

    pub const fn to_i8(self) -> i8 {
        match self {
            Fingering::Open => -1,
            Fingering::Thumb => 0,
            Fingering::Index => 1,
            Fingering::Middle => 2,
            Fingering::Annular => 3,
            Fingering::Little => 4,
            Fingering::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BendType {
    #[default]
    None,
    Bend,
    BendRelease,
    BendReleaseBend,
    Prebend,
    PrebendRelease,
    Dip,
    Dive,
    ReleaseUp,
    InvertedDip,
    Return,
    ReleaseDown,
    Unknown(i8),
}

impl BendType {
    pub const fn from_i8(value: i8) -> Self {
        match value {
            0 => BendType::None,
            1 => BendType::Bend,
            2 => BendType::BendRelease,
            3 => BendType::BendReleaseBend,
            4 => BendType::Prebend,
            5 => BendType::PrebendRelease,
            6 => BendType::Dip,
            7 => BendType::Dive,
            8 => BendType::ReleaseUp,
            9 => BendType::InvertedDip,
            10 => BendType::Return,
            11 => BendType::ReleaseDown,
            v => BendType::Unknown(v),
        }
    }

    pub const fn to_i8(self) -> i8 {
        match self {
            BendType::None => 0,
            BendType::Bend => 1,
            BendType::BendRelease => 2,
            BendType::BendReleaseBend => 3,
            BendType::Prebend => 4,
            BendType::PrebendRelease => 5,
            BendType::Dip => 6,
            BendType::Dive => 7,
            BendType::ReleaseUp => 8,
            BendType::InvertedDip => 9,
            BendType::Return => 10,
            BendType::ReleaseDown => 11,
            BendType::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BendPoint {
    /// 0..=12 along the bend curve.
    pub position: i32,
    /// Semitones, 1 per unit.
    pub value: i32,
    pub vibrato: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BendEffect {
    pub kind: BendType,
    /// Overall bend height in quarter-tone units.
    pub value: i32,
    pub points: Vec<BendPoint>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum GraceEffectTransition {
    #[default]
    None,
    Slide,
    Bend,
    Hammer,
    Unknown(i8),
}

impl GraceEffectTransition {
    pub const fn from_i8(value: i8) -> Self {
        match value {
            0 => GraceEffectTransition::None,
            1 => GraceEffectTransition::Slide,
            2 => GraceEffectTransition::Bend,
            3 => GraceEffectTransition::Hammer,
            v => GraceEffectTransition::Unknown(v),
        }
    }

    pub const fn to_i8(self) -> i8 {
        match self {
            GraceEffectTransition::None => 0,
            GraceEffectTransition::Slide => 1,
            GraceEffectTransition::Bend => 2,
            GraceEffectTransition::Hammer => 3,
            GraceEffectTransition::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GraceEffect {
    pub fret: i8,
    pub velocity: i16,
    /// Note value of the grace note: 16, 32 or 64.
    pub duration: u16,
    pub is_dead: bool,
    pub is_on_beat: bool,
    pub transition: GraceEffectTransition,
}

impl Default for GraceEffect {
    fn default() -> Self {
        GraceEffect {
            fret: 0,
            velocity: DEFAULT_VELOCITY,
            duration: THIRTY_SECOND,
            is_dead: false,
            is_on_beat: false,
            transition: GraceEffectTransition::None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HarmonicType {
    Natural,
    Artificial,
    Tapped,
    Pinch,
    Semi,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HarmonicEffect {
    pub kind: HarmonicType,
    // artificial harmonic
    pub pitch: Option<PitchClass>,
    pub octave: Option<Octave>,
    // tapped harmonic
    pub right_hand_fret: Option<i8>,
}

impl Default for HarmonicEffect {
    fn default() -> Self {
        HarmonicEffect {
            kind: HarmonicType::Natural,
            pitch: None,
            octave: None,
            right_hand_fret: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SlideType {
    IntoFromAbove,
    IntoFromBelow,
    None,
    ShiftSlideTo,
    LegatoSlideTo,
    OutDownwards,
    OutUpwards,
    Unknown(i8),
}

impl SlideType {
    pub const fn from_i8(value: i8) -> Self {
        match value {
            -2 => SlideType::IntoFromAbove,
            -1 => SlideType::IntoFromBelow,
            0 => SlideType::None,
            1 => SlideType::ShiftSlideTo,
            2 => SlideType::LegatoSlideTo,
            3 => SlideType::OutDownwards,
            4 => SlideType::OutUpwards,
            v => SlideType::Unknown(v),
        }
    }

    pub const fn to_i8(self) -> i8 {
        match self {
            SlideType::IntoFromAbove => -2,
            SlideType::IntoFromBelow => -1,
            SlideType::None => 0,
            SlideType::ShiftSlideTo => 1,
            SlideType::LegatoSlideTo => 2,
            SlideType::OutDownwards => 3,
            SlideType::OutUpwards => 4,
            SlideType::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TrillEffect {
    pub fret: i8,
    pub duration: Duration,
}

impl TrillEffect {
    pub const fn from_trill_period(period: i8) -> Option<u16> {
        match period {
            1 => Some(SIXTEENTH),
            2 => Some(THIRTY_SECOND),
            3 => Some(SIXTY_FOURTH),
            _ => None,
        }
    }

    pub const fn to_trill_period(value: u16) -> Option<i8> {
        match value {
            SIXTEENTH => Some(1),
            THIRTY_SECOND => Some(2),
            SIXTY_FOURTH => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TremoloPickingEffect {
    pub duration: Duration,
}

impl TremoloPickingEffect {
    pub const fn from_tremolo_value(value: i8) -> Option<u16> {
        match value {
            1 => Some(EIGHTH),
            2 => Some(SIXTEENTH),
            3 => Some(THIRTY_SECOND),
            _ => None,
        }
    }

    pub const fn to_tremolo_value(value: u16) -> Option<i8> {
        match value {
            EIGHTH => Some(1),
            SIXTEENTH => Some(2),
            THIRTY_SECOND => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteEffect {
    pub accentuated: bool,
    pub heavy_accentuated: bool,
    pub ghost_note: bool,
    pub bend: Option<BendEffect>,
    pub grace: Option<GraceEffect>,
    pub harmonic: Option<HarmonicEffect>,
    pub trill: Option<TrillEffect>,
    pub tremolo_picking: Option<TremoloPickingEffect>,
    pub slides: Vec<SlideType>,
    pub hammer: bool,
    pub let_ring: bool,
    pub palm_mute: bool,
    pub staccato: bool,
    pub vibrato: bool,
    pub left_hand_finger: Fingering,
    pub right_hand_finger: Fingering,
}

impl Default for NoteEffect {
    fn default() -> Self {
        NoteEffect {
            accentuated: false,
            heavy_accentuated: false,
            ghost_note: false,
            bend: None,
            grace: None,
            harmonic: None,
            trill: None,
            tremolo_picking: None,
            slides: vec![],
            hammer: false,
            let_ring: false,
            palm_mute: false,
            staccato: false,
            vibrato: false,
            left_hand_finger: Fingering::Open,
            right_hand_finger: Fingering::Open,
        }
    }
}

impl NoteEffect {
    pub fn is_fingering(&self) -> bool {
        self.left_hand_finger != Fingering::Open || self.right_hand_finger != Fingering::Open
    }

    /// True when no effect record would reach the wire. The accent and ghost
    /// flags live in the note flag byte, not here.
    pub fn is_default(&self) -> bool {
        self.bend.is_none()
            && self.grace.is_none()
            && self.harmonic.is_none()
            && self.trill.is_none()
            && self.tremolo_picking.is_none()
            && self.slides.is_empty()
            && !self.hammer
            && !self.let_ring
            && !self.palm_mute
            && !self.staccato
            && !self.vibrato
            && !self.is_fingering()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum NoteType {
    #[default]
    Rest,
    Normal,
    Tie,
    Dead,
    Unknown(u8),
}

impl NoteType {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            0 => NoteType::Rest,
            1 => NoteType::Normal,
            2 => NoteType::Tie,
            3 => NoteType::Dead,
            v => NoteType::Unknown(v),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            NoteType::Rest => 0,
            NoteType::Normal => 1,
            NoteType::Tie => 2,
            NoteType::Dead => 3,
            NoteType::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Fret, or percussion value on a percussion track.
    pub value: i16,
    pub velocity: i16,
    pub string: i8,
    pub kind: NoteType,
    pub effect: NoteEffect,
    pub swap_accidentals: bool,
    /// Stretch factor of the note inside its beat, version 5 on.
    pub duration_percent: f64,
    /// Time-independent duration pair (value, tuplet) from old files.
    pub independent_duration: Option<(i8, i8)>,
}

impl Default for Note {
    fn default() -> Self {
        Note {
            value: 0,
            velocity: DEFAULT_VELOCITY,
            string: 1,
            kind: NoteType::Rest,
            effect: NoteEffect::default(),
            swap_accidentals: false,
            duration_percent: 1.0,
            independent_duration: None,
        }
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.velocity.hash(state);
        self.string.hash(state);
        self.kind.hash(state);
        self.effect.hash(state);
        self.swap_accidentals.hash(state);
        self.duration_percent.to_bits().hash(state);
        self.independent_duration.hash(state);
    }
}

// the version records provenance, not musical content
impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.song_info == other.song_info
            && self.triplet_feel == other.triplet_feel
            && self.lyrics == other.lyrics
            && self.master_effect == other.master_effect
            && self.page_setup == other.page_setup
            && self.tempo == other.tempo
            && self.hide_tempo == other.hide_tempo
            && self.key_signature == other.key_signature
            && self.octave == other.octave
            && self.midi_channels == other.midi_channels
            && self.directions == other.directions
            && self.measure_headers == other.measure_headers
            && self.tracks == other.tracks
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.song_info.hash(state);
        self.triplet_feel.hash(state);
        self.lyrics.hash(state);
        self.master_effect.hash(state);
        self.page_setup.hash(state);
        self.tempo.hash(state);
        self.hide_tempo.hash(state);
        self.key_signature.hash(state);
        self.octave.hash(state);
        self.midi_channels.hash(state);
        self.directions.hash(state);
        self.measure_headers.hash(state);
        self.tracks.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::duration::QUARTER_TIME;

    #[test]
    fn track_factory_keeps_measure_count_invariant() {
        let song = Song {
            measure_headers: vec![MeasureHeader::default(); 3],
            ..Song::default()
        };
        let track = Track::new_for_song(&song, 1);
        assert_eq!(track.measures.len(), song.measure_headers.len());
        for measure in &track.measures {
            assert_eq!(measure.voices.len(), MAX_VOICES);
        }
    }

    #[test]
    fn measure_header_equality_ignores_start_and_tempo() {
        let a = MeasureHeader::default();
        let b = MeasureHeader {
            start: a.start + QUARTER_TIME * 4,
            tempo: 90,
            ..MeasureHeader::default()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn song_equality_ignores_version() {
        let a = Song::default();
        let b = Song {
            version: GpVersion::GP5_10,
            ..Song::default()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn note_hash_is_consistent_with_equality() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |note: &Note| {
            let mut h = DefaultHasher::new();
            note.hash(&mut h);
            h.finish()
        };
        let a = Note {
            value: 5,
            string: 2,
            kind: NoteType::Normal,
            ..Note::default()
        };
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn start_in_measure_accumulates_preceding_beats() {
        let beat = |value| Beat {
            duration: Duration::new(value),
            ..Beat::default()
        };
        let voice = Voice {
            beats: vec![beat(4), beat(8), beat(8)],
        };
        assert_eq!(voice.start_in_measure(0), 0);
        assert_eq!(voice.start_in_measure(1), QUARTER_TIME);
        assert_eq!(voice.start_in_measure(2), QUARTER_TIME + QUARTER_TIME / 2);
        #[allow(deprecated)]
        {
            assert_eq!(voice.real_start(2), voice.start_in_measure(2));
        }
    }

    #[test]
    fn velocity_packing_round_trips() {
        for dynamic in 1..=9 {
            assert_eq!(pack_velocity(unpack_velocity(dynamic)), dynamic);
        }
        assert_eq!(unpack_velocity(6), DEFAULT_VELOCITY);
    }

    #[test]
    fn percussion_channel_is_channel_nine() {
        let channels = MidiChannel::default_channels();
        assert_eq!(channels.len(), 64);
        assert!(channels[9].is_percussion());
        assert_eq!(channels[9].bank, DEFAULT_PERCUSSION_BANK);
        assert!(!channels[0].is_percussion());
    }

    #[test]
    fn key_signature_displays_name() {
        assert_eq!(KeySignature::new(0, false).to_string(), "C major");
        assert_eq!(KeySignature::new(2, true).to_string(), "B minor");
    }
}
