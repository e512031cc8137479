//! Symbolic note durations and their fixed-point time arithmetic.
//!
//! All timeline math is integer, in ticks of 1/960 of a quarter note.

use crate::error::TabError;

pub const QUARTER_TIME: i64 = 960;

pub const WHOLE: u16 = 1;
pub const HALF: u16 = 2;
pub const QUARTER: u16 = 4;
pub const EIGHTH: u16 = 8;
pub const SIXTEENTH: u16 = 16;
pub const THIRTY_SECOND: u16 = 32;
pub const SIXTY_FOURTH: u16 = 64;
pub const HUNDRED_TWENTY_EIGHTH: u16 = 128;

/// Ratio compressing `enters` notes into the time of `times`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Tuplet {
    pub enters: u8,
    pub times: u8,
}

/// Tuplet ratios the editor can display, in the order `from_time` tries them.
pub const SUPPORTED_TUPLETS: [Tuplet; 10] = [
    Tuplet::new(1, 1),
    Tuplet::new(3, 2),
    Tuplet::new(5, 4),
    Tuplet::new(6, 4),
    Tuplet::new(7, 4),
    Tuplet::new(9, 8),
    Tuplet::new(10, 8),
    Tuplet::new(11, 8),
    Tuplet::new(12, 8),
    Tuplet::new(13, 8),
];

impl Tuplet {
    pub const fn new(enters: u8, times: u8) -> Self {
        Tuplet { enters, times }
    }

    pub const fn is_default(&self) -> bool {
        self.enters == 1 && self.times == 1
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_TUPLETS.contains(self)
    }

    pub fn convert_time(&self, time: i64) -> i64 {
        log::debug!(
            "time:{} tuplet_times:{} tuplet_enters:{}",
            time,
            self.times,
            self.enters
        );
        time * self.times as i64 / self.enters as i64
    }
}

impl Default for Tuplet {
    fn default() -> Self {
        Tuplet::new(1, 1)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Duration {
    /// Power-of-two note value, 1 (whole) to 128.
    pub value: u16,
    pub dotted: bool,
    /// Legacy flag, decoded from old files but never produced by `from_time`.
    pub double_dotted: bool,
    pub tuplet: Tuplet,
}

impl Default for Duration {
    fn default() -> Self {
        Duration {
            value: QUARTER,
            dotted: false,
            double_dotted: false,
            tuplet: Tuplet::default(),
        }
    }
}

impl Duration {
    pub const fn new(value: u16) -> Self {
        Duration {
            value,
            dotted: false,
            double_dotted: false,
            tuplet: Tuplet::new(1, 1),
        }
    }

    /// Tick count of this duration.
    pub fn time(&self) -> i64 {
        let mut time = QUARTER_TIME * 4 / self.value as i64;
        if self.dotted {
            time += time / 2;
        } else if self.double_dotted {
            time += time / 4 * 3;
        }
        self.tuplet.convert_time(time)
    }

    /// Inverse of [`Duration::time`]: search the representable durations for
    /// one reproducing `ticks` exactly.
    ///
    /// Never reconstructs a double-dotted duration.
    pub fn from_time(ticks: i64) -> Result<Self, TabError> {
        for dotted in [false, true] {
            for tuplet in SUPPORTED_TUPLETS {
                let mut value = WHOLE;
                while value <= HUNDRED_TWENTY_EIGHTH {
                    let candidate = Duration {
                        value,
                        dotted,
                        double_dotted: false,
                        tuplet,
                    };
                    if candidate.time() == ticks {
                        return Ok(candidate);
                    }
                    value *= 2;
                }
            }
        }
        Err(TabError::UnrepresentableDuration(ticks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_is_960_ticks() {
        assert_eq!(Duration::new(QUARTER).time(), QUARTER_TIME);
        assert_eq!(Duration::new(WHOLE).time(), QUARTER_TIME * 4);
        assert_eq!(Duration::new(HUNDRED_TWENTY_EIGHTH).time(), 30);
    }

    #[test]
    fn dotted_adds_half() {
        let d = Duration {
            dotted: true,
            ..Duration::new(HALF)
        };
        assert_eq!(d.time(), 2880);
    }

    #[test]
    fn triplet_compresses_three_into_two() {
        let d = Duration {
            tuplet: Tuplet::new(3, 2),
            ..Duration::new(EIGHTH)
        };
        assert_eq!(d.time() * 3, Duration::new(QUARTER).time() * 2);
    }

    #[test]
    fn from_time_inverts_time() {
        // tuplets with a duplicated ratio (6:4, 10:8, 12:8) resolve to the
        // reduced form first, so they are not part of the inverse law
        let unique_tuplets = [
            Tuplet::new(1, 1),
            Tuplet::new(3, 2),
            Tuplet::new(5, 4),
            Tuplet::new(7, 4),
            Tuplet::new(9, 8),
            Tuplet::new(11, 8),
            Tuplet::new(13, 8),
        ];
        for dotted in [false, true] {
            for tuplet in unique_tuplets {
                let mut value = WHOLE;
                while value <= HUNDRED_TWENTY_EIGHTH {
                    let d = Duration {
                        value,
                        dotted,
                        double_dotted: false,
                        tuplet,
                    };
                    assert_eq!(Duration::from_time(d.time()).unwrap(), d);
                    value *= 2;
                }
            }
        }
    }

    #[test]
    fn from_time_rejects_unreachable_ticks() {
        let err = Duration::from_time(961).unwrap_err();
        assert!(matches!(err, TabError::UnrepresentableDuration(961)));
    }

    #[test]
    fn from_time_never_yields_double_dotted() {
        let dd = Duration {
            double_dotted: true,
            ..Duration::new(QUARTER)
        };
        // 1680 ticks is also a plain duration in no supported combination
        match Duration::from_time(dd.time()) {
            Ok(d) => assert!(!d.double_dotted),
            Err(TabError::UnrepresentableDuration(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
