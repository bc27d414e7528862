// Spelled pitches in the standard heptatonic system.
//
// A pitch is (degree letter, accidental, octave). The accidental is an exact
// `Time` offset in semitones, so quarter-tone and smaller inflections spell
// fine. Two pitches with the same sounding height but different spellings
// (ds4 vs ef4) are distinct values and only *enharmonically* equal.
//
// The system constants below (7 degrees, 12 pitch classes per octave, the
// semitone offset of each degree) are the single place the common-practice
// tuning layout is written down; interval.rs and scale.rs build on them.

use std::fmt;
use std::str::FromStr;

use num_traits::Signed;
use serde::{Deserialize, Serialize};

use crate::interval::{Interval, Sign};
use crate::time::{Time, whole};
use crate::ParseError;

/// Number of named degrees per octave (c d e f g a b).
pub const DEGREE_COUNT: usize = 7;

/// Number of pitch classes (semitones) per octave.
pub const PITCH_CLASSES: i64 = 12;

/// Semitone offset of each degree from c.
pub const DEGREE_OFFSETS: [i64; DEGREE_COUNT] = [0, 2, 4, 5, 7, 9, 11];

/// Degree letter names, in degree order.
pub const DEGREE_NAMES: [char; DEGREE_COUNT] = ['c', 'd', 'e', 'f', 'g', 'a', 'b'];

/// A spelled pitch: degree index, accidental in semitones, octave number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pitch {
    pub degree: usize,
    pub acci: Time,
    pub period: i32,
}

impl Pitch {
    pub fn new(degree: usize, acci: Time, period: i32) -> Pitch {
        assert!(degree < DEGREE_COUNT);
        Pitch { degree, acci, period }
    }

    pub fn natural(degree: usize, period: i32) -> Pitch {
        Pitch::new(degree, whole(0), period)
    }

    /// Absolute height in semitones above c0.
    pub fn ord(&self) -> Time {
        self.acci
            + whole(DEGREE_OFFSETS[self.degree])
            + whole(PITCH_CLASSES * i64::from(self.period))
    }

    /// Signed degree-count from `self` up to `other`.
    pub fn steps_to(&self, other: &Pitch) -> i64 {
        let a = self.degree as i64 + i64::from(self.period) * DEGREE_COUNT as i64;
        let b = other.degree as i64 + i64::from(other.period) * DEGREE_COUNT as i64;
        b - a
    }

    /// Signed semitone distance from `self` up to `other`.
    pub fn distance_to(&self, other: &Pitch) -> Time {
        other.ord() - self.ord()
    }

    pub fn interval_to(&self, other: &Pitch) -> Interval {
        let steps = self.steps_to(other);
        let distance = self.distance_to(other);
        let sign = if distance < whole(0) { Sign::Down } else { Sign::Up };
        Interval::new(steps.unsigned_abs() as u32, distance.abs(), sign)
    }

    pub fn add(&self, int: &Interval) -> Pitch {
        let total = self.degree as i64
            + i64::from(self.period) * DEGREE_COUNT as i64
            + int.signed_steps();
        let degree = total.rem_euclid(DEGREE_COUNT as i64) as usize;
        let period = total.div_euclid(DEGREE_COUNT as i64) as i32;
        let target = self.ord() + int.signed_distance();
        let acci =
            target - whole(DEGREE_OFFSETS[degree]) - whole(PITCH_CLASSES * i64::from(period));
        Pitch { degree, acci, period }
    }

    pub fn with_period(&self, period: i32) -> Pitch {
        Pitch { period, ..*self }
    }

    pub fn add_period(&self, n: i32) -> Pitch {
        Pitch { period: self.period + n, ..*self }
    }

    /// Same sounding height, regardless of spelling.
    pub fn enharmonic_eq(&self, other: &Pitch) -> bool {
        self.ord() == other.ord()
    }

    /// Respell so the accidental stays within double sharps/flats.
    pub fn normalize(&self) -> Pitch {
        if self.acci.abs() <= whole(2) {
            return *self;
        }
        let direction: i64 = if self.acci > whole(0) { 1 } else { -1 };
        let target = self.acci + whole(DEGREE_OFFSETS[self.degree]);

        let mut degree = self.degree as i64;
        let mut delta_period = 0i32;
        let mut acci = self.acci;
        while acci.abs() > whole(2) {
            degree += direction;
            if degree >= DEGREE_COUNT as i64 {
                degree = 0;
                delta_period += 1;
            }
            if degree < 0 {
                degree = DEGREE_COUNT as i64 - 1;
                delta_period -= 1;
            }
            acci = target
                - whole(DEGREE_OFFSETS[degree as usize])
                - whole(PITCH_CLASSES * i64::from(delta_period));
        }
        Pitch::new(degree as usize, acci, self.period + delta_period)
    }
}

/// Parse an accidental expression: `s`/`f` repeated, or a multiplier like
/// `3f` or `2/3s`. Empty and `n` are natural.
pub fn parse_accidental(ex: &str) -> Result<Time, ParseError> {
    if ex.is_empty() || ex == "n" {
        return Ok(whole(0));
    }
    let err = || ParseError::Accidental(ex.to_string());
    let mut acci = whole(0);
    let mut rest = ex;
    while !rest.is_empty() {
        let body_len = rest
            .find(|c| c == 's' || c == 'f')
            .ok_or_else(err)?;
        let (body, tail) = rest.split_at(body_len);
        let letter = tail.chars().next().ok_or_else(err)?;
        let amount: Time = if body.is_empty() {
            whole(1)
        } else {
            body.parse().map_err(|_| err())?
        };
        if amount <= whole(0) {
            return Err(err());
        }
        acci += match letter {
            's' => amount,
            'f' => -amount,
            _ => return Err(err()),
        };
        rest = &tail[1..];
    }
    Ok(acci)
}

/// Print an accidental the way `parse_accidental` reads it.
pub fn print_accidental(acci: Time) -> String {
    if acci == whole(0) {
        return String::new();
    }
    let letter = if acci > whole(0) { 's' } else { 'f' };
    let abs = acci.abs();
    if abs.is_integer() && abs <= whole(2) {
        return letter.to_string().repeat(abs.to_integer() as usize);
    }
    format!("{abs}{letter}")
}

impl FromStr for Pitch {
    type Err = ParseError;

    /// Parse note name + accidental + octave number, e.g. `c4`, `gff3`,
    /// `g3f3` (triple flat), `e2/3s6` (two-thirds sharp).
    fn from_str(ex: &str) -> Result<Pitch, ParseError> {
        let lower = ex.to_lowercase();
        let err = || ParseError::Pitch(ex.to_string());

        let mut chars = lower.chars();
        let letter = chars.next().ok_or_else(err)?;
        let degree = DEGREE_NAMES.iter().position(|&c| c == letter).ok_or_else(err)?;

        let body = chars.as_str();
        let digits = body.len() - body.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (middle, octave) = body.split_at(body.len() - digits);
        let period: i32 = if octave.is_empty() {
            0
        } else {
            octave.parse().map_err(|_| err())?
        };
        let acci = parse_accidental(middle).map_err(|_| err())?;
        Ok(Pitch::new(degree, acci, period))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            DEGREE_NAMES[self.degree],
            print_accidental(self.acci),
            self.period
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::time;

    fn p(ex: &str) -> Pitch {
        ex.parse().unwrap()
    }

    fn i(ex: &str) -> Interval {
        ex.parse().unwrap()
    }

    #[test]
    fn test_parse_ord() {
        assert_eq!(p("c").ord(), whole(0));
        assert_eq!(p("C10").ord(), whole(120));
        assert_eq!(p("eff4").ord(), whole(48 + 4 - 2));
        assert_eq!(p("esss4").ord(), whole(48 + 4 + 3));
        assert_eq!(p("e5f4").ord(), whole(48 + 4 - 5));
        assert_eq!(p("c1/4s4").ord(), whole(48) + time(1, 4));
    }

    #[test]
    fn test_parse_fail() {
        assert!("do4".parse::<Pitch>().is_err());
        assert!("h5".parse::<Pitch>().is_err());
        assert!("c3+1".parse::<Pitch>().is_err());
        assert!("".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for ex in ["c4", "c3f0", "gss7", "g6/17s7", "ef2"] {
            assert_eq!(p(ex).to_string(), ex);
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(p("c4"), p("c4"));
        assert_eq!(p("d12/34s5"), p("d6/17s5"));
        assert_ne!(p("e3/8s5"), p("f5/8f5"));
        assert!(p("e3/8s5").enharmonic_eq(&p("f5/8f5")));
        assert!(p("ds4").enharmonic_eq(&p("ef4")));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(p("cff4").normalize().to_string(), "cff4");
        assert_eq!(p("csss4").normalize().to_string(), "ds4");
        assert_eq!(p("cfff4").normalize().to_string(), "bff3");
        assert_eq!(p("b12s4").normalize().to_string(), "ass5");
    }

    #[test]
    fn test_add_interval() {
        assert_eq!(p("c4").add(&i("m3")).to_string(), "ef4");
        assert_eq!(p("cs4").add(&i("m3")).to_string(), "e4");
        assert_eq!(p("c4").add(&i("M3")).to_string(), "e4");
        assert_eq!(p("c4").add(&i("d6")).to_string(), "aff4");
        assert_eq!(p("c4").add(&i("d6+1/4")).to_string(), "a7/4f4");
        assert_eq!(p("c4").add(&i("-M2")).to_string(), "bf3");
    }

    #[test]
    fn test_interval_to() {
        assert_eq!(p("Ef4").interval_to(&p("Gss4")).to_abbreviation(false), "A3+1");
        assert_eq!(p("F4").interval_to(&p("B3")).to_abbreviation(false), "-d5");

        let x = p("g23/45s4");
        let y = p("c45/67f3");
        assert_eq!(x.add(&x.interval_to(&y)), y);
    }
}
