// Signed musical intervals.
//
// An interval is (steps, distance, sign): the number of degree steps spanned,
// the exact semitone distance, and a direction. Steps and distance are kept
// nonnegative with the direction factored out into the sign, which makes the
// quality tables below applicable to both directions.
//
// Spelling matters: M3 and d4 span the same four semitones but different step
// counts and are different intervals. `enharmonic` comparisons ignore steps,
// `to_simple` folds compound intervals back into one octave, and `matches`
// compares compound intervals against a simple prototype (the form rule cost
// tables are written in).

use std::fmt;
use std::str::FromStr;

use num_traits::Signed;
use serde::{Deserialize, Serialize};

use crate::pitch::{DEGREE_COUNT, PITCH_CLASSES};
use crate::time::{Time, whole};
use crate::ParseError;

/// Interval direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sign {
    Up,
    Down,
}

impl Sign {
    pub fn factor(self) -> i64 {
        match self {
            Sign::Up => 1,
            Sign::Down => -1,
        }
    }

    pub fn flip(self) -> Sign {
        match self {
            Sign::Up => Sign::Down,
            Sign::Down => Sign::Up,
        }
    }

    pub fn of(n: i64) -> Sign {
        if n < 0 { Sign::Down } else { Sign::Up }
    }

    /// Combine two directions, as multiplication of their factors.
    pub fn compose(self, other: Sign) -> Sign {
        if self == other { Sign::Up } else { Sign::Down }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quality {
    Perfect,
    Major,
    Minor,
    Augmented,
    Diminished,
}

impl Quality {
    fn abbr(self) -> char {
        match self {
            Quality::Perfect => 'P',
            Quality::Major => 'M',
            Quality::Minor => 'm',
            Quality::Augmented => 'A',
            Quality::Diminished => 'd',
        }
    }

    fn word(self) -> &'static str {
        match self {
            Quality::Perfect => "perfect",
            Quality::Major => "major",
            Quality::Minor => "minor",
            Quality::Augmented => "augmented",
            Quality::Diminished => "diminished",
        }
    }
}

use Quality::{Augmented as A, Diminished as D, Major as MA, Minor as MI, Perfect as P};

/// Semitone count and quality for each simple step count (0 = unison through
/// 7 = octave).
const QUALITIES: [&[(i64, Quality)]; 8] = [
    &[(0, P), (1, A)],
    &[(0, D), (1, MI), (2, MA), (3, A)],
    &[(2, D), (3, MI), (4, MA), (5, A)],
    &[(4, D), (5, P), (6, A)],
    &[(6, D), (7, P), (8, A)],
    &[(7, D), (8, MI), (9, MA), (10, A)],
    &[(9, D), (10, MI), (11, MA), (12, A)],
    &[(11, D), (12, P), (13, A)],
];

/// A signed interval in the standard heptatonic system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    /// Number of degree steps spanned. Nonnegative.
    pub steps: u32,
    /// Semitone distance spanned. Nonnegative.
    pub distance: Time,
    pub sign: Sign,
}

impl Interval {
    pub fn new(steps: u32, distance: Time, sign: Sign) -> Interval {
        assert!(distance >= whole(0));
        Interval { steps, distance, sign }
    }

    pub fn signed_steps(&self) -> i64 {
        i64::from(self.steps) * self.sign.factor()
    }

    pub fn signed_distance(&self) -> Time {
        self.distance * whole(self.sign.factor())
    }

    /// Same distance and direction, spelling ignored.
    pub fn enharmonic_eq(&self, other: &Interval) -> bool {
        self.sign == other.sign && self.distance == other.distance
    }

    pub fn add(&self, other: &Interval) -> Interval {
        let d = self.signed_distance() + other.signed_distance();
        let s = self.signed_steps() + other.signed_steps();
        let sign = if d == whole(0) { Sign::of(s) } else { Sign::of(*d.numer()) };
        Interval::new(s.unsigned_abs() as u32, d.abs(), sign)
    }

    pub fn add_period(&self, n: i32) -> Interval {
        if n == 0 {
            return *self;
        }
        let offset = Interval::new(
            DEGREE_COUNT as u32 * n.unsigned_abs(),
            whole(PITCH_CLASSES * i64::from(n.unsigned_abs())),
            Sign::of(i64::from(n)),
        );
        self.add(&offset)
    }

    /// Reduce a compound interval to its within-octave form.
    pub fn to_simple(&self) -> Interval {
        self.to_simple_preserving(0)
    }

    /// Like `to_simple`, but intervals of at most `up_to` steps are kept
    /// compound. `up_to == 0` means no preservation.
    pub fn to_simple_preserving(&self, up_to: u32) -> Interval {
        if self.steps < DEGREE_COUNT as u32 {
            return *self;
        }
        if up_to > 0 && self.steps <= up_to {
            return *self;
        }
        let degrees = DEGREE_COUNT as u32;
        let preserve_periods = up_to / degrees;

        let by_steps = self.steps / degrees;
        let by_distance = (self.distance / whole(PITCH_CLASSES)).floor().to_integer();
        let by_distance = by_distance.max(0) as u32;
        let mut periods = by_steps.min(by_distance).saturating_sub(preserve_periods);
        let mut steps = self.steps - periods * degrees;

        if up_to > 0 && steps > up_to {
            periods += 1;
            steps -= degrees;
        }
        let distance = self.distance - whole(PITCH_CLASSES * i64::from(periods));
        Interval::new(steps, distance, self.sign)
    }

    /// True if `other` equals `self`, or is a larger compound of the same
    /// simple interval.
    pub fn matches(&self, other: &Interval) -> bool {
        other.to_simple() == self.to_simple() && other.distance >= self.distance
    }

    pub fn matches_enharmonically(&self, other: &Interval) -> bool {
        other.to_simple().enharmonic_eq(&self.to_simple()) && other.distance >= self.distance
    }

    pub fn with_sign(&self, sign: Sign) -> Interval {
        Interval { sign, ..*self }
    }

    pub fn negate(&self) -> Interval {
        Interval { sign: self.sign.flip(), ..*self }
    }

    pub fn abs(&self) -> Interval {
        Interval { sign: Sign::Up, ..*self }
    }

    /// The nearest named quality for this interval's simple form, and the
    /// leftover semitone difference from it.
    fn closest_well_known(&self) -> (Time, Quality) {
        let simple = self.to_simple_preserving(DEGREE_COUNT as u32);
        let mut best: Option<(Time, Quality)> = None;
        for &(semitones, quality) in QUALITIES[simple.steps as usize] {
            let d = simple.distance - whole(semitones);
            let better = match best {
                None => true,
                Some((diff, _)) => {
                    d.abs() < diff.abs()
                        || (d.abs() == diff.abs()
                            && ((d < whole(0) && quality == Quality::Diminished)
                                || (d > whole(0) && quality == Quality::Augmented)))
                }
            };
            if better {
                best = Some((d, quality));
            }
        }
        // Every step class has at least one named quality.
        best.unwrap_or_else(|| panic!("no quality table for {} steps", simple.steps))
    }

    /// Short form like `M3`, `-d5`, `A3+1`, `d12-2`.
    pub fn to_abbreviation(&self, always_signed: bool) -> String {
        let (diff, quality) = self.closest_well_known();
        let remainder = if diff == whole(0) {
            String::new()
        } else if diff > whole(0) {
            format!("+{diff}")
        } else {
            format!("{diff}")
        };
        let sign = match self.sign {
            Sign::Up if !always_signed => "",
            Sign::Up => "+",
            Sign::Down => "-",
        };
        format!("{sign}{}{}{remainder}", quality.abbr(), self.steps + 1)
    }
}

const ORDINALS: [&str; 13] = [
    "unison", "second", "third", "fourth", "fifth", "sixth", "seventh", "octave", "ninth",
    "tenth", "eleventh", "twelfth", "thirteenth",
];

fn ordinal(steps: u32) -> String {
    if let Some(name) = ORDINALS.get(steps as usize) {
        return (*name).to_string();
    }
    if steps % DEGREE_COUNT as u32 == 0 {
        return match steps / DEGREE_COUNT as u32 {
            1 => "octave".to_string(),
            2 => "double octave".to_string(),
            3 => "triple octave".to_string(),
            n => format!("{n}-octave"),
        };
    }
    let ord = steps + 1;
    let suffix = match ord % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{ord}{suffix}")
}

fn multiplier_adverb(n: Time, word: &str) -> String {
    if n == whole(1) {
        return word.to_string();
    }
    if n.is_integer() {
        match n.to_integer() {
            2 => return format!("doubly-{word}"),
            3 => return format!("triply-{word}"),
            _ => {}
        }
    }
    format!("{n}\u{d7}-{word}")
}

impl fmt::Display for Interval {
    /// Long name like `major sixth` or `triply-diminished twelfth`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (diff, q) = self.closest_well_known();
        let name = ordinal(self.steps);
        let quality = if self.steps % DEGREE_COUNT as u32 == 0 && q == Quality::Perfect {
            String::new()
        } else {
            format!("{} ", q.word())
        };
        let main = if diff == whole(0) {
            format!("{quality}{name}")
        } else if (diff <= whole(0) && q == Quality::Diminished)
            || (diff >= whole(0) && q == Quality::Augmented)
        {
            format!("{} {name}", multiplier_adverb(diff.abs() + whole(1), quality.trim_end()))
        } else if diff > whole(0) {
            format!("{quality}{name} +{diff}")
        } else {
            format!("{quality}{name} {diff}")
        };
        let sign = match self.sign {
            _ if !f.alternate() => "",
            Sign::Up => " upward",
            Sign::Down => " downward",
        };
        write!(f, "{main}{sign}")
    }
}

impl FromStr for Interval {
    type Err = ParseError;

    /// Parse sign (optional) + quality + number + further semitone difference
    /// (optional), e.g. `P5`, `-m3`, `A3+1` (doubly augmented), `d12+1/4`.
    fn from_str(ex: &str) -> Result<Interval, ParseError> {
        let err = || ParseError::Interval(ex.to_string());
        let mut rest = ex;

        let sign = match rest.chars().next() {
            Some('-') => {
                rest = &rest[1..];
                Sign::Down
            }
            Some('+') => {
                rest = &rest[1..];
                Sign::Up
            }
            _ => Sign::Up,
        };

        let quality_char = rest.chars().next().ok_or_else(err)?;
        let quality = match quality_char {
            'P' => Quality::Perfect,
            'M' => Quality::Major,
            'm' => Quality::Minor,
            'A' => Quality::Augmented,
            'd' => Quality::Diminished,
            _ => return Err(err()),
        };
        rest = &rest[1..];

        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(err());
        }
        let (number, remainder) = rest.split_at(digits);
        let number: u32 = number.parse().map_err(|_| err())?;
        if number == 0 {
            return Err(err());
        }
        let remainder: Time = if remainder.is_empty() {
            whole(0)
        } else {
            if !remainder.starts_with(['+', '-']) {
                return Err(err());
            }
            remainder.parse().map_err(|_| err())?
        };

        let steps = number - 1;
        let degrees = DEGREE_COUNT as u32;
        let mut octaves = steps / degrees;
        let mut simple_steps = steps % degrees;
        if simple_steps == 0 && octaves > 0 {
            simple_steps = degrees;
            octaves -= 1;
        }

        let semitones = QUALITIES[simple_steps as usize]
            .iter()
            .find(|(_, q)| *q == quality)
            .map(|(s, _)| *s)
            .ok_or_else(err)?;

        let distance = remainder + whole(semitones + i64::from(octaves) * PITCH_CLASSES);
        if distance < whole(0) {
            return Err(err());
        }
        Ok(Interval::new(steps, distance, sign))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::time;

    fn i(ex: &str) -> Interval {
        ex.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        let a = i("-m3+1/2");
        assert_eq!(a.sign, Sign::Down);
        assert_eq!(a.steps, 2);
        assert_eq!(a.distance, whole(3) + time(1, 2));

        let b = i("M6");
        assert_eq!(b.sign, Sign::Up);
        assert_eq!(b.steps, 5);
        assert_eq!(b.distance, whole(9));

        let c = i("d4");
        assert_eq!(c.steps, 3);
        assert_eq!(c.distance, whole(4));

        let d = i("d12-2");
        assert_eq!(d.sign, Sign::Up);
        assert_eq!(d.steps, 11);
        assert_eq!(d.distance, whole(16));
    }

    #[test]
    fn test_parse_fail() {
        assert!("".parse::<Interval>().is_err());
        assert!("4".parse::<Interval>().is_err());
        assert!("m3+".parse::<Interval>().is_err());
        assert!("m3+1.5".parse::<Interval>().is_err());
        assert!("m8".parse::<Interval>().is_err());
    }

    #[test]
    fn test_abbreviation() {
        let a = Interval::new(2, whole(3) + time(1, 2), Sign::Down);
        let abbr = a.to_abbreviation(false);
        assert!(abbr == "-m3+1/2" || abbr == "-M3-1/2");

        let b = Interval::new(11, whole(16), Sign::Up);
        assert_eq!(b.to_abbreviation(false), "d12-2");
        assert_eq!(b.to_abbreviation(true), "+d12-2");

        assert_eq!(Interval::new(5, whole(9), Sign::Up).to_abbreviation(false), "M6");
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::new(3, whole(6), Sign::Down).to_string(), "augmented fourth");
        assert_eq!(format!("{:#}", Interval::new(3, whole(6), Sign::Down)), "augmented fourth downward");
        assert_eq!(Interval::new(11, whole(16), Sign::Up).to_string(), "triply-diminished twelfth");
        assert_eq!(Interval::new(5, whole(9), Sign::Up).to_string(), "major sixth");
        assert_eq!(Interval::new(11, whole(21), Sign::Up).to_string(), "doubly-augmented twelfth");
        assert_eq!(
            Interval::new(11, whole(20) + time(1, 2), Sign::Up).to_string(),
            "3/2\u{d7}-augmented twelfth"
        );
        assert_eq!(Interval::new(13, whole(23), Sign::Up).to_string(), "major 14th");
        assert_eq!(Interval::new(7, whole(12), Sign::Up).to_string(), "octave");
        assert_eq!(Interval::new(14, whole(24), Sign::Up).to_string(), "double octave");
        assert_eq!(Interval::new(35, whole(60), Sign::Up).to_string(), "5-octave");
        assert_eq!(Interval::new(14, whole(25), Sign::Up).to_string(), "augmented double octave");
    }

    #[test]
    fn test_equality() {
        assert_eq!(i("M3+1/4"), i("M3+1/4"));
        assert_eq!(i("m3+1/2"), i("M3-1/2"));
        assert_ne!(i("M3"), i("d4"));
        assert!(i("M3").enharmonic_eq(&i("d4")));
    }

    #[test]
    fn test_add() {
        assert_eq!(i("m3").add(&i("m3")), i("d5"));
        assert_eq!(i("M3").add(&i("-m3")), i("A1"));
        assert_eq!(i("-M3").add(&i("m3")), i("-A1"));
        assert_eq!(i("P1").add(&i("-A1")), i("-A1"));
        assert_eq!(i("d2").add(&i("d2")), i("d3-2"));
        assert_eq!(i("-d2").add(&i("-d2")), i("-d3-2"));
    }

    #[test]
    fn test_add_period() {
        assert_eq!(i("A3").add_period(0), i("A3"));
        assert_eq!(i("d3").add_period(10), i("d73"));
        assert_eq!(i("d73").add_period(-10), i("d3"));
    }

    #[test]
    fn test_negate_abs() {
        let x = i("M3+1/4");
        assert_eq!(x.negate(), i("-M3+1/4"));
        assert_eq!(x.negate().negate(), x);
        assert_eq!(x.negate().abs(), x);
    }

    #[test]
    fn test_to_simple() {
        let x = i("M17");
        assert_eq!(x.to_simple(), i("M3"));
        assert_eq!(x.to_simple_preserving(7), i("M3"));
        assert_eq!(x.to_simple_preserving(12), i("M10"));
        assert_eq!(x.to_simple_preserving(17), i("M17"));
        assert_eq!(x.to_simple().to_simple(), i("M3"));
    }

    #[test]
    fn test_matches() {
        let x = i("M10");
        assert!(!x.matches(&i("M3")));
        assert!(!x.matches(&i("M16")));
        assert!(x.matches(&i("M10")));
        assert!(!x.matches(&i("d11")));
        assert!(x.matches_enharmonically(&i("d11")));
    }
}
