// Scales and scale degrees.
//
// A scale is an ordered list of degree pitches anchored at a root, together
// with the intervals from each degree to the next (the last interval wraps
// back to the root an octave up). Scales are not limited to seven degrees:
// the "complete minor" preset carries nine, so both melodic-minor inflections
// of the 6th and 7th are available to resolution rules at once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::pitch::Pitch;
use crate::time::{Time, whole};

/// A reference to a scale degree: index into the degree list, plus an extra
/// accidental and period displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Degree {
    pub index: usize,
    pub acci: Time,
    pub period: i32,
}

/// A scale in the standard heptatonic system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    /// Degree pitches, strictly increasing, spanning less than one octave.
    /// The first degree is the root.
    degrees: Vec<Pitch>,
    /// Interval from each degree to the next; the last wraps to the root's
    /// octave. Always positive.
    intervals: Vec<Interval>,
}

impl Scale {
    /// Build from the interval pattern between successive degrees.
    pub fn from_intervals(root: Pitch, intervals: Vec<Interval>) -> Scale {
        assert!(!intervals.is_empty());
        let mut degrees = vec![root];
        let mut current = root;
        for int in &intervals[..intervals.len() - 1] {
            current = current.add(int);
            degrees.push(current);
        }
        Scale { degrees, intervals }
    }

    /// Build from the degree pitches themselves.
    pub fn from_pitches(degrees: Vec<Pitch>) -> Scale {
        assert!(!degrees.is_empty());
        let mut intervals = Vec::with_capacity(degrees.len());
        for pair in degrees.windows(2) {
            intervals.push(pair[0].interval_to(&pair[1]));
        }
        intervals.push(degrees[degrees.len() - 1].interval_to(&degrees[0].add_period(1)));
        Scale { degrees, intervals }
    }

    pub fn root(&self) -> Pitch {
        self.degrees[0]
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    pub fn degrees(&self) -> &[Pitch] {
        &self.degrees
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// The degree at `index`, optionally inflected by an accidental.
    pub fn at(&self, index: usize, acci: Time) -> Degree {
        assert!(index < self.degrees.len());
        Degree { index, acci, period: 0 }
    }

    pub fn pitch_of(&self, degree: &Degree) -> Pitch {
        let base = self.degrees[degree.index];
        Pitch::new(base.degree, base.acci + degree.acci, base.period + degree.period)
    }

    /// Find the degree a pitch spells, ignoring its octave. `None` if the
    /// pitch is not in the scale.
    pub fn exact_degree(&self, p: &Pitch) -> Option<Degree> {
        let p0 = p.with_period(0);
        let index = self.degrees.iter().position(|x| x.with_period(0) == p0)?;
        Some(self.at(index, whole(0)))
    }

    /// Rotate the interval pattern by `n`, yielding a mode of this scale.
    pub fn rotate(&self, n: i64, move_root: bool) -> Scale {
        let len = self.intervals.len() as i64;
        let shift = n.rem_euclid(len) as usize;
        let mut intervals: Vec<Interval> = self.intervals[shift..].to_vec();
        intervals.extend_from_slice(&self.intervals[..shift]);

        let root = if move_root {
            self.degrees[shift].with_period(0)
        } else {
            self.root()
        };
        Scale::from_intervals(root, intervals)
    }

    /// Transpose every degree by an interval, folding the root back into
    /// period zero.
    pub fn transpose(&self, int: &Interval) -> Scale {
        let new_root = self.root().add(int);
        let int = if new_root.period != 0 {
            int.add_period(-new_root.period)
        } else {
            *int
        };
        Scale {
            degrees: self.degrees.iter().map(|x| x.add(&int)).collect(),
            intervals: self.intervals.clone(),
        }
    }

    pub fn transpose_to(&self, new_root: &Pitch) -> Scale {
        let int = self.root().interval_to(&new_root.with_period(0));
        self.transpose(&int)
    }

    /// Every scale-degree pitch whose height lies within `[low, high]`,
    /// ascending.
    pub fn degrees_in_range(&self, low: &Pitch, high: &Pitch) -> Vec<Pitch> {
        let mut result = Vec::new();
        for period in (low.period - 1)..=(high.period + 1) {
            for base in &self.degrees {
                let p = base.add_period(period);
                if p.ord() >= low.ord() && p.ord() <= high.ord() {
                    result.push(p);
                }
            }
        }
        result.sort_by_key(|p| (p.ord(), p.degree));
        result
    }

    // Presets. Roots are pitch classes: the given root's period is ignored.

    pub fn major(root: Pitch) -> Scale {
        Scale::parse_degrees(&["c", "d", "e", "f", "g", "a", "b"]).transpose_to(&root)
    }

    pub fn harmonic_minor(root: Pitch) -> Scale {
        Scale::parse_degrees(&["c", "d", "ef", "f", "g", "af", "b"]).transpose_to(&root)
    }

    /// Nine-degree minor with both inflections of the 6th and 7th degrees,
    /// so ascending and descending melodic-minor motion both stay in scale.
    pub fn complete_minor(root: Pitch) -> Scale {
        Scale::parse_degrees(&["c", "d", "ef", "f", "g", "af", "a", "bf", "b"])
            .transpose_to(&root)
    }

    pub fn chromatic(root: Pitch) -> Scale {
        Scale::parse_degrees(&["c", "cs", "d", "ds", "e", "f", "fs", "g", "gs", "a", "as", "b"])
            .transpose_to(&root)
    }

    fn parse_degrees(names: &[&str]) -> Scale {
        let degrees = names
            .iter()
            .map(|ex| ex.parse().unwrap_or_else(|_| panic!("bad degree name {ex:?}")))
            .collect();
        Scale::from_pitches(degrees)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.degrees.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(ex: &str) -> Pitch {
        ex.parse().unwrap()
    }

    #[test]
    fn test_major_degrees() {
        let s = Scale::major(p("c0"));
        assert_eq!(s.len(), 7);
        assert_eq!(s.root(), p("c0"));
        let abbrs: Vec<String> = s
            .intervals()
            .iter()
            .map(|i| i.to_abbreviation(false))
            .collect();
        assert_eq!(abbrs, ["M2", "M2", "m2", "M2", "M2", "M2", "m2"]);
    }

    #[test]
    fn test_transpose_to() {
        // Only the root folds into period zero; upper degrees may spill over.
        let s = Scale::major(p("g0"));
        assert_eq!(s.degrees()[6], p("fs1"));
        let back = s.transpose_to(&p("c0"));
        assert_eq!(back, Scale::major(p("c0")));
    }

    #[test]
    fn test_rotate_is_mode() {
        // Sixth mode of C major is A aeolian.
        let aeolian = Scale::major(p("c0")).rotate(5, true);
        assert_eq!(aeolian.root(), p("a0"));
        let abbrs: Vec<String> = aeolian
            .intervals()
            .iter()
            .map(|i| i.to_abbreviation(false))
            .collect();
        assert_eq!(abbrs, ["M2", "m2", "M2", "M2", "m2", "M2", "M2"]);
    }

    #[test]
    fn test_exact_degree() {
        let s = Scale::major(p("c0"));
        assert_eq!(s.exact_degree(&p("e5")).map(|d| d.index), Some(2));
        assert_eq!(s.exact_degree(&p("ef5")), None);

        let m = Scale::complete_minor(p("c0"));
        assert_eq!(m.exact_degree(&p("a3")).map(|d| d.index), Some(6));
        assert_eq!(m.exact_degree(&p("bf3")).map(|d| d.index), Some(7));
        assert_eq!(m.exact_degree(&p("b3")).map(|d| d.index), Some(8));
    }

    #[test]
    fn test_degrees_in_range() {
        let s = Scale::major(p("c0"));
        let range = s.degrees_in_range(&p("b3"), &p("e4"));
        let names: Vec<String> = range.iter().map(|x| x.to_string()).collect();
        assert_eq!(names, ["b3", "c4", "d4", "e4"]);
    }

    #[test]
    fn test_serde_round_trip() {
        let s = Scale::complete_minor(p("d0"));
        let json = serde_json::to_string(&s).unwrap();
        let back: Scale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_pitch_of_degree() {
        let s = Scale::major(p("d0"));
        let deg = s.at(6, whole(0));
        assert_eq!(s.pitch_of(&deg), p("cs1"));
    }
}
