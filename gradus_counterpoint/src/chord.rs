// Chords and the harmony background.
//
// A chord is a bass pitch class plus the simple intervals of the remaining
// tones above it; the `position` field records which chord member sits in the
// bass (0 is root position). The harmony background pairs a scale with one
// optional chord slot per measure; slots left `None` are solved by the search
// when harmony rules are configured.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use gradus_core::{Interval, Pitch, Scale};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chord {
    /// Bass pitch class, always period 0.
    pub bass: Pitch,
    /// Simple intervals from the bass to each upper tone, ascending.
    pub intervals: Vec<Interval>,
    /// Index of the chord member sounding in the bass.
    pub position: usize,
}

impl Chord {
    pub fn new(bass: Pitch, intervals: Vec<Interval>, position: usize) -> Chord {
        Chord { bass: bass.with_period(0), intervals, position }
    }

    pub fn from_shape(bass: Pitch, shape: &ChordShape) -> Chord {
        Chord::new(bass, shape.intervals.clone(), shape.position)
    }

    /// Build from sounding pitches: the lowest becomes the bass and the rest
    /// fold into simple intervals above it.
    pub fn from_pitches(pitches: &[Pitch], position: usize) -> Chord {
        assert!(!pitches.is_empty());
        let mut sorted = pitches.to_vec();
        sorted.sort_by_key(|p| p.ord());
        let bass = sorted[0].with_period(0);
        let mut intervals: Vec<Interval> = sorted[1..]
            .iter()
            .map(|t| interval_above(&bass, t))
            .collect();
        intervals.sort();
        intervals.dedup();
        Chord { bass, intervals, position }
    }

    /// Chord member `i`; 0 is the bass.
    pub fn tone(&self, i: usize) -> Pitch {
        if i == 0 {
            self.bass
        } else {
            self.bass.add(&self.intervals[i - 1]).with_period(0)
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn tones(&self) -> Vec<Pitch> {
        (0..self.len()).map(|i| self.tone(i)).collect()
    }

    /// Spelled membership test, ignoring octave.
    pub fn contains(&self, p: &Pitch) -> bool {
        let p0 = p.with_period(0);
        self.tones().contains(&p0)
    }

    /// The same chord voiced with member `position` in the bass.
    pub fn to_position(&self, position: usize) -> Chord {
        assert!(position < self.len());
        let tones = self.tones();
        let bass = tones[position];
        let mut intervals: Vec<Interval> = tones
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != position)
            .map(|(_, t)| interval_above(&bass, t))
            .collect();
        intervals.sort();
        Chord { bass, intervals, position }
    }
}

/// Simple ascending interval from `bass` to the pitch class of `t`.
fn interval_above(bass: &Pitch, t: &Pitch) -> Interval {
    let mut t = t.with_period(0);
    while t.ord() < bass.ord() {
        t = t.add_period(1);
    }
    bass.interval_to(&t).to_simple()
}

/// A chord template independent of its bass.
#[derive(Debug, Clone)]
pub struct ChordShape {
    pub name: &'static str,
    pub intervals: Vec<Interval>,
    pub position: usize,
}

impl ChordShape {
    fn new(name: &'static str, intervals: &[&str], position: usize) -> ChordShape {
        let intervals = intervals
            .iter()
            .map(|ex| ex.parse().unwrap_or_else(|_| panic!("bad interval {ex:?}")))
            .collect();
        ChordShape { name, intervals, position }
    }

    /// Triads of strict counterpoint: major and minor in root position and
    /// first inversion, diminished in first inversion only.
    pub fn standard_triads() -> Vec<ChordShape> {
        vec![
            ChordShape::new("major", &["M3", "P5"], 0),
            ChordShape::new("major6", &["m3", "m6"], 1),
            ChordShape::new("minor", &["m3", "P5"], 0),
            ChordShape::new("minor6", &["M3", "M6"], 1),
            ChordShape::new("diminished6", &["m3", "M6"], 1),
        ]
    }
}

/// Scale plus one chord slot per measure.
#[derive(Debug, Clone)]
pub struct HarmonyBackground {
    pub scale: Scale,
    pub chords: Vec<Option<Chord>>,
}

impl HarmonyBackground {
    pub fn new(scale: Scale, measures: usize) -> HarmonyBackground {
        HarmonyBackground { scale, chords: vec![None; measures] }
    }

    pub fn chord_at(&self, measure: usize) -> Option<&Chord> {
        self.chords.get(measure).and_then(|c| c.as_ref())
    }

    pub fn first_empty_slot(&self) -> Option<usize> {
        self.chords.iter().position(|c| c.is_none())
    }

    pub fn with_chord(&self, measure: usize, chord: Chord) -> HarmonyBackground {
        let mut chords = self.chords.clone();
        chords[measure] = Some(chord);
        HarmonyBackground { scale: self.scale.clone(), chords }
    }
}

impl Hash for HarmonyBackground {
    fn hash<H: Hasher>(&self, h: &mut H) {
        self.scale.degrees().hash(h);
        self.chords.hash(h);
    }
}
