// The composition in progress: notes, measures, voices, and the score that
// binds them to a harmony background.
//
// Everything here is immutable value data. "Mutation" is expressed as
// replace-and-return-a-sibling: replacing one measure builds a new Voice that
// shares every other measure by Arc, and replacing one voice builds a new
// Score that shares every other voice. Search nodes snapshot full Scores, so
// this structural sharing is what keeps the search memory-feasible.
//
// Cursors are plain borrow-carrying values (voice, indices, local time) with
// global navigation that walks across measure boundaries. They never point
// back into owning structures, so cloning a cursor is free and nothing forms
// a reference cycle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use gradus_core::interval::Sign;
use gradus_core::time::whole;
use gradus_core::{Pitch, Time};

use crate::chord::HarmonyBackground;
use crate::species::{MelodicSettings, Species};

/// Non-harmonic tone kinds. A suspension is tied to the previous note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ornament {
    PassingTone,
    Neighbor,
    Suspension,
}

pub const ORNAMENTS: [Ornament; 3] =
    [Ornament::PassingTone, Ornament::Neighbor, Ornament::Suspension];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    Treble8vb,
    Alto,
    Bass,
}

/// One note: a duration, an optional pitch (`None` is a rest or a
/// not-yet-filled slot), and an optional ornament tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub duration: Time,
    pub pitch: Option<Pitch>,
    pub ornament: Option<Ornament>,
}

impl Note {
    pub fn new(duration: Time, pitch: Option<Pitch>) -> Note {
        Note { duration, pitch, ornament: None }
    }

    pub fn blank(duration: Time) -> Note {
        Note::new(duration, None)
    }

    pub fn with_ornament(duration: Time, pitch: Pitch, ornament: Option<Ornament>) -> Note {
        Note { duration, pitch: Some(pitch), ornament }
    }

    pub fn is_non_harmonic(&self) -> bool {
        self.ornament.is_some()
    }

    pub fn is_tied(&self) -> bool {
        self.ornament == Some(Ornament::Suspension)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pitch {
            None => write!(f, "_"),
            Some(p) => {
                let mark = match self.ornament {
                    Some(Ornament::PassingTone) => "!",
                    Some(Ornament::Neighbor) => "^",
                    Some(Ornament::Suspension) => "~",
                    None => "",
                };
                write!(f, "{p}{mark}")
            }
        }
    }
}

/// Rolling melodic state carried across a voice's measures: the last sounded
/// pitch and counters describing the current run of leaps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MelodicContext {
    pub last_pitch: Option<Pitch>,
    pub leap_direction: Option<Sign>,
    pub consecutive_leaps: u32,
    pub third_leaps: u32,
    pub unidirectional_leaps: u32,
    pub unidirectional_third_leaps: u32,
}

impl MelodicContext {
    /// State after committing `pitch` as the next note. Steps and rests clear
    /// the leap counters; a leap records its direction and increments them,
    /// with the unidirectional counters resetting on direction change.
    pub fn advance(&self, pitch: Option<Pitch>) -> MelodicContext {
        let Some(last) = self.last_pitch else {
            return MelodicContext { last_pitch: pitch, ..*self };
        };
        let leap = pitch.map(|p| last.steps_to(&p)).filter(|s| s.unsigned_abs() > 1);
        let Some(leap) = leap else {
            return MelodicContext { last_pitch: pitch, ..MelodicContext::default() };
        };

        let direction = Sign::of(leap);
        let is_third = leap.unsigned_abs() == 2;
        let unidirectional = Some(direction) == self.leap_direction;
        MelodicContext {
            last_pitch: pitch,
            leap_direction: Some(direction),
            consecutive_leaps: self.consecutive_leaps + 1,
            third_leaps: self.third_leaps + u32::from(is_third),
            unidirectional_leaps: if unidirectional {
                self.unidirectional_leaps + 1
            } else {
                0
            },
            unidirectional_third_leaps: if unidirectional {
                self.unidirectional_third_leaps + u32::from(is_third)
            } else {
                0
            },
        }
    }
}

/// What kind of measure this is, and for schema measures, which template of
/// the owning voice's species produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureKind {
    /// Cantus firmus material; never writable.
    Fixed,
    /// Placeholder awaiting a schema choice.
    Blank,
    /// Instantiated species template, filled slot by slot.
    Schema { name: &'static str, index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub notes: Vec<Note>,
    pub duration: Time,
    /// Melodic state after the last filled note of this measure.
    pub melodic: MelodicContext,
    pub kind: MeasureKind,
}

impl Measure {
    pub fn fixed(notes: Vec<Note>, duration: Time) -> Measure {
        Measure { notes, duration, melodic: MelodicContext::default(), kind: MeasureKind::Fixed }
    }

    pub fn blank(duration: Time) -> Measure {
        Measure {
            notes: vec![Note::blank(duration)],
            duration,
            melodic: MelodicContext::default(),
            kind: MeasureKind::Blank,
        }
    }

    pub fn writable(&self) -> bool {
        match self.kind {
            MeasureKind::Fixed => false,
            MeasureKind::Blank => true,
            MeasureKind::Schema { .. } => {
                self.notes.last().is_some_and(|n| n.pitch.is_none())
            }
        }
    }

    /// Sibling measure with slot `i` replaced and the melodic context
    /// advanced by the new note.
    pub fn with_note(&self, i: usize, note: Note) -> Measure {
        let mut notes = self.notes.clone();
        let melodic = self.melodic.advance(note.pitch);
        notes[i] = note;
        Measure { notes, duration: self.duration, melodic, kind: self.kind }
    }

    pub fn schema_name(&self) -> Option<&'static str> {
        match self.kind {
            MeasureKind::Schema { name, .. } => Some(name),
            _ => None,
        }
    }

    fn hash_into(&self, h: &mut impl Hasher) {
        match self.kind {
            MeasureKind::Fixed => {
                1u8.hash(h);
                self.notes.hash(h);
            }
            MeasureKind::Blank => 2u8.hash(h),
            MeasureKind::Schema { name, .. } => {
                3u8.hash(h);
                name.hash(h);
                self.notes.hash(h);
            }
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notes: Vec<String> = self.notes.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", notes.join(" "))
    }
}

#[derive(Debug, Clone)]
pub enum VoiceKind {
    /// Pre-supplied cantus firmus.
    Fixed,
    /// Composed against the rest of the score, one measure schema at a time.
    Generated { species: Arc<Species>, low: Pitch, high: Pitch },
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub index: usize,
    pub name: String,
    pub clef: Clef,
    pub kind: VoiceKind,
    pub measures: Vec<Arc<Measure>>,
}

impl Voice {
    pub fn is_generated(&self) -> bool {
        matches!(self.kind, VoiceKind::Generated { .. })
    }

    pub fn species(&self) -> Option<&Species> {
        match &self.kind {
            VoiceKind::Generated { species, .. } => Some(species),
            VoiceKind::Fixed => None,
        }
    }

    pub fn range(&self) -> Option<(Pitch, Pitch)> {
        match &self.kind {
            VoiceKind::Generated { low, high, .. } => Some((*low, *high)),
            VoiceKind::Fixed => None,
        }
    }

    pub fn melody_settings(&self) -> Option<&MelodicSettings> {
        self.species().map(|s| &s.melody)
    }

    /// Start time of measure `index`.
    pub fn measure_time(&self, index: usize) -> Time {
        self.measures[..index]
            .iter()
            .fold(whole(0), |acc, m| acc + m.duration)
    }

    pub fn measure(&self, index: usize) -> Option<MeasureCursor<'_>> {
        if index >= self.measures.len() {
            return None;
        }
        Some(MeasureCursor { voice: self, index, time: self.measure_time(index) })
    }

    pub fn measure_at_time(&self, t: Time) -> Option<MeasureCursor<'_>> {
        let mut start = whole(0);
        for (index, m) in self.measures.iter().enumerate() {
            if t >= start && t < start + m.duration {
                return Some(MeasureCursor { voice: self, index, time: start });
            }
            start += m.duration;
        }
        None
    }

    pub fn note_cursor(&self, measure: usize, note: usize) -> Option<NoteCursor<'_>> {
        let m = self.measures.get(measure)?;
        if note >= m.notes.len() {
            return None;
        }
        let time = m.notes[..note].iter().fold(whole(0), |acc, n| acc + n.duration);
        Some(NoteCursor {
            voice: self,
            measure,
            index: note,
            measure_time: self.measure_time(measure),
            time,
        })
    }

    /// The note sounding at global time `t`, if any.
    pub fn note_at(&self, t: Time) -> Option<NoteCursor<'_>> {
        let mc = self.measure_at_time(t)?;
        let local = t - mc.time;
        let mut start = whole(0);
        for (index, n) in mc.measure().notes.iter().enumerate() {
            if local >= start && local < start + n.duration {
                return Some(NoteCursor {
                    voice: self,
                    measure: mc.index,
                    index,
                    measure_time: mc.time,
                    time: start,
                });
            }
            start += n.duration;
        }
        None
    }

    /// Sibling voice with measure `i` replaced.
    pub fn replace_measure(&self, i: usize, m: Measure) -> Voice {
        let mut measures = self.measures.clone();
        measures[i] = Arc::new(m);
        Voice {
            index: self.index,
            name: self.name.clone(),
            clef: self.clef,
            kind: self.kind.clone(),
            measures,
        }
    }

    fn hash_into(&self, h: &mut impl Hasher) {
        for m in &self.measures {
            m.hash_into(h);
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let measures: Vec<String> = self.measures.iter().map(|m| m.to_string()).collect();
        write!(f, "{}: {}", self.name, measures.join(" | "))
    }
}

/// Cursor over a voice's measures.
#[derive(Debug, Clone, Copy)]
pub struct MeasureCursor<'a> {
    pub voice: &'a Voice,
    pub index: usize,
    /// Global start time of the measure.
    pub time: Time,
}

impl<'a> MeasureCursor<'a> {
    pub fn measure(&self) -> &'a Measure {
        &self.voice.measures[self.index]
    }

    pub fn prev(&self) -> Option<MeasureCursor<'a>> {
        if self.index == 0 {
            return None;
        }
        let prev = &self.voice.measures[self.index - 1];
        Some(MeasureCursor {
            voice: self.voice,
            index: self.index - 1,
            time: self.time - prev.duration,
        })
    }

    pub fn next(&self) -> Option<MeasureCursor<'a>> {
        if self.index + 1 >= self.voice.measures.len() {
            return None;
        }
        Some(MeasureCursor {
            voice: self.voice,
            index: self.index + 1,
            time: self.time + self.measure().duration,
        })
    }
}

/// Cursor over one note of a voice, with global-time navigation that crosses
/// measure boundaries.
#[derive(Debug, Clone, Copy)]
pub struct NoteCursor<'a> {
    pub voice: &'a Voice,
    pub measure: usize,
    pub index: usize,
    /// Global start time of the containing measure.
    pub measure_time: Time,
    /// Start time of the note within its measure.
    pub time: Time,
}

impl<'a> NoteCursor<'a> {
    pub fn note(&self) -> &'a Note {
        &self.voice.measures[self.measure].notes[self.index]
    }

    pub fn pitch(&self) -> Option<Pitch> {
        self.note().pitch
    }

    pub fn containing_measure(&self) -> &'a Measure {
        &self.voice.measures[self.measure]
    }

    pub fn global_time(&self) -> Time {
        self.measure_time + self.time
    }

    pub fn global_end_time(&self) -> Time {
        self.global_time() + self.note().duration
    }

    pub fn prev(&self) -> Option<NoteCursor<'a>> {
        if self.index == 0 {
            return None;
        }
        let prev = &self.containing_measure().notes[self.index - 1];
        Some(NoteCursor { index: self.index - 1, time: self.time - prev.duration, ..*self })
    }

    pub fn next(&self) -> Option<NoteCursor<'a>> {
        let m = self.containing_measure();
        if self.index + 1 >= m.notes.len() {
            return None;
        }
        Some(NoteCursor {
            index: self.index + 1,
            time: self.time + self.note().duration,
            ..*self
        })
    }

    /// Previous note, crossing into the previous measure when needed.
    pub fn prev_global(&self) -> Option<NoteCursor<'a>> {
        if let Some(prev) = self.prev() {
            return Some(prev);
        }
        if self.measure == 0 {
            return None;
        }
        let measure = self.measure - 1;
        let m = &self.voice.measures[measure];
        let index = m.notes.len().checked_sub(1)?;
        self.voice.note_cursor(measure, index)
    }

    /// Next note, crossing into the next measure when needed.
    pub fn next_global(&self) -> Option<NoteCursor<'a>> {
        if let Some(next) = self.next() {
            return Some(next);
        }
        if self.measure + 1 >= self.voice.measures.len() {
            return None;
        }
        self.voice.note_cursor(self.measure + 1, 0)
    }

    /// Previous note whose pitch differs from this cursor's predecessor run,
    /// skipping over ties and repetitions.
    pub fn prev_different(&self) -> Option<NoteCursor<'a>> {
        let pitch = self.pitch();
        let mut cur = self.prev_global()?;
        while cur.pitch() == pitch {
            cur = cur.prev_global()?;
        }
        Some(cur)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub measure_length: Time,
}

/// The whole composition state: parameters, voices, harmony background.
#[derive(Debug, Clone)]
pub struct Score {
    pub parameters: Parameters,
    pub voices: Vec<Arc<Voice>>,
    pub harmony: Arc<HarmonyBackground>,
}

impl Score {
    pub fn new(
        parameters: Parameters,
        voices: Vec<Arc<Voice>>,
        harmony: HarmonyBackground,
    ) -> Score {
        Score { parameters, voices, harmony: Arc::new(harmony) }
    }

    pub fn replace_voice(&self, i: usize, v: Voice) -> Score {
        let mut voices = self.voices.clone();
        voices[i] = Arc::new(v);
        Score { parameters: self.parameters, voices, harmony: Arc::clone(&self.harmony) }
    }

    pub fn replace_harmony(&self, h: HarmonyBackground) -> Score {
        Score {
            parameters: self.parameters,
            voices: self.voices.clone(),
            harmony: Arc::new(h),
        }
    }

    /// Stable content hash identifying this score in the search's visited
    /// set. Covers voices and harmony, not derived bookkeeping.
    pub fn content_hash(&self) -> u64 {
        let mut h = FxHasher::default();
        for v in &self.voices {
            v.hash_into(&mut h);
            0xfeu8.hash(&mut h);
        }
        self.harmony.hash(&mut h);
        h.finish()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.voices.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(ex: &str) -> Pitch {
        ex.parse().unwrap()
    }

    fn fixed_voice(notes_per_measure: &[&[(&str, i64)]]) -> Voice {
        let measures = notes_per_measure
            .iter()
            .map(|notes| {
                let ns: Vec<Note> = notes
                    .iter()
                    .map(|(ex, d)| Note::new(whole(*d), Some(p(ex))))
                    .collect();
                let duration = ns.iter().fold(whole(0), |acc, n| acc + n.duration);
                Arc::new(Measure::fixed(ns, duration))
            })
            .collect();
        Voice {
            index: 0,
            name: "Cantus".to_string(),
            clef: Clef::Bass,
            kind: VoiceKind::Fixed,
            measures,
        }
    }

    #[test]
    fn test_note_at_and_global_navigation() {
        let v = fixed_voice(&[
            &[("c3", 2), ("d3", 2)],
            &[("e3", 4)],
        ]);
        let c = v.note_at(whole(2)).unwrap();
        assert_eq!(c.pitch(), Some(p("d3")));
        assert_eq!(c.global_time(), whole(2));
        assert_eq!(c.global_end_time(), whole(4));

        let next = c.next_global().unwrap();
        assert_eq!(next.pitch(), Some(p("e3")));
        assert_eq!(next.global_time(), whole(4));

        let back = next.prev_global().unwrap();
        assert_eq!(back.pitch(), Some(p("d3")));
        assert!(v.note_at(whole(8)).is_none());
    }

    #[test]
    fn test_prev_different_skips_repeats() {
        let v = fixed_voice(&[&[("c3", 2), ("d3", 2)], &[("d3", 2), ("e3", 2)]]);
        let c = v.note_at(whole(6)).unwrap();
        assert_eq!(c.pitch(), Some(p("e3")));
        let diff = c.prev_different().unwrap();
        assert_eq!(diff.pitch(), Some(p("d3")));
        let diff2 = diff.prev_different().unwrap();
        assert_eq!(diff2.pitch(), Some(p("c3")));
    }

    #[test]
    fn test_melodic_context_resets_on_step() {
        let mc = MelodicContext::default();
        let mc = mc.advance(Some(p("c4")));
        let mc = mc.advance(Some(p("f4"))); // leap of a fourth
        assert_eq!(mc.consecutive_leaps, 1);
        let mc = mc.advance(Some(p("d4"))); // leap of a third down
        assert_eq!(mc.consecutive_leaps, 2);
        assert_eq!(mc.third_leaps, 1);
        assert_eq!(mc.unidirectional_leaps, 0);
        let mc = mc.advance(Some(p("e4"))); // step
        assert_eq!(mc.consecutive_leaps, 0);
        assert_eq!(mc.third_leaps, 0);
        assert_eq!(mc.last_pitch, Some(p("e4")));
    }

    #[test]
    fn test_melodic_context_unidirectional_counters() {
        let mc = MelodicContext::default();
        let mc = mc.advance(Some(p("c4")));
        let mc = mc.advance(Some(p("e4"))); // third up
        let mc = mc.advance(Some(p("g4"))); // third up, same direction
        assert_eq!(mc.unidirectional_leaps, 1);
        assert_eq!(mc.unidirectional_third_leaps, 1);
        let mc = mc.advance(Some(p("d4"))); // fourth down
        assert_eq!(mc.unidirectional_leaps, 0);
        assert_eq!(mc.consecutive_leaps, 3);
    }

    #[test]
    fn test_rest_resets_counters() {
        let mc = MelodicContext::default();
        let mc = mc.advance(Some(p("c4")));
        let mc = mc.advance(Some(p("f4")));
        assert_eq!(mc.consecutive_leaps, 1);
        let mc = mc.advance(None);
        assert_eq!(mc.consecutive_leaps, 0);
        assert_eq!(mc.last_pitch, None);
    }

    #[test]
    fn test_structural_sharing_on_replace() {
        let v = fixed_voice(&[&[("c3", 4)], &[("d3", 4)]]);
        let replaced = v.replace_measure(1, Measure::blank(whole(4)));
        assert!(Arc::ptr_eq(&v.measures[0], &replaced.measures[0]));
        assert!(!Arc::ptr_eq(&v.measures[1], &replaced.measures[1]));
    }
}
