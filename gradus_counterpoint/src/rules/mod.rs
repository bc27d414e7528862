// The rule catalogue.
//
// Candidate rules shape a weighted set of pitch candidates for one note slot:
// producers build the initial set (scale tones), the rest intersect, filter,
// or re-weight it. Local rules score one freshly written note against the
// whole tentative score and may veto it with an infinite cost. Harmony rules
// do the candidate job for chord slots.
//
// Rules are closed enums rather than trait objects so rule sets stay plain
// data: cloneable, comparable in tests, and with no dispatch indirection in
// the search's hot path.

mod harmony;
mod melody;
mod ornament;
mod scales;
mod vertical;

use std::collections::BTreeMap;

use gradus_core::time::whole;
use gradus_core::{Interval, Pitch, Time};

pub use scales::{DegreeMatrix, DegreePreference};

use crate::chord::Chord;
use crate::context::CounterpointContext;
use crate::score::{NoteCursor, Ornament, Score};

/// Pitch candidates for a note slot, each with an accumulated cost.
pub type Candidates = BTreeMap<Pitch, f64>;

/// Chord candidates for a harmony slot.
pub type ChordCandidates = BTreeMap<Chord, f64>;

/// Interval-to-cost table, as used for melodic and harmonic preferences.
pub type PreferredIntervals = BTreeMap<Interval, f64>;

/// Parse an interval cost table from abbreviation literals. Panics on a bad
/// literal; tables are built from constants at configuration time.
pub fn parse_preferred(entries: &[(&str, f64)]) -> PreferredIntervals {
    entries
        .iter()
        .map(|(ex, cost)| {
            let int: Interval = ex
                .parse()
                .unwrap_or_else(|_| panic!("bad interval literal {ex:?}"));
            (int, *cost)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum CandidateRule {
    /// Produce every scale tone within the voice's range.
    ScaleTones,
    /// Re-weight candidates after specific scale degrees by melodic
    /// direction.
    DirectionalDegreeMatrix(DegreeMatrix),
    /// Produce tones of the complete minor scale on `root` and force the
    /// classic resolutions of its inflected degrees.
    MinorResolution { root: Pitch },
    /// Restrict melodic motion to the context's interval table.
    MelodyIntervals,
    /// Leaps beyond a third must follow a step in the opposite direction.
    LeapPreparationBefore,
    /// After a leap, continue leaping or step back the other way.
    LeapPreparationAfter,
    /// A note after a passing tone continues its line stepwise.
    PassingToneContinuation,
    /// Candidates that can serve as a passing tone.
    MakePassingTone,
    /// A note after a neighbor tone returns to the pitch before it.
    NeighborResolution,
    /// Candidates that can serve as a neighbor tone.
    MakeNeighborTone,
    /// A suspension resolves down by step (or, over a consonance, up at a
    /// cost).
    SuspensionResolution,
    /// A suspension candidate holds the previous harmonic pitch.
    MakeSuspension,
    /// Consonance against every sounding voice, with bass restrictions.
    VerticalConsonanceStrict,
    /// Consonance against voices that move at this moment only.
    VerticalConsonanceWithMoving,
    /// Restrict candidates to tones of the measure's solved chord.
    ChordTone,
}

impl CandidateRule {
    pub fn apply(
        &self,
        ctx: &CounterpointContext,
        score: &Score,
        cur: &NoteCursor<'_>,
        candidates: Option<Candidates>,
        ornament: Option<Ornament>,
    ) -> Candidates {
        match self {
            CandidateRule::ScaleTones => scales::scale_tones(score, cur, candidates),
            CandidateRule::DirectionalDegreeMatrix(m) => {
                scales::directional_degree_matrix(m, score, cur, require(candidates))
            }
            CandidateRule::MinorResolution { root } => {
                scales::minor_resolution(*root, cur, candidates, ornament)
            }
            CandidateRule::MelodyIntervals => {
                melody::melody_intervals(ctx, cur, require(candidates), ornament)
            }
            CandidateRule::LeapPreparationBefore => {
                melody::leap_preparation_before(cur, require(candidates))
            }
            CandidateRule::LeapPreparationAfter => {
                melody::leap_preparation_after(cur, require(candidates))
            }
            CandidateRule::PassingToneContinuation => {
                ornament::passing_tone_continuation(cur, require(candidates))
            }
            CandidateRule::MakePassingTone => {
                ornament::make_passing_tone(cur, require(candidates))
            }
            CandidateRule::NeighborResolution => {
                ornament::neighbor_resolution(cur, require(candidates))
            }
            CandidateRule::MakeNeighborTone => {
                ornament::make_neighbor_tone(cur, require(candidates))
            }
            CandidateRule::SuspensionResolution => {
                ornament::suspension_resolution(score, cur, require(candidates))
            }
            CandidateRule::MakeSuspension => {
                ornament::make_suspension(cur, require(candidates))
            }
            CandidateRule::VerticalConsonanceStrict => {
                vertical::consonance_strict(ctx, score, cur, require(candidates))
            }
            CandidateRule::VerticalConsonanceWithMoving => {
                vertical::consonance_with_moving(ctx, score, cur, require(candidates))
            }
            CandidateRule::ChordTone => harmony::chord_tone(score, cur, require(candidates)),
        }
    }
}

/// Filtering rules must run after a producer has built the candidate set.
fn require(candidates: Option<Candidates>) -> Candidates {
    candidates.unwrap_or_else(|| panic!("candidate rule applied before any producer"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalRule {
    /// No voice may cross into the range a neighboring voice occupies.
    ForbidVoiceOverlap,
    /// No perfect consonance reached by similar motion or from another
    /// perfect consonance.
    ForbidPerfectsBySimilarMotion,
    /// No equal perfect consonances within a measure of each other.
    ForbidNearbyPerfects,
    /// Enforce the species' leap-run limits.
    LimitConsecutiveLeaps,
    /// Prefer contrary motion over oblique, oblique over similar.
    PrioritizeVoiceMotion,
}

impl LocalRule {
    /// Cost of the note under `cur` in the tentative score; infinite to veto.
    pub fn apply(
        &self,
        ctx: &CounterpointContext,
        score: &Score,
        cur: &NoteCursor<'_>,
    ) -> f64 {
        match self {
            LocalRule::ForbidVoiceOverlap => vertical::forbid_voice_overlap(ctx, score, cur),
            LocalRule::ForbidPerfectsBySimilarMotion => {
                vertical::forbid_perfects_by_similar_motion(score, cur)
            }
            LocalRule::ForbidNearbyPerfects => vertical::forbid_nearby_perfects(ctx, score, cur),
            LocalRule::LimitConsecutiveLeaps => melody::limit_consecutive_leaps(cur),
            LocalRule::PrioritizeVoiceMotion => vertical::prioritize_voice_motion(ctx, score, cur),
        }
    }
}

#[derive(Debug, Clone)]
pub enum HarmonyRule {
    /// Produce every permitted triad whose tones fit the scale and the notes
    /// already written in the slot's measure.
    ValidChords,
}

impl HarmonyRule {
    pub fn apply(
        &self,
        ctx: &CounterpointContext,
        score: &Score,
        slot: usize,
        candidates: Option<ChordCandidates>,
    ) -> ChordCandidates {
        let _ = ctx;
        match self {
            HarmonyRule::ValidChords => harmony::valid_chords(score, slot, candidates),
        }
    }
}

// Shared interval predicates and cursor helpers.

pub(crate) fn sign_of(t: Time) -> i32 {
    match t.cmp(&whole(0)) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

pub fn is_perfect_consonance(i: &Interval) -> bool {
    let simple = i.abs().to_simple().distance;
    simple == whole(0) || simple == whole(7) || simple == whole(12)
}

pub fn is_consonance(i: &Interval) -> bool {
    let simple = i.abs().to_simple().distance;
    [0, 3, 4, 7, 8, 9, 12].iter().any(|&d| simple == whole(d))
}

/// Whether the note is approached by step. `None` if either pitch is absent.
pub(crate) fn is_stepwise_before(c: &NoteCursor<'_>) -> Option<bool> {
    let pc = c.pitch()?;
    let pb = c.prev_global()?.pitch()?;
    Some(pb.steps_to(&pc).abs() == 1)
}

/// Whether the note is left by step. `None` if either pitch is absent.
pub(crate) fn is_stepwise_after(c: &NoteCursor<'_>) -> Option<bool> {
    let pc = c.pitch()?;
    let pb = c.next_global()?.pitch()?;
    Some(pb.steps_to(&pc).abs() == 1)
}

pub(crate) fn is_stepwise_around(c: &NoteCursor<'_>) -> Option<bool> {
    Some(is_stepwise_before(c)? && is_stepwise_after(c)?)
}

/// Keep candidates present in `table`, adding the table's cost.
pub(crate) fn intersect_add(c: Candidates, table: &Candidates) -> Candidates {
    c.into_iter()
        .filter_map(|(p, cost)| table.get(&p).map(|add| (p, cost + add)))
        .collect()
}
