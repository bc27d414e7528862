// Species counterpoint generation: persistent score containers, a candidate
// rule pipeline, species measure schemas, and a best-first solver that
// writes the open measures of a score one note at a time.

pub mod builder;
pub mod chord;
pub mod context;
pub mod rules;
pub mod score;
pub mod search;
pub mod solver;
pub mod species;

pub use builder::ScoreBuilder;
pub use chord::{Chord, ChordShape, HarmonyBackground};
pub use context::{CounterpointContext, GlobalRule, OrnamentRules, Step};
pub use rules::{CandidateRule, Candidates, ChordCandidates, HarmonyRule, LocalRule};
pub use score::{
    Clef, Measure, MeasureCursor, MeasureKind, MelodicContext, Note, NoteCursor, Ornament,
    Parameters, Score, Voice, VoiceKind,
};
pub use solver::{CounterpointSolver, Progress, RewardStrategy, VisitedEntry};
pub use species::{MeasureSchema, MelodicSettings, NoteSlot, Position, SlotKind, Species};
