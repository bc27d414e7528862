// Assembles the starting score for a solve: fixed cantus voices, blank
// generated voices, and an empty harmony background.

use std::sync::Arc;

use gradus_core::{Pitch, Scale};

use crate::chord::HarmonyBackground;
use crate::context::CounterpointContext;
use crate::score::{Clef, Measure, Note, Parameters, Score, Voice, VoiceKind};
use crate::species::Species;

pub struct ScoreBuilder {
    parameters: Parameters,
    target_measures: usize,
    scale: Scale,
    voices: Vec<Arc<Voice>>,
}

impl ScoreBuilder {
    pub fn new(ctx: &CounterpointContext, scale: Scale) -> ScoreBuilder {
        ScoreBuilder {
            parameters: ctx.parameters,
            target_measures: ctx.target_measures,
            scale,
            voices: Vec::new(),
        }
    }

    pub fn build(self) -> Score {
        let harmony = HarmonyBackground::new(self.scale, self.target_measures);
        Score::new(self.parameters, self.voices, harmony)
    }

    /// A voice to be written by the solver, as blank measures.
    pub fn voice(
        mut self,
        species: Arc<Species>,
        clef: Clef,
        name: &str,
        low: Pitch,
        high: Pitch,
    ) -> Self {
        let measures = (0..self.target_measures)
            .map(|_| Arc::new(Measure::blank(self.parameters.measure_length)))
            .collect();
        self.voices.push(Arc::new(Voice {
            index: self.voices.len(),
            name: name.to_string(),
            clef,
            kind: VoiceKind::Generated { species, low, high },
            measures,
        }));
        self
    }

    /// A fixed voice with the given measures.
    pub fn cantus(mut self, clef: Clef, measures: Vec<Vec<Note>>) -> Self {
        let duration = self.parameters.measure_length;
        let measures = measures
            .into_iter()
            .map(|notes| Arc::new(Measure::fixed(notes, duration)))
            .collect();
        self.voices.push(Arc::new(Voice {
            index: self.voices.len(),
            name: "Cantus".to_string(),
            clef,
            kind: VoiceKind::Fixed,
            measures,
        }));
        self
    }

    /// A fixed voice of one whole note per measure.
    pub fn whole_note_cantus(self, clef: Clef, pitches: &[Pitch]) -> Self {
        let duration = self.parameters.measure_length;
        let measures = pitches
            .iter()
            .map(|&p| vec![Note::new(duration, Some(p))])
            .collect();
        self.cantus(clef, measures)
    }

    // Voice ranges follow the conventional vocal compasses used in strict
    // counterpoint exercises.

    pub fn soprano(self, species: Arc<Species>) -> Self {
        self.voice(species, Clef::Treble, "Soprano", pitch("c4"), pitch("a5"))
    }

    pub fn alto(self, species: Arc<Species>) -> Self {
        self.voice(species, Clef::Alto, "Alto", pitch("f3"), pitch("d5"))
    }

    pub fn tenor(self, species: Arc<Species>) -> Self {
        self.voice(species, Clef::Treble8vb, "Tenor", pitch("c3"), pitch("a4"))
    }

    pub fn bass(self, species: Arc<Species>) -> Self {
        self.voice(species, Clef::Bass, "Bass", pitch("f2"), pitch("d4"))
    }
}

fn pitch(ex: &str) -> Pitch {
    ex.parse().unwrap_or_else(|_| panic!("bad pitch literal {ex:?}"))
}

#[cfg(test)]
mod tests {
    use gradus_core::time::whole;

    use crate::score::MeasureKind;

    use super::*;

    #[test]
    fn test_builds_blank_voices_over_cantus() {
        let ctx = CounterpointContext::new(4, Parameters { measure_length: whole(4) });
        let cantus: Vec<Pitch> = ["c3", "d3", "e3", "c3"]
            .iter()
            .map(|ex| pitch(ex))
            .collect();
        let score = ScoreBuilder::new(&ctx, Scale::major(pitch("c0")))
            .alto(Arc::new(Species::first()))
            .whole_note_cantus(Clef::Bass, &cantus);
        let score = score.build();

        assert_eq!(score.voices.len(), 2);
        assert_eq!(score.voices[0].index, 0);
        assert_eq!(score.voices[1].index, 1);
        assert!(score.voices[0].is_generated());
        assert!(!score.voices[1].is_generated());

        assert_eq!(score.voices[0].measures.len(), 4);
        for m in &score.voices[0].measures {
            assert_eq!(m.kind, MeasureKind::Blank);
            assert!(m.writable());
        }
        assert_eq!(score.voices[1].measures.len(), 4);
        assert_eq!(score.voices[1].measures[1].notes[0].pitch, Some(pitch("d3")));

        assert_eq!(score.harmony.chords.len(), 4);
        assert!(score.harmony.first_empty_slot().is_some());
    }

    #[test]
    fn test_role_helpers_set_ranges() {
        let ctx = CounterpointContext::new(2, Parameters { measure_length: whole(4) });
        let score = ScoreBuilder::new(&ctx, Scale::major(pitch("c0")))
            .soprano(Arc::new(Species::first()))
            .bass(Arc::new(Species::first()))
            .build();
        assert_eq!(score.voices[0].range(), Some((pitch("c4"), pitch("a5"))));
        assert_eq!(score.voices[0].clef, Clef::Treble);
        assert_eq!(score.voices[1].range(), Some((pitch("f2"), pitch("d4"))));
    }
}
