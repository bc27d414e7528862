// The counterpoint context: rule wiring, cost tables, and the fill pipeline
// that turns a writable slot into scored successor states.
//
// A Step is one search move: a tentative score with one more note (or one
// more schema choice), how much musical time the move advanced, and its cost.

use gradus_core::time::whole;
use gradus_core::{Interval, Time};

use crate::rules::{
    CandidateRule, Candidates, ChordCandidates, HarmonyRule, LocalRule, PreferredIntervals,
    parse_preferred,
};
use crate::score::{MeasureKind, Note, NoteCursor, Ornament, Parameters, Score};
use crate::species::SlotKind;

/// Rejects a whole tentative score; a message explains the rejection.
pub type GlobalRule =
    std::sync::Arc<dyn Fn(&CounterpointContext, &Score) -> Option<String> + Send + Sync>;

/// One successor state produced by filling a slot.
#[derive(Debug, Clone)]
pub struct Step {
    pub score: Score,
    /// Musical time consumed by the move; zero for a schema choice.
    pub advanced: Time,
    pub cost: f64,
}

/// Candidate rules for each ornament kind. An ornament with no rules is
/// never produced.
#[derive(Debug, Clone, Default)]
pub struct OrnamentRules {
    pub passing: Vec<CandidateRule>,
    pub neighbor: Vec<CandidateRule>,
    pub suspension: Vec<CandidateRule>,
}

impl OrnamentRules {
    pub fn get(&self, ornament: Ornament) -> &[CandidateRule] {
        match ornament {
            Ornament::PassingTone => &self.passing,
            Ornament::Neighbor => &self.neighbor,
            Ornament::Suspension => &self.suspension,
        }
    }
}

#[derive(Clone)]
pub struct CounterpointContext {
    pub target_measures: usize,
    pub parameters: Parameters,

    /// Run before the slot-specific rules for every candidate set.
    pub candidate_rules_before: Vec<CandidateRule>,
    /// Run after the slot-specific rules.
    pub candidate_rules_after: Vec<CandidateRule>,
    /// Slot-specific rules for harmonic tones.
    pub harmonic_tone_rules: Vec<CandidateRule>,
    pub ornament_rules: OrnamentRules,
    /// Score each freshly written note; infinite cost vetoes it.
    pub local_rules: Vec<LocalRule>,
    /// Checked against every tentative score the solver expands.
    pub global_rules: Vec<GlobalRule>,
    /// Candidate rules for chord slots; non-empty enables harmony solving.
    pub harmony_rules: Vec<HarmonyRule>,

    pub similar_motion_cost: f64,
    pub oblique_motion_cost: f64,
    pub contrary_motion_cost: f64,

    /// Allowed vertical intervals and their costs.
    pub harmony_intervals: PreferredIntervals,
    /// Allowed melodic intervals, relative to the current direction.
    pub melodic_intervals: PreferredIntervals,
    /// Simple intervals forbidden against the bass voice.
    pub forbid_with_bass: Vec<Interval>,
    pub allow_unison: bool,
    pub allow_chromatic_passing_tones: bool,
}

impl CounterpointContext {
    pub fn new(target_measures: usize, parameters: Parameters) -> CounterpointContext {
        CounterpointContext {
            target_measures,
            parameters,
            candidate_rules_before: Vec::new(),
            candidate_rules_after: Vec::new(),
            harmonic_tone_rules: Vec::new(),
            ornament_rules: OrnamentRules::default(),
            local_rules: Vec::new(),
            global_rules: Vec::new(),
            harmony_rules: Vec::new(),
            similar_motion_cost: 80.0,
            oblique_motion_cost: 40.0,
            contrary_motion_cost: 0.0,
            harmony_intervals: parse_preferred(&[
                ("m3", 0.0),
                ("M3", 0.0),
                ("m6", 0.0),
                ("M6", 0.0),
                ("P4", 10.0),
                ("P5", 20.0),
                ("P8", 50.0),
                ("P1", 100.0),
            ]),
            melodic_intervals: parse_preferred(&[
                ("m2", 0.0),
                ("M2", 0.0),
                ("-m2", 40.0),
                ("-M2", 40.0),
                ("m3", 90.0),
                ("M3", 90.0),
                ("-m3", 90.0),
                ("-M3", 90.0),
                ("P4", 90.0),
                ("-P4", 90.0),
                ("P5", 90.0),
                ("-P5", 90.0),
                ("m6", 90.0),
                ("M6", 90.0),
                ("-m6", 90.0),
                ("-M6", 90.0),
                ("P8", 120.0),
                ("-P8", 120.0),
                ("P1", 500.0),
            ]),
            forbid_with_bass: vec![
                "P4".parse().unwrap_or_else(|_| panic!("bad interval literal")),
            ],
            allow_unison: false,
            allow_chromatic_passing_tones: false,
        }
    }

    /// Thread a candidate set through before-rules, the slot-specific rules,
    /// and after-rules. An empty set short-circuits.
    pub fn candidates(
        &self,
        rules: &[CandidateRule],
        score: &Score,
        cur: &NoteCursor<'_>,
        ornament: Option<Ornament>,
    ) -> Candidates {
        let mut candidates: Option<Candidates> = None;
        for rule in self
            .candidate_rules_before
            .iter()
            .chain(rules)
            .chain(&self.candidate_rules_after)
        {
            let next = rule.apply(self, score, cur, candidates, ornament);
            if next.is_empty() {
                return next;
            }
            candidates = Some(next);
        }
        candidates.unwrap_or_else(|| panic!("no candidate rules configured"))
    }

    /// Thread chord candidates through the harmony rules.
    pub fn chord_candidates(&self, score: &Score, slot: usize) -> ChordCandidates {
        let mut candidates: Option<ChordCandidates> = None;
        for rule in &self.harmony_rules {
            let next = rule.apply(self, score, slot, candidates);
            if next.is_empty() {
                return next;
            }
            candidates = Some(next);
        }
        candidates.unwrap_or_else(|| panic!("no harmony rules configured"))
    }

    /// Every way to fill the slot under `cur`, as tentative scores checked
    /// against the local rules.
    fn fill_in(
        &self,
        rules: &[CandidateRule],
        score: &Score,
        cur: &NoteCursor<'_>,
        ornament: Option<Ornament>,
        cost_offset: f64,
    ) -> Vec<Step> {
        let voice_index = cur.voice.index;
        let measure_index = cur.measure;
        let note_index = cur.index;
        let duration = cur.note().duration;
        let global_time = cur.global_time();

        let candidates = self.candidates(rules, score, cur, ornament);
        let mut steps = Vec::with_capacity(candidates.len());

        'outer: for (p, mut cost) in candidates {
            let note = Note { duration, pitch: Some(p), ornament };
            let voice = &score.voices[voice_index];
            let measure = voice.measures[measure_index].with_note(note_index, note);
            let new_score =
                score.replace_voice(voice_index, voice.replace_measure(measure_index, measure));

            {
                let Some(new_cur) = new_score.voices[voice_index].note_at(global_time) else {
                    continue;
                };
                for rule in &self.local_rules {
                    let c = rule.apply(self, &new_score, &new_cur);
                    if c.is_infinite() {
                        continue 'outer;
                    }
                    cost += c;
                }
            }

            steps.push(Step { score: new_score, advanced: duration, cost: cost + cost_offset });
        }
        steps
    }

    /// Successor steps for a writable measure: schema choices for a blank
    /// measure, note fills for the first open slot of a schema measure.
    pub fn measure_steps(
        &self,
        score: &Score,
        voice_index: usize,
        measure_index: usize,
    ) -> Vec<Step> {
        let voice = &score.voices[voice_index];
        let measure = &voice.measures[measure_index];
        match measure.kind {
            MeasureKind::Fixed => Vec::new(),
            MeasureKind::Blank => {
                let Some(species) = voice.species() else { return Vec::new() };
                species
                    .measure_options(score, voice, measure_index)
                    .into_iter()
                    .map(|(m, cost)| Step {
                        score: score
                            .replace_voice(voice_index, voice.replace_measure(measure_index, m)),
                        advanced: whole(0),
                        cost,
                    })
                    .collect()
            }
            MeasureKind::Schema { index: schema_index, .. } => {
                let Some(species) = voice.species() else { return Vec::new() };
                let slots = (species.schema(schema_index).slots)(&score.parameters);

                let open = measure
                    .notes
                    .iter()
                    .zip(&slots)
                    .position(|(n, s)| n.pitch.is_none() && !s.is_rest());
                let Some(open) = open else { return Vec::new() };
                let Some(cur) = voice.note_cursor(measure_index, open) else {
                    return Vec::new();
                };
                let SlotKind::Tone { harmonic, ornaments } = &slots[open].kind else {
                    return Vec::new();
                };

                let mut steps = Vec::new();
                if *harmonic {
                    steps.extend(self.fill_in(&self.harmonic_tone_rules, score, &cur, None, 0.0));
                }
                for &ornament in ornaments {
                    let rules = self.ornament_rules.get(ornament);
                    if rules.is_empty() {
                        continue;
                    }
                    steps.extend(self.fill_in(rules, score, &cur, Some(ornament), 0.0));
                }
                steps
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gradus_core::Pitch;

    use crate::rules::testutil::{pitch as p, score_with_melody, two_voice_score};

    use super::*;

    fn scale_only_ctx(score: &Score) -> CounterpointContext {
        let mut ctx = CounterpointContext::new(score.voices[0].measures.len(), score.parameters);
        ctx.harmonic_tone_rules.push(CandidateRule::ScaleTones);
        ctx
    }

    #[test]
    fn test_candidates_thread_producer_then_filter() {
        let score = score_with_melody(&["c4"]);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        let ctx = scale_only_ctx(&score);
        // MakeSuspension on a first-species whole note: the previous pitch
        // is harmonic, so only a repeat survives, and after ScaleTones
        // produced the set the suspension filter narrows it to c4.
        let out = ctx.candidates(
            &[CandidateRule::ScaleTones, CandidateRule::MakeSuspension],
            &score,
            &cur,
            Some(Ornament::Suspension),
        );
        assert_eq!(out.len(), 1);
        assert!(out.contains_key(&p("c4")));
    }

    #[test]
    fn test_measure_steps_on_blank_offer_schemas() {
        let score = two_voice_score(&[], &["c3", "g3"]);
        let ctx = scale_only_ctx(&score);
        // Measure 1 of the generated voice is blank; first species has one
        // schema, so exactly one zero-advance step.
        let steps = ctx.measure_steps(&score, 0, 1);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].advanced, whole(0));
        assert_eq!(steps[0].cost, 0.0);
        assert!(steps[0].score.voices[0].measures[1].schema_name().is_some());
    }

    #[test]
    fn test_measure_steps_fill_open_slot() {
        let score = score_with_melody(&[]);
        let ctx = scale_only_ctx(&score);
        let steps = ctx.measure_steps(&score, 0, 0);

        // One step per scale tone in the alto range.
        assert!(!steps.is_empty());
        for step in &steps {
            let m = &step.score.voices[0].measures[0];
            assert!(m.notes[0].pitch.is_some());
            assert_eq!(step.advanced, whole(4));
        }
        let pitches: Vec<Option<Pitch>> = steps
            .iter()
            .map(|s| s.score.voices[0].measures[0].notes[0].pitch)
            .collect();
        assert!(pitches.contains(&Some(p("c4"))));
        assert!(!pitches.contains(&Some(p("e3"))));
    }

    #[test]
    fn test_local_rule_veto_removes_step() {
        let score = two_voice_score(&[], &["g3", "c3"]);
        let mut ctx = scale_only_ctx(&score);
        ctx.local_rules.push(LocalRule::ForbidVoiceOverlap);
        let steps = ctx.measure_steps(&score, 0, 0);
        // Nothing at or below the sounding g3 survives.
        for step in &steps {
            let pitch = step.score.voices[0].measures[0].notes[0].pitch.unwrap();
            assert!(pitch.ord() > p("g3").ord());
        }
        assert!(!steps.is_empty());
    }

    #[test]
    fn test_chord_candidates_pipeline() {
        let score = two_voice_score(&["e4"], &["c3", "g3"]);
        let mut ctx = scale_only_ctx(&score);
        ctx.harmony_rules.push(HarmonyRule::ValidChords);
        let out = ctx.chord_candidates(&score, 1);
        assert_eq!(out.len(), 2);
        assert!(out.keys().all(|c| c.bass == p("g0")));
    }

    #[test]
    #[should_panic]
    fn test_candidates_require_a_producer() {
        let score = score_with_melody(&[]);
        let cur = score.voices[0].note_cursor(0, 0).unwrap();
        let ctx = CounterpointContext::new(1, score.parameters);
        ctx.candidates(&[], &score, &cur, None);
    }
}
