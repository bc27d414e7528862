// End-to-end solves of a short exercise over a fixed cantus firmus.

use std::sync::Arc;

use gradus_core::time::whole;
use gradus_core::{Pitch, Scale};

use gradus_counterpoint::rules::{is_consonance, is_perfect_consonance};
use gradus_counterpoint::{
    CandidateRule, Clef, CounterpointContext, CounterpointSolver, HarmonyRule, LocalRule,
    Parameters, RewardStrategy, Score, ScoreBuilder, Species,
};

const CANTUS: [&str; 7] = ["c3", "d3", "e3", "g3", "f3", "d3", "c3"];

fn pitch(ex: &str) -> Pitch {
    ex.parse().unwrap()
}

fn context(measures: usize, harmony: bool) -> CounterpointContext {
    let mut ctx = CounterpointContext::new(measures, Parameters { measure_length: whole(4) });
    ctx.candidate_rules_before.push(CandidateRule::ScaleTones);
    ctx.candidate_rules_after.extend([
        CandidateRule::MelodyIntervals,
        CandidateRule::LeapPreparationBefore,
        CandidateRule::LeapPreparationAfter,
    ]);
    if harmony {
        ctx.harmony_rules.push(HarmonyRule::ValidChords);
        ctx.harmonic_tone_rules.push(CandidateRule::ChordTone);
    } else {
        ctx.harmonic_tone_rules.push(CandidateRule::VerticalConsonanceStrict);
    }
    ctx.local_rules.extend([
        LocalRule::ForbidVoiceOverlap,
        LocalRule::ForbidPerfectsBySimilarMotion,
        LocalRule::ForbidNearbyPerfects,
        LocalRule::LimitConsecutiveLeaps,
        LocalRule::PrioritizeVoiceMotion,
    ]);
    ctx
}

fn solve_exercise(harmony: bool) -> Score {
    let ctx = context(CANTUS.len(), harmony);
    let cantus: Vec<Pitch> = CANTUS.iter().map(|ex| pitch(ex)).collect();
    let score = ScoreBuilder::new(&ctx, Scale::major(pitch("c0")))
        .alto(Arc::new(Species::first()))
        .whole_note_cantus(Clef::Bass, &cantus)
        .build();
    CounterpointSolver::new(ctx)
        .solve(score, RewardStrategy::Constant(250.0))
        .expect("exercise should be solvable")
}

fn melody(score: &Score, voice: usize) -> Vec<Pitch> {
    score.voices[voice]
        .measures
        .iter()
        .map(|m| m.notes[0].pitch.expect("every measure filled"))
        .collect()
}

#[test]
fn solves_first_species_over_cantus() {
    let solved = solve_exercise(false);
    let upper = melody(&solved, 0);
    let lower = melody(&solved, 1);
    assert_eq!(upper.len(), CANTUS.len());

    let (low, high) = solved.voices[0].range().unwrap();
    for p in &upper {
        assert!(p.ord() >= low.ord() && p.ord() <= high.ord(), "{p} out of range");
    }

    // Every vertical interval is consonant.
    for (x, y) in lower.iter().zip(&upper) {
        let int = x.interval_to(y).to_simple().abs();
        assert!(is_consonance(&int), "dissonant vertical {int:?}");
    }

    // No perfect consonance approached by similar motion or from another
    // perfect consonance.
    for i in 1..upper.len() {
        let d0 = lower[i - 1].interval_to(&upper[i - 1]).to_simple().abs();
        let d1 = lower[i].interval_to(&upper[i]).to_simple().abs();
        let up = upper[i].ord() - upper[i - 1].ord();
        let lo = lower[i].ord() - lower[i - 1].ord();
        let similar = up * lo > whole(0);
        assert!(
            !(is_perfect_consonance(&d1) && (similar || is_perfect_consonance(&d0))),
            "measure {i}: {d0:?} -> {d1:?}"
        );
    }
}

#[test]
fn solve_is_deterministic() {
    let a = solve_exercise(false);
    let b = solve_exercise(false);
    assert_eq!(a.content_hash(), b.content_hash());
    assert_eq!(melody(&a, 0), melody(&b, 0));
}

#[test]
fn solves_with_harmony_background() {
    let solved = solve_exercise(true);
    let upper = melody(&solved, 0);

    for (i, cantus) in CANTUS.iter().enumerate() {
        let chord = solved
            .harmony
            .chord_at(i)
            .unwrap_or_else(|| panic!("measure {i} has no chord"));
        // The cantus note pins the chord's bass; the written note belongs
        // to the chord.
        assert_eq!(chord.bass, pitch(cantus).with_period(0));
        assert!(chord.contains(&upper[i]), "measure {i}: {} outside chord", upper[i]);
    }
}
