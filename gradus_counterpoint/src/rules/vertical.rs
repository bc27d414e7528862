// Vertical rules: consonance between voices, voice crossing, parallel and
// nearby perfect consonances, and motion-type costs.

use gradus_core::Pitch;

use crate::context::CounterpointContext;
use crate::score::{NoteCursor, Score, Voice};

use super::{Candidates, is_perfect_consonance, is_stepwise_around, sign_of};

/// Candidates must be consonant with every voice sounding at this moment,
/// per the context's harmonic interval table. The bass voice additionally
/// rejects the forbidden-with-bass intervals in both directions.
pub(super) fn consonance_strict(
    ctx: &CounterpointContext,
    score: &Score,
    cur: &NoteCursor<'_>,
    c: Candidates,
) -> Candidates {
    let t = cur.global_time();
    let last = score.voices.len() - 1;
    let mut other_pitches: Vec<Pitch> = Vec::new();
    let mut bass_pitch: Option<Pitch> = None;

    for voice in &score.voices {
        if voice.index == cur.voice.index {
            continue;
        }
        let Some(p) = voice.note_at(t).and_then(|n| n.pitch()) else {
            continue;
        };
        other_pitches.push(p);
        if voice.index == last {
            bass_pitch = Some(p);
        }
    }

    let is_bass_voice = cur.voice.index == last;
    let n = other_pitches.len() as f64;
    let mut out = Candidates::new();
    'outer: for (p, cost) in c {
        let mut new_cost = 0.0;
        for x in &other_pitches {
            let int = x.interval_to(&p).to_simple().abs();
            let Some(c2) = ctx.harmony_intervals.get(&int) else {
                continue 'outer;
            };
            new_cost += c2 / n;
            if is_bass_voice && ctx.forbid_with_bass.contains(&int) {
                continue 'outer;
            }
        }
        if let Some(bass) = bass_pitch {
            let int = bass.interval_to(&p).to_simple();
            if ctx.forbid_with_bass.contains(&int) {
                continue;
            }
        }
        out.insert(p, cost + new_cost);
    }
    out
}

/// Like `consonance_strict`, but only against voices that move at this
/// moment; held notes may stay dissonant (they resolve on their own terms).
pub(super) fn consonance_with_moving(
    ctx: &CounterpointContext,
    score: &Score,
    cur: &NoteCursor<'_>,
    c: Candidates,
) -> Candidates {
    let t = cur.global_time();
    let mut moving: Vec<Pitch> = Vec::new();
    for voice in &score.voices {
        if voice.index == cur.voice.index {
            continue;
        }
        let Some(n) = voice.note_at(t) else { continue };
        let Some(p) = n.pitch() else { continue };
        let held = n.prev().is_some_and(|prev| prev.pitch() == Some(p));
        if !held {
            moving.push(p);
        }
    }

    let n = moving.len() as f64;
    let mut out = Candidates::new();
    'outer: for (p, cost) in c {
        let mut new_cost = 0.0;
        for x in &moving {
            let int = x.interval_to(&p).to_simple().abs();
            let Some(c2) = ctx.harmony_intervals.get(&int) else {
                continue 'outer;
            };
            new_cost += c2 / n;
        }
        out.insert(p, cost + new_cost);
    }
    out
}

/// Veto a note that crosses into the register of an adjacent voice while the
/// two sound together.
pub(super) fn forbid_voice_overlap(
    ctx: &CounterpointContext,
    score: &Score,
    cur: &NoteCursor<'_>,
) -> f64 {
    let Some(p) = cur.pitch() else { return 0.0 };
    let ord = p.ord();
    let end = cur.global_end_time();
    let iv = cur.voice.index;

    let overlaps = |neighbor: &Voice| {
        let is_above = neighbor.index < iv;
        let mut c2 = neighbor.note_at(cur.global_time());
        while let Some(x) = c2 {
            if x.global_time() >= end {
                break;
            }
            if let Some(p2) = x.pitch() {
                let nord = p2.ord();
                let crossed = if is_above { nord < ord } else { nord > ord };
                if crossed || (!ctx.allow_unison && nord == ord) {
                    return true;
                }
            }
            c2 = x.next_global();
        }
        false
    };

    if iv > 0 && overlaps(&score.voices[iv - 1]) {
        return f64::INFINITY;
    }
    if iv + 1 < score.voices.len() && overlaps(&score.voices[iv + 1]) {
        return f64::INFINITY;
    }
    0.0
}

/// Veto perfect consonances reached by similar motion, or reached directly
/// from another perfect consonance.
pub(super) fn forbid_perfects_by_similar_motion(score: &Score, x1: &NoteCursor<'_>) -> f64 {
    let Some(x0) = x1.prev_global() else { return 0.0 };
    let Some(p0) = x0.pitch() else { return 0.0 };
    let Some(p1) = x1.pitch() else { return 0.0 };

    let sign0 = sign_of(p0.distance_to(&p1));
    for voice in &score.voices {
        if voice.index == x1.voice.index {
            continue;
        }
        let Some(n1) = voice.note_at(x1.global_time()) else { continue };
        let Some(pn1) = n1.pitch() else { continue };
        let n0 = if n1.global_time() < x1.global_time() {
            Some(n1)
        } else {
            n1.prev_global()
        };
        let Some(pn0) = n0.and_then(|x| x.pitch()) else { continue };

        let sign1 = sign_of(pn0.distance_to(&pn1));
        if sign0 == sign1 && sign0 == 0 {
            // both voices repeat, nothing arrives anywhere
            continue;
        }

        let d0 = p0.interval_to(&pn0).to_simple().abs();
        let d1 = p1.interval_to(&pn1).to_simple().abs();
        let similar = sign0 == sign1;
        if (similar || is_perfect_consonance(&d0)) && is_perfect_consonance(&d1) {
            return f64::INFINITY;
        }
    }
    0.0
}

/// Veto equal perfect consonances close to each other.
///
/// On a first beat, any equal perfect consonance less than a measure back
/// counts. Off the beat, only the same beat one measure earlier is checked,
/// and notes that are ornaments or fully stepwise-surrounded are exempt.
pub(super) fn forbid_nearby_perfects(
    ctx: &CounterpointContext,
    score: &Score,
    x1: &NoteCursor<'_>,
) -> f64 {
    let Some(px1) = x1.pitch() else { return 0.0 };
    let measure_len = ctx.parameters.measure_length;
    let t1 = x1.global_time();
    let v = x1.voice;

    if x1.index == 0 {
        for voice in &score.voices {
            if voice.index == v.index {
                continue;
            }
            let Some(y1) = voice.note_at(t1) else { continue };
            let Some(py1) = y1.pitch() else { continue };

            let int1 = px1.interval_to(&py1).abs();
            if !is_perfect_consonance(&int1) {
                continue;
            }

            // recent notes of the other voice against this voice
            let mut y2 = y1.prev_global();
            while let Some(yc) = y2 {
                let Some(py2) = yc.pitch() else { break };
                if t1 - yc.global_time() >= measure_len {
                    break;
                }
                if let Some(px2) = v.note_at(yc.global_time()).and_then(|x| x.pitch()) {
                    if px2.interval_to(&py2).abs() == int1 {
                        return f64::INFINITY;
                    }
                }
                y2 = yc.prev_global();
            }

            // recent notes of this voice against the other voice
            let mut x2 = x1.prev_global();
            while let Some(xc) = x2 {
                let Some(px2) = xc.pitch() else { break };
                if t1 - xc.global_time() >= measure_len {
                    break;
                }
                if let Some(py2) = voice.note_at(xc.global_time()).and_then(|x| x.pitch()) {
                    if px2.interval_to(&py2).abs() == int1 {
                        return f64::INFINITY;
                    }
                }
                x2 = xc.prev_global();
            }
        }
        return 0.0;
    }

    // Off the beat: ornaments and stepwise-surrounded notes are exempt.
    if x1.note().ornament.is_some() || is_stepwise_around(x1) == Some(true) {
        return 0.0;
    }

    let t2 = t1 - measure_len;
    let Some(x2) = v.note_at(t2) else { return 0.0 };
    let Some(px2) = x2.pitch() else { return 0.0 };
    if x2.global_time() != t2
        || x2.note().ornament.is_some()
        || is_stepwise_around(&x2) == Some(true)
    {
        return 0.0;
    }

    for voice in &score.voices {
        if voice.index == v.index {
            continue;
        }
        let Some(y1) = voice.note_at(t1) else { continue };
        let Some(py1) = y1.pitch() else { continue };
        if y1.note().ornament.is_some() || is_stepwise_around(&y1) == Some(true) {
            continue;
        }
        let int1 = px1.interval_to(&py1);
        if !is_perfect_consonance(&int1) {
            continue;
        }

        let Some(y2) = voice.note_at(t2) else { continue };
        let Some(py2) = y2.pitch() else { continue };
        if y2.note().ornament.is_some() || is_stepwise_around(&y2) == Some(true) {
            continue;
        }
        if px2.interval_to(&py2) == int1 {
            return f64::INFINITY;
        }
    }
    0.0
}

/// Cost by motion type against each other voice: similar motion worst,
/// oblique in between, contrary free. Averaged over the other voices.
pub(super) fn prioritize_voice_motion(
    ctx: &CounterpointContext,
    score: &Score,
    x1: &NoteCursor<'_>,
) -> f64 {
    if score.voices.len() <= 1 {
        return 0.0;
    }
    let Some(x0) = x1.prev_global() else { return 0.0 };
    let Some(p0) = x0.pitch() else { return 0.0 };
    let Some(p1) = x1.pitch() else { return 0.0 };
    let sign0 = sign_of(p0.distance_to(&p1));

    let mut cost = 0.0;
    for voice in &score.voices {
        if voice.index == x1.voice.index {
            continue;
        }
        let Some(n1) = voice.note_at(x1.global_time()) else { continue };
        let Some(pn1) = n1.pitch() else { continue };
        let Some(pn0) = n1.prev_global().and_then(|x| x.pitch()) else {
            continue;
        };

        let sign1 = sign_of(pn0.distance_to(&pn1));
        cost += if sign0 == sign1 {
            ctx.similar_motion_cost
        } else if sign0 == 0 || sign1 == 0 {
            ctx.oblique_motion_cost
        } else {
            ctx.contrary_motion_cost
        };
    }
    cost / (score.voices.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use crate::rules::testutil::{pitch as p, second_species_score, two_voice_score};
    use crate::score::Ornament;

    use super::*;

    fn ctx_for(score: &Score) -> CounterpointContext {
        CounterpointContext::new(score.voices[1].measures.len(), score.parameters)
    }

    fn all_of(pitches: &[&str]) -> Candidates {
        pitches.iter().map(|ex| (p(ex), 0.0)).collect()
    }

    #[test]
    fn test_consonance_strict_costs_and_vetoes() {
        let score = two_voice_score(&["e4"], &["c3", "g3"]);
        let ctx = ctx_for(&score);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        let out = consonance_strict(&ctx, &score, &cur, all_of(&["b3", "d4", "a3", "c4"]));

        // Against the sounding g3: thirds free, fifths cost 20.
        assert_eq!(out.get(&p("b3")), Some(&0.0));
        assert_eq!(out.get(&p("d4")), Some(&20.0));
        // A second is dissonant.
        assert!(!out.contains_key(&p("a3")));
        // A fourth over the bass is forbidden outright.
        assert!(!out.contains_key(&p("c4")));
    }

    #[test]
    fn test_consonance_with_moving_allows_fourth_over_bass() {
        let score = two_voice_score(&["e4"], &["c3", "g3"]);
        let ctx = ctx_for(&score);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        let out = consonance_with_moving(&ctx, &score, &cur, all_of(&["c4", "a3"]));
        assert_eq!(out.get(&p("c4")), Some(&10.0));
        assert!(!out.contains_key(&p("a3")));
    }

    #[test]
    fn test_voice_overlap() {
        let ctx_score = two_voice_score(&["f3"], &["g3", "c3"]);
        let ctx = ctx_for(&ctx_score);
        let cur = ctx_score.voices[0].note_cursor(0, 0).unwrap();
        assert!(forbid_voice_overlap(&ctx, &ctx_score, &cur).is_infinite());

        let unison = two_voice_score(&["g3"], &["g3", "c3"]);
        let cur = unison.voices[0].note_cursor(0, 0).unwrap();
        assert!(forbid_voice_overlap(&ctx, &unison, &cur).is_infinite());

        let fine = two_voice_score(&["e4"], &["g3", "c3"]);
        let cur = fine.voices[0].note_cursor(0, 0).unwrap();
        assert_eq!(forbid_voice_overlap(&ctx, &fine, &cur), 0.0);
    }

    #[test]
    fn test_parallel_fifths_by_similar_motion() {
        // a3 -> d4 over f3 -> g3 arrives at a fifth with both voices rising.
        let score = two_voice_score(&["a3", "d4"], &["f3", "g3", "c3"]);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        assert!(forbid_perfects_by_similar_motion(&score, &cur).is_infinite());
    }

    #[test]
    fn test_parallel_twelfth_by_similar_motion() {
        // A compound fifth counts the same as a simple one.
        let score = two_voice_score(&["a4", "d5"], &["f3", "g3", "c3"]);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        assert!(forbid_perfects_by_similar_motion(&score, &cur).is_infinite());
    }

    #[test]
    fn test_perfect_by_contrary_motion_allowed() {
        // e4 -> d4 descends against the rising cantus; the fifth is fine.
        let score = two_voice_score(&["e4", "d4"], &["f3", "g3", "c3"]);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        assert_eq!(forbid_perfects_by_similar_motion(&score, &cur), 0.0);
    }

    #[test]
    fn test_nearby_perfects_on_first_beat() {
        // The downbeat c5 over f4 repeats the fifth the off-beat d4 formed
        // against a4 half a measure earlier.
        let score = second_species_score(
            &[(1, "d4", None)],
            &[(0, "c5", None)],
            &["a4", "f4"],
        );
        let ctx = ctx_for(&score);
        let cur = score.voices[0].note_cursor(1, 0).unwrap();
        assert!(forbid_nearby_perfects(&ctx, &score, &cur).is_infinite());
    }

    #[test]
    fn test_nearby_perfects_same_beat_one_measure_apart() {
        let score = second_species_score(
            &[(1, "a4", None)],
            &[(0, "b4", None), (1, "c5", None)],
            &["d3", "f3"],
        );
        let ctx = ctx_for(&score);
        let cur = score.voices[0].note_cursor(1, 1).unwrap();
        assert!(forbid_nearby_perfects(&ctx, &score, &cur).is_infinite());
    }

    #[test]
    fn test_nearby_perfects_exempts_ornaments() {
        let score = second_species_score(
            &[(1, "a4", None)],
            &[(0, "b4", None), (1, "c5", Some(Ornament::Neighbor))],
            &["d3", "f3"],
        );
        let ctx = ctx_for(&score);
        let cur = score.voices[0].note_cursor(1, 1).unwrap();
        assert_eq!(forbid_nearby_perfects(&ctx, &score, &cur), 0.0);
    }

    #[test]
    fn test_motion_costs() {
        let ctx_score = two_voice_score(&["c4", "d4"], &["f3", "g3", "c3"]);
        let ctx = ctx_for(&ctx_score);

        // Similar motion.
        let cur = ctx_score.voices[0].note_cursor(1, 0).unwrap();
        assert_eq!(prioritize_voice_motion(&ctx, &ctx_score, &cur), 80.0);

        // Contrary motion.
        let contrary = two_voice_score(&["e4", "d4"], &["f3", "g3", "c3"]);
        let cur = contrary.voices[0].note_cursor(1, 0).unwrap();
        assert_eq!(prioritize_voice_motion(&ctx, &contrary, &cur), 0.0);

        // Oblique motion (this voice repeats).
        let oblique = two_voice_score(&["d4", "d4"], &["f3", "g3", "c3"]);
        let cur = oblique.voices[0].note_cursor(1, 0).unwrap();
        assert_eq!(prioritize_voice_motion(&ctx, &oblique, &cur), 40.0);
    }
}
