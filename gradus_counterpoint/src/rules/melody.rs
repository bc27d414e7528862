// Melodic interval control: the allowed-interval table, leap preparation and
// recovery, and the leap-run limits from the species' melodic settings.

use gradus_core::time::whole;

use crate::context::CounterpointContext;
use crate::score::{NoteCursor, Ornament};

use super::{Candidates, intersect_add};

/// Restrict continuations from the previous pitch to the context's melodic
/// interval table, adding each interval's cost. Chromatic passing tones
/// bypass the table when the context allows them.
pub(super) fn melody_intervals(
    ctx: &CounterpointContext,
    cur: &NoteCursor<'_>,
    c: Candidates,
    ornament: Option<Ornament>,
) -> Candidates {
    if ornament == Some(Ornament::PassingTone) && ctx.allow_chromatic_passing_tones {
        return c;
    }

    let Some(p1) = cur.prev_global() else { return c };
    let Some(prev) = p1.pitch() else { return c };
    let prev2 = p1.prev_global().and_then(|x| x.pitch());

    let forbid_repeated = cur
        .voice
        .melody_settings()
        .is_some_and(|s| s.forbid_repeated_notes);

    // Intervals in the table are relative to the previous melodic direction:
    // after a descent, the table flips.
    let flip = prev2.is_some_and(|p2| p2.ord() > prev.ord());

    let nexts: Candidates = ctx
        .melodic_intervals
        .iter()
        .filter(|(int, _)| !forbid_repeated || int.distance > whole(0))
        .map(|(int, cost)| {
            let int = if flip { int.negate() } else { *int };
            (prev.add(&int), *cost)
        })
        .collect();

    intersect_add(c, &nexts)
}

/// A leap beyond a third must be prepared by a step in the opposite
/// direction.
pub(super) fn leap_preparation_before(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(p1) = cur.prev_global() else { return c };
    let Some(prev) = p1.pitch() else { return c };
    let Some(prev2) = p1.prev_global().and_then(|x| x.pitch()) else {
        return c;
    };

    let int0 = prev2.interval_to(&prev);
    c.retain(|p, _| {
        let int = prev.interval_to(p);
        if int.steps < 3 {
            return true;
        }
        int0.steps == 1 && int.sign == int0.sign.flip()
    });
    c
}

/// After a leap beyond a third, either keep leaping (a compound arpeggio) or
/// recover by a step in the opposite direction.
pub(super) fn leap_preparation_after(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(p1) = cur.prev_global() else { return c };
    let Some(prev) = p1.pitch() else { return c };
    let Some(prev2) = p1.prev_global().and_then(|x| x.pitch()) else {
        return c;
    };

    let int0 = prev2.interval_to(&prev);
    if int0.steps < 3 {
        return c;
    }
    c.retain(|p, _| {
        let int = prev.interval_to(p);
        int.steps >= 3 || (int.steps == 1 && int.sign == int0.sign.flip())
    });
    c
}

/// Veto notes whose measure's melodic context exceeds the species' leap-run
/// limits. Third leaps are partially ignorable per the settings.
pub(super) fn limit_consecutive_leaps(cur: &NoteCursor<'_>) -> f64 {
    let m = cur.containing_measure().melodic;
    let Some(settings) = cur.voice.melody_settings() else { return 0.0 };

    let effective = m.consecutive_leaps - m.third_leaps.min(settings.max_ignorable_third_leaps);
    let effective_uni = m.unidirectional_leaps
        - m.unidirectional_third_leaps
            .min(settings.max_unidirectional_ignorable_third_leaps);
    if effective > settings.max_consecutive_leaps
        || effective_uni > settings.max_unidirectional_leaps
    {
        return f64::INFINITY;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use crate::rules::testutil::{last_cursor, pitch as p, score_with_melody};
    use crate::score::Score;

    use super::*;

    fn ctx_for(score: &Score) -> CounterpointContext {
        CounterpointContext::new(score.voices[0].measures.len(), score.parameters)
    }

    fn scale_candidates(score: &Score) -> Candidates {
        let cur = last_cursor(score);
        crate::rules::CandidateRule::ScaleTones.apply(&ctx_for(score), score, &cur, None, None)
    }

    #[test]
    fn test_melody_intervals_weights_continuations() {
        let score = score_with_melody(&["c4", "d4"]);
        let cur = last_cursor(&score);
        let out = melody_intervals(&ctx_for(&score), &cur, scale_candidates(&score), None);

        // Ascending context: steps up are free, steps back down cost 40.
        assert_eq!(out.get(&p("e4")), Some(&0.0));
        assert_eq!(out.get(&p("c4")), Some(&40.0));
        assert_eq!(out.get(&p("f4")), Some(&90.0));
        assert_eq!(out.get(&p("d5")), Some(&120.0));
        // The repeated note is gone: first species allows it, but the table
        // entry P1 survives only when the species permits repeats.
        assert_eq!(out.get(&p("d4")), Some(&500.0));
        // A seventh is not in the table at all.
        assert!(!out.contains_key(&p("c5")));
    }

    #[test]
    fn test_melody_intervals_flip_after_descent() {
        let score = score_with_melody(&["e4", "d4"]);
        let cur = last_cursor(&score);
        let out = melody_intervals(&ctx_for(&score), &cur, scale_candidates(&score), None);

        // Descending context: continuing down is free, turning back costs.
        assert_eq!(out.get(&p("c4")), Some(&0.0));
        assert_eq!(out.get(&p("e4")), Some(&40.0));
    }

    #[test]
    fn test_leap_preparation_before() {
        // e4 -> d4 is a step down, so an upward leap is prepared.
        let score = score_with_melody(&["e4", "d4"]);
        let cur = last_cursor(&score);
        let out = leap_preparation_before(&cur, scale_candidates(&score));
        assert!(out.contains_key(&p("g4")));
        assert!(out.contains_key(&p("a4")));
        // A downward leap is not.
        assert!(!out.contains_key(&p("g3")));
        // Steps and thirds pass regardless.
        assert!(out.contains_key(&p("c4")));
        assert!(out.contains_key(&p("b3")));
    }

    #[test]
    fn test_leap_preparation_after() {
        // d4 -> g4 is an upward leap of a fourth.
        let score = score_with_melody(&["d4", "g4"]);
        let cur = last_cursor(&score);
        let out = leap_preparation_after(&cur, scale_candidates(&score));
        // Step back down recovers.
        assert!(out.contains_key(&p("f4")));
        // Continuing with another leap is allowed.
        assert!(out.contains_key(&p("c5")));
        // A step onward in the same direction is not.
        assert!(!out.contains_key(&p("a4")));
        // Neither is a third.
        assert!(!out.contains_key(&p("b4")));
    }

    #[test]
    fn test_limit_consecutive_leaps() {
        // Three leaps in a row with only one ignorable third exceeds the
        // first-species limit of 2.
        let score = score_with_melody(&["c4", "f4", "b4", "g4", "d4"]);
        let v = &score.voices[0];
        let cur = v.note_cursor(4, 0).unwrap();
        assert_eq!(cur.pitch(), Some(p("d4")));
        assert!(limit_consecutive_leaps(&cur).is_infinite());

        let score = score_with_melody(&["c4", "f4", "d4"]);
        let cur = score.voices[0].note_cursor(2, 0).unwrap();
        assert_eq!(limit_consecutive_leaps(&cur), 0.0);
    }
}
