// Non-harmonic tone rules: what may become a passing tone, neighbor, or
// suspension, and how the line must continue after one.

use num_traits::Signed;

use gradus_core::time::whole;

use crate::score::{NoteCursor, Ornament, Score};

use super::{Candidates, is_consonance, sign_of};

/// After a passing tone, the line keeps moving stepwise in the same
/// direction.
pub(super) fn passing_tone_continuation(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(p1) = cur.prev_global() else { return c };
    let Some(prev) = p1.pitch() else { return c };
    if p1.note().ornament != Some(Ornament::PassingTone) {
        return c;
    }
    let Some(prev2) = p1.prev_global().and_then(|x| x.pitch()) else {
        return c;
    };

    let o2 = prev2.ord();
    let o1 = prev.ord();
    c.retain(|p, _| {
        sign_of(o1 - p.ord()) == sign_of(o2 - o1) && prev.steps_to(p).abs() <= 1
    });
    c
}

/// A passing tone is one scale step (at most a whole tone) away from the
/// previous note.
pub(super) fn make_passing_tone(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(prev) = cur.prev_global().and_then(|x| x.pitch()) else {
        return c;
    };
    c.retain(|p, _| {
        let dist = prev.distance_to(p).abs();
        prev.steps_to(p).abs() <= 1 && dist > whole(0) && dist <= whole(2)
    });
    c
}

/// After a neighbor tone, the line returns to the pitch it left.
pub(super) fn neighbor_resolution(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(p1) = cur.prev_global() else { return c };
    if p1.pitch().is_none() || p1.note().ornament != Some(Ornament::Neighbor) {
        return c;
    }
    let Some(prev2) = p1.prev_global().and_then(|x| x.pitch()) else {
        return c;
    };
    c.retain(|p, _| *p == prev2);
    c
}

/// A neighbor tone steps away from a harmonic note; it cannot follow another
/// non-harmonic tone.
pub(super) fn make_neighbor_tone(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(p1) = cur.prev_global() else { return Candidates::new() };
    let Some(prev) = p1.pitch() else { return Candidates::new() };
    if p1.note().is_non_harmonic() {
        return Candidates::new();
    }
    c.retain(|p, _| {
        let dist = prev.distance_to(p).abs();
        prev.steps_to(p).abs() <= 1 && dist > whole(0) && dist <= whole(2)
    });
    c
}

/// A suspension resolves down by step; when the held note is consonant with
/// every sounding voice it may instead rise by step at a cost.
pub(super) fn suspension_resolution(
    score: &Score,
    cur: &NoteCursor<'_>,
    c: Candidates,
) -> Candidates {
    let Some(p1) = cur.prev_global() else { return c };
    let Some(prev) = p1.pitch() else { return c };
    if p1.note().ornament != Some(Ornament::Suspension) {
        return c;
    }

    let t = p1.global_time();
    let mut is_chord_tone = true;
    for voice in &score.voices {
        if voice.index == cur.voice.index {
            continue;
        }
        let Some(n) = voice.note_at(t).and_then(|x| x.pitch()) else {
            continue;
        };
        if !is_consonance(&n.interval_to(&prev)) {
            is_chord_tone = false;
            break;
        }
    }

    c.into_iter()
        .filter_map(|(p, cost)| match prev.steps_to(&p) {
            -1 => Some((p, cost)),
            1 if is_chord_tone => Some((p, cost + 100.0)),
            _ => None,
        })
        .collect()
}

/// A suspension starts a measure by holding the previous harmonic pitch.
pub(super) fn make_suspension(cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    if cur.index != 0 {
        return Candidates::new();
    }
    let Some(p1) = cur.prev_global() else { return Candidates::new() };
    let Some(prev) = p1.pitch() else { return Candidates::new() };
    if p1.note().is_non_harmonic() {
        return Candidates::new();
    }
    c.retain(|p, _| *p == prev);
    c
}
