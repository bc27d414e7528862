// Scale-tone production and degree-based resolution preferences.

use gradus_core::{Interval, Pitch, Scale};

use crate::score::{NoteCursor, Ornament, Score};

use super::{Candidates, PreferredIntervals, intersect_add, parse_preferred, sign_of};

/// Every tone of the score's scale within the voice's range, cost 0. With
/// existing candidates, intersects instead.
pub(super) fn scale_tones(
    score: &Score,
    cur: &NoteCursor<'_>,
    candidates: Option<Candidates>,
) -> Candidates {
    let tones = tones_in_range(&score.harmony.scale, cur);
    match candidates {
        None => tones,
        Some(c) => intersect_add(c, &tones),
    }
}

fn tones_in_range(scale: &Scale, cur: &NoteCursor<'_>) -> Candidates {
    let Some((low, high)) = cur.voice.range() else {
        return Candidates::new();
    };
    scale
        .degrees_in_range(&low, &high)
        .into_iter()
        .map(|p| (p, 0.0))
        .collect()
}

/// Preferred continuations after reaching one scale degree from one
/// direction.
#[derive(Debug, Clone)]
pub struct DegreePreference {
    /// Degree index in the score's scale.
    pub degree: usize,
    pub next: PreferredIntervals,
    /// Drop every candidate the table does not name.
    pub forbid_other: bool,
}

impl DegreePreference {
    fn new(degree: usize, next: &[(&str, f64)]) -> DegreePreference {
        DegreePreference { degree, next: parse_preferred(next), forbid_other: false }
    }
}

#[derive(Debug, Clone)]
pub struct DegreeMatrix {
    pub upward: Vec<DegreePreference>,
    pub downward: Vec<DegreePreference>,
}

impl DegreeMatrix {
    /// Major-mode tendencies: the leading tone pulls to the tonic, and
    /// downward arrivals at 6, 5, and 3 prefer to keep descending or resolve
    /// by half step.
    pub fn major() -> DegreeMatrix {
        DegreeMatrix {
            upward: vec![DegreePreference::new(6, &[("m2", -50.0)])],
            downward: vec![
                DegreePreference::new(6, &[("m2", -30.0)]),
                DegreePreference::new(5, &[("-M2", -20.0)]),
                DegreePreference::new(3, &[("-m2", -10.0)]),
            ],
        }
    }
}

/// Bias candidates after specific degrees, depending on the direction the
/// previous note was approached from.
pub(super) fn directional_degree_matrix(
    matrix: &DegreeMatrix,
    score: &Score,
    cur: &NoteCursor<'_>,
    mut c: Candidates,
) -> Candidates {
    let Some(prev) = cur.prev_global() else { return c };
    let Some(prev_pitch) = prev.pitch() else { return c };
    let Some(prev2) = prev.prev_global() else { return c };
    let Some(prev2_pitch) = prev2.pitch() else { return c };

    let sign = sign_of(prev2_pitch.distance_to(&prev_pitch));
    if sign == 0 {
        return c;
    }
    let side = if sign > 0 { &matrix.upward } else { &matrix.downward };

    let Some(deg) = score.harmony.scale.exact_degree(&prev_pitch) else {
        return c;
    };
    let Some(pref) = side.iter().find(|x| x.degree == deg.index) else {
        return c;
    };

    let next_map: Candidates = pref
        .next
        .iter()
        .map(|(int, cost)| (prev_pitch.add(int), *cost))
        .collect();

    for (p, cost) in &next_map {
        let Some(old) = c.get(p).copied() else { continue };
        if cost.is_infinite() {
            c.remove(p);
        } else {
            c.insert(*p, old + cost);
        }
    }
    if pref.forbid_other {
        c.retain(|p, _| next_map.contains_key(p));
    }
    c
}

/// Complete-minor scale tones plus the obligatory resolutions of the raised
/// 6th, natural 7th, and leading tone. Acts as the producer for minor-mode
/// voices.
pub(super) fn minor_resolution(
    root: Pitch,
    cur: &NoteCursor<'_>,
    candidates: Option<Candidates>,
    ornament: Option<Ornament>,
) -> Candidates {
    let scale = Scale::complete_minor(root);
    let scale_tones = {
        let Some((low, high)) = cur.voice.range() else {
            return Candidates::new();
        };
        scale
            .degrees_in_range(&low, &high)
            .into_iter()
            .map(|p| (p, 0.0))
            .collect::<Candidates>()
    };
    let c = candidates.unwrap_or_else(|| scale_tones.clone());

    // A suspension repeats its preparation, so the tendency rules below do
    // not apply to it.
    if ornament == Some(Ornament::Suspension) {
        return scale_tones;
    }

    let Some(n1) = cur.prev_global() else { return scale_tones };
    let Some(p1) = n1.pitch() else { return scale_tones };
    let Some(d1) = scale.exact_degree(&p1) else { return scale_tones };

    let Some(n0) = n1.prev_different() else { return scale_tones };
    let Some(p0) = n0.pitch() else { return scale_tones };
    if scale.exact_degree(&p0).is_none() {
        return scale_tones;
    }

    let int = |ex: &str| -> Interval {
        ex.parse().unwrap_or_else(|_| panic!("bad interval literal {ex:?}"))
    };

    match d1.index {
        // V - VI# - VII#: the raised 6th must come from below and go on up.
        6 => {
            if p0.interval_to(&p1) != int("M2") {
                return Candidates::new();
            }
            let target = p1.add(&int("M2"));
            filtered(c, |p| *p == target)
        }
        // I - VIIn - VIn: the natural 7th must come from above and descend.
        7 => {
            if p0.interval_to(&p1) != int("-M2") {
                return Candidates::new();
            }
            let target = p1.add(&int("-M2"));
            filtered(c, |p| *p == target)
        }
        // VII# - I: the leading tone resolves up a half step.
        8 => {
            let target = p1.add(&int("m2"));
            filtered(c, |p| *p == target)
        }
        _ => c,
    }
}

fn filtered(mut c: Candidates, keep: impl Fn(&Pitch) -> bool) -> Candidates {
    c.retain(|p, _| keep(p));
    c
}
