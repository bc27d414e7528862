// Chord-slot production and the chord-tone restriction used when composing
// against a solved harmony background.

use gradus_core::Pitch;

use crate::chord::{Chord, ChordShape};
use crate::score::{NoteCursor, Score};

use super::{Candidates, ChordCandidates};

/// Every permitted triad shape on every allowed bass, restricted to chords
/// whose tones all lie in the scale and cover the notes already written in
/// this measure. A sounding note in the bottom voice pins the bass.
pub(super) fn valid_chords(
    score: &Score,
    slot: usize,
    candidates: Option<ChordCandidates>,
) -> ChordCandidates {
    let scale = &score.harmony.scale;
    let last = score.voices.len() - 1;
    let mut basses: Vec<Pitch> = scale.degrees().to_vec();
    let mut notes: Vec<Pitch> = Vec::new();

    for v in &score.voices {
        let Some(m) = v.measures.get(slot) else { continue };
        let mut bass: Option<Pitch> = None;
        for n in &m.notes {
            if n.is_non_harmonic() {
                continue;
            }
            let Some(p) = n.pitch else { continue };
            let p0 = p.with_period(0);
            if v.index == last {
                if bass.is_none_or(|b| b.ord() > p0.ord()) {
                    bass = Some(p0);
                }
            } else {
                notes.push(p0);
            }
        }
        if let Some(b) = bass {
            basses = vec![b];
        }
    }

    let shapes = ChordShape::standard_triads();
    let mut map = ChordCandidates::new();
    for bass in &basses {
        for shape in &shapes {
            let chord = Chord::from_shape(*bass, shape);
            if chord.tones().iter().any(|t| scale.exact_degree(t).is_none())
                || notes.iter().any(|x| !chord.contains(x))
            {
                continue;
            }
            map.insert(chord, 0.0);
        }
    }

    match candidates {
        None => map,
        Some(c) => c
            .into_iter()
            .filter_map(|(ch, cost)| map.get(&ch).map(|add| (ch, cost + add)))
            .collect(),
    }
}

/// Candidates must belong to the measure's solved chord; the bottom voice
/// must take the chord's bass itself.
pub(super) fn chord_tone(score: &Score, cur: &NoteCursor<'_>, mut c: Candidates) -> Candidates {
    let Some(ch) = score.harmony.chord_at(cur.measure) else {
        return c;
    };
    if cur.voice.index == score.voices.len() - 1 {
        let bass = ch.bass;
        c.retain(|p, _| p.with_period(0) == bass);
    } else {
        c.retain(|p, _| ch.contains(p));
    }
    c
}
