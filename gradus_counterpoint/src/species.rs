// Species definitions: melodic limits plus the measure schemas a generated
// voice may choose from.
//
// A schema is a named template of note slots. Instantiating one yields a
// measure of blank notes that the search fills slot by slot; the slot table
// also says how each slot may be filled (harmonic tone, which ornaments are
// allowed, or a leading rest that stays empty).

use gradus_core::Time;
use gradus_core::time::{time, whole};

use crate::score::{
    Measure, MeasureKind, MelodicContext, Note, Ornament, Parameters, Score, Voice,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// A rest that is never filled.
    Rest,
    Tone {
        /// May be filled with a chord or scale tone by the harmonic stage.
        harmonic: bool,
        /// Ornaments that may fill this slot instead.
        ornaments: Vec<Ornament>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteSlot {
    pub duration: Time,
    pub kind: SlotKind,
}

impl NoteSlot {
    pub fn is_rest(&self) -> bool {
        self.kind == SlotKind::Rest
    }
}

fn rest(duration: Time) -> NoteSlot {
    NoteSlot { duration, kind: SlotKind::Rest }
}

fn harmonic(duration: Time) -> NoteSlot {
    NoteSlot { duration, kind: SlotKind::Tone { harmonic: true, ornaments: vec![] } }
}

/// Harmonic slot that may also carry a passing or neighbor tone.
fn ornamented(duration: Time) -> NoteSlot {
    NoteSlot {
        duration,
        kind: SlotKind::Tone {
            harmonic: true,
            ornaments: vec![Ornament::PassingTone, Ornament::Neighbor],
        },
    }
}

/// Slot that must be a suspension.
fn suspension(duration: Time) -> NoteSlot {
    NoteSlot {
        duration,
        kind: SlotKind::Tone { harmonic: false, ornaments: vec![Ornament::Suspension] },
    }
}

/// Harmonic slot where a suspension is also allowed.
fn harmonic_suspension(duration: Time) -> NoteSlot {
    NoteSlot {
        duration,
        kind: SlotKind::Tone { harmonic: true, ornaments: vec![Ornament::Suspension] },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Any,
    /// First measure only.
    First,
    /// Every measure after the first.
    Later,
}

#[derive(Debug, Clone)]
pub struct MeasureSchema {
    pub name: &'static str,
    pub position: Position,
    /// Minimum number of voices in the score for this schema to apply.
    pub min_voices: usize,
    /// Require this schema to differ from its melodic predecessor and from
    /// what every other voice chose for the same measure.
    pub varied: bool,
    pub cost: f64,
    pub slots: fn(&Parameters) -> Vec<NoteSlot>,
}

impl MeasureSchema {
    fn plain(name: &'static str, position: Position, slots: fn(&Parameters) -> Vec<NoteSlot>) -> MeasureSchema {
        MeasureSchema { name, position, min_voices: 0, varied: false, cost: 0.0, slots }
    }

    fn varied(name: &'static str, position: Position, slots: fn(&Parameters) -> Vec<NoteSlot>) -> MeasureSchema {
        MeasureSchema { varied: true, ..MeasureSchema::plain(name, position, slots) }
    }

    pub fn applies(&self, score: &Score, voice: &Voice, index: usize) -> bool {
        match self.position {
            Position::Any => {}
            Position::First if index == 0 => {}
            Position::Later if index > 0 => {}
            _ => return false,
        }
        if score.voices.len() < self.min_voices {
            return false;
        }
        !self.varied || self.is_varied(score, voice, index)
    }

    /// The predecessor measure must use a different schema, and at least one
    /// other voice's measure at this index must too.
    fn is_varied(&self, score: &Score, voice: &Voice, index: usize) -> bool {
        if index > 0 && voice.measures[index - 1].schema_name() == Some(self.name) {
            return false;
        }
        let mut total = 0usize;
        let mut same = 0usize;
        for v in &score.voices {
            let Some(m) = v.measures.get(index) else { continue };
            let Some(name) = m.schema_name() else { continue };
            total += 1;
            if name == self.name {
                same += 1;
            }
        }
        !(total > 0 && same + 1 > total)
    }

    /// A measure of blank notes shaped by this schema.
    pub fn instantiate(
        &self,
        schema_index: usize,
        params: &Parameters,
        melodic: MelodicContext,
    ) -> Measure {
        let slots = (self.slots)(params);
        let notes: Vec<Note> = slots.iter().map(|s| Note::blank(s.duration)).collect();
        let duration = notes.iter().fold(whole(0), |acc, n| acc + n.duration);
        Measure {
            notes,
            duration,
            melodic,
            kind: MeasureKind::Schema { name: self.name, index: schema_index },
        }
    }
}

/// Limits on leap runs, checked against a measure's melodic context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MelodicSettings {
    pub forbid_repeated_notes: bool,
    pub max_consecutive_leaps: u32,
    /// Third leaps that do not count toward the consecutive limit.
    pub max_ignorable_third_leaps: u32,
    pub max_unidirectional_leaps: u32,
    pub max_unidirectional_ignorable_third_leaps: u32,
}

#[derive(Debug, Clone)]
pub struct Species {
    pub name: &'static str,
    pub melody: MelodicSettings,
    pub schemas: Vec<MeasureSchema>,
}

// Slot-table helpers. Measure lengths are whole for every species that
// counts unit slots.

fn unit_count(params: &Parameters) -> i64 {
    params.measure_length.to_integer()
}

fn half(params: &Parameters) -> Time {
    params.measure_length / 2
}

fn units(n: i64, slot: fn(Time) -> NoteSlot) -> Vec<NoteSlot> {
    (0..n.max(0)).map(|_| slot(whole(1))).collect()
}

impl Species {
    pub fn first() -> Species {
        Species {
            name: "first",
            melody: MelodicSettings {
                forbid_repeated_notes: false,
                max_consecutive_leaps: 2,
                max_ignorable_third_leaps: 2,
                max_unidirectional_leaps: 1,
                max_unidirectional_ignorable_third_leaps: 1,
            },
            schemas: vec![MeasureSchema::plain("sp1", Position::Any, |p| {
                vec![harmonic(p.measure_length)]
            })],
        }
    }

    pub fn second() -> Species {
        Species {
            name: "second",
            melody: STRICT_MELODY,
            schemas: vec![
                MeasureSchema::plain("sp2.0", Position::First, |p| {
                    vec![rest(half(p)), harmonic(half(p))]
                }),
                MeasureSchema::plain("sp2.1", Position::Later, |p| {
                    vec![harmonic(half(p)), ornamented(half(p))]
                }),
            ],
        }
    }

    pub fn third() -> Species {
        Species {
            name: "third",
            melody: STRICT_MELODY,
            schemas: vec![
                MeasureSchema::plain("sp3.0", Position::First, |p| {
                    let mut slots = vec![rest(whole(1)), harmonic(whole(1))];
                    slots.extend(units(unit_count(p) - 2, ornamented));
                    slots
                }),
                MeasureSchema::plain("sp3.1", Position::Later, |p| {
                    let mut slots = vec![harmonic(whole(1))];
                    slots.extend(units(unit_count(p) - 1, ornamented));
                    slots
                }),
            ],
        }
    }

    pub fn fourth() -> Species {
        Species {
            name: "fourth",
            melody: STRICT_MELODY,
            schemas: vec![
                MeasureSchema::plain("sp4.0", Position::First, |p| {
                    vec![rest(half(p)), harmonic(half(p))]
                }),
                MeasureSchema::plain("sp4.1", Position::Later, |p| {
                    vec![suspension(half(p)), harmonic(half(p))]
                }),
                // Breaking the chain of suspensions is allowed but costly.
                MeasureSchema {
                    cost: 500.0,
                    ..MeasureSchema::plain("sp4.2", Position::Later, |p| {
                        vec![harmonic(half(p)), ornamented(half(p))]
                    })
                },
            ],
        }
    }

    pub fn fifth() -> Species {
        Species {
            name: "fifth",
            melody: MelodicSettings { max_consecutive_leaps: 3, ..STRICT_MELODY },
            // Biases steer toward a florid mixture: suspensions preferred,
            // plain whole-note and minim measures a costly fallback.
            schemas: vec![
                MeasureSchema {
                    min_voices: 3,
                    cost: 100.0,
                    ..MeasureSchema::varied("sp5.1", Position::Later, |p| {
                        vec![harmonic(p.measure_length)]
                    })
                },
                MeasureSchema {
                    cost: 100.0,
                    ..MeasureSchema::varied("sp5.2.0", Position::First, |p| {
                        vec![rest(half(p)), harmonic(half(p))]
                    })
                },
                MeasureSchema {
                    cost: 100.0,
                    ..MeasureSchema::varied("sp5.2.1", Position::Later, |p| {
                        vec![harmonic(half(p)), ornamented(half(p))]
                    })
                },
                MeasureSchema {
                    cost: 20.0,
                    ..MeasureSchema::varied("sp5.3.0", Position::First, |p| {
                        let mut slots = vec![rest(whole(1)), harmonic(whole(1))];
                        slots.extend(units(unit_count(p) - 2, ornamented));
                        slots
                    })
                },
                MeasureSchema {
                    cost: 20.0,
                    ..MeasureSchema::varied("sp5.3.1", Position::Later, |p| {
                        let mut slots = vec![harmonic_suspension(whole(1))];
                        slots.extend(units(unit_count(p) - 1, ornamented));
                        slots
                    })
                },
                MeasureSchema {
                    cost: -20.0,
                    ..MeasureSchema::varied("sp5.4.1", Position::Later, |p| {
                        vec![suspension(half(p)), harmonic(half(p))]
                    })
                },
                MeasureSchema::varied("sp5.5.1", Position::Later, |p| {
                    let mut slots = vec![harmonic_suspension(half(p))];
                    slots.extend(units(unit_count(p) / 2, ornamented));
                    slots
                }),
                MeasureSchema::varied("sp5.5.2", Position::Later, |p| {
                    let mut slots = vec![harmonic(whole(1))];
                    slots.extend(units(unit_count(p) / 2 - 1, ornamented));
                    slots.push(harmonic(half(p)));
                    slots
                }),
                MeasureSchema::varied("sp5.5.3", Position::Later, |p| {
                    let mut slots = vec![harmonic_suspension(half(p)), ornamented(p.measure_length / 4)];
                    slots.extend(
                        (0..unit_count(p) / 2).map(|_| ornamented(time(1, 2))),
                    );
                    slots
                }),
                MeasureSchema::varied("sp5.5.4", Position::Later, |p| {
                    let head = (p.measure_length * 3 / 4).floor().to_integer();
                    let mut slots = vec![harmonic(whole(head))];
                    slots.extend(units(unit_count(p) - head, ornamented));
                    slots
                }),
                MeasureSchema::varied("sp5.5.5", Position::Later, |p| {
                    let mut slots = vec![harmonic(p.measure_length * 3 / 4)];
                    slots.extend(
                        (0..unit_count(p) / 2).map(|_| ornamented(time(1, 2))),
                    );
                    slots
                }),
            ],
        }
    }

    pub fn schema(&self, index: usize) -> &MeasureSchema {
        &self.schemas[index]
    }

    /// Every schema-instantiated measure this voice may start at `index`,
    /// with the schema's base cost.
    pub fn measure_options(
        &self,
        score: &Score,
        voice: &Voice,
        index: usize,
    ) -> Vec<(Measure, f64)> {
        let melodic = if index > 0 {
            voice.measures[index - 1].melodic
        } else {
            MelodicContext::default()
        };
        self.schemas
            .iter()
            .enumerate()
            .filter(|(_, s)| s.applies(score, voice, index))
            .map(|(i, s)| (s.instantiate(i, &score.parameters, melodic), s.cost))
            .collect()
    }
}

const STRICT_MELODY: MelodicSettings = MelodicSettings {
    forbid_repeated_notes: true,
    max_consecutive_leaps: 2,
    max_ignorable_third_leaps: 1,
    max_unidirectional_leaps: 1,
    max_unidirectional_ignorable_third_leaps: 0,
};
