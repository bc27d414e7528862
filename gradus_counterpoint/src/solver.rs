// Best-first search over partial scores.
//
// The solver is not an admissible A*: accumulated cost decays geometrically
// as a node advances (`POWER` per whole unit of musical time), and the
// priority rewards progress instead of estimating remaining cost. The decay
// keeps early mistakes from dominating late decisions, and the constant
// reward makes the frontier favor nodes that have written more music.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use log::{debug, trace};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use gradus_core::time::to_f64;

use crate::context::CounterpointContext;
use crate::score::Score;

/// Cost decay per whole unit of advanced time.
const POWER: f64 = 0.9;

#[derive(Debug, Clone, Copy)]
pub enum RewardStrategy {
    /// Priority is `cost - value * advanced_time`.
    Constant(f64),
}

#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub measure_index: usize,
    pub furthest: usize,
    pub total_measures: usize,
    pub iteration: u64,
}

/// Expansion record for one score state, kept for inspection after a solve.
#[derive(Debug, Clone, Copy)]
pub struct VisitedEntry {
    /// Content hash of the state this one was reached from.
    pub parent: u64,
    /// Undecayed cost of the move that produced this state.
    pub this_cost: f64,
    pub n_expanded: usize,
    pub measure_index: usize,
    pub is_goal: bool,
}

enum Target {
    /// The measure's chord slot is empty and harmony rules are configured.
    Chord,
    /// Writable measures at the current index, as voice indices.
    Measures(Vec<usize>),
}

struct Node {
    score: Score,
    hash: u64,
    measure_index: usize,
    /// Total musical time advanced, as a float for priority arithmetic.
    n_step: f64,
    cost: f64,
    this_cost: f64,
    parent: u64,
    target: Option<Target>,
}

impl Node {
    fn new(
        score: Score,
        ctx: &CounterpointContext,
        mut measure_index: usize,
        n_step: f64,
        cost: f64,
        this_cost: f64,
        parent: u64,
    ) -> Node {
        let hash = score.content_hash();
        let mut target = None;
        while measure_index < ctx.target_measures {
            target = find_writable(&score, ctx, measure_index);
            if target.is_some() {
                break;
            }
            measure_index += 1;
        }
        Node { score, hash, measure_index, n_step, cost, this_cost, parent, target }
    }

    fn is_goal(&self) -> bool {
        self.target.is_none()
    }

    fn neighbors(&self, ctx: &CounterpointContext) -> Vec<Node> {
        match &self.target {
            None => Vec::new(),
            Some(Target::Chord) => ctx
                .chord_candidates(&self.score, self.measure_index)
                .into_iter()
                .map(|(chord, c)| {
                    let harmony = self.score.harmony.with_chord(self.measure_index, chord);
                    Node::new(
                        self.score.replace_harmony(harmony),
                        ctx,
                        self.measure_index,
                        self.n_step,
                        self.cost * POWER + c,
                        c,
                        self.hash,
                    )
                })
                .collect(),
            Some(Target::Measures(voices)) => {
                let mut out = Vec::new();
                for &vi in voices.iter().rev() {
                    for step in ctx.measure_steps(&self.score, vi, self.measure_index) {
                        if ctx.global_rules.iter().any(|r| r(ctx, &step.score).is_some()) {
                            continue;
                        }
                        let adv = to_f64(step.advanced);
                        out.push(Node::new(
                            step.score,
                            ctx,
                            self.measure_index,
                            self.n_step + adv,
                            self.cost * POWER.powf(adv) + step.cost,
                            step.cost,
                            self.hash,
                        ));
                    }
                }
                out
            }
        }
    }
}

fn find_writable(score: &Score, ctx: &CounterpointContext, index: usize) -> Option<Target> {
    if !ctx.harmony_rules.is_empty() && score.harmony.chord_at(index).is_none() {
        return Some(Target::Chord);
    }
    let measures: Vec<usize> = score
        .voices
        .iter()
        .filter(|v| v.is_generated())
        .filter(|v| v.measures.get(index).is_some_and(|m| m.writable()))
        .map(|v| v.index)
        .collect();
    if measures.is_empty() { None } else { Some(Target::Measures(measures)) }
}

struct HeapEntry {
    f: OrderedFloat<f64>,
    seq: u64,
    node: Node,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on priority; oldest entry wins ties for determinism.
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct CounterpointSolver {
    ctx: CounterpointContext,
    /// Nodes expanded per round before their successors enter the frontier.
    pub batch: usize,
    /// Prune nodes this many measures behind the furthest frontier.
    pub remove_old: usize,
    /// Report progress every this many expansions.
    pub report_interval: u64,
    /// Give up after this many expansions.
    pub limit_steps: Option<u64>,
    /// Give up past this instant.
    pub deadline: Option<Instant>,
    pub on_progress: Option<Box<dyn FnMut(Progress)>>,
    visited: FxHashMap<u64, VisitedEntry>,
}

impl CounterpointSolver {
    pub fn new(ctx: CounterpointContext) -> CounterpointSolver {
        CounterpointSolver {
            ctx,
            batch: 5,
            remove_old: 2,
            report_interval: 1000,
            limit_steps: None,
            deadline: None,
            on_progress: None,
            visited: FxHashMap::default(),
        }
    }

    pub fn context(&self) -> &CounterpointContext {
        &self.ctx
    }

    /// States expanded by the last `solve` call, keyed by content hash.
    pub fn visited(&self) -> &FxHashMap<u64, VisitedEntry> {
        &self.visited
    }

    /// Search from `start` until a score with every target measure written
    /// is found. Returns `None` when the frontier empties or a configured
    /// limit is hit.
    pub fn solve(&mut self, start: Score, strategy: RewardStrategy) -> Option<Score> {
        let RewardStrategy::Constant(reward) = strategy;
        let priority = |n: &Node| OrderedFloat(n.cost - reward * n.n_step);

        let mut open = BinaryHeap::new();
        self.visited.clear();
        let mut seq = 0u64;

        let root = Node::new(start, &self.ctx, 0, 0.0, 0.0, 0.0, 0);
        open.push(HeapEntry { f: priority(&root), seq, node: root });

        let mut progress = 0usize;
        let mut furthest = 0usize;
        let mut n_node = 0u64;
        let mut n_neighbor = 0u64;
        let mut n_skipped = 0u64;

        while !open.is_empty() {
            let mut fresh = Vec::new();
            for _ in 0..self.batch {
                let Some(HeapEntry { node: current, .. }) = open.pop() else { break };

                if current.is_goal() {
                    self.record(&current, 0, true);
                    debug!(
                        "solved after {n_node} expansions, {n_neighbor} successors, \
                         {n_skipped} skipped"
                    );
                    return Some(current.score);
                }

                if self.limit_steps.is_some_and(|limit| n_node >= limit) {
                    debug!("step limit reached after {n_node} expansions");
                    return None;
                }
                if self.deadline.is_some_and(|d| Instant::now() >= d) {
                    debug!("deadline reached after {n_node} expansions");
                    return None;
                }

                if self.visited.contains_key(&current.hash) {
                    n_skipped += 1;
                    continue;
                }

                if current.measure_index + self.remove_old < furthest {
                    self.record(&current, 0, false);
                    continue;
                }
                furthest = furthest.max(current.measure_index);

                if current.measure_index != progress || n_node % self.report_interval == 0 {
                    progress = current.measure_index;
                    if let Some(cb) = self.on_progress.as_mut() {
                        cb(Progress {
                            measure_index: progress,
                            furthest,
                            total_measures: self.ctx.target_measures,
                            iteration: n_node,
                        });
                    }
                }
                if n_node > 0 && n_node % (self.report_interval * 10) == 0 {
                    trace!(
                        "expanded {n_node}, successors {n_neighbor}, skipped {n_skipped}, \
                         branching {:.3}",
                        n_neighbor as f64 / n_node as f64
                    );
                }

                let neighbors = current.neighbors(&self.ctx);
                n_node += 1;
                n_neighbor += neighbors.len() as u64;
                self.record(&current, neighbors.len(), false);
                fresh.extend(neighbors);
            }
            for node in fresh {
                seq += 1;
                open.push(HeapEntry { f: priority(&node), seq, node });
            }
        }

        debug!("frontier exhausted after {n_node} expansions");
        None
    }

    fn record(&mut self, node: &Node, n_expanded: usize, is_goal: bool) {
        self.visited.insert(
            node.hash,
            VisitedEntry {
                parent: node.parent,
                this_cost: node.this_cost,
                n_expanded,
                measure_index: node.measure_index,
                is_goal,
            },
        );
    }
}
