//! Monte Carlo tree search.
//!
//! Nodes live in an arena and refer to their parent by index. Each node
//! accumulates rewards from the point of view of the side that moved into
//! it, so a parent always picks the child that is best for itself.

use std::time::{Duration, Instant};

use atomic_rules::AtomicPosition;
use chess_core::{Color, Move};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::SearchError;
use crate::eval::Evaluator;

/// Exploration constant for UCB1.
pub const EXPLORATION_CONSTANT: f64 = 1.4;

/// Rollout plies between deadline checks.
const DEADLINE_CHECK_INTERVAL: u32 = 16;

/// Longer limits are clamped to this.
const MAX_TIME_LIMIT: Duration = Duration::from_secs(3600);

/// Centipawns mapped to a reward of `tanh(1)`.
const REWARD_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MctsConfig {
    /// Hard wall-clock limit.
    pub time_limit: Duration,
    /// Maximum number of simulations.
    pub simulations: u32,
    pub exploration: f64,
    /// Maximum plies per random playout.
    pub rollout_cap: u32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        MctsConfig {
            time_limit: Duration::from_secs(2),
            simulations: 1000,
            exploration: EXPLORATION_CONSTANT,
            rollout_cap: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MctsResult {
    pub best_move: Move,
    /// Mean reward of the chosen move, scaled to roughly centipawns.
    pub score: i32,
    /// Simulations completed.
    pub simulations: u64,
    /// Visits of the chosen move.
    pub visits: u32,
}

struct Node {
    mv: Option<Move>,
    parent: Option<usize>,
    children: Vec<usize>,
    untried: Vec<Move>,
    position: AtomicPosition,
    visits: u32,
    reward: f64,
}

impl Node {
    fn new(position: AtomicPosition, mv: Option<Move>, parent: Option<usize>) -> Self {
        let untried = if position.status().is_over() {
            Vec::new()
        } else {
            position.legal_moves().iter().copied().collect()
        };
        Node {
            mv,
            parent,
            children: Vec::new(),
            untried,
            position,
            visits: 0,
            reward: 0.0,
        }
    }

    /// The side whose move led here.
    fn mover(&self) -> Color {
        self.position.side_to_move().opposite()
    }

    fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward / self.visits as f64
        }
    }
}

struct Tree {
    nodes: Vec<Node>,
    simulations: u64,
}

impl Tree {
    const ROOT: usize = 0;

    fn new(root: AtomicPosition) -> Self {
        Tree {
            nodes: vec![Node::new(root, None, None)],
            simulations: 0,
        }
    }

    fn ucb1(&self, parent: usize, child: usize, exploration: f64) -> f64 {
        let node = &self.nodes[child];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let parent_visits = self.nodes[parent].visits.max(1) as f64;
        node.mean() + exploration * (parent_visits.ln() / node.visits as f64).sqrt()
    }

    /// Descends through fully expanded nodes; ties keep the earlier child.
    fn select(&self, exploration: f64) -> usize {
        let mut id = Self::ROOT;
        while self.nodes[id].untried.is_empty() && !self.nodes[id].children.is_empty() {
            let mut best = self.nodes[id].children[0];
            let mut best_value = self.ucb1(id, best, exploration);
            for &child in &self.nodes[id].children[1..] {
                let value = self.ucb1(id, child, exploration);
                if value > best_value {
                    best = child;
                    best_value = value;
                }
            }
            id = best;
        }
        id
    }

    fn expand<R: Rng + ?Sized>(&mut self, id: usize, rng: &mut R) -> Result<usize, SearchError> {
        let untried = &mut self.nodes[id].untried;
        if untried.is_empty() {
            return Ok(id);
        }
        let index = rng.gen_range(0..untried.len());
        let m = untried.swap_remove(index);

        let mut position = self.nodes[id].position.clone();
        let _ = position.apply(m)?;

        let child = self.nodes.len();
        self.nodes.push(Node::new(position, Some(m), Some(id)));
        self.nodes[id].children.push(child);
        Ok(child)
    }

    /// Adds `reward`, given for `perspective`, along the path to the root.
    fn backpropagate(&mut self, from: usize, reward: f64, perspective: Color) {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.visits += 1;
            node.reward += if node.mover() == perspective {
                reward
            } else {
                -reward
            };
            current = node.parent;
        }
    }

    /// The most visited root child; ties go to the first expanded.
    fn best_child(&self) -> Option<&Node> {
        let mut best: Option<&Node> = None;
        for &child in &self.nodes[Self::ROOT].children {
            let node = &self.nodes[child];
            if best.map_or(true, |b| node.visits > b.visits) {
                best = Some(node);
            }
        }
        best
    }
}

pub struct Mcts<'a> {
    evaluator: &'a dyn Evaluator,
    config: MctsConfig,
}

impl<'a> Mcts<'a> {
    pub fn new(evaluator: &'a dyn Evaluator, config: MctsConfig) -> Self {
        Mcts { evaluator, config }
    }

    /// Runs until the simulation budget or the deadline is exhausted.
    ///
    /// `Ok(None)` when no simulation completed or the root has no moves.
    pub fn search<R: Rng + ?Sized>(
        &self,
        root: &AtomicPosition,
        rng: &mut R,
    ) -> Result<Option<MctsResult>, SearchError> {
        let start = Instant::now();
        let deadline = start + self.config.time_limit.min(MAX_TIME_LIMIT);
        let tree = self.run(root, deadline, rng)?;

        let Some(best) = tree.best_child() else {
            return Ok(None);
        };
        let Some(best_move) = best.mv else {
            return Ok(None);
        };

        let result = MctsResult {
            best_move,
            score: (best.mean() * REWARD_SCALE).round() as i32,
            simulations: tree.simulations,
            visits: best.visits,
        };
        tracing::debug!(
            "mcts: {} visits {}/{} score {} tree {} in {:?}",
            result.best_move,
            result.visits,
            result.simulations,
            result.score,
            tree.nodes.len(),
            start.elapsed()
        );
        Ok(Some(result))
    }

    fn run<R: Rng + ?Sized>(
        &self,
        root: &AtomicPosition,
        deadline: Instant,
        rng: &mut R,
    ) -> Result<Tree, SearchError> {
        let perspective = root.side_to_move();
        let mut tree = Tree::new(root.clone());

        while tree.simulations < u64::from(self.config.simulations) {
            if Instant::now() >= deadline {
                break;
            }
            let leaf = tree.select(self.config.exploration);
            let leaf = tree.expand(leaf, rng)?;
            let reward = self.rollout(&tree.nodes[leaf].position, perspective, deadline, rng)?;
            tree.backpropagate(leaf, reward, perspective);
            tree.simulations += 1;
        }

        Ok(tree)
    }

    /// Random playout, scored for `perspective` in [-1, 1].
    fn rollout<R: Rng + ?Sized>(
        &self,
        start: &AtomicPosition,
        perspective: Color,
        deadline: Instant,
        rng: &mut R,
    ) -> Result<f64, SearchError> {
        let mut position = start.clone();

        for ply in 0..self.config.rollout_cap {
            if ply > 0 && ply % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                break;
            }
            if position.settled_status().is_some() {
                break;
            }
            let moves = position.legal_moves();
            let Some(&m) = moves.as_slice().choose(rng) else {
                break;
            };
            let _ = position.apply(m)?;
        }

        let score = self.evaluator.evaluate(&position, perspective)?;
        Ok((f64::from(score) / REWARD_SCALE).tanh())
    }
}
