//! Constrained Pattern Growth
//!
//! Depth-first pattern growth over projected occurrences. Every node of the
//! search tree is a pattern; its projection lists, per sequence, the
//! occurrences that could still be extended into one satisfying all
//! constraints within the span limit. Nodes live in a per-subtree arena
//! (item plus parent index) and are visited through an explicit work stack.
//! Root subtrees are independent and run on the rayon pool.

use crate::cancel::CancellationToken;
use crate::config::MiningConfig;
use crate::constraint::{Aggregate, AttrState, BoundConstraint, Constraint, Remaining};
use crate::database::{ItemId, SequenceDatabase};
use crate::error::MiningError;
use crate::pattern::Pattern;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One way of matching a pattern inside a sequence
#[derive(Debug, Clone, PartialEq)]
struct Occurrence {
    first: usize,
    last: usize,
    /// Aggregates per tracked attribute
    states: Vec<AttrState>,
}

/// Occurrences per sequence index, only sequences with at least one
type Projection = Vec<(usize, Vec<Occurrence>)>;

#[derive(Debug, Clone, Copy)]
struct Node {
    item: ItemId,
    parent: Option<usize>,
}

struct Frame {
    node: usize,
    depth: usize,
    projection: Projection,
}

/// Patterns found under one root, with the number of nodes expanded
type SubtreeResult = (Vec<(Vec<ItemId>, usize)>, u64);

/// Sequential pattern miner over a sequence database
#[derive(Debug)]
pub struct Miner<'a> {
    db: &'a SequenceDatabase,
    config: MiningConfig,
    constraints: Vec<BoundConstraint>,
    /// Tracked-attribute slot of each constraint
    slots: Vec<usize>,
    /// Attribute index of each slot
    tracked: Vec<usize>,
    /// Whether a slot must keep its values for a median
    keep_values: Vec<bool>,
    min_support: usize,
}

impl<'a> Miner<'a> {
    /// Validate constraints and configuration against the database
    pub fn new(db: &'a SequenceDatabase, constraints: Vec<Constraint>, config: MiningConfig) -> Result<Self, MiningError> {
        if db.is_empty() {
            return Err(MiningError::EmptyInput);
        }
        config.validate()?;
        let min_support = config.min_frequency.resolve(db.len())?;

        let constraints = constraints
            .iter()
            .map(|c| c.bind(db))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tracked: Vec<usize> = Vec::new();
        let mut slots = Vec::with_capacity(constraints.len());
        for c in &constraints {
            let slot = match tracked.iter().position(|&a| a == c.attribute) {
                Some(slot) => slot,
                None => {
                    tracked.push(c.attribute);
                    tracked.len() - 1
                }
            };
            slots.push(slot);
        }
        let keep_values = (0..tracked.len())
            .map(|slot| {
                constraints
                    .iter()
                    .zip(&slots)
                    .any(|(c, &s)| s == slot && c.aggregate == Aggregate::Median)
            })
            .collect();

        debug!(
            "Miner ready: sequences={}, alphabet={}, constraints={}, min_support={}",
            db.len(),
            db.alphabet().len(),
            constraints.len(),
            min_support
        );

        Ok(Self {
            db,
            config,
            constraints,
            slots,
            tracked,
            keep_values,
            min_support,
        })
    }

    /// Absolute support threshold
    pub fn min_support(&self) -> usize {
        self.min_support
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Mine all frequent patterns satisfying the constraints
    pub fn mine(&self) -> Result<Vec<Pattern>, MiningError> {
        self.mine_with(&CancellationToken::new())
    }

    /// Mine with cooperative cancellation
    pub fn mine_with(&self, token: &CancellationToken) -> Result<Vec<Pattern>, MiningError> {
        token.check()?;
        let roots = self.roots();
        info!(
            "Mining patterns: sequences={}, frequent_roots={}, min_support={}, parallel={}",
            self.db.len(),
            roots.len(),
            self.min_support,
            self.config.parallel
        );

        let subtrees: Vec<SubtreeResult> = if self.config.parallel {
            roots
                .into_par_iter()
                .map(|(item, projection)| self.grow(item, projection, token))
                .collect::<Result<_, _>>()?
        } else {
            roots
                .into_iter()
                .map(|(item, projection)| self.grow(item, projection, token))
                .collect::<Result<_, _>>()?
        };

        let mut expanded = 0;
        let mut found = Vec::new();
        for (patterns, nodes) in subtrees {
            found.extend(patterns);
            expanded += nodes;
        }
        metrics::counter!("sequence_miner_nodes_expanded_total").increment(expanded);

        found.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then_with(|| a.cmp(b)));
        let patterns: Vec<Pattern> = found
            .into_iter()
            .map(|(items, support)| Pattern {
                items: self.db.decode(&items),
                support,
            })
            .collect();

        info!("Mined {} patterns, expanded {} nodes", patterns.len(), expanded);
        Ok(patterns)
    }

    /// Indicator per sequence and pattern: does the sequence hold a valid
    /// occurrence under the miner's constraints and span limit
    pub fn one_hot(&self, patterns: &[Pattern]) -> Vec<Vec<bool>> {
        let encoded: Vec<Option<Vec<ItemId>>> = patterns.iter().map(|p| self.db.encode(&p.items)).collect();
        (0..self.db.len())
            .map(|s| {
                encoded
                    .iter()
                    .map(|items| items.as_deref().is_some_and(|items| self.occurs(s, items)))
                    .collect()
            })
            .collect()
    }

    /// Constrained support of an arbitrary event sequence
    pub fn support<T: AsRef<str>>(&self, events: &[T]) -> usize {
        match self.db.encode(events) {
            Some(items) => (0..self.db.len()).filter(|&s| self.occurs(s, &items)).count(),
            None => 0,
        }
    }

    fn grow(&self, root: ItemId, projection: Projection, token: &CancellationToken) -> Result<SubtreeResult, MiningError> {
        let mut arena = vec![Node { item: root, parent: None }];
        let mut stack = vec![Frame {
            node: 0,
            depth: 1,
            projection,
        }];
        let mut found = Vec::new();
        let mut expanded = 0u64;

        while let Some(frame) = stack.pop() {
            token.check()?;

            if frame.depth >= self.config.min_length {
                let support = self.valid_support(&frame.projection);
                if support >= self.min_support {
                    found.push((path(&arena, frame.node), support));
                }
            }

            if self.config.max_length.is_some_and(|max| frame.depth >= max) {
                continue;
            }

            expanded += 1;
            for (item, projection) in self.children(&frame.projection) {
                arena.push(Node {
                    item,
                    parent: Some(frame.node),
                });
                stack.push(Frame {
                    node: arena.len() - 1,
                    depth: frame.depth + 1,
                    projection,
                });
            }
        }

        Ok((found, expanded))
    }

    /// Single-item projections with enough promising sequences
    fn roots(&self) -> Vec<(ItemId, Projection)> {
        let mut by_item: BTreeMap<ItemId, Projection> = BTreeMap::new();
        for (s, seq) in self.db.sequences().iter().enumerate() {
            let mut local: BTreeMap<ItemId, Vec<Occurrence>> = BTreeMap::new();
            for (p, &item) in seq.iter().enumerate() {
                if let Some(occ) = self.start(s, p) {
                    self.insert(local.entry(item).or_default(), occ);
                }
            }
            for (item, occs) in local {
                by_item.entry(item).or_default().push((s, occs));
            }
        }
        by_item
            .into_iter()
            .filter(|(_, projection)| projection.len() >= self.min_support)
            .collect()
    }

    /// One-item extensions of a projection with enough promising sequences
    fn children(&self, projection: &Projection) -> BTreeMap<ItemId, Projection> {
        let mut children: BTreeMap<ItemId, Projection> = BTreeMap::new();
        for (s, occs) in projection {
            let seq = &self.db.sequences()[*s];
            let mut local: BTreeMap<ItemId, Vec<Occurrence>> = BTreeMap::new();
            for occ in occs {
                for q in occ.last + 1..self.horizon(*s, occ.first) {
                    if let Some(next) = self.extend(*s, occ, q) {
                        self.insert(local.entry(seq[q]).or_default(), next);
                    }
                }
            }
            for (item, occs) in local {
                children.entry(item).or_default().push((*s, occs));
            }
        }
        children.retain(|_, projection| projection.len() >= self.min_support);
        children
    }

    /// Whether sequence `s` holds a valid occurrence of `items`
    fn occurs(&self, s: usize, items: &[ItemId]) -> bool {
        let Some((&head, tail)) = items.split_first() else {
            return false;
        };
        let seq = &self.db.sequences()[s];

        let mut occs = Vec::new();
        for (p, &item) in seq.iter().enumerate() {
            if item == head {
                if let Some(occ) = self.start(s, p) {
                    self.insert(&mut occs, occ);
                }
            }
        }

        for &next in tail {
            let mut grown = Vec::new();
            for occ in &occs {
                for q in occ.last + 1..self.horizon(s, occ.first) {
                    if seq[q] == next {
                        if let Some(occ) = self.extend(s, occ, q) {
                            self.insert(&mut grown, occ);
                        }
                    }
                }
            }
            if grown.is_empty() {
                return false;
            }
            occs = grown;
        }

        occs.iter().any(|occ| self.valid(occ))
    }

    fn valid_support(&self, projection: &Projection) -> usize {
        projection
            .iter()
            .filter(|(_, occs)| occs.iter().any(|occ| self.valid(occ)))
            .count()
    }

    /// Exclusive end of the positions an occurrence starting at `first` may use
    fn horizon(&self, s: usize, first: usize) -> usize {
        let len = self.db.sequences()[s].len();
        match self.config.max_span {
            Some(span) => (first + span).min(len),
            None => len,
        }
    }

    fn values(&self, slot: usize, s: usize) -> &[f64] {
        &self.db.attributes()[self.tracked[slot]].values[s]
    }

    fn start(&self, s: usize, p: usize) -> Option<Occurrence> {
        let states = (0..self.tracked.len())
            .map(|slot| AttrState::start(self.values(slot, s)[p], self.keep_values[slot]))
            .collect();
        let occ = Occurrence {
            first: p,
            last: p,
            states,
        };
        self.promising(s, &occ).then_some(occ)
    }

    fn extend(&self, s: usize, occ: &Occurrence, q: usize) -> Option<Occurrence> {
        for (c, &slot) in self.constraints.iter().zip(&self.slots) {
            if !c.allows_step(occ.states[slot].last, self.values(slot, s)[q]) {
                return None;
            }
        }
        let states = occ
            .states
            .iter()
            .enumerate()
            .map(|(slot, state)| state.push(self.values(slot, s)[q]))
            .collect();
        let next = Occurrence {
            first: occ.first,
            last: q,
            states,
        };
        self.promising(s, &next).then_some(next)
    }

    /// Whether the occurrence, or an extension within its horizon, could
    /// satisfy every constraint
    fn promising(&self, s: usize, occ: &Occurrence) -> bool {
        if self.constraints.is_empty() {
            return true;
        }
        let end = self.horizon(s, occ.first);
        let remaining: Vec<Remaining> = (0..self.tracked.len())
            .map(|slot| Remaining::over(&self.values(slot, s)[occ.last + 1..end]))
            .collect();
        self.constraints
            .iter()
            .zip(&self.slots)
            .all(|(c, &slot)| c.reachable(&occ.states[slot], &remaining[slot]))
    }

    fn valid(&self, occ: &Occurrence) -> bool {
        self.constraints
            .iter()
            .zip(&self.slots)
            .all(|(c, &slot)| c.holds(&occ.states[slot]))
    }

    /// Add an occurrence unless an equivalent or dominating one is present
    fn insert(&self, occs: &mut Vec<Occurrence>, occ: Occurrence) {
        if !self.constraints.is_empty() {
            if !occs.contains(&occ) {
                occs.push(occ);
            }
            return;
        }

        // Unconstrained: an earlier end and a later start leave more room
        if self.config.max_span.is_none() {
            match occs.first_mut() {
                Some(kept) if kept.last <= occ.last => {}
                Some(kept) => *kept = occ,
                None => occs.push(occ),
            }
            return;
        }
        if occs.iter().any(|o| o.first >= occ.first && o.last <= occ.last) {
            return;
        }
        occs.retain(|o| !(occ.first >= o.first && occ.last <= o.last));
        occs.push(occ);
    }
}

fn path(arena: &[Node], mut node: usize) -> Vec<ItemId> {
    let mut items = Vec::new();
    loop {
        items.push(arena[node].item);
        match arena[node].parent {
            Some(parent) => node = parent,
            None => break,
        }
    }
    items.reverse();
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinFrequency;

    fn scenario() -> SequenceDatabase {
        SequenceDatabase::new(vec![
            vec!["A", "A", "B", "A", "D"],
            vec!["C", "B", "A"],
            vec!["C", "A", "C", "D"],
        ])
        .with_attribute(
            "price",
            vec![vec![5.0, 5.0, 3.0, 8.0, 2.0], vec![1.0, 3.0, 3.0], vec![4.0, 5.0, 2.0, 1.0]],
        )
        .unwrap()
    }

    fn items(patterns: &[Pattern]) -> Vec<Vec<&str>> {
        patterns
            .iter()
            .map(|p| p.items.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_average_constraint_scenario() {
        let db = scenario();
        let miner = Miner::new(
            &db,
            vec![Constraint::average("price").between(3.0, 4.0)],
            MiningConfig::default(),
        )
        .unwrap();

        let patterns = miner.mine().unwrap();
        assert!(patterns.contains(&Pattern::new(["A", "D"], 2)));
        assert!(patterns.iter().all(|p| p.support >= 2));
        assert!(patterns.iter().all(|p| p.len() >= 2));
        assert_eq!(miner.support(&["A", "D"]), 2);
    }

    #[test]
    fn test_unconstrained_order() {
        let db = SequenceDatabase::new(vec![vec!["a", "b", "c"], vec!["a", "c"], vec!["b", "c"]]);
        let miner = Miner::new(&db, vec![], MiningConfig::default()).unwrap();
        assert_eq!(
            items(&miner.mine().unwrap()),
            vec![vec!["a", "c"], vec!["b", "c"]]
        );

        let miner = Miner::new(&db, vec![], MiningConfig::exhaustive()).unwrap();
        let patterns = miner.mine().unwrap();
        assert_eq!(
            items(&patterns),
            vec![vec!["c"], vec!["a"], vec!["a", "c"], vec!["b"], vec!["b", "c"]]
        );
        assert_eq!(patterns[0].support, 3);
    }

    #[test]
    fn test_max_span_limits_occurrences() {
        let db = SequenceDatabase::new(vec![vec!["a", "x", "x", "b"], vec!["a", "b"]]);
        let narrow = MiningConfig {
            max_span: Some(2),
            ..Default::default()
        };
        let miner = Miner::new(&db, vec![], narrow).unwrap();
        assert!(miner.mine().unwrap().is_empty());

        let wide = MiningConfig {
            max_span: Some(4),
            ..Default::default()
        };
        let miner = Miner::new(&db, vec![], wide).unwrap();
        assert_eq!(miner.mine().unwrap(), vec![Pattern::new(["a", "b"], 2)]);
    }

    #[test]
    fn test_max_length() {
        let db = SequenceDatabase::new(vec![vec!["a", "b", "c"], vec!["a", "b", "c"]]);
        let config = MiningConfig {
            max_length: Some(2),
            ..Default::default()
        };
        let patterns = Miner::new(&db, vec![], config).unwrap().mine().unwrap();
        assert_eq!(patterns.len(), 3);
        assert!(patterns.iter().all(|p| p.len() == 2));
    }

    #[test]
    fn test_gap_constraint() {
        let db = SequenceDatabase::new(vec![vec!["a", "b"], vec!["a", "b"]])
            .with_attribute("t", vec![vec![1.0, 2.0], vec![1.0, 5.0]])
            .unwrap();
        let config = MiningConfig::default().with_min_frequency(MinFrequency::Count(1));
        let miner = Miner::new(&db, vec![Constraint::gap("t").between(0.0, 2.0)], config).unwrap();
        assert_eq!(miner.mine().unwrap(), vec![Pattern::new(["a", "b"], 1)]);
        assert_eq!(
            miner.one_hot(&[Pattern::new(["a", "b"], 1)]),
            vec![vec![true], vec![false]]
        );
    }

    #[test]
    fn test_one_hot_matches_support() {
        let db = scenario();
        let miner = Miner::new(
            &db,
            vec![Constraint::average("price").between(3.0, 4.0)],
            MiningConfig::default(),
        )
        .unwrap();
        let patterns = miner.mine().unwrap();
        let flags = miner.one_hot(&patterns);
        assert_eq!(flags.len(), db.len());
        for (j, pattern) in patterns.iter().enumerate() {
            let count = flags.iter().filter(|row| row[j]).count();
            assert_eq!(count, pattern.support, "pattern {}", pattern);
        }
    }

    #[test]
    fn test_one_hot_unknown_item() {
        let db = scenario();
        let miner = Miner::new(&db, vec![], MiningConfig::default()).unwrap();
        let flags = miner.one_hot(&[Pattern::new(["A", "Z"], 0)]);
        assert!(flags.iter().all(|row| !row[0]));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let db = scenario();
        let constraints = vec![Constraint::sum("price").at_most(10.0)];
        let config = MiningConfig::exhaustive().with_min_frequency(MinFrequency::Count(1));
        let parallel = Miner::new(&db, constraints.clone(), config.clone())
            .unwrap()
            .mine()
            .unwrap();
        let sequential = Miner::new(&db, constraints, config.sequential())
            .unwrap()
            .mine()
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_validation_errors() {
        let db = scenario();
        assert!(matches!(
            Miner::new(&db, vec![Constraint::average("weight").at_least(1.0)], MiningConfig::default()),
            Err(MiningError::Constraint(_))
        ));
        assert!(matches!(
            Miner::new(&db, vec![Constraint::average("price")], MiningConfig::default()),
            Err(MiningError::Constraint(_))
        ));
        assert!(matches!(
            Miner::new(
                &db,
                vec![],
                MiningConfig::default().with_min_frequency(MinFrequency::Count(4))
            ),
            Err(MiningError::Configuration(_))
        ));

        let empty = SequenceDatabase::new(Vec::<Vec<&str>>::new());
        assert!(matches!(
            Miner::new(&empty, vec![], MiningConfig::default()),
            Err(MiningError::EmptyInput)
        ));
    }

    #[test]
    fn test_cancelled_token() {
        let db = scenario();
        let miner = Miner::new(&db, vec![], MiningConfig::default()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(miner.mine_with(&token), Err(MiningError::Cancelled));
    }
}
