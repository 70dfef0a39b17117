//! Mutation bridge: initial sweep plus incremental updates
//!
//! The bridge subscribes to change records on an observed root and turns each
//! batch into scanner sweeps (inserted elements) and direct annotator calls
//! (inserted or edited text nodes).
//!
//! The subscription is never suspended. The annotator's own writes show up in
//! later batches like any other change. Marker spans are recognised by the
//! highlight class and processed attribute. The plain runs beside them are
//! looked at once more, find no dash, and are left alone.

use anyhow::Result;

use crate::annotator::{Annotator, Outcome};
use crate::config::Config;
use crate::dom::{Document, MutationRecord, NodeId, ObserveOptions};
use crate::scanner::TextWalker;

/// Upper bound on batches drained by one [`MutationBridge::pump`] call
const MAX_ROUNDS: usize = 64;

/// Counters for one sweep, batch or pump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub batches: usize,
    pub records: usize,
    /// Sweeps started at an inserted element (or the initial root)
    pub sweeps: usize,
    /// Text nodes handed to the annotator
    pub visited: usize,
    /// Annotations that produced a highlight
    pub highlighted: usize,
    /// Marker spans created
    pub markers: usize,
    /// Inserted elements ignored because they are our own markers
    pub own_writes: usize,
    pub failed: usize,
}

impl BridgeStats {
    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: BridgeStats) {
        self.batches += other.batches;
        self.records += other.records;
        self.sweeps += other.sweeps;
        self.visited += other.visited;
        self.highlighted += other.highlighted;
        self.markers += other.markers;
        self.own_writes += other.own_writes;
        self.failed += other.failed;
    }

    fn count(&mut self, outcome: &Outcome) {
        self.visited += 1;
        match outcome {
            Outcome::Wrapped { markers } => {
                self.highlighted += 1;
                self.markers += markers.len();
            }
            Outcome::BlockMarked { .. } => self.highlighted += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped | Outcome::NoMatch | Outcome::NoBlock => {}
        }
    }
}

pub struct MutationBridge {
    annotator: Annotator,
    observe_character_data: bool,
    root: Option<NodeId>,
}

impl MutationBridge {
    pub fn new(annotator: Annotator, observe_character_data: bool) -> Self {
        Self {
            annotator,
            observe_character_data,
            root: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Annotator::new(config)?,
            config.observe_character_data,
        ))
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// The observed root, once started
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Sweep everything under `root`, then subscribe to changes beneath it
    pub fn start(&mut self, doc: &mut Document, root: NodeId) -> BridgeStats {
        self.root = Some(root);
        self.annotator.set_boundary(root);

        let stats = self.sweep(doc, root);
        doc.observe(
            root,
            ObserveOptions {
                child_list: true,
                subtree: true,
                character_data: self.observe_character_data,
            },
        );
        log::info!(
            "initial sweep visited {} text node(s), highlighted {}",
            stats.visited,
            stats.highlighted
        );
        stats
    }

    /// Annotate every eligible text node under `root`
    pub fn sweep(&mut self, doc: &mut Document, root: NodeId) -> BridgeStats {
        let mut stats = BridgeStats {
            sweeps: 1,
            ..Default::default()
        };
        let mut walker = TextWalker::new(doc, root, self.annotator.policy());
        while let Some(text) =
            walker.next_text(doc, self.annotator.policy(), Some(self.annotator.processed()))
        {
            let outcome = self.annotator.annotate(doc, text);
            stats.count(&outcome);
        }
        stats
    }

    /// Handle one batch of change records, in the order given
    pub fn handle_batch(&mut self, doc: &mut Document, records: Vec<MutationRecord>) -> BridgeStats {
        let mut stats = BridgeStats {
            batches: 1,
            records: records.len(),
            ..Default::default()
        };

        for record in records {
            match record {
                MutationRecord::ChildList { added, .. } => {
                    for node in added {
                        stats.merge(self.handle_added(doc, node));
                    }
                }
                MutationRecord::CharacterData { target } => {
                    if self.observe_character_data && doc.is_text(target) {
                        let outcome = self.annotator.annotate(doc, target);
                        stats.count(&outcome);
                    }
                }
            }
        }
        stats
    }

    fn handle_added(&mut self, doc: &mut Document, node: NodeId) -> BridgeStats {
        let mut stats = BridgeStats::default();

        // Added and removed again before this batch was delivered
        if let Some(root) = self.root {
            if !doc.is_inclusive_descendant(node, root) {
                log::trace!("inserted node {node} has since left the observed tree");
                return stats;
            }
        }

        if doc.is_element(node) {
            if self.annotator.policy().is_marked_element(doc, node) {
                stats.own_writes += 1;
                return stats;
            }
            stats.merge(self.sweep(doc, node));
        } else if doc.is_text(node) {
            let outcome = self.annotator.annotate(doc, node);
            stats.count(&outcome);
        }
        stats
    }

    /// Deliver queued records batch by batch until the queue stays empty
    ///
    /// Writes made while handling a batch are queued and handled in the next
    /// one, so this normally settles after two rounds.
    pub fn pump(&mut self, doc: &mut Document) -> BridgeStats {
        let mut stats = BridgeStats::default();
        for _ in 0..MAX_ROUNDS {
            let records = doc.take_records();
            if records.is_empty() {
                return stats;
            }
            stats.merge(self.handle_batch(doc, records));
        }
        log::warn!(
            "mutation queue still busy after {MAX_ROUNDS} rounds, {} record(s) left pending",
            doc.pending_records()
        );
        stats
    }
}
