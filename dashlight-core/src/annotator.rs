//! Per-node dash detection and marking
//!
//! The annotator looks at one text node at a time. If the text holds no dash
//! the tree is left alone. Otherwise the node is recorded as processed before
//! anything is written, then either:
//!
//! - **windowed span**: the text node is replaced, in one write, by plain
//!   text runs alternating with marker spans that each cover a window of
//!   characters around a dash, or
//! - **block mark**: the nearest block-level ancestor gets the highlight
//!   class and the text is left as it is.
//!
//! Marker spans carry the processed attribute and the highlight class, which is
//! how the mutation bridge recognises its own writes. The plain runs between
//! them hold no dash and stay open to later edits.

use std::collections::HashSet;

use anyhow::{Context, Result};

use crate::config::{Config, Strategy};
use crate::dom::{Document, NodeId};
use crate::error::DomError;
use crate::layout::{InlineStyleLayout, LayoutQuery};
use crate::pattern::{DashPattern, Match};
use crate::policy::ExclusionPolicy;
use crate::processed::ProcessedSet;

/// What a single annotate call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already processed, detached, or inside an excluded or marked region
    Skipped,
    /// Text holds no dash; the tree was not touched
    NoMatch,
    /// The text node was replaced; these are the marker spans
    Wrapped { markers: Vec<NodeId> },
    /// The highlight class was added to this block ancestor
    BlockMarked { block: NodeId },
    /// No block-level ancestor below the boundary
    NoBlock,
    /// The tree write was rejected; nothing changed
    Failed,
}

impl Outcome {
    /// Whether the tree now shows a highlight for this node
    pub fn is_highlight(&self) -> bool {
        matches!(self, Outcome::Wrapped { .. } | Outcome::BlockMarked { .. })
    }
}

/// A run of the original text, in character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub marked: bool,
}

/// Split `len` characters into plain and marked runs around `matches`
///
/// Each match gets the window `[start - radius, end + radius)` clipped to the
/// text, with its start pulled up to where the previous marker ended. When the
/// previous marker already reaches into the match, that marker grows to cover
/// the new window instead, so a match never straddles two markers. A plain run
/// is only emitted when a window starts strictly after the cursor, so touching
/// windows never leave an empty run between them.
pub fn plan_segments(len: usize, matches: &[Match], radius: usize) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;

    for m in matches {
        let end = m.end.saturating_add(radius).min(len);
        if m.start < cursor {
            // Only markers move the cursor before the trailing run
            if let Some(last) = segments.last_mut() {
                last.end = last.end.max(end);
                cursor = last.end;
            }
            continue;
        }

        let start = m.start.saturating_sub(radius).max(cursor);
        if start > cursor {
            segments.push(Segment {
                start: cursor,
                end: start,
                marked: false,
            });
        }
        segments.push(Segment {
            start,
            end,
            marked: true,
        });
        cursor = end;
    }

    if cursor < len {
        segments.push(Segment {
            start: cursor,
            end: len,
            marked: false,
        });
    }
    segments
}

pub struct Annotator {
    strategy: Strategy,
    radius: usize,
    pattern: DashPattern,
    policy: ExclusionPolicy,
    block_tags: HashSet<String>,
    layout: Box<dyn LayoutQuery>,
    processed: ProcessedSet,
    boundary: Option<NodeId>,
}

impl Annotator {
    pub fn new(config: &Config) -> Result<Self> {
        let pattern = DashPattern::new(&config.pattern).context("Failed to compile dash pattern")?;
        Ok(Self {
            strategy: config.strategy,
            radius: config.window_radius,
            pattern,
            policy: ExclusionPolicy::from_config(config),
            block_tags: config
                .block_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            layout: Box::new(InlineStyleLayout),
            processed: ProcessedSet::new(),
            boundary: None,
        })
    }

    /// Swap in a different source of computed display roles
    pub fn with_layout(mut self, layout: impl LayoutQuery + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Block search never climbs to or past this node.
    /// Without one, it stops below `<body>`, or the document root if there is none.
    pub fn set_boundary(&mut self, boundary: NodeId) {
        self.boundary = Some(boundary);
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Detect dashes in `node` and mark them. Never fails; see [`Outcome`].
    pub fn annotate(&mut self, doc: &mut Document, node: NodeId) -> Outcome {
        if self.processed.contains(node) {
            return Outcome::Skipped;
        }
        if doc.parent(node).is_none() {
            log::trace!("text node {node} is detached");
            return Outcome::Skipped;
        }
        if self.policy.inside_blocked_region(doc, node) {
            log::trace!("text node {node} is inside an excluded or marked region");
            return Outcome::Skipped;
        }

        // Anything that is not a text node has no dashes to find
        let Some(text) = doc.text(node) else {
            return Outcome::NoMatch;
        };
        let matches = self.pattern.find(text);
        if matches.is_empty() {
            return Outcome::NoMatch;
        }

        // Recorded before the write so a notification it triggers finds it done
        self.processed.insert(node);

        match self.strategy {
            Strategy::WindowedSpan => self.wrap_windows(doc, node, &matches),
            Strategy::BlockMark => self.mark_block(doc, node),
        }
    }

    fn wrap_windows(&self, doc: &mut Document, node: NodeId, matches: &[Match]) -> Outcome {
        let Some(text) = doc.text(node).map(str::to_string) else {
            return Outcome::NoMatch;
        };
        let len = text.chars().count();
        let segments = plan_segments(len, matches, self.radius);

        let result = self
            .build_runs(doc, &text, &segments)
            .and_then(|(runs, markers)| doc.replace_with(node, &runs).map(|()| markers));

        match result {
            Ok(markers) => {
                log::debug!(
                    "wrapped {} dash(es) in text node {node} with {} marker(s)",
                    matches.len(),
                    markers.len()
                );
                Outcome::Wrapped { markers }
            }
            Err(e) => {
                log::debug!("could not annotate text node {node}: {e}");
                Outcome::Failed
            }
        }
    }

    /// Create the detached replacement nodes; returns (all runs, marker spans)
    fn build_runs(
        &self,
        doc: &mut Document,
        text: &str,
        segments: &[Segment],
    ) -> Result<(Vec<NodeId>, Vec<NodeId>), DomError> {
        // Byte offset of every char boundary, so char ranges slice directly
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        let mut runs = Vec::with_capacity(segments.len());
        let mut markers = Vec::new();
        for segment in segments {
            let slice = &text[offsets[segment.start]..offsets[segment.end]];
            let run_text = doc.create_text(slice);

            if segment.marked {
                let span = doc.create_element("span");
                doc.set_attribute(span, "class", self.policy.highlight_class())?;
                doc.set_attribute(span, self.policy.processed_attribute(), "true")?;
                doc.append_child(span, run_text)?;
                runs.push(span);
                markers.push(span);
            } else {
                runs.push(run_text);
            }
        }
        Ok((runs, markers))
    }

    fn mark_block(&mut self, doc: &mut Document, node: NodeId) -> Outcome {
        let boundary = self
            .boundary
            .or_else(|| doc.body())
            .unwrap_or_else(|| doc.root());

        let Some(block) = self.find_block(doc, node, boundary) else {
            log::trace!("no block ancestor for text node {node}");
            return Outcome::NoBlock;
        };
        if !self.processed.insert(block) {
            return Outcome::Skipped;
        }

        match doc.add_class(block, self.policy.highlight_class()) {
            Ok(()) => {
                log::debug!("marked block {block} for text node {node}");
                Outcome::BlockMarked { block }
            }
            Err(e) => {
                log::debug!("could not mark block {block}: {e}");
                Outcome::Failed
            }
        }
    }

    /// Nearest ancestor that is block-level by tag or by computed display
    fn find_block(&self, doc: &Document, node: NodeId, boundary: NodeId) -> Option<NodeId> {
        doc.ancestors(node)
            .take_while(|&a| a != boundary)
            .filter(|&a| doc.is_element(a))
            .find(|&a| {
                doc.tag(a).is_some_and(|t| self.block_tags.contains(t))
                    || self.layout.display(doc, a).is_block_like()
            })
    }
}
