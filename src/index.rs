//! Height-balanced spatial index of bounding rectangles.
//!
//! The tree lives in an arena of nodes addressed by integer handles; each
//! node is exclusively owned by its parent's child list and the tree holds
//! a single root handle. A node is either a leaf (entity references plus
//! their point rectangles) or an internal node (child handles plus child
//! rectangles); every rectangle tightly encloses its subtree and all leaves
//! sit at the same depth.
//!
//! Bulk construction packs entities along a Hilbert curve and builds the
//! tree bottom-up, which gives much better node occupancy than repeated
//! single insertion for a dataset that is known upfront. Incremental
//! insertion follows the classic least-enlargement descent with quadratic
//! splits and is primarily useful for trickling late records into an
//! already-built index.

use crate::error::{GeoRankError, Result};
use crate::spatial::{Rect, validate_point};
use crate::store::EntityStore;
use crate::types::{Config, Entity, EntityId};
use geo::Point;
use smallvec::SmallVec;

type NodeId = usize;

/// Inline capacity for node entry lists; nodes configured with a larger
/// `max_node_entries` spill to the heap.
const INLINE_ENTRIES: usize = 16;

const HILBERT_ORDER: u32 = 16;
const HILBERT_SIDE: u32 = 1 << HILBERT_ORDER;

#[derive(Debug, Clone, Copy)]
struct EntityEntry {
    id: EntityId,
    pos: Point,
}

impl EntityEntry {
    fn rect(&self) -> Rect {
        Rect::from_point(self.pos)
    }
}

#[derive(Debug, Clone, Copy)]
struct ChildEntry {
    rect: Rect,
    node: NodeId,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        rect: Rect,
        entries: SmallVec<[EntityEntry; INLINE_ENTRIES]>,
    },
    Internal {
        rect: Rect,
        children: SmallVec<[ChildEntry; INLINE_ENTRIES]>,
    },
}

impl Node {
    fn rect(&self) -> Rect {
        match self {
            Node::Leaf { rect, .. } | Node::Internal { rect, .. } => *rect,
        }
    }

    fn entry_count(&self) -> usize {
        match self {
            Node::Leaf { entries, .. } => entries.len(),
            Node::Internal { children, .. } => children.len(),
        }
    }
}

/// R-tree over entity coordinates.
///
/// Built once per dataset version and read-only thereafter; queries take
/// `&self` and are safe to run concurrently. Rebuilding for a new dataset
/// constructs a fresh index rather than mutating this one in place.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /// Number of levels: 0 when empty, 1 when the root is a leaf.
    height: usize,
    len: usize,
    max_entries: usize,
    min_entries: usize,
}

impl SpatialIndex {
    /// Create an empty index ready for incremental insertion.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate().map_err(GeoRankError::InvalidInput)?;
        Ok(Self {
            nodes: Vec::new(),
            root: None,
            height: 0,
            len: 0,
            max_entries: config.max_node_entries,
            min_entries: config.min_node_entries,
        })
    }

    /// Bulk-load an index from every entity in the store.
    ///
    /// Entities are ordered along a Hilbert curve over the dataset bounds,
    /// packed into full leaves, and the upper levels are grouped bottom-up
    /// from the leaf rectangles. The tail of every level is rebalanced
    /// against its neighbor so no node drops below the minimum fill.
    ///
    /// An empty store yields a valid empty index.
    pub fn bulk_load(store: &EntityStore, config: &Config) -> Result<Self> {
        let mut index = Self::new(config)?;
        if store.is_empty() {
            return Ok(index);
        }

        let mut entries: Vec<EntityEntry> = store
            .iter()
            .map(|entity| EntityEntry {
                id: entity.id,
                pos: entity.position(),
            })
            .collect();

        let mut bounds = Rect::empty();
        for entry in &entries {
            bounds.expand_to_point(entry.pos);
        }

        // The id in the sort key makes the packing independent of input
        // order, so identical datasets always produce identical trees.
        entries.sort_by_key(|entry| (hilbert_position(&bounds, entry.pos), entry.id));

        index.len = entries.len();

        // Pack leaves.
        let mut level: Vec<NodeId> = Vec::new();
        let mut offset = 0;
        for size in partition_sizes(entries.len(), index.max_entries, index.min_entries) {
            let group: SmallVec<[EntityEntry; INLINE_ENTRIES]> =
                entries[offset..offset + size].iter().copied().collect();
            offset += size;
            let rect = entries_rect(&group);
            level.push(index.alloc(Node::Leaf {
                rect,
                entries: group,
            }));
        }
        index.height = 1;

        // Group upward until a single root remains.
        while level.len() > 1 {
            let mut parents: Vec<NodeId> = Vec::new();
            let mut offset = 0;
            for size in partition_sizes(level.len(), index.max_entries, index.min_entries) {
                let children: SmallVec<[ChildEntry; INLINE_ENTRIES]> = level
                    [offset..offset + size]
                    .iter()
                    .map(|&node| ChildEntry {
                        rect: index.nodes[node].rect(),
                        node,
                    })
                    .collect();
                offset += size;
                let rect = children_rect(&children);
                parents.push(index.alloc(Node::Internal { rect, children }));
            }
            level = parents;
            index.height += 1;
        }

        index.root = Some(level[0]);

        log::debug!(
            "bulk-loaded spatial index: {} entities, height {}, {} nodes",
            index.len,
            index.height,
            index.nodes.len()
        );

        Ok(index)
    }

    /// Insert a single entity.
    ///
    /// Descends by least area enlargement (ties: smaller area, then fewer
    /// entries), splits overflowing nodes with the quadratic heuristic, and
    /// propagates splits upward; a root split grows the tree by one level.
    pub fn insert(&mut self, entity: &Entity) -> Result<()> {
        validate_point(&entity.position())?;

        let entry = EntityEntry {
            id: entity.id,
            pos: entity.position(),
        };

        match self.root {
            None => {
                let rect = entry.rect();
                let mut entries = SmallVec::new();
                entries.push(entry);
                let root = self.alloc(Node::Leaf { rect, entries });
                self.root = Some(root);
                self.height = 1;
            }
            Some(root) => {
                if let Some(sibling) = self.insert_rec(root, entry) {
                    let left = ChildEntry {
                        rect: self.nodes[root].rect(),
                        node: root,
                    };
                    let right = ChildEntry {
                        rect: self.nodes[sibling].rect(),
                        node: sibling,
                    };
                    let rect = left.rect.union(&right.rect);
                    let mut children = SmallVec::new();
                    children.push(left);
                    children.push(right);
                    let new_root = self.alloc(Node::Internal { rect, children });
                    self.root = Some(new_root);
                    self.height += 1;
                }
            }
        }

        self.len += 1;
        Ok(())
    }

    /// Lazily iterate ids of entities positioned inside `rect`.
    ///
    /// The traversal only descends into children whose rectangle intersects
    /// the query rectangle; any subtree outside the search region is
    /// skipped without visiting its entities.
    pub fn query_within(&self, rect: &Rect) -> RectQuery<'_> {
        RectQuery {
            index: self,
            rect: *rect,
            stack: self.root.into_iter().collect(),
            matched: Vec::new(),
        }
    }

    /// Lazily iterate every entity id in the index (full-scan fallback).
    pub fn iter(&self) -> IndexIter<'_> {
        IndexIter {
            index: self,
            stack: self.root.into_iter().collect(),
            matched: Vec::new(),
        }
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tree height: 0 when empty, 1 when the root is a leaf.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bounding rectangle of the whole dataset, if any.
    pub fn bounds(&self) -> Option<Rect> {
        self.root.map(|root| self.nodes[root].rect())
    }

    /// Verify every structural invariant of the tree.
    ///
    /// Checks fill bounds, tight enclosure, child-rectangle consistency,
    /// uniform leaf depth, and the entity count. A violation means the
    /// construction or split logic is buggy and query pruning can no longer
    /// be trusted, so the error is fatal for this instance: rebuild instead
    /// of attempting repair.
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.len != 0 || self.height != 0 {
                return Err(GeoRankError::StructuralInvariant(format!(
                    "empty tree reports len {} and height {}",
                    self.len, self.height
                )));
            }
            return Ok(());
        };

        let mut seen = 0usize;
        self.check_node(root, self.height, true, &mut seen)?;

        if seen != self.len {
            return Err(GeoRankError::StructuralInvariant(format!(
                "tree holds {} entities but len reports {}",
                seen, self.len
            )));
        }

        Ok(())
    }

    fn check_node(
        &self,
        node_id: NodeId,
        expected_height: usize,
        is_root: bool,
        seen: &mut usize,
    ) -> Result<()> {
        match &self.nodes[node_id] {
            Node::Leaf { rect, entries } => {
                if expected_height != 1 {
                    return Err(GeoRankError::StructuralInvariant(format!(
                        "leaf {} found at height {}, leaves must share one depth",
                        node_id, expected_height
                    )));
                }
                if entries.is_empty()
                    || entries.len() > self.max_entries
                    || (!is_root && entries.len() < self.min_entries)
                {
                    return Err(GeoRankError::StructuralInvariant(format!(
                        "leaf {} holds {} entries, outside [{}, {}]",
                        node_id,
                        entries.len(),
                        self.min_entries,
                        self.max_entries
                    )));
                }
                let tight = entries_rect(entries);
                if tight != *rect {
                    return Err(GeoRankError::StructuralInvariant(format!(
                        "leaf {} rectangle does not enclose its entries tightly",
                        node_id
                    )));
                }
                *seen += entries.len();
            }
            Node::Internal { rect, children } => {
                if expected_height < 2 {
                    return Err(GeoRankError::StructuralInvariant(format!(
                        "internal node {} found below leaf level",
                        node_id
                    )));
                }
                let min = if is_root { 2 } else { self.min_entries };
                if children.len() < min || children.len() > self.max_entries {
                    return Err(GeoRankError::StructuralInvariant(format!(
                        "internal node {} holds {} children, outside [{}, {}]",
                        node_id,
                        children.len(),
                        min,
                        self.max_entries
                    )));
                }
                let tight = children_rect(children);
                if tight != *rect {
                    return Err(GeoRankError::StructuralInvariant(format!(
                        "internal node {} rectangle does not enclose its children tightly",
                        node_id
                    )));
                }
                for child in children {
                    if self.nodes[child.node].rect() != child.rect {
                        return Err(GeoRankError::StructuralInvariant(format!(
                            "stale child rectangle for node {} in parent {}",
                            child.node, node_id
                        )));
                    }
                    self.check_node(child.node, expected_height - 1, false, seen)?;
                }
            }
        }
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    fn insert_rec(&mut self, node_id: NodeId, entry: EntityEntry) -> Option<NodeId> {
        let entry_rect = entry.rect();

        let descend = match &self.nodes[node_id] {
            Node::Leaf { .. } => None,
            Node::Internal { children, .. } => Some(self.choose_subtree(children, &entry_rect)),
        };

        let Some(child_idx) = descend else {
            let max_entries = self.max_entries;
            let Node::Leaf { rect, entries } = &mut self.nodes[node_id] else {
                unreachable!()
            };
            entries.push(entry);
            rect.expand_to(&entry_rect);
            if entries.len() > max_entries {
                return Some(self.split_leaf(node_id));
            }
            return None;
        };

        let child_id = match &self.nodes[node_id] {
            Node::Internal { children, .. } => children[child_idx].node,
            Node::Leaf { .. } => unreachable!(),
        };

        let split = self.insert_rec(child_id, entry);

        let child_rect = self.nodes[child_id].rect();
        let new_child = split.map(|sibling| ChildEntry {
            rect: self.nodes[sibling].rect(),
            node: sibling,
        });

        let max_entries = self.max_entries;
        let Node::Internal { rect, children } = &mut self.nodes[node_id] else {
            unreachable!()
        };
        children[child_idx].rect = child_rect;
        if let Some(new_child) = new_child {
            children.push(new_child);
        }
        *rect = children_rect(children);
        if children.len() > max_entries {
            return Some(self.split_internal(node_id));
        }
        None
    }

    /// Pick the child whose rectangle needs the least area enlargement to
    /// absorb `rect`; ties fall to the smaller existing area, then to the
    /// node with fewer entries.
    fn choose_subtree(&self, children: &[ChildEntry], rect: &Rect) -> usize {
        let mut best = 0;
        let mut best_enlargement = children[0].rect.enlargement(rect);
        let mut best_area = children[0].rect.area();

        for (idx, child) in children.iter().enumerate().skip(1) {
            let enlargement = child.rect.enlargement(rect);
            let area = child.rect.area();
            let better = enlargement < best_enlargement
                || (enlargement == best_enlargement
                    && (area < best_area
                        || (area == best_area
                            && self.nodes[child.node].entry_count()
                                < self.nodes[children[best].node].entry_count())));
            if better {
                best = idx;
                best_enlargement = enlargement;
                best_area = area;
            }
        }

        best
    }

    fn split_leaf(&mut self, node_id: NodeId) -> NodeId {
        let min_entries = self.min_entries;
        let entries = match &mut self.nodes[node_id] {
            Node::Leaf { entries, .. } => std::mem::take(entries),
            Node::Internal { .. } => unreachable!(),
        };

        let (left, right) =
            quadratic_partition(entries.into_vec(), EntityEntry::rect, min_entries);

        let left: SmallVec<[EntityEntry; INLINE_ENTRIES]> = SmallVec::from_vec(left);
        let right: SmallVec<[EntityEntry; INLINE_ENTRIES]> = SmallVec::from_vec(right);

        self.nodes[node_id] = Node::Leaf {
            rect: entries_rect(&left),
            entries: left,
        };
        let rect = entries_rect(&right);
        self.alloc(Node::Leaf {
            rect,
            entries: right,
        })
    }

    fn split_internal(&mut self, node_id: NodeId) -> NodeId {
        let min_entries = self.min_entries;
        let children = match &mut self.nodes[node_id] {
            Node::Internal { children, .. } => std::mem::take(children),
            Node::Leaf { .. } => unreachable!(),
        };

        let (left, right) =
            quadratic_partition(children.into_vec(), |child: &ChildEntry| child.rect, min_entries);

        let left: SmallVec<[ChildEntry; INLINE_ENTRIES]> = SmallVec::from_vec(left);
        let right: SmallVec<[ChildEntry; INLINE_ENTRIES]> = SmallVec::from_vec(right);

        self.nodes[node_id] = Node::Internal {
            rect: children_rect(&left),
            children: left,
        };
        let rect = children_rect(&right);
        self.alloc(Node::Internal {
            rect,
            children: right,
        })
    }
}

/// Lazy range query over the index.
pub struct RectQuery<'a> {
    index: &'a SpatialIndex,
    rect: Rect,
    stack: Vec<NodeId>,
    matched: Vec<EntityId>,
}

impl Iterator for RectQuery<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        loop {
            if let Some(id) = self.matched.pop() {
                return Some(id);
            }
            let node_id = self.stack.pop()?;
            let rect = self.rect;
            match &self.index.nodes[node_id] {
                Node::Leaf { entries, .. } => {
                    self.matched.extend(
                        entries
                            .iter()
                            .filter(|entry| rect.contains_point(entry.pos))
                            .map(|entry| entry.id),
                    );
                }
                Node::Internal { children, .. } => {
                    self.stack.extend(
                        children
                            .iter()
                            .filter(|child| child.rect.intersects(&rect))
                            .map(|child| child.node),
                    );
                }
            }
        }
    }
}

/// Lazy full scan over the index.
pub struct IndexIter<'a> {
    index: &'a SpatialIndex,
    stack: Vec<NodeId>,
    matched: Vec<EntityId>,
}

impl Iterator for IndexIter<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        loop {
            if let Some(id) = self.matched.pop() {
                return Some(id);
            }
            let node_id = self.stack.pop()?;
            match &self.index.nodes[node_id] {
                Node::Leaf { entries, .. } => {
                    self.matched.extend(entries.iter().map(|entry| entry.id));
                }
                Node::Internal { children, .. } => {
                    self.stack.extend(children.iter().map(|child| child.node));
                }
            }
        }
    }
}

fn entries_rect(entries: &[EntityEntry]) -> Rect {
    entries
        .iter()
        .fold(Rect::empty(), |acc, entry| acc.union(&entry.rect()))
}

fn children_rect(children: &[ChildEntry]) -> Rect {
    children
        .iter()
        .fold(Rect::empty(), |acc, child| acc.union(&child.rect))
}

/// Split `n` ordered items into groups of at most `max`, rebalancing the
/// tail against its neighbor so every group holds at least `min` (callers
/// guarantee `min <= max / 2`; a single undersized group is allowed when
/// `n <= max` because it will become the root).
fn partition_sizes(n: usize, max: usize, min: usize) -> Vec<usize> {
    if n <= max {
        return vec![n];
    }

    let full = n / max;
    let remainder = n % max;

    let mut sizes = vec![max; full];
    if remainder > 0 {
        if remainder < min {
            let tail = max + remainder;
            sizes.pop();
            sizes.push(tail / 2);
            sizes.push(tail - tail / 2);
        } else {
            sizes.push(remainder);
        }
    }
    sizes
}

/// Quadratic split: seed two groups with the pair of items whose combined
/// rectangle wastes the most area, then assign the rest one at a time to
/// the group whose rectangle grows least (ties: smaller area, then fewer
/// items), force-assigning once a group needs every remaining item to
/// reach the minimum fill.
fn quadratic_partition<T, F>(items: Vec<T>, rect_of: F, min_fill: usize) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> Rect,
{
    debug_assert!(items.len() >= 2);

    let mut seed_a = 0;
    let mut seed_b = 1;
    let mut worst_waste = f64::NEG_INFINITY;
    for i in 0..items.len() {
        let rect_i = rect_of(&items[i]);
        for j in (i + 1)..items.len() {
            let rect_j = rect_of(&items[j]);
            let waste = rect_i.union(&rect_j).area() - rect_i.area() - rect_j.area();
            if waste > worst_waste {
                worst_waste = waste;
                seed_a = i;
                seed_b = j;
            }
        }
    }

    let mut remaining = items;
    // Remove the higher index first so the lower one stays valid.
    let item_b = remaining.remove(seed_b);
    let item_a = remaining.remove(seed_a);

    let mut rect_a = rect_of(&item_a);
    let mut rect_b = rect_of(&item_b);
    let mut group_a = vec![item_a];
    let mut group_b = vec![item_b];

    while let Some(item) = remaining.pop() {
        let left_to_place = remaining.len() + 1;

        if group_a.len() + left_to_place <= min_fill {
            rect_a.expand_to(&rect_of(&item));
            group_a.push(item);
            continue;
        }
        if group_b.len() + left_to_place <= min_fill {
            rect_b.expand_to(&rect_of(&item));
            group_b.push(item);
            continue;
        }

        let rect = rect_of(&item);
        let grow_a = rect_a.enlargement(&rect);
        let grow_b = rect_b.enlargement(&rect);
        let to_a = grow_a < grow_b
            || (grow_a == grow_b
                && (rect_a.area() < rect_b.area()
                    || (rect_a.area() == rect_b.area() && group_a.len() <= group_b.len())));

        if to_a {
            rect_a.expand_to(&rect);
            group_a.push(item);
        } else {
            rect_b.expand_to(&rect);
            group_b.push(item);
        }
    }

    (group_a, group_b)
}

/// Map a point onto the Hilbert curve over the dataset bounds.
///
/// Coordinates are quantized to a 2^16 x 2^16 grid; a degenerate axis
/// (all entities on one meridian or parallel) collapses to cell 0 on that
/// axis, which leaves a plain sorted order along the other axis.
fn hilbert_position(bounds: &Rect, point: Point) -> u64 {
    let width = bounds.max_lon - bounds.min_lon;
    let height = bounds.max_lat - bounds.min_lat;
    let scale = (HILBERT_SIDE - 1) as f64;

    let x = if width > 0.0 {
        (((point.x() - bounds.min_lon) / width) * scale) as u32
    } else {
        0
    };
    let y = if height > 0.0 {
        (((point.y() - bounds.min_lat) / height) * scale) as u32
    } else {
        0
    };

    hilbert_index(x.min(HILBERT_SIDE - 1), y.min(HILBERT_SIDE - 1))
}

/// Hilbert curve index of a grid cell (the classic iterative rotate-and-
/// accumulate formulation).
fn hilbert_index(mut x: u32, mut y: u32) -> u64 {
    let mut d: u64 = 0;
    let mut s = HILBERT_SIDE / 2;

    while s > 0 {
        let rx = u32::from(x & s > 0);
        let ry = u32::from(y & s > 0);
        d += u64::from(s) * u64::from(s) * u64::from((3 * rx) ^ ry);

        // Rotate the quadrant so the curve stays contiguous.
        if ry == 0 {
            if rx == 1 {
                x = HILBERT_SIDE - 1 - x;
                y = HILBERT_SIDE - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }

    d
}
