//! PPTT Node Indexer.
//!
//! Maps every topology node (processor hierarchy node or cache node) to its
//! byte offset in the generated table, and keeps the bookkeeping needed to
//! walk the topology for cycle detection.
//!
//! The indexer is a single contiguous allocation sized up front. Processor
//! nodes are indexed first, cache nodes second; links between nodes are
//! stored as indices into the same array.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use core::ops::Range;

use alloc::vec::Vec;

use crate::cm_object::{CacheInfo, CmObjectToken, ProcHierarchyInfo};
use crate::error::{PpttError, PpttResult};

/// Location of the object an indexer entry was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeRef {
    /// Index into the processor hierarchy node list.
    Processor(usize),
    /// Index into the cache node list.
    Cache(usize),
}

/// A Configuration Manager object that becomes a PPTT structure.
pub(crate) trait TopologyNode {
    fn token(&self) -> CmObjectToken;
    fn node_ref(index: usize) -> NodeRef;
}

impl TopologyNode for ProcHierarchyInfo {
    fn token(&self) -> CmObjectToken {
        self.token
    }

    fn node_ref(index: usize) -> NodeRef {
        NodeRef::Processor(index)
    }
}

impl TopologyNode for CacheInfo {
    fn token(&self) -> CmObjectToken {
        self.token
    }

    fn node_ref(index: usize) -> NodeRef {
        NodeRef::Cache(index)
    }
}

/// One entry of the node indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PpttNodeIndexer {
    pub(crate) token: CmObjectToken,
    pub(crate) object: NodeRef,
    /// Offset of the structure from the start of the table.
    pub(crate) offset: u32,
    pub(crate) cycle_detection_stamp: u32,
    /// Index of the resolved parent or next level of cache node.
    pub(crate) topology_parent: Option<usize>,
}

/// The indexer entries and total size of one class of nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct IndexedRange {
    pub(crate) start: usize,
    pub(crate) count: usize,
    /// Cumulative serialized size of the nodes in this range.
    pub(crate) size: u32,
}

impl IndexedRange {
    pub(crate) fn indices(&self) -> Range<usize> {
        self.start..self.start + self.count
    }

    /// Position within its own node list of the node at indexer entry `index`.
    pub(crate) fn position(&self, index: usize) -> usize {
        index - self.start
    }
}

#[derive(Debug)]
pub(crate) struct NodeIndexer {
    nodes: Vec<PpttNodeIndexer>,
    capacity: usize,
}

impl NodeIndexer {
    /// Allocates an indexer for exactly `capacity` nodes.
    pub(crate) fn with_capacity(capacity: usize) -> PpttResult<Self> {
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(capacity).map_err(|_| {
            log::error!("PPTT: Failed to allocate the node indexer for {capacity} nodes.");
            PpttError::AllocationFailed
        })?;
        Ok(Self { nodes, capacity })
    }

    /// Indexes `nodes` in order, placing the first one at `start_offset`.
    ///
    /// `size_fn` returns the serialized size of a node. Each node is assigned the offset following the previous one.
    pub(crate) fn index_nodes<T, F>(&mut self, nodes: &[T], start_offset: u32, size_fn: F) -> PpttResult<IndexedRange>
    where
        T: TopologyNode,
        F: Fn(&T) -> PpttResult<u32>,
    {
        let start = self.nodes.len();
        if nodes.len() > self.capacity - start {
            log::error!(
                "PPTT: Node indexer overflow. capacity = {}, required = {}",
                self.capacity,
                start + nodes.len()
            );
            return Err(PpttError::BufferOverflow { index: start + nodes.len(), len: self.capacity });
        }

        let mut size: u32 = 0;
        for (index, node) in nodes.iter().enumerate() {
            let offset = start_offset.checked_add(size).ok_or(PpttError::TableTooLarge)?;
            self.nodes.push(PpttNodeIndexer {
                token: node.token(),
                object: T::node_ref(index),
                offset,
                cycle_detection_stamp: 0,
                topology_parent: None,
            });
            size = size.checked_add(size_fn(node)?).ok_or(PpttError::TableTooLarge)?;
        }

        Ok(IndexedRange { start, count: nodes.len(), size })
    }

    pub(crate) fn get(&self, index: usize) -> &PpttNodeIndexer {
        &self.nodes[index]
    }

    /// Finds the indexer entry for `token` within `range`.
    ///
    /// Tokens are unique, so the first match is the only one.
    pub(crate) fn resolve(&self, range: &IndexedRange, token: CmObjectToken) -> PpttResult<usize> {
        self.nodes[range.indices()]
            .iter()
            .position(|node| node.token == token)
            .map(|position| range.start + position)
            .ok_or(PpttError::TokenNotFound { token })
    }

    /// Records `parent` as the topology parent of the node at `index`.
    pub(crate) fn set_topology_parent(&mut self, index: usize, parent: usize) {
        debug_assert!(self.nodes[index].topology_parent.is_none());
        self.nodes[index].topology_parent = Some(parent);
    }

    /// Walks the parent chain of every node and fails if a chain loops back on itself.
    ///
    /// Every walk stamps the nodes it visits with the number of walks still to go, so a node carrying the
    /// current stamp has already been seen during this walk. Stamps only ever decrease, which keeps nodes
    /// visited by earlier walks from matching.
    pub(crate) fn detect_cycles(&mut self) -> PpttResult<()> {
        let mut nodes_remaining = self.nodes.len() as u32;

        for origin in 0..self.nodes.len() {
            let mut current = Some(origin);
            while let Some(index) = current {
                let node = &mut self.nodes[index];
                if node.cycle_detection_stamp == nodes_remaining {
                    let PpttNodeIndexer { token, object, .. } = self.nodes[origin];
                    log::error!("PPTT: Cycle detected in topology starting at {object:?}, token {token}");
                    return Err(PpttError::CycleDetected { token });
                }
                node.cycle_detection_stamp = nodes_remaining;
                current = node.topology_parent;
            }
            nodes_remaining -= 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cm_object::ProcNodeFlags;
    use alloc::vec;

    fn token(value: usize) -> CmObjectToken {
        CmObjectToken::new(value).unwrap()
    }

    fn proc_nodes(tokens: &[usize]) -> Vec<ProcHierarchyInfo> {
        tokens.iter().map(|&t| ProcHierarchyInfo::new(token(t), ProcNodeFlags::empty())).collect()
    }

    fn indexer_for(tokens: &[usize]) -> (NodeIndexer, IndexedRange) {
        let nodes = proc_nodes(tokens);
        let mut indexer = NodeIndexer::with_capacity(nodes.len()).unwrap();
        let range = indexer.index_nodes(&nodes, 36, |_| Ok(20)).unwrap();
        (indexer, range)
    }

    #[test]
    fn test_index_nodes_assigns_increasing_offsets() {
        let nodes = proc_nodes(&[1, 2, 3]);
        let mut indexer = NodeIndexer::with_capacity(3).unwrap();
        let range = indexer.index_nodes(&nodes, 36, |node| Ok(20 + node.token.get() as u32 * 4)).unwrap();

        assert_eq!(range, IndexedRange { start: 0, count: 3, size: 24 + 28 + 32 });
        assert_eq!(indexer.get(0).offset, 36);
        assert_eq!(indexer.get(1).offset, 60);
        assert_eq!(indexer.get(2).offset, 88);
        assert_eq!(indexer.get(2).object, NodeRef::Processor(2));
        assert!(indexer.get(1).topology_parent.is_none());
    }

    #[test]
    fn test_index_two_classes_back_to_back() {
        let procs = proc_nodes(&[1]);
        let caches = vec![CacheInfo {
            token: token(10),
            next_level_of_cache_token: None,
            size: 0,
            number_of_sets: 0,
            associativity: 0,
            attributes: 0,
            line_size: 0,
            cache_id: 0,
        }];
        let mut indexer = NodeIndexer::with_capacity(2).unwrap();
        let proc_range = indexer.index_nodes(&procs, 36, |_| Ok(20)).unwrap();
        let cache_range = indexer.index_nodes(&caches, 36 + proc_range.size, |_| Ok(28)).unwrap();

        assert_eq!(cache_range, IndexedRange { start: 1, count: 1, size: 28 });
        assert_eq!(indexer.get(1).offset, 56);
        assert_eq!(indexer.get(1).object, NodeRef::Cache(0));
        assert_eq!(cache_range.position(1), 0);
        assert_eq!(proc_range.position(0), 0);
    }

    #[test]
    fn test_index_nodes_rejects_overflowing_capacity() {
        let nodes = proc_nodes(&[1, 2]);
        let mut indexer = NodeIndexer::with_capacity(1).unwrap();
        assert!(matches!(indexer.index_nodes(&nodes, 0, |_| Ok(20)), Err(PpttError::BufferOverflow { .. })));
    }

    #[test]
    fn test_index_nodes_propagates_size_error() {
        let nodes = proc_nodes(&[1]);
        let mut indexer = NodeIndexer::with_capacity(1).unwrap();
        let result = indexer.index_nodes(&nodes, 0, |node| {
            Err(PpttError::NodeTooLarge { token: node.token, private_resources: 100 })
        });
        assert!(matches!(result, Err(PpttError::NodeTooLarge { .. })));
    }

    #[test]
    fn test_index_nodes_rejects_table_overflow() {
        let nodes = proc_nodes(&[1, 2]);
        let mut indexer = NodeIndexer::with_capacity(2).unwrap();
        assert_eq!(indexer.index_nodes(&nodes, u32::MAX - 10, |_| Ok(20)), Err(PpttError::TableTooLarge));
    }

    #[test]
    fn test_resolve_within_range() {
        let procs = proc_nodes(&[1, 2, 3, 4]);
        let mut indexer = NodeIndexer::with_capacity(4).unwrap();
        let first = indexer.index_nodes(&procs[..2], 36, |_| Ok(20)).unwrap();
        let second = indexer.index_nodes(&procs[2..], 76, |_| Ok(20)).unwrap();

        assert_eq!(indexer.resolve(&first, token(2)), Ok(1));
        assert_eq!(indexer.resolve(&second, token(4)), Ok(3));
        assert_eq!(indexer.resolve(&second, token(1)), Err(PpttError::TokenNotFound { token: token(1) }));
        assert_eq!(indexer.resolve(&first, token(9)), Err(PpttError::TokenNotFound { token: token(9) }));
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let (mut indexer, _) = indexer_for(&[1, 2, 3, 4]);
        // 3 -> 2 -> 1, 4 -> 1
        indexer.set_topology_parent(2, 1);
        indexer.set_topology_parent(1, 0);
        indexer.set_topology_parent(3, 0);
        assert!(indexer.detect_cycles().is_ok());
    }

    #[test]
    fn test_two_node_cycle_detected() {
        let (mut indexer, _) = indexer_for(&[1, 2, 3, 4, 5]);
        // 2 <-> 4, with unrelated nodes around them.
        indexer.set_topology_parent(1, 3);
        indexer.set_topology_parent(3, 1);
        indexer.set_topology_parent(4, 0);
        assert_eq!(indexer.detect_cycles(), Err(PpttError::CycleDetected { token: token(2) }));
    }

    #[test]
    fn test_self_reference_detected() {
        let (mut indexer, _) = indexer_for(&[1, 2]);
        indexer.set_topology_parent(1, 1);
        assert_eq!(indexer.detect_cycles(), Err(PpttError::CycleDetected { token: token(2) }));
    }

    #[test]
    fn test_cycle_reached_through_tail() {
        let (mut indexer, _) = indexer_for(&[1, 2, 3]);
        // 1 -> 2 -> 3 -> 2
        indexer.set_topology_parent(0, 1);
        indexer.set_topology_parent(1, 2);
        indexer.set_topology_parent(2, 1);
        assert_eq!(indexer.detect_cycles(), Err(PpttError::CycleDetected { token: token(1) }));
    }

    #[test]
    fn test_detect_cycles_on_empty_indexer() {
        let mut indexer = NodeIndexer::with_capacity(0).unwrap();
        assert!(indexer.detect_cycles().is_ok());
    }
}
