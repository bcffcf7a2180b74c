//! Node Store - the arena that owns every node of one tree.

use super::node::{Node, NodeId};
use crate::common::{Error, Result};

/// Slot arena with a free list.
///
/// Nodes refer to each other only through [`NodeId`]s handed out here.
/// Released slots are recycled before the arena grows, which bounds memory
/// by the peak number of live nodes.
#[derive(Debug, Default)]
pub(crate) struct NodeStore {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
    live: usize,
    max_nodes: Option<usize>,
}

impl NodeStore {
    pub(crate) fn new(max_nodes: Option<usize>) -> Self {
        Self {
            max_nodes,
            ..Self::default()
        }
    }

    /// Number of live nodes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Guarantee that the next `additional` allocations succeed.
    ///
    /// # Errors
    /// `Error::AllocationFailure` if the node budget or the allocator can't
    /// cover the request. Nothing is modified in that case.
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<()> {
        if let Some(max) = self.max_nodes {
            if self.live + additional > max {
                return Err(Error::AllocationFailure(format!(
                    "need {} more nodes, {} of {} in use",
                    additional, self.live, max
                )));
            }
        }

        let fresh = additional.saturating_sub(self.free.len());
        self.slots
            .try_reserve(fresh)
            .map_err(|e| Error::AllocationFailure(e.to_string()))?;
        if self.slots.len() + fresh > u32::MAX as usize {
            return Err(Error::AllocationFailure("node handle space exhausted".into()));
        }
        Ok(())
    }

    /// Take ownership of `node` and return its handle.
    pub(crate) fn allocate(&mut self, node: Node) -> Result<NodeId> {
        self.reserve(1)?;

        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(node);
                id
            }
            None => {
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Some(node));
                id
            }
        };
        self.live += 1;
        Ok(id)
    }

    /// Remove a node from the arena and hand it back.
    pub(crate) fn release(&mut self, id: NodeId) -> Result<Node> {
        let node = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| Error::invariant(format!("release of dead handle {}", id)))?;
        self.free.push(id);
        self.live -= 1;
        Ok(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::invariant(format!("dangling handle {}", id)))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::invariant(format!("dangling handle {}", id)))
    }

    /// Borrow two distinct nodes mutably at once.
    pub(crate) fn pair_mut(&mut self, a: NodeId, b: NodeId) -> Result<(&mut Node, &mut Node)> {
        if a == b {
            return Err(Error::invariant(format!("{} paired with itself", a)));
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if hi.index() >= self.slots.len() {
            return Err(Error::invariant(format!("dangling handle {}", hi)));
        }

        let (head, tail) = self.slots.split_at_mut(hi.index());
        let lo_node = head[lo.index()]
            .as_mut()
            .ok_or_else(|| Error::invariant(format!("dangling handle {}", lo)))?;
        let hi_node = tail[0]
            .as_mut()
            .ok_or_else(|| Error::invariant(format!("dangling handle {}", hi)))?;

        if a < b {
            Ok((lo_node, hi_node))
        } else {
            Ok((hi_node, lo_node))
        }
    }

    /// Drop every node at once.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}
