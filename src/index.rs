//! NICR-ordered position index.
//!
//! Doubly linked list sorted by nominal ICR, highest at the head and lowest
//! (riskiest) at the tail. Sequence liquidation always consumes the tail.
//! Inserts take an optional hint pair bracketing the expected slot; stale
//! hints are tolerated by falling back to a scan from the head. NICR is
//! price-independent so the ordering survives price moves unchanged.

use crate::types::{PositionId, Ratio};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    nicr: Ratio,
    prev: Option<PositionId>,
    next: Option<PositionId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortedPositions {
    nodes: HashMap<PositionId, Node>,
    head: Option<PositionId>,
    tail: Option<PositionId>,
}

impl SortedPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Highest NICR.
    pub fn first(&self) -> Option<PositionId> {
        self.head
    }

    /// Lowest NICR; the next liquidation candidate.
    pub fn last(&self) -> Option<PositionId> {
        self.tail
    }

    /// Neighbor toward the tail (lower NICR).
    pub fn next(&self, id: PositionId) -> Option<PositionId> {
        self.nodes.get(&id).and_then(|n| n.next)
    }

    /// Neighbor toward the head (higher NICR).
    pub fn prev(&self, id: PositionId) -> Option<PositionId> {
        self.nodes.get(&id).and_then(|n| n.prev)
    }

    pub fn nicr(&self, id: PositionId) -> Option<Ratio> {
        self.nodes.get(&id).map(|n| n.nicr)
    }

    /// Insert `id` at the slot implied by `nicr`. `hint_hi` is the expected
    /// higher-NICR neighbor, `hint_lo` the lower one; either or both may be
    /// stale or absent.
    pub fn insert(
        &mut self,
        id: PositionId,
        nicr: Ratio,
        hint_hi: Option<PositionId>,
        hint_lo: Option<PositionId>,
    ) {
        debug_assert!(!self.contains(id), "duplicate index insert");
        if self.contains(id) {
            return;
        }

        let (prev, next) = self.find_slot(nicr, hint_hi, hint_lo);
        self.link(id, nicr, prev, next);
    }

    pub fn remove(&mut self, id: PositionId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };

        match node.prev {
            Some(p) => {
                if let Some(pn) = self.nodes.get_mut(&p) {
                    pn.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => {
                if let Some(nn) = self.nodes.get_mut(&n) {
                    nn.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
    }

    /// Remove and re-add with a new key, used after partial liquidation.
    pub fn reinsert(
        &mut self,
        id: PositionId,
        nicr: Ratio,
        hint_hi: Option<PositionId>,
        hint_lo: Option<PositionId>,
    ) {
        self.remove(id);
        self.insert(id, nicr, hint_hi, hint_lo);
    }

    pub fn ids_descending(&self) -> Vec<PositionId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.next(id);
        }
        out
    }

    fn link(
        &mut self,
        id: PositionId,
        nicr: Ratio,
        prev: Option<PositionId>,
        next: Option<PositionId>,
    ) {
        self.nodes.insert(id, Node { nicr, prev, next });

        match prev {
            Some(p) => {
                if let Some(pn) = self.nodes.get_mut(&p) {
                    pn.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        match next {
            Some(n) => {
                if let Some(nn) = self.nodes.get_mut(&n) {
                    nn.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
    }

    fn find_slot(
        &self,
        nicr: Ratio,
        hint_hi: Option<PositionId>,
        hint_lo: Option<PositionId>,
    ) -> (Option<PositionId>, Option<PositionId>) {
        // exact hint pair short-circuits the scan
        if self.valid_slot(nicr, hint_hi, hint_lo) {
            return (hint_hi, hint_lo);
        }

        // partially usable hint: start descending from the high side if it
        // still sits above the key, otherwise scan from the head
        let start = match hint_hi {
            Some(h) => match self.nodes.get(&h) {
                Some(node) if node.nicr >= nicr => Some(h),
                _ => self.head,
            },
            None => self.head,
        };

        let mut prev = None;
        let mut cursor = if start == self.head {
            self.head
        } else {
            prev = start;
            start.and_then(|s| self.next(s))
        };

        while let Some(id) = cursor {
            let node = &self.nodes[&id];
            if node.nicr < nicr {
                return (prev, Some(id));
            }
            prev = Some(id);
            cursor = node.next;
        }
        (prev, None)
    }

    fn valid_slot(
        &self,
        nicr: Ratio,
        prev: Option<PositionId>,
        next: Option<PositionId>,
    ) -> bool {
        match (prev, next) {
            (None, None) => self.is_empty(),
            (None, Some(n)) => {
                self.head == Some(n) && self.nodes.get(&n).is_some_and(|nn| nicr >= nn.nicr)
            }
            (Some(p), None) => {
                self.tail == Some(p) && self.nodes.get(&p).is_some_and(|pn| pn.nicr >= nicr)
            }
            (Some(p), Some(n)) => {
                let Some(pn) = self.nodes.get(&p) else {
                    return false;
                };
                let Some(nn) = self.nodes.get(&n) else {
                    return false;
                };
                pn.next == Some(n) && pn.nicr >= nicr && nicr >= nn.nicr
            }
        }
    }
}
