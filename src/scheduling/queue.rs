//! Priority queue of pending chunk loads.
//!
//! Requests are ordered by distance to the observer, then by request timestamp, then by a
//! stable hash of the coordinate and finally by the coordinate itself, so two runs fed the
//! same requests dequeue them in the same order.
//!
//! Each coordinate is pending at most once. Removal is lazy: the pending map is the source
//! of truth and heap entries that no longer match it are skipped on pop.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::voxels::ChunkCoordinate;

/// A request to bring one chunk into memory.
///
/// Two requests are equal when they target the same coordinate, whatever their priority.
#[derive(Clone, Copy, Debug)]
pub struct LoadRequest {
    /// Chunk to load.
    pub coordinate: ChunkCoordinate,
    /// Distance from the observer's chunk to this chunk, in chunks.
    pub distance: f32,
    /// Monotonic request time; earlier requests win distance ties.
    pub timestamp: u64,
}

impl LoadRequest {
    pub fn new(coordinate: ChunkCoordinate, distance: f32, timestamp: u64) -> Self {
        LoadRequest {
            coordinate,
            distance,
            timestamp,
        }
    }

    /// Total priority order: `Less` means `self` is served first.
    pub fn priority_cmp(&self, other: &LoadRequest) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.timestamp.cmp(&other.timestamp))
            .then(
                self.coordinate
                    .stable_hash()
                    .cmp(&other.coordinate.stable_hash()),
            )
            .then(self.coordinate.cmp(&other.coordinate))
    }
}

impl PartialEq for LoadRequest {
    fn eq(&self, other: &Self) -> bool {
        self.coordinate == other.coordinate
    }
}

impl Eq for LoadRequest {}

/// Heap entry; `sequence` ties it to the pending map.
#[derive(Debug)]
struct HeapEntry {
    request: LoadRequest,
    sequence: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the highest priority is on top.
        other
            .request
            .priority_cmp(&self.request)
            .then(other.sequence.cmp(&self.sequence))
    }
}

/// De-duplicating priority queue of [`LoadRequest`]s.
#[derive(Debug, Default)]
pub struct LoadQueue {
    heap: BinaryHeap<HeapEntry>,
    pending: HashMap<ChunkCoordinate, (u64, LoadRequest)>,
    next_sequence: u64,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request unless its coordinate is already pending.
    ///
    /// Returns `true` if the request was added.
    pub fn enqueue(&mut self, request: LoadRequest) -> bool {
        if self.pending.contains_key(&request.coordinate) {
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.insert(request.coordinate, (sequence, request));
        self.heap.push(HeapEntry { request, sequence });
        true
    }

    /// Removes and returns the highest-priority request.
    pub fn pop(&mut self) -> Option<LoadRequest> {
        while let Some(entry) = self.heap.pop() {
            let live = self
                .pending
                .get(&entry.request.coordinate)
                .is_some_and(|(sequence, _)| *sequence == entry.sequence);
            if live {
                self.pending.remove(&entry.request.coordinate);
                return Some(entry.request);
            }
        }
        None
    }

    /// The highest-priority pending request, without removing it.
    pub fn peek(&self) -> Option<&LoadRequest> {
        self.pending
            .values()
            .map(|(_, request)| request)
            .min_by(|a, b| a.priority_cmp(b))
    }

    /// Cancels the pending request for `coordinate`. Returns `true` if one was pending.
    pub fn remove(&mut self, coordinate: ChunkCoordinate) -> bool {
        let removed = self.pending.remove(&coordinate).is_some();
        self.compact_if_sparse();
        removed
    }

    /// Cancels every pending request matching `predicate`, returning their coordinates.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&LoadRequest) -> bool) -> Vec<ChunkCoordinate> {
        let mut cancelled = Vec::new();
        self.pending.retain(|coordinate, (_, request)| {
            if predicate(&*request) {
                cancelled.push(*coordinate);
                false
            } else {
                true
            }
        });
        self.compact_if_sparse();
        cancelled
    }

    /// Recomputes the distance of every pending request, keeping their timestamps.
    pub fn reprioritize(&mut self, mut distance_of: impl FnMut(ChunkCoordinate) -> f32) {
        for (_, request) in self.pending.values_mut() {
            request.distance = distance_of(request.coordinate);
        }
        self.rebuild_heap();
    }

    pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
        self.pending.contains_key(&coordinate)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }

    /// Pending requests in unspecified order.
    pub fn pending(&self) -> impl Iterator<Item = &LoadRequest> {
        self.pending.values().map(|(_, request)| request)
    }

    fn compact_if_sparse(&mut self) {
        if self.heap.len() > 2 * self.pending.len() + 64 {
            self.rebuild_heap();
        }
    }

    fn rebuild_heap(&mut self) {
        self.heap = self
            .pending
            .values()
            .map(|&(sequence, request)| HeapEntry { request, sequence })
            .collect();
    }
}
