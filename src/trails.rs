use std::collections::{ HashMap, VecDeque };

use crate::aggregate::WindowSelection;
use crate::types::{ Position, TrailPoint };

/// Bounded recent history of one aircraft ("comet tail"), oldest first
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    points: VecDeque<TrailPoint>,
    capacity: usize,
}

impl TrailBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { points: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends unless the sample is older than the newest point or repeats a position
    /// already recorded at the newest time. Returns whether the sample was added.
    ///
    /// The second rule is stricter than comparing against the newest point alone: an aircraft
    /// that reports P1, P2, P1 under one timestamp keeps only P1, P2. Without it, re-scanning
    /// the same window on every tick would append the same reports again and again.
    pub fn push(&mut self, position: Position, time: i64) -> bool {
        if let Some(last) = self.points.back() {
            if time < last.time || last.position == position {
                return false;
            }
            // several reports can share a timestamp; don't re-add one we already hold
            let seen = self.points
                .iter()
                .rev()
                .take_while(|p| p.time == time)
                .any(|p| p.position == position);
            if seen {
                return false;
            }
        }

        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(TrailPoint { position, time });
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&TrailPoint> {
        self.points.back()
    }
}

/// Per-aircraft trail buffers, kept across ticks
#[derive(Debug, Clone)]
pub struct TrailTracker {
    buffers: HashMap<String, TrailBuffer>,
    max_points: usize,
}

impl TrailTracker {
    pub fn new(max_points: usize) -> Self {
        Self { buffers: HashMap::new(), max_points }
    }

    /// Feed every record of the window, then drop aircraft that are no longer visible
    pub fn update(&mut self, selection: &WindowSelection<'_>) {
        let max_points = self.max_points;

        for sv in selection.records {
            self.buffers
                .entry(sv.icao24.clone())
                .or_insert_with(|| TrailBuffer::new(max_points))
                .push(sv.position(), sv.time);
        }

        self.buffers.retain(|id, _| selection.contains(id));
    }

    pub fn get(&self, entity_id: &str) -> Option<&TrailBuffer> {
        self.buffers.get(entity_id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
