use gulde_common::Cell;

use std::collections::VecDeque;
use tracing::debug;

/// One destination of an entity's route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub destination: Cell,
    /// Travelled share of the leg after which the milestone is announced.
    pub announce_at: f32,
}

/// FIFO of legs an entity still has to walk.
#[derive(Debug, Default)]
pub struct Errands {
    legs: VecDeque<Leg>,
}

impl Errands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one leg per route cell, sharing a milestone threshold.
    pub fn from_route(route: &[Cell], announce_at: f32) -> Self {
        let mut errands = Self::new();
        for destination in route {
            errands.push(Leg {
                destination: *destination,
                announce_at,
            });
        }
        errands
    }

    /// Adds a leg to the back of the queue.
    pub fn push(&mut self, leg: Leg) {
        self.legs.push_back(leg);
    }

    /// Retrieves and removes the next leg from the front of the queue.
    pub fn next(&mut self) -> Option<Leg> {
        match self.legs.pop_front() {
            Some(leg) => {
                debug!(destination = %leg.destination, left = self.legs.len(), "Leg retrieved from queue");
                Some(leg)
            }
            None => {
                debug!("No leg in queue");
                None
            }
        }
    }

    /// Peeks at the next leg without removing it.
    pub fn peek(&self) -> Option<&Leg> {
        self.legs.front()
    }

    /// Drops every queued leg.
    pub fn clear(&mut self) {
        self.legs.clear();
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}
