use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{JunctionError, JunctionResult};
use crate::shared_data::VehicleId;

/// A vehicle waiting for permission to enter, paired with its grant signal.
struct WaitingRequest {
    vehicle: VehicleId,
    permission: Sender<()>,
}

/// Handle returned by [`WaitingVehicles::push_back`]; block on it until the
/// vehicle is allowed in.
#[derive(Debug)]
pub struct EntryPermit {
    vehicle: VehicleId,
    permission: Receiver<()>,
}

impl EntryPermit {
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Blocks the calling thread until entry is granted.
    ///
    /// Fails with [`JunctionError::Closed`] if the queue was closed first.
    pub fn wait(self) -> JunctionResult<()> {
        self.permission.recv().map_err(|_| JunctionError::Closed)
    }
}

/// Result of granting the head of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantOutcome {
    pub vehicle: VehicleId,
    /// False when the waiting thread had already gone away.
    pub delivered: bool,
}

#[derive(Default)]
struct Queue {
    requests: VecDeque<WaitingRequest>,
    closed: bool,
}

/// FIFO queue of vehicles waiting to enter an intersection.
///
/// One lock guards the whole list; a request leaves the queue in the same
/// critical section that fulfils its grant.
#[derive(Default)]
pub struct WaitingVehicles {
    queue: Mutex<Queue>,
}

impl WaitingVehicles {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> usize {
        self.queue().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.queue().closed
    }

    /// Appends a vehicle at the tail and returns the permit it should wait on.
    ///
    /// After [`WaitingVehicles::close`] nothing is queued and the permit
    /// resolves to `Closed` straight away.
    pub fn push_back(&self, vehicle: VehicleId) -> EntryPermit {
        let (permission, receiver) = bounded(1);
        let mut queue = self.queue();
        if !queue.closed {
            queue.requests.push_back(WaitingRequest {
                vehicle,
                permission,
            });
        }
        EntryPermit {
            vehicle,
            permission: receiver,
        }
    }

    /// Grants the earliest request, or returns `None` if nobody is waiting.
    pub fn try_permit_first(&self) -> Option<GrantOutcome> {
        let mut queue = self.queue();
        let first = queue.requests.pop_front()?;
        let delivered = first.permission.send(()).is_ok();
        Some(GrantOutcome {
            vehicle: first.vehicle,
            delivered,
        })
    }

    /// Removes the earliest request and grants it entry.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty; callers check [`WaitingVehicles::size`] first.
    pub fn permit_entry_to_first_in_queue(&self) -> GrantOutcome {
        match self.try_permit_first() {
            Some(outcome) => outcome,
            None => panic!("permit_entry_to_first_in_queue called on an empty queue"),
        }
    }

    /// Drops every pending request and refuses new ones; their permits
    /// resolve to `Closed`. Returns how many were dropped.
    pub fn close(&self) -> usize {
        let mut queue = self.queue();
        queue.closed = true;
        let dropped = queue.requests.len();
        queue.requests.clear();
        dropped
    }
}
