//! Process-wide session state: the current solution and its subscribers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::events::FleetEvent;
use crate::models::{OptimizationRequest, Solution};

/// Identifies one subscriber in a [`SubscriberRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Best-effort fan-out of [`FleetEvent`]s.
///
/// Each subscriber owns a bounded channel. A send that fails, because the
/// receiver is gone or its buffer is full, removes that subscriber and
/// never affects delivery to the others.
///
/// # Examples
///
/// ```
/// use fleetflow::service::{FleetEvent, SubscriberRegistry};
///
/// let registry = SubscriberRegistry::new(8);
/// let (_id, mut rx) = registry.subscribe();
/// let (_gone, dropped) = registry.subscribe();
/// drop(dropped);
///
/// assert_eq!(registry.publish(&FleetEvent::progress("tick", 10)), 1);
/// assert_eq!(registry.len(), 1);
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Debug)]
pub struct SubscriberRegistry {
    buffer: usize,
    next_id: AtomicU64,
    senders: RwLock<Vec<(SubscriberId, mpsc::Sender<FleetEvent>)>>,
}

impl SubscriberRegistry {
    /// Creates an empty registry with `buffer` events per subscriber.
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            next_id: AtomicU64::new(0),
            senders: RwLock::new(Vec::new()),
        }
    }

    /// Registers a subscriber.
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<FleetEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.senders.write().push((id, tx));
        (id, rx)
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut senders = self.senders.write();
        let before = senders.len();
        senders.retain(|(sid, _)| *sid != id);
        senders.len() != before
    }

    /// Sends `event` to every subscriber; returns how many accepted it.
    pub fn publish(&self, event: &FleetEvent) -> usize {
        let mut failed = Vec::new();
        let mut delivered = 0;
        for (id, tx) in self.senders.read().iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => failed.push(*id),
            }
        }

        if !failed.is_empty() {
            self.senders.write().retain(|(id, _)| !failed.contains(id));
            debug!(
                event = "subscribers_removed",
                kind = event.kind(),
                removed = failed.len()
            );
        }
        delivered
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.senders.read().len()
    }

    /// Returns `true` when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.senders.read().is_empty()
    }
}

/// Snapshot returned by [`SessionState::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// A current solution exists.
    pub has_solution: bool,
    /// The re-optimization loop is active.
    pub scheduler_running: bool,
    /// Registered subscribers.
    pub subscribers: usize,
}

#[derive(Debug)]
struct Current {
    solution: Arc<Solution>,
    request: OptimizationRequest,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    current: Option<Current>,
}

/// Shared state of one optimization session.
///
/// Empty at startup. Each completed optimization replaces the solution and
/// the request that produced it together, so readers always see a matching
/// pair. [`clear`](Self::clear) starts a new generation; writes prepared
/// against an older generation are refused. Hand it around as
/// `Arc<SessionState>`.
#[derive(Debug)]
pub struct SessionState {
    slot: RwLock<Slot>,
    subscribers: SubscriberRegistry,
    scheduler_running: AtomicBool,
    scheduler_stop: watch::Sender<bool>,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new(subscriber_buffer: usize) -> Self {
        Self {
            slot: RwLock::new(Slot::default()),
            subscribers: SubscriberRegistry::new(subscriber_buffer),
            scheduler_running: AtomicBool::new(false),
            scheduler_stop: watch::Sender::new(false),
        }
    }

    /// The current solution, if any.
    pub fn current(&self) -> Option<Arc<Solution>> {
        self.slot
            .read()
            .current
            .as_ref()
            .map(|c| Arc::clone(&c.solution))
    }

    /// The request behind the current solution, if any.
    pub fn last_request(&self) -> Option<OptimizationRequest> {
        self.slot.read().current.as_ref().map(|c| c.request.clone())
    }

    /// Bumped by every [`clear`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.slot.read().generation
    }

    /// Replaces the current solution and its request.
    pub fn replace(&self, solution: Arc<Solution>, request: OptimizationRequest) {
        self.slot.write().current = Some(Current { solution, request });
    }

    /// Replaces the current solution only if no [`clear`](Self::clear)
    /// happened since `generation` was read. Returns whether it was stored.
    pub fn replace_if_generation(
        &self,
        generation: u64,
        solution: Arc<Solution>,
        request: OptimizationRequest,
    ) -> bool {
        let mut slot = self.slot.write();
        if slot.generation != generation {
            return false;
        }
        slot.current = Some(Current { solution, request });
        true
    }

    /// Drops the current solution and starts a new generation.
    pub fn clear(&self) {
        let mut slot = self.slot.write();
        slot.generation += 1;
        slot.current = None;
    }

    /// Subscriber registry.
    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }

    /// Publishes to every subscriber.
    pub fn publish(&self, event: &FleetEvent) -> usize {
        self.subscribers.publish(event)
    }

    /// Whether the re-optimization loop is active.
    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler_running.load(Ordering::Acquire)
    }

    /// Claims the single scheduler slot and returns the stop signal for the
    /// new loop, or `None` if a loop is already running.
    pub(crate) fn try_claim_scheduler(&self) -> Option<watch::Receiver<bool>> {
        self.scheduler_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.scheduler_stop.send_replace(false);
        Some(self.scheduler_stop.subscribe())
    }

    /// Asks the running loop, whichever handle started it, to exit.
    pub(crate) fn request_scheduler_stop(&self) {
        self.scheduler_stop.send_replace(true);
    }

    pub(crate) fn release_scheduler(&self) {
        self.scheduler_running.store(false, Ordering::Release);
    }

    /// Point-in-time status.
    pub fn status(&self) -> Status {
        Status {
            has_solution: self.slot.read().current.is_some(),
            scheduler_running: self.is_scheduler_running(),
            subscribers: self.subscribers.len(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(64)
    }
}
