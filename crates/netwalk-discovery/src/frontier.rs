//! Work queue of devices awaiting a visit, plus the visited set
//!
//! Duplicates may sit in the queue; the check happens when an entry is
//! claimed, under the same lock as the pop, so two workers can never claim
//! the same host.

use netwalk_core::DeviceCredential;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Result of trying to take the next device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// This caller now owns the device and must [`Frontier::complete`] it
    Device(DeviceCredential),
    /// Host was already claimed; the entry was discarded
    Duplicate(String),
    /// Queue is empty but claimed devices may still add more
    Wait,
    /// Queue is empty and nothing is in flight
    Exhausted,
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<DeviceCredential>,
    claimed: HashSet<String>,
    visited: HashSet<String>,
    visit_order: Vec<String>,
    in_flight: usize,
}

#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<State>,
    changed: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a device unless its host was already visited
    ///
    /// Returns false when the device was dropped.
    pub fn push(&self, credential: DeviceCredential) -> bool {
        {
            let mut state = self.lock();
            if state.visited.contains(&credential.host) {
                return false;
            }
            state.queue.push_back(credential);
        }
        self.changed.notify_waiters();
        true
    }

    /// Pop the front entry and claim its host
    pub fn claim(&self) -> Claim {
        let mut state = self.lock();
        match state.queue.pop_front() {
            None if state.in_flight > 0 => Claim::Wait,
            None => Claim::Exhausted,
            Some(credential) => {
                if !state.claimed.insert(credential.host.clone()) {
                    return Claim::Duplicate(credential.host);
                }
                state.in_flight += 1;
                Claim::Device(credential)
            }
        }
    }

    /// Mark a claimed host as visited
    pub fn complete(&self, host: &str) {
        {
            let mut state = self.lock();
            if state.visited.insert(host.to_string()) {
                state.visit_order.push(host.to_string());
                state.in_flight = state.in_flight.saturating_sub(1);
            }
        }
        self.changed.notify_waiters();
    }

    /// Guard that completes `host` when dropped
    ///
    /// A visit that unwinds still releases its claim, so idle workers are
    /// not left waiting on it.
    pub fn guard(&self, host: &str) -> CompletionGuard<'_> {
        CompletionGuard {
            frontier: self,
            host: host.to_string(),
        }
    }

    /// Future resolving on the next push or completion
    ///
    /// Create it before calling [`Frontier::claim`] so a wakeup between the
    /// claim and the await is not lost.
    pub fn notified(&self) -> Notified<'_> {
        self.changed.notified()
    }

    pub fn is_visited(&self, host: &str) -> bool {
        self.lock().visited.contains(host)
    }

    /// Visited hosts in completion order
    pub fn visited(&self) -> Vec<String> {
        self.lock().visit_order.clone()
    }

    /// Entries still queued, duplicates included
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Completes a claimed host on drop
#[must_use = "the host is completed as soon as the guard is dropped"]
pub struct CompletionGuard<'a> {
    frontier: &'a Frontier,
    host: String,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.frontier.complete(&self.host);
    }
}
