use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::{Event, Stage, Stats};

/// A request that could not be served on arrival.
#[derive(Debug, Clone, PartialEq)]
struct Waiter {
    client_id: usize,
    requested_t: f64,
    queue_on_entry: usize,
}

/// Outcome of [`Resource::acquire`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acquisition {
    Granted { queue_on_entry: usize },
    Queued { queue_on_entry: usize },
}

/// A waiter promoted to holder by a release.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub client_id: usize,
    pub queue_on_entry: usize,
    pub waited: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceStats {
    pub stage: Stage,
    pub capacity: usize,
    pub current_holders: usize,
    pub current_queue_length: usize,
    pub total_requests: usize,
    pub total_acquired: usize,
    pub total_released: usize,
    /// Summed over acquisitions, zero for immediate grants
    pub total_wait_time: f64,
    pub max_queue_length: usize,
    /// Integral of holders over time up to `last_update_t`
    pub busy_area: f64,
    /// Integral of queue length over time up to `last_update_t`
    pub queue_area: f64,
    pub last_update_t: f64,
    /// `(t, queue_length)` at every change of the queue length
    pub queue_trace: Vec<(f64, usize)>,
}

impl ResourceStats {
    fn new(stage: Stage, capacity: usize) -> Self {
        ResourceStats {
            stage,
            capacity,
            current_holders: 0,
            current_queue_length: 0,
            total_requests: 0,
            total_acquired: 0,
            total_released: 0,
            total_wait_time: 0.0,
            max_queue_length: 0,
            busy_area: 0.0,
            queue_area: 0.0,
            last_update_t: 0.0,
            queue_trace: Vec::new(),
        }
    }

    pub fn is_at_capacity(&self) -> bool {
        self.current_holders >= self.capacity
    }

    pub fn has_queue(&self) -> bool {
        self.current_queue_length > 0
    }

    /// Fraction of server time spent busy over `[0, until]`.
    ///
    /// The current holders are assumed to stay busy from the last update to `until`.
    pub fn utilization(&self, until: f64) -> Option<f64> {
        if until <= 0.0 {
            return None;
        }
        let tail = (until - self.last_update_t).max(0.0);
        let busy = self.busy_area + self.current_holders as f64 * tail;
        Some(busy / (self.capacity as f64 * until))
    }

    /// Time-averaged number of waiters over `[0, until]`.
    pub fn mean_queue_length(&self, until: f64) -> Option<f64> {
        if until <= 0.0 {
            return None;
        }
        let tail = (until - self.last_update_t).max(0.0);
        Some((self.queue_area + self.current_queue_length as f64 * tail) / until)
    }

    pub fn avg_wait_time(&self) -> Option<f64> {
        if self.total_acquired == 0 {
            None
        } else {
            Some(self.total_wait_time / self.total_acquired as f64)
        }
    }
}

/// One station: `capacity` interchangeable servers and a FIFO line.
pub struct Resource {
    stage: Stage,
    capacity: usize,
    holders: HashSet<usize>,
    queue: VecDeque<Waiter>,
    stats: ResourceStats,
}

impl Resource {
    pub fn new(stage: Stage, capacity: usize) -> Resource {
        Resource {
            stage,
            capacity,
            holders: HashSet::new(),
            queue: VecDeque::new(),
            stats: ResourceStats::new(stage, capacity),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Accumulate busy and queue areas up to `now`.
    fn advance(&mut self, now: f64) {
        let dt = now - self.stats.last_update_t;
        if dt > 0.0 {
            self.stats.busy_area += self.holders.len() as f64 * dt;
            self.stats.queue_area += self.queue.len() as f64 * dt;
            self.stats.last_update_t = now;
        }
    }

    fn sync_counts(&mut self, now: f64) {
        let queue_length = self.queue.len();
        if queue_length != self.stats.current_queue_length {
            self.stats.queue_trace.push((now, queue_length));
        }
        self.stats.current_holders = self.holders.len();
        self.stats.current_queue_length = queue_length;
        self.stats.max_queue_length = self.stats.max_queue_length.max(queue_length);
    }

    /// Serve `client_id` immediately if a server is free, otherwise queue it.
    pub fn acquire(&mut self, now: f64, client_id: usize) -> Result<Acquisition, String> {
        let waiting = self.queue.iter().any(|w| w.client_id == client_id);
        if self.holders.contains(&client_id) || waiting {
            return Err(format!("client {client_id} requested the {} station twice", self.stage));
        }
        self.advance(now);
        self.stats.total_requests += 1;

        let queue_on_entry = self.queue.len();
        let outcome = if self.holders.len() < self.capacity {
            self.holders.insert(client_id);
            self.stats.total_acquired += 1;
            debug!(t = now, stage = %self.stage, client_id, "granted on request");
            Acquisition::Granted { queue_on_entry }
        } else {
            self.queue.push_back(Waiter {
                client_id,
                requested_t: now,
                queue_on_entry,
            });
            debug!(t = now, stage = %self.stage, client_id, queue_on_entry, "queued");
            Acquisition::Queued { queue_on_entry }
        };
        self.sync_counts(now);
        Ok(outcome)
    }

    /// Free the server held by `client_id` and hand it to the longest waiter.
    pub fn release(&mut self, now: f64, client_id: usize) -> Result<Option<Grant>, String> {
        if !self.holders.contains(&client_id) {
            return Err(format!(
                "client {client_id} released the {} station without holding it",
                self.stage
            ));
        }
        self.advance(now);
        self.holders.remove(&client_id);
        self.stats.total_released += 1;

        let grant = self.queue.pop_front().map(|waiter| {
            let waited = now - waiter.requested_t;
            self.holders.insert(waiter.client_id);
            self.stats.total_acquired += 1;
            self.stats.total_wait_time += waited;
            debug!(
                t = now,
                stage = %self.stage,
                client_id = waiter.client_id,
                waited,
                "granted on release"
            );
            Grant {
                client_id: waiter.client_id,
                queue_on_entry: waiter.queue_on_entry,
                waited,
            }
        });

        if self.holders.len() > self.capacity {
            return Err(format!(
                "{} station has {} holders for capacity {}",
                self.stage,
                self.holders.len(),
                self.capacity
            ));
        }
        self.sync_counts(now);
        Ok(grant)
    }

    fn acquired(
        &self,
        now: f64,
        client_id: usize,
        queue_on_entry: usize,
    ) -> des::Response<Event, Stats> {
        des::Response::event(
            now,
            Event::ResourceAcquired {
                stage: self.stage,
                client_id,
                queue_on_entry,
            },
        )
    }
}

impl des::Agent<Event, Stats> for Resource {
    fn act(&mut self, current_t: f64, data: &Event) -> des::Response<Event, Stats> {
        match data {
            Event::ResourceRequested { stage, client_id } if *stage == self.stage => {
                match self.acquire(current_t, *client_id) {
                    Ok(Acquisition::Granted { queue_on_entry }) => {
                        self.acquired(current_t, *client_id, queue_on_entry)
                    }
                    Ok(Acquisition::Queued { .. }) => des::Response::new(),
                    Err(reason) => des::Response::fault(reason),
                }
            }
            Event::ResourceReleased { stage, client_id } if *stage == self.stage => {
                match self.release(current_t, *client_id) {
                    Ok(Some(grant)) => {
                        self.acquired(current_t, grant.client_id, grant.queue_on_entry)
                    }
                    Ok(None) => des::Response::new(),
                    Err(reason) => des::Response::fault(reason),
                }
            }
            _ => des::Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ResourceStats(self.stats.clone())
    }
}
