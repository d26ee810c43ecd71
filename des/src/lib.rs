use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

pub mod error;
pub mod parallel;

pub use error::SimError;

/// Pending wake-up. `seq` is the insertion order and breaks ties between
/// events sharing a timestamp, so equal-time events are dispatched FIFO.
struct Event<T> {
    t: f64,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // Reversed so the max-heap pops the earliest (t, seq) first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What an agent hands back to the loop after reacting to an event.
///
/// `events` carry absolute timestamps which must not precede the current
/// clock. `agents` are registered once the current broadcast is finished.
/// A `fault` aborts the run with [`SimError::InvariantViolation`].
pub struct Response<T, S> {
    pub events: Vec<(f64, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
    pub fault: Option<String>,
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
            fault: None,
        }
    }

    pub fn event(t: f64, data: T) -> Response<T, S> {
        Response::events(vec![(t, data)])
    }

    pub fn events(events: Vec<(f64, T)>) -> Response<T, S> {
        Response {
            events,
            ..Response::new()
        }
    }

    pub fn spawn(events: Vec<(f64, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> Response<T, S> {
        Response {
            events,
            agents,
            fault: None,
        }
    }

    pub fn fault(reason: impl Into<String>) -> Response<T, S> {
        Response {
            fault: Some(reason.into()),
            ..Response::new()
        }
    }
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Response::new()
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_t: f64, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;
}

/// Virtual-clock scheduler.
///
/// Every dispatched event is broadcast to all agents in registration order
/// and each agent runs to completion before the next event is popped.
pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_t: f64,
    next_seq: u64,
    dispatched: usize,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(f64, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::with_capacity(events.len()),
            current_t: 0.0,
            next_seq: 0,
            dispatched: 0,
            agents,
        };
        for (t, data) in events {
            event_loop.push(t, data);
        }
        event_loop
    }

    /// Schedule `data` to fire `delay` time units after the current clock.
    pub fn schedule(&mut self, delay: f64, data: T) -> Result<(), SimError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidTime(delay));
        }
        self.push(self.current_t + delay, data);
        Ok(())
    }

    fn push(&mut self, t: f64, data: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Event { t, seq, data });
    }

    fn broadcast(&mut self) -> Result<(), SimError> {
        let Some(event) = self.queue.pop() else {
            return Ok(());
        };
        if !event.t.is_finite() {
            return Err(SimError::InvalidTime(event.t));
        }
        if event.t < self.current_t {
            return Err(SimError::ClockRegression {
                from: self.current_t,
                to: event.t,
            });
        }

        self.current_t = event.t;
        self.dispatched += 1;
        trace!(t = event.t, seq = event.seq, "dispatch");

        let now = self.current_t;
        let mut new_events = Vec::new();
        let mut new_agents = Vec::new();
        for agent in &mut self.agents {
            let response = agent.act(now, &event.data);
            if let Some(reason) = response.fault {
                return Err(SimError::InvariantViolation { t: now, reason });
            }
            new_events.extend(response.events);
            new_agents.extend(response.agents);
        }

        for (t, data) in new_events {
            if !t.is_finite() {
                return Err(SimError::InvalidTime(t));
            }
            if t < now {
                return Err(SimError::ScheduledInPast { now, scheduled: t });
            }
            self.push(t, data);
        }
        self.agents.extend(new_agents);
        Ok(())
    }

    /// Dispatch events until none are left or the next one lies beyond `until`.
    ///
    /// Events past `until` stay pending. The clock is left at the last
    /// dispatched timestamp.
    pub fn run(&mut self, until: f64) -> Result<(), SimError> {
        debug!(until, pending = self.queue.len(), "event loop started");
        while let Some(next) = self.queue.peek() {
            if next.t > until {
                break;
            }
            self.broadcast()?;
        }
        debug!(
            t = self.current_t,
            dispatched = self.dispatched,
            pending = self.queue.len(),
            "event loop stopped"
        );
        Ok(())
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }

    pub fn current_t(&self) -> f64 {
        self.current_t
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NoddyAgent {}

    impl Agent<u8, ()> for NoddyAgent {
        fn stats(&self) {}
    }

    /// Records every (time, payload) it sees.
    struct Recorder {
        seen: Rc<RefCell<Vec<(f64, u8)>>>,
    }

    impl Agent<u8, ()> for Recorder {
        fn act(&mut self, current_t: f64, data: &u8) -> Response<u8, ()> {
            self.seen.borrow_mut().push((current_t, *data));
            Response::new()
        }

        fn stats(&self) {}
    }

    fn recorder() -> (Rc<RefCell<Vec<(f64, u8)>>>, Box<dyn Agent<u8, ()>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let agent = Recorder { seen: seen.clone() };
        (seen, Box::new(agent))
    }

    #[test]
    fn min_queue() {
        let mut queue = BinaryHeap::<Event<u8>>::new();
        queue.push(Event { t: 2.0, seq: 0, data: 2 });
        queue.push(Event { t: 1.0, seq: 1, data: 1 });
        if let Some(first) = queue.peek() {
            assert_eq!(first.data, 1);
        }
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut queue = BinaryHeap::<Event<u8>>::new();
        queue.push(Event { t: 1.0, seq: 0, data: 10 });
        queue.push(Event { t: 1.0, seq: 1, data: 11 });
        queue.push(Event { t: 0.5, seq: 2, data: 12 });
        let order: Vec<u8> = std::iter::from_fn(|| queue.pop().map(|e| e.data)).collect();
        assert_eq!(order, vec![12, 10, 11]);
    }

    #[test]
    fn noddy_run() {
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(NoddyAgent {})];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.0, 2)], agents);

        event_loop.run(f64::INFINITY).unwrap();

        assert_eq!(event_loop.current_t(), 2.0);
        assert_eq!(event_loop.dispatched(), 2);
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn new_agent() {
        struct Spawner {}
        impl Agent<u8, ()> for Spawner {
            fn act(&mut self, _current_t: f64, _data: &u8) -> Response<u8, ()> {
                let child: Box<dyn Agent<u8, ()>> = Box::new(Spawner {});
                Response::spawn(Vec::new(), vec![child])
            }

            fn stats(&self) {}
        }

        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Spawner {})];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.0, 2)], agents);

        event_loop.run(f64::INFINITY).unwrap();

        // First event: 1 new agent
        // Second event: 2 new agents
        assert_eq!(event_loop.agent_count(), 4);
        assert_eq!(event_loop.stats().len(), 4);
    }

    #[test]
    fn same_time_events_dispatch_in_schedule_order() {
        let (seen, agent) = recorder();
        let events = vec![(1.0, 1), (1.0, 2), (0.5, 3), (1.0, 4)];
        let mut event_loop = EventLoop::new(events, vec![agent]);

        event_loop.run(10.0).unwrap();

        let payloads: Vec<u8> = seen.borrow().iter().map(|(_, d)| *d).collect();
        assert_eq!(payloads, vec![3, 1, 2, 4]);
    }

    #[test]
    fn run_stops_before_events_past_the_horizon() {
        let (seen, agent) = recorder();
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (5.0, 2), (5.5, 3)], vec![agent]);

        event_loop.run(5.0).unwrap();

        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(event_loop.current_t(), 5.0);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn schedule_is_relative_to_the_clock() {
        let (seen, agent) = recorder();
        let mut event_loop = EventLoop::new(vec![(2.0, 1)], vec![agent]);
        event_loop.run(2.0).unwrap();

        event_loop.schedule(1.5, 2).unwrap();
        event_loop.run(f64::INFINITY).unwrap();

        assert_eq!(*seen.borrow(), vec![(2.0, 1), (3.5, 2)]);
    }

    #[test]
    fn schedule_rejects_negative_and_nan_delays() {
        let mut event_loop: EventLoop<u8, ()> = EventLoop::new(Vec::new(), Vec::new());
        assert_eq!(event_loop.schedule(-1.0, 0), Err(SimError::InvalidTime(-1.0)));
        assert!(event_loop.schedule(f64::NAN, 0).is_err());
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn clock_is_non_decreasing_across_dispatches() {
        struct Chain {
            seen: Rc<RefCell<Vec<(f64, u8)>>>,
        }
        impl Agent<u8, ()> for Chain {
            fn act(&mut self, current_t: f64, data: &u8) -> Response<u8, ()> {
                self.seen.borrow_mut().push((current_t, *data));
                if *data < 10 {
                    Response::events(vec![(current_t + 0.25, data + 1), (current_t, data + 2)])
                } else {
                    Response::new()
                }
            }

            fn stats(&self) {}
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Chain { seen: seen.clone() })];
        let mut event_loop = EventLoop::new(vec![(0.0, 0)], agents);

        event_loop.run(f64::INFINITY).unwrap();

        let times: Vec<f64> = seen.borrow().iter().map(|(t, _)| *t).collect();
        assert!(times.len() > 20);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn event_in_the_past_aborts_the_run() {
        struct Backwards {}
        impl Agent<u8, ()> for Backwards {
            fn act(&mut self, current_t: f64, _data: &u8) -> Response<u8, ()> {
                Response::event(current_t - 1.0, 0)
            }

            fn stats(&self) {}
        }

        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Backwards {})];
        let mut event_loop = EventLoop::new(vec![(3.0, 0)], agents);

        let err = event_loop.run(10.0).unwrap_err();
        assert_eq!(
            err,
            SimError::ScheduledInPast {
                now: 3.0,
                scheduled: 2.0
            }
        );
    }

    #[test]
    fn fault_aborts_the_run() {
        struct Faulty {}
        impl Agent<u8, ()> for Faulty {
            fn act(&mut self, _current_t: f64, data: &u8) -> Response<u8, ()> {
                if *data == 2 {
                    Response::fault("holder count exceeded capacity")
                } else {
                    Response::new()
                }
            }

            fn stats(&self) {}
        }

        let (seen, recorder) = recorder();
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Faulty {}), recorder];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.0, 2), (3.0, 3)], agents);

        let err = event_loop.run(10.0).unwrap_err();

        assert!(matches!(err, SimError::InvariantViolation { t, .. } if t == 2.0));
        // the faulting broadcast is abandoned and nothing after it runs
        assert_eq!(seen.borrow().len(), 1);
    }
}
