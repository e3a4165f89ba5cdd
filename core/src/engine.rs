use crate::traits::{AppId, LinkId, NodeId};
use log::error;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::net::SocketAddrV4;

use crate::error::SchedulingError;

/// Virtual time in microseconds.
pub type SimTime = u64;

pub const US_PER_SEC: u64 = 1_000_000;

pub fn secs(s: f64) -> SimTime {
    (s * US_PER_SEC as f64).round() as SimTime
}

pub fn millis(ms: u64) -> SimTime {
    ms * 1_000
}

pub fn as_secs_f64(t: SimTime) -> f64 {
    t as f64 / US_PER_SEC as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketKind {
    Request,
    Echo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: u64,
    pub kind: PacketKind,
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub size: u32,
    pub sent_at: SimTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    LinkUp { link: LinkId },
    MobilityTick,
    AppStart { app: AppId },
    AppStop { app: AppId },
    AppSend { app: AppId },
    PacketArrival { packet: Packet },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::LinkUp { .. } => "link-up",
            EventKind::MobilityTick => "mobility",
            EventKind::AppStart { .. } => "app-start",
            EventKind::AppStop { .. } => "app-stop",
            EventKind::AppSend { .. } => "app-send",
            EventKind::PacketArrival { .. } => "packet-arrival",
        }
    }
}

/// Lower values fire first among events sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub time: SimTime,
    pub priority: Priority,
    pub node_id: NodeId,
    pub kind: EventKind,
}

impl Event {
    fn key(&self) -> (SimTime, Priority, u64) {
        // ids are handed out in insertion order, so they double as the FIFO sequence
        (self.time, self.priority, self.id.0)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Event {}
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleCmd {
    pub delay: SimTime,
    pub node_id: NodeId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub time: SimTime,
    pub node_id: NodeId,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Priority queue of pending events plus the virtual clock.
///
/// Events fire in `(time, priority, insertion order)` order. Scheduling
/// before the current clock is refused, so the clock never moves backwards.
pub struct Scheduler {
    now: SimTime,
    events: BinaryHeap<Reverse<Event>>,
    cancelled: HashSet<EventId>,
    next_id: u64,
    fired: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            now: 0,
            events: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
            fired: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.peek().map(|Reverse(e)| e.time)
    }

    pub fn schedule(
        &mut self,
        time: SimTime,
        node_id: NodeId,
        kind: EventKind,
    ) -> Result<EventId, SchedulingError> {
        self.schedule_with_priority(time, Priority::Normal, node_id, kind)
    }

    pub fn schedule_with_priority(
        &mut self,
        time: SimTime,
        priority: Priority,
        node_id: NodeId,
        kind: EventKind,
    ) -> Result<EventId, SchedulingError> {
        if time < self.now {
            error!("refusing to schedule {} at {}us, clock is at {}us", kind.label(), time, self.now);
            return Err(SchedulingError::PastDeadline { requested: time, now: self.now });
        }
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(Reverse(Event { id, time, priority, node_id, kind }));
        Ok(id)
    }

    pub fn schedule_in(&mut self, delay: SimTime, node_id: NodeId, kind: EventKind) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(Reverse(Event {
            id,
            time: self.now.saturating_add(delay),
            priority: Priority::Normal,
            node_id,
            kind,
        }));
        id
    }

    /// Tombstones a pending event. Returns `false` if it already fired or is unknown.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if self.cancelled.contains(&id) {
            return false;
        }
        if self.events.iter().any(|Reverse(e)| e.id == id) {
            self.cancelled.insert(id);
            true
        } else {
            false
        }
    }

    pub fn next_due(&mut self, stop_time: SimTime) -> Option<Event> {
        while let Some(Reverse(head)) = self.events.peek() {
            if head.time > stop_time {
                return None;
            }
            let Reverse(event) = self.events.pop()?;
            if self.cancelled.remove(&event.id) {
                continue;
            }
            self.now = event.time;
            self.fired += 1;
            return Some(event);
        }
        None
    }

    /// Fires every event up to and including `stop_time`. Events past the
    /// stop time are discarded and the clock is left at `stop_time`.
    /// Returns the number of events fired by this call.
    pub fn run<F>(&mut self, stop_time: SimTime, mut handler: F) -> u64
    where
        F: FnMut(&mut Scheduler, Event),
    {
        let before = self.fired;
        while let Some(event) = self.next_due(stop_time) {
            handler(self, event);
        }
        if !self.events.is_empty() {
            log::debug!("discarding {} events scheduled past {}us", self.events.len(), stop_time);
            self.events.clear();
        }
        self.cancelled.clear();
        self.now = self.now.max(stop_time);
        self.fired - before
    }
}
