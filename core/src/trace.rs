use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::engine::{SimTime, TraceRecord};
use crate::traits::{LinkId, NodeId, SimObserver};

/// In-memory record of every fired event, in firing order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EventTrace {
    records: Vec<TraceRecord>,
}

impl EventTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a TraceRecord> + 'a {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &TraceRecord> + '_ {
        self.records.iter().filter(move |r| r.node_id == node)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}

impl SimObserver for EventTrace {
    fn on_event(&mut self, record: &TraceRecord) {
        self.records.push(record.clone());
    }
}

/// Remembers which links came up and when, so a capture writer can attach
/// to them. Clone the handle before handing the registry to the driver.
#[derive(Debug, Default, Clone)]
pub struct CaptureRegistry {
    pub links: Arc<RwLock<Vec<(LinkId, SimTime)>>>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Arc<RwLock<Vec<(LinkId, SimTime)>>> {
        Arc::clone(&self.links)
    }

    pub fn activated(&self) -> Vec<(LinkId, SimTime)> {
        self.links.read().map(|l| l.clone()).unwrap_or_default()
    }
}

impl SimObserver for CaptureRegistry {
    fn on_link_activated(&mut self, link: LinkId, time: SimTime) {
        if let Ok(mut links) = self.links.write() {
            links.push((link, time));
        }
    }
}
