use std::net::Ipv4Addr;

use crate::engine::{Event, ScheduleCmd, SimTime, TraceRecord};
use crate::error::RoutingGap;

pub type NodeId = u32;
pub type LinkId = u32;
pub type InterfaceId = u32;
pub type AppId = usize;

/// An application installed on a node. The driver calls it on its own
/// events (start, stop, timers, packet arrivals) and schedules whatever it
/// returns.
pub trait Application {
    fn on_event(&mut self, event: &Event, inspector: &dyn SystemInspector) -> Vec<ScheduleCmd>;
    fn name(&self) -> &str;
    fn kind(&self) -> &str;
    fn node(&self) -> NodeId;
    fn port(&self) -> u16;
    fn is_running(&self) -> bool;

    fn packets_sent(&self) -> u64 { 0 }
    fn packets_received(&self) -> u64 { 0 }
    fn packets_echoed(&self) -> u64 { 0 }
    fn packets_dropped(&self) -> u64 { 0 }
    fn delivery_failures(&self) -> u64 { 0 }

    fn round_trips(&self) -> &[SimTime] { &[] }
}

pub trait SystemInspector {
    fn address_of(&self, node: NodeId) -> Option<Ipv4Addr>;
    fn node_of(&self, addr: Ipv4Addr) -> Option<NodeId>;
    /// One-way latency of a `size` byte datagram along the resolved route.
    fn path_latency(&self, from: NodeId, to: NodeId, size: u32) -> Result<SimTime, RoutingGap>;
}

pub trait SimObserver {
    fn on_event(&mut self, _record: &TraceRecord) {}
    fn on_link_activated(&mut self, _link: LinkId, _time: SimTime) {}
}
