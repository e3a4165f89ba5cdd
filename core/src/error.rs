use std::net::Ipv4Addr;

use serde::Serialize;
use thiserror::Error;

use crate::engine::SimTime;
use crate::traits::{LinkId, NodeId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("unknown link {0}")]
    UnknownLink(LinkId),

    #[error("node {0} has a fixed position that is already set")]
    FixedPosition(NodeId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("subnet {base}/{prefix_len} holds {capacity} hosts but link {link} has {requested} interfaces")]
    SubnetExhausted {
        base: Ipv4Addr,
        prefix_len: u8,
        link: LinkId,
        capacity: u64,
        requested: usize,
    },

    #[error("subnet {base}/{prefix_len} overlaps {existing_base}/{existing_prefix} already owned by link {owner}")]
    SubnetOverlap {
        base: Ipv4Addr,
        prefix_len: u8,
        existing_base: Ipv4Addr,
        existing_prefix: u8,
        owner: LinkId,
    },

    #[error("prefix length /{0} is outside 1..=30")]
    InvalidPrefix(u8),

    #[error("link {0} already has addresses assigned")]
    LinkAlreadyAllocated(LinkId),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Misuse of the event scheduler. These indicate a bug in the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulingError {
    #[error("cannot schedule at {requested}us, clock is already at {now}us")]
    PastDeadline { requested: SimTime, now: SimTime },
}

/// Rejected build-time configuration. Detected before any topology exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("cell {cell}: {count} stations requested, at most {max} are supported")]
    TooManyStations { cell: usize, count: u32, max: u32 },

    #[error("cell {cell}: station {station} would be placed at ({x}, {y}), outside the bound box; the grid layout exceeds the bounding box")]
    GridExceedsBounds {
        cell: usize,
        station: u32,
        x: f64,
        y: f64,
    },

    #[error("cell {cell}: {reason}")]
    InvalidCell { cell: usize, reason: String },

    #[error("stop time must be positive")]
    ZeroStopTime,

    #[error("{app}: {reason}")]
    InvalidApplication { app: String, reason: String },

    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// No path exists between two nodes. Not fatal: the pair simply has no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[error("node {destination} is unreachable from node {origin}")]
pub struct RoutingGap {
    pub origin: NodeId,
    pub destination: NodeId,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),
}
