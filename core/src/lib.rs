pub mod address;
pub mod analytics;
pub mod components;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod mobility;
pub mod routing;
pub mod topology;
pub mod trace;
pub mod traits;

pub use address::{AddressAllocator, AddressAssignment, Subnet};
pub use analytics::{DeliveryStats, DeliverySummary};
pub use components::echo_client::{EchoClient, EchoClientConfig};
pub use components::echo_server::{EchoServer, EchoServerConfig};
pub use components::{create_application, AppKind};
pub use config::{CellConfig, SimulationConfig, StationRef, SubnetConfig};
pub use driver::{CellHandle, NetworkInspector, Simulation};
pub use engine::{
    as_secs_f64, millis, secs, Event, EventId, EventKind, Packet, PacketKind, Priority, ScheduleCmd,
    Scheduler, SimTime, TraceRecord,
};
pub use error::{
    AllocationError, ConfigurationError, RoutingGap, SchedulingError, SimError, TopologyError,
};
pub use mobility::{Bounds, GridLayout, GridOrder, MobilityEngine, MobilityModel, Position, RandomWalkParams};
pub use routing::{resolve, RouteEntry, RouteTable};
pub use topology::{Link, LinkConfig, LinkKind, Role, Topology};
pub use trace::{CaptureRegistry, EventTrace};
pub use traits::{AppId, Application, InterfaceId, LinkId, NodeId, SimObserver, SystemInspector};
