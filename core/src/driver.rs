use log::{debug, error, info, warn};
use serde_json::json;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::address::AddressAllocator;
use crate::analytics::DeliveryStats;
use crate::components::echo_client::EchoClientConfig;
use crate::components::echo_server::EchoServerConfig;
use crate::components::{create_application, AppKind};
use crate::config::{CellConfig, SimulationConfig, StationRef};
use crate::engine::{Event, EventId, EventKind, Priority, Scheduler, SimTime, TraceRecord};
use crate::error::{RoutingGap, SimError};
use crate::mobility::{MobilityEngine, MobilityModel};
use crate::routing::{resolve, RouteTable};
use crate::topology::{Role, Topology};
use crate::trace::EventTrace;
use crate::traits::{AppId, Application, LinkId, NodeId, SimObserver, SystemInspector};

/// IPv4 + UDP header bytes added to every datagram on the wire.
pub const UDP_IP_OVERHEAD: u32 = 28;

#[derive(Debug, Clone, PartialEq)]
pub struct CellHandle {
    pub link: LinkId,
    pub ap: NodeId,
    pub stations: Vec<NodeId>,
}

pub struct Simulation {
    pub config: SimulationConfig,
    topology: Topology,
    addresses: AddressAllocator,
    routes: RouteTable,
    scheduler: Scheduler,
    mobility: MobilityEngine,
    apps: Vec<Box<dyn Application>>,
    app_windows: Vec<[Option<EventId>; 2]>,
    observers: Vec<Box<dyn SimObserver>>,
    trace: EventTrace,
    quarantined: BTreeSet<NodeId>,
    backbone: Vec<NodeId>,
    backbone_link: Option<LinkId>,
    cells: Vec<CellHandle>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let seed = config.seed;
        Self {
            config,
            topology: Topology::new(),
            addresses: AddressAllocator::new(),
            routes: RouteTable::default(),
            scheduler: Scheduler::new(),
            mobility: MobilityEngine::new(seed),
            apps: Vec::new(),
            app_windows: Vec::new(),
            observers: Vec::new(),
            trace: EventTrace::new(),
            quarantined: BTreeSet::new(),
            backbone: Vec::new(),
            backbone_link: None,
            cells: Vec::new(),
        }
    }

    pub fn from_config(config: SimulationConfig) -> Result<Self, SimError> {
        let mut sim = Self::new(config);
        sim.build()?;
        Ok(sim)
    }

    /// Validates the configuration, then builds the graph, numbers every
    /// link, resolves routes and queues the initial events. Nothing is built
    /// if validation fails.
    pub fn build(&mut self) -> Result<(), SimError> {
        self.config.validate()?;
        info!(
            "building topology: {} cells, stations {:?}",
            self.config.cells.len(),
            self.config.cells.iter().map(|c| c.station_count).collect::<Vec<_>>()
        );

        let cfg = self.config.clone();
        for pos in cfg.backbone.positions {
            let node = self.topology.add_node(Role::Backbone);
            self.topology.set_position(node, pos)?;
            self.backbone.push(node);
        }
        let backbone_link = self
            .topology
            .add_link(self.backbone[0], self.backbone[1], cfg.backbone.link)?;
        self.backbone_link = Some(backbone_link);

        for cell in &cfg.cells {
            let handle = self.build_cell(cell)?;
            self.cells.push(handle);
        }

        self.addresses.allocate(
            &mut self.topology,
            cfg.backbone.subnet.base,
            cfg.backbone.subnet.prefix_len,
            backbone_link,
        )?;
        for (cell, handle) in cfg.cells.iter().zip(&self.cells) {
            self.addresses.allocate(
                &mut self.topology,
                cell.subnet.base,
                cell.subnet.prefix_len,
                handle.link,
            )?;
        }

        self.refresh_routes();
        self.install_applications();
        self.schedule_initial_events();
        info!(
            "topology ready: {} nodes, {} links, {} events queued",
            self.topology.nodes().len(),
            self.topology.links().len(),
            self.scheduler.pending()
        );
        Ok(())
    }

    fn build_cell(&mut self, cell: &CellConfig) -> Result<CellHandle, SimError> {
        let ap = self.backbone[cell.ap];
        let stations: Vec<NodeId> = (0..cell.station_count)
            .map(|_| self.topology.add_node(Role::Station))
            .collect();
        let link = self.topology.add_cell(ap, &stations, cell.link)?;

        for (index, &sta) in stations.iter().enumerate() {
            self.topology
                .set_mobility(sta, MobilityModel::RandomWalk(cell.walk))?;
            self.topology
                .set_position(sta, cell.grid.position(index as u32))?;
        }
        Ok(CellHandle { link, ap, stations })
    }

    fn station(&self, cell: usize, station: StationRef) -> Option<NodeId> {
        let handle = self.cells.get(cell)?;
        let idx = station.resolve(handle.stations.len() as u32)?;
        handle.stations.get(idx as usize).copied()
    }

    fn primary_address(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.addresses.addresses_of(node).first().copied()
    }

    fn install_applications(&mut self) {
        let mut server_addr = None;
        if let Some(setup) = self.config.echo_server {
            if let Some(node) = self.station(setup.cell, setup.station) {
                server_addr = self.primary_address(node);
                let id = self.apps.len();
                let kind = AppKind::EchoServer(EchoServerConfig { port: setup.port });
                self.apps.push(create_application(id, node, kind));
                self.schedule_app_window(id, node, setup.start_us, setup.stop_us);
            }
        }
        if let Some(setup) = self.config.echo_client {
            if let Some(node) = self.station(setup.cell, setup.station) {
                let remote = setup
                    .remote
                    .or(server_addr)
                    .unwrap_or(Ipv4Addr::UNSPECIFIED);
                let id = self.apps.len();
                let kind = AppKind::EchoClient(EchoClientConfig {
                    remote,
                    remote_port: setup.remote_port,
                    max_packets: setup.max_packets,
                    interval_us: setup.interval_us,
                    packet_size: setup.packet_size,
                    ..EchoClientConfig::default()
                });
                self.apps.push(create_application(id, node, kind));
                self.schedule_app_window(id, node, setup.start_us, setup.stop_us);
            }
        }
    }

    fn schedule_app_window(&mut self, app: usize, node: NodeId, start: SimTime, stop: SimTime) {
        let mut ids = [None, None];
        for (slot, (time, kind)) in [(start, EventKind::AppStart { app }), (stop, EventKind::AppStop { app })]
            .into_iter()
            .enumerate()
        {
            match self.scheduler.schedule(time, node, kind) {
                Ok(id) => ids[slot] = Some(id),
                Err(e) => error!("application {} on node {}: {}", app, node, e),
            }
        }
        self.app_windows.push(ids);
    }

    pub fn app_window(&self, app: AppId) -> Option<(Option<EventId>, Option<EventId>)> {
        self.app_windows.get(app).map(|[start, stop]| (*start, *stop))
    }

    fn schedule_initial_events(&mut self) {
        let now = self.scheduler.now();
        let link_ids: Vec<LinkId> = self.topology.links().iter().map(|l| l.id).collect();
        for link in link_ids {
            let owner = self
                .topology
                .link(link)
                .and_then(|l| l.members().first().copied())
                .unwrap_or_default();
            if let Err(e) =
                self.scheduler
                    .schedule_with_priority(now, Priority::High, owner, EventKind::LinkUp { link })
            {
                error!("link {}: {}", link, e);
            }
        }

        let walkers: Vec<(NodeId, MobilityModel)> = self
            .topology
            .nodes()
            .iter()
            .map(|n| (n.id, n.mobility))
            .collect();
        for (node, model) in walkers {
            let MobilityModel::RandomWalk(params) = model else {
                continue;
            };
            self.mobility.register(node, params, now);
            // scheduled at the clock, so this only fails on a scheduler fault
            if let Err(e) = self.scheduler.schedule(now, node, EventKind::MobilityTick) {
                self.quarantine(node, &e.to_string());
            }
        }
    }

    /// Stops moving `node`. Its already queued tick fires as a skipped
    /// record and nothing further is scheduled for it.
    pub fn quarantine(&mut self, node: NodeId, reason: &str) {
        warn!("quarantining mobility of node {}: {}", node, reason);
        self.mobility.unregister(node);
        self.quarantined.insert(node);
    }

    pub fn refresh_routes(&mut self) -> bool {
        if !self.routes.is_empty() && !self.routes.is_stale(&self.topology) {
            return false;
        }
        self.routes = resolve(&self.topology);
        info!(
            "resolved {} routes ({} unreachable pairs)",
            self.routes.len(),
            self.routes.gaps().len()
        );
        true
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.push(observer);
    }

    pub fn run(&mut self) -> u64 {
        self.run_until(self.config.stop_time_us)
    }

    /// Fires every event up to `stop`. Anything scheduled later is dropped,
    /// so a second call with the same stop fires nothing.
    pub fn run_until(&mut self, stop: SimTime) -> u64 {
        self.refresh_routes();
        let horizon = stop.min(self.config.stop_time_us);

        let Self {
            topology,
            addresses,
            routes,
            scheduler,
            mobility,
            apps,
            observers,
            trace,
            quarantined,
            ..
        } = self;

        let fired = scheduler.run(stop, |sched, event| {
            let payload = match &event.kind {
                EventKind::LinkUp { link } => {
                    for obs in observers.iter_mut() {
                        obs.on_link_activated(*link, event.time);
                    }
                    json!({ "link": link })
                }
                EventKind::MobilityTick => {
                    let node = event.node_id;
                    let moved = topology
                        .position(node)
                        .and_then(|from| mobility.step(node, from, event.time));
                    match moved {
                        Some(pos) => {
                            if let Err(e) = topology.set_position(node, pos) {
                                warn!("node {}: {}", node, e);
                            }
                            let next = mobility
                                .params(node)
                                .map(|p| event.time.saturating_add(p.step_interval_us));
                            // next >= the clock; an error here means the scheduler is broken
                            if let Some(next) = next.filter(|&t| t <= horizon) {
                                if let Err(e) = sched.schedule(next, node, EventKind::MobilityTick) {
                                    warn!("quarantining mobility of node {}: {}", node, e);
                                    mobility.unregister(node);
                                    quarantined.insert(node);
                                }
                            }
                            json!({ "x": pos.x, "y": pos.y })
                        }
                        None => {
                            debug!("node {}: not walking, tick skipped", node);
                            json!({ "skipped": true })
                        }
                    }
                }
                EventKind::AppStart { app } | EventKind::AppStop { app } | EventKind::AppSend { app } => {
                    let inspector = NetworkInspector {
                        topology: &*topology,
                        addresses: &*addresses,
                        routes: &*routes,
                    };
                    match apps.get_mut(*app) {
                        Some(target) => {
                            for cmd in target.on_event(&event, &inspector) {
                                sched.schedule_in(cmd.delay, cmd.node_id, cmd.kind);
                            }
                            json!({ "app": target.name(), "kind": target.kind() })
                        }
                        None => {
                            warn!("no application {} installed, {} skipped", app, event.kind.label());
                            json!({ "app": app, "skipped": true })
                        }
                    }
                }
                EventKind::PacketArrival { packet } => {
                    let inspector = NetworkInspector {
                        topology: &*topology,
                        addresses: &*addresses,
                        routes: &*routes,
                    };
                    let target = apps
                        .iter_mut()
                        .find(|a| a.node() == event.node_id && a.port() == packet.dst.port());
                    let delivered = match target {
                        Some(app) => {
                            for cmd in app.on_event(&event, &inspector) {
                                sched.schedule_in(cmd.delay, cmd.node_id, cmd.kind);
                            }
                            true
                        }
                        None => {
                            debug!("node {}: nothing listens on port {}", event.node_id, packet.dst.port());
                            false
                        }
                    };
                    json!({
                        "src": packet.src.to_string(),
                        "dst": packet.dst.to_string(),
                        "size": packet.size,
                        "delivered": delivered,
                    })
                }
            };
            record(trace, observers, &event, payload);
        });
        info!("run stopped at {}us after firing {} events", scheduler.now(), fired);
        fired
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable access between runs. Routes are re-resolved on the next run.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn addresses(&self) -> &AddressAllocator {
        &self.addresses
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn trace(&self) -> &EventTrace {
        &self.trace
    }

    pub fn apps(&self) -> &[Box<dyn Application>] {
        &self.apps
    }

    pub fn cells(&self) -> &[CellHandle] {
        &self.cells
    }

    pub fn backbone(&self) -> &[NodeId] {
        &self.backbone
    }

    pub fn backbone_link(&self) -> Option<LinkId> {
        self.backbone_link
    }

    pub fn quarantined(&self) -> &BTreeSet<NodeId> {
        &self.quarantined
    }

    pub fn mobility(&self) -> &MobilityEngine {
        &self.mobility
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        DeliveryStats::collect(&self.apps)
    }

    pub fn inspector(&self) -> NetworkInspector<'_> {
        NetworkInspector {
            topology: &self.topology,
            addresses: &self.addresses,
            routes: &self.routes,
        }
    }
}

fn record(
    trace: &mut EventTrace,
    observers: &mut [Box<dyn SimObserver>],
    event: &Event,
    payload: serde_json::Value,
) {
    let rec = TraceRecord {
        time: event.time,
        node_id: event.node_id,
        kind: event.kind.label().to_string(),
        payload,
    };
    trace.on_event(&rec);
    for obs in observers.iter_mut() {
        obs.on_event(&rec);
    }
}

pub struct NetworkInspector<'a> {
    topology: &'a Topology,
    addresses: &'a AddressAllocator,
    routes: &'a RouteTable,
}

impl SystemInspector for NetworkInspector<'_> {
    fn address_of(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.addresses.addresses_of(node).first().copied()
    }

    fn node_of(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.addresses.owner(addr).map(|(node, _)| node)
    }

    fn path_latency(&self, from: NodeId, to: NodeId, size: u32) -> Result<SimTime, RoutingGap> {
        let bytes = size + UDP_IP_OVERHEAD;
        let path = self.routes.path(from, to)?;
        Ok(path
            .iter()
            .filter_map(|hop| self.topology.link(hop.link))
            .map(|link| link.config.transit_time_us(bytes))
            .sum())
    }
}
