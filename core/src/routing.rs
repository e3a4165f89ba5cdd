use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;

use crate::error::RoutingGap;
use crate::topology::Topology;
use crate::traits::{InterfaceId, LinkId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub destination: NodeId,
    pub next_hop: NodeId,
    pub interface: InterfaceId,
    pub link: LinkId,
    pub gateway: Option<Ipv4Addr>,
    pub hops: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteTable {
    generation: u64,
    routes: BTreeMap<NodeId, BTreeMap<NodeId, RouteEntry>>,
    gaps: Vec<RoutingGap>,
}

impl RouteTable {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_stale(&self, topology: &Topology) -> bool {
        self.generation != topology.generation()
    }

    pub fn routes_from(&self, source: NodeId) -> Option<&BTreeMap<NodeId, RouteEntry>> {
        self.routes.get(&source)
    }

    pub fn route(&self, source: NodeId, destination: NodeId) -> Result<&RouteEntry, RoutingGap> {
        self.routes
            .get(&source)
            .and_then(|m| m.get(&destination))
            .ok_or(RoutingGap { origin: source, destination })
    }

    pub fn path(&self, source: NodeId, destination: NodeId) -> Result<Vec<&RouteEntry>, RoutingGap> {
        let mut out = Vec::new();
        let mut at = source;
        while at != destination {
            let entry = self.route(at, destination).map_err(|_| RoutingGap { origin: source, destination })?;
            out.push(entry);
            at = entry.next_hop;
        }
        Ok(out)
    }

    pub fn gaps(&self) -> &[RoutingGap] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shortest-hop routes between every node pair. Among equal-length paths the
/// one leaving through the lowest-id neighbor wins; between two nodes sharing
/// several links the lowest link id is used.
pub fn resolve(topology: &Topology) -> RouteTable {
    let node_ids: Vec<NodeId> = topology.nodes().iter().map(|n| n.id).collect();
    let adjacency: BTreeMap<NodeId, Vec<NodeId>> =
        node_ids.iter().map(|&n| (n, topology.neighbors(n))).collect();

    let mut table = RouteTable {
        generation: topology.generation(),
        ..Default::default()
    };

    for &source in &node_ids {
        // first hop and distance per reached node
        let mut reached: BTreeMap<NodeId, (NodeId, u32)> = BTreeMap::new();
        let mut queue = VecDeque::new();

        for &n in &adjacency[&source] {
            reached.insert(n, (n, 1));
            queue.push_back(n);
        }
        while let Some(at) = queue.pop_front() {
            let (first, dist) = reached[&at];
            for &n in &adjacency[&at] {
                if n != source && !reached.contains_key(&n) {
                    reached.insert(n, (first, dist + 1));
                    queue.push_back(n);
                }
            }
        }

        let mut entries = BTreeMap::new();
        for &dest in &node_ids {
            if dest == source {
                continue;
            }
            let Some(&(next_hop, hops)) = reached.get(&dest) else {
                debug!("no route from {} to {}", source, dest);
                table.gaps.push(RoutingGap { origin: source, destination: dest });
                continue;
            };
            if let Some(entry) = hop_entry(topology, source, next_hop, dest, hops) {
                entries.insert(dest, entry);
            }
        }
        table.routes.insert(source, entries);
    }

    table
}

fn hop_entry(
    topology: &Topology,
    source: NodeId,
    next_hop: NodeId,
    destination: NodeId,
    hops: u32,
) -> Option<RouteEntry> {
    let link = topology
        .links_of(source)
        .into_iter()
        .find(|&l| topology.link(l).is_some_and(|l| l.members().contains(&next_hop)))?;
    let interface = topology.interface_on(source, link)?.id;
    let gateway = topology.interface_on(next_hop, link).and_then(|i| i.address);
    Some(RouteEntry {
        destination,
        next_hop,
        interface,
        link,
        gateway,
        hops,
    })
}
