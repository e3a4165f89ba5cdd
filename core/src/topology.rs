use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::error::TopologyError;
use crate::mobility::{MobilityModel, Position};
use crate::traits::{InterfaceId, LinkId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Backbone,
    AccessPoint,
    Station,
}

#[derive(Serialize, Deserialize, Clone, Debug, Copy, PartialEq)]
pub struct LinkConfig {
    pub data_rate_bps: u64,
    pub delay_us: u64,
}

impl LinkConfig {
    pub fn backbone() -> Self {
        Self {
            data_rate_bps: 5_000_000,
            delay_us: 2_000,
        }
    }

    pub fn wireless() -> Self {
        Self {
            data_rate_bps: 54_000_000,
            delay_us: 0,
        }
    }

    pub fn transit_time_us(&self, bytes: u32) -> u64 {
        let serialization = if self.data_rate_bps == 0 {
            0
        } else {
            (bytes as u64 * 8 * 1_000_000).div_ceil(self.data_rate_bps)
        };
        self.delay_us + serialization
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::backbone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkKind {
    PointToPoint { a: NodeId, b: NodeId },
    Cell { ap: NodeId, stations: Vec<NodeId> },
}

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub id: LinkId,
    pub kind: LinkKind,
    pub config: LinkConfig,
    pub interfaces: Vec<InterfaceId>,
}

impl Link {
    pub fn members(&self) -> Vec<NodeId> {
        match &self.kind {
            LinkKind::PointToPoint { a, b } => vec![*a, *b],
            LinkKind::Cell { ap, stations } => {
                let mut out = Vec::with_capacity(stations.len() + 1);
                out.push(*ap);
                out.extend(stations.iter().copied());
                out
            }
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self.kind, LinkKind::Cell { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub node: NodeId,
    pub link: LinkId,
    pub address: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub role: Role,
    pub interfaces: Vec<InterfaceId>,
    pub mobility: MobilityModel,
    pub position: Option<Position>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    interfaces: Vec<Interface>,
    generation: u64,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn add_node(&mut self, role: Role) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            id,
            role,
            interfaces: Vec::new(),
            mobility: MobilityModel::Fixed,
            position: None,
        });
        self.generation += 1;
        id
    }

    pub fn add_link(&mut self, a: NodeId, b: NodeId, config: LinkConfig) -> Result<LinkId, TopologyError> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Err(TopologyError::InvalidEndpoint(format!(
                "point-to-point link needs two distinct endpoints, got {a} twice"
            )));
        }
        Ok(self.push_link(LinkKind::PointToPoint { a, b }, config))
    }

    pub fn add_cell(
        &mut self,
        ap: NodeId,
        stations: &[NodeId],
        config: LinkConfig,
    ) -> Result<LinkId, TopologyError> {
        self.check_node(ap)?;
        let mut seen = BTreeSet::new();
        for &sta in stations {
            self.check_node(sta)?;
            if sta == ap {
                return Err(TopologyError::InvalidEndpoint(format!(
                    "node {ap} cannot be both access point and station of one cell"
                )));
            }
            if !seen.insert(sta) {
                return Err(TopologyError::InvalidEndpoint(format!(
                    "station {sta} listed twice in one cell"
                )));
            }
            if self.nodes[sta as usize].role != Role::Station {
                return Err(TopologyError::InvalidEndpoint(format!(
                    "node {sta} is not a station"
                )));
            }
        }
        if self.nodes[ap as usize].role == Role::Station {
            return Err(TopologyError::InvalidEndpoint(format!(
                "station {ap} cannot serve as an access point"
            )));
        }
        self.nodes[ap as usize].role = Role::AccessPoint;
        Ok(self.push_link(
            LinkKind::Cell {
                ap,
                stations: stations.to_vec(),
            },
            config,
        ))
    }

    fn push_link(&mut self, kind: LinkKind, config: LinkConfig) -> LinkId {
        let id = self.links.len() as LinkId;
        let mut link = Link {
            id,
            kind,
            config,
            interfaces: Vec::new(),
        };
        for node in link.members() {
            let iface = self.interfaces.len() as InterfaceId;
            self.interfaces.push(Interface {
                id: iface,
                node,
                link: id,
                address: None,
            });
            self.nodes[node as usize].interfaces.push(iface);
            link.interfaces.push(iface);
        }
        self.links.push(link);
        self.generation += 1;
        id
    }

    fn check_node(&self, id: NodeId) -> Result<(), TopologyError> {
        if (id as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(TopologyError::InvalidEndpoint(format!("unknown node {id}")))
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id as usize)
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.get(id as usize)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn links_of(&self, node: NodeId) -> Vec<LinkId> {
        let mut out: Vec<LinkId> = self
            .interfaces_of(node)
            .iter()
            .map(|i| i.link)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn interfaces_of(&self, node: NodeId) -> Vec<&Interface> {
        self.node(node)
            .map(|n| n.interfaces.iter().filter_map(|&i| self.interface(i)).collect())
            .unwrap_or_default()
    }

    pub fn interface_on(&self, node: NodeId, link: LinkId) -> Option<&Interface> {
        self.interfaces_of(node).into_iter().find(|i| i.link == link)
    }

    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = BTreeSet::new();
        for link in self.links_of(node) {
            if let Some(l) = self.link(link) {
                out.extend(l.members().into_iter().filter(|&m| m != node));
            }
        }
        out.into_iter().collect()
    }

    pub fn nodes_with_role(&self, role: Role) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.role == role).map(|n| n.id).collect()
    }

    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.node(node).and_then(|n| n.position)
    }

    pub fn set_mobility(&mut self, node: NodeId, model: MobilityModel) -> Result<(), TopologyError> {
        self.check_node(node)?;
        self.nodes[node as usize].mobility = model;
        Ok(())
    }

    /// Fixed nodes accept exactly one position; mobile ones any number.
    pub fn set_position(&mut self, node: NodeId, pos: Position) -> Result<(), TopologyError> {
        self.check_node(node)?;
        let n = &mut self.nodes[node as usize];
        if matches!(n.mobility, MobilityModel::Fixed) && n.position.is_some() {
            return Err(TopologyError::FixedPosition(node));
        }
        n.position = Some(pos);
        Ok(())
    }

    pub(crate) fn assign_address(&mut self, iface: InterfaceId, addr: Ipv4Addr) {
        if let Some(i) = self.interfaces.get_mut(iface as usize) {
            if i.address.is_none() {
                i.address = Some(addr);
            }
        }
    }
}
