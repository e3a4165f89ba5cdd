use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::error::{AllocationError, TopologyError};
use crate::topology::{Role, Topology};
use crate::traits::{InterfaceId, LinkId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subnet {
    pub base: Ipv4Addr,
    pub prefix_len: u8,
}

impl Subnet {
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Result<Self, AllocationError> {
        if !(1..=30).contains(&prefix_len) {
            return Err(AllocationError::InvalidPrefix(prefix_len));
        }
        let mask = u32::MAX << (32 - prefix_len);
        Ok(Self {
            base: Ipv4Addr::from(u32::from(base) & mask),
            prefix_len,
        })
    }

    fn first(&self) -> u32 {
        u32::from(self.base)
    }

    fn last(&self) -> u32 {
        self.first() | (u32::MAX >> self.prefix_len)
    }

    pub fn capacity(&self) -> u64 {
        (1u64 << (32 - self.prefix_len)) - 2
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let a = u32::from(addr);
        a >= self.first() && a <= self.last()
    }

    pub fn overlaps(&self, other: &Subnet) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    pub fn host(&self, index: u32) -> Ipv4Addr {
        Ipv4Addr::from(self.first() + 1 + index)
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.last())
    }
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressAssignment {
    pub link: LinkId,
    pub subnet: Subnet,
    pub addresses: Vec<(InterfaceId, NodeId, Ipv4Addr)>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct AddressAllocator {
    assignments: Vec<AddressAssignment>,
    by_address: BTreeMap<Ipv4Addr, (NodeId, InterfaceId)>,
}

impl AddressAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers the interfaces of `link` from `base/prefix_len`.
    ///
    /// Interfaces are ordered by ascending node id, with the access point of
    /// a cell ahead of its stations.
    pub fn allocate(
        &mut self,
        topology: &mut Topology,
        base: Ipv4Addr,
        prefix_len: u8,
        link: LinkId,
    ) -> Result<AddressAssignment, AllocationError> {
        let subnet = Subnet::new(base, prefix_len)?;
        let l = topology.link(link).ok_or(TopologyError::UnknownLink(link))?;

        if self.assignments.iter().any(|a| a.link == link) {
            return Err(AllocationError::LinkAlreadyAllocated(link));
        }
        if let Some(existing) = self.assignments.iter().find(|a| a.subnet.overlaps(&subnet)) {
            return Err(AllocationError::SubnetOverlap {
                base: subnet.base,
                prefix_len: subnet.prefix_len,
                existing_base: existing.subnet.base,
                existing_prefix: existing.subnet.prefix_len,
                owner: existing.link,
            });
        }
        if l.interfaces.len() as u64 > subnet.capacity() {
            return Err(AllocationError::SubnetExhausted {
                base: subnet.base,
                prefix_len: subnet.prefix_len,
                link,
                capacity: subnet.capacity(),
                requested: l.interfaces.len(),
            });
        }

        let mut ordered: Vec<(bool, NodeId, InterfaceId)> = l
            .interfaces
            .iter()
            .filter_map(|&i| topology.interface(i))
            .map(|i| {
                let is_station = topology.node(i.node).map(|n| n.role) == Some(Role::Station);
                (is_station, i.node, i.id)
            })
            .collect();
        ordered.sort_unstable();

        let mut addresses = Vec::with_capacity(ordered.len());
        for (index, (_, node, iface)) in ordered.into_iter().enumerate() {
            let addr = subnet.host(index as u32);
            topology.assign_address(iface, addr);
            self.by_address.insert(addr, (node, iface));
            addresses.push((iface, node, addr));
        }
        debug!("link {} numbered from {} ({} interfaces)", link, subnet, addresses.len());

        let assignment = AddressAssignment {
            link,
            subnet,
            addresses,
        };
        self.assignments.push(assignment.clone());
        Ok(assignment)
    }

    pub fn assignments(&self) -> &[AddressAssignment] {
        &self.assignments
    }

    pub fn subnet_of(&self, link: LinkId) -> Option<Subnet> {
        self.assignments.iter().find(|a| a.link == link).map(|a| a.subnet)
    }

    pub fn owner(&self, addr: Ipv4Addr) -> Option<(NodeId, InterfaceId)> {
        self.by_address.get(&addr).copied()
    }

    pub fn addresses_of(&self, node: NodeId) -> Vec<Ipv4Addr> {
        let mut out: Vec<(InterfaceId, Ipv4Addr)> = self
            .by_address
            .iter()
            .filter(|(_, (n, _))| *n == node)
            .map(|(addr, (_, iface))| (*iface, *addr))
            .collect();
        out.sort_unstable();
        out.into_iter().map(|(_, a)| a).collect()
    }

    pub fn address_of_interface(&self, iface: InterfaceId) -> Option<Ipv4Addr> {
        self.by_address
            .iter()
            .find(|(_, (_, i))| *i == iface)
            .map(|(addr, _)| *addr)
    }
}
