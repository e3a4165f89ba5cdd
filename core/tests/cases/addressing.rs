use crate::common::TestHarness;
use netsim_core::*;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

#[test]
fn test_reference_numbering() {
    let h = TestHarness::new();
    let sim = &h.sim;
    let [ap0, ap1] = [sim.backbone()[0], sim.backbone()[1]];

    let backbone = sim.addresses().assignments()[0].clone();
    assert_eq!(backbone.subnet.to_string(), "10.1.1.0/24");
    assert_eq!(
        backbone.addresses.iter().map(|(_, n, a)| (*n, *a)).collect::<Vec<_>>(),
        vec![(ap0, Ipv4Addr::new(10, 1, 1, 1)), (ap1, Ipv4Addr::new(10, 1, 1, 2))]
    );

    // access point first, then stations by id
    let cell0 = &sim.cells()[0];
    let a = &sim.addresses().assignments()[1];
    assert_eq!(a.addresses[0].1, cell0.ap);
    assert_eq!(a.addresses[0].2, Ipv4Addr::new(10, 1, 2, 1));
    for (i, sta) in cell0.stations.iter().enumerate() {
        assert_eq!(a.addresses[i + 1].1, *sta);
        assert_eq!(a.addresses[i + 1].2, Ipv4Addr::new(10, 1, 2, 2 + i as u8));
    }
}

#[test]
fn test_addresses_unique_and_inside_subnet() {
    let mut config = TestHarness::bare(18);
    config.cells[1].grid.min_y = -50.0;
    let h = TestHarness::with_config(config);
    let assignments = h.sim.addresses().assignments();
    assert_eq!(assignments.len(), 3);

    let mut all = BTreeSet::new();
    for a in assignments {
        for (_, _, addr) in &a.addresses {
            assert!(a.subnet.contains(*addr), "{} outside {}", addr, a.subnet);
            assert!(all.insert(*addr), "{} assigned twice", addr);
        }
    }
    for (i, a) in assignments.iter().enumerate() {
        for b in &assignments[i + 1..] {
            assert!(!a.subnet.overlaps(&b.subnet));
        }
    }
    // every interface got exactly the address the allocator reported
    for iface in h.sim.topology().interfaces() {
        let addr = iface.address.expect("interface numbered");
        assert_eq!(h.sim.addresses().owner(addr), Some((iface.node, iface.id)));
    }
}

#[test]
fn test_overlapping_base_rejected() {
    let mut topo = Topology::new();
    let a = topo.add_node(Role::Backbone);
    let b = topo.add_node(Role::Backbone);
    let c = topo.add_node(Role::Backbone);
    let l1 = topo.add_link(a, b, LinkConfig::backbone()).unwrap();
    let l2 = topo.add_link(b, c, LinkConfig::backbone()).unwrap();

    let mut alloc = AddressAllocator::new();
    alloc.allocate(&mut topo, Ipv4Addr::new(10, 0, 0, 0), 16, l1).unwrap();
    let err = alloc
        .allocate(&mut topo, Ipv4Addr::new(10, 0, 5, 0), 24, l2)
        .unwrap_err();
    assert!(matches!(err, AllocationError::SubnetOverlap { owner, .. } if owner == l1));
    assert!(topo.interface_on(b, l2).unwrap().address.is_none());
}

#[test]
fn test_unknown_link_rejected() {
    let mut topo = Topology::new();
    let mut alloc = AddressAllocator::new();
    let err = alloc
        .allocate(&mut topo, Ipv4Addr::new(10, 0, 0, 0), 24, 3)
        .unwrap_err();
    assert_eq!(err, AllocationError::Topology(TopologyError::UnknownLink(3)));
}

#[test]
fn test_invalid_prefix_rejected() {
    let mut topo = Topology::new();
    let a = topo.add_node(Role::Backbone);
    let b = topo.add_node(Role::Backbone);
    let l = topo.add_link(a, b, LinkConfig::backbone()).unwrap();
    let mut alloc = AddressAllocator::new();
    assert_eq!(
        alloc.allocate(&mut topo, Ipv4Addr::new(10, 0, 0, 0), 31, l),
        Err(AllocationError::InvalidPrefix(31))
    );
}
