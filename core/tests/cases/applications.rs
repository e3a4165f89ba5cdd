use crate::common::TestHarness;
use netsim_core::*;
use std::net::Ipv4Addr;

#[test]
fn test_echo_round_trip() {
    let mut h = TestHarness::new();
    h.run();

    let sim = &h.sim;
    let server = &sim.apps()[0];
    let client = &sim.apps()[1];
    assert_eq!(server.kind(), "UdpEchoServer");
    assert_eq!(client.kind(), "UdpEchoClient");
    assert_eq!(client.packets_sent(), 1);
    assert_eq!(server.packets_received(), 1);
    assert_eq!(server.packets_echoed(), 1);
    assert_eq!(server.packets_sent(), 0);
    assert_eq!(client.packets_received(), 1);

    let links = [sim.cells()[1].link, sim.backbone_link().unwrap(), sim.cells()[0].link];
    let one_way = h.expected_latency(&links, 1024);
    assert_eq!(client.round_trips(), &[2 * one_way]);

    let arrivals: Vec<&TraceRecord> = sim.trace().of_kind("packet-arrival").collect();
    assert_eq!(arrivals.len(), 2);
    assert_eq!(arrivals[0].time, secs(2.0) + one_way);
    assert_eq!(arrivals[0].node_id, server.node());
    assert_eq!(arrivals[0].payload["dst"], "10.1.2.2:9");
    assert_eq!(arrivals[1].time, secs(2.0) + 2 * one_way);
    assert_eq!(arrivals[1].node_id, client.node());
}

#[test]
fn test_client_stops_after_max_packets() {
    let mut config = SimulationConfig::default();
    if let Some(client) = config.echo_client.as_mut() {
        client.max_packets = 3;
        client.interval_us = secs(2.0);
    }
    let mut h = TestHarness::with_config(config);
    h.run();

    let sends: Vec<SimTime> = h
        .app_events(1)
        .into_iter()
        .filter(|(kind, _)| kind == "app-send")
        .map(|(_, t)| t)
        .collect();
    assert_eq!(sends, vec![secs(2.0), secs(4.0), secs(6.0)]);
    assert_eq!(h.sim.apps()[1].packets_received(), 3);

    let stats = h.sim.delivery_stats();
    assert_eq!(stats.rtt_count(), 3);
    assert!(stats.rtt_percentile(50.0).unwrap() > 0);
    let summary = stats.summary();
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.echoed, 3);
    assert_eq!(summary.received, 6);
}

#[test]
fn test_unknown_remote_is_a_permanent_failure() {
    let mut config = SimulationConfig::default();
    if let Some(client) = config.echo_client.as_mut() {
        client.remote = Some(Ipv4Addr::new(192, 168, 7, 7));
    }
    let mut h = TestHarness::with_config(config);
    h.run();

    let client = &h.sim.apps()[1];
    assert_eq!(client.packets_sent(), 1);
    assert_eq!(client.delivery_failures(), 1);
    assert_eq!(client.packets_received(), 0);
    assert_eq!(h.sim.trace().of_kind("packet-arrival").count(), 0);
}

#[test]
fn test_server_not_yet_running_drops_requests() {
    let mut config = SimulationConfig::default();
    if let Some(server) = config.echo_server.as_mut() {
        server.start_us = secs(5.0);
    }
    let mut h = TestHarness::with_config(config);
    h.run();

    assert_eq!(h.sim.apps()[0].packets_dropped(), 1);
    assert_eq!(h.sim.apps()[1].packets_received(), 0);
    assert_eq!(h.sim.delivery_stats().summary().rtt_samples, 0);
}

#[test]
fn test_link_activation_reaches_capture_observer() {
    let mut h = TestHarness::new();
    let capture = CaptureRegistry::new();
    let handle = capture.handle();
    h.sim.add_observer(Box::new(capture));
    h.run();

    let links = handle.read().unwrap().clone();
    assert_eq!(links, vec![(0, 0), (1, 0), (2, 0)]);
    // link activation precedes everything else at t=0
    let first: Vec<&str> = h.sim.trace().records()[..3].iter().map(|r| r.kind.as_str()).collect();
    assert_eq!(first, vec!["link-up"; 3]);
}

#[test]
fn test_trace_exports_as_json() {
    let mut h = TestHarness::new();
    h.run();
    let json = h.sim.trace().to_json().unwrap();
    let parsed: Vec<TraceRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), h.sim.trace().len());
}
