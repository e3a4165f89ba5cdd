use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::engine::{Event, EventKind, Packet, PacketKind, ScheduleCmd, SimTime, US_PER_SEC};
use crate::traits::{AppId, Application, NodeId, SystemInspector};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoClientConfig {
    pub remote: Ipv4Addr,
    pub remote_port: u16,
    pub local_port: u16,
    pub max_packets: u32,
    pub interval_us: SimTime,
    pub packet_size: u32,
}

impl Default for EchoClientConfig {
    fn default() -> Self {
        Self {
            remote: Ipv4Addr::UNSPECIFIED,
            remote_port: 9,
            local_port: 49153,
            max_packets: 1,
            interval_us: US_PER_SEC,
            packet_size: 1024,
        }
    }
}

pub struct EchoClient {
    pub id: AppId,
    pub name: String,
    pub node: NodeId,
    pub config: EchoClientConfig,
    pub running: bool,
    pub sent: u64,
    pub received: u64,
    pub dropped: u64,
    pub failures: u64,
    pub rtts: Vec<SimTime>,
}

impl EchoClient {
    pub fn new(id: AppId, node: NodeId, config: EchoClientConfig) -> Self {
        Self {
            id,
            name: format!("echo-client@{}", node),
            node,
            config,
            running: false,
            sent: 0,
            received: 0,
            dropped: 0,
            failures: 0,
            rtts: Vec::new(),
        }
    }

    fn send(&mut self, now: SimTime, inspector: &dyn SystemInspector) -> Vec<ScheduleCmd> {
        let mut cmds = Vec::new();
        if (self.sent as u32) + 1 < self.config.max_packets {
            cmds.push(ScheduleCmd {
                delay: self.config.interval_us,
                node_id: self.node,
                kind: EventKind::AppSend { app: self.id },
            });
        }
        self.sent += 1;

        let (Some(local), Some(server)) = (
            inspector.address_of(self.node),
            inspector.node_of(self.config.remote),
        ) else {
            self.failures += 1;
            warn!("{}: {} is not an address in this network", self.name, self.config.remote);
            return cmds;
        };
        let packet = Packet {
            id: self.sent,
            kind: PacketKind::Request,
            src: SocketAddrV4::new(local, self.config.local_port),
            dst: SocketAddrV4::new(self.config.remote, self.config.remote_port),
            size: self.config.packet_size,
            sent_at: now,
        };
        match inspector.path_latency(self.node, server, packet.size) {
            Ok(delay) => {
                info!("{}: sent {} bytes to {}", self.name, packet.size, packet.dst);
                cmds.push(ScheduleCmd {
                    delay,
                    node_id: server,
                    kind: EventKind::PacketArrival { packet },
                });
            }
            Err(gap) => {
                // routes do not change mid-run, so this pair can never deliver
                self.failures += 1;
                warn!("{}: {}, delivery failed", self.name, gap);
            }
        }
        cmds
    }
}

impl Application for EchoClient {
    fn on_event(&mut self, event: &Event, inspector: &dyn SystemInspector) -> Vec<ScheduleCmd> {
        match &event.kind {
            EventKind::AppStart { .. } => {
                self.running = true;
                if self.config.max_packets == 0 {
                    return vec![];
                }
                vec![ScheduleCmd {
                    delay: 0,
                    node_id: self.node,
                    kind: EventKind::AppSend { app: self.id },
                }]
            }
            EventKind::AppStop { .. } => {
                self.running = false;
                vec![]
            }
            EventKind::AppSend { .. } => {
                if !self.running || self.sent >= self.config.max_packets as u64 {
                    return vec![];
                }
                self.send(event.time, inspector)
            }
            EventKind::PacketArrival { packet } if packet.kind == PacketKind::Echo => {
                if !self.running {
                    self.dropped += 1;
                    return vec![];
                }
                let rtt = event.time.saturating_sub(packet.sent_at);
                self.received += 1;
                self.rtts.push(rtt);
                info!("{}: received {} bytes from {}, rtt {}us", self.name, packet.size, packet.src, rtt);
                vec![]
            }
            _ => vec![],
        }
    }
    fn name(&self) -> &str { &self.name }
    fn kind(&self) -> &str { "UdpEchoClient" }
    fn node(&self) -> NodeId { self.node }
    fn port(&self) -> u16 { self.config.local_port }
    fn is_running(&self) -> bool { self.running }
    fn packets_sent(&self) -> u64 { self.sent }
    fn packets_received(&self) -> u64 { self.received }
    fn packets_dropped(&self) -> u64 { self.dropped }
    fn delivery_failures(&self) -> u64 { self.failures }
    fn round_trips(&self) -> &[SimTime] { &self.rtts }
}
