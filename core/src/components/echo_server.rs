use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{Event, EventKind, Packet, PacketKind, ScheduleCmd};
use crate::traits::{AppId, Application, NodeId, SystemInspector};
use std::net::SocketAddrV4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoServerConfig {
    pub port: u16,
}

impl Default for EchoServerConfig {
    fn default() -> Self {
        Self { port: 9 }
    }
}

/// Sends every request it receives back to where it came from.
pub struct EchoServer {
    pub id: AppId,
    pub name: String,
    pub node: NodeId,
    pub config: EchoServerConfig,
    pub running: bool,
    pub received: u64,
    pub echoed: u64,
    pub dropped: u64,
    pub failures: u64,
}

impl EchoServer {
    pub fn new(id: AppId, node: NodeId, config: EchoServerConfig) -> Self {
        Self {
            id,
            name: format!("echo-server@{}", node),
            node,
            config,
            running: false,
            received: 0,
            echoed: 0,
            dropped: 0,
            failures: 0,
        }
    }

    fn echo(&mut self, request: Packet, inspector: &dyn SystemInspector) -> Vec<ScheduleCmd> {
        let Some(client) = inspector.node_of(*request.src.ip()) else {
            self.failures += 1;
            warn!("{}: no node owns {}, reply dropped", self.name, request.src);
            return vec![];
        };
        let reply = Packet {
            id: request.id,
            kind: PacketKind::Echo,
            src: SocketAddrV4::new(*request.dst.ip(), self.config.port),
            dst: request.src,
            size: request.size,
            sent_at: request.sent_at,
        };
        match inspector.path_latency(self.node, client, reply.size) {
            Ok(delay) => {
                self.echoed += 1;
                info!("{}: echoing {} bytes to {}", self.name, reply.size, reply.dst);
                vec![ScheduleCmd {
                    delay,
                    node_id: client,
                    kind: EventKind::PacketArrival { packet: reply },
                }]
            }
            Err(gap) => {
                self.failures += 1;
                warn!("{}: {}, reply dropped", self.name, gap);
                vec![]
            }
        }
    }
}

impl Application for EchoServer {
    fn on_event(&mut self, event: &Event, inspector: &dyn SystemInspector) -> Vec<ScheduleCmd> {
        match &event.kind {
            EventKind::AppStart { .. } => {
                self.running = true;
                vec![]
            }
            EventKind::AppStop { .. } => {
                self.running = false;
                vec![]
            }
            EventKind::PacketArrival { packet } if packet.kind == PacketKind::Request => {
                if !self.running {
                    self.dropped += 1;
                    return vec![];
                }
                self.received += 1;
                info!("{}: received {} bytes from {}", self.name, packet.size, packet.src);
                self.echo(packet.clone(), inspector)
            }
            _ => vec![],
        }
    }
    fn name(&self) -> &str { &self.name }
    fn kind(&self) -> &str { "UdpEchoServer" }
    fn node(&self) -> NodeId { self.node }
    fn port(&self) -> u16 { self.config.port }
    fn is_running(&self) -> bool { self.running }
    fn packets_received(&self) -> u64 { self.received }
    fn packets_echoed(&self) -> u64 { self.echoed }
    fn packets_dropped(&self) -> u64 { self.dropped }
    fn delivery_failures(&self) -> u64 { self.failures }
}
