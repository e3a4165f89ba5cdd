use crate::traits::{AppId, Application, NodeId};
use serde::{Deserialize, Serialize};

pub mod echo_client;
pub mod echo_server;

use echo_client::{EchoClient, EchoClientConfig};
use echo_server::{EchoServer, EchoServerConfig};

/// Closed set of installable applications.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AppKind {
    EchoServer(EchoServerConfig),
    EchoClient(EchoClientConfig),
}

pub fn create_application(id: AppId, node: NodeId, kind: AppKind) -> Box<dyn Application> {
    match kind {
        AppKind::EchoServer(cfg) => Box::new(EchoServer::new(id, node, cfg)),
        AppKind::EchoClient(cfg) => Box::new(EchoClient::new(id, node, cfg)),
    }
}
