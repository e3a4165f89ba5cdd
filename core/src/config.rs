//! Build-time configuration for the driver.
//!
//! `SimulationConfig::default()` describes the reference scenario: a 5 Mbps
//! backbone between two access points, each serving three random-walking
//! stations, with a UDP echo exchange between the two cells.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::engine::{secs, SimTime, US_PER_SEC};
use crate::error::ConfigurationError;
use crate::mobility::{Bounds, GridLayout, Position, RandomWalkParams};
use crate::topology::LinkConfig;

/// Stations beyond this make the default grid spill out of its bound box.
pub const MAX_STATIONS_PER_CELL: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubnetConfig {
    pub base: Ipv4Addr,
    pub prefix_len: u8,
}

impl SubnetConfig {
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Self {
        Self { base, prefix_len }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackboneConfig {
    pub link: LinkConfig,
    pub subnet: SubnetConfig,
    pub positions: [Position; 2],
}

impl Default for BackboneConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::backbone(),
            subnet: SubnetConfig::new(Ipv4Addr::new(10, 1, 1, 0), 24),
            positions: [Position::new(1.0, 1.0), Position::new(50.0, 50.0)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub ap: usize,
    pub station_count: u32,
    pub link: LinkConfig,
    pub subnet: SubnetConfig,
    pub grid: GridLayout,
    pub walk: RandomWalkParams,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            ap: 0,
            station_count: 3,
            link: LinkConfig::wireless(),
            subnet: SubnetConfig::new(Ipv4Addr::new(10, 1, 2, 0), 24),
            grid: GridLayout::default(),
            walk: RandomWalkParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationRef {
    Index(u32),
    Last,
}

impl StationRef {
    pub fn resolve(&self, count: u32) -> Option<u32> {
        match *self {
            StationRef::Index(i) if i < count => Some(i),
            StationRef::Last if count > 0 => Some(count - 1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoServerSetup {
    pub cell: usize,
    pub station: StationRef,
    pub port: u16,
    pub start_us: SimTime,
    pub stop_us: SimTime,
}

impl Default for EchoServerSetup {
    fn default() -> Self {
        Self {
            cell: 0,
            station: StationRef::Index(0),
            port: 9,
            start_us: secs(1.0),
            stop_us: secs(10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoClientSetup {
    pub cell: usize,
    pub station: StationRef,
    /// Defaults to the echo server's address.
    pub remote: Option<Ipv4Addr>,
    pub remote_port: u16,
    pub max_packets: u32,
    pub interval_us: SimTime,
    pub packet_size: u32,
    pub start_us: SimTime,
    pub stop_us: SimTime,
}

impl Default for EchoClientSetup {
    fn default() -> Self {
        Self {
            cell: 1,
            station: StationRef::Last,
            remote: None,
            remote_port: 9,
            max_packets: 1,
            interval_us: US_PER_SEC,
            packet_size: 1024,
            start_us: secs(2.0),
            stop_us: secs(10.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub backbone: BackboneConfig,
    pub cells: Vec<CellConfig>,
    pub echo_server: Option<EchoServerSetup>,
    pub echo_client: Option<EchoClientSetup>,
    pub stop_time_us: SimTime,
    pub seed: u64,
    pub max_stations_per_cell: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let cell0 = CellConfig::default();
        let cell1 = CellConfig {
            ap: 1,
            subnet: SubnetConfig::new(Ipv4Addr::new(10, 1, 3, 0), 24),
            grid: GridLayout {
                min_x: 40.0,
                min_y: 30.0,
                ..GridLayout::default()
            },
            ..CellConfig::default()
        };
        Self {
            backbone: BackboneConfig::default(),
            cells: vec![cell0, cell1],
            echo_server: Some(EchoServerSetup::default()),
            echo_client: Some(EchoClientSetup::default()),
            stop_time_us: secs(10.0),
            seed: 1,
            max_stations_per_cell: MAX_STATIONS_PER_CELL,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::Read(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn with_station_count(mut self, cell: usize, count: u32) -> Self {
        if let Some(c) = self.cells.get_mut(cell) {
            c.station_count = count;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.stop_time_us == 0 {
            return Err(ConfigurationError::ZeroStopTime);
        }

        for (idx, cell) in self.cells.iter().enumerate() {
            if cell.station_count > self.max_stations_per_cell {
                return Err(ConfigurationError::TooManyStations {
                    cell: idx,
                    count: cell.station_count,
                    max: self.max_stations_per_cell,
                });
            }
            validate_cell(idx, cell)?;
            for station in 0..cell.station_count {
                let p = cell.grid.position(station);
                if !cell.walk.bounds.contains(&p) {
                    return Err(ConfigurationError::GridExceedsBounds {
                        cell: idx,
                        station,
                        x: p.x,
                        y: p.y,
                    });
                }
            }
        }

        if let Some(server) = &self.echo_server {
            self.validate_endpoint("echo server", server.cell, server.station, server.start_us, server.stop_us)?;
        }
        if let Some(client) = &self.echo_client {
            self.validate_endpoint("echo client", client.cell, client.station, client.start_us, client.stop_us)?;
            if client.interval_us == 0 && client.max_packets > 1 {
                return Err(ConfigurationError::InvalidApplication {
                    app: "echo client".into(),
                    reason: "interval must be positive when sending more than one packet".into(),
                });
            }
        }
        Ok(())
    }

    fn validate_endpoint(
        &self,
        app: &str,
        cell: usize,
        station: StationRef,
        start: SimTime,
        stop: SimTime,
    ) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidApplication {
            app: app.to_string(),
            reason,
        };
        let Some(c) = self.cells.get(cell) else {
            return Err(invalid(format!("cell {cell} does not exist")));
        };
        if station.resolve(c.station_count).is_none() {
            return Err(invalid(format!(
                "station {:?} does not exist in cell {cell} ({} stations)",
                station, c.station_count
            )));
        }
        if stop < start {
            return Err(invalid(format!("stops at {stop}us before starting at {start}us")));
        }
        Ok(())
    }
}

fn validate_cell(idx: usize, cell: &CellConfig) -> Result<(), ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidCell {
        cell: idx,
        reason: reason.to_string(),
    };
    if cell.ap > 1 {
        return Err(invalid("access point must be backbone node 0 or 1"));
    }
    let walk: &RandomWalkParams = &cell.walk;
    let bounds: &Bounds = &walk.bounds;
    if !bounds.is_valid() {
        return Err(invalid("bound box is empty or not finite"));
    }
    if !(walk.speed_min >= 0.0 && walk.speed_min <= walk.speed_max && walk.speed_max.is_finite()) {
        return Err(invalid("speed range must satisfy 0 <= min <= max"));
    }
    if walk.step_interval_us == 0 {
        return Err(invalid("step interval must be positive"));
    }
    if cell.grid.grid_width == 0 {
        return Err(invalid("grid width must be positive"));
    }
    Ok(())
}
