use netsim_core::*;

pub struct TestHarness {
    pub sim: Simulation,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_config(SimulationConfig {
            seed,
            ..SimulationConfig::default()
        })
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        let sim = Simulation::from_config(config).expect("scenario should build");
        Self { sim }
    }

    /// Two backbone nodes whose cells have `stations` stations each and no
    /// applications installed.
    pub fn bare(stations: u32) -> SimulationConfig {
        SimulationConfig {
            echo_server: None,
            echo_client: None,
            ..SimulationConfig::default()
        }
        .with_station_count(0, stations)
        .with_station_count(1, stations)
    }

    pub fn run(&mut self) -> u64 {
        self.sim.run()
    }

    pub fn run_for(&mut self, duration_ms: u64) -> u64 {
        let end = self.sim.now() + millis(duration_ms);
        self.sim.run_until(end)
    }

    pub fn app_name(&self, app: AppId) -> String {
        self.sim.apps()[app].name().to_string()
    }

    /// `(kind, time)` of every start/stop/send event fired for `app`.
    pub fn app_events(&self, app: AppId) -> Vec<(String, SimTime)> {
        let name = self.app_name(app);
        self.sim
            .trace()
            .records()
            .iter()
            .filter(|r| r.kind.starts_with("app-") && r.payload["app"] == name.as_str())
            .map(|r| (r.kind.clone(), r.time))
            .collect()
    }

    pub fn mobility_records(&self) -> Vec<&TraceRecord> {
        self.sim.trace().of_kind("mobility").collect()
    }

    pub fn station_positions(&self) -> Vec<(NodeId, Position)> {
        let topo = self.sim.topology();
        topo.nodes_with_role(Role::Station)
            .into_iter()
            .filter_map(|n| topo.position(n).map(|p| (n, p)))
            .collect()
    }

    /// One-way latency of `payload` bytes across the given links.
    pub fn expected_latency(&self, links: &[LinkId], payload: u32) -> SimTime {
        links
            .iter()
            .map(|&l| {
                self.sim
                    .topology()
                    .link(l)
                    .expect("link exists")
                    .config
                    .transit_time_us(payload + 28)
            })
            .sum()
    }
}
