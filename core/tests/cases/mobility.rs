use crate::common::TestHarness;
use netsim_core::*;

fn fast_walkers() -> SimulationConfig {
    let mut config = TestHarness::bare(18);
    config.cells[1].grid.min_y = -50.0;
    for cell in &mut config.cells {
        cell.walk.speed_min = 30.0;
        cell.walk.speed_max = 45.0;
    }
    config.stop_time_us = secs(60.0);
    config
}

#[test]
fn test_positions_stay_inside_bound_box() {
    let mut h = TestHarness::with_config(fast_walkers());
    h.run();

    let bounds = Bounds::default();
    let records = h.mobility_records();
    assert!(!records.is_empty());
    for r in records {
        let p = Position::new(r.payload["x"].as_f64().unwrap(), r.payload["y"].as_f64().unwrap());
        assert!(bounds.contains(&p), "node {} escaped to {:?} at {}", r.node_id, p, r.time);
    }
    for (node, p) in h.station_positions() {
        assert!(bounds.contains(&p), "node {} ended at {:?}", node, p);
    }
}

#[test]
fn test_tick_count_is_bounded_by_stop_time() {
    let mut h = TestHarness::new();
    h.run();

    // ticks at 0s, 1s, ..., 10s for each of the six stations
    let stations = h.sim.topology().nodes_with_role(Role::Station);
    assert_eq!(stations.len(), 6);
    for sta in &stations {
        let ticks: Vec<SimTime> = h
            .sim
            .trace()
            .for_node(*sta)
            .filter(|r| r.kind == "mobility")
            .map(|r| r.time)
            .collect();
        assert_eq!(ticks, (0..=10).map(|s| secs(s as f64)).collect::<Vec<_>>());
    }
    assert_eq!(h.mobility_records().len(), 66);
}

#[test]
fn test_access_points_never_move() {
    let mut h = TestHarness::new();
    let before: Vec<Option<Position>> = h
        .sim
        .backbone()
        .iter()
        .map(|&n| h.sim.topology().position(n))
        .collect();
    h.run();

    for (i, &ap) in h.sim.backbone().iter().enumerate() {
        assert_eq!(h.sim.topology().position(ap), before[i]);
        assert_eq!(h.sim.trace().for_node(ap).filter(|r| r.kind == "mobility").count(), 0);
    }
    assert_eq!(before[0], Some(Position::new(1.0, 1.0)));
    assert_eq!(before[1], Some(Position::new(50.0, 50.0)));

    let ap = h.sim.backbone()[0];
    assert_eq!(
        h.sim.topology_mut().set_position(ap, Position::new(3.0, 3.0)),
        Err(TopologyError::FixedPosition(ap))
    );
}

#[test]
fn test_initial_grid_layout() {
    let h = TestHarness::new();
    let cell1 = &h.sim.cells()[1];
    let got: Vec<Position> = cell1
        .stations
        .iter()
        .map(|&s| h.sim.topology().position(s).unwrap())
        .collect();
    assert_eq!(
        got,
        vec![Position::new(40.0, 30.0), Position::new(45.0, 30.0), Position::new(50.0, 30.0)]
    );

    let grid = GridLayout::default();
    assert_eq!(grid.position(3), Position::new(0.0, 10.0));
    let column = GridLayout {
        order: GridOrder::ColumnFirst,
        ..grid
    };
    assert_eq!(column.position(3), Position::new(5.0, 0.0));
}

#[test]
fn test_walk_moves_at_sampled_speed() {
    let params = RandomWalkParams::default();
    let mut engine = MobilityEngine::new(3);
    engine.register(9, params, 0);
    let start = Position::new(0.0, 0.0);
    let next = engine.step(9, start, secs(1.0)).unwrap();

    let d = ((next.x - start.x).powi(2) + (next.y - start.y).powi(2)).sqrt();
    assert!(d >= params.speed_min - 1e-9 && d <= params.speed_max + 1e-9, "moved {}", d);
    assert!(engine.step(42, start, secs(1.0)).is_none());
}

#[test]
fn test_boundary_hit_clamps_and_redirects() {
    let params = RandomWalkParams {
        bounds: Bounds::new(0.0, 1.0, 0.0, 1.0),
        speed_min: 100.0,
        speed_max: 100.0,
        ..RandomWalkParams::default()
    };
    let mut engine = MobilityEngine::new(11);
    engine.register(0, params, 0);
    let mut pos = Position::new(0.5, 0.5);
    for t in 1..=20 {
        pos = engine.step(0, pos, secs(t as f64)).unwrap();
        assert!(params.bounds.contains(&pos));
        // every step overshoots a 1m box at 100 m/s, so a redirect is forced
        assert_eq!(engine.state(0).unwrap().last_redirect, secs(t as f64));
    }
}

#[test]
fn test_quarantined_station_stops_and_run_continues() {
    let mut h = TestHarness::new();
    let sta = h.sim.cells()[0].stations[0];
    let start = h.sim.topology().position(sta);
    h.sim.quarantine(sta, "pinned for the test");
    let fired = h.run();

    assert!(h.sim.quarantined().contains(&sta));
    assert!(!h.sim.mobility().is_mobile(sta));
    assert_eq!(h.sim.topology().position(sta), start);

    let ticks: Vec<&TraceRecord> = h.sim.trace().for_node(sta).filter(|r| r.kind == "mobility").collect();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].payload["skipped"], true);

    // the other five stations keep walking
    assert_eq!(h.mobility_records().len(), 1 + 5 * 11);
    assert_eq!(fired as usize, h.sim.trace().len());
}
