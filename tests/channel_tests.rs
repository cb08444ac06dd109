//! Hand-off slots, the simulation loop and the perception stand-in

use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use traffic_signal_sim::simulation::{
    slot, spawn_perception, CountingPerception, Delivery, Direction, Frame, Orientation,
    PhaseEvent, Position, RunOptions, SignalState, SimConfig, SimId, SimVehicle, SimWorld,
    SimulationLoop, SwitchReason, VehicleCategory, VehicleId,
};

fn quiet_world() -> SimWorld {
    let config = SimConfig {
        spawn_probability: 0.0,
        ..SimConfig::seeded(5)
    };
    SimWorld::new(config).unwrap()
}

fn frame(time: f64, phase: Orientation, horizontal: usize, vertical: usize) -> Frame {
    let mut vehicles = Vec::new();
    for i in 0..horizontal {
        vehicles.push(SimVehicle::new(
            VehicleId(SimId(i)),
            VehicleCategory::Car,
            Direction::Right,
            Position::new(10.0 + 100.0 * i as f32, 350.0),
        ));
    }
    for i in 0..vertical {
        vehicles.push(SimVehicle::new(
            VehicleId(SimId(horizontal + i)),
            VehicleCategory::Car,
            Direction::Up,
            Position::new(450.0, 790.0 - 100.0 * i as f32),
        ));
    }
    let signal_state = match phase {
        Orientation::Horizontal => SignalState::GreenHorizontal,
        Orientation::Vertical => SignalState::GreenVertical,
    };
    Frame {
        tick: (time * 60.0) as u64,
        time,
        phase,
        signal_state,
        vehicles,
        lights: Vec::new(),
    }
}

#[test]
fn test_slot_keeps_only_the_latest_value() {
    let (tx, rx) = slot::<u32>();
    assert_eq!(tx.publish(1), Delivery::Delivered);
    assert_eq!(tx.publish(2), Delivery::Replaced);
    assert_eq!(rx.try_take(), Some(2));
    assert_eq!(rx.try_take(), None);

    assert_eq!(tx.publish(3), Delivery::Delivered);
    assert_eq!(rx.try_take(), Some(3));
}

#[test]
fn test_slot_wait_times_out_then_disconnects() {
    let (tx, rx) = slot::<u32>();
    assert_eq!(
        rx.wait(Duration::from_millis(1)),
        Err(RecvTimeoutError::Timeout)
    );
    tx.publish(9);
    drop(tx);
    // A pending value is still handed over after the producer is gone
    assert_eq!(rx.wait(Duration::from_millis(1)), Ok(9));
    assert_eq!(
        rx.wait(Duration::from_millis(1)),
        Err(RecvTimeoutError::Disconnected)
    );
}

#[test]
fn test_unread_frames_are_replaced() {
    let (mut sim_loop, link) = SimulationLoop::connect(quiet_world());
    for _ in 0..3 {
        assert_eq!(sim_loop.step(), None);
    }

    let stats = sim_loop.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.frames_delivered, 1);
    assert_eq!(stats.frames_replaced, 2);

    let latest = link.frames.try_take().unwrap();
    assert_eq!(latest.tick, 3);
    assert!(link.frames.try_take().is_none());
}

#[test]
fn test_frame_is_an_independent_copy() {
    let mut world = quiet_world();
    world.place_vehicle(
        VehicleCategory::Car,
        Direction::Right,
        Position::new(0.0, 350.0),
    );
    let frame = world.snapshot();
    let delta = world.config().tick_delta();
    world.tick(delta);

    assert_eq!(frame.vehicles[0].position, Position::new(0.0, 350.0));
    assert_eq!(world.vehicles[0].position, Position::new(3.0, 350.0));
    assert_eq!(frame.tick, 0);
    assert_eq!(frame.lights.len(), 4);
}

#[test]
fn test_decision_triggers_external_switch() {
    let (mut sim_loop, link) = SimulationLoop::connect(quiet_world());
    link.decisions.publish(" Vertical ".to_string());

    let event = sim_loop.step();
    assert_eq!(
        event,
        Some(PhaseEvent::YellowStarted {
            leaving: Orientation::Horizontal,
            reason: SwitchReason::External,
        })
    );
    assert!(sim_loop.world().controller().is_switching());
    assert_eq!(sim_loop.stats().decisions_received, 1);
    assert_eq!(sim_loop.stats().decisions_applied, 1);
}

#[test]
fn test_unusable_decisions_are_ignored() {
    let (mut sim_loop, link) = SimulationLoop::connect(quiet_world());

    link.decisions.publish("left".to_string());
    assert_eq!(sim_loop.step(), None);

    link.decisions.publish("horizontal".to_string());
    assert_eq!(sim_loop.step(), None);

    assert_eq!(
        sim_loop.world().signal_state(),
        SignalState::GreenHorizontal
    );
    assert_eq!(sim_loop.stats().decisions_received, 2);
    assert_eq!(sim_loop.stats().decisions_applied, 0);
}

#[test]
fn test_decisions_ignored_during_emergency() {
    let mut world = quiet_world();
    // Northbound ambulance far from the box: preemption wants vertical
    world.place_vehicle(
        VehicleCategory::Ambulance,
        Direction::Up,
        Position::new(450.0, 850.0),
    );
    let (mut sim_loop, link) = SimulationLoop::connect(world);
    sim_loop.step();
    assert!(sim_loop.world().emergency_mode());

    link.decisions.publish("horizontal".to_string());
    assert_eq!(sim_loop.step(), None);
    assert_eq!(sim_loop.stats().decisions_applied, 0);
}

#[test]
fn test_run_honours_tick_limit_and_stop() {
    let (_stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    let (mut sim_loop, _link) = SimulationLoop::connect(quiet_world());
    let mut seen = Vec::new();
    let options = RunOptions {
        max_ticks: Some(5),
        paced: false,
    };
    let stats = sim_loop.run(&stop_rx, options, |world| seen.push(world.tick_count));
    assert_eq!(stats.ticks, 5);
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);

    // A pending stop message ends the run before any tick
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    stop_tx.send(()).unwrap();
    let stats = sim_loop.run(&stop_rx, RunOptions::default(), |_| {});
    assert_eq!(stats.ticks, 5);

    // So does a dropped stop handle
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    drop(stop_tx);
    let stats = sim_loop.run(&stop_rx, RunOptions::default(), |_| {});
    assert_eq!(stats.ticks, 5);
}

#[test]
fn test_paced_run_holds_tick_rate() {
    let config = SimConfig {
        spawn_probability: 0.0,
        tick_rate: 100,
        ..SimConfig::seeded(5)
    };
    let (_stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    let (mut sim_loop, _link) = SimulationLoop::connect(SimWorld::new(config).unwrap());
    let started = Instant::now();
    let options = RunOptions {
        max_ticks: Some(10),
        paced: true,
    };
    sim_loop.run(&stop_rx, options, |_| {});
    assert!(started.elapsed() >= Duration::from_millis(90));
}

#[test]
fn test_counting_perception_recommendations() {
    let mut perception = CountingPerception::default();

    // First frame only starts the decision clock
    assert_eq!(perception.observe(&frame(0.0, Orientation::Horizontal, 0, 5)), None);
    assert_eq!(
        perception.observe(&frame(31.0, Orientation::Horizontal, 0, 5)),
        Some(Orientation::Vertical)
    );
    // Too soon after the last recommendation
    assert_eq!(perception.observe(&frame(40.0, Orientation::Horizontal, 0, 5)), None);
    // Already serving the busier approach
    assert_eq!(perception.observe(&frame(70.0, Orientation::Vertical, 0, 5)), None);
    // 3 / (2 + 1) = 1.0 is not dominant
    assert_eq!(perception.observe(&frame(80.0, Orientation::Vertical, 3, 2)), None);
    assert_eq!(
        perception.observe(&frame(90.0, Orientation::Vertical, 6, 2)),
        Some(Orientation::Horizontal)
    );
}

#[test]
fn test_perception_thread_drives_the_controller() {
    let mut world = quiet_world();
    // Northbound queue held at the red light
    for y in [580.0, 680.0, 780.0, 880.0] {
        world.place_vehicle(VehicleCategory::Car, Direction::Up, Position::new(450.0, y));
    }
    let (mut sim_loop, link) = SimulationLoop::connect(world);
    let handle = spawn_perception(
        link,
        CountingPerception::new(0.0, 1.5),
        Duration::from_millis(1),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut event = None;
    while event.is_none() && Instant::now() < deadline {
        event = sim_loop.step();
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(
        event,
        Some(PhaseEvent::YellowStarted {
            leaving: Orientation::Horizontal,
            reason: SwitchReason::External,
        })
    );

    drop(sim_loop);
    let report = handle.join().unwrap();
    assert!(report.frames_seen > 0);
    assert!(report.decisions_sent > 0);
}
