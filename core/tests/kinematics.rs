//! Movement tests: speed bounds, arena bounds, boundary resolution.

use outbreak_core::{
    individual::Individual,
    rng::RngBank,
    snapshot::{IndividualMemento, SimSnapshot},
    InfectionState, SimConfig, SimEngine, Vector2D,
};
use std::collections::HashMap;

/// Relative slack for float rounding after a rescale.
const EPS: f64 = 1e-6;

fn agent_at(id: u64, position: Vector2D, velocity: Vector2D) -> Individual {
    Individual {
        id,
        position,
        velocity,
        state: InfectionState::Healthy,
        contact_time: HashMap::new(),
        infection_time: 0.0,
        infection_duration: 25.0,
        alive: true,
    }
}

fn memento(id: u64, x: f64, y: f64, vx: f64, vy: f64) -> IndividualMemento {
    IndividualMemento {
        id,
        position_x: x,
        position_y: y,
        velocity_x: vx,
        velocity_y: vy,
        state_name: "healthy".into(),
        infection_time: 0.0,
        infection_duration: 25.0,
    }
}

#[test]
fn speed_and_position_stay_in_bounds_every_tick() {
    let config = SimConfig::default();
    let (min, max) = (config.min_speed(), config.max_speed());
    let (w, h) = (config.width, config.height);

    for seed in [1u64, 0xABCD, 0xDEAD_BEEF] {
        let mut engine = SimEngine::new(seed, config.clone()).expect("engine");
        engine.initialize(seed % 2 == 0);

        for _ in 0..2_000 {
            engine.update(config.fixed_dt);
            for ind in engine.individuals() {
                let speed = ind.speed();
                assert!(
                    speed >= min * (1.0 - EPS) && speed <= max * (1.0 + EPS),
                    "seed={seed} agent {} speed {speed} outside [{min}, {max}]",
                    ind.id
                );
                assert!(
                    (0.0..=w).contains(&ind.position.x) && (0.0..=h).contains(&ind.position.y),
                    "seed={seed} agent {} escaped the arena at {:?}",
                    ind.id,
                    ind.position
                );
            }
        }
    }
}

#[test]
fn stationary_agent_gets_a_heading_at_minimum_speed() {
    let config = SimConfig { steering_rate_per_second: 0.0, ..SimConfig::default() };
    let bank = RngBank::new(5);
    let mut ind = agent_at(0, Vector2D::new(400.0, 300.0), Vector2D::ZERO);

    ind.update(config.fixed_dt, &config, &[], &mut bank.for_agent(0, 1, 0));

    let speed = ind.speed();
    assert!(
        (speed - config.min_speed()).abs() <= config.min_speed() * EPS,
        "Expected minimum speed {} after reheading, got {speed}",
        config.min_speed()
    );
    assert!(ind.position != Vector2D::new(400.0, 300.0), "Agent should have moved");
}

#[test]
fn oversized_velocity_is_clamped_to_maximum() {
    let config = SimConfig::default();
    let bank = RngBank::new(6);
    let mut ind = agent_at(0, Vector2D::new(400.0, 300.0), Vector2D::new(300.0, 400.0));

    ind.update(config.fixed_dt, &config, &[], &mut bank.for_agent(0, 1, 0));

    assert!(
        ind.speed() <= config.max_speed() * (1.0 + EPS),
        "Speed {} exceeds maximum {}",
        ind.speed(),
        config.max_speed()
    );
}

/// A breach on an axis always ends in a bounce on that axis or an exit.
#[test]
fn boundary_breach_always_resolves() {
    let config = SimConfig::default();
    let bank = RngBank::new(0x5EED);
    let (mut bounced, mut exited) = (0, 0);

    for trial in 0..1_000u64 {
        let start = Vector2D::new(config.width - 0.01, config.height / 2.0);
        let mut ind = agent_at(trial, start, Vector2D::new(config.max_speed(), 0.0));

        let alive = ind.update(config.fixed_dt, &config, &[], &mut bank.for_agent(0, 1, trial));

        assert_eq!(alive, ind.is_alive(), "Return value must mirror the alive flag");
        assert!(ind.position.x <= config.width, "Position not clamped: {:?}", ind.position);
        if alive {
            assert!(ind.velocity.x < 0.0, "Surviving agent kept heading out: {:?}", ind.velocity);
            bounced += 1;
        } else {
            exited += 1;
        }
    }

    assert!(bounced > 350 && exited > 350, "Expected a fair coin, got {bounced} bounces / {exited} exits");
}

#[test]
fn corner_breach_resolves_both_axes() {
    let config = SimConfig { bounce_chance: 1.0, ..SimConfig::default() };
    let bank = RngBank::new(11);
    let v = config.max_speed() / 2f64.sqrt();
    let mut ind = agent_at(0, Vector2D::new(0.01, 0.01), Vector2D::new(-v, -v));

    assert!(ind.update(config.fixed_dt, &config, &[], &mut bank.for_agent(0, 1, 0)));
    assert!(ind.velocity.x > 0.0 && ind.velocity.y > 0.0, "Both components should flip: {:?}", ind.velocity);
    assert_eq!(ind.position, Vector2D::new(0.0, 0.0));
}

#[test]
fn always_bouncing_arena_never_loses_anyone() {
    let config = SimConfig { bounce_chance: 1.0, spawn_chance: 0.0, ..SimConfig::default() };
    let mut engine = SimEngine::new(21, config).expect("engine");
    engine.initialize(false);

    engine.run_ticks(3_000, 0.04);

    assert_eq!(engine.population(), 50, "Nobody should leave when every breach bounces");
}

#[test]
fn exiting_agent_is_removed_and_empty_arena_keeps_ticking() {
    let config = SimConfig { bounce_chance: 0.0, spawn_chance: 0.0, ..SimConfig::default() };
    let mut engine = SimEngine::new(3, config.clone()).expect("engine");
    engine
        .restore_snapshot(&SimSnapshot {
            individuals: vec![memento(7, config.width - 0.01, 300.0, config.max_speed(), 0.0)],
            simulation_time: 0.0,
            has_immunity: false,
            next_id: 8,
        })
        .expect("restore");

    let report = engine.update(0.04);
    assert_eq!(report.departed, 1);
    assert_eq!(engine.population(), 0);

    engine.run_ticks(100, 0.04);
    assert_eq!(engine.population(), 0);
    assert_eq!(engine.next_id(), 8, "Removal must not recycle ids");
    assert!((engine.simulation_time() - 101.0 * 0.04).abs() < 1e-9);
}
