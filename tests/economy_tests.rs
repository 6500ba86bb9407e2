//! Station economy validation tests
//!
//! Leveling, purchases, the service cycle and configuration loading.

use carwash_sim::simulation::{
    format_money, reward_for_level, service_duration_for_level, upgrade_cost_for_level,
    ConfigError, Ledger, Position, SimConfig, SimEventKind, SimId, SimStation, SimWorld,
    StationConfig, StationError, StationEvent, VehicleId, VehicleState, Wallet,
};

fn id(n: usize) -> VehicleId {
    VehicleId(SimId(n))
}

fn fast_station() -> SimStation {
    SimStation::new(StationConfig {
        base_service_duration: 1.0,
        service_gap: 0.0,
        ..StationConfig::default()
    })
}

#[test]
fn test_wallet_spending() {
    let mut wallet = Wallet::new(100.0);
    assert!(wallet.can_afford(100.0));
    assert!(wallet.try_spend(60.0));
    assert_eq!(wallet.balance(), 40.0);

    // Cannot afford expensive item
    assert!(!wallet.try_spend(50.0));
    assert_eq!(wallet.balance(), 40.0);

    wallet.add_funds(15.0);
    assert_eq!(wallet.balance(), 55.0);
    assert_eq!(wallet.total_earned, 15.0);
    assert_eq!(wallet.total_spent, 60.0);
}

#[test]
fn test_two_upgrades() {
    let mut station = SimStation::new(StationConfig::default());
    let mut wallet = Wallet::new(1000.0);

    assert_eq!(station.try_upgrade(&mut wallet), Ok(2));
    assert_eq!(station.try_upgrade(&mut wallet), Ok(3));

    assert_eq!(station.level(), 3);
    assert!((station.service_duration() - 7.6).abs() < 1e-4);
    assert!((station.reward_per_service() - 39.0).abs() < 1e-4);
    // 100 for level 2, 150 for level 3
    assert!((wallet.balance() - 750.0).abs() < 1e-3);
    assert!((station.next_upgrade_cost() - 225.0).abs() < 1e-3);
}

#[test]
fn test_leveling_is_monotonic_and_floored() {
    let config = StationConfig {
        max_level: 20,
        ..StationConfig::default()
    };
    for level in 1..20 {
        let next = level + 1;
        assert!(
            service_duration_for_level(&config, next) <= service_duration_for_level(&config, level)
        );
        assert!(reward_for_level(&config, next) > reward_for_level(&config, level));
        assert!(upgrade_cost_for_level(&config, next) > upgrade_cost_for_level(&config, level));
    }
    assert_eq!(service_duration_for_level(&config, 20), config.min_service_duration);
}

#[test]
fn test_upgrade_stops_at_max_level() {
    let mut station = SimStation::new(StationConfig {
        max_level: 2,
        ..StationConfig::default()
    });
    let mut wallet = Wallet::new(10_000.0);

    assert_eq!(station.try_upgrade(&mut wallet), Ok(2));
    assert!(station.is_max_level());
    let balance = wallet.balance();
    assert_eq!(station.try_upgrade(&mut wallet), Err(StationError::MaxLevel(2)));
    assert_eq!(wallet.balance(), balance);
}

#[test]
fn test_upgrade_needs_funds() {
    let mut station = SimStation::new(StationConfig::default());
    let mut wallet = Wallet::new(50.0);

    match station.try_upgrade(&mut wallet) {
        Err(StationError::InsufficientFunds { needed, available }) => {
            assert_eq!(needed, 100.0);
            assert_eq!(available, 50.0);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert_eq!(station.level(), 1);
    assert_eq!(wallet.balance(), 50.0);
}

#[test]
fn test_advertising_bought_once() {
    let mut config = SimConfig::default();
    config.starting_balance = 1000.0;
    let mut world = SimWorld::from_config_with_seed(config, 1);
    let before = world.gate.diversion_probability();

    let probability = world.buy_advertising().expect("first purchase");
    assert!((probability - (before + 0.2)).abs() < 1e-5);
    assert!(world.station.has_advertising());
    assert_eq!(world.wallet.balance(), 750.0);

    assert_eq!(world.buy_advertising(), Err(StationError::AlreadyPurchased));
    assert_eq!(world.wallet.balance(), 750.0);
    assert!((world.gate.diversion_probability() - probability).abs() < 1e-6);
}

#[test]
fn test_advertising_probability_is_clamped() {
    let mut config = SimConfig::default();
    config.starting_balance = 1000.0;
    config.gate.diversion_probability = 0.9;
    let mut world = SimWorld::from_config_with_seed(config, 1);

    assert_eq!(world.buy_advertising(), Ok(1.0));
}

#[test]
fn test_station_unlock() {
    let mut station = SimStation::new(StationConfig {
        start_unlocked: false,
        ..StationConfig::default()
    });
    assert_eq!(station.admit(id(0), 0.0), Err(StationError::Locked));

    let mut poor = Wallet::new(400.0);
    assert!(matches!(
        station.try_unlock(&mut poor),
        Err(StationError::InsufficientFunds { .. })
    ));
    assert!(!station.is_unlocked());

    let mut wallet = Wallet::new(500.0);
    assert_eq!(station.try_unlock(&mut wallet), Ok(()));
    assert!(station.is_unlocked());
    assert_eq!(wallet.balance(), 0.0);
    assert_eq!(station.try_unlock(&mut wallet), Err(StationError::AlreadyUnlocked));
    assert_eq!(station.admit(id(0), 0.0), Ok(()));
}

#[test]
fn test_locked_station_turns_vehicles_away() {
    let mut config = SimConfig::default();
    config.station.start_unlocked = false;
    config.gate.diversion_probability = 1.0;
    let mut world = SimWorld::from_config_with_seed(config, 4);

    for _ in 0..600 {
        world.tick(0.1);
    }
    assert_eq!(world.stats.total_diverted, 0);
    assert!(world.stats.rejected_station_locked > 0);
    assert_eq!(world.station.total_serviced, 0);
}

#[test]
fn test_queue_rejects_when_full() {
    let mut station = SimStation::new(StationConfig {
        queue_capacity: 2,
        ..StationConfig::default()
    });
    assert_eq!(station.admit(id(0), 0.0), Ok(()));
    assert_eq!(station.admit(id(1), 0.0), Ok(()));
    assert_eq!(
        station.admit(id(2), 0.0),
        Err(StationError::QueueFull { capacity: 2 })
    );
    // One in service, one waiting
    assert_eq!(station.in_service(), Some(id(0)));
    assert_eq!(station.queue_len(), 1);
    assert_eq!(station.occupancy(), 2);
}

#[test]
fn test_service_cycle_is_fifo_and_pays_out() {
    let mut station = fast_station();
    let mut wallet = Wallet::new(0.0);

    station.admit(id(0), 0.0).expect("admit");
    station.admit(id(1), 120.0).expect("admit");
    station.admit(id(2), 0.0).expect("admit");

    let mut started = Vec::new();
    let mut completed = Vec::new();
    for _ in 0..100 {
        for event in station.tick(0.1, &mut wallet) {
            match event {
                StationEvent::ServiceStarted { vehicle } => started.push(vehicle),
                StationEvent::ServiceCompleted { vehicle, .. } => completed.push(vehicle),
            }
        }
    }

    assert_eq!(started, vec![id(0), id(1), id(2)]);
    assert_eq!(completed, vec![id(0), id(1), id(2)]);
    assert_eq!(station.total_serviced, 3);
    // Three base rewards plus one golden bonus
    assert!((wallet.balance() - (3.0 * 15.0 + 120.0)).abs() < 1e-3);
    assert!(!station.is_cycle_running());
}

#[test]
fn test_service_takes_the_level_duration() {
    let mut station = SimStation::new(StationConfig::default());
    let mut wallet = Wallet::new(0.0);
    station.admit(id(0), 0.0).expect("admit");

    // 99 ticks of 0.1s stay short of the 10s wash
    for _ in 0..99 {
        station.tick(0.1, &mut wallet);
    }
    assert_eq!(station.total_serviced, 0);
    assert!(station.progress() > 0.9 && station.progress() < 1.0);

    for _ in 0..2 {
        station.tick(0.1, &mut wallet);
    }
    assert_eq!(station.total_serviced, 1);
    assert_eq!(wallet.balance(), 15.0);
}

#[test]
fn test_upgrade_applies_to_running_service() {
    let mut station = SimStation::new(StationConfig::default());
    let mut wallet = Wallet::new(1000.0);
    station.admit(id(0), 0.0).expect("admit");

    for _ in 0..80 {
        station.tick(0.1, &mut wallet);
    }
    assert_eq!(station.total_serviced, 0);

    // Level 3 washes take 7.6s, which the running service has already passed
    station.try_upgrade(&mut wallet).expect("upgrade");
    station.try_upgrade(&mut wallet).expect("upgrade");
    station.tick(0.1, &mut wallet);
    assert_eq!(station.total_serviced, 1);
}

#[test]
fn test_shutdown_cancels_without_credit() {
    let mut station = fast_station();
    let mut wallet = Wallet::new(0.0);
    station.admit(id(0), 0.0).expect("admit");
    station.admit(id(1), 0.0).expect("admit");
    station.tick(0.5, &mut wallet);

    let removed = station.shutdown();
    assert_eq!(removed, vec![id(0), id(1)]);
    assert_eq!(station.occupancy(), 0);
    assert!(!station.is_cycle_running());
    assert!(!station.is_unlocked());

    for _ in 0..20 {
        assert!(station.tick(0.1, &mut wallet).is_empty());
    }
    assert_eq!(wallet.balance(), 0.0);
    assert_eq!(station.total_serviced, 0);
}

#[test]
fn test_world_shutdown_clears_station_traffic() {
    let mut config = SimConfig::default();
    config.gate.diversion_probability = 1.0;
    config.gate.cooldown_duration = 0.0;
    let mut world = SimWorld::from_config_with_seed(config, 21);

    for _ in 0..400 {
        world.tick(0.1);
        if world.station.occupancy() > 0 && world.gate.in_flight() > 0 {
            break;
        }
    }
    assert!(world.committed() > 0);

    let balance = world.wallet.balance();
    let removed = world.shutdown_station();
    assert!(removed > 0);
    assert_eq!(world.committed(), 0);
    assert!(world.vehicles.values().all(|v| !matches!(
        v.state,
        VehicleState::Queued | VehicleState::Servicing | VehicleState::Diverting(_)
    )));
    assert!(world
        .drain_events()
        .iter()
        .any(|e| e.kind == SimEventKind::StationClosed));

    for _ in 0..200 {
        world.tick(0.1);
        assert_eq!(world.committed(), 0);
    }
    assert_eq!(world.wallet.balance(), balance);
}

#[test]
fn test_station_snapshot() {
    let mut world = SimWorld::new_with_seed(2);
    for _ in 0..50 {
        world.tick(0.1);
    }
    let snapshot = world.station_snapshot();
    assert_eq!(snapshot.level, 1);
    assert_eq!(snapshot.max_level, 10);
    assert_eq!(snapshot.wash_duration, 10.0);
    assert_eq!(snapshot.money_per_wash, 15.0);
    assert_eq!(snapshot.queue_capacity, 4);
    assert!(snapshot.unlocked);
    assert!(!snapshot.has_advertising);
    assert_eq!(world.vehicle_snapshots().len(), world.vehicles.len());
}

#[test]
fn test_format_money() {
    assert_eq!(format_money(950.0), "$950");
    assert_eq!(format_money(1500.0), "$1.5K");
    assert_eq!(format_money(2_300_000.0), "$2.30M");
    assert_eq!(format_money(1_200_000_000.0), "$1.20B");
    assert_eq!(format_money(-40.0), "-$40");
}

#[test]
fn test_default_config_is_valid() {
    assert_eq!(SimConfig::default().validate(), Ok(()));
}

#[test]
fn test_config_validation_errors() {
    let mut config = SimConfig::default();
    config.spawner.min_spawn_interval = 3.0;
    config.spawner.max_spawn_interval = 1.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvertedRange { .. })
    ));

    let mut config = SimConfig::default();
    config.station.queue_capacity = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::Zero("station.queue_capacity"))
    );

    let mut config = SimConfig::default();
    config.gate.diversion_probability = 1.5;
    assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config: SimConfig = toml::from_str(
        r#"
        starting_balance = 250.0

        [station]
        queue_capacity = 6

        [layout.garage_point]
        x = 10.0
        y = 0.0
        z = 20.0
        "#,
    )
    .expect("parse");

    assert_eq!(config.starting_balance, 250.0);
    assert_eq!(config.station.queue_capacity, 6);
    assert_eq!(config.station.base_reward, StationConfig::default().base_reward);
    assert_eq!(config.layout.garage_point.map(|p| p.z), Some(20.0));
    assert_eq!(config.gate, SimConfig::default().gate);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn test_config_file_round_trip() {
    let mut config = SimConfig::default();
    config.station.queue_capacity = 7;
    config.lane.exit_speed = 4.5;
    config.layout.align_point = Some(Position::new(28.0, 0.0, 5.0));

    let path = std::env::temp_dir().join(format!("carwash_sim_config_{}.toml", std::process::id()));
    std::fs::write(&path, config.to_toml().expect("serialize")).expect("write config");
    let loaded = SimConfig::load(&path).expect("load config");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("carwash_sim_bad_{}.toml", std::process::id()));
    std::fs::write(&path, "[station]\nqueue_capacity = 0\n").expect("write config");
    let result = SimConfig::load(&path);
    std::fs::remove_file(&path).ok();

    assert!(result.is_err());
    assert!(SimConfig::load(std::path::Path::new("/nonexistent/carwash.toml")).is_err());
}
