use super::*;

fn build(pos: (i32, i32), module: &str) -> Command {
    Command::Build {
        pos: GridPos::new(pos.0, pos.1),
        module: ModuleKey::from(module),
    }
}

#[test]
fn test_build_command_spends_and_upgrades_craft() {
    let content = test_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    state.ledger.total_resources = 20;

    let events = step(&mut state, &content, &mut rng, &[build((2, 1), "storage")]);

    assert!(has(&events, |e| matches!(e, Event::ModuleBuilt { cost: 8, .. })));
    assert_eq!(state.ledger.total_resources, 12);
    assert_eq!(state.craft.max_cargo, 20);
}

#[test]
fn test_build_reports_new_unlocks() {
    let content = test_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    state.ledger.total_resources = 20;

    let events = step(
        &mut state,
        &content,
        &mut rng,
        &[build((2, 1), "storage"), build((2, 3), "research")],
    );

    assert_eq!(state.ledger.total_resources, 0);
    assert!(has(&events, |e| matches!(
        e,
        Event::ModuleUnlocked { module } if module.0 == "workshop"
    )));
}

#[test]
fn test_unaffordable_build_leaves_balance() {
    let content = test_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    state.ledger.total_resources = 5;
    let station = state.station.clone();

    let events = step(&mut state, &content, &mut rng, &[build((2, 1), "storage")]);

    assert_eq!(rejection(&events), Some("insufficient funds: need 8, have 5"));
    assert_eq!(state.ledger.total_resources, 5);
    assert_eq!(state.station, station);
}

#[test]
fn test_build_rejected_during_expedition() {
    let content = test_content();
    let mut rng = make_rng();
    let mut state = launched(&content, &mut rng);
    distant_asteroid(&mut state);
    state.ledger.total_resources = 100;

    let events = step(&mut state, &content, &mut rng, &[build((2, 1), "storage")]);

    assert!(rejection(&events).is_some());
    assert_eq!(state.ledger.total_resources, 100);
    assert_eq!(state.station.grid.built_count(), 1);
}

#[test]
fn test_balance_stays_consistent_across_mixed_builds() {
    let content = test_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    state.ledger.total_resources = 50;

    let attempts = [
        build((2, 1), "storage"),
        build((0, 0), "research"),
        build((2, 3), "workshop"),
        build((2, 3), "research"),
        build((1, 2), "workshop"),
        build((3, 2), "greenhouse"),
    ];
    let mut spent = 0;
    for attempt in &attempts {
        let events = step(&mut state, &content, &mut rng, std::slice::from_ref(attempt));
        for event in &events {
            if let Event::ModuleBuilt { cost, .. } = event.event {
                spent += cost;
            }
        }
    }

    assert_eq!(spent, 8 + 12 + 25);
    assert_eq!(state.ledger.total_resources, 50 - spent);
    assert!(!state.station.is_built(&ModuleKey::from("greenhouse")));
}

#[test]
fn test_master_collection_report_unlocks_vault() {
    let content = test_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let events = step(
        &mut state,
        &content,
        &mut rng,
        &[Command::ReportMasterCollection { complete: true }],
    );

    assert!(vault_available(&state.station));
    assert!(has(&events, |e| matches!(
        e,
        Event::ModuleUnlocked { module } if module.0 == "vault"
    )));
}

#[test]
fn test_greenhouse_raises_tank_on_next_return() {
    let content = test_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    state.ledger.total_resources = 1000;
    step(
        &mut state,
        &content,
        &mut rng,
        &[
            build((2, 1), "storage"),
            build((2, 3), "research"),
            build((1, 2), "workshop"),
            build((3, 2), "greenhouse"),
        ],
    );
    assert!((state.craft.max_fuel - 150.0).abs() < f64::EPSILON);
    assert!((state.craft.fuel - 100.0).abs() < f64::EPSILON);

    step(&mut state, &content, &mut rng, &[Command::Launch]);
    step(&mut state, &content, &mut rng, &[Command::ReturnToStation]);
    assert!((state.craft.fuel - 150.0).abs() < f64::EPSILON);
    assert!((state.craft.mining_power - 2.5).abs() < f64::EPSILON);
}
