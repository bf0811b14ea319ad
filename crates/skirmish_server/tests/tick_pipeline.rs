//! End-to-end exercises of the simulation pipeline: content in, ticks
//! through, snapshots out.

use skirmish_server::{ContentStore, Simulation};
use skirmish_shared::content::{Action, Behavior, ContentPack, EntityDef, Target};
use skirmish_shared::protocol::ServerMessage;
use skirmish_shared::{GameConfig, Vec2};
use std::collections::BTreeMap;

fn sim() -> Simulation {
    Simulation::with_seed(GameConfig::default(), 1234)
}

fn pack_with(name: &str, radius: f32, health: Option<f32>, behavior: Behavior) -> ContentPack {
    let mut definitions = BTreeMap::new();
    definitions.insert(
        name.to_owned(),
        EntityDef {
            type_name: name.to_owned(),
            color: "white".to_owned(),
            radius,
            health,
            behavior: Some(behavior),
            visual: None,
        },
    );
    ContentPack { definitions }
}

#[test]
fn clamping_opcodes_never_leave_the_world() {
    let mut sim = sim();
    let rect = sim.config().world_rect();
    sim.content_mut().load_pack(pack_with(
        "frantic",
        8.0,
        None,
        Behavior {
            on_tick: vec![
                Action::RandomWalk { speed: 50_000.0 },
                Action::Follow { speed: 50_000.0, target: Target::Player },
                Action::Flee { speed: 50_000.0 },
            ],
            ..Behavior::default()
        },
    ));

    sim.spawn_player("bait", "#ff0000");
    for _ in 0..10 {
        let pos = sim.random_world_point();
        sim.spawn("frantic", pos);
    }

    for _ in 0..100 {
        let snapshot = sim.tick(1.0 / 120.0);
        for entity in snapshot.entities.values() {
            if entity.is_player() {
                continue;
            }
            assert!(rect.contains(entity.pos), "{} escaped to {:?}", entity.id, entity.pos);
        }
    }
}

#[test]
fn move_dir_wraps_across_the_edge() {
    let mut sim = sim();
    sim.content_mut().load_pack(pack_with(
        "runner",
        10.0,
        None,
        Behavior {
            on_tick: vec![Action::MoveDir { speed: 200.0, dir: Vec2::X }],
            ..Behavior::default()
        },
    ));

    let width = sim.config().world_width;
    let id = sim.spawn("runner", Vec2::new(width - 1.0, 300.0)).unwrap();

    // One tick pushes it past the right edge; it must reappear at x = 0,
    // then keep running east.
    sim.tick(0.01);
    let x = sim.world().get(id).unwrap().pos.x;
    assert_eq!(x, 0.0);

    sim.tick(0.01);
    let x = sim.world().get(id).unwrap().pos.x;
    assert!(x > 0.0 && x < 5.0);
}

#[test]
fn spike_fight_runs_to_mutual_destruction() {
    let mut sim = sim();
    sim.content_mut().load_pack(pack_with(
        "spike",
        12.0,
        Some(30.0),
        Behavior {
            on_collision: vec![Action::Damage { amount: 10.0 }],
            ..Behavior::default()
        },
    ));

    let a = sim.spawn("spike", Vec2::new(100.0, 100.0)).unwrap();
    let b = sim.spawn("spike", Vec2::new(110.0, 100.0)).unwrap();

    // 10 damage each way per tick against 30 health: three ticks to zero.
    sim.tick(1.0 / 120.0);
    assert_eq!(sim.world().get(a).unwrap().health, Some(20.0));
    assert_eq!(sim.world().get(b).unwrap().health, Some(20.0));

    sim.tick(1.0 / 120.0);
    let snapshot = sim.tick(1.0 / 120.0);

    assert!(!snapshot.entities.contains_key(&a));
    assert!(!snapshot.entities.contains_key(&b));
}

#[test]
fn orbiters_circle_the_player() {
    let mut sim = sim();
    sim.content_mut().load_pack(pack_with(
        "moon",
        5.0,
        None,
        Behavior {
            on_tick: vec![Action::Orbit { speed: 90.0, radius: 60.0, target: Target::Player }],
            ..Behavior::default()
        },
    ));

    let player = sim.spawn_player("center", "#00ff00");
    let player_pos = sim.world().get(player).unwrap().pos;
    let moon = sim.spawn("moon", Vec2::ZERO).unwrap();

    for _ in 0..20 {
        sim.tick(1.0 / 120.0);
        let pos = sim.world().get(moon).unwrap().pos;
        assert!((pos.distance(player_pos) - 60.0).abs() < 1e-3);
    }
}

#[test]
fn destroy_self_on_spawn_never_enters_the_world() {
    let mut sim = sim();
    sim.content_mut().load_pack(pack_with(
        "dud",
        10.0,
        None,
        Behavior { on_spawn: vec![Action::DestroySelf], ..Behavior::default() },
    ));

    assert_eq!(sim.spawn("dud", Vec2::new(50.0, 50.0)), None);
    assert!(sim.world().is_empty());
}

#[test]
fn snapshot_message_survives_the_wire() {
    let mut sim = sim();
    sim.seed_demo_entities();
    sim.spawn_player("ada", "#123456");

    let snapshot = sim.tick(1.0 / 120.0);
    let message = ServerMessage::Snapshot(snapshot.clone());

    let line = serde_json::to_string(&message).unwrap();
    let decoded: ServerMessage = serde_json::from_str(&line).unwrap();

    match decoded {
        ServerMessage::Snapshot(back) => assert_eq!(back, snapshot),
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[test]
fn uploaded_pack_drives_new_behavior() {
    let mut sim = sim();
    let document = r#"{
        "definitions": {
            "drifter": {
                "type": "drifter",
                "color": "teal",
                "radius": 9,
                "behavior": {
                    "onTick": [{"opcode": "move_dir", "params": {"speed": 100, "dir": {"x": 0, "y": 1}}}]
                }
            }
        }
    }"#;
    let pack = ContentPack::from_json(document).unwrap();
    sim.content_mut().load_pack(pack);

    let id = sim.spawn("drifter", Vec2::new(400.0, 100.0)).unwrap();
    sim.tick(0.1);

    let pos = sim.world().get(id).unwrap().pos;
    assert_eq!(pos.x, 400.0);
    assert!((pos.y - 110.0).abs() < 1e-4);
}

#[test]
fn default_content_store_matches_loaded_pack() {
    // Loading the default pack twice must be indistinguishable from once.
    let mut once = ContentStore::new();
    once.load_pack(ContentStore::default_pack());

    let mut twice = ContentStore::new();
    twice.load_pack(ContentStore::default_pack());
    twice.load_pack(ContentStore::default_pack());

    assert_eq!(once.definitions(), twice.definitions());
}
