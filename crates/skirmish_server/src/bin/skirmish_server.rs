//! # Skirmish Arena Server
//!
//! The authoritative world. Runs the fixed-tick simulation on the main
//! thread and the TCP transport on a tokio runtime beside it.
//!
//! ## Usage
//!
//! ```bash
//! skirmish_server --port 3000 --tick-rate 120 --content-dir content
//! ```

use crossbeam_channel::bounded;
use skirmish_server::net::{self, EVENT_QUEUE_SIZE};
use skirmish_server::watch::{ContentChange, ContentWatcher};
use skirmish_server::{BroadcastHub, SessionManager, Simulation, TickLoop};
use skirmish_shared::content::ContentPack;
use skirmish_shared::protocol::ServerMessage;
use skirmish_shared::GameConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

struct Args {
    port: Option<u16>,
    tick_rate: Option<u32>,
    content_dir: PathBuf,
}

fn parse_args() -> Option<Args> {
    let mut args = Args { port: None, tick_rate: None, content_dir: PathBuf::from("content") };

    let raw: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < raw.len() {
                    args.port = raw[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--tick-rate" | "-t" => {
                if i + 1 < raw.len() {
                    args.tick_rate = raw[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--content-dir" | "-c" => {
                if i + 1 < raw.len() {
                    args.content_dir = PathBuf::from(&raw[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: skirmish_server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>           TCP port to bind (default: from config)");
                println!("  -t, --tick-rate <RATE>      Simulation tick rate in Hz");
                println!("  -c, --content-dir <DIR>     Hot-reloaded content directory (default: content)");
                println!("  -h, --help                  Show this help");
                return None;
            }
            other => {
                eprintln!("unknown argument `{other}`, try --help");
            }
        }
        i += 1;
    }
    Some(args)
}

fn load_config(content_dir: &Path) -> GameConfig {
    let path = content_dir.join(skirmish_server::watch::CONFIG_FILE);
    match std::fs::read_to_string(&path) {
        Ok(document) => match serde_json::from_str(&document) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config document");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "bad config document, using defaults");
                GameConfig::default()
            }
        },
        Err(_) => GameConfig::default(),
    }
}

fn load_definitions(content_dir: &Path, sim: &mut Simulation) {
    let path = content_dir.join(skirmish_server::watch::CONTENT_FILE);
    let Ok(document) = std::fs::read_to_string(&path) else {
        return;
    };
    match ContentPack::from_json(&document) {
        Ok(pack) => {
            tracing::info!(path = %path.display(), definitions = pack.definitions.len(), "loaded content document");
            sim.content_mut().load_pack(pack);
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "bad content document, keeping prior definitions"),
    }
}

fn apply_reload(
    change: ContentChange,
    content_dir: &Path,
    sim: &mut Simulation,
    hub: &BroadcastHub,
    tick_loop: &mut TickLoop,
) {
    match change {
        ContentChange::Config => {
            let old_rate = sim.config().tick_rate;
            let config = load_config(content_dir);
            if config.tick_rate != old_rate {
                *tick_loop = TickLoop::new(config.tick_rate);
            }
            hub.broadcast(&ServerMessage::ConfigSync(config.clone()));
            sim.set_config(config);
            tracing::info!("config reloaded from disk");
        }
        ContentChange::Definitions => {
            load_definitions(content_dir, sim);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(args) = parse_args() else {
        return;
    };

    let mut config = load_config(&args.content_dir);
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }

    let mut sim = Simulation::new(config.clone());
    load_definitions(&args.content_dir, &mut sim);
    sim.seed_demo_entities();

    let (event_tx, event_rx) = bounded(EVENT_QUEUE_SIZE);
    let hub = Arc::new(BroadcastHub::new());

    // Transport lives on its own runtime; the simulation never awaits.
    let bind_address = format!("0.0.0.0:{}", config.server_port)
        .parse()
        .expect("valid bind address");
    {
        let hub = Arc::clone(&hub);
        std::thread::Builder::new()
            .name("transport".to_owned())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .expect("tokio runtime");
                if let Err(e) = runtime.block_on(net::run_listener(bind_address, event_tx, hub)) {
                    tracing::error!(error = %e, "transport failed");
                }
            })
            .expect("spawn transport thread");
    }

    let mut watcher = match ContentWatcher::new(&args.content_dir) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, dir = %args.content_dir.display(), "hot reload disabled");
            None
        }
    };

    let mut sessions = SessionManager::new();
    let mut tick_loop = TickLoop::new(config.tick_rate);
    let started = Instant::now();
    let mut last_status = Instant::now();

    let world_size = format!("{}x{}", config.world_width, config.world_height);
    tracing::info!(
        port = config.server_port,
        tick_rate = config.tick_rate,
        world = %world_size,
        "server running"
    );

    loop {
        tick_loop.wait_for_next_tick();

        // Inbound events land between ticks: last write wins on positions.
        while let Ok(event) = event_rx.try_recv() {
            sessions.handle_event(event, &mut sim, &hub);
        }

        if let Some(watcher) = watcher.as_mut() {
            for change in watcher.drain_changes() {
                apply_reload(change, &args.content_dir, &mut sim, &hub, &mut tick_loop);
            }
        }

        while tick_loop.should_tick() {
            let start = tick_loop.begin_tick();
            let dt = sim.config().tick_interval_secs();
            let snapshot = sim.tick(dt);
            hub.broadcast(&ServerMessage::Snapshot(snapshot));
            tick_loop.end_tick(start);
        }

        if last_status.elapsed().as_secs() >= 30 {
            last_status = Instant::now();
            tracing::info!(
                uptime_secs = started.elapsed().as_secs(),
                ticks = tick_loop.tick_count(),
                late_ticks = tick_loop.late_ticks(),
                entities = sim.world().len(),
                players = sessions.len(),
                "status"
            );
        }
    }
}
