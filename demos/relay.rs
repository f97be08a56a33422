//! Live relay between a host server and a gun.
//!
//! Demonstrates:
//! - Building the bridge context with an in-memory store
//! - Connecting both endpoints
//! - Joining the game and watching state until Ctrl+C
//!
//! Usage:
//!   cargo run --example relay -- <host-ip> <gun-ip>
//!   cargo run --example relay -- 192.168.4.2 192.168.4.1 --name Ana --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use lasertag_bridge::transport::{gun_url, host_url};
use lasertag_bridge::{Bridges, MemoryStore, PlayerData, Result, TracingNotifier};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    host_ip: String,
    gun_ip: String,
    name: String,
    debug: bool,
}

impl Args {
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let positional: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, a)| !a.starts_with("--") && (*i == 0 || args[i - 1] != "--name"))
            .map(|(_, a)| a)
            .collect();

        let name = args
            .iter()
            .position(|a| a == "--name")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_else(|| "Player".to_string());

        Some(Self {
            host_ip: positional.first()?.to_string(),
            gun_ip: positional.get(1)?.to_string(),
            name,
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "lasertag_bridge=debug"
    } else {
        "lasertag_bridge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let Some(args) = Args::parse() else {
        eprintln!("Usage: relay <host-ip> <gun-ip> [--name NAME] [--debug]");
        std::process::exit(2);
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Laser Tag Relay ===\n");

    let store = Arc::new(MemoryStore::new());
    let bridges = Bridges::builder()
        .store(store.clone())
        .notifier(Arc::new(TracingNotifier))
        .build()?;

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[1] Connecting to host at {}...", host_url(&args.host_ip));
    bridges.host().connect(&host_url(&args.host_ip)).await?;
    println!("    ✓ Host connected\n");

    println!("[2] Connecting to gun at {}...", gun_url(&args.gun_ip));
    bridges.gun().connect(&gun_url(&args.gun_ip)).await?;
    println!("    ✓ Gun connected\n");

    // ========================================================================
    // Join
    // ========================================================================

    // The gun reports its MAC addresses shortly after connecting
    for _ in 0..50 {
        if !store.snapshot().gun_mac.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let state = store.snapshot();
    bridges
        .host()
        .join_game(PlayerData::new(&args.name, state.gun_mac, state.vest_mac))?;
    println!("[3] Joined as {}\n", args.name);

    // ========================================================================
    // Watch
    // ========================================================================

    println!("Relaying. Press Ctrl+C to stop.\n");
    let mut ticker = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let state = store.snapshot();
                println!(
                    "host={} gun={} credit={} upgrades={}",
                    bridges.host().state(),
                    bridges.gun().state(),
                    state.credit,
                    state.upgrades.len()
                );
            }
        }
    }

    bridges.gun().disconnect();
    bridges.host().disconnect();
    println!("\n✓ Disconnected");
    Ok(())
}
