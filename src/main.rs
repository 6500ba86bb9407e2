use anyhow::{bail, Result};
use carwash_sim::simulation::{format_money, Ledger, SimConfig, SimWorld};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "carwash_sim")]
#[command(about = "Car wash traffic simulation, run headless in the console")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1200")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file overriding the default configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Spend earnings on unlocking, advertising and upgrades as soon as affordable
    #[arg(long)]
    auto_upgrade: bool,

    /// Simulated seconds between progress reports (0 disables them)
    #[arg(long, default_value = "30")]
    report_every: f32,

    /// Draw the lane map with each report
    #[arg(long)]
    map: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if cli.delta <= 0.0 {
        bail!("--delta must be positive, got {}", cli.delta);
    }

    run_headless(&cli, config);
    Ok(())
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli, config: SimConfig) {
    info!("Running car wash simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    let mut world = match cli.seed {
        Some(seed) => SimWorld::from_config_with_seed(config, seed),
        None => SimWorld::from_config(config),
    };

    // How many ticks make up one report interval
    let ticks_per_report = if cli.report_every > 0.0 {
        Some(((cli.report_every / cli.delta).ceil() as u32).max(1))
    } else {
        None
    };

    for tick in 1..=cli.ticks {
        world.tick(cli.delta);

        if cli.auto_upgrade {
            invest(&mut world);
        }

        // Nothing consumes events in headless mode
        world.drain_events();

        if let Some(every) = ticks_per_report {
            if tick % every == 0 && tick < cli.ticks {
                println!(
                    "--- After tick {} ({:.1}s simulated time) ---",
                    tick,
                    tick as f32 * cli.delta
                );
                world.print_summary();
                if cli.map {
                    world.draw_lane();
                }
                println!();
            }
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    if cli.map {
        world.draw_lane();
    }

    world.stats.log_summary();
    info!("Final balance: {}", format_money(world.wallet.balance()));
}

/// Spend money the way an eager player would
fn invest(world: &mut SimWorld) {
    if !world.station.is_unlocked() {
        if world.wallet.can_afford(world.station.unlock_price()) {
            if let Err(e) = world.unlock_station() {
                warn!("Unlock failed: {}", e);
            }
        }
        return;
    }

    if !world.station.has_advertising()
        && world.wallet.can_afford(world.station.advertising_cost())
    {
        if let Err(e) = world.buy_advertising() {
            warn!("Advertising purchase failed: {}", e);
        }
    }

    while !world.station.is_max_level()
        && world.wallet.can_afford(world.station.next_upgrade_cost())
    {
        if let Err(e) = world.upgrade_station() {
            warn!("Upgrade failed: {}", e);
            break;
        }
    }
}
