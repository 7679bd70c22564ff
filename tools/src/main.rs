//! sim-runner: headless driver for the outbreak simulator.
//!
//! Usage:
//!   sim-runner --seed 12345 --ticks 1500 --immunity
//!   sim-runner --load simulation_20240131_154502.json --ticks 250 --save-auto
//!   sim-runner --seed 12345 --ipc-mode

use anyhow::{Context, Result};
use outbreak_core::{
    engine::{AgentView, SimEngine, SimStats},
    snapshot::{generate_file_name, SimSnapshot},
    SimConfig,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Reset {
        #[serde(default)]
        immunity: bool,
    },
    Save {
        #[serde(default)]
        path: Option<String>,
    },
    Load {
        path: String,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    tick: u64,
    stats: SimStats,
    has_immunity: bool,
    agents: Vec<AgentView>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 1500u64);
    let immunity = args.iter().any(|a| a == "--immunity");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let save_auto = args.iter().any(|a| a == "--save-auto");
    let config_path = string_arg(&args, "--config");
    let load_path = string_arg(&args, "--load");
    let save_path = string_arg(&args, "--save");

    let config = match config_path {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    let dt = parse_arg(&args, "--dt", config.fixed_dt);
    anyhow::ensure!(dt.is_finite() && dt > 0.0, "--dt must be a positive number, got {dt}");

    let mut engine = SimEngine::new(seed, config)?;
    match load_path {
        Some(path) => {
            let snapshot = SimSnapshot::load(path).with_context(|| format!("Cannot load {path}"))?;
            engine.restore_snapshot(&snapshot)?;
        }
        None => engine.initialize(immunity),
    }

    if ipc_mode {
        return run_ipc_loop(&mut engine);
    }

    println!("Outbreak: sim-runner");
    println!("  seed:      {seed}");
    println!("  ticks:     {ticks}");
    println!("  dt:        {dt}");
    println!("  immunity:  {}", engine.has_immunity());
    println!();

    let report_every = ((1.0 / dt).round().clamp(1.0, 1e6) as u64) * 10;
    for n in 1..=ticks {
        engine.update(dt);
        if n % report_every == 0 {
            print_stats_line(&engine.get_stats());
        }
    }
    print_summary(&engine, ticks);

    if let Some(path) = save_path.map(str::to_string).or_else(|| save_auto.then(generate_file_name)) {
        engine.create_snapshot().save(&path)?;
        println!("  saved:          {path}");
    }
    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let dt = engine.config().fixed_dt;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e)?;
                continue;
            }
        };

        let outcome = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Ok(()),
            IpcCommand::Tick { count } => {
                engine.run_ticks(count, dt);
                Ok(())
            }
            IpcCommand::Reset { immunity } => {
                engine.initialize(immunity);
                Ok(())
            }
            IpcCommand::Save { path } => {
                let path = path.unwrap_or_else(generate_file_name);
                engine.create_snapshot().save(path)
            }
            // A failed load leaves the running simulation untouched.
            IpcCommand::Load { path } => {
                SimSnapshot::load(&path).and_then(|snapshot| engine.restore_snapshot(&snapshot))
            }
        };

        match outcome {
            Ok(()) => {
                let state = build_ui_state(engine);
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            Err(e) => {
                log::warn!("IPC command failed: {e}");
                write_error(&mut stdout, &e)?;
                continue;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, e: &dyn std::fmt::Display) -> Result<()> {
    let err_json = serde_json::json!({ "error": e.to_string() });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn build_ui_state(engine: &SimEngine) -> UiState {
    UiState {
        tick: engine.tick(),
        stats: engine.get_stats(),
        has_immunity: engine.has_immunity(),
        agents: engine.agent_views().collect(),
    }
}

fn print_stats_line(stats: &SimStats) {
    println!(
        "  t={:>7.1}s | pop {:>3} | healthy {:>3} | infected {:>3} | immune {:>3}",
        stats.time, stats.population, stats.healthy, stats.infected, stats.immune
    );
}

fn print_summary(engine: &SimEngine, ticks: u64) {
    let stats = engine.get_stats();
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  seed:           {}", engine.seed());
    println!("  ticks run:      {ticks}");
    println!("  sim time:       {:.2}s", stats.time);
    println!("  population:     {}", stats.population);
    println!("  healthy:        {}", stats.healthy);
    println!(
        "  infected:       {} ({} symptomatic, {} asymptomatic)",
        stats.infected, stats.infected_symptomatic, stats.infected_asymptomatic
    );
    println!("  immune:         {}", stats.immune);
    println!("  ids issued:     {}", engine.next_id());
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
