use actionlist::compiler::Compiler;
use actionlist::compiler::loader::{load_list_from_yaml, load_lists_from_dir};
use actionlist::config::EngineConfig;
use actionlist::nodes::register_standard_actions;
use actionlist::runtime::asset::ListRef;
use actionlist::runtime::engine::Engine;
use actionlist::runtime::library::AssetLibrary;
use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an action list as a scene list, ticking in real time until it ends
    Run {
        /// Path to the action list YAML file
        #[arg(long, short)]
        file: PathBuf,

        /// Directory of asset lists the scene list may invoke
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Initial variables (key=value)
        #[arg(long, short = 'D', value_parser = parse_key_val)]
        vars: Vec<(String, serde_json::Value)>,

        /// Node index to start from
        #[arg(long, default_value_t = 0)]
        entry: usize,

        /// Force-skip all pausing lists after this many seconds
        #[arg(long)]
        skip_after: Option<f64>,

        /// Engine configuration YAML
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compile and validate an action list (and its asset lists) without running it
    Check {
        /// Path to the action list YAML file
        #[arg(long, short)]
        file: PathBuf,

        /// Directory of asset lists
        #[arg(long)]
        assets: Option<PathBuf>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].to_string();
    let val_str = &s[pos + 1..];
    // Try parsing as JSON, otherwise treat as string
    let val = serde_json::from_str(val_str).unwrap_or_else(|_| serde_json::Value::String(val_str.to_string()));
    Ok((key, val))
}

fn load_assets(engine: &Engine, compiler: &mut Compiler, dir: &Path) -> Result<()> {
    info!("Loading asset lists from: {}", dir.display());
    for def in load_lists_from_dir(dir)? {
        let id = def.id.clone();
        let asset = compiler
            .compile(def)
            .with_context(|| format!("Failed to compile asset list {}", id))?;
        engine.validate_asset(&asset)?;
        info!("Loaded asset list: {}", id);
        engine.register_asset(asset);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            assets,
            vars,
            entry,
            skip_after,
            config,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(path)?,
                None => EngineConfig::default(),
            };
            let tick_interval = Duration::from_millis(config.tick_interval_ms.max(1));

            let mut engine = Engine::with_library(Arc::new(AssetLibrary::new()), config);
            register_standard_actions(&mut engine);

            let mut compiler = Compiler::new();
            if let Some(dir) = assets {
                load_assets(&engine, &mut compiler, &dir)?;
            }

            let def = load_list_from_yaml(&file)?;
            let mut initial_vars: HashMap<_, _> = def.variables.clone();
            initial_vars.extend(vars);
            let asset = compiler.compile(def)?;
            let list = ListRef::scene(asset.id.clone());
            engine.load_scene_list(asset)?;
            engine.init_vars(initial_vars);

            let cursor = engine.start(list.clone(), entry)?;
            info!("List started: {} ({})", list, cursor);

            let started = Instant::now();
            let mut last = started;
            let mut skipped = false;
            let mut interval = tokio::time::interval(tick_interval);
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            while engine.active_count() > 0 {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = Instant::now();
                        engine.tick(now.duration_since(last).as_secs_f64());
                        last = now;

                        if let Some(after) = skip_after {
                            if !skipped && started.elapsed().as_secs_f64() >= after {
                                let passes = engine.force_skip_all();
                                info!("Force skipped pausing lists in {} passes", passes);
                                skipped = true;
                            }
                        }
                    }
                    _ = &mut ctrl_c => {
                        warn!("Interrupted, killing all lists");
                        engine.kill_all();
                    }
                }
            }
            info!("All lists finished after {:.2}s", engine.now());
        }

        Commands::Check { file, assets } => {
            let mut engine = Engine::new();
            register_standard_actions(&mut engine);

            let mut compiler = Compiler::new();
            if let Some(dir) = assets {
                load_assets(&engine, &mut compiler, &dir)?;
            }

            let def = load_list_from_yaml(&file)?;
            let asset = compiler.compile(def)?;
            engine.validate_asset(&asset)?;
            println!("{}: {} actions OK", asset.id, asset.nodes.len());
        }
    }

    Ok(())
}
