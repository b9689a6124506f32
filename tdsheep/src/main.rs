//! tdsheep: template-driven automation for a tower-defense game.
//!
//! The binary wires the `ie` engine to the real screen (xcap) and input
//! (enigo), and hosts the arena and defense loops.

mod calibrate;
mod capture;
mod config;
mod input;
mod module;
mod scale_assets;
mod util;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ie::screen::window::{detect_window, window_geometry};
use ie::{AssetStore, Input, Matcher, PageId, PageResolver, ScaleState, ScreenCapture, StateFile, TransitionTable};

use crate::capture::XcapScreen;
use crate::config::Config;
use crate::input::EnigoInput;
use crate::module::{Arena, Ctx, Defense, Module, secs};
use crate::util::assets::resolve_assets_root;

#[derive(Parser, Debug)]
#[command(name = "tdsheep", version, about = "Template-driven game automation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the game window and print its geometry
    Detect,
    /// Navigate to a page (HOME, FRONTLINE, DEFENSE_LINE, WOLF_PACK)
    Page {
        name: String,
        /// Extra refresh-and-jump cycles after the first
        #[arg(long)]
        retries: Option<u32>,
        /// Seconds between cycles
        #[arg(long)]
        interval: Option<f32>,
    },
    /// Fight every available arena opponent
    Arena,
    /// Run the tower-defense loop (calibrates first if the config is incomplete)
    Run,
    /// Record the next-wave and upgrade click positions
    Calibrate,
    /// Capture a screen region as a template PNG
    #[command(name = "capture-template")]
    CaptureTemplate {
        /// File name without extension, e.g. next_wave or game_over
        #[arg(long)]
        name: String,
    },
    /// Generate the per-scale variants of a group's base images
    #[command(name = "scale-assets")]
    ScaleAssets {
        #[arg(long, default_value = "a")]
        group: String,
        /// Every unsuffixed PNG in the group instead of a_1..a_6
        #[arg(long)]
        all: bool,
    },
    /// Show the learned scale state
    State {
        /// Forget the learned scales
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=debug` etc.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match Config::init() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "config init failed");
            Config::load_or_default()
        }
    };
    let stop = install_stop_handler()?;

    match cli.command {
        None => interactive(config, stop),
        Some(Commands::Detect) => detect(&mut build_ctx(config, stop)?),
        Some(Commands::Page { name, retries, interval }) => {
            let Some(page) = PageId::from_name(&name) else {
                let known = PageId::ALL.map(PageId::name).join(", ");
                bail!("unknown page {name:?}; expected one of {known}");
            };
            let mut ctx = build_ctx(config, stop)?;
            let retries = retries.unwrap_or(ctx.config.page.max_retries);
            let interval = secs(interval.unwrap_or(ctx.config.page.retry_interval_secs));
            ctx.resolver.ensure_page_report(&mut ctx.state, page, retries, interval)?;
            println!("On {page}.");
            Ok(())
        }
        Some(Commands::Arena) => run_module(&mut Arena::default(), &mut build_ctx(config, stop)?),
        Some(Commands::Run) => run_defense(&mut build_ctx(config, stop)?),
        Some(Commands::Calibrate) => {
            let mut config = config;
            calibrate::calibrate(&mut config, &mut EnigoInput::new()?, util::prompt)?;
            config.save()?;
            println!("Saved to {}.", Config::path()?.display());
            Ok(())
        }
        Some(Commands::CaptureTemplate { name }) => {
            let path = calibrate::capture_template(
                &name,
                &Config::templates_dir()?,
                &mut XcapScreen::primary()?,
                &mut EnigoInput::new()?,
                util::prompt,
            )?;
            println!("Saved {}. Point a template_path in the config at it.", path.display());
            Ok(())
        }
        Some(Commands::ScaleAssets { group, all }) => {
            let root = resolve_assets_root(config.assets_dir.as_deref())?;
            let summary = scale_assets::generate_group(&root.join(&group), all)?;
            println!("{} source(s), {} file(s) written.", summary.sources, summary.written);
            if !summary.missing.is_empty() {
                println!("Missing sources: {}", summary.missing.join(", "));
            }
            Ok(())
        }
        Some(Commands::State { reset }) => {
            let mut state = StateFile::open(ScaleState::default_path()?);
            if reset {
                state.reset();
                state.save()?;
            }
            let path = state.path().map(|p| p.display().to_string()).unwrap_or_default();
            println!("{path}\n{}", serde_json::to_string_pretty(state.state())?);
            Ok(())
        }
    }
}

/// First Ctrl+C asks the loops to stop; the second one exits on the spot.
fn install_stop_handler() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        tracing::info!("stop requested; press Ctrl+C again to quit immediately");
    })
    .context("install Ctrl+C handler")?;
    Ok(stop)
}

fn build_ctx(config: Config, stop: Arc<AtomicBool>) -> Result<Ctx> {
    let root = resolve_assets_root(config.assets_dir.as_deref())?;
    let screen: Box<dyn ScreenCapture> = Box::new(XcapScreen::primary()?);
    let input: Box<dyn Input> = Box::new(EnigoInput::new()?);
    let resolver = PageResolver::new(Matcher::new(AssetStore::new(root), screen), input, TransitionTable::default())
        .with_confidence(config.confidence);
    let state = StateFile::open(ScaleState::default_path()?);
    Ok(Ctx::new(resolver, state, config, stop))
}

fn run_module(module: &mut dyn Module, ctx: &mut Ctx) -> Result<()> {
    tracing::info!(module = module.name(), "starting");
    module.run(ctx).with_context(|| format!("{} failed", module.name()))
}

fn run_defense(ctx: &mut Ctx) -> Result<()> {
    if !preflight(&ctx.config) {
        println!("Config incomplete; starting calibration (Ctrl+C to abort).");
        calibrate::calibrate(&mut ctx.config, &mut **ctx.resolver.input_mut(), util::prompt)?;
        ctx.config.save()?;
        if !preflight(&ctx.config) {
            bail!("preflight still fails after calibration; check the template paths or calibrate again");
        }
    }
    run_module(&mut Defense::default(), ctx)
}

fn preflight(config: &Config) -> bool {
    let report = config.preflight();
    for msg in &report.messages {
        println!("[preflight] {msg}");
    }
    if report.ok {
        println!("[preflight] ok");
    }
    report.ok
}

fn detect(ctx: &mut Ctx) -> Result<()> {
    let probe = ctx.probe();
    let detection = detect_window(ctx.resolver.matcher_mut(), &mut ctx.state, &probe);
    for m in &detection.matches {
        println!(
            "  {:<14} {:<4} at ({}, {})  scale {}%  score {:.3}",
            m.slot, m.stem, m.result.left, m.result.top, m.scale, m.result.score
        );
    }
    if !detection.success {
        let wait = detection.advised_wait.unwrap_or_default();
        println!(
            "Not found: {}. Adjust the game window and retry in {:.1}s.",
            detection.missing.join(", "),
            wait.as_secs_f32()
        );
        return Ok(());
    }

    let screen = ctx.resolver.matcher_mut().capture_mut().screen_size()?;
    match window_geometry(&detection.matches, detection.recommended_scale, &ctx.config.window, screen) {
        Some(rect) => println!(
            "Window at ({}, {}) size {}x{}, scale {}%.",
            rect.left, rect.top, rect.width, rect.height, detection.recommended_scale
        ),
        None => println!("Anchor {} not matched; cannot place the window.", ctx.config.window.anchor),
    }
    Ok(())
}

fn interactive(config: Config, stop: Arc<AtomicBool>) -> Result<()> {
    let mut ctx = build_ctx(config, stop)?;
    println!("Commands: start (detect the game window), exit");
    loop {
        let line = match util::prompt("> ") {
            Ok(line) => line,
            Err(_) => return Ok(()),
        };
        match line.to_ascii_lowercase().as_str() {
            "" => {}
            "start" => detect(&mut ctx)?,
            "exit" | "quit" | "q" => return Ok(()),
            other => println!("Unknown command {other:?}; try start or exit."),
        }
        if ctx.stopped() {
            return Ok(());
        }
    }
}
