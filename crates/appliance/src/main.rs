//! micropiscope: GPIO-button microscope appliance binary

use anyhow::Context;
use appliance::event_loop::{Appliance, LoopExit};
use appliance::options::Options;
use appliance::settings::ApplianceConfig;
use appliance::system::SysControl;
use camera_pipeline::V4l2Pipeline;
use clap::Parser;
use keypad::{KeyClassifier, Keypad, PendingActions};
use removable_media::{MediaStore, SafeUnmounter, SysMountOps};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let options = Options::parse();
    init_logging(options.verbose);

    match run(options) {
        Ok(exit) => info!("exiting ({:?})", exit),
        Err(err) => {
            error!("fatal: {:#}", err);
            process::exit(1);
        }
    }
}

/// Initialize logging
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn run(options: Options) -> anyhow::Result<LoopExit> {
    info!("=== micropiscope v{} ===", env!("CARGO_PKG_VERSION"));

    let config = ApplianceConfig::load(options.config.as_deref()).context("loading configuration")?;
    let config = options.apply(config);
    if options.verbose >= 2 {
        info!("resolved configuration: {:#?}", config);
    }

    // Buttons first: the appliance is unusable without them.
    let actions = Arc::new(PendingActions::new());
    let classifier = Arc::new(KeyClassifier::new(
        Arc::clone(&actions),
        config.keypad.power_hold(),
    ));
    let keypad =
        Keypad::attach(&config.keypad, classifier).context("initializing GPIO keypad")?;
    info!("keypad ready ({} lines)", keypad.line_count());

    let quit = Arc::new(AtomicBool::new(false));
    let sigint = Arc::clone(&quit);
    ctrlc::set_handler(move || sigint.store(true, Ordering::Release))
        .context("installing signal handler")?;

    let pipeline = V4l2Pipeline::new(config.camera.clone(), quit);
    let media = MediaStore::new(&config.media);
    let unmounter = SafeUnmounter::new(SysMountOps, config.media.policy());
    let encode = config.camera.encode_options();

    let mut appliance = Appliance::new(pipeline, actions, media, unmounter, SysControl, encode);
    let exit = appliance.run()?;

    // `keypad` lives until here so interrupts stay attached for the whole
    // loop and are released before the process exits.
    drop(keypad);
    Ok(exit)
}
