// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! GnuPG pinentry for Trezor PINs
//!
//! Speaks the pinentry protocol on standard input / output and collects
//! the PIN through a scrambled keypad, so keystrokes never reveal the digits.

use std::io::{self, BufReader};

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info};

use pinentry_trezor::{setup_logging, Config, GridCollector, TerminalCollector};
use pinentry_trezor_core::engine::Engine;

/// Trezor PIN entry for GnuPG
///
/// Further options are read from `PINENTRY_TREZOR_*` environment variables.
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Override X11 display
    #[clap(long)]
    display: Option<String>,
}

fn main() {
    // Parse command line arguments
    let args = Options::parse();

    // Load configuration
    let mut config = Config::from_env();
    if let Some(d) = args.display {
        config.display = Some(d);
    }

    // Setup logging, only when requested as the standard streams belong to the caller
    if let Some(p) = &config.log_path {
        if let Err(e) = setup_logging(p) {
            eprintln!("pinentry-trezor: logging disabled: {e:#}");
        }
    }

    // Failures end the session, the caller sees the closed pipe
    if let Err(e) = run(&config) {
        error!("{e:?}");
    }
}

/// Serve a single pinentry session on standard input / output
fn run(config: &Config) -> anyhow::Result<()> {
    debug!("Using config: {:?}", config);

    let keypad = config.keypad();
    debug!("Using keysets: {:?}", keypad.keysets());

    let mut engine = Engine::new(
        config,
        keypad,
        TerminalCollector,
        GridCollector::new(config.flash),
    );

    let mut stdout = io::stdout().lock();

    engine
        .announce(&mut stdout)
        .context("failed to greet caller")?;

    // Standard input stays unlocked, terminal entry may fall back to it
    let exit = engine
        .serve(BufReader::new(io::stdin()), &mut stdout)
        .context("pinentry session failed")?;

    info!("Session ended: {exit}");

    Ok(())
}
