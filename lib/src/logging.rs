// Copyright (c) 2022-2023 The pinentry-trezor Authors

use std::{backtrace::Backtrace, fs::File, path::Path};

use anyhow::Context;
use log::{error, LevelFilter};

/// Write timestamped diagnostics to `path`, including panics with backtraces
pub fn setup_logging(path: &Path) -> anyhow::Result<()> {
    let f = File::create(path)
        .with_context(|| format!("failed to create log file '{}'", path.display()))?;

    let cfg = simplelog::ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    simplelog::WriteLogger::init(LevelFilter::Debug, cfg, f)?;

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("{info}\n{}", Backtrace::force_capture());
        prev(info);
    }));

    Ok(())
}
