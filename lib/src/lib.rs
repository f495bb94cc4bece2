// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Trezor PIN entry host library (and CLI)
//!
//! Provides the terminal and grid front ends driven by the
//! [Engine][pinentry_trezor_core::engine::Engine], along with logging setup
//! for the `pinentry-trezor` binary.

/// Re-export `pinentry-trezor-core` for consumers
pub use pinentry_trezor_core::{self as engine_core, Config, Error};

pub mod grid;
pub use grid::GridCollector;

pub mod tty;
pub use tty::TerminalCollector;

mod logging;
pub use logging::setup_logging;
