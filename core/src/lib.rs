// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Trezor PIN entry core
//!
//! This provides the [Engine][engine::Engine] implementing the line-oriented
//! pinentry protocol spoken by GnuPG's agent, along with the scrambled
//! [Keypad][keypad::Keypad] used to enter a Trezor PIN without revealing the
//! digits on the keyboard input path.
//!
//! Interactions with the [Engine][engine::Engine] are performed via
//! [Command][engine::Command]s and [Output][engine::Output]s, PIN entry itself is
//! delegated to a [Collector][engine::Collector] chosen per request.
//!
//! ## Keypad
//!
//! The Trezor displays a scrambled 3x3 grid of digits and expects the PIN as
//! grid _positions_, numbered like a calculator keypad:
//!
//! ```text
//! 7 8 9
//! 4 5 6
//! 1 2 3
//! ```
//!
//! A [Keyset][keypad::Keyset] assigns one symbol to each of these positions,
//! so `xcvsdfwer` lets the bottom-left position be typed as `x`. Every typed
//! symbol is resolved back to the canonical digit before it leaves the process.
//!
//! ## Operations
//!
//! 1. The caller connects and receives the `OK` greeting
//! 2. `SETTITLE`, `SETDESC`, `SETERROR` and `OPTION` configure the session
//! 3. `GETPIN` collects a PIN via the terminal or interactive front end,
//!    replying `D <pin>` followed by `OK`
//! 4. `BYE` (or closing the input) ends the session
//!

pub mod config;
pub use config::Config;

pub mod engine;

mod error;
pub use error::Error;

pub mod keypad;

mod pin;
pub use pin::{Collected, Pin};

pub mod ui;
