// Copyright (c) 2022-2023 The pinentry-trezor Authors

/// PIN entry error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input / output failure on the protocol or entry channel
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Original terminal attributes could not be reapplied after entry
    #[error("failed to restore terminal attributes: {0}")]
    RestoreFailed(std::io::Error),

    /// Entry channel closed before a line was read
    #[error("no usable input channel for PIN entry")]
    NoInput,

    /// Keyset is not a set of exactly nine distinct symbols
    #[error("invalid keyset '{0}' (expected 9 distinct symbols)")]
    InvalidKeyset(String),

    /// Symbol resolves to different digits in different keysets
    #[error("keyset symbol '{0}' maps to more than one digit")]
    KeysetConflict(char),

    /// Keypad constructed without keysets
    #[error("no keysets configured")]
    NoKeysets,

    /// Entry abandoned on a termination signal, terminal attributes were restored
    #[error("PIN entry interrupted by {0}")]
    Interrupted(String),
}
