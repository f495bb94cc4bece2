// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Scrambled keypad scheme
//!
//! Maps user-perceived key symbols and on-screen grid positions back to the
//! canonical digits expected by the device.

use core::{fmt, str::FromStr};

use crate::{Error, Pin};

/// Number of keys in the 3x3 grid
pub const GRID_SIZE: usize = 9;

/// Canonical digit for each keyset index
pub const CANONICAL: [char; GRID_SIZE] = ['1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Canonical digit for each on-screen grid position (row-major, top row first)
pub const GRID_LAYOUT: [char; GRID_SIZE] = ['7', '8', '9', '4', '5', '6', '1', '2', '3'];

/// Keyset where each key is typed as its own digit
pub const DEFAULT_KEYSET: &str = "123456789";

/// Alternates used when no keyset is configured
pub const BUILTIN_KEYSETS: [&str; 2] = ["xcvsdfwer", "m,.jkluio"];

/// Nine distinct symbols, one per canonical digit.
///
/// The symbol at index `n` stands for the key whose value is `CANONICAL[n]`,
/// so a keyset is written bottom row first (`1 2 3`, then `4 5 6`, then `7 8 9`).
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Keyset([char; GRID_SIZE]);

impl Keyset {
    /// Symbol for the provided canonical digit index
    pub fn symbol(&self, index: usize) -> Option<char> {
        self.0.get(index).copied()
    }

    /// Canonical digit for a symbol of this keyset
    pub fn resolve(&self, symbol: char) -> Option<char> {
        self.0
            .iter()
            .position(|c| *c == symbol)
            .map(|i| CANONICAL[i])
    }

    /// Symbols in keyset order
    pub fn symbols(&self) -> &[char; GRID_SIZE] {
        &self.0
    }

    /// Display row `row` (0 = top) as space-separated symbols
    fn render_row(&self, row: usize) -> String {
        let start = GRID_SIZE - 3 * (row + 1);

        self.0[start..start + 3]
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for Keyset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != GRID_SIZE {
            return Err(Error::InvalidKeyset(s.to_string()));
        }

        let mut symbols = ['\0'; GRID_SIZE];
        for (i, c) in chars.iter().enumerate() {
            if symbols[..i].contains(c) {
                return Err(Error::InvalidKeyset(s.to_string()));
            }
            symbols[i] = *c;
        }

        Ok(Self(symbols))
    }
}

impl fmt::Display for Keyset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Keyset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyset(\"{self}\")")
    }
}

/// Result of decoding a typed line
#[derive(Debug)]
pub struct Decoded {
    /// Canonical digits for every recognised symbol
    pub pin: Pin,
    /// Number of characters matching no keyset
    pub skipped: usize,
}

/// Set of concurrently active keysets
#[derive(Clone, Debug, PartialEq)]
pub struct Keypad {
    keysets: Vec<Keyset>,
}

impl Keypad {
    /// Create a keypad from the provided keysets, checking that no symbol
    /// resolves to more than one digit
    pub fn new(keysets: Vec<Keyset>) -> Result<Self, Error> {
        if keysets.is_empty() {
            return Err(Error::NoKeysets);
        }

        for (i, a) in keysets.iter().enumerate() {
            for b in &keysets[i + 1..] {
                for (n, c) in a.symbols().iter().enumerate() {
                    if let Some(d) = b.resolve(*c) {
                        if d != CANONICAL[n] {
                            return Err(Error::KeysetConflict(*c));
                        }
                    }
                }
            }
        }

        Ok(Self { keysets })
    }

    /// Create a keypad with the default keyset followed by an operator keyset,
    /// or the built-in alternates where none is provided
    pub fn with_keyset(keyset: Option<Keyset>) -> Result<Self, Error> {
        let mut keysets = vec![Keyset::from_str(DEFAULT_KEYSET)?];

        match keyset {
            Some(k) => keysets.push(k),
            None => {
                for k in BUILTIN_KEYSETS {
                    keysets.push(Keyset::from_str(k)?);
                }
            }
        }

        Self::new(keysets)
    }

    /// Registered keysets, default first
    pub fn keysets(&self) -> &[Keyset] {
        &self.keysets
    }

    /// Resolve a typed symbol against every registered keyset
    pub fn resolve_symbol(&self, symbol: char) -> Option<char> {
        self.keysets.iter().find_map(|k| k.resolve(symbol))
    }

    /// Resolve an on-screen grid position (row-major, top row first)
    pub fn resolve_position(&self, position: usize) -> Option<char> {
        GRID_LAYOUT.get(position).copied()
    }

    /// Decode a typed line, dropping characters that match no keyset
    pub fn decode(&self, line: &str) -> Decoded {
        let mut pin = Pin::new();
        let mut skipped = 0;

        for c in line.trim().chars() {
            match self.resolve_symbol(c) {
                Some(d) => pin.push(d),
                None => skipped += 1,
            }
        }

        Decoded { pin, skipped }
    }

    /// Render all keysets side by side as a 3 row grid matching the device
    pub fn render(&self) -> String {
        (0..3)
            .map(|row| {
                self.keysets
                    .iter()
                    .map(|k| k.render_row(row))
                    .collect::<Vec<_>>()
                    .join("   ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Keypad {
    fn default() -> Self {
        let keysets = [DEFAULT_KEYSET, BUILTIN_KEYSETS[0], BUILTIN_KEYSETS[1]]
            .iter()
            .filter_map(|k| Keyset::from_str(k).ok())
            .collect();

        Self { keysets }
    }
}
