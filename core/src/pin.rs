// Copyright (c) 2022-2023 The pinentry-trezor Authors

use core::fmt::{self, Debug};

use zeroize::Zeroizing;

/// Canonical-digit PIN buffer, cleared from memory on drop
#[derive(Clone, Default, PartialEq)]
pub struct Pin(Zeroizing<String>);

impl Pin {
    /// Create a new (empty) PIN
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a canonical digit
    pub fn push(&mut self, digit: char) {
        self.0.push(digit);
    }

    /// Discard all entered digits
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Access the entered digits
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Pin {
    fn from(s: &str) -> Self {
        Self(Zeroizing::new(s.to_string()))
    }
}

impl Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin(<{} digits>)", self.len())
    }
}

/// Result of a PIN collection attempt
#[derive(Clone, Debug, PartialEq)]
pub enum Collected {
    /// PIN committed by the user
    Pin(Pin),
    /// User dismissed entry without committing
    Cancelled,
}

impl Collected {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Collected::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_digits() {
        let p = Pin::from("1234");

        let s = format!("{p:?}");
        assert!(!s.contains("1234"), "debug output leaked pin: {s}");
        assert_eq!(s, "Pin(<4 digits>)");
    }
}
