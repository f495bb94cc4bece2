// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Interactive keypad entry
//!
//! [KeypadEntry] holds the state of one grid entry exchange, a [Surface]
//! provides presentation and input.

use std::time::Duration;

use crate::{engine::PinRequest, keypad::Keypad, Collected, Error, Pin};

/// Duration of the flash shown on a pressed key
pub const FLASH_DURATION: Duration = Duration::from_millis(100);

/// Input events for the [KeypadEntry] element
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum KeypadEvent {
    /// Grid button pressed (row-major position, top row first)
    Press(usize),
    /// Key typed on the keyboard
    Symbol(char),
    /// Discard entered digits
    Clear,
    /// Return the entered digits
    Commit,
    /// Abandon entry
    Cancel,
    /// Flash period expired
    FlashElapsed,
    /// Surface needs to be redrawn (resize etc.)
    Redraw,
}

/// Transient highlight shown after an action
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Highlight {
    /// Grid button at the provided position
    Key(usize),
    /// Clear action
    Clear,
}

/// Result type for Ui elements
///
/// Indicates whether a redraw is required or if the element has
/// been exited returning a value.
#[derive(Clone, Debug, PartialEq)]
pub enum UiResult<R = ()> {
    /// None indicates no change
    None,
    /// Update indicates UI should be redrawn
    Update,
    /// Exit used to signal element exit
    Exit(R),
}

/// Keypad entry element
#[derive(Debug)]
pub struct KeypadEntry<'a> {
    keypad: &'a Keypad,
    pin: Pin,
    flash: bool,
    highlight: Option<Highlight>,
}

impl<'a> KeypadEntry<'a> {
    /// Create a new entry element, `flash` enables key press feedback
    pub fn new(keypad: &'a Keypad, flash: bool) -> Self {
        Self {
            keypad,
            pin: Pin::new(),
            flash,
            highlight: None,
        }
    }

    /// Number of digits entered
    pub fn entered(&self) -> usize {
        self.pin.len()
    }

    /// Current transient highlight, if any
    pub fn highlight(&self) -> Option<Highlight> {
        self.highlight
    }

    /// Update [KeypadEntry] state, returning the collected PIN on exit
    pub fn update(&mut self, evt: KeypadEvent) -> UiResult<Collected> {
        match evt {
            KeypadEvent::Press(position) => match self.keypad.resolve_position(position) {
                Some(d) => self.enter(d, position),
                None => UiResult::None,
            },
            KeypadEvent::Symbol(c) => {
                let d = match self.keypad.resolve_symbol(c) {
                    Some(d) => d,
                    None => return UiResult::None,
                };
                // Flash the grid button showing this digit
                match crate::keypad::GRID_LAYOUT.iter().position(|v| *v == d) {
                    Some(position) => self.enter(d, position),
                    None => UiResult::None,
                }
            }
            KeypadEvent::Clear => {
                self.pin.clear();
                self.set_highlight(Highlight::Clear)
            }
            KeypadEvent::Commit => UiResult::Exit(Collected::Pin(core::mem::take(&mut self.pin))),
            KeypadEvent::Cancel => {
                self.pin.clear();
                UiResult::Exit(Collected::Cancelled)
            }
            KeypadEvent::FlashElapsed => match self.highlight.take() {
                Some(_) => UiResult::Update,
                None => UiResult::None,
            },
            KeypadEvent::Redraw => UiResult::Update,
        }
    }

    fn enter(&mut self, digit: char, position: usize) -> UiResult<Collected> {
        self.pin.push(digit);
        self.set_highlight(Highlight::Key(position))
    }

    fn set_highlight(&mut self, h: Highlight) -> UiResult<Collected> {
        if !self.flash {
            return UiResult::None;
        }

        self.highlight = Some(h);
        UiResult::Update
    }
}

/// Snapshot of everything a [Surface] draws
#[derive(Clone, Debug, PartialEq)]
pub struct View<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub error: &'a str,
    pub highlight: Option<Highlight>,
}

/// Presentation layer for interactive entry
pub trait Surface {
    /// Draw the provided view
    fn draw(&mut self, view: &View) -> Result<(), Error>;

    /// Wait for the next input event, returning `None` if `timeout` expires first
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<KeypadEvent>, Error>;
}

impl<T: Surface> Surface for &mut T {
    fn draw(&mut self, view: &View) -> Result<(), Error> {
        T::draw(self, view)
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<KeypadEvent>, Error> {
        T::next_event(self, timeout)
    }
}

/// Run a [KeypadEntry] exchange on the provided surface
pub fn run_keypad<S: Surface>(
    surface: &mut S,
    req: &PinRequest,
    flash: bool,
) -> Result<Collected, Error> {
    let mut entry = KeypadEntry::new(req.keypad, flash);

    let view = |entry: &KeypadEntry| View {
        title: req.title,
        message: req.message,
        error: req.error,
        highlight: entry.highlight(),
    };

    surface.draw(&view(&entry))?;

    loop {
        let timeout = entry.highlight().map(|_| FLASH_DURATION);

        let evt = match surface.next_event(timeout)? {
            Some(e) => e,
            None => KeypadEvent::FlashElapsed,
        };

        match entry.update(evt) {
            UiResult::Exit(c) => return Ok(c),
            UiResult::Update => surface.draw(&view(&entry))?,
            UiResult::None => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_positions_resolve_to_grid_digits() {
        let k = Keypad::default();
        let mut e = KeypadEntry::new(&k, false);

        for p in [0, 4, 8, 6] {
            assert_eq!(e.update(KeypadEvent::Press(p)), UiResult::None);
        }

        assert_eq!(
            e.update(KeypadEvent::Commit),
            UiResult::Exit(Collected::Pin(Pin::from("7531")))
        );
    }

    #[test]
    fn out_of_range_press_is_ignored() {
        let k = Keypad::default();
        let mut e = KeypadEntry::new(&k, true);

        assert_eq!(e.update(KeypadEvent::Press(9)), UiResult::None);
        assert_eq!(e.entered(), 0);
    }

    #[test]
    fn flash_highlights_until_elapsed() {
        let k = Keypad::default();
        let mut e = KeypadEntry::new(&k, true);

        assert_eq!(e.update(KeypadEvent::Symbol('x')), UiResult::Update);
        // 'x' is bottom-left, which is position 6 on screen
        assert_eq!(e.highlight(), Some(Highlight::Key(6)));

        assert_eq!(e.update(KeypadEvent::FlashElapsed), UiResult::Update);
        assert_eq!(e.highlight(), None);
        assert_eq!(e.update(KeypadEvent::FlashElapsed), UiResult::None);
    }
}
