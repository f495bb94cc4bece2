// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Grid PIN entry surface
//!
//! Draws the interactive keypad full-screen on the controlling terminal,
//! accepting mouse clicks on the (blank) grid buttons as well as keyset
//! symbols typed on the keyboard.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute, queue,
    style::{Print, PrintStyledContent, Stylize},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, error, warn};

use pinentry_trezor_core::{
    engine::{Collector, PinRequest},
    keypad::GRID_SIZE,
    ui::{run_keypad, Highlight, KeypadEvent, Surface, View},
    Collected, Error,
};

use crate::tty::TerminalCollector;

/// Terminal the grid is drawn on by default
pub const CONTROLLING_TTY: &str = "/dev/tty";

/// Column width used to wrap message text
const WRAP_WIDTH: usize = 60;

/// Left margin of all elements
const MARGIN: u16 = 2;

/// Button width (including frame)
const BUTTON_W: u16 = 5;

/// Button height (including frame)
const BUTTON_H: u16 = 3;

/// Clickable actions below the grid, in display order
const ACTIONS: [(Target, &str); 3] = [
    (Target::Cancel, "Cancel"),
    (Target::Clear, "Clear"),
    (Target::Commit, "Done"),
];

/// Clickable element
#[derive(Copy, Clone, Debug, PartialEq)]
enum Target {
    Key(usize),
    Clear,
    Commit,
    Cancel,
}

impl Target {
    fn event(&self) -> KeypadEvent {
        match self {
            Target::Key(p) => KeypadEvent::Press(*p),
            Target::Clear => KeypadEvent::Clear,
            Target::Commit => KeypadEvent::Commit,
            Target::Cancel => KeypadEvent::Cancel,
        }
    }
}

/// Screen area occupied by a [Target]
#[derive(Copy, Clone, Debug, PartialEq)]
struct Area {
    x: u16,
    y: u16,
    w: u16,
    h: u16,
}

impl Area {
    fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.x && col < self.x + self.w && row >= self.y && row < self.y + self.h
    }
}

/// Crossterm backed [Surface] on the controlling terminal
pub struct GridSurface {
    out: File,
    targets: Vec<(Area, Target)>,
    active: bool,
}

impl GridSurface {
    /// Switch the controlling terminal to raw mode and the alternate screen
    pub fn open() -> Result<Self, Error> {
        Self::open_on(Path::new(CONTROLLING_TTY))
    }

    /// Draw on `device`, which must be the terminal crossterm reads events from
    pub fn open_on(device: &Path) -> Result<Self, Error> {
        let out = OpenOptions::new().write(true).open(device)?;

        terminal::enable_raw_mode()?;

        // Dropping the surface from here on releases raw mode
        let mut s = Self {
            out,
            targets: vec![],
            active: true,
        };

        execute!(s.out, EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;

        Ok(s)
    }

    /// Restore the terminal
    pub fn close(mut self) -> Result<(), Error> {
        self.release()
    }

    fn release(&mut self) -> Result<(), Error> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let r = execute!(self.out, DisableMouseCapture, LeaveAlternateScreen, cursor::Show);
        terminal::disable_raw_mode()?;

        Ok(r?)
    }

    fn hit(&self, col: u16, row: u16) -> Option<Target> {
        self.targets
            .iter()
            .find(|(a, _)| a.contains(col, row))
            .map(|(_, t)| *t)
    }
}

impl Drop for GridSurface {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("Failed to restore terminal: {e}");
        }
    }
}

impl Surface for GridSurface {
    fn draw(&mut self, view: &View) -> Result<(), Error> {
        self.targets.clear();

        queue!(
            self.out,
            Clear(ClearType::All),
            cursor::MoveTo(MARGIN, 1),
            PrintStyledContent(view.title.bold())
        )?;

        let mut y = 3;
        for line in wrap(view.message, WRAP_WIDTH) {
            queue!(self.out, cursor::MoveTo(MARGIN, y), Print(line))?;
            y += 1;
        }

        if !view.error.is_empty() {
            for line in wrap(view.error, WRAP_WIDTH) {
                queue!(
                    self.out,
                    cursor::MoveTo(MARGIN, y),
                    PrintStyledContent(line.red())
                )?;
                y += 1;
            }
        }

        // Keypad buttons are blank, the digits are only shown on the device
        let top = y + 1;
        for position in 0..GRID_SIZE {
            let area = Area {
                x: MARGIN + (position % 3) as u16 * (BUTTON_W + 1),
                y: top + (position / 3) as u16 * BUTTON_H,
                w: BUTTON_W,
                h: BUTTON_H,
            };

            let label = match view.highlight {
                Some(Highlight::Key(p)) if p == position => "X",
                _ => " ",
            };

            queue!(
                self.out,
                cursor::MoveTo(area.x, area.y),
                Print("+---+"),
                cursor::MoveTo(area.x, area.y + 1),
                Print(format!("| {label} |")),
                cursor::MoveTo(area.x, area.y + 2),
                Print("+---+")
            )?;

            self.targets.push((area, Target::Key(position)));
        }

        let mut x = MARGIN;
        let y = top + 3 * BUTTON_H + 1;
        for (target, name) in ACTIONS {
            let label = match (target, view.highlight) {
                (Target::Clear, Some(Highlight::Clear)) => format!("[*{name}*]"),
                _ => format!("[{name}]"),
            };
            let w = label.len() as u16;

            queue!(self.out, cursor::MoveTo(x, y), Print(&label))?;
            self.targets.push((Area { x, y, w, h: 1 }, target));

            x += w + 1;
        }

        queue!(
            self.out,
            cursor::MoveTo(MARGIN, y + 2),
            PrintStyledContent("Enter: done   Backspace: clear   Esc: cancel".dim())
        )?;

        self.out.flush()?;

        Ok(())
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<KeypadEvent>, Error> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(d) = deadline {
                let remaining = d.saturating_duration_since(Instant::now());
                if !event::poll(remaining)? {
                    return Ok(None);
                }
            }

            let evt = match event::read()? {
                Event::Key(k) => match key_event(&k) {
                    Some(e) => e,
                    None => continue,
                },
                Event::Mouse(m) if m.kind == MouseEventKind::Down(MouseButton::Left) => {
                    match self.hit(m.column, m.row) {
                        Some(t) => t.event(),
                        None => continue,
                    }
                }
                Event::Resize(..) => KeypadEvent::Redraw,
                _ => continue,
            };

            return Ok(Some(evt));
        }
    }
}

/// Map a key press to a keypad event
pub fn key_event(k: &KeyEvent) -> Option<KeypadEvent> {
    if k.kind != KeyEventKind::Press {
        return None;
    }

    let evt = match k.code {
        KeyCode::Enter => KeypadEvent::Commit,
        KeyCode::Esc => KeypadEvent::Cancel,
        KeyCode::Backspace => KeypadEvent::Clear,
        KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => KeypadEvent::Cancel,
        KeyCode::Char(c) => KeypadEvent::Symbol(c),
        _ => return None,
    };

    Some(evt)
}

/// Interactive front end using a [GridSurface], collecting via `fallback`
/// where the surface cannot be opened (no controlling terminal)
#[derive(Clone, Debug)]
pub struct GridCollector<F: Collector = TerminalCollector> {
    flash: bool,
    device: PathBuf,
    fallback: F,
}

impl GridCollector {
    /// Create a new grid collector, `flash` enables key press feedback
    pub fn new(flash: bool) -> Self {
        Self::with_fallback(flash, TerminalCollector)
    }
}

impl<F: Collector> GridCollector<F> {
    /// Create a new grid collector with the provided fallback front end
    pub fn with_fallback(flash: bool, fallback: F) -> Self {
        Self {
            flash,
            device: PathBuf::from(CONTROLLING_TTY),
            fallback,
        }
    }

    /// Override the terminal the grid is drawn on
    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = device.into();
        self
    }
}

impl<F: Collector> Collector for GridCollector<F> {
    fn collect(&mut self, req: &PinRequest) -> Result<Collected, Error> {
        debug!("Opening grid entry on {}", self.device.display());

        let mut surface = match GridSurface::open_on(&self.device) {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    "Grid unavailable on {} ({e}), falling back to terminal entry on '{}'",
                    self.device.display(),
                    req.tty
                );
                return self.fallback.collect(req);
            }
        };

        let r = run_keypad(&mut surface, req, self.flash);
        let closed = surface.close();

        let collected = r?;
        closed?;

        Ok(collected)
    }
}

/// Split text into lines of at most `width` characters, breaking at spaces where possible
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = vec![];

    for para in text.lines() {
        let mut line = String::new();

        for word in para.split(' ') {
            let len = line.chars().count();
            if len > 0 && len + 1 + word.chars().count() > width {
                lines.push(core::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }

        lines.push(line);
    }

    lines
}
