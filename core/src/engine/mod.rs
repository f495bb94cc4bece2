// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! The [Engine] implements the pinentry protocol state machine.
//!
//! This handles [Command] inputs and returns [Output] responses to the caller,
//! delegating PIN entry to the [Collector] selected for each `GETPIN`.

use std::io::{BufRead, Write};

use percent_encoding::percent_decode_str;
use strum::Display;

use crate::{keypad::Keypad, Collected, Config, Error, Pin};

mod command;
pub use command::{Command, SessionOption, Verb};

mod output;
pub use output::Output;

/// Window title used until the caller provides one
pub const DEFAULT_TITLE: &str = "GPG: Enter Trezor PIN";

/// Terminal used until the caller provides one
pub const DEFAULT_TTY: &str = "/dev/tty";

/// Explanation preceding the keypad grid in terminal prompts
pub const GRID_EXPLANATION: &str =
    "The keys in these grids correspond to the grid displayed on your Trezor:";

/// Per-connection state, mutated by protocol commands
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// Display label
    pub title: String,
    /// User-facing prompt text (percent-decoded)
    pub message: String,
    /// One-shot error annotation, cleared after each GETPIN
    pub error: String,
    /// Terminal device for text entry
    pub tty: String,
    /// Display target, selects the interactive front end when set
    pub display: Option<String>,
}

impl Session {
    /// Create a new session with default values and the configured display target
    pub fn new(config: &Config) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            message: String::new(),
            error: String::new(),
            tty: DEFAULT_TTY.to_string(),
            display: config.display.clone(),
        }
    }
}

/// PIN entry front ends
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum Frontend {
    /// Raw prompt on a terminal
    Terminal,
    /// Windowed grid entry
    Interactive,
}

impl Frontend {
    /// Select the front end for the provided display target
    pub fn select(display: Option<&str>) -> Self {
        match display {
            Some(d) if !d.is_empty() => Frontend::Interactive,
            _ => Frontend::Terminal,
        }
    }
}

/// Everything a [Collector] needs to solicit one PIN
#[derive(Clone, Debug)]
pub struct PinRequest<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub error: &'a str,
    /// Composed terminal prompt (message, error and keypad grid)
    pub prompt: &'a str,
    pub tty: &'a str,
    pub keypad: &'a Keypad,
}

/// [`Collector`] trait provides PIN entry front ends for [`Engine`] instances
pub trait Collector {
    /// Collect a PIN, returning [Collected::Cancelled] if the user dismissed entry
    fn collect(&mut self, req: &PinRequest) -> Result<Collected, Error>;
}

impl<T: Collector> Collector for &mut T {
    fn collect(&mut self, req: &PinRequest) -> Result<Collected, Error> {
        T::collect(self, req)
    }
}

/// Reason for the end of a session
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum Exit {
    /// Caller closed the input
    EndOfInput,
    /// Caller sent BYE
    Bye,
    /// User dismissed PIN entry
    Cancelled,
}

/// [Engine] provides the pinentry protocol over abstract PIN collectors
pub struct Engine<'a, TERM: Collector, UI: Collector> {
    config: &'a Config,
    keypad: Keypad,
    session: Session,

    terminal: TERM,
    interactive: UI,
}

impl<'a, TERM: Collector, UI: Collector> Engine<'a, TERM, UI> {
    /// Create a new engine instance with the provided configuration and front ends
    pub fn new(config: &'a Config, keypad: Keypad, terminal: TERM, interactive: UI) -> Self {
        Self {
            session: Session::new(config),
            config,
            keypad,
            terminal,
            interactive,
        }
    }

    /// Fetch the current session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch the keypad scheme
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Write the greeting expected by the caller on connect
    pub fn announce(&self, w: &mut impl Write) -> Result<(), Error> {
        Output::Ok.encode(w)?;
        Ok(())
    }

    /// Handle protocol lines from `input` until the session ends,
    /// writing replies to `output`
    pub fn serve(&mut self, input: impl BufRead, mut output: impl Write) -> Result<Exit, Error> {
        for line in input.lines() {
            let line = line?;

            let cmd = Command::parse(&line);
            let out = self.update(&cmd)?;

            out.encode(&mut output)?;

            match out {
                Output::Bye => return Ok(Exit::Bye),
                Output::Cancelled => return Ok(Exit::Cancelled),
                _ => (),
            }
        }

        Ok(Exit::EndOfInput)
    }

    /// Handle an incoming command
    pub fn update(&mut self, cmd: &Command) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("command: {:?}", cmd);

        match cmd {
            Command::None | Command::Ignored(_) => (),

            Command::SetDesc(text) => {
                self.session.message = percent_decode_str(text).decode_utf8_lossy().into_owned();
            }

            Command::SetError(text) => self.session.error = text.to_string(),

            Command::SetTitle(text) => self.session.title = text.to_string(),

            Command::Option(SessionOption::TtyName(path)) => self.session.tty = path.to_string(),

            Command::Option(SessionOption::Display(addr)) => {
                self.session.display = Some(addr.to_string())
            }

            Command::Option(SessionOption::Other(_)) => (),

            Command::GetPin => return self.get_pin(),

            Command::Bye => return Ok(Output::Bye),

            #[cfg(feature = "log")]
            Command::Unknown { command, args } => {
                log::warn!("Unknown command [{}] args [{}]", command, args);
            }
            #[cfg(not(feature = "log"))]
            Command::Unknown { .. } => (),
        }

        Ok(Output::Ok)
    }

    /// Collect a PIN using the front end selected by the session display target
    fn get_pin(&mut self) -> Result<Output, Error> {
        // Error annotations apply to a single attempt
        let error = core::mem::take(&mut self.session.error);

        let message = self
            .config
            .force_message
            .as_deref()
            .unwrap_or(&self.session.message);

        let frontend = Frontend::select(self.session.display.as_deref());

        #[cfg(feature = "log")]
        log::debug!("Collecting PIN via {} front end", frontend);

        // Interactive front ends fall back to the terminal prompt where no surface is available
        let prompt = terminal_prompt(message, &error, &self.keypad, self.config.explain);

        let req = PinRequest {
            title: &self.session.title,
            message,
            error: &error,
            prompt: &prompt,
            tty: &self.session.tty,
            keypad: &self.keypad,
        };

        let collected = match frontend {
            Frontend::Terminal => self.terminal.collect(&req)?,
            Frontend::Interactive => self.interactive.collect(&req)?,
        };

        match collected {
            Collected::Pin(pin) => Ok(Output::Data(pin)),
            Collected::Cancelled => {
                #[cfg(feature = "log")]
                log::info!("PIN entry cancelled by user");
                Ok(Output::Cancelled)
            }
        }
    }
}

/// Compose the terminal prompt for a PIN request
pub fn terminal_prompt(message: &str, error: &str, keypad: &Keypad, explain: bool) -> String {
    let mut prompt = message.to_string();

    if !error.is_empty() {
        prompt.push_str(&format!("\nERROR: {error}"));
    }

    if explain {
        prompt.push_str(&format!("\n{GRID_EXPLANATION}\n{}", keypad.render()));
    }

    prompt.push_str("\nEnter PIN: ");

    prompt
}

/// Helper to decode a typed line into a [Pin], reporting dropped characters
pub fn decode_typed(keypad: &Keypad, line: &str) -> Pin {
    let decoded = keypad.decode(line);

    if decoded.skipped > 0 {
        #[cfg(feature = "log")]
        log::warn!(
            "Ignored {} typed character(s) matching no keyset",
            decoded.skipped
        );
    }

    decoded.pin
}
