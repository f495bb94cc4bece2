// Copyright (c) 2022-2023 The pinentry-trezor Authors

use core::str::FromStr;

use strum::{Display, EnumIter, EnumString};

/// Protocol verbs understood by the [`Engine`][super::Engine]
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumIter)]
pub enum Verb {
    #[strum(serialize = "SETDESC")]
    SetDesc,
    #[strum(serialize = "SETERROR")]
    SetError,
    #[strum(serialize = "SETTITLE")]
    SetTitle,
    #[strum(serialize = "SETPROMPT")]
    SetPrompt,
    #[strum(serialize = "SETQUALITYBAR")]
    SetQualityBar,
    #[strum(serialize = "SETQUALITYBAR_TT")]
    SetQualityBarTt,
    #[strum(serialize = "SETREPEATERROR")]
    SetRepeatError,
    #[strum(serialize = "SETREPEAT")]
    SetRepeat,
    #[strum(serialize = "SETOK")]
    SetOk,
    #[strum(serialize = "SETCANCEL")]
    SetCancel,
    #[strum(serialize = "OPTION")]
    Option,
    #[strum(serialize = "GETINFO")]
    GetInfo,
    #[strum(serialize = "SETKEYINFO")]
    SetKeyInfo,
    #[strum(serialize = "CONFIRM")]
    Confirm,
    #[strum(serialize = "GETPIN")]
    GetPin,
    #[strum(serialize = "BYE")]
    Bye,
}

/// Session option carried by an `OPTION` command
#[derive(Clone, PartialEq, Debug)]
pub enum SessionOption<'a> {
    /// `ttyname=<path>`
    TtyName(&'a str),
    /// `display=<addr>`
    Display(&'a str),
    /// Any other option, accepted and ignored
    Other(&'a str),
}

impl<'a> SessionOption<'a> {
    pub fn parse(s: &'a str) -> Self {
        if let Some(v) = s.strip_prefix("ttyname=") {
            SessionOption::TtyName(v)
        } else if let Some(v) = s.strip_prefix("display=") {
            SessionOption::Display(v)
        } else {
            SessionOption::Other(s)
        }
    }
}

/// [`Engine`][super::Engine] input commands, decoded from protocol lines
#[derive(Clone, PartialEq, Debug)]
pub enum Command<'a> {
    /// Blank line
    None,

    /// Set (percent-encoded) description
    SetDesc(&'a str),

    /// Set error annotation for the next GETPIN
    SetError(&'a str),

    /// Set window title
    SetTitle(&'a str),

    /// Set a session option
    Option(SessionOption<'a>),

    /// Request a PIN
    GetPin,

    /// End the session
    Bye,

    /// Recognised command with no effect beyond acknowledgement
    Ignored(Verb),

    /// Unrecognised command
    Unknown { command: &'a str, args: &'a str },
}

impl<'a> Command<'a> {
    /// Parse a command from a single protocol line
    pub fn parse(line: &'a str) -> Self {
        let (command, args) = match line.split_once(' ') {
            Some((c, a)) => (c.trim(), a.trim()),
            None => (line.trim(), ""),
        };

        if command.is_empty() {
            return Command::None;
        }

        let verb = match Verb::from_str(command) {
            Ok(v) => v,
            Err(_) => return Command::Unknown { command, args },
        };

        match verb {
            Verb::SetDesc => Command::SetDesc(args),
            Verb::SetError => Command::SetError(args),
            Verb::SetTitle => Command::SetTitle(args),
            Verb::Option => Command::Option(SessionOption::parse(args)),
            Verb::GetPin => Command::GetPin,
            Verb::Bye => Command::Bye,
            v => Command::Ignored(v),
        }
    }
}
