#![allow(unused)]

use std::{cell::RefCell, io, str::FromStr};

use log::LevelFilter;

use pinentry_trezor::{
    engine_core::{
        engine::{Collector, PinRequest},
        Collected, Error, Pin,
    },
    tty::LineDiscipline,
};

pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = simplelog::SimpleLogger::init(log_level, Default::default());
}

/// Terminal calls observed by a [FakeTerminal]
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Get,
    Set { echo: bool },
}

/// In-memory line discipline, attributes are the echo flag
pub struct FakeTerminal {
    pub echo: RefCell<bool>,
    pub calls: RefCell<Vec<Call>>,
    /// Fail attribute reads
    pub fail_get: bool,
    /// Fail attribute writes disabling echo
    pub fail_disable: bool,
    /// Fail attribute writes enabling echo
    pub fail_restore: bool,
}

impl FakeTerminal {
    pub fn new() -> Self {
        Self {
            echo: RefCell::new(true),
            calls: RefCell::new(vec![]),
            fail_get: false,
            fail_disable: false,
            fail_restore: false,
        }
    }

    pub fn echo(&self) -> bool {
        *self.echo.borrow()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl LineDiscipline for FakeTerminal {
    type Attrs = bool;

    fn attrs(&self) -> io::Result<bool> {
        self.calls.borrow_mut().push(Call::Get);

        match self.fail_get {
            true => Err(io::Error::new(io::ErrorKind::Other, "not a terminal")),
            false => Ok(*self.echo.borrow()),
        }
    }

    fn set_attrs(&self, echo: &bool) -> io::Result<()> {
        self.calls.borrow_mut().push(Call::Set { echo: *echo });

        let fail = match echo {
            true => self.fail_restore,
            false => self.fail_disable,
        };
        if fail {
            return Err(io::Error::new(io::ErrorKind::Other, "tcsetattr failed"));
        }

        *self.echo.borrow_mut() = *echo;
        Ok(())
    }

    fn without_echo(&self, _attrs: &bool) -> bool {
        false
    }
}

/// Reader failing every read
pub struct FailingReader;

impl io::Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "read failed"))
    }
}

impl io::BufRead for FailingReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Err(io::Error::new(io::ErrorKind::Other, "read failed"))
    }

    fn consume(&mut self, _amt: usize) {}
}

/// Collector returning a fixed PIN and recording the terminals it was asked to use
#[derive(Default)]
pub struct StubCollector {
    pub pin: &'static str,
    pub ttys: Vec<String>,
    pub prompts: Vec<String>,
}

impl Collector for StubCollector {
    fn collect(&mut self, req: &PinRequest) -> Result<Collected, Error> {
        self.ttys.push(req.tty.to_string());
        self.prompts.push(req.prompt.to_string());

        Ok(Collected::Pin(Pin::from(self.pin)))
    }
}
