#![allow(unused)]

use std::collections::VecDeque;

use log::LevelFilter;

use pinentry_trezor_core::{
    engine::{Collector, Engine, PinRequest},
    Collected, Config, Error, Pin,
};

/// Requests observed by a [StubCollector]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Seen {
    pub title: String,
    pub message: String,
    pub error: String,
    pub prompt: String,
    pub tty: String,
}

/// Collector returning queued results and recording each request
#[derive(Default)]
pub struct StubCollector {
    pub results: VecDeque<Collected>,
    pub seen: Vec<Seen>,
}

impl StubCollector {
    pub fn new(pins: &[&str]) -> Self {
        Self {
            results: pins.iter().map(|p| Collected::Pin(Pin::from(*p))).collect(),
            seen: vec![],
        }
    }

    pub fn cancelling() -> Self {
        Self {
            results: [Collected::Cancelled].into_iter().collect(),
            seen: vec![],
        }
    }
}

impl Collector for StubCollector {
    fn collect(&mut self, req: &PinRequest) -> Result<Collected, Error> {
        self.seen.push(Seen {
            title: req.title.to_string(),
            message: req.message.to_string(),
            error: req.error.to_string(),
            prompt: req.prompt.to_string(),
            tty: req.tty.to_string(),
        });

        self.results.pop_front().ok_or(Error::NoInput)
    }
}

pub fn setup_logging() {
    let _ = simplelog::SimpleLogger::init(LevelFilter::Debug, Default::default());
}

/// Run the provided protocol input, returning the reply text
pub fn run(
    config: &Config,
    terminal: &mut StubCollector,
    interactive: &mut StubCollector,
    input: &str,
) -> String {
    let mut e = Engine::new(config, config.keypad(), terminal, interactive);

    let mut out = vec![];
    e.serve(input.as_bytes(), &mut out).unwrap();

    String::from_utf8(out).unwrap()
}
