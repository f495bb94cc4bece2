// Copyright (c) 2022-2023 The pinentry-trezor Authors

use std::io::{self, Write};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::Pin;

/// Characters escaped in `D` lines
const DATA_ESCAPE: &AsciiSet = &CONTROLS.add(b'%');

/// [`Engine`][super::Engine] outputs (in response to commands), encoded to reply lines
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    /// Plain acknowledgement
    Ok,

    /// Collected PIN, acknowledged after the data line
    Data(Pin),

    /// Acknowledged, session ends
    Bye,

    /// PIN entry cancelled, session ends without acknowledgement
    Cancelled,
}

impl Output {
    /// Write the reply lines for this output
    pub fn encode(&self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Output::Ok | Output::Bye => respond(w, "OK"),
            Output::Data(pin) => {
                let escaped = utf8_percent_encode(pin.as_str(), DATA_ESCAPE).to_string();
                respond(w, &format!("D {escaped}"))?;
                respond(w, "OK")
            }
            Output::Cancelled => Ok(()),
        }
    }
}

/// Write and flush a reply line, a closed pipe on the caller side is not an error
pub(crate) fn respond(w: &mut impl Write, line: &str) -> io::Result<()> {
    match writeln!(w, "{line}").and_then(|_| w.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            #[cfg(feature = "log")]
            log::debug!("Caller closed output: {e}");
            Ok(())
        }
        r => r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn encode_outputs() {
        let tests = &[
            (Output::Ok, "OK\n"),
            (Output::Bye, "OK\n"),
            (Output::Data(Pin::from("7531")), "D 7531\nOK\n"),
            (Output::Data(Pin::new()), "D \nOK\n"),
            (Output::Data(Pin::from("1%2\n")), "D 1%252%0A\nOK\n"),
            (Output::Cancelled, ""),
        ];

        for (o, s) in tests {
            let mut buff = vec![];
            o.encode(&mut buff).unwrap();
            assert_eq!(String::from_utf8(buff).unwrap(), *s, "output: {o:?}");
        }
    }

    #[test]
    fn broken_pipe_is_swallowed() {
        assert!(Output::Ok.encode(&mut ClosedPipe).is_ok());
        assert!(Output::Data(Pin::from("1")).encode(&mut ClosedPipe).is_ok());
    }
}
