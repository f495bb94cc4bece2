// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Terminal PIN entry
//!
//! Prompts on a terminal with local echo disabled, reading one line and
//! resolving typed symbols through the [Keypad][pinentry_trezor_core::keypad::Keypad].
//!
//! Termination signals received during entry abandon the read, so the
//! terminal attributes are restored before the process goes away.

use std::{
    ffi::c_int,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Read, Write},
    os::{
        fd::{AsFd, BorrowedFd},
        unix::fs::OpenOptionsExt,
    },
    sync::atomic::{AtomicI32, Ordering},
};

use log::{debug, error, warn};
use nix::{
    fcntl::OFlag,
    sys::{
        signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal},
        termios::{self, LocalFlags, SetArg, Termios},
    },
};
use strum::Display;
use zeroize::Zeroizing;

use pinentry_trezor_core::{
    engine::{decode_typed, Collector, PinRequest},
    Collected, Error,
};

/// Warning shown when echo could not be disabled
pub const ECHO_WARNING: &str = "Warning: PIN input may be echoed.";

/// Signals abandoning entry while a [SignalTrap] is installed
pub const INTERRUPT_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// Last trapped signal number, zero when none was received
static INTERRUPTED: AtomicI32 = AtomicI32::new(0);

extern "C" fn on_interrupt(signal: c_int) {
    INTERRUPTED.store(signal, Ordering::Release);
}

/// Access to a terminal's line discipline attributes
pub trait LineDiscipline {
    type Attrs: Clone;

    /// Fetch current attributes
    fn attrs(&self) -> io::Result<Self::Attrs>;

    /// Apply attributes, flushing pending input
    fn set_attrs(&self, attrs: &Self::Attrs) -> io::Result<()>;

    /// Copy of `attrs` with local echo disabled
    fn without_echo(&self, attrs: &Self::Attrs) -> Self::Attrs;
}

/// [LineDiscipline] for a POSIX terminal file descriptor
pub struct PosixTerminal<'fd> {
    fd: BorrowedFd<'fd>,
}

impl<'fd> PosixTerminal<'fd> {
    pub fn new(fd: BorrowedFd<'fd>) -> Self {
        Self { fd }
    }
}

impl LineDiscipline for PosixTerminal<'_> {
    type Attrs = Termios;

    fn attrs(&self) -> io::Result<Termios> {
        Ok(termios::tcgetattr(self.fd)?)
    }

    fn set_attrs(&self, attrs: &Termios) -> io::Result<()> {
        Ok(termios::tcsetattr(self.fd, SetArg::TCSAFLUSH, attrs)?)
    }

    fn without_echo(&self, attrs: &Termios) -> Termios {
        let mut t = attrs.clone();
        t.local_flags.remove(LocalFlags::ECHO);
        t
    }
}

/// Disables echo while held, reapplying the saved attributes on release
pub struct EchoGuard<'a, D: LineDiscipline> {
    discipline: &'a D,
    saved: Option<D::Attrs>,
}

impl<'a, D: LineDiscipline> EchoGuard<'a, D> {
    /// Snapshot current attributes and disable echo
    pub fn engage(discipline: &'a D) -> io::Result<Self> {
        let saved = discipline.attrs()?;

        if let Err(e) = discipline.set_attrs(&discipline.without_echo(&saved)) {
            let _ = discipline.set_attrs(&saved);
            return Err(e);
        }

        Ok(Self {
            discipline,
            saved: Some(saved),
        })
    }

    /// Reapply the saved attributes
    pub fn restore(mut self) -> io::Result<()> {
        match self.saved.take() {
            Some(a) => self.discipline.set_attrs(&a),
            None => Ok(()),
        }
    }
}

impl<D: LineDiscipline> Drop for EchoGuard<'_, D> {
    fn drop(&mut self) {
        if let Some(a) = self.saved.take() {
            if let Err(e) = self.discipline.set_attrs(&a) {
                error!("Failed to restore terminal attributes: {e}");
            }
        }
    }
}

/// Records [INTERRUPT_SIGNALS] instead of terminating while held,
/// reinstating the previous dispositions on drop.
///
/// Handlers are installed without `SA_RESTART` so a blocked read returns
/// early, [Interruptible] readers then fail the read.
pub struct SignalTrap {
    previous: Vec<(Signal, SigAction)>,
}

impl SignalTrap {
    /// Install handlers, signals the process already ignores stay ignored
    pub fn install() -> io::Result<Self> {
        INTERRUPTED.store(0, Ordering::Release);

        let action = SigAction::new(
            SigHandler::Handler(on_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );

        let mut trap = Self {
            previous: Vec::with_capacity(INTERRUPT_SIGNALS.len()),
        };

        for s in INTERRUPT_SIGNALS {
            // SAFETY: the handler only stores to an atomic
            let prev = unsafe { signal::sigaction(s, &action) }?;

            if prev.handler() == SigHandler::SigIgn {
                // SAFETY: reinstates the disposition returned above
                unsafe { signal::sigaction(s, &prev) }?;
                continue;
            }

            trap.previous.push((s, prev));
        }

        Ok(trap)
    }

    /// Signal received since the last install, if any
    pub fn pending() -> Option<Signal> {
        Signal::try_from(INTERRUPTED.load(Ordering::Acquire)).ok()
    }
}

impl Drop for SignalTrap {
    fn drop(&mut self) {
        for (s, prev) in self.previous.drain(..).rev() {
            // SAFETY: reinstates the disposition returned by install
            if let Err(e) = unsafe { signal::sigaction(s, &prev) } {
                error!("Failed to reinstate {s} disposition: {e}");
            }
        }
    }
}

/// Reader failing once a trapped signal is pending
pub struct Interruptible<R> {
    inner: R,
}

impl<R: Read> Interruptible<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn check() -> io::Result<()> {
        match SignalTrap::pending() {
            Some(s) => Err(io::Error::other(format!("interrupted by {s}"))),
            None => Ok(()),
        }
    }
}

impl<R: Read> Read for Interruptible<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            Self::check()?;

            match self.inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                r => {
                    // Input racing the signal is discarded
                    Self::check()?;
                    return r;
                }
            }
        }
    }
}

/// Write `prompt` and read one line, without the line terminator
pub fn prompt_line(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> io::Result<Zeroizing<String>> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut line = Zeroizing::new(String::new());
    if input.read_line(&mut line)? == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(line)
}

/// Map a failed entry read, end of input leaves nothing to read the PIN from
fn read_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::NoInput,
        _ => Error::Io(e),
    }
}

/// Read a line with echo held off by `guard`, restoring the terminal before returning
pub fn read_guarded<D: LineDiscipline>(
    guard: EchoGuard<D>,
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> Result<Zeroizing<String>, Error> {
    let line = prompt_line(input, output, prompt);
    let restored = guard.restore();

    let line = match (line, restored) {
        (Ok(l), Ok(())) => l,
        (Ok(_), Err(e)) => return Err(Error::RestoreFailed(e)),
        (Err(e), Err(r)) => {
            error!("PIN read failed: {e}");
            return Err(Error::RestoreFailed(r));
        }
        (Err(e), Ok(())) => return Err(read_error(e)),
    };

    // Echo was off, so the user's newline was not shown
    output.write_all(b"\n")?;
    output.flush()?;

    Ok(line)
}

/// Read a line with echo disabled where the terminal permits,
/// otherwise warn and read with echo
pub fn read_entry<D: LineDiscipline>(
    discipline: &D,
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> Result<Zeroizing<String>, Error> {
    match EchoGuard::engage(discipline) {
        Ok(guard) => read_guarded(guard, input, output, prompt),
        Err(e) => {
            warn!("Unable to disable echo ({e}), falling back to plain input");

            writeln!(output, "{ECHO_WARNING}")?;
            let line = prompt_line(input, output, prompt).map_err(read_error)?;
            output.write_all(b"\n")?;
            output.flush()?;

            Ok(line)
        }
    }
}

/// Read a line from `input`, controlling echo through the terminal at `fd`
pub fn read_from(
    fd: BorrowedFd,
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> Result<Zeroizing<String>, Error> {
    read_entry(&PosixTerminal::new(fd), input, output, prompt)
}

/// Stream pair used for entry
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum Source {
    /// Named terminal device
    Tty,
    /// Process standard input, prompting on standard error
    Stdio,
}

/// Open a terminal for entry without making it the controlling terminal
pub fn open_tty(path: &str) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(path)
}

/// Prompt on the terminal at `path` (or standard streams if unavailable)
/// and return the raw typed line.
///
/// The standard input fallback only sees bytes not already buffered by the
/// protocol reader, callers send nothing after `GETPIN` until it is answered.
pub fn read_from_terminal(path: &str, prompt: &str) -> Result<Zeroizing<String>, Error> {
    let trap = match SignalTrap::install() {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("Unable to trap interrupts during entry: {e}");
            None
        }
    };

    let r = match open_tty(path) {
        Ok(tty) => {
            debug!("Reading PIN via {} '{}'", Source::Tty, path);

            let mut input = BufReader::new(Interruptible::new(tty.try_clone()?));
            let mut output = &tty;

            read_from(tty.as_fd(), &mut input, &mut output, prompt)
        }
        Err(e) => {
            debug!("Unable to open '{}' ({}), reading PIN via {}", path, e, Source::Stdio);

            let stdin = io::stdin();
            let mut input = BufReader::new(Interruptible::new(stdin.lock()));
            let mut output = io::stderr();

            read_from(stdin.as_fd(), &mut input, &mut output, prompt)
        }
    };

    drop(trap);

    match (r, SignalTrap::pending()) {
        (Err(Error::RestoreFailed(e)), _) => Err(Error::RestoreFailed(e)),
        (_, Some(s)) => {
            warn!("PIN entry interrupted by {s}");
            Err(Error::Interrupted(s.to_string()))
        }
        (r, None) => r,
    }
}

/// Terminal front end, reads a line of keyset symbols and decodes it
#[derive(Copy, Clone, Debug, Default)]
pub struct TerminalCollector;

impl Collector for TerminalCollector {
    fn collect(&mut self, req: &PinRequest) -> Result<Collected, Error> {
        let line = read_from_terminal(req.tty, req.prompt)?;

        Ok(Collected::Pin(decode_typed(req.keypad, &line)))
    }
}
