//! Terminal entry on pseudo terminals

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    os::fd::{AsFd, OwnedFd},
    sync::{mpsc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use nix::{
    pty::openpty,
    sys::{
        pthread::{pthread_kill, pthread_self},
        signal::Signal,
        termios::{tcgetattr, LocalFlags},
    },
    unistd::{pipe, ttyname},
};

use pinentry_trezor::{
    engine_core::{
        engine::{Collector, PinRequest},
        keypad::Keypad,
        Collected, Error, Pin,
    },
    tty::{open_tty, read_from, read_from_terminal, ECHO_WARNING},
    TerminalCollector,
};

mod helpers;
use helpers::*;

const PROMPT: &str = "Enter PIN: ";

/// Signal dispositions are process wide, so terminal reads run one at a time
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

struct Pty {
    master: File,
    slave: OwnedFd,
    path: String,
}

impl Pty {
    fn open() -> Self {
        let p = openpty(None, None).unwrap();
        let path = ttyname(&p.slave).unwrap().to_string_lossy().into_owned();

        Self {
            master: File::from(p.master),
            slave: p.slave,
            path,
        }
    }

    fn echo(&self) -> bool {
        tcgetattr(&self.slave)
            .unwrap()
            .local_flags
            .contains(LocalFlags::ECHO)
    }

    /// Read terminal output until `text` has been shown
    fn wait_for(&mut self, text: &str) -> String {
        let mut shown = String::new();
        let mut buf = [0u8; 256];

        while !shown.contains(text) {
            let n = self.master.read(&mut buf).unwrap();
            assert!(n > 0, "terminal closed before {text:?} was shown");
            shown.push_str(&String::from_utf8_lossy(&buf[..n]));
        }

        shown
    }
}

#[test]
fn tty_entry_hides_input() {
    setup_logging();
    let _s = serial();

    let mut pty = Pty::open();
    let path = pty.path.clone();

    let h = thread::spawn(move || read_from_terminal(&path, PROMPT));

    pty.wait_for(PROMPT);
    assert!(!pty.echo(), "echo enabled while waiting for entry");

    pty.master.write_all(b"xdr\n").unwrap();

    let line = h.join().unwrap().unwrap();
    assert_eq!(line.as_str(), "xdr");
    assert!(pty.echo(), "echo not restored after entry");
}

#[test]
fn interrupt_restores_echo() {
    setup_logging();
    let _s = serial();

    let mut pty = Pty::open();
    let path = pty.path.clone();

    let (tx, rx) = mpsc::channel();
    let h = thread::spawn(move || {
        tx.send(pthread_self()).unwrap();
        read_from_terminal(&path, PROMPT)
    });
    let reader = rx.recv().unwrap();

    pty.wait_for(PROMPT);
    assert!(!pty.echo());

    pthread_kill(reader, Signal::SIGINT).unwrap();

    // Wakes the reader should the signal land before the read started
    thread::sleep(Duration::from_millis(100));
    pty.master.write_all(b"\n").unwrap();

    let r = h.join().unwrap();
    assert!(
        matches!(&r, Err(Error::Interrupted(s)) if s == "SIGINT"),
        "unexpected result: {:?}",
        r.map(|_| ())
    );
    assert!(pty.echo(), "echo not restored after interrupt");
}

#[test]
fn terminal_collector_decodes_keysets() {
    setup_logging();
    let _s = serial();

    let mut pty = Pty::open();
    let path = pty.path.clone();

    let h = thread::spawn(move || {
        let k = Keypad::default();
        let req = PinRequest {
            title: "Title",
            message: "Unlock",
            error: "",
            prompt: PROMPT,
            tty: &path,
            keypad: &k,
        };

        TerminalCollector.collect(&req)
    });

    pty.wait_for(PROMPT);
    pty.master.write_all(b"1do\n").unwrap();

    let r = h.join().unwrap().unwrap();
    assert_eq!(r, Collected::Pin(Pin::from("159")));
}

#[test]
fn non_terminal_input_warns() {
    let (r, w) = pipe().unwrap();

    let mut w = File::from(w);
    w.write_all(b"456\n").unwrap();
    drop(w);

    let r = File::from(r);
    let mut input = BufReader::new(&r);
    let mut output = vec![];

    let line = read_from(r.as_fd(), &mut input, &mut output, PROMPT).unwrap();

    assert_eq!(line.as_str(), "456");
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("{ECHO_WARNING}\n{PROMPT}\n")
    );
}

#[test]
fn open_tty_read_write() {
    let mut pty = Pty::open();

    let mut tty = open_tty(&pty.path).unwrap();
    tty.write_all(b"hello").unwrap();

    pty.wait_for("hello");
}

#[test]
fn open_tty_missing_device() {
    assert!(open_tty("/nonexistent/tty").is_err());
}
