//! Operator console on stdin

use std::io::{self, BufRead};
use std::thread;

use qlight_registry::handlers::VERSION;
use tokio::sync::oneshot;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Unknown(String),
}

/// Why the console stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator asked for shutdown.
    Quit,
    /// Input ended or failed, e.g. when running detached.
    Closed,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim();
    if word.is_empty() {
        return None;
    }
    Some(match word.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(word.to_string()),
    })
}

pub fn help_text() -> String {
    format!(
        "qlightAPI {VERSION}\n\
         commands:\n  \
         help   show this list\n  \
         quit   flush the registry and stop the server"
    )
}

/// Read commands until `quit` or end of input.
pub fn run<R: BufRead>(input: R) -> ConsoleExit {
    for line in input.lines() {
        match line {
            Ok(line) => match parse_command(&line) {
                Some(Command::Help) => println!("{}", help_text()),
                Some(Command::Quit) => {
                    info!("shutdown requested from console");
                    return ConsoleExit::Quit;
                }
                Some(Command::Unknown(word)) => println!("unknown command '{word}', try 'help'"),
                None => {}
            },
            Err(err) => {
                warn!(error = %err, "console input failed");
                return ConsoleExit::Closed;
            }
        }
    }
    ConsoleExit::Closed
}

/// Run the console over `input` on its own OS thread.
///
/// The thread is never joined, so a read still blocked at exit does not hold up the
/// runtime. The receiver errors if the thread could not start.
pub fn spawn_with<R>(input: R) -> oneshot::Receiver<ConsoleExit>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let started = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let _ = tx.send(run(input));
        });
    if let Err(err) = started {
        warn!(error = %err, "console thread failed to start");
    }
    rx
}

/// Console on the process stdin.
pub fn spawn() -> oneshot::Receiver<ConsoleExit> {
    spawn_with(io::BufReader::new(io::stdin()))
}
