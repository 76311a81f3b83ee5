//! Operator confirmation capability

use std::io::{self, BufRead, Write};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Yes/no question to the operator
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Interactive confirmation on the terminal
///
/// Prints the message and reads one line; an answer starting with `y`
/// confirms. End of input or a read error is a refusal. The read runs
/// outside the async scheduler when called from a multi-threaded runtime.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        run_blocking(|| ask(message, &mut io::stdin().lock(), &mut io::stdout()))
    }
}

/// Print `message` to `output` and read one answer line from `input`
fn ask(message: &str, input: &mut impl BufRead, output: &mut impl Write) -> bool {
    if write!(output, "{}", message).and_then(|_| output.flush()).is_err() {
        return false;
    }

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_affirmative(&answer),
    }
}

/// Run blocking terminal I/O without stalling other tasks on this worker
///
/// `block_in_place` is only available on the multi-threaded runtime; anywhere
/// else the closure runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Non-interactive answer, for scripted runs and tests
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    answer.trim_start().to_lowercase().starts_with('y')
}
