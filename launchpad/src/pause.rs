//! Hold the terminal open until the operator presses Enter.

use std::io::{self, BufRead, IsTerminal, Write};

pub const PROMPT: &str = "Press Enter to close...";

/// Print the prompt and block until a line (or EOF) arrives on `input`.
pub fn wait_for_acknowledgement<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<()> {
    writeln!(output)?;
    write!(output, "{}", PROMPT)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Pause only when enabled and a human can answer; piped or scripted runs
/// never block.
pub fn pause_if_interactive(enabled: bool) {
    if !enabled || !io::stdin().is_terminal() {
        return;
    }
    let stdin = io::stdin();
    if let Err(e) = wait_for_acknowledgement(&mut stdin.lock(), &mut io::stderr()) {
        tracing::debug!("Pause aborted: {}", e);
    }
}
