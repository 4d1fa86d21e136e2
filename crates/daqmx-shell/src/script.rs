//! Feeding command lines to a [`ChannelHost`].

use std::io::{BufRead, Write};

use anyhow::Result;
use daq_driver_daqmx::ChannelHost;
use tracing::debug;

/// Prompt printed before each line in interactive mode.
pub const PROMPT: &str = "daqmx> ";

/// Execute every line of `input` and print non-empty replies to `output`.
///
/// With `interactive` set a prompt is printed before each line and `quit` or
/// `exit` ends the session. Returns the number of commands executed.
pub fn run<R: BufRead, W: Write>(
    host: &mut ChannelHost,
    input: R,
    mut output: W,
    interactive: bool,
) -> Result<usize> {
    let mut executed = 0;
    if interactive {
        write!(output, "{}", PROMPT)?;
        output.flush()?;
    }

    for line in input.lines() {
        let line = line?;
        let command = line.trim();
        if interactive && matches!(command, "quit" | "exit") {
            break;
        }

        if !command.is_empty() && !command.starts_with('#') {
            let reply = host.execute(command);
            executed += 1;
            debug!(command, reply = %reply, "Executed");
            if !reply.is_empty() {
                writeln!(output, "{}", reply)?;
            }
        }

        if interactive {
            write!(output, "{}", PROMPT)?;
            output.flush()?;
        }
    }
    Ok(executed)
}
