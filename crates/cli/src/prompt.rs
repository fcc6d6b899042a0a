use std::io::{self, BufRead, Write};

use tasksync_core::ConfirmationPrompt;

/// Asks on stderr and reads the answer from stdin. Anything but "y"/"yes" is a no.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl ConfirmationPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        let stdin = io::stdin();
        let stderr = io::stderr();
        match ask(message, stdin.lock(), stderr.lock()) {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "could not read confirmation; treating as no");
                false
            }
        }
    }
}

fn ask<R: BufRead, W: Write>(message: &str, mut reader: R, mut writer: W) -> io::Result<bool> {
    write!(writer, "{message} [y/N] ")?;
    writer.flush()?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
