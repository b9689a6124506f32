pub mod assets;

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Print `msg` and read one line from stdin, trimmed.
pub fn prompt(msg: &str) -> Result<String> {
	print!("{msg}");
	std::io::stdout().flush().context("flush stdout")?;
	let mut line = String::new();
	let read = std::io::stdin().lock().read_line(&mut line).context("read stdin")?;
	anyhow::ensure!(read > 0, "stdin closed");
	Ok(line.trim().to_string())
}
