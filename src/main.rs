use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = tasksync::cli::Cli::parse();
    tasksync::init_tracing(cli.log_filter.clone())?;

    let config = tasksync::config::from_cli(&cli)?;
    let format = tasksync::commands::OutputFormat::from_flag(cli.json);
    let command = cli.command.clone().unwrap_or_default();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    tasksync::commands::execute_blocking(
        &config,
        command,
        format,
        &tasksync::prompt::TerminalPrompt,
        &mut handle,
    )?;

    Ok(())
}
