use anyhow::Result;
use clap::Parser;
use crossterm::style::Stylize;
use projectchat_cli::{app, handle_command, Cli, CommandResult};
use projectchat_core::{ProjectStore, Settings};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load();
    cli.apply_overrides(&mut settings);

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("Error: {e:#}").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let store = ProjectStore::new(&settings.storage.projects_dir);

    match handle_command(&store, &cli.command)? {
        CommandResult::Message(text) => println!("{text}"),
        CommandResult::StartChat { project } => {
            app::run_chat(&settings, &store, project.as_deref()).await?;
        }
    }

    Ok(())
}
