use super::{
    Cli,
    commands::{Command, ConfigCommand},
};
use crate::{ExportError, Result, config::Config, handlers, output};

pub async fn dispatch(mut cli: Cli, config: Config) -> Result<()> {
    let command = match cli.command.take() {
        Some(cmd) => cmd,
        None => {
            eprintln!("No command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    match command {
        Command::Run { .. } => handle_run_command(&cli, &config).await,
        Command::Config { subcommand } => handle_config_command(subcommand, &cli, &config),
    }
}

async fn handle_run_command(cli: &Cli, config: &Config) -> Result<()> {
    config.validate()?;

    let report = handlers::run::handle_run(config, !cli.json).await?;
    if cli.json {
        output::print_output(&report, true, true)?;
    }

    match report.status {
        crate::export::RunStatus::Completed { .. } => Ok(()),
        crate::export::RunStatus::Aborted { page, reason, .. } => Err(ExportError::RunAborted {
            page: page.get(),
            reason,
        }),
        crate::export::RunStatus::Interrupted { page } => Err(ExportError::RunAborted {
            page: page.get(),
            reason: "interrupted".to_string(),
        }),
    }
}

fn handle_config_command(subcommand: ConfigCommand, cli: &Cli, config: &Config) -> Result<()> {
    match subcommand {
        ConfigCommand::Init => {
            let result = handlers::config_handler::handle_config_init()?;
            output::print_output(&result, cli.json, true)
        }
        ConfigCommand::Show => {
            let result = handlers::config_handler::handle_config_show(config);
            output::print_output(&result, cli.json, true)
        }
        ConfigCommand::Path => {
            let result = handlers::config_handler::handle_config_path()?;
            output::print_output(&result, cli.json, true)
        }
    }
}
