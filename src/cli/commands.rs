use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Export every results page as a RIS file")]
    Run {
        #[arg(long, help = "Search results URL to start from")]
        url: Option<String>,
        #[arg(long, help = "Directory the browser downloads into")]
        download_dir: Option<PathBuf>,
        #[arg(long, help = "Seconds to wait for each export file")]
        download_timeout: Option<u64>,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    #[command(about = "Initialize config file with defaults")]
    Init,

    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Show config file path")]
    Path,
}
