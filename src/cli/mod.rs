pub mod commands;
pub mod dispatch;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "citation-export")]
#[command(version, about = "Bulk RIS citation export from paginated search results")]
#[command(
    long_about = "Drives a Chromium browser through every page of a search result list, \
                  exporting each page's citations as a page-stamped RIS file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Run Chrome in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Chrome debugging port")]
    pub port: Option<u16>,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> crate::config::ConfigOverrides {
        let mut overrides = crate::config::ConfigOverrides {
            headless: self.headless,
            port: self.port,
            chrome_path: self.chrome_path.clone(),
            ..Default::default()
        };

        if let Some(commands::Command::Run {
            url,
            download_dir,
            download_timeout,
        }) = &self.command
        {
            overrides.start_url = url.clone();
            overrides.download_dir = download_dir.clone();
            overrides.download_timeout = *download_timeout;
        }

        overrides
    }
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        crate::config::Config::load_from_file(config_path)?
    } else {
        crate::config::Config::load()?
    };

    let config = config.load_with_overrides(cli.overrides());

    dispatch::dispatch(cli, config).await
}
