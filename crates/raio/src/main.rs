use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use raio::telemetry::{self, LogFormat};
use raio::{
    CommandPresenter, ImapConnector, MailboxCredentials, Poller, RaioError, Shutdown,
};

/// Polls a mailbox and shows image attachments on the display.
#[derive(Debug, Parser)]
#[command(name = "raio", version, about)]
struct Cli {
    /// Configuration file; created interactively when missing.
    #[arg(short, long, env = "RAIO_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("raio: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> raio::Result<()> {
    telemetry::init_logging(cli.log_format)?;
    info!("Raio started");

    let config = raio::load_or_setup(&cli.config)?;
    let credentials = MailboxCredentials::from_config(&config.imap)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| RaioError::Runtime { source })?;

    runtime.block_on(async {
        let connector = ImapConnector::new(&config.imap, credentials);
        let presenter = CommandPresenter::new(&config.presenter);
        let mut poller = Poller::new(&config, connector, presenter);

        if cli.once {
            let report = poller.run_cycle().await?;
            info!(
                "Processed {} of {} messages ({} failed)",
                report.processed, report.listed, report.failed
            );
            return Ok(());
        }

        let (shutdown, signal) = Shutdown::channel();
        shutdown.install_ctrlc()?;
        poller.run(signal).await;
        Ok::<(), RaioError>(())
    })
}
