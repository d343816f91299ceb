mod draw;
mod experiments;
mod input;

use color_eyre::Report;
use structopt::StructOpt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Cli {
    /// Enable debug logging, `RUST_LOG` takes precedence when set
    #[structopt(short, long, global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    /// Draw the winners of a single round
    Draw(draw::DrawWinners),
    /// Repeat the draw over the same holders and report how often each of them wins
    Experiments(experiments::RunExperiments),
}

impl Cli {
    pub fn exec(self) -> Result<(), Report> {
        init_logging(self.verbose);
        match self.command {
            Command::Draw(cmd) => cmd.exec(),
            Command::Experiments(cmd) => cmd.exec(),
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    // stdout is reserved to results
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
