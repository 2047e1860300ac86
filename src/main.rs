use eyre::Result;
use runtime::{
    config::RelayConfig,
    Relay,
    StandardWorkflows,
};
use structopt::StructOpt as _;

pub use crate::options::Options;

mod config;
mod options;
mod signals;
mod trace;

fn main() -> Result<()> {
    util::bootstrap!("starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let options = Options::from_args();

    trace::init()?;

    let config = config::load(&options)?;
    tracing::debug!(?config, "configuration loaded");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: RelayConfig) -> Result<()> {
    if config.sensors.is_empty() {
        tracing::warn!("no sensors configured, all traffic will be discarded");
    }

    let workflows = StandardWorkflows {
        report_interval: config.report_interval(),
    };

    let relay = Relay::start(&config, &workflows).await?;

    signals::terminate().await?;
    tracing::info!("shutting down");

    relay.log_metrics();
    relay.stop().await?;

    Ok(())
}
