use eyre::{
    Result,
    WrapErr,
};
use tracing_subscriber::{
    prelude::*,
    EnvFilter,
};

use util::bootstrap;

cfg_if::cfg_if! {
    if #[cfg(debug_assertions)] {
        const DEFAULT_FILTER: &str = "info,radarlink=debug,radarlink_runtime=debug,radarlink_net=debug,radarlink_codec=debug,radarlink_message=debug,radarlink_util=debug";
    } else {
        const DEFAULT_FILTER: &str = "warn,radarlink=info,radarlink_runtime=info,radarlink_net=info,radarlink_codec=info,radarlink_message=info,radarlink_util=info";
    }
}

pub fn init() -> Result<()> {
    let level_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    bootstrap!("enabling tracing with filter directive: {}", level_filter);

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    #[cfg(debug_assertions)]
    let layer = stderr_layer.pretty().with_target(false).with_filter(level_filter);

    #[cfg(not(debug_assertions))]
    let layer = stderr_layer.json().with_current_span(true).with_filter(level_filter);

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .wrap_err("installing tracing subscriber")
}
