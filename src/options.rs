use std::{
    net::SocketAddr,
    path::PathBuf,
};

#[derive(Debug, Clone, PartialEq, Eq, structopt::StructOpt)]
#[structopt(about = "Relays smartmicro radar traffic and exchanges instructions with the sensors.")]
pub struct Options {
    /// TOML configuration file. Command line values take precedence.
    #[structopt(short, long)]
    pub config: Option<PathBuf>,

    /// Address to receive sensor traffic on.
    #[structopt(short, long)]
    pub listen: Option<SocketAddr>,

    /// Sensor source address, repeatable. Replaces the sensors from the configuration file.
    #[structopt(short, long = "sensor")]
    pub sensors: Vec<SocketAddr>,

    /// Announce this client to sensors on the keep-alive multicast group.
    #[structopt(long)]
    pub keep_alive: bool,
}
