use std::fs;

use eyre::{
    Result,
    WrapErr,
};
use runtime::config::{
    KeepAliveConfig,
    RelayConfig,
    SensorConfig,
};

use crate::Options;

/// Reads the configuration file, if any, and applies command line overrides.
pub fn load(options: &Options) -> Result<RelayConfig> {
    let mut config = match &options.config {
        Some(path) => {
            let text = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
            parse(&text).wrap_err_with(|| format!("parsing {}", path.display()))?
        },
        None => RelayConfig::default(),
    };

    apply(&mut config, options);

    Ok(config)
}

fn parse(text: &str) -> Result<RelayConfig> {
    Ok(toml::from_str(text)?)
}

fn apply(config: &mut RelayConfig, options: &Options) {
    if let Some(listen) = options.listen {
        config.listen = listen;
    }

    if !options.sensors.is_empty() {
        config.sensors = options
            .sensors
            .iter()
            .map(|&address| SensorConfig {
                address,
                name: None,
            })
            .collect();
    }

    if options.keep_alive && config.keep_alive.is_none() {
        config.keep_alive = Some(KeepAliveConfig::default());
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    const FILE: &str = r#"
        listen = "0.0.0.0:55555"
        report_ms = 5000

        [[sensors]]
        address = "192.168.11.11:55555"
        name = "north"

        [[sensors]]
        address = "192.168.11.12:0"

        [channel]
        queue_capacity = 8

        [sequencer]
        resend_cooldown_ms = 2000
        max_retries = 0

        [keep_alive]
        client_id = 7
    "#;

    #[test]
    fn parses_file() {
        let config = parse(FILE).unwrap();

        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors[0].name.as_deref(), Some("north"));
        assert_eq!(config.sensors[1].address.port(), 0);
        assert_eq!(config.channel.queue_capacity, 8);
        assert_eq!(config.channel.reassembly_capacity, 16 * 1024);
        assert_eq!(config.sequencer.resend_cooldown(), Duration::from_secs(2));
        assert_eq!(config.sequencer.idle_cooldown(), Duration::from_secs(1));
        assert_eq!(config.sequencer.max_retries, 0);
        assert_eq!(config.report_interval(), Duration::from_secs(5));

        let keep_alive = config.keep_alive.unwrap();
        assert_eq!(keep_alive.client_id, 7);
        assert_eq!(keep_alive.multicast, KeepAliveConfig::default().multicast);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse("[channel]\nqueue_size = 3\n").is_err());
    }

    #[test]
    fn command_line_overrides() {
        let mut config = parse(FILE).unwrap();
        let options = Options {
            config:     None,
            listen:     Some("127.0.0.1:6000".parse().unwrap()),
            sensors:    vec!["10.0.0.1:55555".parse().unwrap()],
            keep_alive: true,
        };

        apply(&mut config, &options);

        assert_eq!(config.listen, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(config.sensors.len(), 1);
        assert_eq!(config.sensors[0].address, "10.0.0.1:55555".parse().unwrap());
        assert_eq!(config.keep_alive.unwrap().client_id, 7);
    }

    #[test]
    fn defaults_without_file() {
        let options = Options {
            config:     None,
            listen:     None,
            sensors:    vec![],
            keep_alive: true,
        };

        let config = load(&options).unwrap();

        assert_eq!(config, RelayConfig {
            keep_alive: Some(KeepAliveConfig::default()),
            ..Default::default()
        });
    }
}
