use std::collections::BTreeMap;

use anyhow::Context;
use clap::Parser;
use cpclient::cli::{Cli, Commands, ConfigAction, FetchOpts};
use cpclient::config::{validate_config_object, Config};
use cpclient::logging;
use cpclient::provider::{AttributeValue, CredentialProvider};
use cpclient::sdk::native::NativeRuntime;
use tracing::info;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.debug);

    match cli.command {
        Commands::Fetch(opts) => fetch(&opts)?,
        Commands::Config(opts) => {
            let config = Config::load(opts.config.as_deref())?;
            match opts.action {
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                ConfigAction::Validate => {
                    validate_config_object(&config)?;
                    info!("Configuration is valid");
                }
                ConfigAction::Init => {
                    Config::write_default(opts.config.as_deref().unwrap_or("cpclient.json"))?;
                    info!("Configuration file created");
                }
            }
        }
        Commands::Version => {
            println!("cpclient {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn fetch(opts: &FetchOpts) -> anyhow::Result<()> {
    let mut config = Config::load(opts.config.as_deref())?;
    opts.apply(&mut config);
    validate_config_object(&config)?;

    let client = CredentialProvider::new(NativeRuntime::new());
    let names = config.attributes.as_slice();

    let values = if opts.lenient {
        client
            .fetch_available_attributes(&config.request, names)
            .context("password request failed")?
            .values
    } else {
        client
            .fetch_attributes(&config.request, names)
            .context("attribute retrieval failed")?
    };

    let render = |value: &AttributeValue| {
        if opts.show_values {
            value.as_str().to_string()
        } else {
            value.redacted()
        }
    };

    if opts.json {
        let out: BTreeMap<&str, String> = names
            .iter()
            .filter_map(|name| values.get(name).map(|v| (name.as_str(), render(v))))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for name in names {
            if let Some(value) = values.get(name) {
                println!("{name}: {}", render(value));
            }
        }
    }

    Ok(())
}
