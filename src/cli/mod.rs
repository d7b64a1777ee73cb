use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "cpclient", version, about = "Credential provider password client")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch account attributes from the vault
    Fetch(FetchOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args)]
pub struct FetchOpts {
    #[arg(short, long, env = "CPCLIENT_CONFIG")]
    pub config: Option<String>,
    /// Safe holding the account
    #[arg(long = "safename")]
    pub safe: Option<String>,
    /// Application ID the provider authorises
    #[arg(long = "appid")]
    pub app_id: Option<String>,
    /// Account object name
    #[arg(long = "objname")]
    pub object: Option<String>,
    #[arg(long)]
    pub folder: Option<String>,
    /// Reason recorded in the vault audit
    #[arg(long)]
    pub reason: Option<String>,
    /// Attribute to fetch (repeatable), e.g. Password or PassProps.Port
    #[arg(short, long = "attr")]
    pub attributes: Vec<String>,
    /// Print values instead of redacted previews
    #[arg(long)]
    pub show_values: bool,
    /// Report unavailable attributes instead of failing
    #[arg(long)]
    pub lenient: bool,
    /// Print a JSON object instead of one line per attribute
    #[arg(long)]
    pub json: bool,
}

impl FetchOpts {
    /// Layer command-line values over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(safe) = &self.safe {
            config.request.safe = safe.clone();
        }
        if let Some(app_id) = &self.app_id {
            config.request.app_id = app_id.clone();
        }
        if let Some(object) = &self.object {
            config.request.object = object.clone();
        }
        if let Some(folder) = &self.folder {
            config.request.folder = Some(folder.clone());
        }
        if let Some(reason) = &self.reason {
            config.request.reason = Some(reason.clone());
        }
        if !self.attributes.is_empty() {
            config.attributes = self.attributes.clone();
        }
    }
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[arg(short, long, env = "CPCLIENT_CONFIG")]
    pub config: Option<String>,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_flags_override_config() {
        let cli = Cli::parse_from([
            "cpclient",
            "fetch",
            "--safename",
            "Apps",
            "--appid",
            "IntegrationHost",
            "--objname",
            "host",
            "--attr",
            "PassProps.Port",
            "-a",
            "PassProps.PAMUser",
        ]);
        let Commands::Fetch(opts) = cli.command else {
            panic!("expected fetch");
        };

        let mut config = Config::default();
        opts.apply(&mut config);
        assert_eq!(config.request.safe, "Apps");
        assert_eq!(config.request.app_id, "IntegrationHost");
        assert_eq!(config.request.object, "host");
        assert_eq!(config.request.folder, None);
        assert_eq!(config.attributes, vec!["PassProps.Port", "PassProps.PAMUser"]);
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::parse_from(["cpclient", "config", "show", "-d"]);
        assert!(cli.debug);
    }
}
