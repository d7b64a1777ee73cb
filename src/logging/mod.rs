use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "CPCLIENT_LOG_FORMAT";

/// Initialise the global subscriber. Logs go to stderr so retrieved values
/// on stdout stay machine-readable.
pub fn init(debug: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let mut filter = EnvFilter::from_default_env();
    if let Some(directive) = default_directive(debug, rust_log.as_deref()) {
        filter = filter.add_directive(directive.parse().unwrap());
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_requested(std::env::var(LOG_FORMAT_ENV).ok().as_deref()) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// The crate directive to add on top of `RUST_LOG`. `-d` always wins;
/// otherwise a non-empty `RUST_LOG` is left alone.
fn default_directive(debug: bool, rust_log: Option<&str>) -> Option<&'static str> {
    if debug {
        Some("cpclient=debug")
    } else if rust_log.is_some_and(|v| !v.trim().is_empty()) {
        None
    } else {
        Some("cpclient=info")
    }
}

fn json_requested(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}
