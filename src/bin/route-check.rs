use std::path::PathBuf;

use axum::http::Uri;
use clap::Parser;
use serde_json::json;

use rule_proxy::config::load_config;
use rule_proxy::routing::{RequestView, Router};

#[derive(Parser)]
#[command(name = "route-check")]
#[command(about = "Show which forwarding rule a request hits and where it is sent", long_about = None)]
struct Cli {
    /// TOML or JSON configuration file holding the rules.
    #[arg(short, long)]
    config: PathBuf,

    /// Host to route as. Defaults to the authority of the URL.
    #[arg(long)]
    host: Option<String>,

    /// Absolute URL (`http://a.com/api/users?x=1`) or path (`/api/users`).
    url: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let router = Router::from_config(&config);

    let uri: Uri = cli.url.parse()?;
    let host = cli
        .host
        .as_deref()
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default();
    let view = RequestView::new(host, &uri);

    let report = match router.route(&view) {
        Some(matched) => json!({
            "matched": true,
            "rule": matched.index,
            "source_host": matched.rule.source_host,
            "source_path": matched.rule.source_path,
            "destination": matched.destination.to_string(),
        }),
        None => json!({
            "matched": false,
            "host": host,
            "path": view.path(),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
