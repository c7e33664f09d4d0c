//! cockpit - inspect the view catalog a configuration produces

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cockpit_core::{logging, Cockpit, CockpitConfig};
use cockpit_views::ViewContext;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cockpit", version, about = "Inspect the cockpit view catalog")]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the views an extension point shows
    Views {
        /// Extension point to query
        #[arg(long, short)]
        extension_point: String,

        /// Context entry as key=value; values parse as JSON, else as strings
        #[arg(long = "context", value_parser = parse_context_entry)]
        context: Vec<(String, Value)>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List known extension points
    Points,
}

fn parse_context_entry(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected key=value, got '{raw}'");
    };
    if key.is_empty() {
        bail!("empty key in '{raw}'");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CockpitConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => CockpitConfig::default(),
    };
    logging::init(&config.log)?;

    let cockpit = Cockpit::bootstrap(config, Vec::new()).context("bootstrapping cockpit")?;

    match cli.command {
        Command::Views {
            extension_point,
            context,
            json,
        } => {
            let context: ViewContext = context.into_iter().collect();
            let views = cockpit.describe(&extension_point, Some(&context));
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if views.is_empty() {
                println!("No views for {extension_point}");
            } else {
                for view in &views {
                    println!(
                        "{:>6}  {:<24} {}{}",
                        view.priority,
                        view.id,
                        view.label.as_deref().unwrap_or("-"),
                        if view.default { "  (default)" } else { "" }
                    );
                }
            }
        }
        Command::Points => {
            let registry = cockpit.views();
            for point in registry.extension_points() {
                let shown = registry.query(point, None).len();
                println!("{point}  ({shown} shown without context)");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn context_entries_parse_json_or_string() {
        assert_eq!(
            parse_context_entry("admin=true").unwrap(),
            ("admin".to_owned(), Value::Bool(true))
        );
        assert_eq!(
            parse_context_entry("tenant=acme").unwrap(),
            ("tenant".to_owned(), Value::String("acme".into()))
        );
        assert!(parse_context_entry("novalue").is_err());
        assert!(parse_context_entry("=1").is_err());
    }

    #[test]
    fn views_subcommand_collects_context() {
        let cli = Cli::parse_from([
            "cockpit",
            "views",
            "--extension-point",
            "cockpit.dashboard",
            "--context",
            "admin=true",
            "--context",
            "id=7",
            "--json",
        ]);
        match cli.command {
            Command::Views { context, json, .. } => {
                assert!(json);
                assert_eq!(context.len(), 2);
                assert_eq!(context[1], ("id".to_owned(), Value::from(7)));
            }
            Command::Points => panic!("expected views"),
        }
    }
}
