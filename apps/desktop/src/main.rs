use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_base_url, load_settings, render_result, HttpTransport, MemoryClipboard,
    PredictionController, Settings, SubmitOutcome,
};
use storage::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crop-advisor", about = "Crop recommendation from soil and weather data")]
struct Args {
    /// Prediction service base url. Overrides client.toml and the environment.
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    /// SQLite url for remembered inputs and saved history.
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the feature names the form would be built from.
    Schema,
    /// Fill the form and request a recommendation.
    Predict {
        /// Field value as NAME=VALUE. Unset fields keep the remembered value.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        values: Vec<String>,
        /// Append the result to the local history.
        #[arg(long, default_value_t = false)]
        save: bool,
        /// Also print the short SMS summary.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
    /// List saved predictions, newest first.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Ask the service which model artifacts are loaded.
    Status,
}

fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim(), value))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{raw}'"))
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_settings()?;
    if let Some(url) = &args.api_base_url {
        settings.api_base_url = normalize_base_url(url)?;
    }
    if let Some(url) = &args.database_url {
        settings.database_url = url.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let settings = resolve_settings(&args)?;

    let storage = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open client state at {}", settings.database_url))?;
    let mut controller = PredictionController::new(
        Arc::new(HttpTransport::new(settings.api_base_url.clone())),
        Arc::new(storage),
        Arc::new(MemoryClipboard::new()),
    );

    match args.command {
        Command::Schema => {
            let source = controller.load().await;
            if args.json {
                let names: Vec<&str> = controller
                    .schema()
                    .names()
                    .iter()
                    .map(|name| name.as_str())
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({ "source": source, "feature_names": names })
                );
            } else {
                println!("{}", controller.status().text);
                for (name, value) in controller.fields() {
                    println!("  {name} = {value}");
                }
            }
        }
        Command::Predict {
            values,
            save,
            summary,
        } => {
            controller.load().await;
            for raw in &values {
                let (name, value) = parse_assignment(raw)?;
                controller.set_field(name, value)?;
            }

            match controller.submit().await {
                SubmitOutcome::Rendered(result) => {
                    if args.json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else {
                        let rendered = render_result(&result);
                        println!("Prediction: {}", rendered.label);
                        println!("Confidence: {}", rendered.confidence);
                        if rendered.shows_top3() {
                            println!("Top 3:");
                            for line in &rendered.top3 {
                                println!("  {line}");
                            }
                        }
                    }
                    if summary {
                        println!("{}", controller.copy_summary()?);
                    }
                    if save {
                        let entries = controller.save_to_history().await?;
                        eprintln!("{} ({entries} saved)", controller.status().text);
                    }
                }
                SubmitOutcome::Invalid(err) => {
                    let names: Vec<&str> = err.names().map(|name| name.as_str()).collect();
                    bail!("{err}: {}", names.join(", "));
                }
                SubmitOutcome::Failed(err) => bail!("Error calling API: {err}"),
                SubmitOutcome::Busy => bail!("a prediction is already in flight"),
            }
        }
        Command::History { limit } => {
            let history = controller.history().await?;
            if args.json {
                let shown: Vec<_> = history.iter().take(limit).collect();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if history.is_empty() {
                println!("No saved predictions.");
            } else {
                for entry in history.iter().take(limit) {
                    let when = entry
                        .recorded_at()
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| entry.ts.to_string());
                    let rendered = render_result(&entry.result);
                    println!("{when}  {} ({})", rendered.label, rendered.confidence);
                }
            }
        }
        Command::Status => {
            let status = controller.service_status().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("model loaded:          {}", status.model_loaded);
                println!("scaler loaded:         {}", status.scaler_loaded);
                println!("label encoder loaded:  {}", status.label_encoder_loaded);
                println!("feature names known:   {}", status.feature_names_available);
                if let Some(count) = status.feature_count {
                    println!("feature count:         {count}");
                }
                println!("ready for predictions: {}", status.ready_for_predictions());
            }
        }
    }

    Ok(())
}
