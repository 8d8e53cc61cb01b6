mod server;
mod settings;

use crate::settings::Settings;
use anyhow::Context;
use frc_api::summary::SummaryRequest;
use frc_api::tba::match_from_value;

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Serve,
    Summarize(MatchSource),
    Help,
    Version,
    Invalid(String),
}

#[derive(Debug, PartialEq, Eq)]
enum MatchSource {
    Key(String),
    File(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = match parse_args(&args) {
        CliAction::Help => {
            println!("{}", usage_text());
            return Ok(());
        }
        CliAction::Version => {
            println!("frc-summary {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        CliAction::Invalid(arg) => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
        action => action,
    };

    let settings = Settings::load();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .init();

    match action {
        CliAction::Summarize(source) => summarize_once(&settings, source).await,
        _ => server::serve(&settings.bind, settings.summarizer()).await,
    }
}

fn parse_args(args: &[String]) -> CliAction {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] => CliAction::Serve,
        ["-h" | "--help"] => CliAction::Help,
        ["-V" | "--version"] => CliAction::Version,
        ["summarize", "--file", path] => CliAction::Summarize(MatchSource::File(path.to_string())),
        ["summarize", key] if !key.starts_with('-') => {
            CliAction::Summarize(MatchSource::Key(key.to_string()))
        }
        _ => CliAction::Invalid(args.join(" ")),
    }
}

async fn summarize_once(settings: &Settings, source: MatchSource) -> anyhow::Result<()> {
    let request = match source {
        MatchSource::Key(key) => SummaryRequest { match_key: Some(key), record: None },
        MatchSource::File(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read {path}"))?;
            let raw: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("invalid match json at {path}"))?;
            SummaryRequest { match_key: None, record: Some(match_from_value(raw)) }
        }
    };

    let result = settings.summarizer().summarize(request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn usage_text() -> &'static str {
    "frc-summary - FRC match summary service

Usage:
  frc-summary                          Run the HTTP service
  frc-summary summarize <match_key>    Summarize one match fetched from TBA
  frc-summary summarize --file <path>  Summarize a match JSON file
  frc-summary --help
  frc-summary --version

Environment:
  FRC_SUMMARY_BIND          Listen address (default 0.0.0.0:8080)
  FRC_SUMMARY_TIMEOUT_SECS  Per-call timeout for TBA and providers (default 10)
  LOG_LEVEL                 Log filter when RUST_LOG is unset (default info)
  TBA_API_KEY, TBA_BASE_URL
  OPENROUTER_API_KEY, OPENROUTER_MODEL, OPENROUTER_SITE_URL, OPENROUTER_APP_NAME,
  OPENROUTER_BASE_URL
  AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_DEPLOYMENT, AZURE_OPENAI_API_KEY
  OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_MODEL
  GROQ_API_KEY, GROQ_MODEL, GROQ_BASE_URL

Providers are tried in the order listed; only the first configured one is
called. With none configured, summaries are built without a network call."
}
