use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use email_triage::classifier::EmailClassifier;
use email_triage::config::{ClassifierConfig, ProviderSelection};
use email_triage::input;

#[derive(Parser, Debug)]
#[command(name = "email-triage", version)]
#[command(about = "Classify a message as Produtivo or Improdutivo and suggest a reply")]
struct Cli {
    /// Read the message from a plain-text file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Message text; read from stdin when neither this nor --file is given
    #[arg(trailing_var_arg = true)]
    text: Vec<String>,
}

/// Where the message comes from.
#[derive(Debug, PartialEq, Eq)]
enum Source {
    File(PathBuf),
    Inline(String),
    Stdin,
}

impl Cli {
    fn source(self) -> Source {
        match self.file {
            Some(path) => Source::File(path),
            None if self.text.is_empty() => Source::Stdin,
            None => Source::Inline(self.text.join(" ")),
        }
    }
}

async fn read_source(source: Source) -> email_triage::Result<String> {
    let text = match source {
        Source::File(path) => input::read_text(&path).await?,
        Source::Inline(text) => input::require_text(text)?,
        Source::Stdin => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(email_triage::error::InputError::from)?;
            input::decode_bytes("stdin", &buf)?
        }
    };
    Ok(text)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env in the working directory
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let source = Cli::parse().source();

    let config = ClassifierConfig::from_env()?;

    eprintln!("📬 Email Triage v{}", env!("CARGO_PKG_VERSION"));
    match config.selection {
        ProviderSelection::RuleOnly => eprintln!("   Mode: rule-based only"),
        ProviderSelection::Llm(primary) => eprintln!(
            "   Primary provider: {} (fallback: {})",
            primary.as_str(),
            primary.other().as_str()
        ),
    }

    let text = read_source(source).await?;

    let classifier = EmailClassifier::from_config(&config);
    let result = classifier.classify_and_respond(&text).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
