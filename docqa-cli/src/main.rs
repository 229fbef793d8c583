mod render;
mod settings;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_rag::{PdfLoader, RagConfig, RagPipeline};
use docqa_server::{ServerConfig, run_server};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::settings::Settings;
use crate::telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Ask questions about a small set of PDF documents and get answers with cited sources"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Log output format
    #[arg(long, env = "DOCQA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which documents and credentials are available
    Status,
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,
    },
    /// Ask questions interactively
    Chat,
    /// Serve the web UI
    Serve {
        #[arg(long, env = "DOCQA_HOST", default_value = "127.0.0.1")]
        host: String,
        #[arg(long, env = "DOCQA_PORT", default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    let config = cli.settings.to_config().context("invalid configuration")?;

    match cli.command {
        Command::Status => status(&config),
        Command::Ask { question } => ask(config, &question).await,
        Command::Chat => chat(config).await,
        Command::Serve { host, port } => {
            let pipeline = pipeline(config)?;
            run_server(ServerConfig { host, port }, pipeline).await
        }
    }
}

fn pipeline(config: RagConfig) -> Result<Arc<RagPipeline>> {
    let pipeline = RagPipeline::from_config(config)
        .context("could not set up the embedding and generation providers")?;
    Ok(Arc::new(pipeline))
}

fn status(config: &RagConfig) -> Result<()> {
    let candidates = PdfLoader::from_config(config).probe();
    print!("{}", render::status(config, &candidates, &config.credential_status()));
    Ok(())
}

async fn ask(config: RagConfig, question: &str) -> Result<()> {
    let question = question.trim();
    anyhow::ensure!(!question.is_empty(), "question must not be empty");

    let snippet_chars = config.snippet_chars;
    let pipeline = pipeline(config)?;
    let answer = pipeline.ask(question).await?;
    print!("{}", render::answer(&answer, snippet_chars));
    Ok(())
}

async fn chat(config: RagConfig) -> Result<()> {
    let snippet_chars = config.snippet_chars;
    let pipeline = pipeline(config)?;

    let knowledge_base =
        pipeline.knowledge_base().await.context("the knowledge base could not be built")?;
    println!(
        "Loaded {} pages ({} chunks) from {} document(s). Type 'exit' to quit.",
        knowledge_base.page_count(),
        knowledge_base.chunk_count(),
        knowledge_base.sources().len()
    );

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        let _ = editor.add_history_entry(question);

        match pipeline.ask(question).await {
            Ok(answer) => println!("{}", render::answer(&answer, snippet_chars)),
            Err(e) => {
                warn!(error = %e, "question failed");
                eprintln!("Error: {e}\n");
            }
        }
    }

    info!("chat session ended");
    Ok(())
}
