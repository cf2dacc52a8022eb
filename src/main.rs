use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use paperqa::io::write_json;
use paperqa::{
    AnthropicClient, AnthropicConfig, ArxivClient, ArxivConfig, CancellationToken, CitationStyle,
    CompletionBackend, MarkdownRenderer, OpenAiClient, OpenAiConfig, Pipeline, PipelineConfig,
    PipelineError, PromptStyle, RenderConfig, RunReport,
};

#[derive(Parser)]
#[command(name = "paperqa")]
#[command(author, version, about = "Answer questions from arXiv papers", long_about = None)]
struct Cli {
    /// Defaults to `repl` when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: RunArgs,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Commands {
    /// Read questions from stdin and answer each one
    Repl,

    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum Provider {
    Openai,
    Anthropic,
}

#[derive(Args)]
struct RunArgs {
    /// Completion provider
    #[arg(long, global = true, value_enum, default_value = "openai")]
    provider: Provider,

    /// Model identifier (provider default if omitted)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Prompt style: summary or scientific
    #[arg(long, global = true, default_value = "summary")]
    style: PromptStyle,

    /// Bibliography style for scientific answers
    #[arg(long, global = true, default_value = "apa")]
    citation_style: CitationStyle,

    /// Maximum number of papers to retrieve
    #[arg(long, global = true, default_value = "8")]
    max_docs: usize,

    /// Retrieve abstract snippets instead of full abstracts
    #[arg(long, global = true)]
    summary_only: bool,

    /// Maximum concurrent per-paper completion calls
    #[arg(long, global = true, default_value = "4")]
    concurrency: usize,

    /// Retries per paper when a completion call fails
    #[arg(long, global = true, default_value = "2")]
    max_retries: u32,

    /// Timeout for each backend call in seconds
    #[arg(long, global = true, default_value = "120")]
    timeout_secs: u64,

    /// Write each answer as a Markdown document into this directory
    #[arg(long, global = true)]
    render_dir: Option<PathBuf>,

    /// Author line of rendered documents
    #[arg(long, global = true, default_value = "paperqa")]
    author: String,

    /// Write the full run report as JSON to this file
    #[arg(long, global = true)]
    state_json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let args = cli.args;

    setup_logging(args.verbose);
    let pipeline = build_pipeline(&args)?;

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl(&pipeline, &args).await,
        Commands::Ask { question } => {
            let report = answer(&pipeline, &question, &args, &CancellationToken::new())
                .await
                .context("Failed to answer question")?;
            println!("{}", report.final_output());
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Build the backends once; every question reuses them
fn build_pipeline(args: &RunArgs) -> Result<Pipeline> {
    let timeout = Duration::from_secs(args.timeout_secs);

    let completer: Arc<dyn CompletionBackend> = match args.provider {
        Provider::Openai => {
            let mut config = OpenAiConfig::from_env()?;
            if let Some(model) = &args.model {
                config.model = model.clone();
            }
            config.timeout = timeout;
            let client = OpenAiClient::new(config)?;
            info!("Using OpenAI model {}", client.model());
            Arc::new(client)
        }
        Provider::Anthropic => {
            let mut config = AnthropicConfig::from_env()?;
            if let Some(model) = &args.model {
                config.model = model.clone();
            }
            config.timeout = timeout;
            let client = AnthropicClient::new(config)?;
            info!("Using Anthropic model {}", client.model());
            Arc::new(client)
        }
    };

    let retriever = ArxivClient::new(ArxivConfig {
        timeout,
        ..Default::default()
    })?;

    let mut config = PipelineConfig::default().with_style(args.style);
    config.retrieve.max_documents = args.max_docs;
    config.retrieve.full_text = !args.summary_only;
    config.retrieve.timeout = timeout;
    config.summarize.concurrency = args.concurrency;
    config.summarize.max_retries = args.max_retries;
    config.summarize.timeout = timeout;
    config.synthesize.citation_style = args.citation_style;
    config.synthesize.timeout = timeout;

    let mut pipeline = Pipeline::new(Arc::new(retriever), completer, config);
    if let Some(dir) = &args.render_dir {
        pipeline = pipeline.with_renderer(Arc::new(MarkdownRenderer::new(RenderConfig {
            output_dir: dir.clone(),
            author: args.author.clone(),
        })));
    }

    Ok(pipeline)
}

/// Run the pipeline once and write the optional JSON report
async fn answer(
    pipeline: &Pipeline,
    question: &str,
    args: &RunArgs,
    cancel: &CancellationToken,
) -> Result<RunReport, PipelineError> {
    let report = pipeline.run(question, cancel).await?;

    if report.retrieval.is_degraded() {
        warn!("No papers could be retrieved; the answer is not grounded in sources");
    }

    if let Some(path) = &args.state_json {
        match write_json(&report, path) {
            Ok(()) => info!("Run report written to {:?}", path),
            Err(e) => warn!("Failed to write run report: {}", e),
        }
    }

    Ok(report)
}

async fn repl(pipeline: &Pipeline, args: &RunArgs) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Enter your question: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read question")?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let Some(line) = line else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        let cancel = CancellationToken::new();
        let run = answer(pipeline, question, args, &cancel);
        tokio::pin!(run);

        let result = tokio::select! {
            result = &mut run => result,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel("interrupted by user");
                run.await
            }
        };

        match result {
            Ok(report) => println!("\n{}\n", report.final_output()),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}
