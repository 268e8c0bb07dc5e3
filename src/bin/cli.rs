//! ocbot CLI
//!
//! Command-line tools for operating the bot: talk to the chat API, inspect
//! conversation state, manage stickers, force a summary round and check the
//! configuration.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use ocbot::agent::ChatApi;
use ocbot::config::{config_path, load_config, validate_config, Config};
use ocbot::core::{ApiChannel, StateStore};
use ocbot::emoji::EmotionMapping;
use ocbot::memory::SummaryOutcome;
use ocbot::state::FileStateStore;
use ocbot::{App, VERSION};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ocbot",
    author = "ocbot Contributors",
    version = VERSION,
    about = "ocbot - QQ group chat bot for conversational AI apps",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message on the primary conversation
    Ask {
        /// Message text
        text: String,
        /// Also forward the exchange to the memory app
        #[arg(long)]
        remember: bool,
    },

    /// Inspect or reset conversation state
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Manage emotion stickers
    Emotions {
        #[command(subcommand)]
        action: EmotionsAction,
    },

    /// Run a summary round now
    Summarize,

    /// Check or print the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Show conversation records and the summary flag
    Show,
    /// Forget both conversations and clear the summary flag
    Reset {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum EmotionsAction {
    /// Add every .png/.gif in a directory, keyed by file name
    Import {
        /// Directory with sticker images
        dir: PathBuf,
        /// Mapping file to update (defaults to the configured one)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List configured keywords
    List,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the configuration
    Check,
    /// Print the effective configuration (secrets omitted)
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config().context("failed to load configuration")?;
    ocbot::logging::init(&config.log);

    match cli.command {
        Commands::Ask { text, remember } => ask(config, &text, remember).await,
        Commands::State { action } => match action {
            StateAction::Show => show_state(&config).await,
            StateAction::Reset { yes } => reset_state(&config, yes).await,
        },
        Commands::Emotions { action } => match action {
            EmotionsAction::Import { dir, output } => import_emotions(&config, &dir, output),
            EmotionsAction::List => list_emotions(&config),
        },
        Commands::Summarize => summarize(config).await,
        Commands::Config { action } => match action {
            ConfigAction::Check => check_config(&config),
            ConfigAction::Show => show_config(&config),
        },
    }
}

async fn ask(config: Config, text: &str, remember: bool) -> anyhow::Result<()> {
    let app = App::build(config)?;
    let answer = app.chat.ask(text).await;
    println!("{}", answer);

    if remember {
        match &app.memory {
            Some(memory) => {
                let outcome = memory.process(text, &answer).await;
                println!("{} {:?}", style("memory:").dim(), outcome);
            }
            None => println!("{} memory app is disabled", style("⚠").yellow()),
        }
    }
    Ok(())
}

async fn show_state(config: &Config) -> anyhow::Result<()> {
    let store = FileStateStore::new(config.storage.state_dir());
    println!("{} {}", style("State directory:").bold(), store.dir().display());

    for channel in ApiChannel::ALL {
        let record = store.read(channel).await;
        println!(
            "  {:<8} conversation {}  turns {}{}",
            style(channel.to_string()).cyan(),
            record.conversation_id.as_deref().unwrap_or("-"),
            record.turn_count,
            record
                .updated_at
                .map(|t| format!("  updated {}", t.format("%Y-%m-%d %H:%M:%S UTC")))
                .unwrap_or_default()
        );
    }

    let flag = if store.summary_requested().await {
        style("set").yellow()
    } else {
        style("clear").green()
    };
    println!("  summary flag {}", flag);
    Ok(())
}

async fn reset_state(config: &Config, yes: bool) -> anyhow::Result<()> {
    let store = FileStateStore::new(config.storage.state_dir());

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Forget both conversations in {}?",
                store.dir().display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("   {} Cancelled.", style("ℹ").blue());
            return Ok(());
        }
    }

    store.reset().await?;
    println!("   {} Conversation state reset", style("✓").green());
    Ok(())
}

fn import_emotions(config: &Config, dir: &std::path::Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(|| config.emotions.path());
    let mut mapping = EmotionMapping::load(&path)?;
    let report = mapping
        .import_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?;

    if report.added.is_empty() && report.skipped.is_empty() {
        println!("   {} No .png or .gif files in {}", style("ℹ").blue(), dir.display());
        return Ok(());
    }

    for keyword in &report.skipped {
        println!("   {} {} already present, skipped", style("-").dim(), keyword);
    }
    for keyword in &report.added {
        println!("   {} {}", style("+").green(), keyword);
    }

    mapping.save(&path)?;
    println!(
        "   {} {} added, {} skipped, saved to {}",
        style("✓").green(),
        report.added.len(),
        report.skipped.len(),
        path.display()
    );
    Ok(())
}

fn list_emotions(config: &Config) -> anyhow::Result<()> {
    let path = config.emotions.path();
    let mapping = EmotionMapping::load(&path)?;
    println!("{} {} keyword(s) in {}", style("Stickers:").bold(), mapping.len(), path.display());
    for (keyword, data) in mapping.iter() {
        println!("  {}  {} bytes base64", style(keyword).cyan(), data.len());
    }
    Ok(())
}

async fn summarize(config: Config) -> anyhow::Result<()> {
    let app = App::build(config)?;
    let Some(memory) = &app.memory else {
        bail!("memory app is disabled; set memory.url to run summaries");
    };

    match memory.summarize().await {
        SummaryOutcome::Completed { relayed, segments } => {
            println!(
                "   {} Summary round complete (relayed: {}, knowledge segments: {})",
                style("✓").green(),
                relayed,
                segments
            );
        }
        SummaryOutcome::AlreadyRequested => {
            println!(
                "   {} A summary already ran since the last message; run `ocbot state reset` or wait for a new message",
                style("ℹ").blue()
            );
        }
        other => bail!("summary round failed: {:?}", other),
    }
    Ok(())
}

fn check_config(config: &Config) -> anyhow::Result<()> {
    println!("{} {}", style("Config file:").bold(), config_path().display());
    let result = validate_config(config);

    for issue in &result.errors {
        println!("   {} {}", style("✗").red(), issue);
    }
    for issue in &result.warnings {
        println!("   {} {}", style("⚠").yellow(), issue);
    }

    if !result.valid {
        bail!("configuration has {} error(s)", result.errors.len());
    }
    println!("   {} Configuration is valid", style("✓").green());
    Ok(())
}

fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
