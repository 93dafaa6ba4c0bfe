// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use blogflow::app_config::{self, Config};
use blogflow::app_controller::{ContentGeneration, Controller, confirm_subtopics};
use blogflow::backend::{ContentSummary, ImageRecord, TitleSet};
use blogflow::errors::{BackendError, ConsoleError};
use blogflow::formatting::MobileFormatter;
use blogflow::polling::{JobStatus, PollJob, PollObserver};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reflow text for narrow screens (reads stdin when no file is given)
    Format {
        /// Text or HTML file to reflow
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Treat input as HTML and emit <br> line breaks
        #[arg(long)]
        html: bool,

        /// Letters per line (defaults to the configured target length)
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// List analyzed keywords
    Keywords,

    /// List generated contents
    Contents {
        /// Only contents of this keyword id
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// Print one article
    Show {
        content_id: String,

        /// Print the body as stored, without mobile reflow
        #[arg(long)]
        raw: bool,
    },

    /// List the subtopic headings of an article
    Subtopics { content_id: String },

    /// Collect research sources for a keyword
    Research { keyword_id: String },

    /// Collect research (if needed) and generate an article for a keyword
    GenerateContent {
        keyword_id: String,

        /// Business name used in the article
        #[arg(long)]
        business_name: String,

        /// Business expertise used in the article
        #[arg(long)]
        expertise: String,

        /// Space-separated extra morphemes to weave into the article
        #[arg(long, default_value = "")]
        morphemes: String,

        /// Skip the subtopic confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate titles for the latest article of a keyword
    Titles { keyword_id: String },

    /// Check title generation status once
    TitleStatus { content_id: String },

    /// List saved titles
    SavedTitles,

    /// Save a title for an article
    SaveTitle { content_id: String, title: String },

    /// List images of an article
    Images { content_id: String },

    /// Generate images for all subtopics or one of them
    GenerateImages {
        content_id: String,

        /// Zero-based subtopic index; all subtopics when omitted
        #[arg(short, long)]
        subtopic: Option<usize>,
    },

    /// Generate an infographic for an article
    Infographic {
        content_id: String,

        /// Zero-based subtopic index
        #[arg(short, long)]
        subtopic: Option<usize>,
    },

    /// Generate shell completions for blogflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// blogflow - console for an AI-assisted blog publishing workflow
///
/// Drives a remote generation backend: research collection, article, title
/// and image generation, with mobile-friendly text output.
#[derive(Parser, Debug)]
#[command(name = "blogflow")]
#[command(version)]
#[command(about = "Console for an AI-assisted blog publishing workflow")]
#[command(long_about = "blogflow drives a blog generation backend from the command line.

EXAMPLES:
    blogflow keywords                                      # List analyzed keywords
    blogflow research 12                                   # Collect research for keyword 12
    blogflow generate-content 12 --business-name Shop --expertise Camping
    blogflow titles 12                                     # Generate titles for the latest article
    blogflow show 31                                       # Print article 31 reflowed for mobile
    blogflow generate-images 31 --subtopic 0               # Illustrate the first subtopic
    cat post.md | blogflow format                          # Reflow any text offline
    blogflow completions bash > blogflow.bash              # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Backend API root, overrides the configuration
    #[arg(short, long, env = "BLOGFLOW_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Shows poll progress on a spinner
struct SpinnerObserver {
    spinner: ProgressBar,
}

impl SpinnerObserver {
    fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self { spinner }
    }
}

impl PollObserver for SpinnerObserver {
    fn on_status(&self, job: &PollJob) {
        if job.status.is_terminal() {
            self.spinner.finish_and_clear();
            return;
        }
        let cap = job
            .max_attempts
            .map(|max| format!("/{}", max))
            .unwrap_or_default();
        self.spinner
            .set_message(format!("{} is {} (check {}{})", job.key, job.status, job.attempts, cap));
    }

    fn on_check_error(&self, key: &str, error: &BackendError) {
        self.spinner.set_message(format!("{}: status check failed, retrying ({})", key, error));
    }
}

impl Drop for SpinnerObserver {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[tokio::main]
async fn main() {
    // The logger accepts everything; the global max level does the filtering
    // and starts at info until the config is loaded
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ConsoleError>() {
            Some(console_error) => error!("{}", console_error.user_message()),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "blogflow", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(endpoint) = &cli.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    if let Commands::Format { file, html, width } = &cli.command {
        let width = width.unwrap_or(config.formatting.target_length);
        return format_command(file.as_deref(), *html, width);
    }

    let controller = Controller::with_config(config)?;

    let result = tokio::select! {
        result = run_command(&controller, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling running jobs");
            Err(anyhow!("Interrupted"))
        }
    };

    controller.shutdown();
    result
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Keywords => {
            let dashboard = controller.load_dashboard().await?;
            if dashboard.keywords.is_empty() {
                println!("No analyzed keywords yet.");
            }
            for keyword in &dashboard.keywords {
                println!("{:>6}  {}", keyword.id, keyword.keyword);
            }
        }
        Commands::Contents { keyword } => {
            let contents = match keyword.as_deref() {
                Some(keyword_id) => controller.contents(Some(keyword_id)).await?,
                None => {
                    let dashboard = controller.load_dashboard().await?;
                    if dashboard.from_cache {
                        warn!("Backend unreachable, showing cached contents");
                    }
                    dashboard.contents
                }
            };
            print_contents(&contents);
        }
        Commands::Show { content_id, raw } => {
            let mobile = !raw && controller.config().formatting.mobile;
            let text = controller.content_text(&content_id, mobile).await?;
            println!("{}", text);
        }
        Commands::Subtopics { content_id } => {
            let subtopics = controller.content_subtopics(&content_id).await?;
            if subtopics.is_empty() {
                println!("No subtopics found. Check the article structure.");
            }
            for (index, subtopic) in subtopics.iter().enumerate() {
                println!("{:>3}  {}", index, subtopic);
            }
        }
        Commands::Research { keyword_id } => {
            let observer = Arc::new(SpinnerObserver::new("Collecting research"));
            let stats = controller.collect_research(&keyword_id, observer).await?;
            println!("News:        {}", stats.news_count);
            println!("Academic:    {}", stats.academic_count);
            println!("General:     {}", stats.general_count);
            println!("Statistics:  {}", stats.statistics_count);
        }
        Commands::GenerateContent {
            keyword_id,
            business_name,
            expertise,
            morphemes,
            yes,
        } => {
            if !yes
                && !confirm_subtopics(
                    controller.keyword_subtopics(&keyword_id).await,
                    std::io::stdin().lock(),
                    std::io::stdout(),
                )?
            {
                info!("Content generation cancelled");
                return Ok(());
            }

            let input = ContentGeneration {
                keyword_id,
                business_name,
                expertise,
                custom_morphemes: morphemes,
            };
            let observer = Arc::new(SpinnerObserver::new("Generating content"));
            let generated = controller.generate_content(&input, observer).await?;
            if let Some(stats) = generated.research {
                info!("Research collected: {} sources", stats.total());
            }
            info!("Content generated successfully");
            if !generated.result.is_null() {
                println!("{}", serde_json::to_string_pretty(&generated.result)?);
            }
        }
        Commands::Titles { keyword_id } => {
            let observer = Arc::new(SpinnerObserver::new("Generating titles"));
            let generated = controller.generate_titles(&keyword_id, observer).await?;
            info!("Titles generated for content {}", generated.content_id);
            print_titles(&generated.titles);
        }
        Commands::TitleStatus { content_id } => {
            let record = controller.check_title_status(&content_id).await?;
            match record.status {
                JobStatus::Completed => {
                    let titles = record
                        .data
                        .map(blogflow::backend::models::parse_title_set)
                        .transpose()?
                        .unwrap_or_default();
                    print_titles(&titles);
                }
                JobStatus::Failed => {
                    return Err(ConsoleError::RemoteFailure(
                        record.error_detail().unwrap_or_else(|| "title generation failed".to_string()),
                    )
                    .into());
                }
                status => {
                    println!("{}", record.message.unwrap_or_else(|| format!("Current status: {}", status)));
                }
            }
        }
        Commands::SavedTitles => {
            for saved in controller.saved_titles().await? {
                println!(
                    "{:>6}  {}",
                    saved.content_id.as_deref().unwrap_or("-"),
                    saved.title
                );
            }
        }
        Commands::SaveTitle { content_id, title } => {
            let saved = controller.save_title(&content_id, &title).await?;
            info!("Title saved: {}", saved.title);
        }
        Commands::Images { content_id } => {
            print_images(&controller.images(&content_id).await?);
        }
        Commands::GenerateImages { content_id, subtopic } => {
            let spinner = SpinnerObserver::new("Generating images");
            let images = controller
                .generate_images(&content_id, subtopic, || {
                    spinner
                        .spinner
                        .set_message("Image generation is taking a while, please wait")
                })
                .await?;
            drop(spinner);
            print_images(&images);
        }
        Commands::Infographic { content_id, subtopic } => {
            let spinner = SpinnerObserver::new("Generating infographic");
            let images = controller
                .generate_infographic(&content_id, subtopic, || {
                    spinner
                        .spinner
                        .set_message("Infographic generation is taking a while, please wait")
                })
                .await?;
            drop(spinner);
            print_images(&images);
        }
        Commands::Format { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}

fn format_command(file: Option<&Path>, html: bool, width: usize) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read standard input")?;
            buffer
        }
    };

    let formatter = MobileFormatter::new(width);
    let output = if html {
        formatter.format_html_for_mobile(&input)
    } else {
        formatter.format_for_mobile(&input)
    };
    println!("{}", output);
    Ok(())
}

fn print_contents(contents: &[ContentSummary]) {
    if contents.is_empty() {
        println!("No contents yet.");
    }
    for content in contents {
        println!(
            "{:>6}  {}  {}",
            content.id,
            content
                .created_at()
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "----------".to_string()),
            content.display_title()
        );
    }
}

fn print_titles(titles: &TitleSet) {
    if titles.is_empty() {
        println!("No titles were generated.");
    }
    for (kind, suggestions) in titles {
        println!("[{}]", kind);
        for suggestion in suggestions {
            println!("  - {}", suggestion.suggestion);
        }
    }
}

fn print_images(images: &[ImageRecord]) {
    if images.is_empty() {
        println!("No images yet.");
    }
    for image in images {
        let kind = if image.is_infographic() { "infographic" } else { "image" };
        println!(
            "{:<11}  {}  {}",
            kind,
            image.subtopic.as_deref().unwrap_or("(no subtopic)"),
            image.source().unwrap_or("-")
        );
    }
}
