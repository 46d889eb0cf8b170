use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use audioshelf::feed::{FeedOptions, all_patterns, build_feed};
use audioshelf::{
    FfmpegTranscoder, ProgressEvent, ProgressReporter, ReqwestClient, SharedProgressReporter,
    SyncOptions, TracingReporter, sync_library,
};

// Emoji with fallback for terminals without Unicode support
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[k] ");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "[*] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[-] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Download an audiobook library and publish local media as a podcast feed
#[derive(Parser, Debug)]
#[command(name = "audioshelf")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every owned title and strip its DRM wrapper
    Sync(SyncArgs),
    /// Generate a podcast RSS feed from local media files
    Rss(RssArgs),
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Credential file written by the vendor SDK
    #[arg(long, env = "AUDIBLE_AUTH_FILE")]
    auth_file: PathBuf,

    /// Directory for downloads and converted files
    #[arg(long, env = "target_dir", default_value = ".")]
    target_dir: PathBuf,

    /// Decryption key; read from the credential file when omitted
    #[arg(long, env = "activation_bytes", hide_env_values = true)]
    activation_bytes: Option<String>,

    /// Resolve download links without downloading or converting
    ///
    /// Any non-empty `dl_dryrun` value turns this on, `0` and `false` included.
    #[arg(long, env = "dl_dryrun", value_parser = non_empty)]
    dry_run: bool,

    /// Maximum number of titles to process
    #[arg(short, long)]
    limit: Option<usize>,

    /// Titles requested per library page
    #[arg(long, default_value_t = audioshelf::library::DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

#[derive(Args, Debug)]
struct RssArgs {
    /// Media files or glob patterns
    #[arg(conflicts_with = "all")]
    files: Vec<String>,

    /// Use every supported media file in the current directory
    #[arg(short, long)]
    all: bool,

    /// Name of the podcast
    #[arg(long)]
    name: String,

    #[arg(long, visible_alias = "desc")]
    description: String,

    /// Podcast homepage; defaults to --url-prefix
    #[arg(long)]
    website: Option<String>,

    /// Listener discretion is advised
    #[arg(long)]
    explicit: bool,

    /// Artwork URL, or a file name relative to --url-prefix
    #[arg(long)]
    image: String,

    /// iTunes top level category
    #[arg(long, default_value = "Arts")]
    category: String,

    #[arg(long, default_value = "Books")]
    subcategory: String,

    /// URL the media files are served from, e.g. https://example.com/cast/
    #[arg(long)]
    url_prefix: String,

    #[arg(short, long, default_value = "rss")]
    outfile: PathBuf,

    /// URL the feed is served from; defaults to --url-prefix plus the outfile name
    #[arg(long)]
    feed_url: Option<String>,

    /// Podcasting 2.0 medium of the feed
    #[arg(long, default_value = "podcast")]
    medium: String,

    /// Replace an existing outfile
    #[arg(long)]
    overwrite: bool,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_bar = multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} {wide_msg}") {
            main_bar.set_style(style);
        }
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn start_download_bar(&self, title: &str, length: Option<u64>) {
        let bar = self.multi.add(ProgressBar::new(length.unwrap_or(0)));
        if let Ok(style) = ProgressStyle::default_bar().template(&format!(
            "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
        )) {
            bar.set_style(style.progress_chars("█▓░"));
        }
        bar.set_message(truncate_title(title, 40));

        if let Ok(mut slot) = self.download_bar.lock()
            && let Some(previous) = slot.replace(bar)
        {
            previous.finish_and_clear();
        }
    }

    fn with_download_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.download_bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            f(bar);
        }
    }

    fn finish_download_bar(&self) {
        if let Ok(mut slot) = self.download_bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }

    fn line(&self, message: String) {
        self.main_bar.println(message);
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Authenticated { refreshed } => {
                let how = if refreshed { "token refreshed" } else { "token valid" };
                self.main_bar
                    .set_message(format!("{KEY}Authenticated ({})", how.dimmed()));
            }

            ProgressEvent::FetchingLibrary { page } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}Fetching library page {}",
                    page.to_string().cyan()
                ));
            }

            ProgressEvent::LibraryFetched { total_books } => {
                self.line(format!(
                    "{HEADPHONES}{} titles in library",
                    total_books.to_string().bold().green()
                ));
            }

            ProgressEvent::BookStarting {
                title,
                purchased,
                book_index,
                total_books,
                ..
            } => {
                self.main_bar.set_message(format!(
                    "[{}/{}] {} {}",
                    (book_index + 1).to_string().cyan(),
                    total_books.to_string().cyan(),
                    truncate_title(&title, 50),
                    purchased.dimmed()
                ));
            }

            ProgressEvent::DownloadLinkResolved { asin, url } => {
                tracing::debug!(%asin, %url, "download link");
            }

            ProgressEvent::BookSkipped { asin, reason } => {
                self.line(format!("{SKIP}{} {}", asin.yellow(), reason.dimmed()));
            }

            ProgressEvent::DownloadStarting {
                title,
                content_length,
                ..
            } => {
                self.start_download_bar(&title, content_length);
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
            } => {
                self.with_download_bar(|bar| {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                });
            }

            ProgressEvent::DownloadCompleted { path, .. } => {
                self.finish_download_bar();
                self.line(format!("{SUCCESS}{}", file_name(&path).green()));
            }

            ProgressEvent::DownloadSkipped { path } => {
                self.line(format!(
                    "{SKIP}{} {}",
                    file_name(&path).yellow(),
                    "already downloaded".dimmed()
                ));
            }

            ProgressEvent::TranscodeStarting { source } => {
                self.main_bar
                    .set_message(format!("{GEAR}Converting {}", file_name(&source).cyan()));
            }

            ProgressEvent::TranscodeSkipped { source } => {
                tracing::debug!(source = %source.display(), "conversion up to date");
            }

            ProgressEvent::TranscodeCompleted { output } => {
                self.line(format!("{SUCCESS}{}", file_name(&output).green()));
            }

            ProgressEvent::BookFailed { title, error } => {
                self.finish_download_bar();
                self.line(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&title, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::PartialFilesCleanedUp { count } => {
                self.line(format!(
                    "{}Removed {} partial download(s)",
                    CROSS,
                    count.to_string().yellow()
                ));
            }

            ProgressEvent::FeedItemAdded { path } => {
                self.main_bar
                    .set_message(format!("{HEADPHONES}Added {}", file_name(&path).cyan()));
            }

            ProgressEvent::FeedItemSkipped { path, error } => {
                self.line(format!(
                    "{SKIP}{} {}",
                    file_name(&path).yellow(),
                    error.dimmed()
                ));
            }

            ProgressEvent::FeedCompleted { .. } => {
                self.main_bar.finish_and_clear();
            }

            ProgressEvent::SyncCompleted {
                downloaded_count,
                skipped_count,
                converted_count,
                failed_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} downloaded, {} converted, {} skipped, {} failed",
                    "Sync complete:".bold().green(),
                    downloaded_count.to_string().green().bold(),
                    converted_count.to_string().green(),
                    skipped_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                );
            }
        }
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("audioshelf=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn non_empty(value: &str) -> Result<bool, std::convert::Infallible> {
    Ok(!value.is_empty())
}

fn reporter(quiet: bool) -> SharedProgressReporter {
    if quiet {
        TracingReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    }
}

async fn run_sync(args: SyncArgs, quiet: bool) -> Result<()> {
    let client = ReqwestClient::new().context("Failed to create HTTP client")?;
    let transcoder = FfmpegTranscoder::new();

    let mut options = SyncOptions::new(&args.auth_file, &args.target_dir);
    options.activation_bytes = args.activation_bytes;
    options.dry_run = args.dry_run;
    options.limit = args.limit;
    options.page_size = args.page_size;

    let result = sync_library(&client, &transcoder, &options, reporter(quiet))
        .await
        .context("Failed to sync library")?;

    if !quiet && !result.failed_books.is_empty() {
        println!("\n{}", "Failed titles:".red().bold());
        for (title, error) in &result.failed_books {
            println!("  {}{} - {}", CROSS, title.yellow(), error.dimmed());
        }
    }

    if !quiet {
        println!(
            "\n{FOLDER}Output: {}\n",
            args.target_dir.display().to_string().cyan()
        );
    }

    if result.failed > 0 && result.downloaded == 0 && result.skipped == 0 {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_rss(args: RssArgs, quiet: bool) -> Result<()> {
    let transcoder = FfmpegTranscoder::new();
    if !transcoder.ffprobe_available().await {
        bail!("ffprobe not found; install ffmpeg to build feeds");
    }

    let files = if args.all { all_patterns() } else { args.files };
    if files.is_empty() {
        bail!("No input files given (pass FILES or --all)");
    }

    let mut options = FeedOptions::new(args.name, args.description, args.image, args.url_prefix);
    options.website = args.website;
    options.explicit = args.explicit;
    options.category = args.category;
    options.subcategory = args.subcategory;
    options.outfile = args.outfile;
    options.feed_url = args.feed_url;
    options.overwrite = args.overwrite;
    options.medium = args.medium;
    options.files = files;

    let reporter = reporter(quiet);
    let summary = build_feed(&transcoder, &options, &reporter)
        .await
        .context("Failed to build feed")?;

    if !quiet {
        println!(
            "\n{PARTY}{} {} items, {} skipped",
            "Feed written:".bold().green(),
            summary.items.to_string().green().bold(),
            summary.skipped.to_string().yellow()
        );
        println!(
            "{FOLDER}{} served as {}\n",
            summary.outfile.display().to_string().cyan(),
            summary.feed_url.cyan()
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if !cli.quiet {
        println!(
            "\n{}{} {}\n",
            BOOKS,
            "audioshelf".bold().magenta(),
            "- Audiobook Library Tools".dimmed()
        );
    }

    match cli.command {
        Command::Sync(args) => run_sync(args, cli.quiet).await,
        Command::Rss(args) => run_rss(args, cli.quiet).await,
    }
}
