//! DocuTranslate CLI - translate the text of a PDF and manage local state.

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use docutranslate_core::{
    AppConfig, Clock, DocumentFetcher, DocumentId, Lang, Orchestrator, PdfText, ProgressFn,
    ProviderConfig, ProviderKind, QuotaLevel, QuotaManager, QuotaStatus, Stage, SystemClock,
    TranslationCache, TranslationRequest, google_export_url, open_store, target_languages,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "docutranslate")]
#[command(author, version, about = "Translate the text of PDF documents", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a local PDF or a Google Docs document
    Translate(TranslateArgs),
    /// Show (or reset) today's word quota
    Quota {
        /// Forget today's usage
        #[arg(long)]
        reset: bool,
    },
    /// Maintain the translation cache
    Cache {
        /// Remove every cached translation
        #[arg(long)]
        clear: bool,
    },
    /// List supported target languages
    Languages,
}

#[derive(ClapArgs, Debug)]
struct TranslateArgs {
    /// Input PDF file
    #[arg(required_unless_present = "url", conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Google Docs document URL
    #[arg(long)]
    url: Option<String>,

    /// Target language code (default from config)
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Source language code (detected when omitted)
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Output text file (default: <input>-<target>.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// DeepL API key; tried before the configured providers
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    deepl_key: Option<String>,

    /// DeepL endpoint
    #[arg(long, env = "DEEPL_API_BASE", default_value = "https://api-free.deepl.com")]
    deepl_base: String,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,
}

/// Where the document text comes from
struct SourceDocument {
    text: String,
    id: DocumentId,
    /// Base name for the default output file
    stem: String,
    /// Directory for the default output file
    dir: PathBuf,
}

async fn load_document(args: &TranslateArgs, config: &AppConfig) -> Result<SourceDocument> {
    if let Some(url) = &args.url {
        let id = DocumentId::from_google_url(url).context("Not a Google Docs document URL")?;
        let export_url = google_export_url(&id);
        info!("Fetching Google Docs export for {}", id);

        let fetcher = DocumentFetcher::new(config.fetch.clone())?;
        let document = fetcher.fetch(&export_url).await.context("Failed to download document")?;
        let pdf = PdfText::from_bytes(&document.bytes).context("Failed to read PDF")?;
        info!("Document has {} pages", pdf.page_count());

        return Ok(SourceDocument {
            text: pdf.full_text()?,
            stem: "document".to_string(),
            dir: PathBuf::from("."),
            id,
        });
    }

    let Some(input) = &args.input else {
        bail!("Provide a PDF file or --url");
    };
    info!("Loading PDF: {}", input.display());
    let size = std::fs::metadata(input)
        .with_context(|| format!("Failed to read {}", input.display()))?
        .len();
    let pdf = PdfText::from_file(input, config.fetch.max_document_bytes)
        .with_context(|| format!("Failed to load PDF: {}", input.display()))?;
    info!("Document has {} pages", pdf.page_count());

    let name = input.file_name().and_then(|s| s.to_str()).unwrap_or("document.pdf");
    Ok(SourceDocument {
        text: pdf.full_text()?,
        id: DocumentId::from_upload(name, size),
        stem: file_stem(input),
        dir: input.parent().map(Path::to_path_buf).unwrap_or_default(),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// `<stem>-<target>.txt` next to the input
fn default_output_path(dir: &Path, stem: &str, target: &Lang) -> PathBuf {
    dir.join(format!("{}-{}.txt", stem, target.normalized().to_lowercase()))
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn render_stage(pb: &ProgressBar, stage: Stage) {
    match stage {
        Stage::CacheCheck => pb.set_message("checking cache"),
        Stage::QuotaCheck => pb.set_message("checking quota"),
        Stage::Splitting => pb.set_message("splitting text"),
        Stage::Translating { current, total } => {
            pb.set_length(total as u64);
            pb.set_position(current.saturating_sub(1) as u64);
            pb.set_message(format!("chunk {current}/{total}"));
        }
        Stage::Aggregating => {
            if let Some(len) = pb.length() {
                pb.set_position(len);
            }
            pb.set_message("formatting");
        }
        Stage::Done { from_cache: true } => pb.finish_with_message("loaded from cache"),
        Stage::Done { from_cache: false } => pb.finish_with_message("translation complete"),
        Stage::Failed => pb.abandon_with_message("translation failed"),
    }
}

async fn translate(args: TranslateArgs, mut config: AppConfig) -> Result<()> {
    if let Some(target) = &args.target {
        config.target_lang = Lang::new(target);
    }
    if let Some(source) = &args.source {
        config.source_lang = Some(Lang::new(source));
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    if let Some(key) = args.deepl_key.clone().filter(|k| !k.trim().is_empty()) {
        config
            .providers
            .insert(0, ProviderConfig::new(ProviderKind::DeepL, &args.deepl_base, Some(key)));
    }

    let store = open_store(&config.cache).context("Failed to open state store")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let orchestrator =
        Orchestrator::from_config(&config, store, clock).context("Failed to initialize translator")?;
    if let Err(e) = orchestrator.cleanup().await {
        warn!("Cache cleanup failed: {}", e);
    }

    let document = load_document(&args, &config).await?;
    let request = TranslationRequest {
        text: document.text,
        source_lang: config.source_lang.clone(),
        target_lang: config.target_lang.clone(),
        document_id: Some(document.id),
    };

    let pb = progress_bar();
    let reporter = pb.clone();
    let progress: &ProgressFn = &move |stage| render_stage(&reporter, stage);
    let outcome = orchestrator
        .translate(&request, Some(progress))
        .await
        .context("Translation failed")?;

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&document.dir, &document.stem, &config.target_lang));
    std::fs::write(&output_path, &outcome.text)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    let status = orchestrator.quota_status().await?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if let Some(detected) = &outcome.detected_source {
            println!("Source language: {detected}");
        }
        if outcome.from_cache {
            println!("Loaded from cache ({} words)", outcome.words);
        } else {
            println!("Translated {} words in {} chunks", outcome.words, outcome.chunks);
        }
        println!("{}", quota_line(&status));
        println!("Translation saved to: {}", output_path.display());
    }

    Ok(())
}

fn quota_line(status: &QuotaStatus) -> String {
    let marker = match status.level {
        QuotaLevel::Normal => "",
        QuotaLevel::Warning => " (warning)",
        QuotaLevel::Critical => " (critical)",
        QuotaLevel::Exhausted => " (exhausted)",
    };
    format!(
        "Quota: {} of {} words used today, {} remaining ({:.1}%){}",
        status.used,
        status.limit,
        status.remaining,
        status.percent_used(),
        marker
    )
}

async fn quota(reset: bool, config: &AppConfig) -> Result<()> {
    let store = open_store(&config.cache).context("Failed to open state store")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let quota = QuotaManager::new(store, clock, config.quota.clone());

    if reset {
        quota.reset().await?;
    }
    let status = quota.status().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", quota_line(&status));
    }
    Ok(())
}

async fn cache(clear: bool, config: &AppConfig) -> Result<()> {
    let store = open_store(&config.cache).context("Failed to open state store")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = TranslationCache::new(store, clock, config.cache.expiry());

    let removed = if clear { cache.clear().await? } else { cache.sweep().await? };

    #[allow(clippy::print_stdout)]
    {
        if clear {
            println!("Cleared {removed} cached translations");
        } else {
            println!("Removed {removed} expired cache entries");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn languages() {
    for lang in target_languages() {
        println!("{} {:<6} {}", lang.flag, lang.code, lang.name);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = if let Some(config_path) = &cli.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    match cli.command {
        Command::Translate(args) => translate(args, config).await,
        Command::Quota { reset } => quota(reset, &config).await,
        Command::Cache { clear } => cache(clear, &config).await,
        Command::Languages => {
            languages();
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("docs"), "report", &Lang::new("pt-br"));
        assert_eq!(path, PathBuf::from("docs/report-pt-br.txt"));
    }

    #[test]
    fn test_file_stem_fallback() {
        assert_eq!(file_stem(Path::new("/tmp/contract.pdf")), "contract");
        assert_eq!(file_stem(Path::new("/")), "output");
    }

    #[test]
    fn test_quota_line_marks_level() {
        let status = QuotaStatus {
            used: 85,
            limit: 100,
            remaining: 15,
            level: QuotaLevel::Warning,
        };
        assert_eq!(
            quota_line(&status),
            "Quota: 85 of 100 words used today, 15 remaining (85.0%) (warning)"
        );
    }

    #[test]
    fn test_translate_requires_input_or_url() {
        assert!(Cli::try_parse_from(["docutranslate", "translate"]).is_err());
        assert!(Cli::try_parse_from(["docutranslate", "translate", "a.pdf", "--url", "https://x"]).is_err());

        let cli = Cli::try_parse_from(["docutranslate", "translate", "a.pdf", "-t", "FR"]).unwrap();
        match cli.command {
            Command::Translate(args) => {
                assert_eq!(args.input, Some(PathBuf::from("a.pdf")));
                assert_eq!(args.target.as_deref(), Some("FR"));
            }
            _ => panic!("expected translate"),
        }
    }
}
