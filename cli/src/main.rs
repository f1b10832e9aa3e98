//! pdftrans CLI - layout-preserving PDF translation

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdftrans::{
    create_translator, Content, ExtractOptions, MemorySource, ModelConfig, ModelType,
    OutputFormat, PageSource, PdfSource, PdfTrans, Translate, TranslateOptions, WriteOptions,
};

use config::FileConfig;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdftrans")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Translate PDF documents while preserving their layout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a PDF to PDF or Markdown
    Translate(TranslateArgs),

    /// Dump the extracted layout as JSON
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct SourceArgs {
    /// Treat the input as a JSON array of page primitives instead of a PDF
    #[arg(long)]
    primitives: bool,

    /// Number of leading pages to process
    #[arg(long)]
    pages: Option<usize>,

    /// Emit empty pages for pages that fail to load
    #[arg(long)]
    lenient: bool,
}

#[derive(Args)]
struct TranslateArgs {
    /// Input PDF file (falls back to `common.book` in the config file)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE", env = "PDFTRANS_CONFIG")]
    config: Option<PathBuf>,

    /// Model backend: OpenAIModel, GLMModel, QWenModel or EchoModel
    #[arg(long, env = "PDFTRANS_MODEL_TYPE")]
    model_type: Option<String>,

    /// Model name (OpenAIModel)
    #[arg(long, env = "PDFTRANS_MODEL")]
    model: Option<String>,

    /// API key (OpenAIModel, QWenModel)
    #[arg(long, env = "PDFTRANS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Endpoint URL (GLM server, DashScope, or an OpenAI-compatible base URL)
    #[arg(long, env = "PDFTRANS_MODEL_URL")]
    url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format: pdf or markdown
    #[arg(short, long)]
    format: Option<String>,

    /// Output file (defaults to <input>_translated.<ext>)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Target language
    #[arg(short, long)]
    language: Option<String>,

    /// Concurrent requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// TrueType/OpenType font for the PDF output
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Translate(args) => cmd_translate(args),
        Commands::Extract {
            input,
            output,
            source,
            compact,
        } => cmd_extract(&input, output.as_deref(), &source, compact),
        Commands::Info { input, source } => cmd_info(&input, &source),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn open_source(input: &Path, primitives: bool) -> CliResult<Box<dyn PageSource>> {
    if primitives {
        Ok(Box::new(MemorySource::from_json_file(input)?))
    } else {
        Ok(Box::new(PdfSource::open(input)?))
    }
}

fn extract_options(args: &SourceArgs, pages: Option<usize>) -> ExtractOptions {
    let mut options = ExtractOptions::new();
    if let Some(count) = args.pages.or(pages) {
        options = options.with_pages(count);
    }
    if args.lenient {
        options = options.lenient();
    }
    options
}

/// Merge the config file's model section with command-line overrides.
fn model_config(args: &TranslateArgs, file: &FileConfig) -> CliResult<ModelConfig> {
    let mut config = match (&args.model_type, &file.model) {
        (Some(tag), Some(base)) => {
            let model_type: ModelType = tag.parse()?;
            if model_type == base.model_type {
                base.clone()
            } else {
                ModelConfig::new(model_type)
            }
        }
        (Some(tag), None) => ModelConfig::new(tag.parse()?),
        (None, Some(base)) => base.clone(),
        (None, None) => return Err("no model configured; pass --model-type or a config file".into()),
    };

    if let Some(model) = &args.model {
        config.model = Some(model.clone());
    }
    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(url) = &args.url {
        config.url = Some(url.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_translate(args: TranslateArgs) -> CliResult<()> {
    let file = FileConfig::load_optional(args.config.as_deref())?;
    let common = &file.common;

    // Resolve the format first so a bad selector fails before any work.
    let format: OutputFormat = args
        .format
        .as_deref()
        .or(common.file_format.as_deref())
        .unwrap_or("pdf")
        .parse()?;

    let input = args
        .input
        .clone()
        .or_else(|| common.book.clone())
        .ok_or("no input file; pass FILE or set common.book in the config file")?;

    let model = model_config(&args, &file)?;
    let translator = create_translator(&model)?;
    log::debug!("Using {} for {}", translator.name(), input.display());

    let language = args
        .language
        .clone()
        .or_else(|| common.target_language.clone())
        .unwrap_or_else(|| TranslateOptions::default().target_language);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Translating into {}", language));

    let progress = pb.clone();
    let translate_options = TranslateOptions::new(language)
        .with_concurrency(args.concurrency.or(common.concurrency).unwrap_or(1))
        .with_progress(move |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        });

    let mut write_options = WriteOptions::new().with_format(format);
    if let Some(output) = args.output.clone().or_else(|| common.output.clone()) {
        write_options = write_options.with_output_path(output);
    }
    if let Some(font) = args.font.clone().or_else(|| common.font.clone()) {
        write_options = write_options.with_font(font);
    }

    let pipeline = PdfTrans::new()
        .with_extract_options(extract_options(&args.source, common.pages))
        .with_translate_options(translate_options)
        .with_write_options(write_options);

    let source = open_source(&input, args.source.primitives)?;
    let summary = pipeline.run_source(source.as_ref(), &translator);
    pb.finish_and_clear();
    let summary = summary?;

    println!("{} {}", "Saved to".green(), summary.output.display());
    println!(
        "  {} translated, {} failed, {} images",
        summary.report.translated.to_string().green(),
        summary.report.failed.to_string().yellow(),
        summary.report.skipped
    );

    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    args: &SourceArgs,
    compact: bool,
) -> CliResult<()> {
    let source = open_source(input, args.primitives)?;
    let doc = PdfTrans::new()
        .with_extract_options(extract_options(args, None))
        .extract(source.as_ref())?;

    let json = if compact {
        serde_json::to_string(&doc)?
    } else {
        serde_json::to_string_pretty(&doc)?
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path, args: &SourceArgs) -> CliResult<()> {
    let source = open_source(input, args.primitives)?;
    let doc = PdfTrans::new()
        .with_extract_options(extract_options(args, None))
        .extract(source.as_ref())?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if !args.primitives {
        if let Ok(version) = pdftrans::pdf_version_from_path(input) {
            println!("{}: PDF {}", "Format".bold(), version);
        }
    }
    println!("{}: {}", "Pages".bold(), doc.page_count());

    println!();
    println!("{}", "Content Blocks".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let (mut texts, mut tables, mut images) = (0, 0, 0);
    for content in doc.contents() {
        match content {
            Content::Text(_) => texts += 1,
            Content::Table(_) => tables += 1,
            Content::Image(_) => images += 1,
        }
    }

    println!("{}: {}", "Paragraphs".bold(), texts);
    println!("{}: {}", "Tables".bold(), tables);
    println!("{}: {}", "Images".bold(), images);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdftrans".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Layout-preserving PDF translation");
    println!();
    println!("Model backends: {}", ModelType::ALL.map(|t| t.as_str()).join(", ").dimmed());
    println!("License: MIT");
}
