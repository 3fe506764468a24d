use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use hfguide::config::{self, EntityServiceConfig};
use hfguide::pipeline::extraction::ProfileExtractor;
use hfguide::pipeline::processor::load_guidelines;
use hfguide::report::to_markdown;
use hfguide::GuidanceService;

#[derive(Parser)]
#[command(name = "hfguide")]
#[command(version, about = "Heart failure guideline recommendations from a clinical note")]
struct Cli {
    /// Read the note from a file instead of stdin
    #[arg(long)]
    file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Guideline table to use instead of the bundled one
    /// (default: $HFGUIDE_GUIDELINES, then the bundled table)
    #[arg(long)]
    guidelines: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

fn main() -> ExitCode {
    hfguide::init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, Box<dyn std::error::Error>> {
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let note = match &cli.file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let guidelines = cli
        .guidelines
        .clone()
        .or_else(config::guidelines_path_from_env);
    let kb = load_guidelines(guidelines.as_deref())?;
    let extractor = ProfileExtractor::from_config(&EntityServiceConfig::from_env());
    let service = GuidanceService::new(extractor, kb);

    let report = service.process(&note)?;

    Ok(match cli.format {
        Format::Json => serde_json::to_string_pretty(&report)?,
        Format::Markdown => to_markdown(&report),
    })
}
