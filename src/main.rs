use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use transcript_patterns_lib::config::{self, Settings};
use transcript_patterns_lib::session::{
    analyze_file, build_analyzer, AnalysisOutcome, PipelineError,
};

#[derive(Parser, Debug)]
#[command(name = "transcript-patterns")]
#[command(about = "Find rally and monologue patterns in interview transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a transcript (.txt, .md, .docx) and print the findings
    Analyze {
        /// Transcript file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Independent analysis passes to merge (overrides settings)
        #[arg(long)]
        runs: Option<usize>,

        /// Print tab-separated values instead of a listing
        #[arg(long)]
        tsv: bool,

        /// Write TSV to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show or change stored settings
    Settings {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        runs: Option<usize>,

        /// Text for the date column when no date is found
        #[arg(long)]
        placeholder: Option<String>,

        /// Year for month/day-only dates
        #[arg(long)]
        fallback_year: Option<String>,

        /// Print the effective settings
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    transcript_patterns_lib::init_tracing();
    let cli = Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let result = match cli.command {
        Command::Analyze {
            file,
            runs,
            tsv,
            output,
        } => analyze(file, runs, tsv, output).await,
        Command::Settings {
            api_key,
            model,
            runs,
            placeholder,
            fallback_year,
            show,
        } => update_settings(api_key, model, runs, placeholder, fallback_year, show),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn analyze(
    file: PathBuf,
    runs: Option<usize>,
    tsv: bool,
    output: Option<PathBuf>,
) -> Result<(), PipelineError> {
    let settings = Settings::load()?;
    let analyzer = build_analyzer(&settings, std::env::var(config::API_KEY_ENV).ok())?;

    let mut options = settings.reconcile_options();
    if let Some(runs) = runs {
        options = options.with_run_count(runs);
    }

    tracing::info!(
        file = %file.display(),
        model = analyzer.model(),
        runs = options.effective_runs(),
        "Analyzing transcript"
    );

    let outcome = analyze_file(&file, &analyzer, &options).await?;
    if outcome.is_empty() {
        eprintln!("No findings in {}; nothing to export.", outcome.file_name);
        return Ok(());
    }

    if tsv || output.is_some() {
        write_tsv(&outcome, output)?;
    } else {
        print_listing(&outcome);
    }
    Ok(())
}

fn write_tsv(outcome: &AnalysisOutcome, output: Option<PathBuf>) -> Result<(), PipelineError> {
    let Some(table) = outcome.to_tsv() else {
        return Ok(());
    };
    match output {
        Some(path) => {
            std::fs::write(&path, table)?;
            eprintln!("Wrote {} findings to {}", outcome.findings.len(), path.display());
        }
        None => println!("{table}"),
    }
    Ok(())
}

fn print_listing(outcome: &AnalysisOutcome) {
    let (rallies, monologues) = outcome.kind_counts();
    println!(
        "{}: {} findings ({} rally, {} monologue)",
        outcome.file_name,
        outcome.findings.len(),
        rallies,
        monologues
    );
    for (i, finding) in outcome.findings.iter().enumerate() {
        println!();
        println!(
            "[{}] {}  #{}  {}",
            i + 1,
            finding.date,
            finding.reception_number,
            finding.kind().as_str()
        );
        for line in finding.excerpt.lines() {
            println!("    {line}");
        }
        println!("  => {}", finding.summary);
    }
}

fn update_settings(
    api_key: Option<String>,
    model: Option<String>,
    runs: Option<usize>,
    placeholder: Option<String>,
    fallback_year: Option<String>,
    show: bool,
) -> Result<(), PipelineError> {
    let mut settings = Settings::load()?;
    let changed = api_key.is_some()
        || model.is_some()
        || runs.is_some()
        || placeholder.is_some()
        || fallback_year.is_some();

    if let Some(key) = api_key {
        settings.api_key = Some(key);
    }
    if let Some(model) = model {
        settings.model = model;
    }
    if let Some(runs) = runs {
        settings.run_count = runs;
    }
    if let Some(placeholder) = placeholder {
        settings.date_placeholder = placeholder;
    }
    if let Some(year) = fallback_year {
        settings.fallback_year = Some(year);
    }

    if changed {
        let path = settings.save()?;
        eprintln!("Settings saved to {}", path.display());
    }
    if show || !changed {
        println!("{settings:#?}");
    }
    Ok(())
}
