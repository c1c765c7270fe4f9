//! bionic - convert EPUB, HTML and text files into bionic reading format

use std::{path::PathBuf, process::ExitCode, time::Duration};

use bionic_epub::{
    BionicConverter,
    config::{ConfigBuilder, DEFAULT_BOLD_RATIO, DEFAULT_MIN_WORD_LENGTH},
    error::BionicError,
    types::ConversionReport,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Parser)]
#[command(name = "bionic")]
#[command(version, about = "Convert EPUB, HTML and text files into bionic reading format", long_about = None)]
#[command(after_help = "EXAMPLES:
    bionic book.epub                     Writes Bionic_book.epub next to the input
    bionic page.html out.html            Converts a single page
    bionic book.epub --dark-theme        Adds a dark theme stylesheet")]
struct Cli {
    /// Input file (EPUB, HTML, XHTML, TXT or MD)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (default: Bionic_<INPUT> in the same directory)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Words up to this length only get their first letter bolded
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MIN_WORD_LENGTH)]
    min_word_length: usize,

    /// Share of each longer word rendered bold, in (0, 1]
    #[arg(long, value_name = "R", default_value_t = DEFAULT_BOLD_RATIO)]
    bold_ratio: f64,

    /// Comma separated words that are never bolded (replaces the default list)
    #[arg(long, value_name = "WORDS", value_delimiter = ',')]
    skip_words: Option<Vec<String>>,

    /// Inject a dark theme stylesheet
    #[arg(long)]
    dark_theme: bool,

    /// Number of worker threads (default: available parallelism)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn init_logging(&self) {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        if !self.quiet {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.init_logging();

    match run(&cli) {
        Ok(report) => {
            if !cli.quiet {
                for warning in &report.warnings {
                    eprintln!("warning: {}", warning);
                }
                println!(
                    "Converted {} of {} documents ({} entries written)",
                    report.converted, report.documents, report.entries
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ConversionReport, BionicError> {
    let mut builder = ConfigBuilder::new();
    builder
        .min_word_length(cli.min_word_length)
        .bold_ratio(cli.bold_ratio)
        .add_dark_theme(cli.dark_theme);
    if let Some(words) = &cli.skip_words {
        builder.set_skip_words(words.iter().map(|word| word.trim()));
    }
    if let Some(threads) = cli.threads {
        builder.num_threads(threads);
    }
    let converter = BionicConverter::new(builder.build()?);

    let progress_bar = progress_bar(cli.quiet);
    let report = converter.convert_path(&cli.input, cli.output.as_deref(), &|progress| {
        if let Some(bar) = &progress_bar {
            bar.set_length(progress.total as u64);
            bar.set_message(progress.entry.to_string());
            bar.inc(1);
        }
    });
    if let Some(bar) = &progress_bar {
        bar.finish_and_clear();
    }

    report
}

fn progress_bar(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let bar = ProgressBar::new(0);
    let template = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars("##-"));
    }
    bar.enable_steady_tick(Duration::from_millis(100));

    Some(bar)
}
