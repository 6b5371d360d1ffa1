use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use cxlens_cli::{analyze, default_outputs, init_tracing, load_router, render, render_analysis, settings_path};
use cxlens_core::config::Config;

#[derive(Parser)]
#[command(name = "cxlens")]
#[command(about = "Customer complaint themes and question answering", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a complaints CSV, extract themes and write the reports
    Analyze {
        /// Input complaints CSV (default: data.input_csv)
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,

        /// Directory for output files (default: data.output_dir)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        #[arg(long, value_name = "N")]
        n_themes: Option<usize>,

        /// Text column name, auto-detected when omitted
        #[arg(long, value_name = "NAME")]
        text_col: Option<String>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Answer one question about analysed complaints
    Ask {
        question: String,

        #[arg(long, value_name = "PATH")]
        cleaned: Option<PathBuf>,

        #[arg(long, value_name = "PATH")]
        themes: Option<PathBuf>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let mut settings = config.settings()?;

    match cli.command {
        Commands::Analyze { input, output_dir, n_themes, text_col, seed } => {
            if let Some(n) = n_themes {
                settings.themes.n_themes = n;
            }
            if let Some(seed) = seed {
                settings.themes.seed = seed;
            }
            if text_col.is_some() {
                settings.data.text_col = text_col;
            }
            settings.validate()?;

            let input = input.unwrap_or_else(|| settings_path(&settings.data.input_csv));
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }
            let output_dir = output_dir.unwrap_or_else(|| settings_path(&settings.data.output_dir));
            let analysis = analyze(&input, &output_dir, &settings, true)?;
            println!("{}", render_analysis(&analysis));
        }
        Commands::Ask { question, cleaned, themes, json } => {
            let (default_cleaned, default_themes) = default_outputs(&settings);
            let cleaned = cleaned.unwrap_or(default_cleaned);
            let themes = themes.unwrap_or(default_themes);
            let router = load_router(&cleaned, &themes, &settings.llm)
                .context("run `cxlens analyze` first to produce the cleaned data and themes")?;
            let result = router.answer(&question);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", render(&result));
            }
        }
    }
    Ok(())
}
