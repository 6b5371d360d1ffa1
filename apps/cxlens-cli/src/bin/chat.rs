use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;

use cxlens_cli::{analyze, default_outputs, init_tracing, load_router, run_chat, settings_path};
use cxlens_core::config::Config;
use cxlens_core::report::format_thousands;

#[derive(Parser)]
#[command(name = "cxlens-chat")]
#[command(about = "Interactive questions over analysed complaints", long_about = None)]
struct Cli {
    /// Cleaned complaints CSV
    #[arg(long, value_name = "PATH")]
    cleaned: Option<PathBuf>,

    /// Themes CSV
    #[arg(long, value_name = "PATH")]
    themes: Option<PathBuf>,

    /// Re-run the analysis before starting
    #[arg(long)]
    rerun: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;

    let (default_cleaned, default_themes) = default_outputs(&settings);
    let cleaned = cli.cleaned.unwrap_or(default_cleaned);
    let themes = cli.themes.unwrap_or(default_themes);
    let out_dir = cleaned.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new(".")).to_path_buf();

    if cli.rerun || !cleaned.exists() || !themes.exists() {
        let input = settings_path(&settings.data.input_csv);
        if !input.exists() {
            anyhow::bail!("Sample data not found: {}", input.display());
        }
        println!("[auto] Running analysis to generate output files …");
        analyze(&input, &out_dir, &settings, true)?;
    }
    if !cleaned.exists() || !themes.exists() {
        anyhow::bail!(
            "Required files still missing after running the analysis:\n  {}\n  {}",
            cleaned.display(),
            themes.display()
        );
    }

    println!("[info] Loading data from {} …", out_dir.display());
    let router = load_router(&cleaned, &themes, &settings.llm)?;
    println!(
        "[info] Loaded {} complaints, {} themes.\n",
        format_thousands(router.dataset().len()),
        router.themes().len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_chat(&router, stdin.lock(), &mut stdout)?;
    Ok(())
}
