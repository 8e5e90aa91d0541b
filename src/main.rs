use clap::{Parser, Subcommand};
use showshelf::pipeline::{self, BuildOptions};
use showshelf::{config, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "showshelf")]
#[command(about = "Static site generator for anime and show catalogs")]
#[command(long_about = "\
Static site generator for anime and show catalogs

One JSON catalog becomes a home page, one page per show, and whatever
templates you add. Computed collections (hero, top airing, latest,
recommended, popular) are available to every template.

Project structure:

  project/
  ├── config.toml                  # Optional, see 'showshelf gen-config'
  └── src/
      ├── _data/posts.json         # The catalog: an array, {\"posts\": [...]}, or keyed object
      ├── _includes/               # Layouts and partials
      │   ├── base.njk
      │   └── post.njk             # Layout for post pages (built-in theme if missing)
      ├── css/ js/ images/ assets/ # Copied to the output unchanged
      ├── index.njk                # → _site/index.html (built-in home if missing)
      ├── about.md                 # → _site/about/index.html
      └── search-data.json.njk     # → _site/search-data.json

Templates may start with TOML front matter between +++ lines
(title, layout, permalink, plus any keys of your own).

Set RUST_LOG=showshelf=debug for detailed logs.")]
#[command(version)]
struct Cli {
    /// Project root (holds config.toml and the input directory)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory, relative to the root (overrides config.toml)
    #[arg(long, global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render templates, post pages, and copy passthrough files
    Build {
        /// Copy every passthrough file even if unchanged since the last build
        #[arg(long)]
        no_cache: bool,
    },
    /// Validate config, catalog, and templates without writing anything
    Check,
    /// Print the computed collections
    Collections {
        /// Print the collections as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("showshelf=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = BuildOptions {
        output: cli.output.clone(),
        ..BuildOptions::default()
    };

    match cli.command {
        Command::Build { no_cache } => {
            let config = pipeline::site_config(&cli.root, &options)?;
            init_thread_pool(&config.processing);
            println!("==> Building {}", cli.root.display());
            let report = pipeline::build_with(&cli.root, &config, !no_cache)?;
            output::print_build_output(&report);
        }
        Command::Check => {
            let config = pipeline::site_config(&cli.root, &options)?;
            init_thread_pool(&config.processing);
            println!("==> Checking {}", cli.root.display());
            let report = pipeline::check_with(&cli.root, &config)?;
            output::print_check_output(&report);
        }
        Command::Collections { json } => {
            let (_, collections) = pipeline::load_site(&cli.root, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&collections)?);
            } else {
                output::print_collections(&collections);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down,
/// not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
