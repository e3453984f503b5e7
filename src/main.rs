//! docview CLI: browse a markdown documentation backend from the terminal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tokio::io::AsyncBufReadExt;

use docview::client::{ApiClient, ClientResult};
use docview::config::Config;
use docview::debounce::Debouncer;
use docview::model::{Document, IndexData};
use docview::paths::DocviewPaths;
use docview::theme::{FileThemeStore, Theme, ThemeController};

#[derive(Parser)]
#[command(name = "docview", version, about = "Markdown documentation browser client")]
struct Cli {
    /// Backend origin serving /api (overrides config and DOCVIEW_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Config file (defaults to $XDG_CONFIG_HOME/docview/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all documents, grouped by source directory.
    Index,

    /// Show a single document.
    Doc {
        /// Document path relative to its source directory.
        path: String,
    },

    /// Full-text search.
    Search {
        /// Search terms.
        query: String,
    },

    /// Search as you type: one query per stdin line, debounced.
    Interactive {
        /// Quiet period in milliseconds before a query is sent.
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Show or change the light/dark preference.
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Inspect or initialize the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run the development proxy: /api to the backend, everything else from out_dir.
    #[cfg(feature = "dev-server")]
    Serve {
        /// Listen address.
        #[arg(long)]
        bind: Option<String>,
        /// Backend port on localhost (overrides BACKEND_PORT).
        #[arg(long)]
        backend_port: Option<u16>,
        /// Directory of built assets.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Print the current theme.
    Show,
    /// Switch between light and dark.
    Toggle,
    /// Set the theme explicitly.
    Set {
        /// "light" or "dark".
        theme: Theme,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Write the default configuration to the config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    #[cfg(feature = "dev-server")]
    let default_filter = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    #[cfg(not(feature = "dev-server"))]
    let default_filter = "warn";

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = DocviewPaths::resolve()?;
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let mut config = Config::load(&config_path)?;
    config.apply_env()?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }

    let client = ApiClient::new(config.base_url.clone());

    match cli.command {
        Commands::Index => {
            let index = client.get_index().await?;
            print_index(&index);
        }

        Commands::Doc { path } => {
            let page = client.get_document(&path).await?;
            let doc = &page.document;
            println!("{}", doc.title);
            println!("  path:   {}", doc.rel_path);
            println!("  source: {}", doc.source_name);
            if !doc.abs_path.is_empty() {
                println!("  file:   {}", doc.abs_path);
            }
            if let Some(body) = page.body() {
                println!();
                println!("{body}");
            }
        }

        Commands::Search { query } => {
            let results = client.search(&query).await?;
            print_results(&query, &results);
        }

        Commands::Interactive { delay_ms } => {
            let delay = delay_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.search_debounce());
            run_interactive(&client, delay).await?;
        }

        Commands::Theme { action } => {
            paths.ensure_dirs()?;
            let mut theme = ThemeController::new(FileThemeStore::new(paths.theme_file()));
            let mut changes = theme.subscribe();

            match action {
                ThemeAction::Show => {}
                ThemeAction::Toggle => {
                    theme.toggle();
                }
                ThemeAction::Set { theme: wanted } => theme.set_theme(wanted),
            }

            match changes.try_recv() {
                Ok(change) if change.previous != change.current => {
                    println!("Theme: {} (was {})", change.current, change.previous)
                }
                _ => println!("Theme: {}", theme.theme()),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", toml::to_string_pretty(&config).into_diagnostic()?);
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    miette::bail!(
                        help = "Pass --force to overwrite it.",
                        "config file already exists: {}",
                        config_path.display()
                    );
                }
                Config::default().save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },

        #[cfg(feature = "dev-server")]
        Commands::Serve {
            bind,
            backend_port,
            out_dir,
        } => {
            let mut dev = config.dev_server;
            if let Some(bind) = bind {
                dev.bind = bind;
            }
            if let Some(port) = backend_port {
                dev.backend_port = port;
            }
            if let Some(dir) = out_dir {
                dev.out_dir = dir;
            }
            if !dev.out_dir.is_dir() {
                tracing::warn!(
                    out_dir = %dev.out_dir.display(),
                    "asset directory does not exist; only the proxy will answer"
                );
            }
            docview::devserver::serve(dev).await?;
        }
    }

    Ok(())
}

type SearchOutcome = (u64, String, ClientResult<Vec<Document>>);

/// Read queries from stdin, one per line, and search only once typing settles.
async fn run_interactive(client: &ApiClient, delay: std::time::Duration) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SearchOutcome>();
    let client = client.clone();
    let mut search = Debouncer::new(delay, move |(seq, query): (u64, String)| {
        let client = client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = client.search(&query).await;
            // The receiver lives until run_interactive returns.
            let _ = tx.send((seq, query, result));
        });
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut tracker = SearchTracker::default();

    loop {
        tokio::select! {
            line = lines.next_line() => match line.into_diagnostic()? {
                Some(line) => search.call((tracker.issue(), line)),
                None => break,
            },
            Some((seq, query, result)) = rx.recv() => {
                tracker.settle(seq);
                report(&query, result);
            }
        }
    }

    // Stdin closed: let the last settled query finish.
    while tracker.awaiting() {
        let Some((seq, query, result)) = rx.recv().await else {
            break;
        };
        tracker.settle(seq);
        report(&query, result);
    }
    Ok(())
}

/// Tracks whether the newest query typed has produced a result yet.
///
/// Queries are numbered as they are typed; results from older ones, even
/// for identical text, do not count.
#[derive(Debug, Default)]
struct SearchTracker {
    issued: u64,
    answered: u64,
}

impl SearchTracker {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn settle(&mut self, seq: u64) {
        self.answered = self.answered.max(seq);
    }

    fn awaiting(&self) -> bool {
        self.answered < self.issued
    }
}

fn report(query: &str, result: ClientResult<Vec<Document>>) {
    match result {
        Ok(results) => print_results(query, &results),
        Err(e) => eprintln!("{:?}", miette::Report::new(e)),
    }
}

fn print_index(index: &IndexData) {
    if !index.title.is_empty() {
        println!("{}", index.title);
    }
    println!("{} documents", index.total_documents);
    for group in &index.groups {
        println!();
        println!("{} ({})", group.name, group.documents.len());
        for doc in &group.documents {
            println!("  {}  [{}]", doc.title, doc.rel_path);
        }
    }
}

fn print_results(query: &str, results: &[Document]) {
    if query.trim().is_empty() {
        return;
    }
    if results.is_empty() {
        println!("No matches for \"{query}\".");
        return;
    }
    println!("Matches for \"{query}\" ({}):", results.len());
    for (i, doc) in results.iter().enumerate() {
        println!("  {}. {}  [{}/{}]", i + 1, doc.title, doc.source_name, doc.rel_path);
        if !doc.overview.is_empty() {
            println!("     {}", doc.overview);
        }
    }
}
