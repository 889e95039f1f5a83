use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod format;

use context::{AppContext, GlobalArgs, VerbosityLevel};

/// Chartex - Helm Chart Repository Explorer
///
/// Lists charts and versions, and inspects values, files, dependencies and
/// container images of charts in HTTP repositories and OCI registries.
#[derive(Parser, Debug)]
#[command(name = "chartex")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the charts of a repository
    #[command(visible_alias = "ls")]
    Charts {
        /// Repository URL or oci:// locator
        repo: String,
    },
    /// List the versions of a chart, newest first
    Versions {
        /// Repository URL or oci:// locator
        repo: String,
        /// Chart name (optional for oci:// locators)
        #[arg(default_value = "")]
        chart: String,
    },
    /// Show the newest version of a chart
    Latest {
        /// Repository URL or oci:// locator
        repo: String,
        /// Chart name (optional for oci:// locators)
        #[arg(default_value = "")]
        chart: String,
    },
    /// Show the default values of a chart
    Values {
        /// Repository URL or oci:// locator
        repo: String,
        /// Chart name (optional for oci:// locators)
        #[arg(default_value = "")]
        chart: String,
        /// Chart version (default: latest)
        #[arg(long, default_value = "")]
        version: String,
    },
    /// Print every file of a chart
    Contents {
        /// Repository URL or oci:// locator
        repo: String,
        /// Chart name (optional for oci:// locators)
        #[arg(default_value = "")]
        chart: String,
        /// Chart version (default: latest)
        #[arg(long, default_value = "")]
        version: String,
        /// Include vendored subcharts
        #[arg(short, long)]
        recursive: bool,
    },
    /// List the dependencies declared by a chart and its subcharts
    Deps {
        /// Repository URL or oci:// locator
        repo: String,
        /// Chart name (optional for oci:// locators)
        #[arg(default_value = "")]
        chart: String,
        /// Chart version (default: latest)
        #[arg(long, default_value = "")]
        version: String,
    },
    /// List the container images a chart deploys
    Images {
        /// Repository URL or oci:// locator
        repo: String,
        /// Chart name (optional for oci:// locators)
        #[arg(default_value = "")]
        chart: String,
        /// Chart version (default: latest)
        #[arg(long, default_value = "")]
        version: String,
        /// Value overrides as a JSON object (can be repeated)
        #[arg(long = "set-json", value_name = "JSON")]
        set_json: Vec<String>,
        /// Also render each vendored subchart on its own
        #[arg(short, long)]
        recursive: bool,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return;
    }

    init_tracing(VerbosityLevel::from_count(cli.global.verbose));

    // Build context with precedence: defaults > config file > CLI flags
    let ctx = match AppContext::build(&cli.global) {
        Ok(ctx) => ctx,
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    };
    let chartex = match ctx.chartex() {
        Ok(chartex) => chartex,
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    };
    let fmt = ctx.format;

    let output = match cli.command {
        Commands::Charts { repo } => commands::chart::charts(&chartex, &repo, fmt).await,
        Commands::Versions { repo, chart } => {
            commands::chart::versions(&chartex, &repo, &chart, fmt).await
        }
        Commands::Latest { repo, chart } => {
            commands::chart::latest(&chartex, &repo, &chart, fmt).await
        }
        Commands::Values {
            repo,
            chart,
            version,
        } => commands::chart::values(&chartex, &repo, &chart, &version, fmt).await,
        Commands::Contents {
            repo,
            chart,
            version,
            recursive,
        } => commands::chart::contents(&chartex, &repo, &chart, &version, recursive, fmt).await,
        Commands::Deps {
            repo,
            chart,
            version,
        } => commands::chart::dependencies(&chartex, &repo, &chart, &version, fmt).await,
        Commands::Images {
            repo,
            chart,
            version,
            set_json,
            recursive,
        } => {
            commands::images::images(&chartex, &repo, &chart, &version, &set_json, recursive, fmt)
                .await
        }
        Commands::Completion { .. } => return,
    };

    format::emit(output);
}
