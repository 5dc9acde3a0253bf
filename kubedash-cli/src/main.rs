mod commands;
#[cfg(feature = "explain")]
mod explain;
mod kubectl;
mod logging;
mod runtime;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use regex::Regex;
use tracing::info;

use kubedash_core::client::ClusterClient;
use kubedash_core::config::{ConfigError, DashboardConfig, ThemeChoice};
use kubedash_core::dashboard::Outcome;
use kubedash_core::fake::FakeCluster;
use kubedash_core::persona::Persona;
use kubedash_core::resource::{ResourceItem, ResourceKind};

use commands::doctor::ReportOptions;
use kubectl::KubectlClient;
use runtime::{RuntimeOptions, run_dashboard};
use ui::Theme;

#[derive(Parser)]
#[command(name = "kubedash")]
#[command(about = "Diagnose pods and Tekton PipelineRuns from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Namespace to inspect (default: current context namespace)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Use built-in sample data instead of a cluster
    #[arg(long, global = true)]
    demo: bool,

    /// Config file (default: discovered)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// kubectl-compatible binary to run
    #[arg(long, global = true)]
    kubectl: Option<String>,

    /// dark or high-contrast
    #[arg(long, global = true)]
    theme: Option<ThemeChoice>,

    /// Voice of the generated explanation
    #[arg(long, global = true)]
    persona: Option<Persona>,

    /// Model used for the generated explanation
    #[arg(long, global = true)]
    model: Option<String>,

    /// Ask a generative model to explain the diagnosed resource
    #[arg(long, global = true)]
    explain: bool,

    /// Refresh the resource list every N seconds (0 disables)
    #[arg(long, global = true)]
    refresh: Option<u64>,

    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Show container logs in the report
    #[arg(short = 'l', long, global = true)]
    showlog: bool,

    /// Maximum log lines per container
    #[arg(long, global = true)]
    maxlines: Option<usize>,

    /// Show events in the report
    #[arg(short = 'E', long, global = true)]
    events: bool,

    /// Show labels in the report
    #[arg(short = 'L', long, global = true)]
    labels: bool,

    /// Show annotations in the report
    #[arg(short = 'A', long, global = true)]
    annotations: bool,

    /// Only report containers whose name matches REGEXP
    #[arg(short, long, global = true, value_name = "REGEXP", value_parser = Regex::new)]
    restrict: Option<Regex>,
}

impl Cli {
    fn report_options(&self, config: &DashboardConfig) -> ReportOptions {
        ReportOptions {
            logs: self.showlog,
            events: self.events,
            labels: self.labels,
            annotations: self.annotations,
            restrict: self.restrict.clone(),
            limits: config.fetch_limits(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Browse pods (default)
    Pods,
    /// Browse Tekton PipelineRuns
    #[command(alias = "pr")]
    Pipelineruns,
    /// Print the diagnosis report of one resource without the dashboard
    Doctor {
        name: String,
        /// Treat NAME as a PipelineRun
        #[arg(long)]
        pipelinerun: bool,
    },
    /// Write a starter kubedash.yaml in the current directory
    Init {
        #[arg(short, long)]
        yes: bool,
    },
}

/// File configuration with command-line overrides applied, and the file it
/// came from.
fn load_config(cli: &Cli) -> Result<(DashboardConfig, Option<PathBuf>), ConfigError> {
    let (mut config, source) = match &cli.config {
        Some(path) => (DashboardConfig::load(path)?, Some(path.clone())),
        None => {
            let cwd = std::env::current_dir()?;
            match DashboardConfig::discover(&cwd)? {
                Some((path, config)) => (config, Some(path)),
                None => (DashboardConfig::default(), None),
            }
        }
    };

    if let Some(ns) = &cli.namespace {
        config.namespace = Some(ns.clone());
    }
    if let Some(kubectl) = &cli.kubectl {
        config.kubectl = kubectl.clone();
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(persona) = cli.persona {
        config.persona = persona;
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(secs) = cli.refresh {
        config.refresh_interval_secs = Some(secs);
    }
    if let Some(path) = &cli.log_file {
        config.log_file = Some(path.clone());
    }
    if let Some(lines) = cli.maxlines {
        config.log_lines = lines;
        config.pipeline_log_lines = lines;
    }
    config.validate()?;
    Ok((config, source))
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let (config, source) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => fail(e),
    };
    logging::init_logging(config.log_file.as_deref())?;
    if let Some(path) = &source {
        info!(path = %path.display(), "loaded config");
    }

    let client: Arc<dyn ClusterClient> = if cli.demo {
        Arc::new(FakeCluster::demo())
    } else {
        Arc::new(KubectlClient::new(
            config.kubectl.clone(),
            config.namespace.clone(),
        ))
    };

    let kind = match &cli.command {
        Some(Commands::Init { yes }) => {
            return match commands::run_init(*yes, config.namespace.as_deref()) {
                Ok(()) => Ok(()),
                Err(e) => fail(e),
            };
        }
        Some(Commands::Doctor { name, pipelinerun }) => {
            let kind = if *pipelinerun {
                ResourceKind::PipelineRun
            } else {
                ResourceKind::Pod
            };
            return report(client.as_ref(), kind, name, &cli, &config).await;
        }
        Some(Commands::Pipelineruns) => ResourceKind::PipelineRun,
        Some(Commands::Pods) | None => ResourceKind::Pod,
    };

    let options = RuntimeOptions {
        kind,
        limits: config.fetch_limits(),
        refresh: config.refresh_interval(),
        theme: Theme::from_choice(config.theme),
    };
    match run_dashboard(client.clone(), options).await? {
        Outcome::Chosen(name) => report(client.as_ref(), kind, &name, &cli, &config).await,
        Outcome::Dismissed => Ok(()),
    }
}

async fn report(
    client: &dyn ClusterClient,
    kind: ResourceKind,
    name: &str,
    cli: &Cli,
    config: &DashboardConfig,
) -> io::Result<()> {
    match commands::run_doctor(client, kind, name, &cli.report_options(config)).await {
        Ok(item) => {
            if cli.explain {
                explain_item(client, &item, config).await;
            }
            Ok(())
        }
        Err(e) => fail(e),
    }
}

#[cfg(feature = "explain")]
async fn explain_item(client: &dyn ClusterClient, item: &ResourceItem, config: &DashboardConfig) {
    println!();
    println!(
        "🧠 Explanation: {} is investigating...",
        config.persona.display_name()
    );
    match explain::explain(client, item, config.persona, &config.model).await {
        Ok(text) => println!("\n{}", text.trim_end()),
        Err(e) => eprintln!("Explanation unavailable: {}", e),
    }
}

#[cfg(not(feature = "explain"))]
async fn explain_item(_client: &dyn ClusterClient, item: &ResourceItem, _config: &DashboardConfig) {
    eprintln!(
        "Cannot explain {}: kubedash was built without the `explain` feature.",
        item.name()
    );
}
