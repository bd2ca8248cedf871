//! kmf CLI - Kubernetes migration factory

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kmf_core::{Action, KindSelector, MigrationSettings, MirrorSettings, NamespaceSpec};
use kmf_kube::ClusterEndpoint;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "kmf")]
#[command(version)]
#[command(about = "Copy namespaces, Helm releases and images from one Kubernetes cluster to another", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true, env = "KMF_DEBUG")]
    debug: bool,
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Kubeconfig for the source cluster
    #[arg(long, env = "KMF_SOURCE_KUBECONFIG")]
    source_kubeconfig: Option<PathBuf>,

    /// Context of the source cluster
    #[arg(long, env = "KMF_SOURCE_CONTEXT")]
    source_context: Option<String>,
}

impl SourceArgs {
    fn endpoint(&self) -> ClusterEndpoint {
        ClusterEndpoint::new(self.source_kubeconfig.clone(), self.source_context.clone())
    }
}

#[derive(Args, Debug, Clone)]
struct DestinationArgs {
    /// Kubeconfig for the destination cluster
    #[arg(long, env = "KMF_DESTINATION_KUBECONFIG")]
    destination_kubeconfig: Option<PathBuf>,

    /// Context of the destination cluster
    #[arg(long, env = "KMF_DESTINATION_CONTEXT")]
    destination_context: Option<String>,
}

impl DestinationArgs {
    fn endpoint(&self) -> ClusterEndpoint {
        ClusterEndpoint::new(
            self.destination_kubeconfig.clone(),
            self.destination_context.clone(),
        )
    }
}

#[derive(Args, Debug, Clone)]
struct ScopeArgs {
    /// Namespaces to migrate: "all" or a comma separated list
    #[arg(short, long, env = "KMF_NAMESPACES", default_value = "all")]
    namespaces: NamespaceSpec,

    /// Additional namespaces that are never migrated
    #[arg(long, env = "KMF_RESERVED_NAMESPACES", value_delimiter = ',')]
    reserved_namespaces: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy objects, Helm releases and images to the destination cluster
    Migrate {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        destination: DestinationArgs,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Kinds to migrate: "all" or comma separated aliases (svc, cm, deploy, ...)
        #[arg(short, long, env = "KMF_RESOURCES", default_value = "all")]
        resources: KindSelector,

        /// deploy or delete
        #[arg(long, env = "KMF_ACTION", default_value = "deploy")]
        action: Action,

        /// Export Helm releases under this directory and install them on the destination
        #[arg(long, env = "KMF_HELM_PATH")]
        helm_path: Option<PathBuf>,

        /// Copy third-party images into the private registry
        #[arg(long, env = "KMF_MIGRATE_IMAGES")]
        migrate_images: bool,

        /// Registries whose images are copied (gcr, dockerhub, gitlab)
        #[arg(long, env = "KMF_REGISTRIES", default_value = "gcr,dockerhub,gitlab")]
        registries: String,

        /// Region of the private registry
        #[arg(long, env = "KMF_REGION")]
        region: Option<String>,

        /// helm binary
        #[arg(long, env = "KMF_HELM_BINARY", default_value = "helm")]
        helm_binary: PathBuf,

        /// docker binary
        #[arg(long, env = "KMF_DOCKER_BINARY", default_value = "docker")]
        docker_binary: PathBuf,
    },

    /// Export the source cluster's deployed Helm releases as chart directories
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Directory the charts are written under
        #[arg(long, env = "KMF_HELM_PATH", default_value = ".")]
        helm_path: PathBuf,
    },

    /// Manage Helm chart repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Refresh the index of every configured repository
    Update {
        /// Maximum concurrent downloads
        #[arg(long, default_value_t = kmf_repo::update::DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn settings(scope: &ScopeArgs, kinds: KindSelector) -> MigrationSettings {
    MigrationSettings::new(scope.namespaces.clone(), kinds)
        .with_reserved(scope.reserved_namespaces.iter().map(|s| s.trim().to_string()))
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Migrate {
            source,
            destination,
            scope,
            resources,
            action,
            helm_path,
            migrate_images,
            registries,
            region,
            helm_binary,
            docker_binary,
        } => {
            let mut settings = settings(&scope, resources).with_action(action);
            if let Some(path) = helm_path {
                settings = settings.with_chart_root(path);
            }
            if migrate_images {
                let mut mirror =
                    MirrorSettings::parse(&registries).map_err(|e| CliError::usage(e.to_string()))?;
                mirror.region = region;
                settings = settings.with_mirror(mirror);
            }
            let tools = commands::migrate::Tools {
                helm: helm_binary,
                docker: docker_binary,
            };
            commands::migrate::run(source.endpoint(), destination.endpoint(), settings, tools).await
        }

        Commands::Export {
            source,
            scope,
            helm_path,
        } => {
            let settings = settings(&scope, KindSelector::All);
            commands::export::run(source.endpoint(), settings, &helm_path).await
        }

        Commands::Repo { command } => match command {
            RepoCommands::Update { concurrency } => commands::repo::update(concurrency).await,
        },
    }
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(exit_codes::USAGE_ERROR);
        }
        Err(err) => err.exit(),
    };

    init_logging(cli.debug);

    if let Err(err) = dispatch(cli.command).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
    std::process::exit(exit_codes::SUCCESS);
}
