//! Chartlock CLI - keep helm release values as minimal, version-locked overrides

use std::path::PathBuf;

use chartlock_core::DEFAULT_MANIFEST;
use chartlock_engine::{UninstallOptions, UpgradeOptions};
use chartlock_kube::DeployOptions;
use clap::{Parser, Subcommand};
use miette::Result;

mod commands;
mod error;
mod exit_codes;
mod logging;

use commands::GlobalArgs;

#[derive(Parser)]
#[command(name = "chartlock")]
#[command(author = "Chartlock Contributors")]
#[command(version)]
#[command(about = "Keep helm release values as minimal, version-locked overrides", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Manifest listing repositories, releases and singles
    #[arg(short, long, global = true, env = "CHARTLOCK_MANIFEST", default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,

    /// Env file with values for allowed variables (default: .env next to the manifest)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// helm binary
    #[arg(long, global = true, env = "CHARTLOCK_HELM", default_value = "helm")]
    helm: PathBuf,

    /// kubectl binary
    #[arg(long, global = true, env = "CHARTLOCK_KUBECTL", default_value = "kubectl")]
    kubectl: PathBuf,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty manifest
    Init,

    /// Reconcile value documents and deploy releases and singles
    Upgrade {
        /// Releases or singles to skip
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Only process these releases or singles
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Abort the whole run on the first failure
        #[arg(long)]
        stop_on_first_error: bool,

        /// Show the reconciled overrides without writing or deploying
        #[arg(long)]
        dry_run: bool,

        /// Do not redeploy releases whose values and version did not change
        #[arg(long)]
        skip_unchanged: bool,

        /// Do not sync chart repositories first
        #[arg(long)]
        no_repo_sync: bool,

        /// Wait for resources to be ready
        #[arg(long)]
        wait: bool,

        /// Roll back a release whose upgrade fails
        #[arg(long)]
        atomic: bool,

        /// Render templates into this directory instead of installing
        #[arg(long, value_name = "DIR")]
        template: Option<PathBuf>,

        /// Continue when allowed environment variables are not set
        #[arg(long)]
        allow_missing_env: bool,
    },

    /// Show how an upgrade would change a release's value document
    Diff {
        /// Release name
        release: String,

        /// Continue when allowed environment variables are not set
        #[arg(long)]
        allow_missing_env: bool,
    },

    /// Uninstall a release or single and remove it from the manifest
    Uninstall {
        /// Release or single name
        name: String,

        /// Simulate the uninstall
        #[arg(long)]
        dry_run: bool,

        /// Keep the values or manifest file
        #[arg(long)]
        keep_file: bool,
    },

    /// Manage allowed environment variables
    Env {
        #[command(subcommand)]
        command: Option<EnvCommands>,
    },

    /// Manage chart repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

#[derive(Subcommand)]
enum EnvCommands {
    /// Show allowed variables and whether they are set
    List,

    /// Allow variables to be substituted into deployed values
    Allow {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Stop allowing variables
    Disallow {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// List repositories
    List,

    /// Add a repository
    Add { name: String, url: String },

    /// Remove a repository
    Remove { name: String },

    /// Register repositories with helm and refresh their indexes
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
    Ok(())
}

async fn run(cli: Cli) -> error::Result<()> {
    let global = GlobalArgs {
        manifest: cli.manifest,
        env_file: cli.env_file,
        helm: cli.helm,
        kubectl: cli.kubectl,
    };

    match cli.command {
        Commands::Init => commands::init::run(&global),

        Commands::Upgrade {
            ignore,
            only,
            stop_on_first_error,
            dry_run,
            skip_unchanged,
            no_repo_sync,
            wait,
            atomic,
            template,
            allow_missing_env,
        } => {
            let options = UpgradeOptions {
                ignore,
                only,
                stop_on_first_error,
                dry_run,
                skip_unchanged,
                sync_repos: !no_repo_sync,
                deploy: DeployOptions {
                    wait,
                    atomic,
                    template_dir: template,
                },
            };
            commands::upgrade::run(&global, &options, allow_missing_env).await
        }

        Commands::Diff {
            release,
            allow_missing_env,
        } => commands::diff::run(&global, &release, allow_missing_env).await,

        Commands::Uninstall {
            name,
            dry_run,
            keep_file,
        } => commands::uninstall::run(&global, &name, UninstallOptions { dry_run, keep_file }).await,

        Commands::Env { command } => match command.unwrap_or(EnvCommands::List) {
            EnvCommands::List => commands::env::list(&global),
            EnvCommands::Allow { names } => commands::env::allow(&global, &names),
            EnvCommands::Disallow { names } => commands::env::disallow(&global, &names),
        },

        Commands::Repo { command } => match command {
            RepoCommands::List => commands::repo::list(&global),
            RepoCommands::Add { name, url } => commands::repo::add(&global, &name, &url),
            RepoCommands::Remove { name } => commands::repo::remove(&global, &name),
            RepoCommands::Sync => commands::repo::sync(&global).await,
        },
    }
}
