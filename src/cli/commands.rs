//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their arguments.

use crate::blob::{validate_account, AzureBlobBackend, BlobBackend};
use crate::config::{save_config, Config};
use crate::error::{ArtifactError, Result};
use crate::fetch::{run_fetch_step, FetchRequest, Fetcher};
use crate::gate::{serve, GateState};
use crate::publish::{run_publish_step, BuildStatus, ManifestStore, Publisher, UploadRequest};
use crate::utils::format::{OutputFormat, TableFormatter};
use crate::utils::progress::ProgressIndicator;
use crate::utils::tokens::EnvTokens;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

#[derive(Parser)]
#[command(name = "aza")]
#[command(about = "Publish build artifacts to Azure Blob Storage and serve them back")]
#[command(version = get_version(), author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file to use instead of the default location
    #[arg(long = "config", global = true, value_name = "PATH", env = "AZA_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Disable colored table headers
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload workspace files to a blob container and record a manifest
    Publish(PublishArgs),
    /// Download blobs from a container into a local directory
    Fetch(FetchArgs),
    /// Run the artifact download gate
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Storage account operations
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Inspect stored artifact manifests
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Storage account name as configured
    #[arg(short, long)]
    pub account: String,
    /// Target container (tokens such as ${BUILD_ID} are expanded)
    #[arg(short, long)]
    pub container: String,
    /// Comma-separated Ant-style include patterns (default: **/*)
    #[arg(short, long, default_value = "")]
    pub include: String,
    /// Comma-separated Ant-style exclude patterns
    #[arg(short, long, default_value = "")]
    pub exclude: String,
    /// Virtual directory prefixed to every blob name
    #[arg(long, default_value = "")]
    pub virtual_path: String,
    /// Also upload all matched files as archive.zip
    #[arg(long)]
    pub archive: bool,
    /// Do not upload files individually
    #[arg(long)]
    pub skip_individual: bool,
    /// Content type for every uploaded file instead of guessing from the extension
    #[arg(long)]
    pub content_type: Option<String>,
    /// Drop directory structure from blob names
    #[arg(long)]
    pub flatten: bool,
    /// Create the container with public blob access
    #[arg(long)]
    pub public_access: bool,
    /// Delete existing blobs in the container before uploading
    #[arg(long)]
    pub clean: bool,
    /// Do not exclude archive.zip files from matching
    #[arg(long)]
    pub include_archive_zips: bool,
    /// Let anonymous callers download these artifacts through the gate
    #[arg(long)]
    pub allow_anonymous: bool,
    /// Skip the upload when the build has failed
    #[arg(long)]
    pub only_if_successful: bool,
    /// Keep the build status when no files match
    #[arg(long)]
    pub allow_empty: bool,
    /// Directory the include patterns are evaluated against
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,
    /// Build the artifacts belong to; the manifest is stored under this id
    #[arg(long, env = "BUILD_ID")]
    pub build_id: String,
    /// Status of the build so far
    #[arg(long, value_enum, default_value = "success")]
    pub build_status: BuildStatus,
}

impl PublishArgs {
    fn to_request(&self) -> UploadRequest {
        UploadRequest {
            storage_account: self.account.clone(),
            container_name: self.container.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            virtual_path: self.virtual_path.clone(),
            upload_archive: self.archive,
            skip_individual_files: self.skip_individual,
            content_type: self.content_type.clone(),
            flatten_directories: self.flatten,
            container_public_access: self.public_access,
            clean_before_upload: self.clean,
            include_archive_zips: self.include_archive_zips,
            allow_anonymous_access: self.allow_anonymous,
            only_if_successful: self.only_if_successful,
            do_not_fail_if_nothing_uploaded: self.allow_empty,
            workspace: self.workspace.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[arg(short, long)]
    pub account: String,
    #[arg(short, long)]
    pub container: String,
    /// Comma-separated Ant-style include patterns (default: **/*)
    #[arg(short, long, default_value = "")]
    pub include: String,
    #[arg(short, long, default_value = "")]
    pub exclude: String,
    /// Directory to download into
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
    #[arg(long)]
    pub flatten: bool,
    #[arg(long)]
    pub include_archive_zips: bool,
    #[arg(long, env = "BUILD_ID")]
    pub build_id: Option<String>,
    #[arg(long, value_enum, default_value = "success")]
    pub build_status: BuildStatus,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List configured storage accounts
    List,
    /// Check that an account's key and endpoint work
    Check {
        /// Storage account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ManifestCommands {
    /// Show what a build published
    Show {
        /// Build id
        build_id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Write the current configuration (defaults included) to the config file
    Init,
}

impl Cli {
    /// Run the selected command, returning the build status to exit with
    /// Debug logging from either the flag or the config file
    pub fn debug_enabled(&self, config: &Config) -> bool {
        self.debug || config.debug
    }

    pub async fn execute(self, config: Config) -> Result<BuildStatus> {
        let formatter = TableFormatter::new(self.format, self.no_color);
        let config_path = self.config_file.clone();

        match self.command {
            Commands::Publish(args) => execute_publish(args, &config).await,
            Commands::Fetch(args) => execute_fetch(args, &config).await,
            Commands::Serve { host, port } => {
                execute_serve(host, port, config).await?;
                Ok(BuildStatus::Success)
            }
            Commands::Account { command } => {
                execute_account_command(command, &config, &formatter).await?;
                Ok(BuildStatus::Success)
            }
            Commands::Manifest { command } => {
                execute_manifest_command(command, &config, &formatter).await?;
                Ok(BuildStatus::Success)
            }
            Commands::Config { command } => {
                execute_config_command(command, &config, config_path, &formatter).await?;
                Ok(BuildStatus::Success)
            }
        }
    }
}

async fn execute_publish(args: PublishArgs, config: &Config) -> Result<BuildStatus> {
    let backend: Arc<dyn BlobBackend> = Arc::new(AzureBlobBackend::new());
    let tokens = EnvTokens::from_process_env(Some(&args.build_id))?;
    let publisher = Publisher::new(backend).with_tokens(Arc::new(tokens));
    let store = ManifestStore::new(&config.manifest_dir);
    let registry = config.account_registry();

    let progress = ProgressIndicator::new("Uploading artifacts to Azure Blob Storage...");
    let outcome = run_publish_step(
        &publisher,
        &args.to_request(),
        args.build_status,
        &registry,
        &store,
        &args.build_id,
    )
    .await;
    progress.finish_and_clear();

    if outcome.uploaded > 0 {
        println!(
            "Uploaded {} artifact(s) for build '{}' (status: {})",
            outcome.uploaded, args.build_id, outcome.status
        );
    } else {
        println!("No artifacts uploaded (status: {})", outcome.status);
    }

    Ok(outcome.status)
}

async fn execute_fetch(args: FetchArgs, config: &Config) -> Result<BuildStatus> {
    let backend: Arc<dyn BlobBackend> = Arc::new(AzureBlobBackend::new());
    let tokens = EnvTokens::from_process_env(args.build_id.as_deref())?;
    let fetcher = Fetcher::new(backend).with_tokens(Arc::new(tokens));
    let request = FetchRequest {
        storage_account: args.account.clone(),
        container_name: args.container.clone(),
        include: args.include.clone(),
        exclude: args.exclude.clone(),
        download_dir: args.dir.clone(),
        flatten_directories: args.flatten,
        include_archive_zips: args.include_archive_zips,
    };

    let progress = ProgressIndicator::new("Downloading artifacts from Azure Blob Storage...");
    let status = run_fetch_step(&fetcher, &request, args.build_status, &config.account_registry()).await;
    progress.finish_and_clear();

    println!("Download finished (status: {status})");
    Ok(status)
}

async fn execute_serve(host: Option<String>, port: Option<u16>, mut config: Config) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    if config.storage_accounts.is_empty() {
        tracing::warn!("No storage accounts configured; every download will be rejected");
    }

    let state = GateState::from_config(&config, Arc::new(AzureBlobBackend::new()));
    serve(
        state,
        &config.server.addr(),
        &config.server.normalized_mount_prefix(),
    )
    .await
}

#[derive(Debug, Serialize, Tabled)]
struct AccountRow {
    #[tabled(rename = "Account")]
    name: String,
    #[tabled(rename = "Blob Endpoint")]
    endpoint: String,
    #[tabled(rename = "Service URL")]
    url: String,
}

async fn execute_account_command(
    command: AccountCommands,
    config: &Config,
    formatter: &TableFormatter,
) -> Result<()> {
    let registry = config.account_registry();

    match command {
        AccountCommands::List => {
            let rows: Vec<AccountRow> = registry
                .accounts()
                .iter()
                .filter_map(|account| registry.storage_account(&account.account_name))
                .map(|account| AccountRow {
                    url: account.account_url(),
                    name: account.account_name,
                    endpoint: account.blob_endpoint,
                })
                .collect();
            println!("{}", formatter.format_table(&rows)?);
        }
        AccountCommands::Check { name } => {
            let account = registry.storage_account(&name).ok_or_else(|| {
                ArtifactError::config(format!("Storage account '{name}' is not configured"))
            })?;

            let progress = ProgressIndicator::new(&format!("Checking storage account '{name}'..."));
            let result = validate_account(&AzureBlobBackend::new(), &account).await;
            match &result {
                Ok(()) => progress.finish_with_message(&format!(
                    "Storage account '{name}' is reachable at {}",
                    account.account_url()
                )),
                Err(_) => progress.finish_and_clear(),
            }
            result?;
        }
    }

    Ok(())
}

async fn execute_manifest_command(
    command: ManifestCommands,
    config: &Config,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        ManifestCommands::Show { build_id } => {
            let manifest = ManifestStore::new(&config.manifest_dir).load(&build_id).await?;

            if formatter_is_json(formatter) {
                println!("{}", serde_json::to_string_pretty(&manifest)?);
                return Ok(());
            }

            println!(
                "Build '{}': account '{}', container '{}', anonymous access {}",
                build_id,
                manifest.storage_account,
                manifest.container_name,
                if manifest.allow_anonymous_access { "allowed" } else { "denied" }
            );
            println!("Published {}", manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("{}", formatter.format_table(&manifest.entries())?);
        }
    }

    Ok(())
}

fn formatter_is_json(formatter: &TableFormatter) -> bool {
    formatter.format() == OutputFormat::Json
}

#[derive(Tabled)]
struct ConfigItem {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl ConfigItem {
    fn new<V: ToString>(key: &str, value: V) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

async fn execute_config_command(
    command: ConfigCommands,
    config: &Config,
    config_path: Option<PathBuf>,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_config_show(config, formatter),
        ConfigCommands::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::get_config_path()?,
            };
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init => {
            let path = save_config(config, config_path.as_deref()).await?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn execute_config_show(config: &Config, formatter: &TableFormatter) -> Result<()> {
    if formatter_is_json(formatter) {
        // Account keys are never printed
        let mut value = serde_json::to_value(config)?;
        if let Some(accounts) = value
            .get_mut("storage_accounts")
            .and_then(|v| v.as_array_mut())
        {
            for account in accounts {
                if let Some(obj) = account.as_object_mut() {
                    obj.remove("key");
                }
            }
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let server = &config.server;
    let items = vec![
        ConfigItem::new("debug", config.debug),
        ConfigItem::new("manifest_dir", config.manifest_dir.display()),
        ConfigItem::new("storage_accounts", config.storage_accounts.len()),
        ConfigItem::new("server.host", &server.host),
        ConfigItem::new("server.port", server.port),
        ConfigItem::new("server.mount_prefix", &server.mount_prefix),
        ConfigItem::new("server.login_path", &server.login_path),
        ConfigItem::new("server.global_security_enabled", server.global_security_enabled),
        ConfigItem::new("server.identity_header", &server.identity_header),
        ConfigItem::new("server.sign_timeout_secs", server.sign_timeout_secs),
        ConfigItem::new("server.sas_ttl_minutes", server.sas_ttl_minutes),
    ];

    let mut table = tabled::Table::new(&items);
    table.with(tabled::settings::Style::rounded());
    println!("{table}");

    Ok(())
}
