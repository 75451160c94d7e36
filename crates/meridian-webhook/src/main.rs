//! Meridian webhook - tracks Infrastructure network layout migrations

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use meridian_common::crd::providers::azure::{AzureInfrastructureConfig, PROVIDER_TYPE};
use meridian_common::telemetry::{init_telemetry, TelemetryConfig};
use meridian_common::{DEFAULT_CERT_DIR, DEFAULT_WEBHOOK_PORT};
use meridian_webhook::layout::network_layout_migration_mutate;
use meridian_webhook::mutator::InfrastructureMutator;
use meridian_webhook::server::{mutating_webhook_configuration, serve, WebhookConfig};

/// Meridian - mutating admission webhook for Infrastructure resources
#[derive(Parser, Debug)]
#[command(name = "meridian-webhook", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Without a subcommand the webhook is served
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the MutatingWebhookConfiguration registering this webhook
    WebhookConfig(WebhookConfigArgs),

    /// Print the JSON schema of the Azure InfrastructureConfig
    Schema,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "MERIDIAN_BIND_ADDRESS", default_value = "0.0.0.0")]
    bind_address: IpAddr,

    /// HTTPS port to listen on
    #[arg(long, env = "MERIDIAN_PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    /// Directory containing tls.crt and tls.key
    #[arg(long, env = "MERIDIAN_CERT_DIR", default_value = DEFAULT_CERT_DIR)]
    cert_dir: PathBuf,

    /// Only Infrastructure objects of this provider type are mutated
    #[arg(long, env = "MERIDIAN_PROVIDER_TYPE", default_value = PROVIDER_TYPE)]
    provider_type: String,
}

impl From<ServeArgs> for WebhookConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            bind_addr: SocketAddr::new(args.bind_address, args.port),
            cert_dir: args.cert_dir,
            provider_type: args.provider_type,
        }
    }
}

#[derive(Args, Debug)]
struct WebhookConfigArgs {
    /// Name of the Service in front of the webhook
    #[arg(long, default_value = "meridian-webhook")]
    service_name: String,

    /// Namespace of the Service
    #[arg(long, default_value = "garden")]
    namespace: String,

    /// PEM file with the CA that signed the serving certificate
    #[arg(long)]
    ca_bundle: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_webhook(cli.serve).await,
        Some(Commands::WebhookConfig(args)) => print_webhook_config(args),
        Some(Commands::Schema) => print_schema(),
    }
}

async fn run_webhook(args: ServeArgs) -> anyhow::Result<()> {
    // aws-lc-rs backs every TLS handshake; nothing can be served without it
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        anyhow::bail!("failed to install aws-lc-rs crypto provider: {e:?}");
    }

    init_telemetry(TelemetryConfig {
        provider_type: args.provider_type.clone(),
        ..Default::default()
    })?;

    let mutator = Arc::new(InfrastructureMutator::new(vec![
        network_layout_migration_mutate,
    ]));

    serve(args.into(), mutator).await?;
    Ok(())
}

fn print_webhook_config(args: WebhookConfigArgs) -> anyhow::Result<()> {
    let ca_bundle = args
        .ca_bundle
        .map(|path| {
            std::fs::read(&path)
                .map_err(|e| anyhow::anyhow!("failed to read CA bundle {}: {}", path.display(), e))
        })
        .transpose()?;

    let config = mutating_webhook_configuration(&args.service_name, &args.namespace, ca_bundle);
    let yaml = serde_yaml::to_string(&config)
        .map_err(|e| anyhow::anyhow!("failed to serialize webhook configuration: {}", e))?;
    println!("{yaml}");
    Ok(())
}

fn print_schema() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(AzureInfrastructureConfig);
    let yaml = serde_yaml::to_string(&schema)
        .map_err(|e| anyhow::anyhow!("failed to serialize schema: {}", e))?;
    println!("{yaml}");
    Ok(())
}
