//! HTTPS server and webhook registration
//!
//! The server terminates TLS with the `tls.crt`/`tls.key` pair mounted from
//! the webhook's certificate secret and serves [`webhook_router`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    WebhookClientConfig,
};
use k8s_openapi::ByteString;
use kube::core::ObjectMeta;
use meridian_common::{
    Error, Result, DEFAULT_CERT_DIR, DEFAULT_WEBHOOK_PORT, TLS_CERT_FILE, TLS_KEY_FILE,
};
use tracing::{info, warn};

use crate::admission::{webhook_router, WebhookState, INFRASTRUCTURE_MUTATE_PATH};
use crate::mutator::Mutator;

/// Configuration for the webhook server
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Address the HTTPS server listens on
    pub bind_addr: SocketAddr,
    /// Directory containing `tls.crt` and `tls.key`
    pub cert_dir: PathBuf,
    /// `spec.type` of the Infrastructure objects to mutate
    pub provider_type: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_WEBHOOK_PORT),
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
            provider_type: meridian_common::crd::providers::azure::PROVIDER_TYPE.to_string(),
        }
    }
}

impl WebhookConfig {
    /// Path of the serving certificate
    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join(TLS_CERT_FILE)
    }

    /// Path of the serving key
    pub fn key_path(&self) -> PathBuf {
        self.cert_dir.join(TLS_KEY_FILE)
    }
}

/// In-flight admission reviews get this long to finish after a shutdown signal
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Serve the webhook over HTTPS until SIGTERM/ctrl-c or a server failure
pub async fn serve(config: WebhookConfig, mutator: Arc<dyn Mutator>) -> Result<()> {
    let tls_config = RustlsConfig::from_pem_file(config.cert_path(), config.key_path())
        .await
        .map_err(|e| {
            Error::internal_with_context(
                "tls",
                format!(
                    "failed to load {} and {}: {e}",
                    config.cert_path().display(),
                    config.key_path().display()
                ),
            )
        })?;

    let state = Arc::new(WebhookState::new(mutator, config.provider_type.clone()));
    let app = webhook_router(state);

    info!(
        addr = %config.bind_addr,
        provider = %config.provider_type,
        cert_dir = %config.cert_dir.display(),
        "Starting Infrastructure webhook server"
    );
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    axum_server::bind_rustls(config.bind_addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::internal_with_context("server", e.to_string()))?;

    info!("Infrastructure webhook server stopped");
    Ok(())
}

/// Wait for a termination signal, then drain connections through `handle`
async fn shutdown_on_signal(handle: Handle) {
    shutdown_signal().await;
    info!(
        grace_period_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
        "Shutdown signal received, draining connections"
    );
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Build the MutatingWebhookConfiguration routing Infrastructure updates to this webhook
///
/// The API server reaches the webhook through the `service_name` Service in
/// `namespace` on port 443.
pub fn mutating_webhook_configuration(
    service_name: &str,
    namespace: &str,
    ca_bundle: Option<Vec<u8>>,
) -> MutatingWebhookConfiguration {
    let name = format!("{service_name}-infrastructure");

    MutatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(name),
            ..Default::default()
        },
        webhooks: Some(vec![MutatingWebhook {
            name: "infrastructures.extensions.gardener.cloud".to_string(),
            admission_review_versions: vec!["v1".to_string()],
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            match_policy: Some("Equivalent".to_string()),
            timeout_seconds: Some(10),
            rules: Some(vec![RuleWithOperations {
                operations: Some(vec!["CREATE".to_string(), "UPDATE".to_string()]),
                api_groups: Some(vec!["extensions.gardener.cloud".to_string()]),
                api_versions: Some(vec!["v1alpha1".to_string()]),
                resources: Some(vec!["infrastructures".to_string()]),
                scope: Some("Namespaced".to_string()),
            }]),
            client_config: WebhookClientConfig {
                service: Some(ServiceReference {
                    name: service_name.to_string(),
                    namespace: namespace.to_string(),
                    path: Some(INFRASTRUCTURE_MUTATE_PATH.to_string()),
                    port: Some(443),
                }),
                ca_bundle: ca_bundle.map(ByteString),
                ..Default::default()
            },
            ..Default::default()
        }]),
    }
}
