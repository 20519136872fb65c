//! Web server bootstrap for the admin panel

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use tracing::info;

use super::admin::{admin_router, AdminState};
use crate::config::TlsConfig;
use crate::logging::SharedLogBuffer;
use crate::managers::SharedLifecycleManager;

/// Web server configuration
pub struct WebServerConfig {
    pub port: u16,
    /// Serve HTTPS when set, plain HTTP otherwise
    pub tls: Option<TlsConfig>,
}

pub fn build_router(manager: SharedLifecycleManager, log_buffer: SharedLogBuffer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(admin_router(AdminState {
            manager,
            log_buffer,
        }))
}

/// Start the admin panel and serve until the process exits
pub async fn start_web_server(
    config: WebServerConfig,
    manager: SharedLifecycleManager,
    log_buffer: SharedLogBuffer,
) -> anyhow::Result<()> {
    let app = build_router(manager, log_buffer);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match config.tls {
        Some(tls) => {
            if !tls.cert_path.exists() {
                return Err(anyhow::anyhow!(
                    "Certificate file not found: {}",
                    tls.cert_path.display()
                ));
            }
            if !tls.key_path.exists() {
                return Err(anyhow::anyhow!(
                    "Private key file not found: {}",
                    tls.key_path.display()
                ));
            }

            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to load TLS certificates: {}\n  Certificate: {}\n  Private key: {}",
                        e,
                        tls.cert_path.display(),
                        tls.key_path.display()
                    )
                })?;

            info!("Admin panel listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Admin panel listening on http://{}", addr);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}
