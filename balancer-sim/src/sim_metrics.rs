use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Installs the Prometheus exporter when an address is given and describes
/// every balancer series to the recorder.
pub(crate) fn init_metrics(prom_addr: Option<SocketAddr>) -> Result<()> {
    if let Some(addr) = prom_addr {
        info!(%addr, "initializing metrics exporter");
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus recorder")?;
    }

    balancer_core::describe_metrics();
    Ok(())
}
