use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{Client, ResourceExt};
use std::time::Duration;
use tracing::debug;

use crate::util::{Result, StdError};

/// Name of the container port serving the node's monitoring endpoints
pub const MONITORING_PORT_NAME: &str = "monitoring";
pub const READY_PATH: &str = "/ready";
pub const SYNCED_PATH: &str = "/ready/synced";

/// Out-of-band health checks of a running node.
///
/// An `Err` means no answer could be obtained; callers treat it as "not ready".
#[async_trait]
pub trait NodeProbe: Send + Sync {
    /// The node is up and answers RPC requests
    async fn is_ready(&self, pod: &Pod) -> Result<bool>;

    /// The node caught up with the chain head
    async fn is_synced(&self, pod: &Pod) -> Result<bool>;
}

/// Probes the node through the API server's pod proxy
#[derive(Clone)]
pub struct ProxyProbe {
    client: Client,
    timeout: Duration,
}

impl ProxyProbe {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn get(&self, pod: &Pod, path: &str) -> Result<String> {
        let namespace = pod
            .namespace()
            .ok_or_else(|| StdError::MetadataMissing("pod namespace".to_string()))?;
        let port = monitoring_port(pod).ok_or_else(|| {
            StdError::ProbeError(format!(
                "pod '{}' declares no '{MONITORING_PORT_NAME}' port",
                pod.name_any()
            ))
        })?;

        let uri = proxy_path(&namespace, &pod.name_any(), port, path);
        let request = http::Request::get(&uri)
            .body(Vec::new())
            .map_err(|e| StdError::ProbeError(e.to_string()))?;

        debug!("Probing {uri}");
        match tokio::time::timeout(self.timeout, self.client.request_text(request)).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => Err(StdError::KubeError(e).into()),
            Err(_) => Err(StdError::ProbeError(format!("{uri} timed out after {:?}", self.timeout)).into()),
        }
    }
}

#[async_trait]
impl NodeProbe for ProxyProbe {
    async fn is_ready(&self, pod: &Pod) -> Result<bool> {
        self.get(pod, READY_PATH).await.map(|_| true)
    }

    async fn is_synced(&self, pod: &Pod) -> Result<bool> {
        self.get(pod, SYNCED_PATH).await.map(|_| true)
    }
}

/// Container port named [`MONITORING_PORT_NAME`] on any container of the pod
pub fn monitoring_port(pod: &Pod) -> Option<i32> {
    pod.spec
        .as_ref()?
        .containers
        .iter()
        .flat_map(|container| container.ports.iter().flatten())
        .find(|port| port.name.as_deref() == Some(MONITORING_PORT_NAME))
        .map(|port| port.container_port)
}

pub fn proxy_path(namespace: &str, pod: &str, port: i32, path: &str) -> String {
    format!("/api/v1/namespaces/{namespace}/pods/http:{pod}:{port}/proxy{path}")
}
