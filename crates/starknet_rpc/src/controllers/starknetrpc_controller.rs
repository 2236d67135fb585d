use crate::api::v1alpha1::StarknetRPC;
use crate::client::KubeStore;
use crate::probe::ProxyProbe;
use crate::util::backoff::ErrorBackoff;
use crate::util::config::OperatorConfig;
use crate::util::{errors, errors::Result, metrics};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::{
    api::{Api, ListParams, ResourceExt},
    client::Client,
    Resource,
    runtime::{
        controller::{Action, Controller},
        events::{Recorder, Reporter},
        watcher::{self, Config},
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

use super::reconcile::RpcReconciler;
use super::Stage;

pub const CONTROLLER_NAME: &str = "starknet-operator";

/// State shared between the controller and the web server
#[derive(Clone)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
    config: OperatorConfig,
}

impl Default for State {
    fn default() -> Self {
        Self::new(OperatorConfig::default())
    }
}

/// State wrapper around the controller outputs for the web server
impl State {
    pub fn new(config: OperatorConfig) -> Self {
        let diagnostics = Diagnostics::new(config.instance.clone());
        Self {
            diagnostics: Arc::new(RwLock::new(diagnostics)),
            registry: prometheus::Registry::default(),
            config,
        }
    }

    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a Controller Context that can update State
    pub fn to_context(&self, client: Client) -> Arc<Context> {
        let metrics = metrics::Metrics::default()
            .register(&self.registry)
            .unwrap_or_else(|e| {
                warn!("Metrics not registered: {e}");
                metrics::Metrics::default()
            });
        Arc::new(Context {
            store: KubeStore::new(client.clone()),
            probe: ProxyProbe::new(client.clone(), self.config.probe_timeout),
            client,
            config: self.config.clone(),
            metrics,
            diagnostics: self.diagnostics.clone(),
            backoff: ErrorBackoff::default(),
        })
    }
}

// Context for our reconciler
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    pub store: KubeStore,
    pub probe: ProxyProbe,
    pub config: OperatorConfig,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: metrics::Metrics,
    /// Consecutive failures per resource
    pub backoff: ErrorBackoff,
}

fn backoff_key(rpc: &StarknetRPC) -> String {
    format!("{}/{}", rpc.namespace().unwrap_or_default(), rpc.name_any())
}

pub async fn reconcile(rpc: Arc<StarknetRPC>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = ctx.metrics.count_and_measure(CONTROLLER_NAME);
    ctx.diagnostics.write().await.last_event = Utc::now();
    let recorder = ctx.diagnostics.read().await.recorder(ctx.client.clone());

    info!(
        "Reconciling StarknetRPC \"{}\" in {}",
        rpc.name_any(),
        rpc.namespace().unwrap_or_default()
    );

    if rpc.meta().deletion_timestamp.is_some() {
        debug!("StarknetRPC \"{}\" is being deleted", rpc.name_any());
        ctx.backoff.reset(&backoff_key(&rpc));
        return Ok(Action::await_change());
    }

    let mut rpc = (*rpc).clone();
    let next = RpcReconciler::new(&ctx.store, &ctx.probe, &ctx.config.images)
        .with_recorder(&recorder)
        .reconcile(&mut rpc)
        .await?;

    ctx.backoff.reset(&backoff_key(&rpc));
    if next.stage != Stage::Steady {
        ctx.metrics.phase_requeue(next.stage.as_str());
    }
    debug!(
        "StarknetRPC \"{}\" next reconciled in {:?} ({})",
        rpc.name_any(),
        next.after,
        next.stage
    );
    Ok(next.action())
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Diagnostics {
    fn new(instance: Option<String>) -> Self {
        Self {
            last_event: Utc::now(),
            reporter: Reporter {
                controller: CONTROLLER_NAME.into(),
                instance,
            },
        }
    }

    fn recorder(&self, client: Client) -> Recorder {
        Recorder::new(client, self.reporter.clone())
    }
}

/// Delay before retrying a failed reconciliation of the resource at `key`
fn retry_delay(error: &errors::Error, backoff: &ErrorBackoff, key: &str) -> Duration {
    match error {
        errors::Error::ErrorWithRequeue(e) => e.duration,
        errors::Error::StdError(_) => backoff.next_delay(key),
    }
}

fn error_policy(rpc: Arc<StarknetRPC>, error: &errors::Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.metrics.reconcile_failure(&rpc, error);
    Action::requeue(retry_delay(error, &ctx.backoff, &backoff_key(&rpc)))
}

/// Initialize the controller and shared state (given the crd is installed)
pub async fn run(state: State) {
    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create kube Client: {e:?}");
            std::process::exit(1);
        }
    };

    let rpcs = Api::<StarknetRPC>::all(client.clone());
    if let Err(e) = rpcs.list(&ListParams::default().limit(1)).await {
        error!("CRD is not queryable; {e:?}. Is the CRD installed?");
        info!("Installation: cargo run --bin crdgen | kubectl apply -f -");
        std::process::exit(1);
    }

    Controller::new(rpcs, Config::default().any_semantic())
        .owns(
            Api::<PersistentVolumeClaim>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(Api::<Job>::all(client.clone()), watcher::Config::default())
        .owns(Api::<Pod>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state.to_context(client))
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
