use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, PersistentVolumeClaimVolumeSource, Pod, PodSecurityContext,
    PodSpec, Volume, VolumeMount,
};

use super::{data_claim_name, node_pod_name, object_meta};
use crate::api::v1alpha1::StarknetRPC;
use crate::converge::FieldReconciler;
use crate::probe::MONITORING_PORT_NAME;
use crate::util::config::ImageDefaults;
use crate::util::Result;

pub const NODE_CONTAINER: &str = "rpc-pathfinder";
pub const DATA_DIR: &str = "/usr/share/pathfinder/data";
pub const RPC_PORT: i32 = 9545;
pub const MONITORING_PORT: i32 = 9000;
const DATA_VOLUME: &str = "pathfinder-data";
const NODE_USER: i64 = 1000;

/// Restarts tolerated in `CrashLoopBackOff` before the pod is recreated
pub const MAX_CRASH_RESTARTS: i32 = 5;

pub fn node_image(rpc: &StarknetRPC, images: &ImageDefaults) -> String {
    rpc.spec.image.clone().unwrap_or_else(|| images.node.clone())
}

fn env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn port(name: &str, container_port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port,
        ..Default::default()
    }
}

/// The pathfinder node serving RPC requests from the data volume
pub fn node_pod(rpc: &StarknetRPC, images: &ImageDefaults) -> Result<Pod> {
    let container = Container {
        name: NODE_CONTAINER.to_string(),
        image: Some(node_image(rpc, images)),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(vec![
            env("RUST_LOG", "info"),
            env("PATHFINDER_DATA_DIR", DATA_DIR),
            env("PATHFINDER_MONITOR_ADDRESS", &format!("0.0.0.0:{MONITORING_PORT}")),
            EnvVar {
                name: "PATHFINDER_ETHEREUM_API_URL".to_string(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(rpc.spec.layer1_rpc_secret.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            env("PATHFINDER_WEBSOCKET_ENABLED", "true"),
            env("PATHFINDER_HEAD_POLL_INTERVAL_SECONDS", "2"),
        ]),
        resources: rpc.spec.resources.clone(),
        ports: Some(vec![port("rpc", RPC_PORT), port(MONITORING_PORT_NAME, MONITORING_PORT)]),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: DATA_DIR.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Ok(Pod {
        metadata: object_meta(rpc, node_pod_name(rpc))?,
        spec: Some(PodSpec {
            containers: vec![container],
            volumes: Some(vec![Volume {
                name: DATA_VOLUME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: data_claim_name(rpc),
                    read_only: None,
                }),
                ..Default::default()
            }]),
            tolerations: rpc.spec.tolerations.clone(),
            security_context: Some(PodSecurityContext {
                run_as_user: Some(NODE_USER),
                run_as_group: Some(NODE_USER),
                fs_group: Some(NODE_USER),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Evicted, or crash looping past [`MAX_CRASH_RESTARTS`]
pub fn should_recreate(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    if status.reason.as_deref() == Some("Evicted") {
        return true;
    }
    status.container_statuses.iter().flatten().any(|container| {
        let waiting = container
            .state
            .as_ref()
            .and_then(|state| state.waiting.as_ref())
            .and_then(|waiting| waiting.reason.as_deref());
        waiting == Some("CrashLoopBackOff") && container.restart_count > MAX_CRASH_RESTARTS
    })
}

pub fn is_terminating(pod: &Pod) -> bool {
    pod.metadata.deletion_timestamp.is_some()
}

/// Rolls the node container to the wanted image, every other field of a
/// running pod is left as created
pub struct ImageReconciler {
    image: String,
}

impl ImageReconciler {
    pub fn new(image: String) -> Self {
        Self { image }
    }
}

impl FieldReconciler<Pod> for ImageReconciler {
    fn name(&self) -> &'static str {
        "ImageReconciler"
    }

    fn is_up_to_date(&self, current: &Pod) -> bool {
        current
            .spec
            .as_ref()
            .and_then(|spec| spec.containers.iter().find(|c| c.name == NODE_CONTAINER))
            .is_some_and(|container| container.image.as_deref() == Some(self.image.as_str()))
    }

    fn update(&self, current: &mut Pod) {
        let node = current
            .spec
            .as_mut()
            .and_then(|spec| spec.containers.iter_mut().find(|c| c.name == NODE_CONTAINER));
        if let Some(container) = node {
            container.image = Some(self.image.clone());
        }
    }
}
