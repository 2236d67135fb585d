use k8s_openapi::api::core::v1::{ResourceRequirements, SecretKeySelector, Toleration};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::conditions_schema;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageTemplate {
    /// Size of the claim. For the restore scratch space it should be at least
    /// twice the size of the snapshot file.
    pub size: Quantity,
    /// Storage class of the claim, the cluster default is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// The archive snapshot restored into the data volume before the node first starts.
///
/// Snapshot file names and checksums are published by the
/// [snapshot service](https://eqlabs.github.io/pathfinder/database-snapshots).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSnapshot {
    /// Whether the archive restore runs at all. Disabling it is strongly discouraged,
    /// the node would then sync from genesis.
    #[serde(default = "default_restore_enabled")]
    pub enable: bool,
    pub file_name: String,
    pub checksum: String,
    /// Download configuration handed to the restore job. The snapshot
    /// service defaults apply when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync_config: Option<String>,
    /// Image of the restore job, the operator default is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_image: Option<String>,
    /// Scratch space for the download. Deleted once the restore completed.
    pub storage: StorageTemplate,
}

fn default_restore_enabled() -> bool {
    true
}

/// Generate the Kubernetes wrapper struct `StarknetRPC` from our Spec and Status struct
///
/// This provides a hook for generating the CRD yaml (in crdgen)
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "StarknetRPC",
    group = "pathfinder.runelabs.xyz",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "StarknetRPCStatus", shortname = "starknetrpc")]
#[kube(
    printcolumn = r#"{"name":"Network", "type":"string", "jsonPath":".spec.network"}"#,
    printcolumn = r#"{"name":"Restore", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Restore\")].reason"}"#,
    printcolumn = r#"{"name":"Available", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Available\")].reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StarknetRPCSpec {
    /// The network the node connects to and serves
    pub network: String,

    /// Main data volume of the node
    pub storage: StorageTemplate,

    pub restore_archive: ArchiveSnapshot,

    /// Resources dedicated to the node container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Node image, defaults to the latest version tested with the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Secret key holding the layer 1 RPC url used for synchronization
    pub layer1_rpc_secret: SecretKeySelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
}

/// The status object of `StarknetRPC`
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
pub struct StarknetRPCStatus {
    #[serde(default)]
    #[schemars(schema_with = "conditions_schema")]
    pub conditions: Vec<Condition>,
}
