//! Synthesizers of the sub-resources owned by a `StarknetRPC`.
//!
//! Every builder here is a pure function of the resource (and operator
//! defaults): names are derived from the resource name so that repeated
//! invocations address the same objects.

pub mod job;
pub mod pod;
pub mod pvc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tokio::time::Duration;

use crate::api::v1alpha1::StarknetRPC;
use crate::util::errors::{Error, ErrorWithRequeue, Result, StdError};

pub const MANAGED_BY: &str = "starknet-operator";

pub fn data_claim_name(rpc: &StarknetRPC) -> String {
    format!("{}-storage", rpc.name_any())
}

pub fn scratch_claim_name(rpc: &StarknetRPC) -> String {
    format!("{}-archive-restore", rpc.name_any())
}

pub fn restore_job_name(rpc: &StarknetRPC) -> String {
    format!("{}-archive-restore-job", rpc.name_any())
}

pub fn node_pod_name(rpc: &StarknetRPC) -> String {
    format!("{}-rpc", rpc.name_any())
}

pub fn labels(rpc: &StarknetRPC) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("rpc.runelabs.xyz/type".to_string(), "starknet".to_string()),
        ("rpc.runelabs.xyz/name".to_string(), rpc.name_any()),
        ("runelabs.xyz/network".to_string(), rpc.spec.network.clone()),
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
    ])
}

fn missing(field: &str) -> Error {
    Error::ErrorWithRequeue(ErrorWithRequeue::new(
        StdError::MetadataMissing(field.to_string()),
        Duration::from_secs(5 * 60),
    ))
}

/// Controller reference making the sub-resource garbage collected with `rpc`
pub fn owner_reference(rpc: &StarknetRPC) -> Result<OwnerReference> {
    Ok(OwnerReference {
        api_version: StarknetRPC::api_version(&()).to_string(),
        kind: StarknetRPC::kind(&()).to_string(),
        name: rpc.name_any(),
        uid: rpc.uid().ok_or_else(|| missing("StarknetRPC uid"))?,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Metadata shared by all sub-resources: name, namespace, labels and owner
pub fn object_meta(rpc: &StarknetRPC, name: String) -> Result<ObjectMeta> {
    Ok(ObjectMeta {
        name: Some(name),
        namespace: Some(rpc.namespace().ok_or_else(|| missing("StarknetRPC namespace"))?),
        labels: Some(labels(rpc)),
        owner_references: Some(vec![owner_reference(rpc)?]),
        ..Default::default()
    })
}
