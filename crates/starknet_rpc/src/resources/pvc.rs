use k8s_openapi::api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

use super::{data_claim_name, object_meta, scratch_claim_name};
use crate::api::v1alpha1::{StarknetRPC, StorageTemplate};
use crate::converge::FieldReconciler;
use crate::util::Result;

fn claim(rpc: &StarknetRPC, name: String, template: &StorageTemplate) -> Result<PersistentVolumeClaim> {
    Ok(PersistentVolumeClaim {
        metadata: object_meta(rpc, name)?,
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: template.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([("storage".to_string(), template.size.clone())])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Main data volume of the node, also the restore destination
pub fn data_claim(rpc: &StarknetRPC) -> Result<PersistentVolumeClaim> {
    claim(rpc, data_claim_name(rpc), &rpc.spec.storage)
}

/// Download space of the restore job
pub fn scratch_claim(rpc: &StarknetRPC) -> Result<PersistentVolumeClaim> {
    claim(rpc, scratch_claim_name(rpc), &rpc.spec.restore_archive.storage)
}

pub fn is_bound(pvc: &PersistentVolumeClaim) -> bool {
    pvc.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some("Bound")
}

fn requested_size(pvc: &PersistentVolumeClaim) -> Option<&Quantity> {
    pvc.spec
        .as_ref()?
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get("storage")
}

const BINARY_SUFFIXES: [(&str, i32); 6] = [("Ki", 10), ("Mi", 20), ("Gi", 30), ("Ti", 40), ("Pi", 50), ("Ei", 60)];
const DECIMAL_SUFFIXES: [(&str, i32); 9] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Value of a quantity in bytes, e.g. "1Ti", "1024Gi", "1.5G", "1e12"
pub fn quantity_bytes(quantity: &Quantity) -> Option<f64> {
    let text = quantity.0.trim();
    if let Some((suffix, exponent)) = BINARY_SUFFIXES.iter().find(|(s, _)| text.ends_with(s)) {
        let number = text[..text.len() - suffix.len()].parse::<f64>().ok()?;
        return Some(number * 2f64.powi(*exponent));
    }
    if let Some((suffix, exponent)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| text.ends_with(s)) {
        let number = text[..text.len() - suffix.len()].parse::<f64>().ok()?;
        return Some(number * 10f64.powi(*exponent));
    }
    text.parse::<f64>().ok().filter(|bytes| bytes.is_finite())
}

/// Requests growth of a claim when the wanted size exceeds its current
/// request. Claims never shrink, and the storage class must allow volume
/// expansion for growth to take effect.
pub struct StorageSizeReconciler {
    size: Quantity,
}

impl StorageSizeReconciler {
    pub fn new(size: &Quantity) -> Self {
        Self { size: size.clone() }
    }
}

impl FieldReconciler<PersistentVolumeClaim> for StorageSizeReconciler {
    fn name(&self) -> &'static str {
        "StorageSizeReconciler"
    }

    fn is_up_to_date(&self, current: &PersistentVolumeClaim) -> bool {
        let Some(requested) = requested_size(current) else {
            return false;
        };
        match (quantity_bytes(&self.size), quantity_bytes(requested)) {
            (Some(wanted), Some(requested)) => wanted <= requested,
            _ => requested == &self.size,
        }
    }

    fn update(&self, current: &mut PersistentVolumeClaim) {
        current
            .spec
            .get_or_insert_with(Default::default)
            .resources
            .get_or_insert_with(Default::default)
            .requests
            .get_or_insert_with(Default::default)
            .insert("storage".to_string(), self.size.clone());
    }
}
