use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::{data_claim_name, labels, object_meta, restore_job_name, scratch_claim_name};
use crate::api::v1alpha1::StarknetRPC;
use crate::util::config::ImageDefaults;
use crate::util::Result;

const SCRATCH_VOLUME: &str = "snapshot-scratch";
const DATA_VOLUME: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Running,
    Succeeded,
    Failed,
}

/// Success wins over failure, a job without either is still running
pub fn job_outcome(job: &Job) -> JobOutcome {
    let status = job.status.as_ref();
    if status.and_then(|s| s.succeeded).unwrap_or(0) > 0 {
        JobOutcome::Succeeded
    } else if status.and_then(|s| s.failed).unwrap_or(0) > 0 {
        JobOutcome::Failed
    } else {
        JobOutcome::Running
    }
}

pub fn restore_image(rpc: &StarknetRPC, images: &ImageDefaults) -> String {
    rpc.spec
        .restore_archive
        .restore_image
        .clone()
        .unwrap_or_else(|| images.restore.clone())
}

fn env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn claim_volume(name: &str, claim_name: String) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name,
            read_only: None,
        }),
        ..Default::default()
    }
}

/// One-shot job downloading the archive snapshot into scratch space and
/// unpacking it onto the data volume. It is never retried.
pub fn restore_job(rpc: &StarknetRPC, images: &ImageDefaults) -> Result<Job> {
    let archive = &rpc.spec.restore_archive;

    let mut env_vars = vec![
        env("PATHFINDER_NETWORK", &rpc.spec.network),
        env("PATHFINDER_FILE_NAME", &archive.file_name),
        env("PATHFINDER_CHECKSUM", &archive.checksum),
    ];
    if let Some(rsync_config) = &archive.rsync_config {
        env_vars.push(env("PATHFINDER_DOWNLOAD_URL", rsync_config));
    }

    Ok(Job {
        metadata: object_meta(rpc, restore_job_name(rpc))?,
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(rpc)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![Container {
                        name: "archive-downloader".to_string(),
                        image: Some(restore_image(rpc, images)),
                        env: Some(env_vars),
                        volume_mounts: Some(vec![
                            VolumeMount {
                                name: SCRATCH_VOLUME.to_string(),
                                mount_path: "/scratch".to_string(),
                                ..Default::default()
                            },
                            VolumeMount {
                                name: DATA_VOLUME.to_string(),
                                mount_path: "/data".to_string(),
                                ..Default::default()
                            },
                        ]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![
                        claim_volume(DATA_VOLUME, data_claim_name(rpc)),
                        claim_volume(SCRATCH_VOLUME, scratch_claim_name(rpc)),
                    ]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}
