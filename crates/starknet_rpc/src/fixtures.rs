//! Test doubles of the cluster: an in-memory object store, an event log, a
//! scripted probe and a client answering from a mocked API server

use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::{ObjectReference, Pod, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::client::Body;
use kube::core::ObjectMeta;
use kube::core::ErrorResponse;
use kube::runtime::events::Event;
use kube::{Client, ResourceExt};
use tower_test::mock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::v1alpha1::{ArchiveSnapshot, StarknetRPC, StarknetRPCSpec, StorageTemplate};
use crate::client::{EventSink, Object, ObjectStore};
use crate::probe::NodeProbe;
use crate::util::{Result, StdError};

pub const NAMESPACE: &str = "starknet";

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} (test)"),
        reason: reason.to_string(),
        code,
    })
}

pub fn starknet_rpc(name: &str) -> StarknetRPC {
    let mut rpc = StarknetRPC::new(
        name,
        StarknetRPCSpec {
            network: "mainnet".to_string(),
            storage: StorageTemplate {
                size: Quantity("250Gi".to_string()),
                storage_class: Some("standard-rwo".to_string()),
            },
            restore_archive: ArchiveSnapshot {
                enable: true,
                file_name: "mainnet_0.14.0_1000.sqlite.zst".to_string(),
                checksum: "9fb0c2b1".to_string(),
                storage: StorageTemplate {
                    size: Quantity("500Gi".to_string()),
                    storage_class: None,
                },
                ..Default::default()
            },
            layer1_rpc_secret: SecretKeySelector {
                name: "l1-rpc".to_string(),
                key: "url".to_string(),
                optional: None,
            },
            ..Default::default()
        },
    );
    rpc.metadata = ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        uid: Some(format!("{name}-uid")),
        generation: Some(1),
        ..Default::default()
    };
    rpc
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Replace,
    UpdateStatus,
    Delete,
}

/// One write the code under test issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

type Key = (String, String, String);

fn key_of<K: Object>(namespace: &str, name: &str) -> Key {
    (K::kind(&()).to_string(), namespace.to_string(), name.to_string())
}

/// Object store keeping serialized objects in memory.
///
/// Assigns uids and resource versions, rejects writes carrying a stale
/// `resourceVersion`, and records every write issued through [`ObjectStore`].
/// [`MemoryStore::seed`] and [`MemoryStore::modify`] stand in for other actors
/// of the cluster and are not recorded.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<Key, Value>>,
    mutations: Mutex<Vec<Mutation>>,
    failures: Mutex<Vec<(Verb, String, u16)>>,
    version: AtomicU64,
}

impl MemoryStore {
    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn record(&self, verb: Verb, kind: &str, name: &str) {
        self.mutations.lock().unwrap().push(Mutation {
            verb,
            kind: kind.to_string(),
            name: name.to_string(),
        });
    }

    fn injected_failure<K: Object>(&self, verb: Verb) -> Option<kube::Error> {
        let mut failures = self.failures.lock().unwrap();
        let index = failures
            .iter()
            .position(|(v, kind, _)| *v == verb && kind.as_str() == K::kind(&()))?;
        let (_, _, code) = failures.remove(index);
        Some(api_error(code, "InjectedFailure"))
    }

    fn store<K: Object>(&self, mut object: K) -> K {
        let meta = object.meta_mut();
        meta.namespace.get_or_insert_with(|| NAMESPACE.to_string());
        meta.uid.get_or_insert_with(|| format!("uid-{}", self.version.load(Ordering::SeqCst)));
        meta.resource_version = Some(self.next_version());

        let key = key_of::<K>(&object.namespace().unwrap_or_default(), &object.name_any());
        let value = serde_json::to_value(&object).unwrap();
        self.objects.lock().unwrap().insert(key, value);
        object
    }

    fn current<K: Object>(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&key_of::<K>(namespace, name))
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    fn check_version<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        let namespace = object.namespace().unwrap_or_else(|| NAMESPACE.to_string());
        let current: K = self
            .current(&namespace, &object.name_any())
            .ok_or_else(|| api_error(404, "NotFound"))?;
        match object.resource_version() {
            Some(version) if Some(&version) != current.resource_version().as_ref() => {
                Err(api_error(409, "Conflict"))
            }
            _ => Ok(current),
        }
    }

    /// Puts an object into the store as if created by someone else
    pub fn seed<K: Object>(&self, object: K) -> K {
        self.store(object)
    }

    /// Changes a stored object as another actor would, e.g. binding a claim
    pub fn modify<K: Object>(&self, name: &str, change: impl FnOnce(&mut K)) {
        let mut object: K = self.current(NAMESPACE, name).unwrap();
        change(&mut object);
        self.store(object);
    }

    pub fn fetch<K: Object>(&self, name: &str) -> Option<K> {
        self.current(NAMESPACE, name)
    }

    /// The next `verb` on an object of `K` fails with the given HTTP code
    pub fn fail_next<K: Object>(&self, verb: Verb, code: u16) {
        self.failures
            .lock()
            .unwrap()
            .push((verb, K::kind(&()).to_string(), code));
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn clear_mutations(&self) {
        self.mutations.lock().unwrap().clear();
    }

    pub fn count(&self, verb: Verb, kind: &str) -> usize {
        self.mutations()
            .iter()
            .filter(|m| m.verb == verb && m.kind == kind)
            .count()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        if let Some(e) = self.injected_failure::<K>(Verb::Create) {
            return Err(e);
        }
        let namespace = object.namespace().unwrap_or_else(|| NAMESPACE.to_string());
        if self.current::<K>(&namespace, &object.name_any()).is_some() {
            return Err(api_error(409, "AlreadyExists"));
        }
        let mut object = object.clone();
        object.meta_mut().resource_version = None;
        self.record(Verb::Create, &K::kind(&()), &object.name_any());
        Ok(self.store(object))
    }

    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<K, kube::Error> {
        self.current(namespace, name)
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    async fn replace<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        if let Some(e) = self.injected_failure::<K>(Verb::Replace) {
            return Err(e);
        }
        self.check_version(object)?;
        self.record(Verb::Replace, &K::kind(&()), &object.name_any());
        Ok(self.store(object.clone()))
    }

    async fn update_status<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        if let Some(e) = self.injected_failure::<K>(Verb::UpdateStatus) {
            return Err(e);
        }
        let current = self.check_version(object)?;
        let status = serde_json::to_value(object).unwrap().get("status").cloned();

        let mut value = serde_json::to_value(&current).unwrap();
        match status {
            Some(status) => value["status"] = status,
            None => {
                value.as_object_mut().unwrap().remove("status");
            }
        }
        self.record(Verb::UpdateStatus, &K::kind(&()), &object.name_any());
        Ok(self.store(serde_json::from_value::<K>(value).unwrap()))
    }

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        if let Some(e) = self.injected_failure::<K>(Verb::Delete) {
            return Err(e);
        }
        self.objects
            .lock()
            .unwrap()
            .remove(&key_of::<K>(namespace, name))
            .ok_or_else(|| api_error(404, "NotFound"))?;
        self.record(Verb::Delete, &K::kind(&()), name);
        Ok(())
    }
}

pub type ApiServer = mock::Handle<Request<Body>, Response<Body>>;

/// Client whose requests are answered through the returned handle
pub fn mock_client() -> (Client, ApiServer) {
    let (service, handle) = mock::pair::<Request<Body>, Response<Body>>();
    (Client::new(service, NAMESPACE), handle)
}

/// Reasons of the published events, in order
#[derive(Default)]
pub struct EventLog {
    reasons: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap().clone()
    }

    pub fn count(&self, reason: &str) -> usize {
        self.reasons().iter().filter(|r| r.as_str() == reason).count()
    }
}

#[async_trait]
impl EventSink for EventLog {
    async fn record(&self, event: &Event, _reference: &ObjectReference) -> Result<(), kube::Error> {
        self.reasons.lock().unwrap().push(event.reason.clone());
        Ok(())
    }
}

/// Probe answering from two switches; an unset switch answers with an error
#[derive(Default)]
pub struct ScriptedProbe {
    ready: AtomicBool,
    synced: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn set(&self, ready: bool, synced: bool) {
        self.ready.store(ready, Ordering::SeqCst);
        self.synced.store(synced, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeProbe for ScriptedProbe {
    async fn is_ready(&self, pod: &Pod) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.ready.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(StdError::ProbeError(format!("{}: connection refused", pod.name_any())).into())
        }
    }

    async fn is_synced(&self, pod: &Pod) -> Result<bool> {
        if self.synced.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(StdError::ProbeError(format!("{}: not synced", pod.name_any())).into())
        }
    }
}
