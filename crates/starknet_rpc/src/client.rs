use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, DeleteParams, Patch, PatchParams, PostParams},
    runtime::events::{Event, Recorder},
    Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use tracing::debug;

/// Any namespaced object the operator reads or writes
pub trait Object:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> Object for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Persisted object storage of the cluster.
///
/// Errors are returned as the API reported them; callers classify them with
/// [`is_already_exists`] and [`is_not_found`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create<K: Object>(&self, object: &K) -> Result<K, kube::Error>;

    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<K, kube::Error>;

    /// Writes the whole object back. Rejected with a conflict when its
    /// `resourceVersion` is stale.
    async fn replace<K: Object>(&self, object: &K) -> Result<K, kube::Error>;

    /// Writes the status block of the object through the status subresource.
    /// Rejected with a conflict when its `resourceVersion` is stale.
    async fn update_status<K: Object>(&self, object: &K) -> Result<K, kube::Error>;

    /// Deletes the object, dependents are garbage collected in the background
    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for<K: Object>(&self, object: &K) -> Api<K> {
        match object.namespace() {
            Some(namespace) => Api::namespaced(self.client.clone(), &namespace),
            None => Api::default_namespaced(self.client.clone()),
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn create<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        self.api_for(object).create(&PostParams::default(), object).await
    }

    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<K, kube::Error> {
        Api::<K>::namespaced(self.client.clone(), namespace).get(name).await
    }

    async fn replace<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        self.api_for(object)
            .replace(&object.name_any(), &PostParams::default(), object)
            .await
    }

    async fn update_status<K: Object>(&self, object: &K) -> Result<K, kube::Error> {
        let status = serde_json::to_value(object)
            .map_err(kube::Error::SerdeError)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);

        // resourceVersion in a merge patch turns it into a compare-and-swap
        let patch = json!({
            "metadata": { "resourceVersion": object.resource_version() },
            "status": status,
        });

        self.api_for(object)
            .patch_status(&object.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
    }

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        Api::<K>::namespaced(self.client.clone(), namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| debug!("Deleted {} '{}/{}'", K::kind(&()), namespace, name))
    }
}

/// Destination of the events published on reconciled objects
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: &Event, reference: &ObjectReference) -> Result<(), kube::Error>;
}

#[async_trait]
impl EventSink for Recorder {
    async fn record(&self, event: &Event, reference: &ObjectReference) -> Result<(), kube::Error> {
        self.publish(event, reference).await
    }
}

pub fn is_already_exists(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists")
}

pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

/// The API server refused the write itself: failed validation or not permitted
pub fn is_rejected(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 422 || response.code == 403)
}

pub fn ignore_not_found(result: Result<(), kube::Error>) -> Result<(), kube::Error> {
    match result {
        Err(e) if is_not_found(&e) => Ok(()),
        other => other,
    }
}
