use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use crate::client::{is_already_exists, Object, ObjectStore};
use crate::util::Result;

/// Keeps one field of an existing object in line with the wanted state
pub trait FieldReconciler<K>: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_up_to_date(&self, current: &K) -> bool;

    fn update(&self, current: &mut K);
}

#[derive(Debug, Clone)]
pub struct Convergence<K> {
    /// The object as persisted after this call
    pub object: K,
    pub created: bool,
    pub updated: bool,
}

/// Creates `wanted`, or when it already exists, brings the fields covered by
/// `reconcilers` up to date on the stored object with a single replace.
///
/// Fields not covered by a reconciler are never touched on an existing object,
/// and an object being deleted is not touched at all. Errors from the store
/// are returned as they are.
pub async fn create_or_reconcile<S, K>(
    store: &S,
    wanted: &K,
    reconcilers: &[&dyn FieldReconciler<K>],
) -> Result<Convergence<K>>
where
    S: ObjectStore,
    K: Object,
{
    let kind = K::kind(&());
    match store.create(wanted).await {
        Ok(object) => {
            info!("Created {} '{}'", kind, object.name_any());
            return Ok(Convergence {
                object,
                created: true,
                updated: false,
            });
        }
        Err(e) if is_already_exists(&e) => {}
        Err(e) => return Err(e.into()),
    }

    let namespace = wanted.namespace().unwrap_or_default();
    let mut current: K = store.get(&namespace, &wanted.name_any()).await?;
    if current.meta().deletion_timestamp.is_some() {
        debug!("{} '{}' is being deleted, leaving it as it is", kind, current.name_any());
        return Ok(Convergence {
            object: current,
            created: false,
            updated: false,
        });
    }

    let mut stale = false;
    for reconciler in reconcilers {
        if !reconciler.is_up_to_date(&current) {
            debug!(
                "{} '{}' out of date, applying {}",
                kind,
                current.name_any(),
                reconciler.name()
            );
            reconciler.update(&mut current);
            stale = true;
        }
    }

    if !stale {
        return Ok(Convergence {
            object: current,
            created: false,
            updated: false,
        });
    }

    let object = store.replace(&current).await?;
    info!("Updated {} '{}'", kind, object.name_any());
    Ok(Convergence {
        object,
        created: false,
        updated: true,
    })
}
