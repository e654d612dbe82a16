//! Mock cluster for testing
//!
//! Objects are kept in memory, useful for unit tests without requiring a
//! Kubernetes cluster. A deleted object can be made to linger for a number of
//! reads, the way a terminating pod keeps its name reserved on a real cluster.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PodStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kubedeck_core::{Resource, ResourceKind, ResourceRef};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use super::ClusterApi;
use crate::error::{KubeError, Result};

/// Storage key: kind, namespace, name
type Key = (ResourceKind, Option<String>, String);

/// Operations that can be counted and failed on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    List,
    Get,
    Create,
    Delete,
    Logs,
}

/// Error returned by an injected failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    NotFound,
    AlreadyExists,
    Validation(String),
    Upstream(String),
}

impl Fault {
    fn to_error(&self, target: &ResourceRef) -> KubeError {
        match self {
            Fault::NotFound => KubeError::NotFound {
                target: target.to_string(),
            },
            Fault::AlreadyExists => KubeError::AlreadyExists {
                target: target.to_string(),
            },
            Fault::Validation(message) => KubeError::Validation {
                message: message.clone(),
            },
            Fault::Upstream(message) => KubeError::Upstream {
                message: message.clone(),
                code: Some(500),
            },
        }
    }
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub lists: usize,
    pub gets: usize,
    pub creates: usize,
    pub deletes: usize,
    pub logs: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.lists + self.gets + self.creates + self.deletes + self.logs
    }

    fn bump(&mut self, operation: MockOperation) {
        match operation {
            MockOperation::List => self.lists += 1,
            MockOperation::Get => self.gets += 1,
            MockOperation::Create => self.creates += 1,
            MockOperation::Delete => self.deletes += 1,
            MockOperation::Logs => self.logs += 1,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    objects: BTreeMap<Key, Resource>,
    /// Deleted objects still holding their name, with the reads left before release
    terminating: HashMap<Key, usize>,
    logs: HashMap<Key, String>,
    faults: HashMap<MockOperation, Fault>,
    settle_reads: usize,
    counts: OperationCounts,
    next_uid: u64,
}

/// In-memory cluster for testing
#[derive(Clone, Default)]
pub struct MockClusterApi {
    state: Arc<RwLock<MockState>>,
}

impl MockClusterApi {
    /// Create a new empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated objects
    pub fn with_resources(resources: Vec<Resource>) -> Self {
        let mock = Self::new();
        {
            let mut state = mock.write();
            for resource in resources {
                let key = key_of_resource(&resource);
                state.objects.insert(key, resource);
            }
        }
        mock
    }

    /// Keep deleted objects visible to `reads` subsequent gets
    pub fn with_settle_lag(self, reads: usize) -> Self {
        self.write().settle_reads = reads;
        self
    }

    /// Fail every call of `operation` with `fault` until cleared
    pub fn fail_on(&self, operation: MockOperation, fault: Fault) {
        self.write().faults.insert(operation, fault);
    }

    pub fn clear_faults(&self) {
        self.write().faults.clear();
    }

    /// Set the log text returned for a pod
    pub fn set_logs(&self, target: &ResourceRef, logs: &str) {
        self.write().logs.insert(key_of(target), logs.to_string());
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.read().counts.clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        self.write().counts = OperationCounts::default();
    }

    /// The stored object, ignoring terminating ones
    pub fn object(&self, target: &ResourceRef) -> Option<Resource> {
        let key = key_of(target);
        let state = self.read();
        if state.terminating.contains_key(&key) {
            return None;
        }
        state.objects.get(&key).cloned()
    }

    /// Count stored objects, including terminating ones
    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and return the injected fault, if any
    fn enter(&self, operation: MockOperation, target: &ResourceRef) -> Result<()> {
        let mut state = self.write();
        state.counts.bump(operation);
        match state.faults.get(&operation) {
            Some(fault) => Err(fault.to_error(target)),
            None => Ok(()),
        }
    }
}

fn key_of(target: &ResourceRef) -> Key {
    (
        target.kind(),
        target.namespace().map(str::to_string),
        target.name().unwrap_or_default().to_string(),
    )
}

fn key_of_resource(resource: &Resource) -> Key {
    (
        resource.kind(),
        resource.namespace().map(str::to_string),
        resource.name().unwrap_or_default().to_string(),
    )
}

fn not_found(target: &ResourceRef) -> KubeError {
    KubeError::NotFound {
        target: target.to_string(),
    }
}

impl MockState {
    /// Drop a terminating object once its lingering reads are used up
    fn release_if_settled(&mut self, key: &Key) {
        if self.terminating.get(key) == Some(&0) {
            self.terminating.remove(key);
            self.objects.remove(key);
            self.logs.remove(key);
        }
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn list(&self, scope: &ResourceRef) -> Result<Vec<Resource>> {
        self.enter(MockOperation::List, scope)?;

        let state = self.read();
        Ok(state
            .objects
            .iter()
            .filter(|((kind, namespace, _), _)| {
                *kind == scope.kind() && namespace.as_deref() == scope.namespace()
            })
            .filter(|(key, _)| !state.terminating.contains_key(*key))
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    async fn get(&self, target: &ResourceRef) -> Result<Resource> {
        self.enter(MockOperation::Get, target)?;

        let key = key_of(target);
        let mut state = self.write();
        let resource = state.objects.get(&key).cloned().ok_or_else(|| not_found(target))?;

        if let Some(remaining) = state.terminating.get_mut(&key) {
            if *remaining == 0 {
                state.release_if_settled(&key);
                return Err(not_found(target));
            }
            *remaining -= 1;
        }

        Ok(resource)
    }

    async fn create(&self, target: &ResourceRef, mut resource: Resource) -> Result<Resource> {
        self.enter(MockOperation::Create, target)?;

        let key = key_of(target);
        let mut state = self.write();
        state.release_if_settled(&key);
        if state.objects.contains_key(&key) {
            return Err(KubeError::AlreadyExists {
                target: target.to_string(),
            });
        }

        state.next_uid += 1;
        let uid = state.next_uid;
        let metadata = resource.metadata_mut();
        metadata.uid = Some(format!("mock-{}", uid));
        metadata.resource_version = Some(uid.to_string());
        metadata.creation_timestamp = Some(Time(chrono::Utc::now()));
        if let Resource::Pod(pod) = &mut resource {
            pod.status = Some(PodStatus {
                phase: Some("Pending".to_string()),
                ..Default::default()
            });
        }

        state.objects.insert(key, resource.clone());
        Ok(resource)
    }

    async fn delete(&self, target: &ResourceRef) -> Result<()> {
        self.enter(MockOperation::Delete, target)?;

        let key = key_of(target);
        let mut state = self.write();
        if !state.objects.contains_key(&key) || state.terminating.contains_key(&key) {
            return Err(not_found(target));
        }

        let lag = state.settle_reads;
        if lag == 0 {
            state.objects.remove(&key);
            state.logs.remove(&key);
        } else {
            if let Some(object) = state.objects.get_mut(&key) {
                object.metadata_mut().deletion_timestamp = Some(Time(chrono::Utc::now()));
            }
            state.terminating.insert(key, lag);
        }
        Ok(())
    }

    async fn logs(&self, target: &ResourceRef) -> Result<String> {
        self.enter(MockOperation::Logs, target)?;

        let key = key_of(target);
        let state = self.read();
        if !state.objects.contains_key(&key) {
            return Err(not_found(target));
        }
        Ok(state.logs.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(namespace: &str, name: &str) -> Resource {
        Resource::Pod(Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_settle_lag_reserves_name() {
        let mock = MockClusterApi::with_resources(vec![pod("default", "web-1")]).with_settle_lag(2);
        let target = ResourceRef::pod("default", "web-1").unwrap();

        mock.delete(&target).await.unwrap();
        assert!(mock.list(&ResourceRef::collection(ResourceKind::Pod, Some("default")).unwrap())
            .await
            .unwrap()
            .is_empty());

        let lingering = mock.get(&target).await.unwrap();
        assert!(lingering.metadata().deletion_timestamp.is_some());
        assert!(mock.create(&target, pod("default", "web-1")).await.unwrap_err().is_conflict());
        assert!(mock.get(&target).await.is_ok());
        assert!(mock.get(&target).await.unwrap_err().is_not_found());

        mock.create(&target, pod("default", "web-1")).await.unwrap();
        assert_eq!(mock.object_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_of_terminating_is_not_found() {
        let mock = MockClusterApi::with_resources(vec![pod("default", "web-1")]).with_settle_lag(5);
        let target = ResourceRef::pod("default", "web-1").unwrap();

        mock.delete(&target).await.unwrap();
        assert!(mock.delete(&target).await.unwrap_err().is_not_found());
        assert!(mock.object(&target).is_none());
    }

    #[tokio::test]
    async fn test_fault_injection_and_counts() {
        let mock = MockClusterApi::new();
        let target = ResourceRef::pod("default", "web-1").unwrap();

        mock.fail_on(MockOperation::Create, Fault::Validation("bad image".to_string()));
        let err = mock.create(&target, pod("default", "web-1")).await.unwrap_err();
        assert!(matches!(err, KubeError::Validation { .. }));
        assert_eq!(mock.object_count(), 0);

        mock.clear_faults();
        mock.create(&target, pod("default", "web-1")).await.unwrap();

        let counts = mock.operation_counts();
        assert_eq!(counts.creates, 2);
        assert_eq!(counts.total(), 2);

        mock.reset_counts();
        assert_eq!(mock.operation_counts(), OperationCounts::default());
    }

    #[tokio::test]
    async fn test_create_populates_server_fields() {
        let mock = MockClusterApi::new();
        let target = ResourceRef::pod("default", "web-1").unwrap();
        let created = mock.create(&target, pod("default", "web-1")).await.unwrap();

        assert_eq!(created.metadata().uid.as_deref(), Some("mock-1"));
        assert_eq!(created.summary().name(), "web-1");
        let Resource::Pod(pod) = created else {
            panic!("expected a pod");
        };
        assert_eq!(pod.status.unwrap().phase.as_deref(), Some("Pending"));
    }
}
