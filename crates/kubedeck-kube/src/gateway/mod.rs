//! Resource gateway
//!
//! [`ClusterApi`] is the seam to the control plane:
//! - **KubeClusterApi**: talks to a real cluster through `kube::Api`
//! - **MockClusterApi**: keeps objects in memory, for tests
//!
//! [`ResourceGateway`] sits on top and enforces what each kind supports, binds
//! manifests to their target and projects list results into summaries.

mod client;
mod mock;

pub use client::KubeClusterApi;
pub use mock::{Fault, MockClusterApi, MockOperation, OperationCounts};

use async_trait::async_trait;
use kubedeck_core::{
    Manifest, Operation, Resource, ResourceKind, ResourceRef, ResourceSummary, encode,
};
use std::sync::Arc;

use crate::error::Result;

/// Control-plane operations used by the gateway
///
/// Implementations must be Send + Sync for use across async tasks. Errors are
/// classified into the [`KubeError`](crate::KubeError) taxonomy by the implementation.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List every object in the scope of a collection reference
    async fn list(&self, scope: &ResourceRef) -> Result<Vec<Resource>>;

    /// Get a single object
    async fn get(&self, target: &ResourceRef) -> Result<Resource>;

    /// Create an object, returning it as stored
    async fn create(&self, target: &ResourceRef, resource: Resource) -> Result<Resource>;

    /// Delete an object; returns once the deletion is accepted
    async fn delete(&self, target: &ResourceRef) -> Result<()>;

    /// Fetch the logs of a pod
    async fn logs(&self, target: &ResourceRef) -> Result<String>;
}

/// Kind-aware operations over a [`ClusterApi`]
#[derive(Clone)]
pub struct ResourceGateway {
    api: Arc<dyn ClusterApi>,
}

impl ResourceGateway {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Summaries of every object of `kind`, scoped to `namespace` for namespaced kinds
    pub async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<ResourceSummary>> {
        kind.ensure_supports(Operation::List)?;
        let scope = ResourceRef::collection(kind, namespace)?;
        let items = self.api.list(&scope).await?;
        tracing::debug!(scope = %scope, count = items.len(), "listed resources");
        Ok(items.iter().map(Resource::summary).collect())
    }

    pub async fn get(&self, target: &ResourceRef) -> Result<Resource> {
        target.kind().ensure_supports(Operation::Get)?;
        target.require_name()?;
        self.api.get(target).await
    }

    /// Bind `manifest` to `target` without submitting it
    ///
    /// Fails on anything that would make [`create`](Self::create) reject the
    /// manifest before reaching the control plane.
    pub fn prepare(&self, target: &ResourceRef, manifest: Manifest) -> Result<Resource> {
        target.kind().ensure_supports(Operation::Create)?;
        Ok(manifest.bind_to(target)?)
    }

    pub async fn create(&self, target: &ResourceRef, manifest: Manifest) -> Result<Resource> {
        let resource = self.prepare(target, manifest)?;
        self.submit(target, resource).await
    }

    /// Create an object already bound with [`prepare`](Self::prepare)
    pub async fn submit(&self, target: &ResourceRef, resource: Resource) -> Result<Resource> {
        let created = self.api.create(target, resource).await?;
        tracing::info!(target = %target, "created resource");
        Ok(created)
    }

    pub async fn delete(&self, target: &ResourceRef) -> Result<()> {
        target.kind().ensure_supports(Operation::Delete)?;
        target.require_name()?;
        self.api.delete(target).await?;
        tracing::info!(target = %target, "deleted resource");
        Ok(())
    }

    pub async fn logs(&self, target: &ResourceRef) -> Result<String> {
        target.kind().ensure_supports(Operation::Logs)?;
        target.require_name()?;
        self.api.logs(target).await
    }

    /// The live object encoded as YAML
    pub async fn manifest(&self, target: &ResourceRef) -> Result<String> {
        target.kind().ensure_supports(Operation::Manifest)?;
        let resource = self.get(target).await?;
        Ok(encode(&resource)?)
    }
}
