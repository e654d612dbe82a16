//! Pod replacement
//!
//! Most of a pod's spec is immutable, so an edit is applied as delete, wait for
//! the name to be released, then create from the new manifest. A
//! [`ReplaceOperation`] records each phase as it happens so a failure can report
//! how far the sequence got and whether the original pod is already gone.

use chrono::{DateTime, Utc};
use kubedeck_core::{Manifest, Resource, ResourceRef};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::error::KubeError;
use crate::gateway::ResourceGateway;

/// Polling of the deleted pod's name until the control plane releases it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleConfig {
    /// Interval between reads
    pub interval: Duration,
    /// Give up once this much time has passed since the delete was accepted
    pub timeout: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Phase of a replace operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReplacePhase {
    Deleting,
    AwaitingSettle,
    Creating,
    Done,
    Failed,
}

impl fmt::Display for ReplacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReplacePhase::Deleting => "deleting",
            ReplacePhase::AwaitingSettle => "awaiting-settle",
            ReplacePhase::Creating => "creating",
            ReplacePhase::Done => "done",
            ReplacePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Step a replace operation failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceStep {
    /// The new manifest was rejected before anything was deleted
    Validate,
    Delete,
    Settle,
    Create,
}

impl fmt::Display for ReplaceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReplaceStep::Validate => "validate",
            ReplaceStep::Delete => "delete",
            ReplaceStep::Settle => "settle",
            ReplaceStep::Create => "create",
        };
        f.write_str(s)
    }
}

/// A phase entered at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub phase: ReplacePhase,
    pub at: DateTime<Utc>,
}

/// In-flight replacement of one pod, dropped when the request completes
#[derive(Debug, Clone)]
pub struct ReplaceOperation {
    target: ResourceRef,
    /// The new pod, already bound to `target`
    target_manifest: Resource,
    phase: ReplacePhase,
    history: Vec<PhaseTransition>,
}

impl ReplaceOperation {
    fn start(target: ResourceRef, target_manifest: Resource) -> Self {
        let mut operation = Self {
            target,
            target_manifest,
            phase: ReplacePhase::Deleting,
            history: Vec::new(),
        };
        operation.record(ReplacePhase::Deleting);
        operation
    }

    pub fn target(&self) -> &ResourceRef {
        &self.target
    }

    pub fn namespace(&self) -> &str {
        self.target.namespace().unwrap_or_default()
    }

    pub fn pod_name(&self) -> &str {
        self.target.name().unwrap_or_default()
    }

    pub fn target_manifest(&self) -> &Resource {
        &self.target_manifest
    }

    pub fn phase(&self) -> ReplacePhase {
        self.phase
    }

    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    fn record(&mut self, phase: ReplacePhase) {
        self.phase = phase;
        self.history.push(PhaseTransition {
            phase,
            at: Utc::now(),
        });
        tracing::info!(
            namespace = self.namespace(),
            pod = self.pod_name(),
            phase = %phase,
            "replace phase"
        );
    }

    fn fail(mut self, step: ReplaceStep, original_deleted: bool, source: KubeError) -> ReplaceError {
        self.record(ReplacePhase::Failed);
        tracing::warn!(
            namespace = self.namespace(),
            pod = self.pod_name(),
            step = %step,
            original_deleted,
            error = %source,
            "replace failed"
        );
        ReplaceError {
            pod_name: self.pod_name().to_string(),
            step,
            original_deleted,
            source,
            history: self.history,
        }
    }
}

/// Result of a successful replacement
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub pod_name: String,
    /// Whether a pod existed and was deleted before the create
    pub previous_existed: bool,
    /// The pod as stored by the control plane
    pub resource: Resource,
    pub history: Vec<PhaseTransition>,
}

/// A replacement that stopped part way
#[derive(Debug, Error)]
#[error("replacing pod '{pod_name}' failed at the {step} step: {source}")]
pub struct ReplaceError {
    pub pod_name: String,
    pub step: ReplaceStep,
    /// Whether the original pod was deleted before the failure
    pub original_deleted: bool,
    #[source]
    pub source: KubeError,
    pub history: Vec<PhaseTransition>,
}

impl ReplaceError {
    /// The create was refused because the old pod still holds the name
    pub fn is_name_reserved(&self) -> bool {
        self.step == ReplaceStep::Create && self.source.is_conflict()
    }

    fn rejected(pod_name: &str, source: KubeError) -> Self {
        Self {
            pod_name: pod_name.to_string(),
            step: ReplaceStep::Validate,
            original_deleted: false,
            source,
            history: Vec::new(),
        }
    }
}

/// Replaces pods through a [`ResourceGateway`]
#[derive(Clone)]
pub struct ReplaceOrchestrator {
    gateway: ResourceGateway,
    settle: SettleConfig,
}

impl ReplaceOrchestrator {
    pub fn new(gateway: ResourceGateway, settle: SettleConfig) -> Self {
        Self { gateway, settle }
    }

    pub fn settle(&self) -> SettleConfig {
        self.settle
    }

    /// Delete the pod, wait for its name to be released and recreate it from `manifest`
    ///
    /// A pod that is already absent is created directly. No step is retried.
    pub async fn replace(
        &self,
        namespace: &str,
        name: &str,
        manifest: Manifest,
    ) -> Result<ReplaceOutcome, ReplaceError> {
        let target =
            ResourceRef::pod(namespace, name).map_err(|e| ReplaceError::rejected(name, e.into()))?;
        let resource = self
            .gateway
            .prepare(&target, manifest)
            .map_err(|e| ReplaceError::rejected(name, e))?;

        let mut operation = ReplaceOperation::start(target.clone(), resource);

        let previous_existed = match self.gateway.delete(&target).await {
            Ok(()) => {
                tracing::info!(target = %target, "original pod deleted, awaiting name release");
                true
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(target = %target, "pod already absent, creating directly");
                false
            }
            Err(e) => return Err(operation.fail(ReplaceStep::Delete, false, e)),
        };

        if previous_existed {
            operation.record(ReplacePhase::AwaitingSettle);
            if let Err(e) = self.await_settle(&target).await {
                return Err(operation.fail(ReplaceStep::Settle, true, e));
            }
        }

        operation.record(ReplacePhase::Creating);
        let manifest = operation.target_manifest().clone();
        let created = match self.gateway.submit(&target, manifest).await {
            Ok(created) => created,
            Err(e) => return Err(operation.fail(ReplaceStep::Create, previous_existed, e)),
        };

        operation.record(ReplacePhase::Done);
        Ok(ReplaceOutcome {
            pod_name: operation.pod_name().to_string(),
            previous_existed,
            resource: created,
            history: operation.history,
        })
    }

    /// Poll until reading the pod reports it gone
    async fn await_settle(&self, target: &ResourceRef) -> Result<(), KubeError> {
        let deadline = Instant::now() + self.settle.timeout;

        loop {
            match self.gateway.get(target).await {
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
                Ok(_) => {}
            }

            if Instant::now() >= deadline {
                return Err(KubeError::SettleTimeout {
                    target: target.to_string(),
                    timeout: self.settle.timeout,
                });
            }

            tokio::time::sleep(self.settle.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Fault, MockClusterApi, MockOperation};
    use kubedeck_core::{ResourceKind, decode};
    use std::sync::Arc;

    const ORIGINAL: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  name: web-1
  namespace: default
spec:
  containers:
    - name: web
      image: nginx:1.26
"#;

    fn manifest(image: &str) -> Manifest {
        let yaml = ORIGINAL.replace("nginx:1.26", image);
        decode(ResourceKind::Pod, yaml.as_bytes()).unwrap()
    }

    fn fast_settle() -> SettleConfig {
        SettleConfig {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(200),
        }
    }

    async fn setup(mock: MockClusterApi) -> (ReplaceOrchestrator, MockClusterApi) {
        let gateway = ResourceGateway::new(Arc::new(mock.clone()));
        let target = ResourceRef::pod("default", "web-1").unwrap();
        gateway.create(&target, manifest("nginx:1.26")).await.unwrap();
        mock.reset_counts();
        (ReplaceOrchestrator::new(gateway, fast_settle()), mock)
    }

    fn image_of(resource: &Resource) -> String {
        match resource {
            Resource::Pod(pod) => pod.spec.as_ref().unwrap().containers[0]
                .image
                .clone()
                .unwrap_or_default(),
            other => panic!("expected a pod, got {:?}", other.kind()),
        }
    }

    fn phases(history: &[PhaseTransition]) -> Vec<ReplacePhase> {
        history.iter().map(|t| t.phase).collect()
    }

    #[test]
    fn test_operation_records_target_manifest() {
        let target = ResourceRef::pod("default", "web-1").unwrap();
        let resource = manifest("nginx:1.27").bind_to(&target).unwrap();
        let operation = ReplaceOperation::start(target, resource);

        assert_eq!(operation.namespace(), "default");
        assert_eq!(operation.pod_name(), "web-1");
        assert_eq!(operation.phase(), ReplacePhase::Deleting);
        assert_eq!(image_of(operation.target_manifest()), "nginx:1.27");
        assert_eq!(phases(operation.history()), vec![ReplacePhase::Deleting]);
    }

    #[test]
    fn test_default_settle() {
        let settle = SettleConfig::default();
        assert_eq!(settle.interval, Duration::from_millis(500));
        assert_eq!(settle.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_replace_swaps_spec() {
        let (orchestrator, mock) = setup(MockClusterApi::new().with_settle_lag(3)).await;

        let outcome = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap();

        assert!(outcome.previous_existed);
        assert_eq!(outcome.pod_name, "web-1");
        assert_eq!(image_of(&outcome.resource), "nginx:1.27");
        assert_eq!(
            phases(&outcome.history),
            vec![
                ReplacePhase::Deleting,
                ReplacePhase::AwaitingSettle,
                ReplacePhase::Creating,
                ReplacePhase::Done
            ]
        );

        let target = ResourceRef::pod("default", "web-1").unwrap();
        let stored = mock.object(&target).unwrap();
        assert_eq!(image_of(&stored), "nginx:1.27");

        let counts = mock.operation_counts();
        assert_eq!(counts.deletes, 1);
        assert_eq!(counts.creates, 1);
        assert!(counts.gets >= 4);
    }

    #[tokio::test]
    async fn test_absent_pod_created_directly() {
        let mock = MockClusterApi::new();
        let gateway = ResourceGateway::new(Arc::new(mock.clone()));
        let orchestrator = ReplaceOrchestrator::new(gateway, fast_settle());

        let outcome = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap();

        assert!(!outcome.previous_existed);
        assert_eq!(
            phases(&outcome.history),
            vec![ReplacePhase::Deleting, ReplacePhase::Creating, ReplacePhase::Done]
        );
        assert_eq!(mock.operation_counts().gets, 0);
        assert_eq!(mock.operation_counts().creates, 1);
    }

    #[tokio::test]
    async fn test_failed_delete_never_creates() {
        let (orchestrator, mock) = setup(MockClusterApi::new()).await;
        mock.fail_on(MockOperation::Delete, Fault::Upstream("connection reset".to_string()));

        let err = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap_err();

        assert_eq!(err.step, ReplaceStep::Delete);
        assert!(!err.original_deleted);
        assert!(matches!(err.source, KubeError::Upstream { .. }));
        assert_eq!(phases(&err.history), vec![ReplacePhase::Deleting, ReplacePhase::Failed]);
        assert_eq!(mock.operation_counts().creates, 0);

        let target = ResourceRef::pod("default", "web-1").unwrap();
        assert_eq!(image_of(&mock.object(&target).unwrap()), "nginx:1.26");
    }

    #[tokio::test]
    async fn test_settle_timeout_fails_without_create() {
        let (orchestrator, mock) = setup(MockClusterApi::new().with_settle_lag(usize::MAX)).await;

        let err = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap_err();

        assert_eq!(err.step, ReplaceStep::Settle);
        assert!(err.original_deleted);
        assert!(matches!(err.source, KubeError::SettleTimeout { .. }));
        assert_eq!(mock.operation_counts().creates, 0);
        assert_eq!(
            phases(&err.history),
            vec![
                ReplacePhase::Deleting,
                ReplacePhase::AwaitingSettle,
                ReplacePhase::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_settle_read_error_fails() {
        let (orchestrator, mock) = setup(MockClusterApi::new().with_settle_lag(3)).await;
        mock.fail_on(MockOperation::Get, Fault::Upstream("timeout".to_string()));

        let err = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap_err();

        assert_eq!(err.step, ReplaceStep::Settle);
        assert!(err.original_deleted);
        assert_eq!(mock.operation_counts().creates, 0);
    }

    #[tokio::test]
    async fn test_create_conflict_is_tagged() {
        let (orchestrator, mock) = setup(MockClusterApi::new()).await;
        mock.fail_on(MockOperation::Create, Fault::AlreadyExists);

        let err = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap_err();

        assert_eq!(err.step, ReplaceStep::Create);
        assert!(err.original_deleted);
        assert!(err.is_name_reserved());
        assert!(err.to_string().contains("create"));
    }

    #[tokio::test]
    async fn test_create_rejection_reports_deleted_original() {
        let (orchestrator, mock) = setup(MockClusterApi::new()).await;
        mock.fail_on(
            MockOperation::Create,
            Fault::Validation("spec.containers[0].image: Required value".to_string()),
        );

        let err = orchestrator
            .replace("default", "web-1", manifest("nginx:1.27"))
            .await
            .unwrap_err();

        assert_eq!(err.step, ReplaceStep::Create);
        assert!(err.original_deleted);
        assert!(!err.is_name_reserved());

        let target = ResourceRef::pod("default", "web-1").unwrap();
        assert!(mock.object(&target).is_none());
    }

    #[tokio::test]
    async fn test_mismatched_manifest_rejected_before_delete() {
        let (orchestrator, mock) = setup(MockClusterApi::new()).await;

        let err = orchestrator
            .replace("default", "web-2", manifest("nginx:1.27"))
            .await
            .unwrap_err();

        assert_eq!(err.step, ReplaceStep::Validate);
        assert!(!err.original_deleted);
        assert!(err.history.is_empty());
        assert_eq!(mock.operation_counts().total(), 0);
    }
}
