//! kubedeck Kube - Kubernetes integration for kubedeck
//!
//! This crate provides:
//! - **Client Provider**: Resolve the kubeconfig and build a client for the active context
//! - **Resource Gateway**: List, create, delete, logs and manifests over a `ClusterApi` seam
//! - **Mock Cluster**: In-memory `ClusterApi` with fault injection for tests
//! - **Replace Orchestrator**: Delete, wait for the name to be released, recreate

pub mod error;
pub mod gateway;
pub mod provider;
pub mod replace;

pub use error::{KubeError, Result};
pub use gateway::{
    ClusterApi, Fault, KubeClusterApi, MockClusterApi, MockOperation, OperationCounts,
    ResourceGateway,
};
pub use provider::{ClientProvider, ClusterHandle, kubeconfig_path, resolve};
pub use replace::{
    PhaseTransition, ReplaceError, ReplaceOperation, ReplaceOrchestrator, ReplaceOutcome,
    ReplacePhase, ReplaceStep, SettleConfig,
};
