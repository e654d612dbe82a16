//! Live resources and their list projections

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::kind::ResourceKind;

/// Node status reported when a `Ready` condition is present
pub const NODE_READY: &str = "Ready";

/// Node status reported when no `Ready` condition is present
pub const NODE_UNREADY: &str = "Unready";

/// Pod status reported when the phase is empty
pub const POD_PHASE_UNKNOWN: &str = "Unknown";

/// A kind-typed object as stored by the control plane
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    Node(Node),
    Namespace(Namespace),
    Deployment(Deployment),
    Pod(Pod),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Node(_) => ResourceKind::Node,
            Resource::Namespace(_) => ResourceKind::Namespace,
            Resource::Deployment(_) => ResourceKind::Deployment,
            Resource::Pod(_) => ResourceKind::Pod,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Resource::Node(r) => &r.metadata,
            Resource::Namespace(r) => &r.metadata,
            Resource::Deployment(r) => &r.metadata,
            Resource::Pod(r) => &r.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Resource::Node(r) => &mut r.metadata,
            Resource::Namespace(r) => &mut r.metadata,
            Resource::Deployment(r) => &mut r.metadata,
            Resource::Pod(r) => &mut r.metadata,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Drop every field the control plane populates on its own
    ///
    /// What remains are the user-settable fields, so the result can be submitted
    /// to `create` even when it was read back from the cluster.
    pub fn strip_server_fields(&mut self) {
        let metadata = self.metadata_mut();
        metadata.uid = None;
        metadata.resource_version = None;
        metadata.creation_timestamp = None;
        metadata.deletion_timestamp = None;
        metadata.deletion_grace_period_seconds = None;
        metadata.generation = None;
        metadata.managed_fields = None;
        metadata.self_link = None;

        match self {
            Resource::Node(r) => r.status = None,
            Resource::Namespace(r) => r.status = None,
            Resource::Deployment(r) => r.status = None,
            Resource::Pod(r) => r.status = None,
        }
    }

    /// Reduced projection used by list responses
    pub fn summary(&self) -> ResourceSummary {
        let name = self.name().unwrap_or_default().to_string();
        match self {
            Resource::Node(node) => ResourceSummary::Node(NodeSummary {
                name,
                cpu: node_capacity(node, "cpu"),
                memory: node_capacity(node, "memory"),
                status: node_status(node).to_string(),
            }),
            Resource::Pod(pod) => ResourceSummary::Pod(PodSummary {
                name,
                status: pod_status(pod),
            }),
            Resource::Namespace(_) | Resource::Deployment(_) => {
                ResourceSummary::Named(NamedSummary { name })
            }
        }
    }
}

impl From<Node> for Resource {
    fn from(value: Node) -> Self {
        Resource::Node(value)
    }
}

impl From<Namespace> for Resource {
    fn from(value: Namespace) -> Self {
        Resource::Namespace(value)
    }
}

impl From<Deployment> for Resource {
    fn from(value: Deployment) -> Self {
        Resource::Deployment(value)
    }
}

impl From<Pod> for Resource {
    fn from(value: Pod) -> Self {
        Resource::Pod(value)
    }
}

/// List projection of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceSummary {
    Node(NodeSummary),
    Pod(PodSummary),
    Named(NamedSummary),
}

impl ResourceSummary {
    pub fn name(&self) -> &str {
        match self {
            ResourceSummary::Node(s) => &s.name,
            ResourceSummary::Pod(s) => &s.name,
            ResourceSummary::Named(s) => &s.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub name: String,
    pub cpu: String,
    pub memory: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSummary {
    pub name: String,
}

/// `Ready` when the first condition of type `Ready` exists, `Unready` otherwise
///
/// Only the presence of the condition is checked, not its status value.
pub fn node_status(node: &Node) -> &'static str {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == NODE_READY))
        .is_some();

    if ready { NODE_READY } else { NODE_UNREADY }
}

/// Pod phase, or `Unknown` when the control plane has not reported one
pub fn pod_status(pod: &Pod) -> String {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .filter(|phase| !phase.is_empty())
        .unwrap_or(POD_PHASE_UNKNOWN)
        .to_string()
}

fn node_capacity(node: &Node, resource: &str) -> String {
    node.status
        .as_ref()
        .and_then(|s| s.capacity.as_ref())
        .and_then(|capacity| capacity.get(resource))
        .map(|quantity| quantity.0.clone())
        .unwrap_or_default()
}
