//! Resource kinds and references
//!
//! A [`ResourceRef`] names what an operation targets. Constructors enforce the
//! scoping rules: namespaced kinds need a namespace, cluster-scoped kinds must not
//! carry one, and every operation except `list` needs a name.

use k8s_openapi::Resource as _;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Kind of object managed through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Node,
    Namespace,
    Deployment,
    Pod,
}

impl ResourceKind {
    /// The `kind` field value used by the control plane
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Node => Node::KIND,
            ResourceKind::Namespace => Namespace::KIND,
            ResourceKind::Deployment => Deployment::KIND,
            ResourceKind::Pod => Pod::KIND,
        }
    }

    /// The `apiVersion` field value used by the control plane
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::Node => Node::API_VERSION,
            ResourceKind::Namespace => Namespace::API_VERSION,
            ResourceKind::Deployment => Deployment::API_VERSION,
            ResourceKind::Pod => Pod::API_VERSION,
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        matches!(self, ResourceKind::Deployment | ResourceKind::Pod)
    }

    /// Whether the gateway exposes `operation` for this kind
    pub fn supports(&self, operation: Operation) -> bool {
        match self {
            ResourceKind::Node | ResourceKind::Namespace => operation == Operation::List,
            ResourceKind::Deployment => matches!(
                operation,
                Operation::List | Operation::Create | Operation::Delete
            ),
            ResourceKind::Pod => true,
        }
    }

    /// Fail with [`CoreError::Unsupported`] unless `operation` is available
    pub fn ensure_supports(&self, operation: Operation) -> Result<()> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(CoreError::Unsupported {
                kind: *self,
                operation,
            })
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations exposed by the resource gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Delete,
    Logs,
    Manifest,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Logs => "logs",
            Operation::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

/// Reference to a collection or a single object of one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    kind: ResourceKind,
    namespace: Option<String>,
    name: Option<String>,
}

impl ResourceRef {
    /// Reference every object of `kind`, scoped to `namespace` for namespaced kinds
    pub fn collection(kind: ResourceKind, namespace: Option<&str>) -> Result<Self> {
        Ok(Self {
            kind,
            namespace: scoped_namespace(kind, namespace)?,
            name: None,
        })
    }

    /// Reference a single named object
    pub fn object(kind: ResourceKind, namespace: Option<&str>, name: &str) -> Result<Self> {
        let name = parameter("name", Some(name))?
            .ok_or(CoreError::MissingParameter { parameter: "name" })?;
        Ok(Self {
            kind,
            namespace: scoped_namespace(kind, namespace)?,
            name: Some(name),
        })
    }

    /// Reference a pod by namespace and name
    pub fn pod(namespace: &str, name: &str) -> Result<Self> {
        Self::object(ResourceKind::Pod, Some(namespace), name)
    }

    /// Reference a deployment by namespace and name
    pub fn deployment(namespace: &str, name: &str) -> Result<Self> {
        Self::object(ResourceKind::Deployment, Some(namespace), name)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name of the referenced object, or [`CoreError::MissingParameter`] for collections
    pub fn require_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or(CoreError::MissingParameter { parameter: "name" })
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) => write!(f, " {}/{}", ns, name),
            (Some(ns), None) => write!(f, " in {}", ns),
            (None, Some(name)) => write!(f, " {}", name),
            (None, None) => Ok(()),
        }
    }
}

/// A blank value counts as absent; surrounding whitespace is rejected, never trimmed
fn parameter(parameter: &'static str, value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) if v.trim() != v => Err(CoreError::InvalidParameter {
            parameter,
            value: v.to_string(),
        }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

fn scoped_namespace(kind: ResourceKind, namespace: Option<&str>) -> Result<Option<String>> {
    let namespace = parameter("namespace", namespace)?;
    match (kind.is_namespaced(), namespace) {
        (true, None) => Err(CoreError::MissingParameter {
            parameter: "namespace",
        }),
        (false, Some(_)) => Err(CoreError::UnexpectedParameter {
            parameter: "namespace",
            kind,
        }),
        (_, namespace) => Ok(namespace),
    }
}
