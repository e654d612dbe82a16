//! kubedeck Core - Core types shared by the kubedeck gateway
//!
//! This crate provides the foundational types used throughout kubedeck:
//! - `ResourceKind` / `ResourceRef`: which objects an operation targets
//! - `Resource`: a live, kind-typed Kubernetes object
//! - `ResourceSummary`: reduced projections used by list responses
//! - `Manifest`: a strictly decoded, user-authored resource document

pub mod codec;
pub mod error;
pub mod kind;
pub mod resource;

pub use codec::{Manifest, decode, encode};
pub use error::{CoreError, Result};
pub use kind::{Operation, ResourceKind, ResourceRef};
pub use resource::{NamedSummary, NodeSummary, PodSummary, Resource, ResourceSummary};
