//! Strict manifest codec
//!
//! Manifests are decoded into the typed `k8s-openapi` model. The typed model
//! silently ignores fields it does not know, so after decoding the object is
//! serialized again and every key of the input must still be present. A key that
//! disappeared is reported as an unknown field instead of being dropped.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::kind::{ResourceKind, ResourceRef};
use crate::resource::Resource;

/// A user-authored resource document with a guaranteed `metadata.name`
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    resource: Resource,
}

impl Manifest {
    /// Wrap a resource, requiring a non-empty `metadata.name`
    pub fn new(resource: Resource) -> Result<Self> {
        match resource.name() {
            Some(name) if !name.trim().is_empty() => Ok(Self { resource }),
            _ => Err(CoreError::MissingField {
                field: "metadata.name".to_string(),
            }),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    pub fn name(&self) -> &str {
        self.resource.name().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.resource.namespace()
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn into_resource(self) -> Resource {
        self.resource
    }

    /// Prepare the manifest for submission against `target`
    ///
    /// The kind, name and (when set) namespace must agree with the reference. A
    /// missing namespace is filled in, and server-populated fields are stripped.
    pub fn bind_to(mut self, target: &ResourceRef) -> Result<Resource> {
        if self.kind() != target.kind() {
            return Err(CoreError::KindMismatch {
                expected: target.kind(),
                found: self.kind().to_string(),
            });
        }

        let name = target.require_name()?;
        if self.name() != name {
            return Err(CoreError::FieldMismatch {
                field: "metadata.name",
                expected: name.to_string(),
                found: self.name().to_string(),
            });
        }

        if let Some(namespace) = target.namespace() {
            let metadata = self.resource.metadata_mut();
            match metadata.namespace.as_deref() {
                Some(found) if !found.is_empty() && found != namespace => {
                    return Err(CoreError::FieldMismatch {
                        field: "metadata.namespace",
                        expected: namespace.to_string(),
                        found: found.to_string(),
                    });
                }
                _ => metadata.namespace = Some(namespace.to_string()),
            }
        }

        self.resource.strip_server_fields();
        Ok(self.resource)
    }
}

/// Decode a YAML or JSON manifest of the expected `kind`
pub fn decode(kind: ResourceKind, bytes: &[u8]) -> Result<Manifest> {
    let mut value: Value = serde_yaml::from_slice(bytes)?;
    let object = value.as_object_mut().ok_or(CoreError::NotAMapping)?;
    check_type_meta(kind, object)?;
    normalize_quantities(kind, &mut value);

    let resource = match kind {
        ResourceKind::Node => Resource::Node(typed(kind, &value)?),
        ResourceKind::Namespace => Resource::Namespace(typed(kind, &value)?),
        ResourceKind::Deployment => Resource::Deployment(typed(kind, &value)?),
        ResourceKind::Pod => Resource::Pod(typed(kind, &value)?),
    };

    let known = serde_json::to_value(&resource).map_err(|e| CoreError::Encode(e.to_string()))?;
    if let Some(path) = find_unknown_field(&value, &known, "") {
        return Err(CoreError::UnknownField { kind, path });
    }

    Manifest::new(resource)
}

/// Encode a resource as YAML
pub fn encode(resource: &Resource) -> Result<String> {
    serde_yaml::to_string(resource).map_err(|e| CoreError::Encode(e.to_string()))
}

/// Verify `kind`/`apiVersion` and fill them in when omitted
fn check_type_meta(kind: ResourceKind, object: &mut Map<String, Value>) -> Result<()> {
    match object.get("kind") {
        None | Some(Value::Null) => {
            object.insert("kind".to_string(), Value::from(kind.as_str()));
        }
        Some(Value::String(found)) if found == kind.as_str() => {}
        Some(found) => {
            return Err(CoreError::KindMismatch {
                expected: kind,
                found: display_scalar(found),
            });
        }
    }

    match object.get("apiVersion") {
        None | Some(Value::Null) => {
            object.insert("apiVersion".to_string(), Value::from(kind.api_version()));
        }
        Some(Value::String(found)) if found == kind.api_version() => {}
        Some(found) => {
            return Err(CoreError::ApiVersionMismatch {
                kind,
                expected: kind.api_version(),
                found: display_scalar(found),
            });
        }
    }

    Ok(())
}

/// Stringify bare numbers where the model expects a resource quantity
///
/// YAML authors write `cpu: 1` or `cpu: 0.5`, but `Quantity` only deserializes
/// from a string.
fn normalize_quantities(kind: ResourceKind, value: &mut Value) {
    match kind {
        ResourceKind::Pod => {
            if let Some(spec) = value.pointer_mut("/spec") {
                pod_spec_quantities(spec);
            }
        }
        ResourceKind::Deployment => {
            if let Some(spec) = value.pointer_mut("/spec/template/spec") {
                pod_spec_quantities(spec);
            }
        }
        ResourceKind::Node => {
            for pointer in ["/status/capacity", "/status/allocatable"] {
                if let Some(quantities) = value.pointer_mut(pointer) {
                    stringify_values(quantities);
                }
            }
        }
        ResourceKind::Namespace => {}
    }
}

fn pod_spec_quantities(spec: &mut Value) {
    for list in ["containers", "initContainers", "ephemeralContainers"] {
        let Some(Value::Array(containers)) = spec.get_mut(list) else {
            continue;
        };
        for container in containers {
            for pointer in ["/resources/limits", "/resources/requests"] {
                if let Some(quantities) = container.pointer_mut(pointer) {
                    stringify_values(quantities);
                }
            }
        }
    }

    if let Some(overhead) = spec.get_mut("overhead") {
        stringify_values(overhead);
    }

    if let Some(Value::Array(volumes)) = spec.get_mut("volumes") {
        for volume in volumes {
            if let Some(limit) = volume.pointer_mut("/emptyDir/sizeLimit") {
                stringify_number(limit);
            }
        }
    }
}

fn stringify_values(map: &mut Value) {
    if let Value::Object(map) = map {
        map.values_mut().for_each(stringify_number);
    }
}

fn stringify_number(value: &mut Value) {
    if let Value::Number(n) = value {
        let text = n.to_string();
        *value = Value::String(text);
    }
}

fn typed<T: DeserializeOwned>(kind: ResourceKind, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| CoreError::Schema {
        kind,
        message: e.to_string(),
    })
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First path present in `input` but absent from `known`
fn find_unknown_field(input: &Value, known: &Value, path: &str) -> Option<String> {
    match (input, known) {
        (Value::Object(input), Value::Object(known)) => {
            for (key, value) in input {
                if value.is_null() {
                    continue;
                }
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match known.get(key) {
                    None => return Some(child),
                    Some(known_value) => {
                        if let Some(found) = find_unknown_field(value, known_value, &child) {
                            return Some(found);
                        }
                    }
                }
            }
            None
        }
        (Value::Array(input), Value::Array(known)) => input
            .iter()
            .zip(known)
            .enumerate()
            .find_map(|(i, (value, known_value))| {
                find_unknown_field(value, known_value, &format!("{}[{}]", path, i))
            }),
        _ => None,
    }
}
