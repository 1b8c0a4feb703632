//! Field layout of claims and composites.
//!
//! Claims and composites are schemaless documents; only the handful of
//! fields that bind them to each other are touched here.
//!
//! ```text
//! Claim (namespaced)                 Composite (cluster-scoped)
//!   metadata.namespace  <----------    metadata.labels[crossplane.io/claim-namespace]
//!   metadata.name       <----------    spec.claimRef {apiVersion, kind, name, namespace}
//!   spec.resourceRef    ---------->    identity
//! ```

use serde_json::{json, Map, Value};

use super::ResourceReference;

/// Label on a composite naming the namespace of its claim.
pub const CLAIM_NAMESPACE_LABEL: &str = "crossplane.io/claim-namespace";

/// Metadata assigned by the store that must not survive a copy. The deletion
/// markers go too: a source already being deleted must not yield a
/// destination born terminating.
const IDENTITY_FIELDS: [&str; 8] = [
    "resourceVersion",
    "uid",
    "creationTimestamp",
    "generation",
    "managedFields",
    "selfLink",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
];

/// Returns the composite a claim is bound to, if any.
///
/// Composites are cluster-scoped, so the returned reference has no namespace.
#[must_use]
pub fn resource_reference(claim: &Value) -> Option<ResourceReference> {
    let reference = claim.pointer("/spec/resourceRef")?;
    let text = |key: &str| reference.get(key).and_then(Value::as_str).unwrap_or_default();
    if text("name").is_empty() || text("kind").is_empty() {
        return None;
    }
    Some(ResourceReference::new(text("kind"), text("apiVersion"), text("name"), ""))
}

/// Returns the `metadata.namespace` of a document.
#[must_use]
pub fn namespace(document: &Value) -> Option<&str> {
    document.pointer("/metadata/namespace").and_then(Value::as_str)
}

/// Returns the finalizers of a document; absent means none.
#[must_use]
pub fn finalizers(document: &Value) -> Vec<String> {
    document
        .pointer("/metadata/finalizers")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Deep-copies a claim into `namespace`, dropping store-assigned identity so
/// the store treats it as brand new.
#[must_use]
pub fn copy_into_namespace(source: &Value, namespace: &str) -> Value {
    let mut copy = source.clone();
    let metadata = object_at(&mut copy, "metadata");
    metadata.insert("namespace".into(), Value::String(namespace.to_owned()));
    for field in IDENTITY_FIELDS {
        metadata.remove(field);
    }
    copy
}

/// Points a composite at `claim`: both the claim reference and the
/// claim-namespace label.
#[must_use]
pub fn bind_composite(mut composite: Value, claim: &ResourceReference) -> Value {
    object_at(&mut composite, "spec").insert(
        "claimRef".into(),
        json!({
            "apiVersion": claim.api_version,
            "kind": claim.kind,
            "name": claim.name,
            "namespace": claim.namespace,
        }),
    );
    let metadata = object_at(&mut composite, "metadata");
    object_at_map(metadata, "labels")
        .insert(CLAIM_NAMESPACE_LABEL.into(), Value::String(claim.namespace.clone()));
    composite
}

/// Detaches a claim from its composite and clears its finalizers so it can
/// be deleted without the composite being torn down with it.
#[must_use]
pub fn sever_claim(mut claim: Value) -> Value {
    object_at(&mut claim, "spec").remove("resourceRef");
    object_at(&mut claim, "metadata").insert("finalizers".into(), Value::Array(Vec::new()));
    claim
}

/// Returns the object under `key`, replacing a missing or non-object value.
fn object_at<'a>(document: &'a mut Value, key: &str) -> &'a mut Map<String, Value> {
    if !document.is_object() {
        *document = Value::Object(Map::new());
    }
    match document {
        Value::Object(map) => object_at_map(map, key),
        _ => unreachable!("document was just made an object"),
    }
}

fn object_at_map<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just made an object"),
    }
}
