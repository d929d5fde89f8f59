//! Dynamic manifest apply and delete
//!
//! Applies opaque multi-document YAML to a cluster without compile-time
//! knowledge of the resource types, using API discovery and Server-Side
//! Apply. Deletion walks the same documents in reverse order.

use anyhow::{anyhow, Context, Result};
use kube::{
    api::{Api, DeleteParams, DynamicObject, Patch, PatchParams},
    core::{GroupVersionKind, TypeMeta},
    discovery::{Discovery, Scope},
    Client,
};
use tracing::debug;

/// Field manager name for Server-Side Apply.
const FIELD_MANAGER: &str = "eastwest-gateway";

/// Apply every document in `manifest` to `namespace`.
///
/// Server-Side Apply makes re-application of the same manifest idempotent.
pub async fn apply_manifest(client: &Client, namespace: &str, manifest: &str) -> Result<()> {
    let discovery = discover(client).await?;

    for obj in parse_manifest(manifest)? {
        let (api, obj) = resolve(client, &discovery, namespace, obj)?;
        let name = object_name(&obj)?;

        let mut params = PatchParams::apply(FIELD_MANAGER);
        params.force = true;

        debug!("applying {} {}", obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("?"), name);
        api.patch(&name, &params, &Patch::Apply(&obj))
            .await
            .with_context(|| format!("Failed to apply {name}"))?;
    }

    Ok(())
}

/// Delete every resource described by `manifest` from `namespace`,
/// in reverse document order. Already-absent resources are skipped.
pub async fn delete_manifest(client: &Client, namespace: &str, manifest: &str) -> Result<()> {
    let discovery = discover(client).await?;

    let mut objects = parse_manifest(manifest)?;
    objects.reverse();

    for obj in objects {
        let (api, obj) = resolve(client, &discovery, namespace, obj)?;
        let name = object_name(&obj)?;

        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => debug!("deleted {name}"),
            Err(kube::Error::Api(e)) if e.code == 404 => debug!("{name} already gone"),
            Err(e) => return Err(e).with_context(|| format!("Failed to delete {name}")),
        }
    }

    Ok(())
}

async fn discover(client: &Client) -> Result<Discovery> {
    Discovery::new(client.clone())
        .run()
        .await
        .context("Failed to discover cluster API resources")
}

/// Split multi-document YAML into dynamic objects, skipping empty documents.
pub(crate) fn parse_manifest(manifest: &str) -> Result<Vec<DynamicObject>> {
    use serde::Deserialize;

    let mut objects = Vec::new();
    for (index, doc) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
        let value = serde_yaml::Value::deserialize(doc)
            .with_context(|| format!("Failed to parse manifest document {index}"))?;
        if value.is_null() {
            continue;
        }
        let obj: DynamicObject = serde_yaml::from_value(value)
            .with_context(|| format!("Manifest document {index} is not a Kubernetes object"))?;
        objects.push(obj);
    }
    Ok(objects)
}

/// Resolve a dynamic object against discovery, defaulting the namespace for
/// namespaced resources that do not carry one.
fn resolve(
    client: &Client,
    discovery: &Discovery,
    default_namespace: &str,
    mut obj: DynamicObject,
) -> Result<(Api<DynamicObject>, DynamicObject)> {
    let types = obj
        .types
        .as_ref()
        .ok_or_else(|| anyhow!("Manifest document missing apiVersion or kind"))?;
    let gvk = gvk_from_type_meta(types);

    let (api_resource, capabilities) = discovery
        .resolve_gvk(&gvk)
        .ok_or_else(|| anyhow!("Unknown resource type {}/{}", types.api_version, types.kind))?;

    let api = if capabilities.scope == Scope::Namespaced {
        let ns = obj
            .metadata
            .namespace
            .get_or_insert_with(|| default_namespace.to_string())
            .clone();
        Api::namespaced_with(client.clone(), &ns, &api_resource)
    } else {
        Api::all_with(client.clone(), &api_resource)
    };

    Ok((api, obj))
}

fn object_name(obj: &DynamicObject) -> Result<String> {
    obj.metadata
        .name
        .clone()
        .ok_or_else(|| anyhow!("Manifest document missing metadata.name"))
}

/// `"apps/v1"` splits into group `apps`, version `v1`; a bare `"v1"` is the
/// core group.
fn gvk_from_type_meta(tm: &TypeMeta) -> GroupVersionKind {
    let (group, version) = match tm.api_version.rsplit_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), tm.api_version.clone()),
    };

    GroupVersionKind {
        group,
        version,
        kind: tm.kind.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTI_DOC: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: istio-eastwestgateway
---
# comment-only separator follows
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: istio-eastwestgateway
  namespace: istio-system
"#;

    #[test]
    fn test_parse_manifest_skips_empty_documents() {
        let objects = parse_manifest(MULTI_DOC).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].types.as_ref().unwrap().kind, "Service");
        assert_eq!(objects[1].types.as_ref().unwrap().kind, "Deployment");
        assert_eq!(
            objects[1].metadata.namespace.as_deref(),
            Some("istio-system")
        );
    }

    #[test]
    fn test_parse_manifest_rejects_garbage() {
        assert!(parse_manifest("{ not yaml: [").is_err());
    }

    #[test]
    fn test_gvk_from_type_meta() {
        let core = TypeMeta {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
        };
        let gvk = gvk_from_type_meta(&core);
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Service");

        let grouped = TypeMeta {
            api_version: "networking.istio.io/v1alpha3".to_string(),
            kind: "Gateway".to_string(),
        };
        let gvk = gvk_from_type_meta(&grouped);
        assert_eq!(gvk.group, "networking.istio.io");
        assert_eq!(gvk.version, "v1alpha3");
    }
}
