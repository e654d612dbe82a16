//! `ClusterApi` backed by a live cluster

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kubedeck_core::{CoreError, Operation, Resource, ResourceKind, ResourceRef};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;

use super::ClusterApi;
use crate::error::{KubeError, Result};
use crate::provider::ClientProvider;

/// Talks to the cluster of the provider's active context
///
/// The client is resolved on first use, so the process can start before a
/// kubeconfig exists.
#[derive(Clone)]
pub struct KubeClusterApi {
    provider: Arc<ClientProvider>,
}

impl KubeClusterApi {
    pub fn new(provider: Arc<ClientProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &ClientProvider {
        &self.provider
    }

    async fn client(&self) -> Result<kube::Client> {
        self.provider.client().await
    }
}

fn namespace_of(target: &ResourceRef) -> Result<&str> {
    target.namespace().ok_or(KubeError::MissingParameter {
        parameter: "namespace",
    })
}

fn name_of(target: &ResourceRef) -> Result<&str> {
    Ok(target.require_name()?)
}

async fn list_in<K>(api: Api<K>, scope: &ResourceRef) -> Result<Vec<Resource>>
where
    K: Clone + DeserializeOwned + Debug + Into<Resource>,
{
    let list = api
        .list(&ListParams::default())
        .await
        .map_err(|e| KubeError::from_api(e, scope))?;
    Ok(list.items.into_iter().map(Into::into).collect())
}

async fn get_in<K>(api: Api<K>, target: &ResourceRef) -> Result<Resource>
where
    K: Clone + DeserializeOwned + Debug + Into<Resource>,
{
    let object = api
        .get(name_of(target)?)
        .await
        .map_err(|e| KubeError::from_api(e, target))?;
    Ok(object.into())
}

async fn create_in<K>(api: Api<K>, target: &ResourceRef, object: &K) -> Result<Resource>
where
    K: Clone + Serialize + DeserializeOwned + Debug + Into<Resource>,
{
    let created = api
        .create(&PostParams::default(), object)
        .await
        .map_err(|e| KubeError::from_api(e, target))?;
    Ok(created.into())
}

async fn delete_in<K>(api: Api<K>, target: &ResourceRef) -> Result<()>
where
    K: Clone + DeserializeOwned + Debug,
{
    api.delete(name_of(target)?, &DeleteParams::default())
        .await
        .map_err(|e| KubeError::from_api(e, target))?;
    Ok(())
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list(&self, scope: &ResourceRef) -> Result<Vec<Resource>> {
        let client = self.client().await?;
        match scope.kind() {
            ResourceKind::Node => list_in(Api::<Node>::all(client), scope).await,
            ResourceKind::Namespace => list_in(Api::<Namespace>::all(client), scope).await,
            ResourceKind::Deployment => {
                let api = Api::<Deployment>::namespaced(client, namespace_of(scope)?);
                list_in(api, scope).await
            }
            ResourceKind::Pod => {
                let api = Api::<Pod>::namespaced(client, namespace_of(scope)?);
                list_in(api, scope).await
            }
        }
    }

    async fn get(&self, target: &ResourceRef) -> Result<Resource> {
        let client = self.client().await?;
        match target.kind() {
            ResourceKind::Node => get_in(Api::<Node>::all(client), target).await,
            ResourceKind::Namespace => get_in(Api::<Namespace>::all(client), target).await,
            ResourceKind::Deployment => {
                let api = Api::<Deployment>::namespaced(client, namespace_of(target)?);
                get_in(api, target).await
            }
            ResourceKind::Pod => {
                let api = Api::<Pod>::namespaced(client, namespace_of(target)?);
                get_in(api, target).await
            }
        }
    }

    async fn create(&self, target: &ResourceRef, resource: Resource) -> Result<Resource> {
        let client = self.client().await?;
        match resource {
            Resource::Deployment(deployment) => {
                let api = Api::<Deployment>::namespaced(client, namespace_of(target)?);
                create_in(api, target, &deployment).await
            }
            Resource::Pod(pod) => {
                let api = Api::<Pod>::namespaced(client, namespace_of(target)?);
                create_in(api, target, &pod).await
            }
            other => Err(CoreError::Unsupported {
                kind: other.kind(),
                operation: Operation::Create,
            }
            .into()),
        }
    }

    async fn delete(&self, target: &ResourceRef) -> Result<()> {
        let client = self.client().await?;
        match target.kind() {
            ResourceKind::Deployment => {
                let api = Api::<Deployment>::namespaced(client, namespace_of(target)?);
                delete_in(api, target).await
            }
            ResourceKind::Pod => {
                let api = Api::<Pod>::namespaced(client, namespace_of(target)?);
                delete_in(api, target).await
            }
            kind => Err(KubeError::Unsupported {
                kind,
                operation: Operation::Delete,
            }),
        }
    }

    async fn logs(&self, target: &ResourceRef) -> Result<String> {
        if target.kind() != ResourceKind::Pod {
            return Err(KubeError::Unsupported {
                kind: target.kind(),
                operation: Operation::Logs,
            });
        }

        let api = Api::<Pod>::namespaced(self.client().await?, namespace_of(target)?);
        api.logs(name_of(target)?, &LogParams::default())
            .await
            .map_err(|e| KubeError::from_api(e, target))
    }
}
