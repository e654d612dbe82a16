//! Cluster client provider
//!
//! Resolves the kubeconfig, picks its current context and keeps the resulting
//! `kube::Config`. A `kube::Client` is built from it per call: the client's
//! request buffer lives on the runtime that built it, and each server worker
//! runs its own runtime. Building a client does no network I/O.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tokio::sync::OnceCell;

use crate::error::{KubeError, Result};

/// Connection settings of the active kubeconfig context
#[derive(Clone)]
pub struct ClusterHandle {
    config: Config,
    context: String,
    cluster: String,
}

impl ClusterHandle {
    /// Build a client on the current runtime
    pub fn client(&self) -> Result<Client> {
        Client::try_from(self.config.clone()).map_err(|e| KubeError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Name of the active context
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Name of the cluster the active context points at
    pub fn cluster_name(&self) -> &str {
        &self.cluster
    }
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("context", &self.context)
            .field("cluster", &self.cluster)
            .finish_non_exhaustive()
    }
}

/// Caches the first successful [`ClusterHandle`] for the life of the process
///
/// Failed resolutions are not cached, so a kubeconfig fixed on disk is picked up
/// by the next request.
#[derive(Debug, Default)]
pub struct ClientProvider {
    kubeconfig: Option<PathBuf>,
    handle: OnceCell<ClusterHandle>,
}

impl ClientProvider {
    /// Create a provider, optionally pinned to an explicit kubeconfig path
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self {
            kubeconfig,
            handle: OnceCell::new(),
        }
    }

    /// Create a provider around an already resolved handle
    pub fn with_handle(handle: ClusterHandle) -> Self {
        Self {
            kubeconfig: None,
            handle: OnceCell::new_with(Some(handle)),
        }
    }

    pub async fn handle(&self) -> Result<&ClusterHandle> {
        self.handle
            .get_or_try_init(|| resolve(self.kubeconfig.as_deref()))
            .await
    }

    pub async fn client(&self) -> Result<Client> {
        self.handle().await?.client()
    }
}

/// Resolve the kubeconfig and load the connection settings of its current context
pub async fn resolve(explicit: Option<&Path>) -> Result<ClusterHandle> {
    let path = kubeconfig_path(explicit)?;
    let kubeconfig = load_kubeconfig(&path).await?;
    let (context, cluster) = active_context(&kubeconfig)?;

    let options = KubeConfigOptions {
        context: Some(context.clone()),
        ..Default::default()
    };
    let config = Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| KubeError::ConfigParse {
            message: e.to_string(),
        })?;

    tracing::info!(
        kubeconfig = %path.display(),
        context = %context,
        cluster = %cluster,
        "resolved cluster context"
    );

    Ok(ClusterHandle {
        config,
        context,
        cluster,
    })
}

/// The kubeconfig location: explicit path, else first `$KUBECONFIG` entry, else `~/.kube/config`
pub fn kubeconfig_path(explicit: Option<&Path>) -> Result<PathBuf> {
    pick_kubeconfig_path(explicit, std::env::var_os("KUBECONFIG"), dirs::home_dir())
}

fn pick_kubeconfig_path(
    explicit: Option<&Path>,
    env: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env
        .as_deref()
        .and_then(|value| std::env::split_paths(value).find(|p| !p.as_os_str().is_empty()))
    {
        return Ok(path);
    }

    let default = Path::new(".kube").join("config");
    match home {
        Some(home) => Ok(home.join(default)),
        None => Err(KubeError::ConfigNotFound { path: default }),
    }
}

async fn load_kubeconfig(path: &Path) -> Result<Kubeconfig> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(KubeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(KubeError::ConfigParse {
                message: format!("{}: {}", path.display(), e),
            });
        }
    };

    Kubeconfig::from_yaml(&text).map_err(|e| KubeError::ConfigParse {
        message: format!("{}: {}", path.display(), e),
    })
}

/// Name of the current context and of the cluster it references
fn active_context(kubeconfig: &Kubeconfig) -> Result<(String, String)> {
    let current = kubeconfig
        .current_context
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(KubeError::NoActiveContext { context: None })?;

    let named = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == current)
        .ok_or_else(|| KubeError::NoActiveContext {
            context: Some(current.to_string()),
        })?;

    let cluster = named
        .context
        .as_ref()
        .map(|ctx| ctx.cluster.clone())
        .filter(|cluster| !cluster.is_empty())
        .ok_or_else(|| KubeError::ConfigParse {
            message: format!("context '{}' does not reference a cluster", current),
        })?;

    Ok((current.to_string(), cluster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Namespace;
    use kube::Api;
    use kube::api::ListParams;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev-cluster
    cluster:
      server: http://127.0.0.1:6443
  - name: prod-cluster
    cluster:
      server: https://prod.example.com:6443
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
  - name: prod
    context:
      cluster: prod-cluster
      user: dev-user
users:
  - name: dev-user
    user:
      token: abc123
"#;

    fn write_kubeconfig(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = pick_kubeconfig_path(
            Some(Path::new("/etc/kube.yaml")),
            Some(OsString::from("/tmp/other")),
            Some(PathBuf::from("/home/dev")),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/etc/kube.yaml"));
    }

    #[test]
    fn test_env_first_entry() {
        let env = std::env::join_paths(["/tmp/first", "/tmp/second"]).unwrap();
        let path = pick_kubeconfig_path(None, Some(env), Some(PathBuf::from("/home/dev"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/first"));
    }

    #[test]
    fn test_home_default() {
        let path = pick_kubeconfig_path(None, None, Some(PathBuf::from("/home/dev"))).unwrap();
        assert_eq!(path, PathBuf::from("/home/dev/.kube/config"));

        let path =
            pick_kubeconfig_path(None, Some(OsString::new()), Some(PathBuf::from("/home/dev")))
                .unwrap();
        assert_eq!(path, PathBuf::from("/home/dev/.kube/config"));
    }

    #[test]
    fn test_no_home() {
        let err = pick_kubeconfig_path(None, None, None).unwrap_err();
        assert!(matches!(err, KubeError::ConfigNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let err = resolve(Some(&path)).await.unwrap_err();
        match err {
            KubeError::ConfigNotFound { path: reported } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let file = write_kubeconfig("clusters: [this is: not valid");
        let err = resolve(Some(file.path())).await.unwrap_err();
        assert!(matches!(err, KubeError::ConfigParse { .. }));
        assert!(err.is_bad_request());
    }

    #[tokio::test]
    async fn test_no_current_context() {
        let file = write_kubeconfig(&KUBECONFIG.replace("current-context: dev\n", ""));
        let err = resolve(Some(file.path())).await.unwrap_err();
        assert!(matches!(err, KubeError::NoActiveContext { context: None }));
    }

    #[tokio::test]
    async fn test_undefined_current_context() {
        let file = write_kubeconfig(&KUBECONFIG.replace("current-context: dev", "current-context: staging"));
        let err = resolve(Some(file.path())).await.unwrap_err();
        assert!(matches!(
            err,
            KubeError::NoActiveContext { context: Some(ref c) } if c == "staging"
        ));
    }

    #[tokio::test]
    async fn test_resolve_active_context() {
        let file = write_kubeconfig(KUBECONFIG);
        let handle = resolve(Some(file.path())).await.unwrap();
        assert_eq!(handle.context(), "dev");
        assert_eq!(handle.cluster_name(), "dev-cluster");

        let file = write_kubeconfig(&KUBECONFIG.replace("current-context: dev", "current-context: prod"));
        let handle = resolve(Some(file.path())).await.unwrap();
        assert_eq!(handle.cluster_name(), "prod-cluster");
    }

    #[tokio::test]
    async fn test_provider_caches_success_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let provider = ClientProvider::new(Some(path.clone()));

        assert!(provider.handle().await.is_err());

        std::fs::write(&path, KUBECONFIG).unwrap();
        assert_eq!(provider.handle().await.unwrap().context(), "dev");

        std::fs::remove_file(&path).unwrap();
        assert_eq!(provider.handle().await.unwrap().cluster_name(), "dev-cluster");
    }

    #[test]
    fn test_client_outlives_resolving_runtime() {
        let serving = tokio::runtime::Runtime::new().unwrap();
        let server = serving.block_on(MockServer::start());
        serving.block_on(
            Mock::given(method("GET"))
                .and(path("/api/v1/namespaces"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "NamespaceList",
                    "metadata": {},
                    "items": [{
                        "apiVersion": "v1",
                        "kind": "Namespace",
                        "metadata": {"name": "default"}
                    }]
                })))
                .mount(&server),
        );

        let file = write_kubeconfig(&KUBECONFIG.replace("http://127.0.0.1:6443", &server.uri()));
        let provider = ClientProvider::new(Some(file.path().to_path_buf()));

        // Resolve on a worker runtime that is gone before the next request
        let worker = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        worker.block_on(provider.handle()).unwrap();
        drop(worker);

        let namespaces = serving
            .block_on(async {
                let client = provider.client().await?;
                Api::<Namespace>::all(client)
                    .list(&ListParams::default())
                    .await
                    .map_err(|e| KubeError::Upstream {
                        message: e.to_string(),
                        code: None,
                    })
            })
            .unwrap();
        assert_eq!(namespaces.items.len(), 1);
        assert_eq!(namespaces.items[0].metadata.name.as_deref(), Some("default"));
    }
}
