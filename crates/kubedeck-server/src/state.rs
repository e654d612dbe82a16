use std::sync::Arc;

use kubedeck_assist::DraftClient;
use kubedeck_kube::{
    ClientProvider, ClusterApi, KubeClusterApi, ReplaceOrchestrator, ResourceGateway,
    SettleConfig,
};

/// Everything the routes need, composed once at startup
pub struct AppState {
    pub gateway: ResourceGateway,
    pub orchestrator: ReplaceOrchestrator,
    pub provider: Arc<ClientProvider>,
    pub assistant: Option<DraftClient>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        provider: Arc<ClientProvider>,
        settle: SettleConfig,
        assistant: Option<DraftClient>,
    ) -> Self {
        let gateway = ResourceGateway::new(api);
        let orchestrator = ReplaceOrchestrator::new(gateway.clone(), settle);
        Self {
            gateway,
            orchestrator,
            provider,
            assistant,
        }
    }

    /// State backed by the cluster of the provider's active context
    pub fn for_cluster(
        provider: Arc<ClientProvider>,
        settle: SettleConfig,
        assistant: Option<DraftClient>,
    ) -> Self {
        let api = Arc::new(KubeClusterApi::new(provider.clone()));
        Self::new(api, provider, settle, assistant)
    }
}
