//! Kubernetes node discovery
//!
//! Lists `v1/Node` objects through the API server and reports each node's
//! `status.addresses`. `InternalIP` and `ExternalIP` become internal and
//! external addresses; hostnames and DNS names are carried as `Other`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};

use nodesync_core::config::KubernetesConfig;
use nodesync_core::{Error, Result};

use super::source::{AddressKind, ClusterMember, MemberAddress, NodeSource};

const INTERNAL_IP: &str = "InternalIP";
const EXTERNAL_IP: &str = "ExternalIP";

/// Node source backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeNodeSource {
    client: Client,
}

impl KubeNodeSource {
    /// Build a client from the configured overrides.
    ///
    /// Without overrides the configuration is inferred: in-cluster service
    /// account first, then `KUBECONFIG` / `~/.kube/config`.
    pub async fn connect(config: &KubernetesConfig) -> Result<Self> {
        let options = KubeConfigOptions {
            context: config.context.clone(),
            cluster: config.cluster.clone(),
            user: config.user.clone(),
        };

        let client_config = if let Some(path) = &config.kubeconfig {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::Config(format!("failed to read kubeconfig '{path}': {e}"))
            })?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::Config(format!("invalid kubeconfig '{path}': {e}")))?
        } else if config.has_overrides() {
            kube::Config::from_kubeconfig(&options)
                .await
                .map_err(|e| Error::Config(format!("invalid kubeconfig overrides: {e}")))?
        } else {
            kube::Config::infer()
                .await
                .map_err(|e| Error::Config(format!("failed to infer cluster config: {e}")))?
        };

        tracing::info!(cluster_url = %client_config.cluster_url, "Kubernetes client configured");

        let client = Client::try_from(client_config)
            .map_err(|e| Error::Config(format!("failed to create Kubernetes client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeSource for KubeNodeSource {
    async fn list_members(&self) -> Result<Vec<ClusterMember>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::Fetch(format!("failed to list cluster nodes: {e}")))?;

        Ok(list.items.into_iter().map(member_from_node).collect())
    }
}

fn member_from_node(node: Node) -> ClusterMember {
    let name = node.metadata.name.unwrap_or_default();
    let addresses = node
        .status
        .and_then(|status| status.addresses)
        .unwrap_or_default()
        .into_iter()
        .map(|a| MemberAddress {
            kind: address_kind(&a.type_),
            address: a.address,
        })
        .collect();

    ClusterMember { name, addresses }
}

fn address_kind(type_: &str) -> AddressKind {
    match type_ {
        INTERNAL_IP => AddressKind::Internal,
        EXTERNAL_IP => AddressKind::External,
        other => AddressKind::Other(other.to_string()),
    }
}
