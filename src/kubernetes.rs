use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt, config};
use std::fmt::Debug;
use tracing::{debug, info};

/// Everything fetched from one namespace, as returned by the API server.
#[derive(Debug, Clone, Default)]
pub struct NamespaceSnapshot {
    pub namespace: String,
    pub deployments: Vec<Deployment>,
    pub stateful_sets: Vec<StatefulSet>,
    pub daemon_sets: Vec<DaemonSet>,
    pub jobs: Vec<Job>,
    pub replica_sets: Vec<ReplicaSet>,
    pub pods: Vec<Pod>,
    pub services: Vec<Service>,
}

/// Build a client for `context`, or the current kubeconfig context.
///
/// Returns the cluster name the context points at alongside the client.
pub async fn initialize_client(context: Option<&str>) -> anyhow::Result<(String, Client)> {
    let kubeconfig = config::Kubeconfig::read().ok();
    let context_name = context.map(str::to_string).or_else(|| {
        kubeconfig
            .as_ref()
            .and_then(|k| k.current_context.clone())
    });

    let cluster = kubeconfig
        .as_ref()
        .zip(context_name.as_deref())
        .and_then(|(k, ctx)| k.contexts.iter().find(|c| c.name == ctx))
        .and_then(|c| c.context.as_ref())
        .map(|c| c.cluster.clone())
        .or_else(|| context_name.clone())
        .unwrap_or_else(|| "default".to_string());

    let config = match context {
        Some(ctx) => config::Config::from_kubeconfig(&config::KubeConfigOptions {
            context: Some(ctx.to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow::anyhow!("Context '{}' not found in kubeconfig: {}", ctx, e))?,
        None => config::Config::infer().await?,
    };
    let client = Client::try_from(config)?;
    info!(
        "Using context {} (cluster {})",
        context_name.as_deref().unwrap_or("in-cluster"),
        cluster
    );
    Ok((cluster, client))
}

pub async fn list_namespaces(client: &Client) -> anyhow::Result<Vec<String>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let mut names: Vec<String> = api
        .list(&ListParams::default())
        .await?
        .items
        .iter()
        .map(|ns| ns.name_any())
        .collect();
    names.sort();
    Ok(names)
}

async fn list_namespaced<T>(client: &Client, namespace: &str) -> anyhow::Result<Vec<T>>
where
    T: k8s_openapi::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>
        + serde::de::DeserializeOwned
        + serde::Serialize
        + Clone
        + Debug
        + Send
        + Sync,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await.map_err(|e| {
        anyhow::anyhow!("Failed to list {} in namespace {}: {}", T::KIND, namespace, e)
    })?;
    debug!("Listed {} {} in {}", list.items.len(), T::KIND, namespace);
    Ok(list.items)
}

/// Fetch workloads plus every pod, service and replica set in `namespace`.
pub async fn fetch_namespace(client: &Client, namespace: &str) -> anyhow::Result<NamespaceSnapshot> {
    let (deployments, stateful_sets, daemon_sets, jobs, replica_sets, pods, services) = tokio::try_join!(
        list_namespaced::<Deployment>(client, namespace),
        list_namespaced::<StatefulSet>(client, namespace),
        list_namespaced::<DaemonSet>(client, namespace),
        list_namespaced::<Job>(client, namespace),
        list_namespaced::<ReplicaSet>(client, namespace),
        list_namespaced::<Pod>(client, namespace),
        list_namespaced::<Service>(client, namespace),
    )?;

    Ok(NamespaceSnapshot {
        namespace: namespace.to_string(),
        deployments,
        stateful_sets,
        daemon_sets,
        jobs,
        replica_sets,
        pods,
        services,
    })
}
