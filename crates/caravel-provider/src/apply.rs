//! The reconciliation/apply protocol.
//!
//! Four strictly ordered steps per deployment: namespace, network
//! policies, workloads, service exposure. Later steps depend on earlier
//! ones existing, so a failure aborts the remainder. Each step is an
//! upsert — absence is the only branch that creates; any other read error
//! is fatal. There is no rollback phase: a cancelled or failed apply is
//! retried by re-invoking it from scratch.

use tracing::{debug, error, info};

use caravel_backend::{BackendClient, ClusterService, Namespace, NetworkPolicy, Workload};
use caravel_core::{Deployment, DeploymentId};
use caravel_manifest::WorkloadGroup;

use crate::builders::{
    build_global_service, build_local_service, build_namespace, build_policies, build_workload,
    merge_namespace, merge_policy, merge_service, merge_workload,
};
use crate::error::ApplyResult;
use crate::naming::deployment_namespace;
use crate::settings::ProviderSettings;

/// Apply a compiled workload group to the backend.
///
/// Settings are validated first; an invalid policy fails before any
/// mutation reaches the backend.
pub async fn apply_group(
    backend: &dyn BackendClient,
    settings: &ProviderSettings,
    deployment: &Deployment,
    group: &WorkloadGroup,
) -> ApplyResult<()> {
    settings.validate()?;
    let namespace = deployment_namespace(&deployment.id);

    apply_namespace(backend, build_namespace(deployment, &namespace)).await?;

    for policy in build_policies(&namespace, group) {
        apply_policy(backend, policy).await?;
    }

    for workload in &group.workloads {
        apply_workload(backend, build_workload(&namespace, workload, settings)).await?;

        if workload.expose.is_empty() {
            debug!(%namespace, workload = %workload.name, "no exposure declared");
            continue;
        }
        if let Some(service) = build_local_service(&namespace, workload) {
            apply_service(backend, service).await?;
        }
        if let Some(service) = build_global_service(&namespace, workload) {
            apply_service(backend, service).await?;
        }
    }

    info!(
        deployment = %deployment.id,
        %namespace,
        workloads = group.workloads.len(),
        "workload group applied"
    );
    Ok(())
}

/// Tear down a deployment by deleting its namespace; the backend cascades
/// every namespaced resource. Returns false if it was already absent.
pub async fn delete_group(
    backend: &dyn BackendClient,
    deployment_id: &DeploymentId,
) -> ApplyResult<bool> {
    let namespace = deployment_namespace(deployment_id);
    let existed = backend.delete_namespace(&namespace).await?;
    if existed {
        info!(deployment = %deployment_id, %namespace, "namespace deleted");
    } else {
        // Already gone — closing twice converges on the same state.
        info!(deployment = %deployment_id, %namespace, "namespace already absent");
    }
    Ok(existed)
}

async fn apply_namespace(backend: &dyn BackendClient, desired: Namespace) -> ApplyResult<()> {
    let result = match backend.get_namespace(&desired.name).await? {
        Some(existing) => {
            backend
                .update_namespace(&merge_namespace(&existing, desired.clone()))
                .await
        }
        None => backend.create_namespace(&desired).await,
    };

    if let Err(e) = &result {
        error!(namespace = %desired.name, error = %e, "applying namespace failed");
    }
    Ok(result?)
}

async fn apply_policy(backend: &dyn BackendClient, desired: NetworkPolicy) -> ApplyResult<()> {
    let result = match backend
        .get_network_policy(&desired.namespace, &desired.name)
        .await?
    {
        Some(existing) => {
            backend
                .update_network_policy(&merge_policy(&existing, desired.clone()))
                .await
        }
        None => backend.create_network_policy(&desired).await,
    };

    if let Err(e) = &result {
        error!(
            namespace = %desired.namespace,
            policy = %desired.name,
            error = %e,
            "applying network policy failed"
        );
    }
    Ok(result?)
}

async fn apply_workload(backend: &dyn BackendClient, desired: Workload) -> ApplyResult<()> {
    let result = match backend
        .get_workload(&desired.namespace, &desired.name)
        .await?
    {
        Some(existing) => {
            backend
                .update_workload(&merge_workload(&existing, desired.clone()))
                .await
        }
        None => backend.create_workload(&desired).await,
    };

    if let Err(e) = &result {
        error!(
            namespace = %desired.namespace,
            workload = %desired.name,
            error = %e,
            "applying workload failed"
        );
    }
    Ok(result?)
}

async fn apply_service(backend: &dyn BackendClient, desired: ClusterService) -> ApplyResult<()> {
    let result = match backend
        .get_service(&desired.namespace, &desired.name)
        .await?
    {
        Some(existing) => {
            backend
                .update_service(&merge_service(&existing, desired.clone()))
                .await
        }
        None => backend.create_service(&desired).await,
    };

    if let Err(e) = &result {
        error!(
            namespace = %desired.namespace,
            service = %desired.name,
            error = %e,
            "applying service failed"
        );
    }
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_backend::MemoryBackend;
    use caravel_core::{ComputeResources, Service, StorageSpec};
    use caravel_manifest::compile;

    fn test_deployment(id: &str, port: u16) -> Deployment {
        Deployment {
            id: id.to_string(),
            services: vec![Service {
                image: "nginx:1.14.2".to_string(),
                port,
                resources: ComputeResources::new(0.1, 100, vec![StorageSpec::ephemeral(100)]),
                ..Default::default()
            }],
            ..Deployment::new("alice", "web", vec![])
        }
    }

    #[tokio::test]
    async fn first_apply_creates_all_resources() {
        let backend = MemoryBackend::new();
        let settings = ProviderSettings::default();
        let deployment = test_deployment("d1", 80);
        let group = compile(&deployment).unwrap();

        apply_group(&backend, &settings, &deployment, &group)
            .await
            .unwrap();

        // Namespace + deny policy + allow policy + workload + node-port service.
        assert_eq!(backend.object_count(), 5);
        assert_eq!(backend.op_counts().creates, 5);
        assert_eq!(backend.op_counts().updates, 0);
    }

    #[tokio::test]
    async fn second_apply_of_same_group_only_updates() {
        let backend = MemoryBackend::new();
        let settings = ProviderSettings::default();
        let deployment = test_deployment("d1", 80);
        let group = compile(&deployment).unwrap();

        apply_group(&backend, &settings, &deployment, &group)
            .await
            .unwrap();
        let creates_after_first = backend.op_counts().creates;
        let objects_after_first = backend.object_count();

        apply_group(&backend, &settings, &deployment, &group)
            .await
            .unwrap();

        assert_eq!(backend.op_counts().creates, creates_after_first);
        assert_eq!(backend.object_count(), objects_after_first);
        assert!(backend.op_counts().updates > 0);
    }

    #[tokio::test]
    async fn unexposed_deployment_gets_no_services() {
        let backend = MemoryBackend::new();
        let settings = ProviderSettings::default();
        let deployment = test_deployment("d1", 0);
        let group = compile(&deployment).unwrap();

        apply_group(&backend, &settings, &deployment, &group)
            .await
            .unwrap();

        let namespace = deployment_namespace(&deployment.id);
        assert!(backend.list_services(&namespace).await.unwrap().is_empty());
        assert_eq!(backend.list_workloads(&namespace).await.unwrap().len(), 1);
        // Only the deny policy without exposed ports.
        assert_eq!(backend.object_count(), 3);
    }

    #[tokio::test]
    async fn concurrent_deployments_own_distinct_namespaces() {
        let backend = MemoryBackend::new();
        let settings = ProviderSettings::default();

        for id in ["d1", "d2"] {
            let deployment = test_deployment(id, 80);
            let group = compile(&deployment).unwrap();
            apply_group(&backend, &settings, &deployment, &group)
                .await
                .unwrap();
        }

        let ns1 = deployment_namespace(&"d1".to_string());
        let ns2 = deployment_namespace(&"d2".to_string());
        assert_ne!(ns1, ns2);
        assert_eq!(backend.list_workloads(&ns1).await.unwrap().len(), 1);
        assert_eq!(backend.list_workloads(&ns2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_group_removes_everything() {
        let backend = MemoryBackend::new();
        let settings = ProviderSettings::default();
        let deployment = test_deployment("d1", 80);
        let group = compile(&deployment).unwrap();

        apply_group(&backend, &settings, &deployment, &group)
            .await
            .unwrap();
        assert!(delete_group(&backend, &deployment.id).await.unwrap());
        assert_eq!(backend.object_count(), 0);
    }

    #[tokio::test]
    async fn invalid_settings_fail_before_any_mutation() {
        let backend = MemoryBackend::new();
        let settings = ProviderSettings {
            cluster_public_hostname: String::new(),
            ..Default::default()
        };
        let deployment = test_deployment("d1", 80);
        let group = compile(&deployment).unwrap();

        let err = apply_group(&backend, &settings, &deployment, &group).await;
        assert!(err.is_err());
        assert_eq!(backend.object_count(), 0);
        assert_eq!(backend.op_counts().creates, 0);
    }

    #[tokio::test]
    async fn delete_of_absent_namespace_is_idempotent_success() {
        let backend = MemoryBackend::new();
        let existed = delete_group(&backend, &"never-applied".to_string())
            .await
            .unwrap();
        assert!(!existed);
    }
}
