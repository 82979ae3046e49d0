//! Status read-back — reconstructing the abstract deployment from live
//! backend state.
//!
//! Workloads map back to services; exposure objects join by workload
//! name, with node-port services taking priority over cluster-local ones.
//! Backend state that cannot be mapped (a workload with zero containers,
//! a status with zero conditions) is a data-integrity error, not
//! something to paper over.

use std::collections::HashMap;

use caravel_backend::{
    BackendClient, BackendError, ConditionStatus, ServiceKind, Workload, WorkloadCondition,
};
use caravel_core::{
    ComputeResources, Deployment, DeploymentId, DeploymentState, ReplicasStatus, Service,
    ServiceState, StorageSpec,
};

use crate::error::{ApplyError, ApplyResult};
use crate::naming::{LABEL_OWNER, NODE_PORT_SUFFIX, deployment_namespace};

/// Megabyte-equivalent unit in bytes, for the inverse resource mapping.
const BYTES_PER_MB: u64 = 1_000_000;

/// Reconstruct a deployment's live service status from the backend.
pub async fn read_deployment(
    backend: &dyn BackendClient,
    id: &DeploymentId,
) -> ApplyResult<Deployment> {
    let namespace = deployment_namespace(id);

    let Some(ns) = backend.get_namespace(&namespace).await? else {
        return Err(BackendError::not_found("namespace", &namespace).into());
    };

    let workloads = backend.list_workloads(&namespace).await?;
    let port_map = exposed_port_map(backend, &namespace).await?;

    let services = workloads
        .iter()
        .map(|w| workload_to_service(w, &port_map))
        .collect::<ApplyResult<Vec<_>>>()?;

    Ok(Deployment {
        id: id.clone(),
        owner: ns.labels.get(LABEL_OWNER).cloned().unwrap_or_default(),
        state: DeploymentState::Active,
        services,
        ..Deployment::new("", "", vec![])
    })
}

/// Join key: workload name → externally visible port.
///
/// Node-port services (named with the node-port suffix) take priority
/// over cluster-local services for the same workload.
async fn exposed_port_map(
    backend: &dyn BackendClient,
    namespace: &str,
) -> ApplyResult<HashMap<String, u16>> {
    let services = backend.list_services(namespace).await?;
    let mut ports = HashMap::new();

    for service in &services {
        if service.kind != ServiceKind::ClusterIp {
            continue;
        }
        if let Some(port) = service.ports.first() {
            ports.insert(service.name.clone(), port.port);
        }
    }
    for service in &services {
        if service.kind != ServiceKind::NodePort {
            continue;
        }
        if let Some(port) = service.ports.first()
            && port.node_port != 0
        {
            let workload = service
                .name
                .strip_suffix(NODE_PORT_SUFFIX)
                .unwrap_or(&service.name);
            ports.insert(workload.to_string(), port.node_port);
        }
    }

    Ok(ports)
}

fn workload_to_service(
    workload: &Workload,
    port_map: &HashMap<String, u16>,
) -> ApplyResult<Service> {
    let Some(container) = workload.containers.first() else {
        return Err(ApplyError::Inconsistent(format!(
            "workload {} has no containers",
            workload.name
        )));
    };
    if workload.status.conditions.is_empty() {
        return Err(ApplyError::Inconsistent(format!(
            "workload {} has no status conditions",
            workload.name
        )));
    }

    // Declared usage comes back from the enforcement limits, not the
    // (possibly overcommitted) requests.
    let limits = container.resources.limits;
    let storage_mb = (limits.storage_bytes / BYTES_PER_MB) as i64;
    let resources = ComputeResources {
        cpu: limits.cpu_milli as f64 / 1000.0,
        memory_mb: (limits.memory_bytes / BYTES_PER_MB) as i64,
        storage: if storage_mb > 0 {
            vec![StorageSpec::ephemeral(storage_mb)]
        } else {
            Vec::new()
        },
    };

    // Stable sort: among equal transition times, later list entries win.
    let mut conditions = workload.status.conditions.clone();
    conditions.sort_by_key(|c| c.last_transition);
    let latest = conditions.last().unwrap();

    Ok(Service {
        name: workload.name.clone(),
        image: container.image.clone(),
        port: container
            .ports
            .first()
            .map(|p| p.container_port)
            .unwrap_or(0),
        expose_port: port_map.get(&workload.name).copied().unwrap_or(0),
        resources,
        replicas: ReplicasStatus {
            total: workload.status.replicas,
            ready: workload.status.ready_replicas,
            available: workload.status.available_replicas,
        },
        state: condition_state(latest),
        error_message: most_recent_failure(&conditions),
        ..Default::default()
    })
}

fn condition_state(condition: &WorkloadCondition) -> ServiceState {
    match condition.status {
        ConditionStatus::True => ServiceState::Normal,
        ConditionStatus::False => ServiceState::Error,
        ConditionStatus::Unknown => ServiceState::Unknown,
    }
}

/// Message of the most recent failing condition, empty when none failed.
/// Expects `conditions` already sorted by transition time.
fn most_recent_failure(conditions: &[WorkloadCondition]) -> String {
    conditions
        .iter()
        .rev()
        .find(|c| c.status == ConditionStatus::False)
        .map(|c| c.message.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_group;
    use crate::settings::ProviderSettings;
    use caravel_backend::{MemoryBackend, WorkloadKind, WorkloadStatus};
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

    async fn applied(backend: &MemoryBackend, deployment: &Deployment) {
        let group = compile(deployment).unwrap();
        apply_group(backend, &ProviderSettings::default(), deployment, &group)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reads_back_applied_deployment() {
        let backend = MemoryBackend::new();
        let deployment = test_deployment("d1", 80);
        applied(&backend, &deployment).await;

        let live = read_deployment(&backend, &deployment.id).await.unwrap();

        assert_eq!(live.id, "d1");
        assert_eq!(live.owner, "alice");
        assert_eq!(live.services.len(), 1);

        let service = &live.services[0];
        assert_eq!(service.image, "nginx:1.14.2");
        assert!(service.name.starts_with("nginx-"));
        assert_eq!(service.port, 80);
        // Node-port services surface the backend-allocated port.
        assert!(service.expose_port >= 30000);
        assert_eq!(service.state, ServiceState::Normal);
        assert_eq!(service.replicas.ready, 1);
    }

    #[tokio::test]
    async fn resource_usage_comes_from_limits() {
        let backend = MemoryBackend::new();
        let deployment = test_deployment("d1", 80);
        applied(&backend, &deployment).await;

        let live = read_deployment(&backend, &deployment.id).await.unwrap();
        let resources = &live.services[0].resources;

        assert_eq!(resources.cpu, 0.1);
        assert_eq!(resources.memory_mb, 100);
        assert_eq!(resources.storage[0].quantity_mb, 100);
    }

    #[tokio::test]
    async fn unexposed_workload_reads_back_zero_expose_port() {
        let backend = MemoryBackend::new();
        let mut deployment = test_deployment("d1", 0);
        deployment.services.push(Service {
            image: "worker:2".to_string(),
            port: 0,
            ..Default::default()
        });
        applied(&backend, &deployment).await;

        let live = read_deployment(&backend, &deployment.id).await.unwrap();
        assert_eq!(live.services.len(), 2);
        for service in &live.services {
            assert_eq!(service.expose_port, 0);
        }
    }

    #[tokio::test]
    async fn absent_namespace_fails_read() {
        let backend = MemoryBackend::new();
        let err = read_deployment(&backend, &"nope".to_string()).await;
        assert!(matches!(err, Err(ApplyError::Backend(_))));
    }

    #[tokio::test]
    async fn zero_conditions_is_an_integrity_error() {
        let backend = MemoryBackend::new();
        let deployment = test_deployment("d1", 80);
        applied(&backend, &deployment).await;

        let namespace = deployment_namespace(&deployment.id);
        let workload = &backend.list_workloads(&namespace).await.unwrap()[0];
        backend.set_workload_status(&namespace, &workload.name, WorkloadStatus::default());

        let err = read_deployment(&backend, &deployment.id).await;
        assert!(matches!(err, Err(ApplyError::Inconsistent(_))));
    }

    #[tokio::test]
    async fn zero_containers_is_an_integrity_error() {
        let backend = MemoryBackend::new();
        let deployment = test_deployment("d1", 80);
        applied(&backend, &deployment).await;

        let namespace = deployment_namespace(&deployment.id);
        backend
            .create_workload(&caravel_backend::Workload {
                name: "empty".to_string(),
                namespace: namespace.clone(),
                kind: WorkloadKind::Replicated,
                labels: HashMap::new(),
                replicas: 1,
                containers: vec![],
                image_pull_secret: None,
                status: WorkloadStatus::default(),
            })
            .await
            .unwrap();

        let err = read_deployment(&backend, &deployment.id).await;
        assert!(matches!(err, Err(ApplyError::Inconsistent(_))));
    }

    #[tokio::test]
    async fn failing_condition_surfaces_error_message() {
        let backend = MemoryBackend::new();
        let deployment = test_deployment("d1", 80);
        applied(&backend, &deployment).await;

        let namespace = deployment_namespace(&deployment.id);
        let workload = backend.list_workloads(&namespace).await.unwrap().remove(0);
        backend.set_workload_status(
            &namespace,
            &workload.name,
            WorkloadStatus {
                replicas: 1,
                ready_replicas: 0,
                available_replicas: 0,
                conditions: vec![
                    WorkloadCondition {
                        status: ConditionStatus::True,
                        message: "progressing".to_string(),
                        last_transition: 1,
                    },
                    WorkloadCondition {
                        status: ConditionStatus::False,
                        message: "image pull backoff".to_string(),
                        last_transition: 2,
                    },
                ],
            },
        );

        let live = read_deployment(&backend, &deployment.id).await.unwrap();
        let service = &live.services[0];
        assert_eq!(service.state, ServiceState::Error);
        assert_eq!(service.error_message, "image pull backoff");
        assert_eq!(service.replicas.ready, 0);
    }

    #[tokio::test]
    async fn condition_ties_broken_by_list_order() {
        let backend = MemoryBackend::new();
        let deployment = test_deployment("d1", 80);
        applied(&backend, &deployment).await;

        let namespace = deployment_namespace(&deployment.id);
        let workload = backend.list_workloads(&namespace).await.unwrap().remove(0);
        backend.set_workload_status(
            &namespace,
            &workload.name,
            WorkloadStatus {
                replicas: 1,
                ready_replicas: 1,
                available_replicas: 1,
                conditions: vec![
                    WorkloadCondition {
                        status: ConditionStatus::False,
                        message: "first".to_string(),
                        last_transition: 5,
                    },
                    WorkloadCondition {
                        status: ConditionStatus::False,
                        message: "second".to_string(),
                        last_transition: 5,
                    },
                ],
            },
        );

        let live = read_deployment(&backend, &deployment.id).await.unwrap();
        assert_eq!(live.services[0].error_message, "second");
    }
}
