//! Builders from compiled workloads to backend resources.
//!
//! Each builder produces the desired object; the matching `merge_*`
//! function produces the update body for an upsert, preserving the
//! backend-owned parts of the existing object (status, allocated node
//! ports).

use std::collections::HashMap;

use caravel_backend::{
    ClusterService, ContainerPort, ContainerSpec, EnvVar, IngressRule, Namespace, NetworkPolicy,
    ResourceList, ResourceRequirements, ServiceKind, ServicePort, VolumeClaim, Workload,
    WorkloadKind, WorkloadStatus,
};
use caravel_core::Deployment;
use caravel_manifest::{self as manifest, WorkloadGroup};

use crate::naming::{
    LABEL_DEPLOYMENT_ID, LABEL_OWNER, LABEL_WORKLOAD, NODE_PORT_SUFFIX,
};
use crate::settings::ProviderSettings;

/// Policy denying ingress from outside the namespace.
pub const POLICY_DENY_INGRESS: &str = "deny-ingress-default";

/// Policy allowing external traffic to explicitly exposed ports.
pub const POLICY_ALLOW_EXPOSED: &str = "allow-exposed-ports";

// ── Namespace ──────────────────────────────────────────────────────

/// The namespace owning every resource of one deployment.
pub fn build_namespace(deployment: &Deployment, namespace: &str) -> Namespace {
    let mut labels = HashMap::new();
    labels.insert(LABEL_DEPLOYMENT_ID.to_string(), deployment.id.clone());
    labels.insert(LABEL_OWNER.to_string(), deployment.owner.clone());
    Namespace {
        name: namespace.to_string(),
        labels,
    }
}

/// Desired wins on update; the namespace carries no backend-owned state.
pub fn merge_namespace(_existing: &Namespace, desired: Namespace) -> Namespace {
    desired
}

// ── Network policies ───────────────────────────────────────────────

/// The desired policy set for a deployment's namespace: deny cross-tenant
/// traffic by default, allow intra-deployment traffic, and open the
/// globally exposed ports.
pub fn build_policies(namespace: &str, group: &WorkloadGroup) -> Vec<NetworkPolicy> {
    let mut policies = vec![NetworkPolicy {
        name: POLICY_DENY_INGRESS.to_string(),
        namespace: namespace.to_string(),
        labels: HashMap::new(),
        ingress: vec![IngressRule {
            allow_same_namespace: true,
            ports: Vec::new(),
        }],
    }];

    let mut exposed: Vec<u16> = group
        .workloads
        .iter()
        .flat_map(|w| w.expose_with_visibility(true))
        .map(|e| e.external_port)
        .collect();
    exposed.sort_unstable();
    exposed.dedup();

    if !exposed.is_empty() {
        policies.push(NetworkPolicy {
            name: POLICY_ALLOW_EXPOSED.to_string(),
            namespace: namespace.to_string(),
            labels: HashMap::new(),
            ingress: vec![IngressRule {
                allow_same_namespace: false,
                ports: exposed,
            }],
        });
    }

    policies
}

/// Desired wins on update.
pub fn merge_policy(_existing: &NetworkPolicy, desired: NetworkPolicy) -> NetworkPolicy {
    desired
}

// ── Workloads ──────────────────────────────────────────────────────

/// Build the backend workload for one compiled service.
///
/// The workload kind is decided here and nowhere else: any persistent
/// storage quantity makes it stateful, otherwise it is freely replicated.
/// Requests come from the commit-level arithmetic; limits always carry
/// the full declared quantities.
pub fn build_workload(
    namespace: &str,
    workload: &manifest::Workload,
    settings: &ProviderSettings,
) -> Workload {
    let committed = workload.resources.commit(&settings.commit_levels);

    let mut requests = ResourceList {
        cpu_milli: committed.cpu_milli.requested,
        memory_bytes: committed.memory_bytes.requested,
        storage_bytes: 0,
    };
    let mut limits = ResourceList {
        cpu_milli: committed.cpu_milli.limit,
        memory_bytes: committed.memory_bytes.limit,
        storage_bytes: 0,
    };

    // Ephemeral storage rides on the container; persistent quantities
    // become volume claims instead.
    if let Some(ephemeral) = committed.storage.iter().find(|s| !s.persistent) {
        requests.storage_bytes = ephemeral.quantity.requested;
        limits.storage_bytes = ephemeral.quantity.limit;
    }

    let kind = if committed.has_persistent_storage() {
        WorkloadKind::Stateful {
            volume_claims: committed
                .storage
                .iter()
                .filter(|s| s.persistent)
                .enumerate()
                .map(|(idx, s)| VolumeClaim {
                    name: format!("{}-data-{idx}", workload.name),
                    quantity_bytes: s.quantity.limit,
                    class: s.class.clone(),
                })
                .collect(),
        }
    } else {
        WorkloadKind::Replicated
    };

    let container = ContainerSpec {
        name: workload.name.clone(),
        image: workload.image.clone(),
        command: workload.command.clone(),
        args: workload.args.clone(),
        env: workload.env.iter().map(|e| parse_env(e)).collect(),
        ports: workload
            .expose
            .iter()
            .map(|e| ContainerPort {
                container_port: e.port,
            })
            .collect(),
        resources: ResourceRequirements { requests, limits },
    };

    let mut labels = HashMap::new();
    labels.insert(LABEL_WORKLOAD.to_string(), workload.name.clone());

    Workload {
        name: workload.name.clone(),
        namespace: namespace.to_string(),
        kind,
        labels,
        replicas: workload.replicas,
        containers: vec![container],
        image_pull_secret: settings.image_pull_secret.clone(),
        status: WorkloadStatus::default(),
    }
}

/// Update body for a workload upsert: desired spec, existing status.
pub fn merge_workload(existing: &Workload, mut desired: Workload) -> Workload {
    desired.status = existing.status.clone();
    desired
}

/// An env entry is `KEY=VALUE`; a bare `KEY` sets an empty value.
fn parse_env(entry: &str) -> EnvVar {
    match entry.split_once('=') {
        Some((name, value)) => EnvVar {
            name: name.to_string(),
            value: value.to_string(),
        },
        None => EnvVar {
            name: entry.to_string(),
            value: String::new(),
        },
    }
}

// ── Cluster services ───────────────────────────────────────────────

/// Cluster-local service for a workload's non-global exposure records.
/// `None` when the workload declares no such record.
pub fn build_local_service(namespace: &str, workload: &manifest::Workload) -> Option<ClusterService> {
    let records = workload.expose_with_visibility(false);
    if records.is_empty() {
        return None;
    }

    Some(ClusterService {
        name: workload.name.clone(),
        namespace: namespace.to_string(),
        kind: ServiceKind::ClusterIp,
        selector: selector_for(workload),
        ports: records
            .iter()
            .map(|e| ServicePort {
                port: e.external_port,
                target_port: e.port,
                node_port: 0,
            })
            .collect(),
    })
}

/// Node-port service for a workload's global exposure records, named
/// with the node-port suffix so read-back can correlate it.
pub fn build_global_service(
    namespace: &str,
    workload: &manifest::Workload,
) -> Option<ClusterService> {
    let records = workload.expose_with_visibility(true);
    if records.is_empty() {
        return None;
    }

    Some(ClusterService {
        name: format!("{}{NODE_PORT_SUFFIX}", workload.name),
        namespace: namespace.to_string(),
        kind: ServiceKind::NodePort,
        selector: selector_for(workload),
        ports: records
            .iter()
            .map(|e| ServicePort {
                port: e.external_port,
                target_port: e.port,
                node_port: 0,
            })
            .collect(),
    })
}

/// Update body for a service upsert: allocated node ports are
/// backend-owned and survive across updates.
pub fn merge_service(existing: &ClusterService, mut desired: ClusterService) -> ClusterService {
    for port in &mut desired.ports {
        if port.node_port == 0
            && let Some(prev) = existing.ports.iter().find(|p| p.port == port.port)
        {
            port.node_port = prev.node_port;
        }
    }
    desired
}

fn selector_for(workload: &manifest::Workload) -> HashMap<String, String> {
    let mut selector = HashMap::new();
    selector.insert(LABEL_WORKLOAD.to_string(), workload.name.clone());
    selector
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::{ComputeResources, Service, StorageSpec};
    use caravel_manifest::{CommitLevels, compile};

    fn compiled_workload(port: u16, storage: Vec<StorageSpec>) -> manifest::Workload {
        let deployment = Deployment {
            id: "d1".to_string(),
            services: vec![Service {
                image: "nginx:1.14.2".to_string(),
                port,
                resources: ComputeResources::new(0.1, 100, storage),
                ..Default::default()
            }],
            ..Deployment::new("alice", "web", vec![])
        };
        compile(&deployment).unwrap().workloads.remove(0)
    }

    #[test]
    fn namespace_carries_owner_and_id_labels() {
        let deployment = Deployment {
            id: "d1".to_string(),
            ..Deployment::new("alice", "web", vec![])
        };
        let ns = build_namespace(&deployment, "cv-abc");

        assert_eq!(ns.name, "cv-abc");
        assert_eq!(ns.labels.get(LABEL_OWNER).unwrap(), "alice");
        assert_eq!(ns.labels.get(LABEL_DEPLOYMENT_ID).unwrap(), "d1");
    }

    #[test]
    fn policies_deny_by_default_and_open_exposed_ports() {
        let workload = compiled_workload(80, vec![]);
        let group = WorkloadGroup {
            workloads: vec![workload],
        };

        let policies = build_policies("cv-abc", &group);
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0].name, POLICY_DENY_INGRESS);
        assert!(policies[0].ingress[0].allow_same_namespace);
        assert_eq!(policies[1].name, POLICY_ALLOW_EXPOSED);
        assert_eq!(policies[1].ingress[0].ports, vec![80]);
    }

    #[test]
    fn no_exposure_means_deny_policy_only() {
        let workload = compiled_workload(0, vec![]);
        let group = WorkloadGroup {
            workloads: vec![workload],
        };

        let policies = build_policies("cv-abc", &group);
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name, POLICY_DENY_INGRESS);
    }

    #[test]
    fn workload_without_persistent_storage_is_replicated() {
        let workload = compiled_workload(80, vec![StorageSpec::ephemeral(100)]);
        let built = build_workload("cv-abc", &workload, &ProviderSettings::default());

        assert_eq!(built.kind, WorkloadKind::Replicated);
        let resources = built.containers[0].resources;
        assert_eq!(resources.limits.storage_bytes, 100_000_000);
        assert_eq!(resources.requests.storage_bytes, 100_000_000);
    }

    #[test]
    fn persistent_storage_selects_stateful_kind() {
        let workload = compiled_workload(
            80,
            vec![StorageSpec {
                quantity_mb: 500,
                persistent: true,
                class: Some("fast".to_string()),
            }],
        );
        let built = build_workload("cv-abc", &workload, &ProviderSettings::default());

        match &built.kind {
            WorkloadKind::Stateful { volume_claims } => {
                assert_eq!(volume_claims.len(), 1);
                assert_eq!(volume_claims[0].quantity_bytes, 500_000_000);
                assert_eq!(volume_claims[0].class.as_deref(), Some("fast"));
            }
            other => panic!("expected stateful workload, got {other:?}"),
        }
        // Persistent quantities do not ride on the container.
        assert_eq!(built.containers[0].resources.limits.storage_bytes, 0);
    }

    #[test]
    fn commit_levels_shrink_requests_not_limits() {
        let workload = compiled_workload(80, vec![]);
        let settings = ProviderSettings {
            commit_levels: CommitLevels {
                cpu: 2.0,
                memory: 4.0,
                storage: 1.0,
            },
            ..Default::default()
        };
        let built = build_workload("cv-abc", &workload, &settings);

        let resources = built.containers[0].resources;
        assert_eq!(resources.limits.cpu_milli, 100);
        assert_eq!(resources.requests.cpu_milli, 50);
        assert_eq!(resources.limits.memory_bytes, 100_000_000);
        assert_eq!(resources.requests.memory_bytes, 25_000_000);
    }

    #[test]
    fn image_pull_secret_attached_when_configured() {
        let workload = compiled_workload(80, vec![]);
        let settings = ProviderSettings {
            image_pull_secret: Some("registry-creds".to_string()),
            ..Default::default()
        };

        let built = build_workload("cv-abc", &workload, &settings);
        assert_eq!(built.image_pull_secret.as_deref(), Some("registry-creds"));
    }

    #[test]
    fn env_parsing_handles_bare_keys_and_embedded_equals() {
        assert_eq!(
            parse_env("A=1"),
            EnvVar {
                name: "A".to_string(),
                value: "1".to_string()
            }
        );
        assert_eq!(
            parse_env("B=two=2"),
            EnvVar {
                name: "B".to_string(),
                value: "two=2".to_string()
            }
        );
        assert_eq!(
            parse_env("FLAG"),
            EnvVar {
                name: "FLAG".to_string(),
                value: String::new()
            }
        );
    }

    #[test]
    fn global_exposure_builds_node_port_service_only() {
        let workload = compiled_workload(80, vec![]);

        assert!(build_local_service("cv-abc", &workload).is_none());
        let global = build_global_service("cv-abc", &workload).unwrap();
        assert_eq!(global.kind, ServiceKind::NodePort);
        assert!(global.name.ends_with(NODE_PORT_SUFFIX));
        assert_eq!(global.ports[0].port, 80);
        assert_eq!(global.ports[0].node_port, 0);
    }

    #[test]
    fn unexposed_workload_builds_no_services() {
        let workload = compiled_workload(0, vec![]);
        assert!(build_local_service("cv-abc", &workload).is_none());
        assert!(build_global_service("cv-abc", &workload).is_none());
    }

    #[test]
    fn merge_service_keeps_allocated_node_ports() {
        let workload = compiled_workload(80, vec![]);
        let mut existing = build_global_service("cv-abc", &workload).unwrap();
        existing.ports[0].node_port = 30123;

        let desired = build_global_service("cv-abc", &workload).unwrap();
        let merged = merge_service(&existing, desired);
        assert_eq!(merged.ports[0].node_port, 30123);
    }

    #[test]
    fn merge_workload_keeps_backend_status() {
        let workload = compiled_workload(80, vec![]);
        let mut existing = build_workload("cv-abc", &workload, &ProviderSettings::default());
        existing.status.ready_replicas = 1;

        let desired = build_workload("cv-abc", &workload, &ProviderSettings::default());
        let merged = merge_workload(&existing, desired);
        assert_eq!(merged.status.ready_replicas, 1);
    }
}
