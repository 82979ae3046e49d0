//! Deployment → workload group compilation.
//!
//! Pure and side-effect-free: validation first, then a per-service
//! transformation. Nothing is emitted on validation failure.

use uuid::Uuid;

use caravel_core::{Deployment, Service};

use crate::error::{CompileError, CompileResult};
use crate::group::{Protocol, ServiceExpose, Workload, WorkloadGroup};
use crate::units::ResourceUnits;

/// Every workload runs a single replica; scaling happens by updating the
/// deployment, not by fanning out replicas here.
const WORKLOAD_REPLICAS: u32 = 1;

/// Compile a deployment into its backend-ready workload group.
///
/// Fails with a [`CompileError`] if the deployment ID is empty, the
/// deployment has no services, or any service has an empty image. No
/// partial group is produced.
pub fn compile(deployment: &Deployment) -> CompileResult<WorkloadGroup> {
    if deployment.id.is_empty() {
        return Err(CompileError::EmptyDeploymentId);
    }
    if deployment.services.is_empty() {
        return Err(CompileError::NoServices);
    }

    let workloads = deployment
        .services
        .iter()
        .map(compile_service)
        .collect::<CompileResult<Vec<_>>>()?;

    Ok(WorkloadGroup { workloads })
}

fn compile_service(service: &Service) -> CompileResult<Workload> {
    if service.image.is_empty() {
        return Err(CompileError::EmptyImage);
    }

    Ok(Workload {
        name: workload_name(&service.image),
        image: service.image.clone(),
        command: Vec::new(),
        args: service.arguments.clone(),
        env: serialize_env(service),
        resources: ResourceUnits::from_compute(&service.resources),
        expose: expose_from_port(service.port),
        replicas: WORKLOAD_REPLICAS,
    })
}

/// Derive a unique workload name from an image reference.
///
/// The tag suffix (everything after `:`) is stripped and a random suffix
/// appended, so repeated compilations of the same image never collide.
/// The name doubles as the correlation key when exposed ports are read
/// back from the backend.
fn workload_name(image: &str) -> String {
    let base = image.split(':').next().unwrap_or(image);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{base}-{suffix}")
}

/// Serialize the env map as `KEY=VALUE` strings.
///
/// Env is a mapping, not ordered data; the output order is unspecified.
fn serialize_env(service: &Service) -> Vec<String> {
    service
        .env
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}

/// A nonzero declared port yields exactly one globally reachable TCP
/// exposure with matching internal and external ports; zero means the
/// service is not exposed at all.
fn expose_from_port(port: u16) -> Vec<ServiceExpose> {
    if port == 0 {
        return Vec::new();
    }
    vec![ServiceExpose {
        port,
        external_port: port,
        proto: Protocol::Tcp,
        global: true,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::{ComputeResources, StorageSpec};
    use std::collections::HashMap;

    fn nginx_deployment() -> Deployment {
        Deployment {
            id: "d1".to_string(),
            services: vec![Service {
                image: "nginx:1.14.2".to_string(),
                port: 80,
                resources: ComputeResources::new(0.1, 100, vec![StorageSpec::ephemeral(100)]),
                ..Default::default()
            }],
            ..Deployment::new("test", "web", vec![])
        }
    }

    #[test]
    fn compiles_single_service_deployment() {
        let group = compile(&nginx_deployment()).unwrap();

        assert_eq!(group.workloads.len(), 1);
        let workload = &group.workloads[0];
        assert_eq!(workload.image, "nginx:1.14.2");
        assert_eq!(workload.replicas, 1);
    }

    #[test]
    fn workload_name_strips_tag_and_appends_suffix() {
        let group = compile(&nginx_deployment()).unwrap();
        let name = &group.workloads[0].name;

        assert!(name.starts_with("nginx-"));
        assert!(!name.contains(':'));
        assert!(!name.contains("1.14.2"));
        // The suffix is a 32-char hex uuid.
        assert_eq!(name.len(), "nginx-".len() + 32);
    }

    #[test]
    fn workload_names_are_collision_resistant() {
        let a = compile(&nginx_deployment()).unwrap();
        let b = compile(&nginx_deployment()).unwrap();
        assert_ne!(a.workloads[0].name, b.workloads[0].name);
    }

    #[test]
    fn untagged_image_used_as_is() {
        let mut deployment = nginx_deployment();
        deployment.services[0].image = "redis".to_string();

        let group = compile(&deployment).unwrap();
        assert!(group.workloads[0].name.starts_with("redis-"));
    }

    #[test]
    fn exposure_record_for_declared_port() {
        let group = compile(&nginx_deployment()).unwrap();
        let expose = &group.workloads[0].expose;

        assert_eq!(expose.len(), 1);
        assert_eq!(
            expose[0],
            ServiceExpose {
                port: 80,
                external_port: 80,
                proto: Protocol::Tcp,
                global: true,
            }
        );
    }

    #[test]
    fn zero_port_means_no_exposure() {
        let mut deployment = nginx_deployment();
        deployment.services[0].port = 0;

        let group = compile(&deployment).unwrap();
        assert!(group.workloads[0].expose.is_empty());
    }

    #[test]
    fn resource_units_from_declared_resources() {
        let group = compile(&nginx_deployment()).unwrap();
        let units = &group.workloads[0].resources;

        assert_eq!(units.cpu_milli.limit, 100);
        assert_eq!(units.memory_bytes.limit, 100_000_000);
        assert_eq!(units.storage[0].quantity.limit, 100_000_000);
        // Requests start equal to limits; commit levels apply later.
        assert_eq!(units.cpu_milli.requested, 100);
    }

    #[test]
    fn env_serialized_as_key_value_pairs() {
        let mut deployment = nginx_deployment();
        let mut env = HashMap::new();
        env.insert("A".to_string(), "1".to_string());
        env.insert("B".to_string(), "two=2".to_string());
        deployment.services[0].env = env;

        let group = compile(&deployment).unwrap();
        let mut serialized = group.workloads[0].env.clone();
        // Env is unordered; sort before asserting contents.
        serialized.sort();
        assert_eq!(serialized, vec!["A=1", "B=two=2"]);
    }

    #[test]
    fn empty_deployment_id_rejected() {
        let mut deployment = nginx_deployment();
        deployment.id = String::new();

        assert_eq!(compile(&deployment), Err(CompileError::EmptyDeploymentId));
    }

    #[test]
    fn deployment_without_services_rejected() {
        let mut deployment = nginx_deployment();
        deployment.services.clear();

        assert_eq!(compile(&deployment), Err(CompileError::NoServices));
    }

    #[test]
    fn service_with_empty_image_rejected() {
        let mut deployment = nginx_deployment();
        deployment.services.push(Service::default());

        assert_eq!(compile(&deployment), Err(CompileError::EmptyImage));
    }

    #[test]
    fn multi_service_deployments_keep_order() {
        let mut deployment = nginx_deployment();
        deployment.services.push(Service {
            image: "redis:7".to_string(),
            port: 0,
            ..Default::default()
        });

        let group = compile(&deployment).unwrap();
        assert_eq!(group.workloads.len(), 2);
        assert!(group.workloads[0].name.starts_with("nginx-"));
        assert!(group.workloads[1].name.starts_with("redis-"));
    }

    #[test]
    fn arguments_carried_through() {
        let mut deployment = nginx_deployment();
        deployment.services[0].arguments =
            vec!["--worker-processes".to_string(), "4".to_string()];

        let group = compile(&deployment).unwrap();
        assert_eq!(group.workloads[0].args, vec!["--worker-processes", "4"]);
        assert!(group.workloads[0].command.is_empty());
    }
}
