//! Explicit partial updates for services.
//!
//! `ServicePatch` replaces the zero-value merge convention with optional
//! fields, so "set memory to zero" and "leave memory alone" are distinct.
//! All fields default to absent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Service, StorageSpec};

/// A value-level patch over one [`Service`]. Absent fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Vec<StorageSpec>>,
}

impl ServicePatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.image.is_none()
            && self.port.is_none()
            && self.env.is_none()
            && self.arguments.is_none()
            && self.cpu.is_none()
            && self.memory_mb.is_none()
            && self.storage.is_none()
    }
}

impl Service {
    /// Apply a patch in place. Present fields overwrite, absent fields
    /// are kept — including present-but-zero values.
    pub fn apply_patch(&mut self, patch: &ServicePatch) {
        if let Some(image) = &patch.image {
            self.image = image.clone();
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(env) = &patch.env {
            self.env = env.clone();
        }
        if let Some(arguments) = &patch.arguments {
            self.arguments = arguments.clone();
        }
        if let Some(cpu) = patch.cpu {
            self.resources.cpu = cpu;
        }
        if let Some(memory_mb) = patch.memory_mb {
            self.resources.memory_mb = memory_mb;
        }
        if let Some(storage) = &patch.storage {
            self.resources.storage = storage.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComputeResources;

    fn test_service() -> Service {
        Service {
            image: "nginx:1.14.2".to_string(),
            port: 80,
            resources: ComputeResources::new(0.5, 256, vec![StorageSpec::ephemeral(100)]),
            ..Default::default()
        }
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut service = test_service();
        let before = service.clone();

        service.apply_patch(&ServicePatch::default());
        assert_eq!(service, before);
        assert!(ServicePatch::default().is_empty());
    }

    #[test]
    fn patch_overwrites_present_fields_only() {
        let mut service = test_service();
        service.apply_patch(&ServicePatch {
            image: Some("redis:7".to_string()),
            cpu: Some(1.0),
            ..Default::default()
        });

        assert_eq!(service.image, "redis:7");
        assert_eq!(service.resources.cpu, 1.0);
        // Untouched.
        assert_eq!(service.port, 80);
        assert_eq!(service.resources.memory_mb, 256);
    }

    #[test]
    fn patch_can_set_explicit_zero() {
        // The zero-value merge cannot express this; the patch can.
        let mut service = test_service();
        service.apply_patch(&ServicePatch {
            memory_mb: Some(0),
            port: Some(0),
            ..Default::default()
        });

        assert_eq!(service.resources.memory_mb, 0);
        assert_eq!(service.port, 0);
    }

    #[test]
    fn patch_serializes_without_absent_fields() {
        let patch = ServicePatch {
            cpu: Some(2.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, "{\"cpu\":2.0}");
    }
}
