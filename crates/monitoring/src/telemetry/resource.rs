use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use std::fs;
use uuid::Uuid;

use super::constants::resource;

/// Metadata attached to everything a process emits. Captured once per
/// process, so every forked worker gets its own pid and instance id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAttributes {
    pub service_name: String,
    pub namespace: String,
    pub version: String,
    pub instance_id: String,
    pub environment: String,
    pub worker_pid: u32,
}

impl ResourceAttributes {
    pub fn capture(service_name: &str, environment: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            namespace: node_name(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instance_id: Uuid::new_v4().to_string(),
            environment: environment.to_string(),
            worker_pid: std::process::id(),
        }
    }

    pub fn key_values(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new(resource::SERVICE_NAME, self.service_name.clone()),
            KeyValue::new(resource::SERVICE_NAMESPACE, self.namespace.clone()),
            KeyValue::new(resource::SERVICE_VERSION, self.version.clone()),
            KeyValue::new(resource::SERVICE_INSTANCE_ID, self.instance_id.clone()),
            KeyValue::new(resource::DEPLOYMENT_ENVIRONMENT, self.environment.clone()),
            KeyValue::new(resource::WORKER, i64::from(self.worker_pid)),
        ]
    }

    pub fn to_resource(&self) -> Resource {
        Resource::builder()
            .with_service_name(self.service_name.clone())
            .with_attributes(self.key_values())
            .build()
    }
}

fn node_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
