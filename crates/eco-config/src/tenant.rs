//! Tenant (application) configuration
//!
//! One record per tenant. The name doubles as DNS label and as
//! resource-naming prefix; both forms are fixed at validation time.

use crate::error::{ConfigSubject, ConfigValidationError};
use crate::naming::{
    auth_domain_prefix, host_name, is_valid_dns_label, normalize_label, title_case,
    MAX_TENANT_LABEL_LEN,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Highest routing-rule priority a listener accepts
pub const MAX_RULE_PRIORITY: u32 = 50_000;

/// Tenant document as it appears on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawTenantConfig {
    /// Unique tenant name; DNS label and resource prefix
    pub name: Option<String>,
    /// Backend container image reference
    #[serde(alias = "backend_docker_image")]
    pub container_image: Option<String>,
    /// Task CPU units (Fargate size)
    pub total_task_cpu: Option<i64>,
    /// Task memory in MiB (Fargate size)
    pub total_task_memory: Option<i64>,
    /// First priority of the band reserved for this tenant's routing rules
    pub alb_priority_band: Option<i64>,
}

/// Tenant list document: `{"apps": [...]}` or a bare list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawTenantList {
    /// Wrapped form
    Wrapped {
        /// Tenant records in build order
        apps: Vec<RawTenantConfig>,
    },
    /// Bare list
    List(Vec<RawTenantConfig>),
}

impl RawTenantList {
    /// Tenant records in document order
    #[must_use]
    pub fn into_records(self) -> Vec<RawTenantConfig> {
        match self {
            Self::Wrapped { apps } | Self::List(apps) => apps,
        }
    }
}

/// Validated, immutable tenant configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantConfig {
    name: String,
    label: String,
    prefix: String,
    container_image: String,
    task_cpu: u32,
    task_memory: u32,
    priority_band: u32,
}

impl TenantConfig {
    /// Validate one raw record; `position` names unnamed records in errors
    pub fn from_raw(raw: RawTenantConfig, position: usize) -> Result<Self, ConfigValidationError> {
        let name = match raw.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                return Err(ConfigValidationError::tenant(
                    format!("#{position}"),
                    "name",
                    "must not be blank",
                ))
            }
            None => {
                return Err(ConfigValidationError::missing(
                    ConfigSubject::Tenant(format!("#{position}")),
                    "name",
                ))
            }
        };

        let label = normalize_label(&name);
        if !is_valid_dns_label(&label) {
            return Err(ConfigValidationError::tenant(
                &name,
                "name",
                format!("'{label}' is not a valid DNS label"),
            ));
        }
        if label.len() > MAX_TENANT_LABEL_LEN {
            return Err(ConfigValidationError::tenant(
                &name,
                "name",
                format!("must be at most {MAX_TENANT_LABEL_LEN} characters"),
            ));
        }

        let container_image = raw
            .container_image
            .ok_or_else(|| missing(&name, "container_image"))?;
        if container_image.is_empty() || container_image.chars().any(char::is_whitespace) {
            return Err(ConfigValidationError::tenant(
                &name,
                "container_image",
                "must be a non-empty image reference without whitespace",
            ));
        }

        let task_cpu = positive(
            raw.total_task_cpu.ok_or_else(|| missing(&name, "total_task_cpu"))?,
            &name,
            "total_task_cpu",
        )?;
        let task_memory = positive(
            raw.total_task_memory
                .ok_or_else(|| missing(&name, "total_task_memory"))?,
            &name,
            "total_task_memory",
        )?;
        if !is_valid_fargate_size(task_cpu, task_memory) {
            return Err(ConfigValidationError::tenant(
                &name,
                "total_task_memory",
                format!("{task_memory} MiB is not a valid Fargate size for {task_cpu} CPU units"),
            ));
        }

        let priority_band = positive(
            raw.alb_priority_band
                .ok_or_else(|| missing(&name, "alb_priority_band"))?,
            &name,
            "alb_priority_band",
        )?;
        if priority_band > MAX_RULE_PRIORITY {
            return Err(ConfigValidationError::tenant(
                &name,
                "alb_priority_band",
                format!("must be at most {MAX_RULE_PRIORITY}"),
            ));
        }

        let prefix = title_case(&label);
        Ok(Self {
            name,
            label,
            prefix,
            container_image,
            task_cpu,
            task_memory,
            priority_band,
        })
    }

    /// Name as written in the document
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-normalized DNS label
    #[inline]
    #[must_use]
    pub fn dns_label(&self) -> &str {
        &self.label
    }

    /// Title-cased resource prefix
    #[inline]
    #[must_use]
    pub fn resource_prefix(&self) -> &str {
        &self.prefix
    }

    /// Container image reference
    #[inline]
    #[must_use]
    pub fn container_image(&self) -> &str {
        &self.container_image
    }

    /// Task CPU units
    #[inline]
    #[must_use]
    pub fn task_cpu(&self) -> u32 {
        self.task_cpu
    }

    /// Task memory in MiB
    #[inline]
    #[must_use]
    pub fn task_memory(&self) -> u32 {
        self.task_memory
    }

    /// First priority of the tenant's band
    #[inline]
    #[must_use]
    pub fn priority_band(&self) -> u32 {
        self.priority_band
    }

    /// Full host name inside `zone`
    #[must_use]
    pub fn host_name(&self, zone: &str) -> String {
        host_name(&self.label, zone)
    }

    /// Auth domain prefix
    #[must_use]
    pub fn auth_domain_prefix(&self) -> String {
        auth_domain_prefix(&self.label)
    }
}

/// Validate a whole tenant list, preserving order
///
/// Stops at the first invalid record.
pub fn validate_tenants(
    records: Vec<RawTenantConfig>,
) -> Result<Vec<TenantConfig>, ConfigValidationError> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, raw)| TenantConfig::from_raw(raw, i))
        .collect()
}

/// Whether a CPU/memory pair is a valid Fargate task size
#[must_use]
pub fn is_valid_fargate_size(cpu: u32, memory: u32) -> bool {
    let (min, max, step) = match cpu {
        256 => return matches!(memory, 512 | 1024 | 2048),
        512 => (1024, 4096, 1024),
        1024 => (2048, 8192, 1024),
        2048 => (4096, 16384, 1024),
        4096 => (8192, 30720, 1024),
        8192 => (16384, 61440, 4096),
        16384 => (32768, 122_880, 8192),
        _ => return false,
    };
    (min..=max).contains(&memory) && (memory - min) % step == 0
}

fn missing(name: &str, field: &'static str) -> ConfigValidationError {
    ConfigValidationError::missing(ConfigSubject::Tenant(name.to_string()), field)
}

fn positive(value: i64, name: &str, field: &'static str) -> Result<u32, ConfigValidationError> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigValidationError::tenant(
            name,
            field,
            format!("{value} must be a positive integer"),
        )),
    }
}
