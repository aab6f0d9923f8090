//! Endpoint resolution.
//!
//! Calls without an explicit host go to `open.volcengineapi.com`, except in
//! bootstrap regions where services listed in the registry get their own
//! host: `<service><suffix>` for global services and
//! `<service>.<region><suffix>` for regional ones.

use crate::EnvConfig;

/// Host used when no service-specific endpoint applies.
pub const DEFAULT_ENDPOINT: &str = "open.volcengineapi.com";

/// Domain suffix of service endpoints.
pub const ENDPOINT_SUFFIX: &str = ".volcengineapi.com";

/// Domain suffix of dual-stack service endpoints.
pub const DUAL_STACK_ENDPOINT_SUFFIX: &str = ".volcengine-api.com";

/// Regions that always resolve to service-specific endpoints.
pub const BOOTSTRAP_REGIONS: [&str; 5] = [
    "cn-beijing-autodriving",
    "ap-southeast-2",
    "ap-southeast-3",
    "cn-shanghai-autodriving",
    "cn-beijing-selfdrive",
];

/// A registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Service code, as used in requests.
    pub service: &'static str,
    /// Global services have one endpoint for all regions.
    pub is_global: bool,
}

const fn regional(service: &'static str) -> ServiceEndpoint {
    ServiceEndpoint {
        service,
        is_global: false,
    }
}

const fn global(service: &'static str) -> ServiceEndpoint {
    ServiceEndpoint {
        service,
        is_global: true,
    }
}

// Lookups are case-sensitive; some services are registered under several spellings.
static SERVICES: &[ServiceEndpoint] = &[
    regional("vpc"),
    regional("ecs"),
    global("billing"),
    regional("ark"),
    global("iam"),
    regional("mcs"),
    regional("rocketmq"),
    regional("bytehouse"),
    global("dns"),
    regional("autoscaling"),
    regional("spark"),
    regional("cloud_detect"),
    regional("filenas"),
    regional("escloud"),
    regional("flink"),
    regional("cp"),
    regional("vefaas"),
    regional("ml_platform"),
    global("edx"),
    global("dcdn"),
    global("cdn"),
    regional("kafka"),
    global("certificate_service"),
    global("waf"),
    regional("rds_mssql"),
    regional("cloudtrail"),
    global("vei_api"),
    global("cen"),
    regional("rabbitmq"),
    regional("vmp"),
    regional("volc_observe"),
    regional("dataleap"),
    global("fw_center"),
    regional("redis"),
    global("mcdn"),
    regional("cloudidentity"),
    regional("vedbm"),
    global("cv"),
    global("translate"),
    regional("cloud_trail"),
    regional("bio"),
    global("nta"),
    regional("elasticmapreduce"),
    regional("vepfs"),
    global("seccenter"),
    global("advdefence"),
    global("tis"),
    global("organization"),
    regional("vke"),
    regional("Redis"),
    regional("privatelink"),
    regional("RocketMQ"),
    regional("Kafka"),
    regional("rds_mysql"),
    regional("rds_postgresql"),
    regional("storage_ebs"),
    regional("clb"),
    regional("alb"),
    regional("FileNAS"),
    regional("configcenter"),
    regional("cr"),
    regional("sts"),
    regional("mongodb"),
    regional("transitrouter"),
    regional("Volc_Observe"),
    regional("dms"),
    regional("auto_scaling"),
    regional("directconnect"),
    regional("kms"),
    regional("dbw"),
    regional("dts"),
    regional("natgateway"),
    regional("tos"),
    regional("TLS"),
    regional("vpn"),
    regional("vod"),
    global("quota"),
    global("ecs_ops"),
    global("as_ops"),
    global("account_management"),
    global("account_management_byteplus"),
    global("bandwidthquota"),
    global("psa_manager"),
    regional("dc_controller"),
    regional("eps_platform_trade"),
    regional("eps_platform_fund"),
    global("commercialization"),
    regional("veecp_openapi"),
    global("orgnization"),
    global("coze"),
    global("sec_agent"),
    global("sec_intelligent_dev"),
    regional("vegame"),
    global("acep"),
    global("private_zone"),
    regional("sqs"),
    global("resourcecenter"),
    global("aiotvideo"),
    regional("apig"),
    regional("bmq"),
    regional("bytehouse_ce"),
    regional("cloudmonitor"),
    regional("emr"),
    global("ga"),
    regional("graph"),
    global("gtm"),
    regional("hbase"),
    regional("metakms"),
    global("na"),
    global("resource_share"),
    global("speech_saas_prod"),
    global("tag"),
    regional("vefaas_dev"),
    regional("vms"),
    global("eco_partner"),
    global("smc"),
];

/// Returns the registry entry for `service`, matched case-sensitively.
#[must_use]
pub fn lookup_service(service: &str) -> Option<ServiceEndpoint> {
    SERVICES.iter().find(|entry| entry.service == service).copied()
}

/// Returns every registry entry.
#[must_use]
pub fn services() -> &'static [ServiceEndpoint] {
    SERVICES
}

/// Lower-cases a service code and replaces `_` with `-` for use in a host name.
#[must_use]
pub fn standardize_service_code(service: &str) -> String {
    service.to_lowercase().replace('_', "-")
}

/// Inputs to [`EndpointResolver::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct EndpointQuery<'a> {
    /// Service code.
    pub service: &'a str,
    /// Region code.
    pub region: &'a str,
    /// Extra bootstrap regions from the client configuration.
    pub custom_bootstrap_regions: &'a [String],
    /// Dual-stack preference from the client configuration.
    pub use_dual_stack: Option<bool>,
}

/// Maps a service and region to a host.
pub trait EndpointResolver: Send + Sync + 'static {
    /// Returns the host for `query`, or `None` to leave the request's host unset.
    fn resolve(&self, query: &EndpointQuery<'_>) -> Option<String>;
}

/// Resolver backed by the built-in service registry.
///
/// # Example
///
/// ```
/// use volcstack_config::{DefaultEndpointResolver, EndpointQuery, EndpointResolver, EnvConfig};
///
/// let resolver = DefaultEndpointResolver::new(EnvConfig::default());
/// let host = resolver.resolve(&EndpointQuery {
///     service: "ecs",
///     region: "ap-southeast-2",
///     custom_bootstrap_regions: &[],
///     use_dual_stack: None,
/// });
/// assert_eq!(host.as_deref(), Some("ecs.ap-southeast-2.volcengineapi.com"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultEndpointResolver {
    env: EnvConfig,
}

impl DefaultEndpointResolver {
    /// Creates a resolver using the given environment snapshot for the
    /// dual-stack flag and the bootstrap region file.
    #[must_use]
    pub fn new(env: EnvConfig) -> Self {
        Self { env }
    }

    /// Creates a resolver from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(EnvConfig::from_env())
    }

    fn is_bootstrap_region(&self, region: &str, custom: &[String]) -> bool {
        BOOTSTRAP_REGIONS.contains(&region)
            || custom.iter().any(|r| r.trim() == region)
            || self.env.bootstrap_regions().iter().any(|r| r == region)
    }

    fn dual_stack(&self, configured: Option<bool>) -> bool {
        configured.unwrap_or(self.env.enable_dual_stack)
    }
}

impl EndpointResolver for DefaultEndpointResolver {
    fn resolve(&self, query: &EndpointQuery<'_>) -> Option<String> {
        let region = query.region.trim();

        if !self.is_bootstrap_region(region, query.custom_bootstrap_regions) {
            return Some(DEFAULT_ENDPOINT.to_string());
        }

        let Some(entry) = lookup_service(query.service) else {
            return Some(DEFAULT_ENDPOINT.to_string());
        };

        let suffix = if self.dual_stack(query.use_dual_stack) {
            DUAL_STACK_ENDPOINT_SUFFIX
        } else {
            ENDPOINT_SUFFIX
        };

        let service = standardize_service_code(entry.service);
        Some(if entry.is_global {
            format!("{service}{suffix}")
        } else {
            format!("{service}.{region}{suffix}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(resolver: &DefaultEndpointResolver, service: &str, region: &str) -> String {
        resolver
            .resolve(&EndpointQuery {
                service,
                region,
                custom_bootstrap_regions: &[],
                use_dual_stack: None,
            })
            .unwrap()
    }

    #[test]
    fn test_registry_size_and_spellings() {
        assert_eq!(services().len(), 116);
        assert!(lookup_service("Redis").is_some());
        assert!(lookup_service("redis").is_some());
        assert!(lookup_service("REDIS").is_none());
        assert!(lookup_service("iam").unwrap().is_global);
        assert!(!lookup_service("ecs").unwrap().is_global);
    }

    #[test]
    fn test_registry_has_no_duplicates() {
        let mut names: Vec<&str> = services().iter().map(|s| s.service).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), services().len());
    }

    #[test]
    fn test_standardize_service_code() {
        assert_eq!(standardize_service_code("rds_mysql"), "rds-mysql");
        assert_eq!(standardize_service_code("Volc_Observe"), "volc-observe");
    }

    #[test]
    fn test_non_bootstrap_region_uses_default() {
        let resolver = DefaultEndpointResolver::default();
        assert_eq!(resolve(&resolver, "ecs", "cn-beijing"), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_unknown_service_uses_default() {
        let resolver = DefaultEndpointResolver::default();
        assert_eq!(resolve(&resolver, "unknown", "ap-southeast-2"), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_regional_and_global_services() {
        let resolver = DefaultEndpointResolver::default();
        assert_eq!(
            resolve(&resolver, "rds_mysql", "ap-southeast-3"),
            "rds-mysql.ap-southeast-3.volcengineapi.com"
        );
        assert_eq!(resolve(&resolver, "iam", "ap-southeast-2"), "iam.volcengineapi.com");
        assert_eq!(
            resolve(&resolver, "ecs", " cn-beijing-autodriving "),
            "ecs.cn-beijing-autodriving.volcengineapi.com"
        );
    }

    #[test]
    fn test_dual_stack_from_config_and_env() {
        let resolver = DefaultEndpointResolver::default();
        let host = resolver.resolve(&EndpointQuery {
            service: "ecs",
            region: "ap-southeast-2",
            custom_bootstrap_regions: &[],
            use_dual_stack: Some(true),
        });
        assert_eq!(host.as_deref(), Some("ecs.ap-southeast-2.volcengine-api.com"));

        let env_resolver = DefaultEndpointResolver::new(EnvConfig {
            enable_dual_stack: true,
            ..Default::default()
        });
        assert_eq!(resolve(&env_resolver, "iam", "ap-southeast-2"), "iam.volcengine-api.com");

        let host = env_resolver.resolve(&EndpointQuery {
            service: "iam",
            region: "ap-southeast-2",
            custom_bootstrap_regions: &[],
            use_dual_stack: Some(false),
        });
        assert_eq!(host.as_deref(), Some("iam.volcengineapi.com"));
    }

    #[test]
    fn test_custom_bootstrap_region() {
        let resolver = DefaultEndpointResolver::default();
        let custom = vec!["cn-guilin-boe".to_string()];
        let host = resolver.resolve(&EndpointQuery {
            service: "vpc",
            region: "cn-guilin-boe",
            custom_bootstrap_regions: &custom,
            use_dual_stack: None,
        });
        assert_eq!(host.as_deref(), Some("vpc.cn-guilin-boe.volcengineapi.com"));
    }

    #[test]
    fn test_bootstrap_region_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions");
        std::fs::write(&path, "cn-from-file\n").unwrap();

        let resolver = DefaultEndpointResolver::new(EnvConfig {
            bootstrap_region_list_conf: Some(path),
            ..Default::default()
        });
        assert_eq!(
            resolve(&resolver, "clb", "cn-from-file"),
            "clb.cn-from-file.volcengineapi.com"
        );
    }
}
