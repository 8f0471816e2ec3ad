//! Loading configuration documents from disk in every supported format.

use eco_config::{load_network_config, load_tenant_configs, LoadError};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::Builder;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const NETWORK_JSON: &str = r#"{
    "vpc_cidr": "10.0.0.0/16",
    "domain_name": "app-ecosystem.example.com",
    "inbound_vpn_traffic_cidr": "172.16.0.0/12",
    "ecs_task_port": 8000,
    "rds_port": 5432,
    "s3_vpc_endpoint_ips": ["10.0.1.10", "10.0.2.10"]
}"#;

const NETWORK_YAML: &str = "
vpc_cidr: 10.0.0.0/16
domain_name: app-ecosystem.example.com
inbound_vpn_traffic_cidr: 172.16.0.0/12
ecs_task_port: 8000
rds_port: 5432
s3_vpc_endpoint_ips:
  - 10.0.1.10
  - 10.0.2.10
";

const NETWORK_TOML: &str = r#"
vpc_cidr = "10.0.0.0/16"
domain_name = "app-ecosystem.example.com"
inbound_vpn_traffic_cidr = "172.16.0.0/12"
ecs_task_port = 8000
rds_port = 5432
s3_vpc_endpoint_ips = ["10.0.1.10", "10.0.2.10"]
"#;

#[test]
fn network_config_is_format_independent() {
    let json = write_temp(".json", NETWORK_JSON);
    let yaml = write_temp(".yaml", NETWORK_YAML);
    let toml = write_temp(".toml", NETWORK_TOML);

    let a = load_network_config(json.path()).unwrap();
    let b = load_network_config(yaml.path()).unwrap();
    let c = load_network_config(toml.path()).unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.ecs_task_port(), 8000);
    assert_eq!(a.db_port(), 5432);
}

#[test]
fn tenant_list_from_yaml_and_toml() {
    let yaml = write_temp(
        ".yml",
        "
apps:
  - name: alpha
    backend_docker_image: ghcr.io/example/alpha:1.0
    total_task_cpu: 512
    total_task_memory: 1024
    alb_priority_band: 100
  - name: beta
    container_image: ghcr.io/example/beta:2.1
    total_task_cpu: 256
    total_task_memory: 512
    alb_priority_band: 200
",
    );
    let toml = write_temp(
        ".toml",
        r#"
[[apps]]
name = "alpha"
backend_docker_image = "ghcr.io/example/alpha:1.0"
total_task_cpu = 512
total_task_memory = 1024
alb_priority_band = 100

[[apps]]
name = "beta"
container_image = "ghcr.io/example/beta:2.1"
total_task_cpu = 256
total_task_memory = 512
alb_priority_band = 200
"#,
    );

    let from_yaml = load_tenant_configs(yaml.path()).unwrap();
    let from_toml = load_tenant_configs(toml.path()).unwrap();

    assert_eq!(from_yaml, from_toml);
    let bands: Vec<u32> = from_yaml.iter().map(|t| t.priority_band()).collect();
    assert_eq!(bands, vec![100, 200]);
    assert_eq!(from_yaml[0].container_image(), "ghcr.io/example/alpha:1.0");
}

#[test]
fn missing_file_is_io_error() {
    let err = load_network_config("/definitely/not/here/network.json").unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn missing_required_field_is_reported_by_name() {
    let file = write_temp(".json", r#"{"vpc_cidr": "10.0.0.0/16"}"#);
    let err = load_network_config(file.path()).unwrap_err();
    match err {
        LoadError::Invalid(e) => assert_eq!(e.field, "domain_name"),
        other => panic!("unexpected error: {other}"),
    }
}
