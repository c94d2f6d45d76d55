//! Integration tests for Terraform and playbook generation.

use std::fs;

use proptest::prelude::*;
use regex::Regex;
use stratus_iac::{BundleWriter, Generator};
use stratus_model::{
    CloudProvider, DatabaseEngine, InfrastructureRequest, ProviderInfraSpec, RawInfrastructure, RawProviderSpec,
    ResourceKind,
};
use stratus_policy::{ComplianceAuditor, HclDocument, PolicyRegistry};
use tempfile::tempdir;

fn count_kind(code: &str, provider: CloudProvider, kind: ResourceKind) -> u32 {
    HclDocument::parse(code)
        .unwrap()
        .resources()
        .filter(|r| provider.classify(r.resource_type) == Some(kind))
        .count() as u32
}

fn build(provider: CloudProvider, servers: u32, databases: u32, sgs: u32, lbs: u32) -> ProviderInfraSpec {
    ProviderInfraSpec::builder(provider)
        .servers(servers)
        .databases(databases)
        .networks(1)
        .security_groups(sgs)
        .load_balancers(lbs)
        .build()
        .unwrap()
}

#[test]
fn test_resource_counts_match_input() {
    let generator = Generator::default();

    for provider in CloudProvider::all() {
        for servers in [0u32, 1, 3] {
            for databases in [0u32, 1, 2] {
                for sgs in [0u32, 1, 2] {
                    for lbs in [0u32, 1] {
                        let spec = build(provider, servers, databases, sgs, lbs);
                        let code = generator.render(&spec);

                        assert_eq!(count_kind(&code, provider, ResourceKind::Compute), spec.servers());
                        assert_eq!(count_kind(&code, provider, ResourceKind::Database), spec.databases());
                        assert_eq!(
                            count_kind(&code, provider, ResourceKind::SecurityBoundary),
                            spec.security_groups()
                        );
                        assert_eq!(count_kind(&code, provider, ResourceKind::LoadBalancer), spec.load_balancers());
                        assert_eq!(count_kind(&code, provider, ResourceKind::Network), spec.networks());
                    }
                }
            }
        }
    }
}

#[test]
fn test_database_security_markers_present() {
    let public_true = Regex::new(
        r"(publicly_accessible|public_network_access_enabled|ipv4_enabled|\bpublic)\s*=\s*true",
    )
    .unwrap();
    let encryption = Regex::new(
        r"(storage_encrypted|infrastructure_encryption_enabled|encryption_key_name|\bencrypted)\s*=",
    )
    .unwrap();
    let backup = Regex::new(r"(backup_retention_period|backup_retention_days|retained_backups)\s*=\s*7").unwrap();
    let literal_password = Regex::new(r#"password\s*=\s*""#).unwrap();

    for provider in CloudProvider::all() {
        for engine in DatabaseEngine::all() {
            let spec = ProviderInfraSpec::builder(provider)
                .databases(1)
                .database_type(engine)
                .build()
                .unwrap();
            let code = Generator::default().render(&spec);

            assert!(!public_true.is_match(&code), "{} {}: public endpoint", provider, engine);
            assert!(encryption.is_match(&code), "{} {}: no encryption marker", provider, engine);
            assert!(backup.is_match(&code), "{} {}: no backup retention", provider, engine);
            assert!(!literal_password.is_match(&code), "{} {}: literal password", provider, engine);
            assert!(code.contains("variable \"db_password\""));
        }
    }
}

#[test]
fn test_generated_code_passes_audit_for_every_provider() {
    let auditor = ComplianceAuditor::default();

    for provider in CloudProvider::all() {
        let code = Generator::default().render(&build(provider, 2, 1, 1, 1));
        let report = auditor.audit(&code, None);

        assert_eq!(report.provider, Some(provider));
        assert!(report.is_compliant(), "{}: {:?}", provider, report.violations);
        assert_eq!(report.score, 100);
    }
}

#[test]
fn test_every_server_carries_monitoring_settings() {
    let registry = PolicyRegistry::builtin();
    let monitoring = registry.get("monitoring_enabled").unwrap();

    for provider in CloudProvider::all() {
        let code = Generator::default().render(&build(provider, 2, 0, 1, 0));
        let doc = HclDocument::parse(&code).unwrap();
        let servers: Vec<_> = doc
            .resources()
            .filter(|r| provider.classify(r.resource_type) == Some(ResourceKind::Compute))
            .collect();
        assert_eq!(servers.len(), 2);

        let settings: Vec<_> = monitoring
            .settings_for(provider)
            .filter(|s| s.target == ResourceKind::Compute)
            .collect();
        assert!(!settings.is_empty(), "{}", provider);

        for server in &servers {
            for setting in &settings {
                let path: Vec<&str> = setting.key.split('.').collect();
                let value = server.body.lookup(&path);
                assert!(
                    value.is_some_and(|v| setting.value.is_satisfied_by(v)),
                    "{} {} missing {}",
                    provider,
                    server.name,
                    setting.key
                );
            }
        }
    }

    let code = Generator::default().render(&build(CloudProvider::OpenStack, 1, 0, 1, 0));
    assert!(code.contains("monitoring = \"enabled\""));
}

#[test]
fn test_single_server_scenario() {
    let spec = InfrastructureRequest::from_raw(&RawInfrastructure::single(
        RawProviderSpec::new("aws")
            .with_servers(1)
            .with_databases(0)
            .with_networks(1)
            .with_load_balancers(0)
            .with_security_groups(1),
    ))
    .unwrap();
    let code = Generator::default().render(&spec.providers()[0]);

    assert_eq!(count_kind(&code, CloudProvider::Aws, ResourceKind::Compute), 1);
    assert_eq!(count_kind(&code, CloudProvider::Aws, ResourceKind::Network), 1);
    assert_eq!(count_kind(&code, CloudProvider::Aws, ResourceKind::SecurityBoundary), 1);
    assert_eq!(count_kind(&code, CloudProvider::Aws, ResourceKind::Database), 0);
}

#[test]
fn test_multi_provider_fan_out() {
    let raw = RawInfrastructure::new(vec![
        RawProviderSpec::new("aws").with_servers(2),
        RawProviderSpec::new("gcp").with_servers(3),
    ]);
    let request = InfrastructureRequest::from_raw(&raw).unwrap();
    let artifact = Generator::default().render_request(&request).unwrap();

    assert!(artifact.is_multi_provider());
    assert!(artifact.provisioning_code.contains("# Section 1/2: AWS"));
    assert!(artifact.provisioning_code.contains("# Section 2/2: GCP"));
    let first = artifact.provisioning_code.find("Section 1/2").unwrap();
    let second = artifact.provisioning_code.find("Section 2/2").unwrap();
    assert!(first < second);

    let aws = &artifact.sections[0];
    let gcp = &artifact.sections[1];
    assert_eq!(count_kind(&aws.provisioning_code, CloudProvider::Aws, ResourceKind::Compute), 2);
    assert_eq!(count_kind(&gcp.provisioning_code, CloudProvider::Gcp, ResourceKind::Compute), 3);
    assert!(count_kind(&gcp.provisioning_code, CloudProvider::Gcp, ResourceKind::Network) >= 1);

    assert!(artifact.playbook_code.contains("hosts: aws"));
    assert!(artifact.playbook_code.contains("hosts: gcp"));
}

#[test]
fn test_unknown_provider_falls_back_to_aws() {
    let raw = RawInfrastructure::single(RawProviderSpec::new("digitalocean").with_servers(1));
    let request = InfrastructureRequest::from_raw(&raw).unwrap();
    let code = Generator::default().render(&request.providers()[0]);

    assert!(code.contains("provider \"aws\""));
    assert!(code.contains("t2.micro"));
}

#[test]
fn test_bundle_writer_single_provider() {
    let dir = tempdir().unwrap();
    let request = InfrastructureRequest::single(build(CloudProvider::Gcp, 1, 1, 1, 0));
    let artifact = Generator::default().render_request(&request).unwrap();

    let written = BundleWriter::new(dir.path()).write(&artifact).unwrap();

    assert_eq!(written.len(), 4);
    assert!(dir.path().join("main.tf").exists());
    assert!(dir.path().join("playbook.yml").exists());
    assert!(dir.path().join(".gitignore").exists());
    let tfvars = fs::read_to_string(dir.path().join("terraform.tfvars.example")).unwrap();
    assert!(tfvars.contains("gcp_project_id = \"\""));
    assert!(tfvars.contains("TF_VAR_db_password"));
    assert_eq!(fs::read_to_string(dir.path().join("main.tf")).unwrap(), artifact.provisioning_code);
}

#[test]
fn test_bundle_writer_fan_out_directories() {
    let dir = tempdir().unwrap();
    let request = InfrastructureRequest::new(vec![
        build(CloudProvider::Aws, 1, 0, 1, 0),
        build(CloudProvider::Aws, 0, 1, 1, 0),
    ])
    .unwrap();
    let artifact = Generator::default().render_request(&request).unwrap();

    BundleWriter::new(dir.path()).write(&artifact).unwrap();

    assert!(dir.path().join("01-aws").join("main.tf").exists());
    assert!(dir.path().join("02-aws").join("main.tf").exists());
    assert!(dir.path().join("playbook.yml").exists());
    assert!(!dir.path().join("main.tf").exists());
}

fn arb_spec() -> impl Strategy<Value = ProviderInfraSpec> {
    (0usize..4, 0u32..4, 0u32..3, 0u32..3, 0u32..3, 0u32..2, 0usize..4).prop_map(
        |(p, servers, databases, networks, sgs, lbs, engine)| {
            ProviderInfraSpec::builder(CloudProvider::all()[p])
                .servers(servers)
                .databases(databases)
                .networks(networks)
                .security_groups(sgs)
                .load_balancers(lbs)
                .database_type(DatabaseEngine::all()[engine])
                .build()
                .unwrap()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_render_is_deterministic(spec in arb_spec()) {
        let generator = Generator::default();
        prop_assert_eq!(generator.render(&spec), generator.render(&spec));
    }

    #[test]
    fn prop_rendered_code_parses(spec in arb_spec()) {
        let code = Generator::default().render(&spec);
        prop_assert!(HclDocument::parse(&code).is_ok());
    }
}
