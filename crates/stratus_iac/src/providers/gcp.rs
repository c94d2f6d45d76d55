//! GCP renderer.

use stratus_model::{CloudProvider, DatabaseEngine};

use crate::hcl::{HclBlock, HclValue};
use crate::provider::{ProviderProfile, ProviderRenderer, RenderContext};

const PROFILE: ProviderProfile = ProviderProfile {
    region: "us-central1",
    zone: Some("us-central1-a"),
    version_constraint: "~> 5.0",
    instance_size: "f1-micro",
    database_size: "db-f1-micro",
    image: "debian-cloud/debian-11",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct GcpRenderer;

impl GcpRenderer {
    fn zone() -> &'static str {
        PROFILE.zone.unwrap_or("us-central1-a")
    }

    fn network_ref(ctx: &RenderContext) -> HclValue {
        if ctx.has_network() {
            HclValue::expr("google_compute_network.network_1.name")
        } else {
            HclValue::from("default")
        }
    }
}

impl ProviderRenderer for GcpRenderer {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gcp
    }

    fn profile(&self) -> ProviderProfile {
        PROFILE
    }

    fn provider_block(&self) -> HclBlock {
        HclBlock::new("provider")
            .label("google")
            .expr("project", "var.gcp_project_id")
            .attr("region", PROFILE.region)
    }

    fn network(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        vec![
            HclBlock::resource("google_compute_network", format!("network_{}", index))
                .attr("name", format!("vpc-{}", index))
                .attr("auto_create_subnetworks", false),
            HclBlock::resource("google_compute_subnetwork", format!("subnet_{}", index))
                .attr("name", format!("subnet-private-{}", index))
                .attr("ip_cidr_range", format!("10.{}.1.0/24", index - 1))
                .attr("region", PROFILE.region)
                .expr("network", format!("google_compute_network.network_{}.id", index))
                .attr("private_ip_google_access", true),
        ]
    }

    fn security_boundary(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        vec![HclBlock::resource("google_compute_firewall", format!("sg_{}", index))
            .attr("name", format!("fw-{}-https", index))
            .attr("network", Self::network_ref(ctx))
            .attr("direction", "INGRESS")
            .block(
                HclBlock::new("allow")
                    .attr("protocol", "tcp")
                    .attr("ports", HclValue::strings(["443"])),
            )
            .gap()
            .attr("source_ranges", HclValue::strings(["0.0.0.0/0"]))
            .attr("target_tags", HclValue::strings([format!("sg-{}", index)]))]
    }

    fn compute(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        let server = HclBlock::resource("google_compute_instance", format!("server_{}", index))
            .attr("name", format!("server-{}", index))
            .attr("machine_type", PROFILE.instance_size)
            .attr("zone", Self::zone())
            .attr("tags", HclValue::strings(["sg-1"]))
            .block(HclBlock::new("boot_disk").block(HclBlock::new("initialize_params").attr("image", PROFILE.image)))
            .block(HclBlock::new("network_interface").expr("subnetwork", "google_compute_subnetwork.subnet_1.id"))
            .attr("metadata", HclValue::map([("block-project-ssh-keys", true)]))
            .with_defaults(&ctx.compute_defaults)
            .attr("labels", HclValue::map([("managed_by", "stratus")]));
        vec![server]
    }

    fn load_balancer(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        let lb = format!("lb_{}", index);
        let instances: Vec<String> = (1..=ctx.spec.servers())
            .map(|i| format!("google_compute_instance.server_{}.self_link", i))
            .collect();

        vec![
            HclBlock::resource("google_compute_health_check", &lb)
                .attr("name", format!("lb-{}-health", index))
                .block(
                    HclBlock::new("https_health_check")
                        .attr("port", 443)
                        .attr("request_path", "/"),
                ),
            HclBlock::resource("google_compute_instance_group", &lb)
                .attr("name", format!("lb-{}-pool", index))
                .attr("zone", Self::zone())
                .attr("instances", HclValue::exprs(instances))
                .block(HclBlock::new("named_port").attr("name", "https").attr("port", 443)),
            HclBlock::resource("google_compute_backend_service", &lb)
                .attr("name", format!("lb-{}-backend", index))
                .attr("protocol", "HTTPS")
                .attr("port_name", "https")
                .attr("health_checks", HclValue::exprs([format!("google_compute_health_check.{}.id", lb)]))
                .block(HclBlock::new("backend").expr("group", format!("google_compute_instance_group.{}.id", lb)))
                .block(HclBlock::new("log_config").attr("enable", true)),
            HclBlock::resource("google_compute_url_map", &lb)
                .attr("name", format!("lb-{}", index))
                .expr("default_service", format!("google_compute_backend_service.{}.id", lb)),
            HclBlock::resource("google_compute_target_https_proxy", &lb)
                .attr("name", format!("lb-{}-proxy", index))
                .expr("url_map", format!("google_compute_url_map.{}.id", lb))
                .attr("ssl_certificates", HclValue::exprs(["var.gcp_ssl_certificate"])),
            HclBlock::resource("google_compute_global_forwarding_rule", &lb)
                .attr("name", format!("lb-{}-https", index))
                .expr("target", format!("google_compute_target_https_proxy.{}.id", lb))
                .attr("port_range", "443"),
        ]
    }

    fn database(&self, index: u32, engine: DatabaseEngine, ctx: &RenderContext) -> Vec<HclBlock> {
        let version = match engine {
            DatabaseEngine::PostgreSql => "POSTGRES_15",
            _ => "MYSQL_8_0",
        };
        let db = format!("db_{}", index);
        let mut instance = HclBlock::resource("google_sql_database_instance", &db)
            .attr("name", format!("db-{}", index))
            .attr("database_version", version)
            .attr("region", PROFILE.region)
            .attr("deletion_protection", true)
            .block(HclBlock::new("settings").attr("tier", PROFILE.database_size));
        if ctx.has_network() {
            instance.set_path("settings.ip_configuration.private_network", HclValue::expr("google_compute_network.network_1.id"));
        }

        vec![
            instance.with_defaults(&ctx.database_defaults),
            HclBlock::resource("google_sql_user", format!("{}_admin", db))
                .attr("name", "dbadmin")
                .expr("instance", format!("google_sql_database_instance.{}.name", db))
                .expr("password", "var.db_password"),
        ]
    }

    fn supports_engine(&self, engine: DatabaseEngine) -> bool {
        matches!(engine, DatabaseEngine::MySql | DatabaseEngine::PostgreSql)
    }
}
