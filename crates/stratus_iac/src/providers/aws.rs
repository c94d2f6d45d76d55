//! AWS renderer.

use stratus_model::{CloudProvider, DatabaseEngine};

use crate::hcl::{HclBlock, HclValue};
use crate::provider::{tags, ProviderProfile, ProviderRenderer, RenderContext};

const PROFILE: ProviderProfile = ProviderProfile {
    region: "us-east-1",
    zone: None,
    version_constraint: "~> 5.0",
    instance_size: "t2.micro",
    database_size: "db.t2.micro",
    image: "ami-0c55b159cbfafe1f0",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AwsRenderer;

impl AwsRenderer {
    fn engine(engine: DatabaseEngine) -> (&'static str, &'static str, &'static [&'static str]) {
        match engine {
            DatabaseEngine::PostgreSql => ("postgres", "15", &["postgresql", "upgrade"]),
            DatabaseEngine::MariaDb => ("mariadb", "10.11", &["audit", "error", "general", "slowquery"]),
            _ => ("mysql", "8.0", &["error", "general", "slowquery"]),
        }
    }
}

impl ProviderRenderer for AwsRenderer {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    fn profile(&self) -> ProviderProfile {
        PROFILE
    }

    fn provider_block(&self) -> HclBlock {
        HclBlock::new("provider").label("aws").attr("region", PROFILE.region)
    }

    fn network(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        vec![
            HclBlock::resource("aws_vpc", format!("network_{}", index))
                .attr("cidr_block", format!("10.{}.0.0/16", index - 1))
                .attr("enable_dns_hostnames", true)
                .attr("enable_dns_support", true)
                .gap()
                .attr("tags", tags(&format!("network-{}", index))),
            HclBlock::resource("aws_subnet", format!("subnet_{}", index))
                .expr("vpc_id", format!("aws_vpc.network_{}.id", index))
                .attr("cidr_block", format!("10.{}.1.0/24", index - 1))
                .attr("map_public_ip_on_launch", false)
                .gap()
                .attr("tags", tags(&format!("private-subnet-{}", index))),
        ]
    }

    fn security_boundary(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        let mut sg = HclBlock::resource("aws_security_group", format!("sg_{}", index))
            .attr("name", format!("sg-{}", index))
            .attr("description", "Least privilege: HTTPS inbound only");
        if ctx.has_network() {
            sg = sg.expr("vpc_id", "aws_vpc.network_1.id");
        }

        vec![sg
            .block(
                HclBlock::new("ingress")
                    .attr("description", "HTTPS")
                    .attr("from_port", 443)
                    .attr("to_port", 443)
                    .attr("protocol", "tcp")
                    .attr("cidr_blocks", HclValue::strings(["0.0.0.0/0"])),
            )
            .block(
                HclBlock::new("egress")
                    .attr("from_port", 0)
                    .attr("to_port", 0)
                    .attr("protocol", "-1")
                    .attr("cidr_blocks", HclValue::strings(["0.0.0.0/0"])),
            )
            .attr("tags", tags(&format!("sg-{}", index)))]
    }

    fn compute(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        let server = HclBlock::resource("aws_instance", format!("server_{}", index))
            .attr("ami", PROFILE.image)
            .attr("instance_type", PROFILE.instance_size)
            .expr("subnet_id", "aws_subnet.subnet_1.id")
            .gap()
            .attr("vpc_security_group_ids", HclValue::exprs(["aws_security_group.sg_1.id"]))
            .block(HclBlock::new("metadata_options").attr("http_tokens", "required"))
            .with_defaults(&ctx.compute_defaults)
            .attr("tags", tags(&format!("server-{}", index)));
        vec![server]
    }

    fn load_balancer(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        let lb = format!("lb_{}", index);
        vec![
            HclBlock::resource("aws_lb", &lb)
                .attr("name", format!("lb-{}", index))
                .attr("internal", false)
                .attr("load_balancer_type", "application")
                .attr("drop_invalid_header_fields", true)
                .attr("security_groups", HclValue::exprs(["aws_security_group.sg_1.id"]))
                .attr("subnets", HclValue::exprs(["aws_subnet.subnet_1.id"]))
                .gap()
                .attr("tags", tags(&format!("lb-{}", index))),
            HclBlock::resource("aws_lb_target_group", &lb)
                .attr("name", format!("lb-{}-targets", index))
                .attr("port", 443)
                .attr("protocol", "HTTPS")
                .expr("vpc_id", "aws_vpc.network_1.id")
                .block(
                    HclBlock::new("health_check")
                        .attr("path", "/")
                        .attr("protocol", "HTTPS")
                        .attr("healthy_threshold", 3)
                        .attr("unhealthy_threshold", 3),
                ),
            HclBlock::resource("aws_lb_listener", format!("{}_https", lb))
                .expr("load_balancer_arn", format!("aws_lb.{}.arn", lb))
                .attr("port", 443)
                .attr("protocol", "HTTPS")
                .attr("ssl_policy", "ELBSecurityPolicy-TLS13-1-2-2021-06")
                .expr("certificate_arn", "var.lb_certificate_arn")
                .block(
                    HclBlock::new("default_action")
                        .attr("type", "forward")
                        .expr("target_group_arn", format!("aws_lb_target_group.{}.arn", lb)),
                ),
        ]
    }

    fn database(&self, index: u32, engine: DatabaseEngine, ctx: &RenderContext) -> Vec<HclBlock> {
        let (name, version, logs) = Self::engine(engine);
        let db = HclBlock::resource("aws_db_instance", format!("db_{}", index))
            .attr("identifier", format!("db-{}", index))
            .attr("engine", name)
            .attr("engine_version", version)
            .attr("instance_class", PROFILE.database_size)
            .attr("allocated_storage", 20)
            .gap()
            .attr("db_name", "appdb")
            .attr("username", "dbadmin")
            .expr("password", "var.db_password")
            .gap()
            .attr("vpc_security_group_ids", HclValue::exprs(["aws_security_group.sg_1.id"]))
            .attr("enabled_cloudwatch_logs_exports", HclValue::strings(logs.iter().copied()))
            .attr("deletion_protection", true)
            .attr("skip_final_snapshot", false)
            .attr("final_snapshot_identifier", format!("db-{}-final", index))
            .gap()
            .comment("Security policy defaults")
            .with_defaults(&ctx.database_defaults)
            .gap()
            .attr("tags", tags(&format!("database-{}", index)));
        vec![db]
    }

    fn supports_engine(&self, engine: DatabaseEngine) -> bool {
        !matches!(engine, DatabaseEngine::MongoDb)
    }
}
