//! OpenStack renderer.

use stratus_model::{CloudProvider, DatabaseEngine};

use crate::hcl::{HclBlock, HclValue};
use crate::provider::{ProviderProfile, ProviderRenderer, RenderContext};

const PROFILE: ProviderProfile = ProviderProfile {
    region: "RegionOne",
    zone: None,
    version_constraint: "~> 1.0",
    instance_size: "m1.small",
    database_size: "db.small",
    image: "Ubuntu 20.04",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenStackRenderer;

impl OpenStackRenderer {
    fn datastore(engine: DatabaseEngine) -> (&'static str, &'static str) {
        match engine {
            DatabaseEngine::MySql => ("mysql", "8.0"),
            DatabaseEngine::PostgreSql => ("postgresql", "15"),
            DatabaseEngine::MariaDb => ("mariadb", "10.11"),
            DatabaseEngine::MongoDb => ("mongodb", "6.0"),
        }
    }
}

impl ProviderRenderer for OpenStackRenderer {
    fn provider(&self) -> CloudProvider {
        CloudProvider::OpenStack
    }

    fn profile(&self) -> ProviderProfile {
        PROFILE
    }

    fn provider_block(&self) -> HclBlock {
        HclBlock::new("provider")
            .label("openstack")
            .expr("auth_url", "var.openstack_auth_url")
            .attr("region", PROFILE.region)
    }

    fn network(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        vec![
            HclBlock::resource("openstack_networking_network_v2", format!("network_{}", index))
                .attr("name", format!("network-{}", index))
                .attr("admin_state_up", true),
            HclBlock::resource("openstack_networking_subnet_v2", format!("subnet_{}", index))
                .attr("name", format!("subnet-private-{}", index))
                .expr("network_id", format!("openstack_networking_network_v2.network_{}.id", index))
                .attr("cidr", format!("10.{}.1.0/24", index - 1))
                .attr("ip_version", 4),
        ]
    }

    fn security_boundary(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        let sg = format!("sg_{}", index);
        vec![
            HclBlock::resource("openstack_networking_secgroup_v2", &sg)
                .attr("name", format!("sg-{}", index))
                .attr("description", "Least privilege: HTTPS inbound only"),
            HclBlock::resource("openstack_networking_secgroup_rule_v2", format!("{}_https", sg))
                .attr("direction", "ingress")
                .attr("ethertype", "IPv4")
                .attr("protocol", "tcp")
                .attr("port_range_min", 443)
                .attr("port_range_max", 443)
                .attr("remote_ip_prefix", "0.0.0.0/0")
                .expr("security_group_id", format!("openstack_networking_secgroup_v2.{}.id", sg)),
        ]
    }

    fn compute(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        let server = HclBlock::resource("openstack_compute_instance_v2", format!("server_{}", index))
            .attr("name", format!("server-{}", index))
            .attr("image_name", PROFILE.image)
            .attr("flavor_name", PROFILE.instance_size)
            .attr("security_groups", HclValue::exprs(["openstack_networking_secgroup_v2.sg_1.name"]))
            .attr("metadata", HclValue::map([("role", "server")]))
            .block(
                HclBlock::new("block_device")
                    .expr("uuid", "var.openstack_image_id")
                    .attr("source_type", "image")
                    .attr("destination_type", "volume")
                    .attr("volume_size", 20)
                    .attr("boot_index", 0)
                    .attr("delete_on_termination", true),
            )
            .block(HclBlock::new("network").expr("uuid", "openstack_networking_network_v2.network_1.id"))
            .with_defaults(&ctx.compute_defaults);
        vec![server]
    }

    fn load_balancer(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        let lb = format!("lb_{}", index);
        vec![
            HclBlock::resource("openstack_lb_loadbalancer_v2", &lb)
                .attr("name", format!("lb-{}", index))
                .expr("vip_subnet_id", "openstack_networking_subnet_v2.subnet_1.id")
                .attr("security_group_ids", HclValue::exprs(["openstack_networking_secgroup_v2.sg_1.id"])),
            HclBlock::resource("openstack_lb_listener_v2", format!("{}_https", lb))
                .attr("name", format!("lb-{}-https", index))
                .attr("protocol", "HTTPS")
                .attr("protocol_port", 443)
                .expr("loadbalancer_id", format!("openstack_lb_loadbalancer_v2.{}.id", lb)),
            HclBlock::resource("openstack_lb_pool_v2", &lb)
                .attr("name", format!("lb-{}-pool", index))
                .attr("protocol", "HTTPS")
                .attr("lb_method", "ROUND_ROBIN")
                .expr("listener_id", format!("openstack_lb_listener_v2.{}_https.id", lb)),
            HclBlock::resource("openstack_lb_monitor_v2", &lb)
                .expr("pool_id", format!("openstack_lb_pool_v2.{}.id", lb))
                .attr("type", "HTTPS")
                .attr("url_path", "/")
                .attr("delay", 10)
                .attr("timeout", 5)
                .attr("max_retries", 3),
        ]
    }

    fn database(&self, index: u32, engine: DatabaseEngine, ctx: &RenderContext) -> Vec<HclBlock> {
        let (datastore, version) = Self::datastore(engine);
        let db = HclBlock::resource("openstack_db_instance_v1", format!("db_{}", index))
            .attr("name", format!("db-{}", index))
            .attr("region", PROFILE.region)
            .attr("flavor_id", PROFILE.database_size)
            .attr("size", 20)
            .block(HclBlock::new("datastore").attr("type", datastore).attr("version", version))
            .block(HclBlock::new("network").expr("uuid", "openstack_networking_network_v2.network_1.id"))
            .block(
                HclBlock::new("user")
                    .attr("name", "dbadmin")
                    .expr("password", "var.db_password"),
            )
            .gap()
            .comment("Security policy defaults")
            .with_defaults(&ctx.database_defaults);
        vec![db]
    }

    fn supports_engine(&self, _engine: DatabaseEngine) -> bool {
        true
    }
}
