//! Azure renderer.

use stratus_model::{CloudProvider, DatabaseEngine};

use crate::hcl::{HclBlock, HclValue};
use crate::provider::{tags, ProviderProfile, ProviderRenderer, RenderContext};

const PROFILE: ProviderProfile = ProviderProfile {
    region: "East US",
    zone: None,
    version_constraint: "~> 3.0",
    instance_size: "Standard_B1s",
    database_size: "B_Gen5_1",
    image: "Canonical:0001-com-ubuntu-server-jammy:22_04-lts",
};

const RESOURCE_GROUP: &str = "azurerm_resource_group.main";

#[derive(Debug, Clone, Copy, Default)]
pub struct AzureRenderer;

impl AzureRenderer {
    fn located(block: HclBlock, name: String) -> HclBlock {
        block
            .attr("name", name)
            .expr("location", format!("{}.location", RESOURCE_GROUP))
            .expr("resource_group_name", format!("{}.name", RESOURCE_GROUP))
    }

    fn server_type(engine: DatabaseEngine) -> (&'static str, &'static str) {
        match engine {
            DatabaseEngine::PostgreSql => ("azurerm_postgresql_server", "11"),
            DatabaseEngine::MariaDb => ("azurerm_mariadb_server", "10.3"),
            _ => ("azurerm_mysql_server", "8.0"),
        }
    }

    fn image() -> HclBlock {
        let mut parts = PROFILE.image.split(':');
        HclBlock::new("source_image_reference")
            .attr("publisher", parts.next().unwrap_or_default())
            .attr("offer", parts.next().unwrap_or_default())
            .attr("sku", parts.next().unwrap_or_default())
            .attr("version", "latest")
    }
}

impl ProviderRenderer for AzureRenderer {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Azure
    }

    fn profile(&self) -> ProviderProfile {
        PROFILE
    }

    fn provider_block(&self) -> HclBlock {
        HclBlock::new("provider").label("azurerm").block(HclBlock::new("features"))
    }

    fn foundation(&self, _ctx: &RenderContext) -> Vec<HclBlock> {
        vec![HclBlock::resource("azurerm_resource_group", "main")
            .attr("name", "rg-stratus")
            .attr("location", PROFILE.region)
            .gap()
            .attr("tags", tags("rg-stratus"))]
    }

    fn network(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        vec![
            Self::located(
                HclBlock::resource("azurerm_virtual_network", format!("network_{}", index)),
                format!("vnet-{}", index),
            )
            .attr("address_space", HclValue::strings([format!("10.{}.0.0/16", index - 1)]))
            .gap()
            .attr("tags", tags(&format!("vnet-{}", index))),
            HclBlock::resource("azurerm_subnet", format!("subnet_{}", index))
                .attr("name", format!("subnet-private-{}", index))
                .expr("resource_group_name", format!("{}.name", RESOURCE_GROUP))
                .expr("virtual_network_name", format!("azurerm_virtual_network.network_{}.name", index))
                .attr("address_prefixes", HclValue::strings([format!("10.{}.1.0/24", index - 1)])),
        ]
    }

    fn security_boundary(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        let nsg = Self::located(
            HclBlock::resource("azurerm_network_security_group", format!("sg_{}", index)),
            format!("nsg-{}", index),
        )
        .block(
            HclBlock::new("security_rule")
                .attr("name", "AllowHttpsInbound")
                .attr("priority", 100)
                .attr("direction", "Inbound")
                .attr("access", "Allow")
                .attr("protocol", "Tcp")
                .attr("source_port_range", "*")
                .attr("destination_port_range", "443")
                .attr("source_address_prefix", "*")
                .attr("destination_address_prefix", "*"),
        )
        .block(
            HclBlock::new("security_rule")
                .attr("name", "AllowAllOutbound")
                .attr("priority", 100)
                .attr("direction", "Outbound")
                .attr("access", "Allow")
                .attr("protocol", "*")
                .attr("source_port_range", "*")
                .attr("destination_port_range", "*")
                .attr("source_address_prefix", "*")
                .attr("destination_address_prefix", "*"),
        )
        .attr("tags", tags(&format!("nsg-{}", index)));
        vec![nsg]
    }

    fn compute(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock> {
        let nic = format!("nic_{}", index);
        vec![
            Self::located(HclBlock::resource("azurerm_network_interface", &nic), format!("nic-{}", index)).block(
                HclBlock::new("ip_configuration")
                    .attr("name", "internal")
                    .expr("subnet_id", "azurerm_subnet.subnet_1.id")
                    .attr("private_ip_address_allocation", "Dynamic"),
            ),
            HclBlock::resource("azurerm_network_interface_security_group_association", &nic)
                .expr("network_interface_id", format!("azurerm_network_interface.{}.id", nic))
                .expr("network_security_group_id", "azurerm_network_security_group.sg_1.id"),
            Self::located(
                HclBlock::resource("azurerm_linux_virtual_machine", format!("server_{}", index)),
                format!("server-{}", index),
            )
            .attr("size", PROFILE.instance_size)
            .attr("admin_username", "azureadmin")
            .attr("disable_password_authentication", true)
            .attr("network_interface_ids", HclValue::exprs([format!("azurerm_network_interface.{}.id", nic)]))
            .block(
                HclBlock::new("admin_ssh_key")
                    .attr("username", "azureadmin")
                    .expr("public_key", "var.admin_ssh_public_key"),
            )
            .block(
                HclBlock::new("os_disk")
                    .attr("caching", "ReadWrite")
                    .attr("storage_account_type", "Standard_LRS"),
            )
            .block(Self::image())
            .gap()
            .with_defaults(&ctx.compute_defaults)
            .attr("tags", tags(&format!("server-{}", index))),
        ]
    }

    fn load_balancer(&self, index: u32, _ctx: &RenderContext) -> Vec<HclBlock> {
        let lb = format!("lb_{}", index);
        let frontend = format!("lb-{}-frontend", index);
        vec![
            Self::located(HclBlock::resource("azurerm_public_ip", &lb), format!("lb-{}-ip", index))
                .attr("allocation_method", "Static")
                .attr("sku", "Standard"),
            Self::located(HclBlock::resource("azurerm_lb", &lb), format!("lb-{}", index))
                .attr("sku", "Standard")
                .block(
                    HclBlock::new("frontend_ip_configuration")
                        .attr("name", frontend.as_str())
                        .expr("public_ip_address_id", format!("azurerm_public_ip.{}.id", lb)),
                )
                .attr("tags", tags(&format!("lb-{}", index))),
            HclBlock::resource("azurerm_lb_backend_address_pool", &lb)
                .attr("name", format!("lb-{}-pool", index))
                .expr("loadbalancer_id", format!("azurerm_lb.{}.id", lb)),
            HclBlock::resource("azurerm_lb_probe", &lb)
                .attr("name", "https-probe")
                .expr("loadbalancer_id", format!("azurerm_lb.{}.id", lb))
                .attr("protocol", "Https")
                .attr("port", 443)
                .attr("request_path", "/"),
            HclBlock::resource("azurerm_lb_rule", format!("{}_https", lb))
                .attr("name", "https")
                .expr("loadbalancer_id", format!("azurerm_lb.{}.id", lb))
                .attr("protocol", "Tcp")
                .attr("frontend_port", 443)
                .attr("backend_port", 443)
                .attr("frontend_ip_configuration_name", frontend.as_str())
                .attr(
                    "backend_address_pool_ids",
                    HclValue::exprs([format!("azurerm_lb_backend_address_pool.{}.id", lb)]),
                )
                .expr("probe_id", format!("azurerm_lb_probe.{}.id", lb)),
        ]
    }

    fn database(&self, index: u32, engine: DatabaseEngine, ctx: &RenderContext) -> Vec<HclBlock> {
        let (resource_type, version) = Self::server_type(engine);
        let db = Self::located(HclBlock::resource(resource_type, format!("db_{}", index)), format!("db-{}", index))
            .gap()
            .attr("administrator_login", "dbadmin")
            .expr("administrator_login_password", "var.db_password")
            .gap()
            .attr("sku_name", PROFILE.database_size)
            .attr("storage_mb", 20480)
            .attr("version", version)
            .attr("geo_redundant_backup_enabled", false)
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
