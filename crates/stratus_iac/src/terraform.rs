//! Terraform generation.

use std::sync::Arc;

use serde::Serialize;
use stratus_model::{CloudProvider, InfrastructureRequest, ProviderInfraSpec};
use stratus_policy::PolicyRegistry;
use tracing::{debug, info};

use crate::error::IacResult;
use crate::hcl::{render_blocks, HclBlock, HclValue};
use crate::playbook::PlaybookBuilder;
use crate::provider::{renderer_for, ProviderRenderer, RenderContext};

/// A Terraform input variable the generated code may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerraformVariable {
    pub name: String,
    pub description: String,
    pub sensitive: bool,
}

impl TerraformVariable {
    /// Catalogue entry for a referenced variable name.
    pub fn lookup(name: &str) -> Self {
        let (description, sensitive) = match name {
            "db_password" => ("Database administrator password", true),
            "gcp_project_id" => ("GCP project identifier", false),
            "gcp_kms_key_self_link" => ("Cloud KMS key used to encrypt disks and databases", false),
            "gcp_ssl_certificate" => ("Self link of the certificate served by the HTTPS proxy", false),
            "openstack_auth_url" => ("Keystone authentication endpoint", false),
            "openstack_image_id" => ("Glance image the boot volumes are created from", false),
            "admin_ssh_public_key" => ("SSH public key installed for the admin user", false),
            "lb_certificate_arn" => ("ACM certificate served by the HTTPS listener", false),
            _ => ("", false),
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            sensitive,
        }
    }

    fn to_block(&self) -> HclBlock {
        let mut block = HclBlock::new("variable").label(self.name.as_str());
        if !self.description.is_empty() {
            block = block.attr("description", self.description.as_str());
        }
        block = block.expr("type", "string");
        if self.sensitive {
            block = block.attr("sensitive", true);
        }
        block
    }
}

/// One provider's share of a generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub index: usize,
    pub provider: CloudProvider,
    pub provisioning_code: String,
    pub playbook_code: String,
    pub variables: Vec<TerraformVariable>,
}

/// Provisioning code and playbook generated for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub provisioning_code: String,
    pub playbook_code: String,
    pub sections: Vec<RenderedSection>,
}

impl GeneratedArtifact {
    pub fn is_multi_provider(&self) -> bool {
        self.sections.len() > 1
    }
}

/// Renders Terraform and Ansible text from normalized specs.
///
/// Output is a pure function of the provider spec and the registry defaults, so the
/// same input always yields byte-identical text.
#[derive(Debug, Clone)]
pub struct Generator {
    registry: Arc<PolicyRegistry>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(PolicyRegistry::shared())
    }
}

impl Generator {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Terraform for one provider spec.
    pub fn render(&self, spec: &ProviderInfraSpec) -> String {
        let renderer = renderer_for(spec.provider());
        let ctx = RenderContext::new(spec, &self.registry);
        debug!(
            "Rendering {}: {} server(s), {} database(s), {} network(s), {} load balancer(s), {} security group(s)",
            spec.provider(),
            spec.servers(),
            spec.databases(),
            spec.networks(),
            spec.load_balancers(),
            spec.security_groups()
        );

        let mut resources = renderer.foundation(&ctx);
        for i in 1..=spec.networks() {
            resources.extend(renderer.network(i, &ctx));
        }
        for i in 1..=spec.security_groups() {
            resources.extend(renderer.security_boundary(i, &ctx));
        }
        for i in 1..=spec.servers() {
            resources.extend(renderer.compute(i, &ctx));
        }
        for i in 1..=spec.load_balancers() {
            resources.extend(renderer.load_balancer(i, &ctx));
        }
        if spec.databases() > 0 {
            let engine = renderer.effective_engine(spec.database_type());
            for i in 1..=spec.databases() {
                resources.extend(renderer.database(i, engine, &ctx));
            }
        }

        let body = render_blocks(&resources);
        let variables = Self::variables(renderer, &body);

        let mut out = String::new();
        out.push_str(&format!("# Infrastructure as Code - {}\n", spec.provider().display_name()));
        out.push_str("# Generated by stratus with security policy defaults applied\n\n");
        out.push_str(&Self::preamble(renderer).render());
        out.push('\n');
        out.push_str(&renderer.provider_block().render());
        if !body.is_empty() {
            out.push('\n');
            out.push_str(&body);
        }
        if !variables.is_empty() {
            out.push('\n');
            out.push_str(&render_blocks(&variables.iter().map(TerraformVariable::to_block).collect::<Vec<_>>()));
        }
        out.push('\n');
        out.push_str(&Self::outputs().render());
        out
    }

    /// Ansible playbook for one provider spec.
    pub fn render_playbook(&self, spec: &ProviderInfraSpec) -> IacResult<String> {
        PlaybookBuilder::new().with_spec("all", spec).render()
    }

    /// Render a whole request; multi-provider requests fan out into numbered sections.
    pub fn render_request(&self, request: &InfrastructureRequest) -> IacResult<GeneratedArtifact> {
        let total = request.len();
        let mut sections = Vec::with_capacity(total);
        let mut playbook = PlaybookBuilder::new();

        for (idx, spec) in request.iter().enumerate() {
            let provisioning_code = self.render(spec);
            let variables = Self::variables(renderer_for(spec.provider()), &provisioning_code);
            let hosts = if request.is_multi_provider() {
                spec.provider().as_str()
            } else {
                "all"
            };
            playbook = playbook.with_spec(hosts, spec);
            sections.push(RenderedSection {
                index: idx + 1,
                provider: spec.provider(),
                provisioning_code,
                playbook_code: PlaybookBuilder::new().with_spec(hosts, spec).render()?,
                variables,
            });
        }

        let provisioning_code = if total > 1 {
            sections
                .iter()
                .map(|s| format!("{}\n{}", Self::section_header(s.index, total, s.provider), s.provisioning_code))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            sections.first().map(|s| s.provisioning_code.clone()).unwrap_or_default()
        };

        info!(
            "Generated {} section(s): {}",
            total,
            sections.iter().map(|s| s.provider.as_str()).collect::<Vec<_>>().join(", ")
        );

        Ok(GeneratedArtifact {
            provisioning_code,
            playbook_code: playbook.render()?,
            sections,
        })
    }

    /// Numbered banner separating fan-out sections.
    pub fn section_header(index: usize, total: usize, provider: CloudProvider) -> String {
        let rule = format!("# {}", "=".repeat(70));
        format!("{}\n# Section {}/{}: {}\n{}\n", rule, index, total, provider.display_name(), rule)
    }

    fn preamble(renderer: &dyn ProviderRenderer) -> HclBlock {
        let provider = renderer.provider();
        HclBlock::new("terraform")
            .attr("required_version", ">= 1.0")
            .gap()
            .block(HclBlock::new("required_providers").attr(
                provider.provider_name(),
                HclValue::map([
                    ("source", provider.provider_source()),
                    ("version", renderer.profile().version_constraint),
                ]),
            ))
    }

    fn outputs() -> HclBlock {
        HclBlock::new("output")
            .label("infrastructure_id")
            .attr("description", "Identifier of the generated infrastructure")
            .attr("value", "infra-generated")
    }

    /// Declarations for every `var.<name>` referenced, in order of first use.
    fn variables(renderer: &dyn ProviderRenderer, body: &str) -> Vec<TerraformVariable> {
        let mut names = referenced_variables(&renderer.provider_block().render());
        for name in referenced_variables(body) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.iter().map(|n| TerraformVariable::lookup(n)).collect()
    }
}

/// Names referenced as `var.<name>`, in order of first appearance.
pub fn referenced_variables(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("var.") {
        let preceded_by_ident = rest[..pos]
            .chars()
            .next_back()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        let after = &rest[pos + 4..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..len];
        if !preceded_by_ident && !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[len..];
    }
    names
}
