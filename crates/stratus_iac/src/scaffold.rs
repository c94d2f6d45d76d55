//! Bundle writing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IacError, IacResult};
use crate::terraform::{GeneratedArtifact, RenderedSection, TerraformVariable};

const GITIGNORE: &str = "# Local .terraform directories
**/.terraform/*

# .tfstate files
*.tfstate
*.tfstate.*

# Crash log files
crash.log
crash.*.log

# Variable files may contain sensitive data
*.tfvars
*.tfvars.json

# Override files
override.tf
override.tf.json
*_override.tf
*_override.tf.json

# CLI configuration files
.terraformrc
terraform.rc
";

/// Writes a generated artifact to disk.
///
/// Single-provider bundles are flat. Fan-out bundles keep the combined
/// playbook at the root and put each section's Terraform in its own directory,
/// since sections for the same provider would otherwise collide.
pub struct BundleWriter {
    target: PathBuf,
}

impl BundleWriter {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self { target: target.into() }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Write the bundle and return the files created.
    pub fn write(&self, artifact: &GeneratedArtifact) -> IacResult<Vec<PathBuf>> {
        info!("Writing bundle to {:?}", self.target);
        fs::create_dir_all(&self.target)?;

        let mut written = Vec::new();
        match artifact.sections.as_slice() {
            [] => return Err(IacError::EmptyBundle),
            [only] => {
                written.extend(self.write_terraform(&self.target, only)?);
            }
            sections => {
                for section in sections {
                    let dir = self.target.join(Self::section_dir(section));
                    fs::create_dir_all(&dir)?;
                    written.extend(self.write_terraform(&dir, section)?);
                }
            }
        }

        written.push(self.write_file(&self.target, "playbook.yml", &artifact.playbook_code)?);

        info!("Bundle written: {} file(s)", written.len());
        Ok(written)
    }

    /// Directory name for a fan-out section, e.g. `01-aws`.
    pub fn section_dir(section: &RenderedSection) -> String {
        format!("{:02}-{}", section.index, section.provider.as_str())
    }

    fn write_terraform(&self, dir: &Path, section: &RenderedSection) -> IacResult<Vec<PathBuf>> {
        Ok(vec![
            self.write_file(dir, "main.tf", &section.provisioning_code)?,
            self.write_file(dir, "terraform.tfvars.example", &tfvars_example(&section.variables))?,
            self.write_file(dir, ".gitignore", GITIGNORE)?,
        ])
    }

    fn write_file(&self, dir: &Path, name: &str, content: &str) -> IacResult<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }
}

/// Example variable values; sensitive ones are left to `TF_VAR_` environment variables.
pub fn tfvars_example(variables: &[TerraformVariable]) -> String {
    let mut out = String::from("# Copy to terraform.tfvars and fill in the values.\n");
    if variables.is_empty() {
        out.push_str("# This configuration has no input variables.\n");
        return out;
    }
    for var in variables {
        out.push('\n');
        if !var.description.is_empty() {
            out.push_str(&format!("# {}\n", var.description));
        }
        if var.sensitive {
            out.push_str(&format!("# Sensitive: export TF_VAR_{} instead of storing it here.\n", var.name));
            out.push_str(&format!("# {} =\n", var.name));
        } else {
            out.push_str(&format!("{} = \"\"\n", var.name));
        }
    }
    out
}
