//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use modinstall_types::{
    ColorChoice, InstallationResult, MigrationDescriptor, MigrationTarget, PackageManifest,
};
use serde::Serialize;
use std::io;

/// Result of one CLI command
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    Install(InstallationResult),
    Identify(PackageManifest),
    Migrations {
        target: MigrationTarget,
        pending: Vec<MigrationDescriptor>,
        /// Set when `--apply` ran
        #[serde(skip_serializing_if = "Option::is_none")]
        applied: Option<usize>,
    },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command output
    pub fn render_result(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            return self.render_json(output);
        }
        match output {
            CommandOutput::Install(result) => self.render_install_result(result),
            CommandOutput::Identify(manifest) => self.render_manifest(manifest),
            CommandOutput::Migrations {
                target,
                pending,
                applied,
            } => self.render_migrations(target, pending, *applied),
        }
    }

    /// Render as JSON
    ///
    /// Install results are printed bare so scripts can read the result
    /// contract directly.
    fn render_json(&self, output: &CommandOutput) -> io::Result<()> {
        let json = match output {
            CommandOutput::Install(result) => serde_json::to_string_pretty(result),
            other => serde_json::to_string_pretty(other),
        }
        .map_err(io::Error::other)?;
        self.term.write_line(&json)
    }

    fn render_install_result(&self, result: &InstallationResult) -> io::Result<()> {
        if result.success {
            self.term
                .write_line(&format!("{} {}", self.styled("OK", &Style::new().green().bold()), result.message))
        } else {
            self.term.write_line(&format!(
                "{} {}",
                self.styled("FAILED", &Style::new().red().bold()),
                result.message
            ))?;
            if let Some(code) = &result.error_code {
                self.term.write_line(&format!("  Code: {code}"))?;
            }
            if let Some(phase) = result.failed_phase {
                self.term.write_line(&format!("  Phase: {phase}"))?;
            }
            Ok(())
        }
    }

    fn render_manifest(&self, manifest: &PackageManifest) -> io::Result<()> {
        self.term
            .write_line(&self.styled(&manifest.id, &Style::new().bold()))?;
        self.term.write_line(&format!(
            "Namespace: {}",
            manifest.namespace.as_deref().unwrap_or("-")
        ))?;
        self.term
            .write_line(&format!("Source:    {}", manifest.source_path.display()))
    }

    fn render_migrations(
        &self,
        target: &MigrationTarget,
        pending: &[MigrationDescriptor],
        applied: Option<usize>,
    ) -> io::Result<()> {
        if let Some(count) = applied {
            return self
                .term
                .write_line(&format!("Applied {count} migration(s) from {target}."));
        }

        if pending.is_empty() {
            return self
                .term
                .write_line(&format!("No pending migrations for {target}."));
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

        for migration in pending {
            let status = if self.supports_color() {
                Cell::new("Pending").fg(Color::Yellow)
            } else {
                Cell::new("Pending")
            };
            table.add_row(vec![
                Cell::new(&migration.version),
                Cell::new(migration.path.display()),
                status,
            ]);
        }

        self.term.write_line(&format!("{table}"))
    }

    fn styled(&self, text: &str, style: &Style) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_json_shape() {
        let output = CommandOutput::Migrations {
            target: MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into()),
            pending: vec![MigrationDescriptor {
                version: "m0001_init".into(),
                path: "m0001_init.sql".into(),
            }],
            applied: None,
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "migrations");
        assert_eq!(json["pending"][0]["version"], "m0001_init");
        assert!(json.get("applied").is_none());
    }
}
