use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ArrnormError, Result};

/// An external program invocation with `{name}` placeholders in its
/// arguments and in the path of the file it is expected to produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Template of the file the tool writes; empty when it writes none.
    #[serde(default)]
    pub output: String,
}

impl ToolCommand {
    pub fn new(program: &str, args: &[&str], output: &str) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            output: output.to_string(),
        }
    }

    /// Default iMAD change-detection invocation.
    pub fn imad() -> Self {
        Self::new(
            "imad",
            &["-i", "{iterations}", "{reference}", "{target}"],
            "{target_dir}/{target_stem}_imad{target_ext}",
        )
    }

    /// Default radcal calibration invocation.
    pub fn radcal() -> Self {
        Self::new(
            "radcal",
            &["-t", "{threshold}", "{imad}"],
            "{target_dir}/{target_stem}_norm{target_ext}",
        )
    }

    pub fn expand_args(&self, values: &Placeholders) -> Vec<String> {
        self.args.iter().map(|a| values.expand(a)).collect()
    }

    pub fn output_path(&self, values: &Placeholders) -> Option<PathBuf> {
        if self.output.is_empty() {
            None
        } else {
            Some(PathBuf::from(values.expand(&self.output)))
        }
    }

    /// Expand placeholders, run the tool, and check its declared output exists.
    pub fn execute(&self, values: &Placeholders) -> Result<Option<PathBuf>> {
        let args = self.expand_args(values);
        run_tool(&self.program, &args)?;

        let output = self.output_path(values);
        if let Some(path) = &output {
            if !path.is_file() {
                return Err(ArrnormError::MissingToolOutput {
                    tool: self.program.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(output)
    }
}

/// Values substituted for `{name}` in tool templates.
#[derive(Clone, Debug, Default)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    /// Placeholders describing a target: `target`, `target_dir`,
    /// `target_stem`, `target_ext` (with its leading dot).
    pub fn for_target(target: &Path) -> Self {
        let target_dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        let target_ext = target
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self::default()
            .with("target", target.display().to_string())
            .with("target_dir", target_dir)
            .with("target_stem", file_stem(target))
            .with("target_ext", target_ext)
    }

    /// Target placeholders plus `reference` and `reference_stem`.
    pub fn for_pair(reference: &Path, target: &Path) -> Self {
        Self::for_target(target)
            .with("reference", reference.display().to_string())
            .with("reference_stem", file_stem(reference))
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Replace every known `{name}`; unknown placeholders are left as written.
    pub fn expand(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (key, value) in &self.values {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Captured result of a finished tool.
#[derive(Clone, Debug)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args` (no shell), capturing stdout and stderr.
///
/// A non-zero exit status is returned as `ToolFailed`.
pub fn run_tool(program: &str, args: &[String]) -> Result<ToolOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    debug!("Command: {:?}", cmd);

    let output = cmd.output().map_err(|e| ArrnormError::ToolSpawn {
        tool: program.to_string(),
        reason: e.to_string(),
    })?;

    let result = ToolOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !output.status.success() {
        return Err(ArrnormError::ToolFailed {
            tool: program.to_string(),
            code: result.code,
            stderr: result.stderr.trim().to_string(),
        });
    }

    debug!(tool = program, stdout = %result.stdout.trim(), "Tool finished");
    Ok(result)
}
