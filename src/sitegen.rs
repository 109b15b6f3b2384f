//! Hand-off to the external site-generation subprocess.
//!
//! The static-site renderer is a separate executable; this module only builds
//! its command line, relays its stdout into the log, and maps its exit code.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use miette::Diagnostic;
use thiserror::Error;
use tracing::info;

use crate::settings::GenerationSettings;

#[derive(Debug, Error, Diagnostic)]
pub enum SiteGenError {
    #[error("failed to launch site generator {tool}")]
    #[diagnostic(
        code(graphdoc::sitegen::spawn),
        help("Check that the site generator executable exists and is runnable.")
    )]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for site generator to exit")]
    #[diagnostic(code(graphdoc::sitegen::wait))]
    Wait(#[source] std::io::Error),
}

/// Exit-code contract of the site generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiteGenOutcome {
    Success,
    /// Generation completed but some pages failed.
    SuccessWithErrors(i32),
    UnknownError,
    DiskWriteFailure,
}

impl SiteGenOutcome {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => SiteGenOutcome::Success,
            Some(-1) | None => SiteGenOutcome::UnknownError,
            Some(-2) => SiteGenOutcome::DiskWriteFailure,
            Some(other) => SiteGenOutcome::SuccessWithErrors(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SiteGenOutcome::Success | SiteGenOutcome::SuccessWithErrors(_)
        )
    }
}

/// Invocation parameters for the site generator.
#[derive(Clone, Debug)]
pub struct SiteGenRequest {
    pub tool: PathBuf,
    pub output_dir: PathBuf,
    pub intermediate_dir: PathBuf,
    pub project_dir: PathBuf,
    pub name: String,
    pub from_intermediate: bool,
    pub clean_output: bool,
}

impl SiteGenRequest {
    pub fn from_settings(tool: impl Into<PathBuf>, settings: &GenerationSettings) -> Self {
        Self {
            tool: tool.into(),
            output_dir: settings.output_dir.clone(),
            intermediate_dir: settings.intermediate_dir.clone(),
            project_dir: settings.project_dir.clone(),
            name: settings.title.clone(),
            from_intermediate: true,
            clean_output: settings.clean_output,
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![format!("-outputdir={}", self.output_dir.display())];
        if self.from_intermediate {
            args.push("-fromintermediate".to_string());
        }
        args.push(format!(
            "-intermediatedir={}",
            self.intermediate_dir.display()
        ));
        args.push(format!("-projectdir={}", self.project_dir.display()));
        args.push(format!("-name={}", self.name));
        if self.clean_output {
            args.push("-cleanoutput".to_string());
        }
        args
    }
}

/// Run the site generator to completion, line-logging its stdout.
pub fn run_site_generator(request: &SiteGenRequest) -> Result<SiteGenOutcome, SiteGenError> {
    let mut child = Command::new(&request.tool)
        .args(request.args())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| SiteGenError::Spawn {
            tool: request.tool.display().to_string(),
            source,
        })?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => info!(target: "graphdoc::sitegen", "{line}"),
                Err(_) => break,
            }
        }
    }

    let status = child.wait().map_err(SiteGenError::Wait)?;
    let outcome = SiteGenOutcome::from_exit_code(status.code());
    info!(target: "graphdoc::sitegen", ?outcome, "site generator finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_to_outcomes() {
        assert_eq!(
            SiteGenOutcome::from_exit_code(Some(0)),
            SiteGenOutcome::Success
        );
        assert_eq!(
            SiteGenOutcome::from_exit_code(Some(-1)),
            SiteGenOutcome::UnknownError
        );
        assert_eq!(
            SiteGenOutcome::from_exit_code(Some(-2)),
            SiteGenOutcome::DiskWriteFailure
        );
        assert_eq!(
            SiteGenOutcome::from_exit_code(Some(3)),
            SiteGenOutcome::SuccessWithErrors(3)
        );
        assert_eq!(
            SiteGenOutcome::from_exit_code(None),
            SiteGenOutcome::UnknownError
        );
    }

    #[test]
    fn request_builds_the_full_flag_set() {
        let mut settings = GenerationSettings::new("My Docs");
        settings.clean_output = true;
        let request = SiteGenRequest::from_settings("sitegen", &settings);
        let args = request.args();
        assert!(args[0].starts_with("-outputdir="));
        assert!(args.contains(&"-fromintermediate".to_string()));
        assert!(args.iter().any(|a| a.starts_with("-intermediatedir=")));
        assert!(args.iter().any(|a| a.starts_with("-projectdir=")));
        assert!(args.contains(&"-name=My Docs".to_string()));
        assert!(args.contains(&"-cleanoutput".to_string()));
    }
}
