/// Bridge to the external numerical toolkit (MATLAB) that does the geometric
/// work. Each call runs one toolkit function in a batch subprocess; results
/// travel back through CSV files whose paths are passed as arguments.

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::runner::Task;
use crate::settings::ToolkitSettings;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Could not start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{function} failed (exit code {code:?}): {message}")]
    Failed {
        function: String,
        code: Option<i32>,
        message: String,
    },
}

pub trait Toolkit {
    /// Runs `function(args...)` to completion.
    fn call(&self, function: &str, args: &[String]) -> Result<(), ToolkitError>;
}

#[derive(Debug, Clone)]
pub struct MatlabToolkit {
    binary: PathBuf,
    script_dir: PathBuf,
}

impl MatlabToolkit {
    pub fn new(binary: impl Into<PathBuf>, script_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            script_dir: script_dir.into(),
        }
    }

    pub fn from_settings(settings: &ToolkitSettings) -> Self {
        Self::new(&settings.binary, &settings.script_dir)
    }

    /// The `-r` script: any error inside the toolkit becomes exit code 1.
    pub fn script(&self, function: &str, args: &[String]) -> String {
        let quoted: Vec<String> = args.iter().map(|arg| quote(arg)).collect();
        format!(
            "try, addpath({}); {}({}); catch err, disp(getReport(err)); exit(1); end; exit(0);",
            quote(&self.script_dir.to_string_lossy()),
            function,
            quoted.join(", ")
        )
    }

    pub fn command_args(&self, function: &str, args: &[String]) -> Vec<String> {
        vec![
            "-nodisplay".to_string(),
            "-nojvm".to_string(),
            "-r".to_string(),
            self.script(function, args),
        ]
    }

    /// The same call packaged for the batch runner.
    pub fn task(&self, name: impl Into<String>, function: &str, args: &[String]) -> Task {
        Task::new(name, &self.binary, self.command_args(function, args))
    }
}

impl Toolkit for MatlabToolkit {
    fn call(&self, function: &str, args: &[String]) -> Result<(), ToolkitError> {
        info!("Calling {}({})", function, args.join(", "));

        let output = Command::new(&self.binary)
            .args(self.command_args(function, args))
            .output()
            .map_err(|source| ToolkitError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        debug!("{} stdout: {}", function, String::from_utf8_lossy(&output.stdout).trim());

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        // The catch block reports through disp, which goes to stdout.
        let message = [stderr, stdout]
            .into_iter()
            .find(|m| !m.is_empty())
            .unwrap_or_else(|| "no output".to_string());

        Err(ToolkitError::Failed {
            function: function.to_string(),
            code: output.status.code(),
            message,
        })
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_guarded_batch_script() {
        let toolkit = MatlabToolkit::new("matlab", "/opt/fr3d");
        let script = toolkit.script(
            "loadLoops",
            &["1S72".to_string(), "/tmp/it's.csv".to_string()],
        );
        assert_eq!(
            script,
            "try, addpath('/opt/fr3d'); loadLoops('1S72', '/tmp/it''s.csv'); \
             catch err, disp(getReport(err)); exit(1); end; exit(0);"
        );
    }

    #[test]
    fn task_wraps_the_same_command() {
        let toolkit = MatlabToolkit::new("/usr/local/bin/matlab", "scripts");
        let task = toolkit.task("batch-1", "searchLoops", &["a.txt".to_string()]);
        assert_eq!(task.name, "batch-1");
        assert_eq!(task.program, PathBuf::from("/usr/local/bin/matlab"));
        assert_eq!(task.args[..3], ["-nodisplay", "-nojvm", "-r"]);
        assert!(task.args[3].contains("searchLoops('a.txt')"));
    }

    #[cfg(unix)]
    #[test]
    fn reports_failures_with_output() {
        // `false` ignores its arguments and exits with 1.
        let toolkit = MatlabToolkit::new("false", "scripts");
        let err = toolkit.call("loadLoops", &["1S72".to_string()]).unwrap_err();
        match err {
            ToolkitError::Failed { function, code, .. } => {
                assert_eq!(function, "loadLoops");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let toolkit = MatlabToolkit::new("/nonexistent/matlab", "scripts");
        let err = toolkit.call("loadLoops", &[]).unwrap_err();
        assert!(matches!(err, ToolkitError::Spawn { .. }));
    }
}
