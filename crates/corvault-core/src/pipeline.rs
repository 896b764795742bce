//! One collection cycle: raw command output in, [`Snapshot`] out.

use crate::catalog::Category;
use crate::error::{CollectError, Result};
use crate::frame::{DEFAULT_HEADER_LINES, isolate_payload};
use crate::project::{Observation, project};
use crate::record::parse;
use crate::snapshot::{Snapshot, assemble};

/// Captured result of running one CLI command on the array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: u32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    /// Successful output from captured stdout text.
    pub fn from_stdout(text: &str) -> Self {
        Self {
            exit_status: 0,
            stdout: text.lines().map(str::to_string).collect(),
            stderr: Vec::new(),
        }
    }
}

/// Stages of a collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Framing,
    Parsing,
    Projecting,
    Assembled,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Framing => write!(f, "framing"),
            Self::Parsing => write!(f, "parsing"),
            Self::Projecting => write!(f, "projecting"),
            Self::Assembled => write!(f, "assembled"),
        }
    }
}

/// Per-array pipeline settings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    host: String,
    header_lines: usize,
}

impl Pipeline {
    pub fn new(host: impl Into<String>, header_lines: usize) -> Self {
        Self {
            host: host.into(),
            header_lines,
        }
    }

    /// Host label attached to every observation.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn header_lines(&self) -> usize {
        self.header_lines
    }

    /// Commands to fetch, in the order [`Pipeline::collect`] expects them.
    pub fn commands(&self) -> [&'static str; 2] {
        Category::ALL.map(Category::command)
    }

    /// Frame, parse and project one command's output.
    pub fn observe(&self, category: Category, output: &CommandOutput) -> Result<Vec<Observation>> {
        let mut stage = Stage::Idle;
        let result = self.observe_inner(category, output, &mut stage);
        if let Err(e) = &result {
            log::debug!("{category}: {stage} -> {} (aborted: {e})", Stage::Idle);
        }
        result
    }

    fn observe_inner(
        &self,
        category: Category,
        output: &CommandOutput,
        stage: &mut Stage,
    ) -> Result<Vec<Observation>> {
        if output.exit_status != 0 {
            let detail = output
                .stderr
                .iter()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| "no stderr output".to_string());
            return Err(CollectError::transport(
                category.command(),
                format!("exit status {}: {detail}", output.exit_status),
            ));
        }

        advance(category, stage, Stage::Framing);
        let payload = isolate_payload(category, &output.stdout, self.header_lines)?;

        advance(category, stage, Stage::Parsing);
        let records = parse(&payload, category)?;

        advance(category, stage, Stage::Projecting);
        project(&records, &self.host)
    }

    /// Run a full cycle over the controller and disk command outputs.
    ///
    /// Any failure discards the whole cycle.
    pub fn collect(&self, controller: &CommandOutput, disk: &CommandOutput) -> Result<Snapshot> {
        let controller_obs = self.observe(Category::Controller, controller)?;
        let disk_obs = self.observe(Category::Disk, disk)?;
        let snapshot = assemble(controller_obs, disk_obs);
        log::debug!(
            "{}: {} -> {} ({} observations)",
            self.host,
            Stage::Projecting,
            Stage::Assembled,
            snapshot.observation_count()
        );
        Ok(snapshot)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_HEADER_LINES)
    }
}

fn advance(category: Category, stage: &mut Stage, next: Stage) {
    log::debug!("{category}: {stage} -> {next}");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_banner(header: usize, body: &str) -> CommandOutput {
        let mut text = String::new();
        for i in 0..header {
            text.push_str(&format!("banner line {i}\n"));
        }
        text.push_str(body);
        CommandOutput::from_stdout(&text)
    }

    #[test]
    fn test_commands_order() {
        let p = Pipeline::default();
        assert_eq!(
            p.commands(),
            [
                "set cli-parameters json; show controller-statistics",
                "set cli-parameters json; show disk-statistics"
            ]
        );
    }

    #[test]
    fn test_nonzero_exit_is_transport_error() {
        let output = CommandOutput {
            exit_status: 1,
            stdout: Vec::new(),
            stderr: vec!["".to_string(), "Error: permission denied".to_string()],
        };
        let err = Pipeline::new("cv1", 0)
            .observe(Category::Disk, &output)
            .unwrap_err();
        match err {
            CollectError::Transport { command, message } => {
                assert!(command.ends_with("disk-statistics"));
                assert!(message.contains("permission denied"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_aborted_stage_is_reported() {
        let output = with_banner(1, "not json");
        let mut stage = Stage::Idle;
        let err = Pipeline::new("cv1", 1)
            .observe_inner(Category::Controller, &output, &mut stage)
            .unwrap_err();
        assert_eq!(err.kind(), "schema_drift");
        assert_eq!(stage, Stage::Framing);

        let output = CommandOutput {
            exit_status: 255,
            ..CommandOutput::default()
        };
        let mut stage = Stage::Idle;
        Pipeline::new("cv1", 1)
            .observe_inner(Category::Controller, &output, &mut stage)
            .unwrap_err();
        assert_eq!(stage, Stage::Idle);
    }

    #[test]
    fn test_collect_empty_arrays() {
        let p = Pipeline::new("cv1", 2);
        let c = with_banner(2, "{\"controller-statistics\": []}\n# trailer\n");
        let d = with_banner(2, "{\"disk-statistics\": []}\n");
        let snap = p.collect(&c, &d).unwrap();
        assert_eq!(snap.observation_count(), 0);
    }

    #[test]
    fn test_disk_failure_discards_controller_results() {
        let p = Pipeline::new("cv1", 1);
        let c = with_banner(
            1,
            r#"{"controller-statistics":[{"durable-id":"A","cpu-load":"12","bytes-per-second-numeric":"100","iops":"5","number-of-reads":"1000","number-of-writes":"500","read-cache-hits":"9","read-cache-misses":"1","write-cache-hits":"8","write-cache-misses":"2","write-cache-used":"3"}]}"#,
        );
        let d = with_banner(1, "{\"disk-statistics\": [");
        let err = p.collect(&c, &d).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }
}
