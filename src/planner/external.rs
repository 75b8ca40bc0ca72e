use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use serde::Serialize;

use super::{
    InsertionPlan, InsertionPlanner, PlanRequest, StructureDigest, parse_plan_response,
};
use crate::error::Error;

/// Reads a prepared plan from disk.
#[derive(Clone, Debug)]
pub struct FilePlanner {
    pub path: PathBuf,
}

impl FilePlanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InsertionPlanner for FilePlanner {
    fn name(&self) -> &str {
        "file"
    }

    fn plan(&self, _request: &PlanRequest) -> Result<InsertionPlan, Error> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            Error::Oracle(format!("cannot read plan {}: {e}", self.path.display()))
        })?;
        parse_plan_response(&text)
    }
}

#[derive(Serialize)]
struct ImageSummary<'a> {
    index: usize,
    filename: &'a str,
    content_type: &'a str,
    width: Option<u32>,
    height: Option<u32>,
    path: String,
}

#[derive(Serialize)]
struct CommandInput<'a> {
    structure: StructureDigest,
    text_digest: String,
    images: Vec<ImageSummary<'a>>,
}

/// Runs an external program as the planner. The request goes to its stdin as
/// JSON and the plan is read from its stdout.
#[derive(Clone, Debug)]
pub struct CommandPlanner {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandPlanner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a command line on whitespace. No shell quoting is applied.
    pub fn from_command_line(line: &str) -> Result<Self, Error> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::InvalidInput("planner command is empty".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn input(request: &PlanRequest) -> Result<Vec<u8>, Error> {
        let input = CommandInput {
            structure: request.json_digest(),
            text_digest: request.text_digest(),
            images: request
                .images
                .iter()
                .map(|img| ImageSummary {
                    index: img.index,
                    filename: &img.filename,
                    content_type: &img.content_type,
                    width: img.width,
                    height: img.height,
                    path: img.storage_path.display().to_string(),
                })
                .collect(),
        };
        Ok(serde_json::to_vec(&input)?)
    }
}

impl InsertionPlanner for CommandPlanner {
    fn name(&self) -> &str {
        "command"
    }

    fn plan(&self, request: &PlanRequest) -> Result<InsertionPlan, Error> {
        let t0 = Instant::now();
        let payload = Self::input(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Oracle(format!("cannot start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Oracle("planner stdin unavailable".into()))?;
        let writer = std::thread::spawn(move || stdin.write_all(&payload));

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Oracle(format!("{} failed: {e}", self.program)))?;
        // A planner may exit without reading its input.
        if let Ok(Err(e)) = writer.join() {
            log::debug!("Writing planner input: {e}");
        }

        if !output.status.success() {
            return Err(Error::Oracle(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let plan = parse_plan_response(&String::from_utf8_lossy(&output.stdout))?;
        log::debug!(
            "Planner {} returned {} decisions ({:.1}ms)",
            self.program,
            plan.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentStructure;

    fn empty_structure() -> DocumentStructure {
        DocumentStructure::from_paragraphs(Vec::new())
    }

    #[test]
    fn file_planner_reads_plan() {
        let dir = std::env::temp_dir().join(format!("docxide-images-plan-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plan.json");
        fs::write(&path, r#"[{"image_index": 0, "insert_after_para": 3}]"#).unwrap();

        let s = empty_structure();
        let plan = FilePlanner::new(&path)
            .plan(&PlanRequest::new(&s, &[]))
            .unwrap();
        assert_eq!(plan[0].insert_after_paragraph, 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_plan_file_is_oracle_error() {
        let s = empty_structure();
        let result = FilePlanner::new("/nonexistent/plan.json").plan(&PlanRequest::new(&s, &[]));
        assert!(matches!(result, Err(Error::Oracle(_))));
    }

    #[test]
    fn command_line_splits_args() {
        let planner = CommandPlanner::from_command_line("python3 plan.py --vision").unwrap();
        assert_eq!(planner.program, "python3");
        assert_eq!(planner.args, ["plan.py", "--vision"]);
        assert!(CommandPlanner::from_command_line("   ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn command_planner_parses_stdout() {
        let planner = CommandPlanner {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                r#"cat > /dev/null; echo '```json'; echo '[{"image_index": 0, "insert_after_para": 1}]'; echo '```'"#.into(),
            ],
        };
        let s = empty_structure();
        let plan = planner.plan(&PlanRequest::new(&s, &[])).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].insert_after_paragraph, 1);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_oracle_error() {
        let planner = CommandPlanner {
            program: "sh".into(),
            args: vec!["-c".into(), "exit 3".into()],
        };
        let s = empty_structure();
        let result = planner.plan(&PlanRequest::new(&s, &[]));
        assert!(matches!(result, Err(Error::Oracle(_))));
    }
}
