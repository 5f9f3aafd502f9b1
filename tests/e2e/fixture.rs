//! E2E test fixture with step logging and checkpointing.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

use invsearch::test_utils::fixtures::{sample_items, to_jsonl};

/// Checkpoint snapshot for test debugging.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub name: String,
    pub timestamp: Duration,
    pub step_count: usize,
    pub db_state: Option<String>,
    pub files: usize,
}

/// Step result for report generation.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration: Duration,
    pub output_summary: String,
}

/// E2E test fixture providing an isolated data root.
pub struct E2EFixture {
    pub scenario_name: String,
    pub temp_dir: TempDir,
    /// Working directory for the binary
    pub root: PathBuf,
    /// invs data root (./.invs)
    pub data_root: PathBuf,
    /// Extra environment for every command
    pub env: Vec<(String, String)>,
    start_time: Instant,
    step_count: usize,
    checkpoints: Vec<Checkpoint>,
    step_results: Vec<StepResult>,
}

impl E2EFixture {
    pub fn new(scenario_name: &str) -> Self {
        let start_time = Instant::now();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let data_root = root.join(".invs");

        println!();
        println!("{}", "█".repeat(70));
        println!("█ E2E SCENARIO: {scenario_name}");
        println!("{}", "█".repeat(70));
        println!("[E2E] Root: {}", root.display());
        println!("[E2E] Data root: {}", data_root.display());

        Self {
            scenario_name: scenario_name.to_string(),
            temp_dir,
            root,
            data_root,
            env: Vec::new(),
            start_time,
            step_count: 0,
            checkpoints: Vec::new(),
            step_results: Vec::new(),
        }
    }

    /// Set an environment variable for subsequent commands.
    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env.retain(|(k, _)| k != key);
        self.env.push((key.to_string(), value.to_string()));
    }

    pub fn log_step(&mut self, description: &str) {
        self.step_count += 1;
        println!();
        println!("┌{}", "─".repeat(68));
        println!("│ STEP {}: {}", self.step_count, description);
        println!("│ Time: {:?}", self.start_time.elapsed());
        println!("└{}", "─".repeat(68));
    }

    pub fn checkpoint(&mut self, name: &str) {
        let db_state = self.db_state();
        let checkpoint = Checkpoint {
            name: name.to_string(),
            timestamp: self.start_time.elapsed(),
            step_count: self.step_count,
            db_state,
            files: count_files(&self.root),
        };
        println!("[CHECKPOINT] {} files={}", name, checkpoint.files);
        if let Some(state) = &checkpoint.db_state {
            println!("[CHECKPOINT] DB: {state}");
        }
        self.checkpoints.push(checkpoint);
    }

    /// Run the invs binary and capture output.
    pub fn run_invs(&mut self, args: &[&str]) -> CommandOutput {
        let step_name = format!("invs {}", args.join(" "));
        let start = Instant::now();
        println!("[CMD] {step_name}");

        let mut command = Command::new(env!("CARGO_BIN_EXE_invs"));
        command
            .arg("--quiet")
            .args(args)
            .env("HOME", &self.root)
            .env("XDG_CONFIG_HOME", self.root.join("xdg"))
            .env("INVS_ROOT", &self.data_root)
            .env_remove("INVS_CONFIG")
            .current_dir(&self.root);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        let output = command.output().expect("Failed to execute invs");

        let elapsed = start.elapsed();
        let result = CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed,
        };

        println!("[CMD] Exit: {} ({:?})", result.exit_code, elapsed);
        if !result.stdout.is_empty() {
            println!("[STDOUT] {}", truncate(&result.stdout, 500));
        }
        if !result.stderr.is_empty() {
            println!("[STDERR] {}", result.stderr);
        }

        let summary = if result.success {
            format!("OK ({})", truncate(&result.stdout, 50))
        } else {
            format!("FAIL: {}", truncate(&result.stderr, 100))
        };
        self.step_results.push(StepResult {
            name: step_name,
            success: result.success,
            duration: elapsed,
            output_summary: summary,
        });
        result
    }

    /// Run in robot mode, assert success and parse the envelope.
    pub fn run_json(&mut self, args: &[&str]) -> Value {
        let mut full = vec!["--robot"];
        full.extend_from_slice(args);
        let output = self.run_invs(&full);
        self.assert_success(&output, &args.join(" "));
        output.json()
    }

    /// Write the sample catalog and import it.
    pub fn import_sample_catalog(&mut self) -> Value {
        let path = self.root.join("catalog.jsonl");
        std::fs::write(&path, to_jsonl(&sample_items()).expect("serialize catalog"))
            .expect("write catalog");
        let path = path.to_string_lossy().to_string();
        self.run_json(&["import", &path])
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_root.join("inventory.db")
    }

    pub fn assert_success(&self, output: &CommandOutput, operation: &str) {
        assert!(
            output.success,
            "[E2E] {} failed with exit code {}: {}",
            operation, output.exit_code, output.stderr
        );
        println!("[ASSERT] {operation} - SUCCESS");
    }

    pub fn assert_output_contains(&self, output: &CommandOutput, expected: &str) {
        assert!(
            output.stdout.contains(expected) || output.stderr.contains(expected),
            "[E2E] Output does not contain '{}'\nStdout: {}\nStderr: {}",
            expected,
            truncate(&output.stdout, 500),
            truncate(&output.stderr, 500)
        );
        println!("[ASSERT] Output contains '{expected}' - PASSED");
    }

    pub fn generate_report(&self) {
        println!();
        println!("{}", "█".repeat(70));
        println!("█ E2E REPORT: {}", self.scenario_name);
        println!("{}", "█".repeat(70));
        println!("Total Steps: {}", self.step_count);
        println!("Checkpoints: {}", self.checkpoints.len());
        println!("Total Time:  {:?}", self.start_time.elapsed());
        for (i, step) in self.step_results.iter().enumerate() {
            let status = if step.success { "✓" } else { "✗" };
            println!("{:2}. {} {} ({:?})", i + 1, status, step.name, step.duration);
            if !step.success {
                println!("     └─ {}", step.output_summary);
            }
        }
        for checkpoint in &self.checkpoints {
            println!(
                "  [{:?}] {} (step {}, {} files)",
                checkpoint.timestamp, checkpoint.name, checkpoint.step_count, checkpoint.files
            );
        }
        let failed = self.step_results.iter().filter(|s| !s.success).count();
        if failed == 0 {
            println!("RESULT: ✓ ALL STEPS PASSED");
        } else {
            println!("RESULT: ✗ {failed} STEPS FAILED");
        }
    }

    fn db_state(&self) -> Option<String> {
        let path = self.db_path();
        if !path.exists() {
            return None;
        }
        let db = Connection::open(&path).ok()?;
        let count = |sql: &str| db.query_row::<i64, _, _>(sql, [], |r| r.get(0)).ok();
        Some(format!(
            "items={} embeddings={} fts={}",
            count("SELECT COUNT(*) FROM items")?,
            count("SELECT COUNT(*) FROM items WHERE embedding IS NOT NULL")?,
            count("SELECT COUNT(*) FROM items_fts")?,
        ))
    }
}

impl Drop for E2EFixture {
    fn drop(&mut self) {
        println!(
            "█ E2E CLEANUP: {} ({:?}) {}",
            self.scenario_name,
            self.start_time.elapsed(),
            self.temp_dir.path().display()
        );
    }
}

pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout).unwrap_or_else(|err| {
            panic!("stdout is not JSON ({err}): {}", self.stdout);
        })
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() { count_files(&path) } else { 1 }
                })
                .sum()
        })
        .unwrap_or(0)
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

pub fn item_names(json: &Value) -> Vec<String> {
    json["data"]["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
