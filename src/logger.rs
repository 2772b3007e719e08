use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Pipeline throughput counters reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub translations: usize,
    pub books: usize,
    pub chapters: usize,
    pub verses: usize,
    pub files_written: usize,
}

/// End-of-run summary. Only warnings and errors are carried here; info
/// lines live in the run's JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub run_id: String,
    pub finished_at: String,
    pub summary: ReportSummary,
    pub problems: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
    pub processed: RunStats,
}

struct LoggerInner {
    sink: File,
    problems: Vec<LogEntry>,
    errors: usize,
    warnings: usize,
}

/// Structured JSONL diagnostics, one `run-<id>.jsonl` file per invocation.
/// Every entry goes straight to disk as it is logged; warnings and errors
/// are additionally retained for the report. Clones share the sink and the
/// counters.
#[derive(Clone)]
pub struct DiagnosticLogger {
    log_dir: PathBuf,
    run_id: String,
    inner: Arc<Mutex<LoggerInner>>,
}

impl DiagnosticLogger {
    pub fn new(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

        let run_id = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let sink_path = log_dir.join(format!("run-{}.jsonl", run_id));
        let sink = File::create(&sink_path)
            .with_context(|| format!("Failed to create log file: {:?}", sink_path))?;

        Ok(DiagnosticLogger {
            log_dir: log_dir.to_path_buf(),
            run_id,
            inner: Arc::new(Mutex::new(LoggerInner {
                sink,
                problems: Vec::new(),
                errors: 0,
                warnings: 0,
            })),
        })
    }

    pub fn log(&self, level: LogLevel, message: String, context: Option<Value>) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            level,
            message,
            context,
        };

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if let Ok(line) = serde_json::to_string(&entry) {
            let _ = writeln!(inner.sink, "{}", line);
        }
        match level {
            LogLevel::Error => {
                inner.errors += 1;
                inner.problems.push(entry);
            }
            LogLevel::Warning => {
                inner.warnings += 1;
                inner.problems.push(entry);
            }
            LogLevel::Info => {}
        }
    }

    pub fn info(&self, message: String) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warning(&self, message: String, context: Option<Value>) {
        self.log(LogLevel::Warning, message, context);
    }

    pub fn error(&self, message: String, context: Option<Value>) {
        self.log(LogLevel::Error, message, context);
    }

    /// Assemble the run report. Entries are already on disk, so this only
    /// snapshots the counters and the collected problems.
    pub fn generate_report(&self, stats: RunStats) -> DiagnosticReport {
        let (errors, warnings, problems) = match self.inner.lock() {
            Ok(inner) => (inner.errors, inner.warnings, inner.problems.clone()),
            Err(_) => (0, 0, Vec::new()),
        };
        DiagnosticReport {
            run_id: self.run_id.clone(),
            finished_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            summary: ReportSummary {
                errors,
                warnings,
                processed: stats,
            },
            problems,
        }
    }

    /// Keep the newest `keep` run logs. Run ids are zero-padded UTC
    /// timestamps, so filename order is chronological and no filesystem
    /// metadata is consulted.
    pub fn rotate_logs(&self, keep: usize) -> Result<()> {
        let mut names: Vec<String> = fs::read_dir(&self.log_dir)
            .with_context(|| format!("Failed to list log directory: {:?}", self.log_dir))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("run-") && name.ends_with(".jsonl"))
            .collect();

        if names.len() <= keep {
            return Ok(());
        }
        names.sort();
        for name in &names[..names.len() - keep] {
            let path = self.log_dir.join(name);
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete old log file: {:?}", path))?;
        }
        Ok(())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}
