use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for one turn of the critique loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    TurnStarted {
        question: String,
        max_cycles: usize,
    },
    RetrievalCompleted {
        passages: usize,
        top_score: Option<f32>,
    },
    GenerationStarted {
        cycle: usize,
        refinement: bool,
    },
    GenerationCompleted {
        cycle: usize,
        answer_chars: usize,
        duration_secs: f64,
    },
    JudgeStarted {
        cycle: usize,
    },
    JudgeCompleted {
        cycle: usize,
        label: String,
        rationale_preview: String,
    },
    TurnResolved {
        cycles: usize,
        duration_secs: f64,
    },
    MaxCyclesReached {
        cycles: usize,
        duration_secs: f64,
    },
    ErrorEncountered {
        cycle: usize,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for turn events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File sink is always JSON lines, regardless of console format
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::TurnStarted {
                question,
                max_cycles,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(stderr, "{}", "groundcheck".bold().bright_white());
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "Question:".dimmed(),
                    Self::truncate(question, 70).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "Budget:".dimmed(),
                    format!("{} cycles", max_cycles).dimmed()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RetrievalCompleted { passages, top_score } => {
                let score = top_score
                    .map(|s| format!("{:.3}", s))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    stderr,
                    "  {} {} passages (top score {})",
                    "retrieved".bright_blue(),
                    passages,
                    score
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GenerationStarted { cycle, refinement } => {
                let _ = writeln!(
                    stderr,
                    "{}",
                    format!("─ Cycle {} ", cycle).bright_blue().bold()
                );
                let mode = if *refinement { "GENERATOR (refine)" } else { "GENERATOR" };
                let _ = writeln!(stderr, "  {} {}", "▶".bright_cyan(), mode.bright_cyan().bold());
            }
            LogEvent::GenerationCompleted {
                duration_secs,
                answer_chars,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} chars ({:.1}s)",
                    "✓".bright_green(),
                    answer_chars,
                    duration_secs
                );
            }
            LogEvent::JudgeStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold()
                );
            }
            LogEvent::JudgeCompleted {
                label,
                rationale_preview,
                ..
            } => {
                let styled = match label.as_str() {
                    "CORRECT" => format!("✓ {}", label).bright_green().to_string(),
                    "MAX_CYCLES" => format!("✗ {}", label).bright_red().to_string(),
                    _ => format!("→ {}", label).bright_yellow().to_string(),
                };
                let _ = writeln!(stderr, "    {}", styled);
                if !rationale_preview.is_empty() {
                    let _ = writeln!(
                        stderr,
                        "    {}",
                        Self::truncate(rationale_preview, 70).dimmed()
                    );
                }
                let _ = writeln!(stderr);
            }
            LogEvent::TurnResolved {
                cycles,
                duration_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} Resolved in {} {} ({:.1}s)",
                    "✓".bright_green().bold(),
                    cycles,
                    if *cycles == 1 { "cycle" } else { "cycles" },
                    duration_secs
                );
            }
            LogEvent::MaxCyclesReached {
                cycles,
                duration_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} Cycle budget exhausted after {} cycles ({:.1}s)",
                    "✗".bright_red().bold(),
                    cycles,
                    duration_secs
                );
            }
            LogEvent::ErrorEncountered { cycle, error } => {
                let _ = writeln!(
                    stderr,
                    "{} Cycle {} failed: {}",
                    "✗".bright_red().bold(),
                    cycle,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let line = match event {
            LogEvent::TurnStarted { question, .. } => {
                format!("turn start: {}", Self::truncate(question, 60))
            }
            LogEvent::RetrievalCompleted { passages, .. } => {
                format!("retrieved {} passages", passages)
            }
            LogEvent::GenerationStarted { cycle, refinement } => {
                format!(
                    "cycle {} generate{}",
                    cycle,
                    if *refinement { " (refine)" } else { "" }
                )
            }
            LogEvent::GenerationCompleted {
                cycle,
                duration_secs,
                ..
            } => format!("cycle {} generated ({:.1}s)", cycle, duration_secs),
            LogEvent::JudgeStarted { cycle } => format!("cycle {} judge", cycle),
            LogEvent::JudgeCompleted { cycle, label, .. } => {
                format!("cycle {} verdict {}", cycle, label)
            }
            LogEvent::TurnResolved {
                cycles,
                duration_secs,
            } => format!("resolved in {} cycles ({:.1}s)", cycles, duration_secs),
            LogEvent::MaxCyclesReached { cycles, .. } => {
                format!("max cycles reached ({})", cycles)
            }
            LogEvent::ErrorEncountered { cycle, error } => {
                format!("cycle {} error: {}", cycle, error)
            }
        };
        let _ = writeln!(stderr, "{}", line);
    }

    fn truncate(text: &str, max_chars: usize) -> String {
        let flat = text.replace('\n', " ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}…", cut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert!(LogFormat::from_str("verbose").is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::JudgeCompleted {
            cycle: 2,
            label: "HALLUCINATION".to_string(),
            rationale_preview: "unsupported claim".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "judge_completed");
        assert_eq!(json["cycle"], 2);
    }

    #[test]
    fn test_file_sink_writes_jsonl() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs/turn.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::TurnResolved {
            cycles: 1,
            duration_secs: 0.5,
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(line["event"], "turn_resolved");
        assert!(line["timestamp"].is_string());
    }
}
