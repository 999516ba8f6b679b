//! Processing reports
//!
//! Text and JSON renderings of a published snapshot, as printed by the
//! command-line tool.

use nckit_interpreter::{Bounds, Diagnostic, JobSnapshot, MachineState, Move};
use serde::Serialize;
use std::fmt::Write;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{}', expected text or json", other)),
        }
    }
}

/// Everything a processing run produced
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub identity: &'a str,
    pub generation: u64,
    pub line_count: usize,
    pub move_count: usize,
    pub bounds: Option<Bounds>,
    pub final_state: &'a MachineState,
    pub diagnostics: &'a [Diagnostic],
    pub moves: &'a [Move],
}

impl<'a> Report<'a> {
    pub fn new(snapshot: &'a JobSnapshot) -> Self {
        Self {
            identity: &snapshot.identity,
            generation: snapshot.generation,
            line_count: snapshot.program.line_count(),
            move_count: snapshot.move_count(),
            bounds: snapshot.moves.bounds(),
            final_state: &snapshot.final_state,
            diagnostics: &snapshot.diagnostics,
            moves: snapshot.moves.as_slice(),
        }
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    /// Human-readable listing, one move per line
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} lines, {} moves, {} diagnostics",
            self.identity,
            self.line_count,
            self.move_count,
            self.diagnostics.len()
        );
        if let Some(bounds) = &self.bounds {
            let _ = writeln!(out, "bounds: {} .. {}", bounds.min, bounds.max);
        }

        for mv in self.moves {
            let _ = writeln!(out, "{}", move_line(mv));
        }
        for diagnostic in self.diagnostics {
            let _ = writeln!(out, "{}", diagnostic);
        }

        let _ = writeln!(out, "final state: {}", self.final_state.description());
        out
    }
}

/// One-line summary of a move; source lines are shown 1-based
pub fn move_line(mv: &Move) -> String {
    format!(
        "#{:<5} line {:<5} G{:02}  X{:.3} Y{:.3} Z{:.3} -> X{:.3} Y{:.3} Z{:.3}",
        mv.index,
        mv.line + 1,
        mv.kind.gcode(),
        mv.start.x,
        mv.start.y,
        mv.start.z,
        mv.end.x,
        mv.end.y,
        mv.end.z
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nckit_interpreter::Job;

    #[test]
    fn test_text_report() {
        let job = Job::default();
        let snapshot = job
            .load_blocking("G90\nG1 X10 Y0\nG1 X1.2.3\nG1 Y10", "part.nc")
            .expect("processed");
        let text = Report::new(&snapshot).to_text();

        assert!(text.starts_with("part.nc: 4 lines, 2 moves, 1 diagnostics"));
        assert!(text.contains(
            "#0     line 2     G01  X0.000 Y0.000 Z0.000 -> X10.000 Y0.000 Z0.000"
        ));
        assert!(text.contains("line 3: "));
        assert!(text.contains("final state: G1"));
    }

    #[test]
    fn test_json_report() {
        let job = Job::default();
        let snapshot = job.load_blocking("G0 X1\nG1 Y2", "p.nc").expect("processed");
        let json = Report::new(&snapshot)
            .render(ReportFormat::Json)
            .expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["identity"], "p.nc");
        assert_eq!(value["move_count"], 2);
        assert_eq!(value["moves"][1]["line"], 1);
        assert!(value["diagnostics"].as_array().is_some_and(|d| d.is_empty()));
    }

    #[tokio::test]
    async fn test_json_report_for_file_on_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let program = dir.path().join("pocket.tap");
        std::fs::write(&program, "G21 G90\nG0 Z5\nG1 Z-1 F200\nG2 X10 Y0 I5 J0\n")
            .expect("write");

        let job = Job::default();
        let snapshot = job
            .load_file(&program)
            .await
            .expect("readable")
            .wait()
            .await
            .expect("processed");

        let json = Report::new(&snapshot)
            .render(ReportFormat::Json)
            .expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["move_count"], 3);
        assert_eq!(value["line_count"], 5);
        assert_eq!(value["moves"][2]["kind"], "arc_clockwise");
        assert!(value["moves"][2]["arc"].is_object());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert_eq!("text".parse::<ReportFormat>(), Ok(ReportFormat::Text));
        assert!("yaml".parse::<ReportFormat>().is_err());
    }
}
