//! Output formatting for analysis sessions.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::result::{format_confidence, Finding, MetricsSnapshot, MlPrediction, ResultModel};
use crate::session::SessionSnapshot;
use crate::severity::{Icon, Tier};

/// Labels for the six named metrics, keyed by field name.
fn metric_label(field: &str) -> &'static str {
    match field {
        "lines" => "Lines of Code",
        "functions" => "Functions",
        "classes" => "Classes",
        "complexity" => "Complexity",
        "avg_method_length" => "Avg Method Length",
        "max_nesting_depth" => "Max Nesting",
        _ => "Other",
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generation: u64,
    pub issue_count: usize,
    pub tier_counts: BTreeMap<String, usize>,
    pub findings: Vec<JsonFinding>,
    pub metrics: Option<MetricsSnapshot>,
    pub ml_prediction: Option<MlPrediction>,
}

/// A finding with its display classification attached.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFinding {
    pub smell_type: String,
    pub line_number: Option<u64>,
    pub detector: String,
    pub severity: Option<String>,
    pub tier: Tier,
    pub icon: Icon,
    pub description: String,
    pub suggestion: String,
}

/// Build the JSON report for a session snapshot.
pub fn build_json(snapshot: &SessionSnapshot) -> JsonReport {
    let results = &snapshot.results;
    let counts = results.tier_counts();
    let tier_counts = Tier::ALL
        .iter()
        .map(|tier| (tier.as_str().to_string(), counts[tier.rank()]))
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: snapshot.status.as_str().to_string(),
        error: snapshot.status.last_error().map(str::to_string),
        generation: snapshot.generation,
        issue_count: results.findings().len(),
        tier_counts,
        findings: results.findings().iter().map(finding_to_json).collect(),
        metrics: results.metrics().cloned(),
        ml_prediction: results.prediction().cloned(),
    }
}

/// Write a session snapshot in JSON format.
pub fn write_json(snapshot: &SessionSnapshot) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&build_json(snapshot))?;
    println!("{}", json);
    Ok(())
}

fn finding_to_json(f: &Finding) -> JsonFinding {
    let class = f.classification();
    JsonFinding {
        smell_type: f.smell_type.clone(),
        line_number: f.line_number,
        detector: f.detector.clone(),
        severity: f.severity.clone(),
        tier: class.tier,
        icon: class.icon,
        description: f.description.clone(),
        suggestion: f.suggestion.clone(),
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a session snapshot in pretty (human-readable) format.
pub fn write_pretty<W: Write>(
    out: &mut W,
    source: &str,
    endpoint: &str,
    snapshot: &SessionSnapshot,
) -> io::Result<()> {
    // Header
    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        "smellcheck".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Source:   ".dimmed(), source)?;
    writeln!(out, "  {}{}", "Endpoint: ".dimmed(), endpoint)?;
    writeln!(out)?;

    if let Some(error) = snapshot.status.last_error() {
        writeln!(out, "  {} {}", "✗ Error:".red().bold(), error)?;
        writeln!(out)?;
    }

    let results = &snapshot.results;
    if results.is_empty() {
        return Ok(());
    }

    if let Some(prediction) = results.prediction() {
        write_prediction(out, prediction)?;
        writeln!(out)?;
    }

    write_findings(out, results, snapshot.status.is_in_flight())?;

    if let Some(metrics) = results.metrics() {
        write_metrics(out, metrics)?;
        writeln!(out)?;
    }

    Ok(())
}

fn write_prediction<W: Write>(out: &mut W, prediction: &MlPrediction) -> io::Result<()> {
    let verdict = if prediction.has_smell {
        "Code Smell Detected".red().bold()
    } else {
        "Clean Code".green().bold()
    };
    writeln!(
        out,
        "  {}  {}  Confidence: {}",
        "ML Prediction:".bold(),
        verdict,
        format_confidence(prediction.confidence)
    )?;

    if let Some(p) = &prediction.probabilities {
        writeln!(
            out,
            "  {}",
            format!(
                "clean {}  smell {}",
                format_confidence(p.clean),
                format_confidence(p.smell)
            )
            .dimmed()
        )?;
    }
    if let Some(error) = &prediction.error {
        writeln!(out, "  {}", format!("model error: {}", error).yellow())?;
    }
    Ok(())
}

fn write_findings<W: Write>(out: &mut W, results: &ResultModel, in_flight: bool) -> io::Result<()> {
    let findings = results.findings();
    if findings.is_empty() {
        if !in_flight {
            writeln!(out, "  {}", "✨ No code smells detected!".green())?;
            writeln!(out)?;
        }
        return Ok(());
    }

    writeln!(
        out,
        "  {} ({} Issues Found):",
        "Analysis Results".bold(),
        findings.len()
    )?;
    writeln!(out)?;

    for f in findings {
        write_finding(out, f)?;
    }

    write_tier_counts(out, results)?;
    writeln!(out)
}

fn write_finding<W: Write>(out: &mut W, f: &Finding) -> io::Result<()> {
    let class = f.classification();
    let line = f
        .line_number
        .map(|n| format!("Line {}", n))
        .unwrap_or_else(|| "Line ?".to_string());

    writeln!(
        out,
        "    {} {}  {}",
        class.icon.glyph(),
        colored_tier(class.tier, &f.smell_type),
        format!("{} • {}", line, f.detector).dimmed()
    )?;
    if !f.description.is_empty() {
        writeln!(out, "       {}", f.description)?;
    }
    if !f.suggestion.is_empty() {
        writeln!(out, "       💡 {} {}", "Suggestion:".bold(), f.suggestion)?;
    }
    writeln!(out)
}

fn colored_tier(tier: Tier, text: &str) -> ColoredString {
    match tier {
        Tier::High => text.red().bold(),
        Tier::Medium => text.yellow().bold(),
        Tier::Low => text.blue().bold(),
        Tier::Info => text.green(),
    }
}

fn write_tier_counts<W: Write>(out: &mut W, results: &ResultModel) -> io::Result<()> {
    let counts = results.tier_counts();
    let parts: Vec<String> = Tier::ALL
        .iter()
        .filter(|tier| counts[tier.rank()] > 0)
        .map(|tier| format!("{} {}", counts[tier.rank()], tier))
        .collect();
    writeln!(out, "  {}", parts.join(", ").dimmed())
}

fn write_metrics<W: Write>(out: &mut W, metrics: &MetricsSnapshot) -> io::Result<()> {
    writeln!(out, "  {}", "Code Metrics:".bold())?;
    for (field, value) in metrics.named() {
        let value = value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "    {:<20} {}", metric_label(field), value)?;
    }
    for (field, value) in &metrics.extra {
        writeln!(out, "    {:<20} {}", field.dimmed(), value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::parse_response;
    use crate::session::Status;
    use std::sync::Arc;

    const SMELLY: &str = r#"{
        "smells": [
            {"smell_type": "Long Parameter List", "severity": "high", "line_number": 1,
             "detector": "rule-based", "description": "8 parameters", "suggestion": "Group them"},
            {"smell_type": "Magic Number", "severity": "surprising", "line_number": 33,
             "detector": "rule-based", "description": "500", "suggestion": "Name it"}
        ],
        "metrics": {"lines": 30, "functions": 3, "classes": 1, "complexity": 9,
                    "avg_method_length": 10.0, "max_nesting_depth": 4, "comment_ratio": 0.0},
        "ml_prediction": {"has_smell": true, "confidence": 0.845}
    }"#;

    fn snapshot(status: Status, body: Option<&str>) -> SessionSnapshot {
        let results = body
            .map(|b| ResultModel::from_response(parse_response(b).unwrap()))
            .unwrap_or_default();
        SessionSnapshot {
            status,
            generation: 1,
            results: Arc::new(results),
        }
    }

    fn render(snapshot: &SessionSnapshot) -> String {
        let mut out = Vec::new();
        write_pretty(&mut out, "sample.py", "http://localhost:8000", snapshot).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_json_report_shape() {
        let report = build_json(&snapshot(Status::Succeeded, Some(SMELLY)));
        assert_eq!(report.status, "succeeded");
        assert_eq!(report.error, None);
        assert_eq!(report.issue_count, 2);
        assert_eq!(report.findings[0].tier, Tier::High);
        assert_eq!(report.findings[0].icon, Icon::Red);
        assert_eq!(report.findings[1].tier, Tier::Info);
        assert_eq!(report.tier_counts["high"], 1);
        assert_eq!(report.tier_counts["info"], 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["findings"][1]["icon"], "check-mark");
        assert_eq!(json["metrics"]["comment_ratio"], 0.0);
    }

    #[test]
    fn test_json_report_failed() {
        let status = Status::Failed {
            error: "request timed out".to_string(),
        };
        let report = build_json(&snapshot(status, None));
        assert_eq!(report.status, "failed");
        assert_eq!(report.error.as_deref(), Some("request timed out"));
        assert!(report.metrics.is_none());
        assert!(report.ml_prediction.is_none());
    }

    #[test]
    fn test_pretty_lists_findings_in_order() {
        let text = render(&snapshot(Status::Succeeded, Some(SMELLY)));
        let first = text.find("Long Parameter List").unwrap();
        let second = text.find("Magic Number").unwrap();
        assert!(first < second);
        assert!(text.contains("2 Issues Found"));
        assert!(text.contains("Line 33"));
        assert!(text.contains("84.5%"));
        assert!(text.contains("Code Smell Detected"));
        assert!(text.contains("Lines of Code"));
        assert!(text.contains("comment_ratio"));
    }

    #[test]
    fn test_pretty_clean_result() {
        let body = r#"{"smells": [],
            "metrics": {"lines": 1, "functions": 0, "classes": 0, "complexity": 1,
                        "avg_method_length": 0, "max_nesting_depth": 0},
            "ml_prediction": {"has_smell": false, "confidence": 0.92}}"#;
        let text = render(&snapshot(Status::Succeeded, Some(body)));
        assert!(text.contains("Clean Code"));
        assert!(text.contains("92.0%"));
        assert!(text.contains("No code smells detected!"));
    }

    #[test]
    fn test_pretty_absent_metric_shows_dash() {
        let body = r#"{"smells": [],
            "metrics": {"lines": 0, "functions": 0, "classes": 0, "complexity": 0,
                        "avg_method_length": 0, "comment_ratio": 0},
            "ml_prediction": {"has_smell": false, "confidence": 0.0, "features": null,
                              "error": "Failed to extract features"}}"#;
        let text = render(&snapshot(Status::Succeeded, Some(body)));
        let nesting = text
            .lines()
            .find(|line| line.contains("Max Nesting"))
            .unwrap();
        assert!(nesting.trim_end().ends_with('-'));
        assert!(text.contains("model error: Failed to extract features"));
    }

    #[test]
    fn test_pretty_error_keeps_stale_results() {
        let status = Status::Failed {
            error: "analysis service returned HTTP 500".to_string(),
        };
        let text = render(&snapshot(status, Some(SMELLY)));
        assert!(text.contains("HTTP 500"));
        assert!(text.contains("Long Parameter List"));
    }
}
