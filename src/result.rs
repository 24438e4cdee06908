//! Analysis results and response validation.
//!
//! A successful response carries three facets: the ordered list of
//! findings, a metrics snapshot and the ML prediction. All three must be
//! present for the response to be accepted. Individual finding fields are
//! tolerant: a missing or oddly typed field falls back to a default rather
//! than rejecting the whole response. Named metrics may be absent but must
//! be numbers when present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::severity::{self, Classification, Tier};

/// Metric field names, in display order.
pub const METRIC_FIELDS: [&str; 6] = [
    "lines",
    "functions",
    "classes",
    "complexity",
    "avg_method_length",
    "max_nesting_depth",
];

/// Why a response body was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedResponse {
    #[error("response body is not valid JSON: {0}")]
    NotJson(String),
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response is missing `{0}`")]
    MissingFacet(&'static str),
    #[error("`{facet}` must be {expected}")]
    InvalidFacet {
        facet: &'static str,
        expected: &'static str,
    },
    #[error("`{facet}.{field}` must be {expected}")]
    InvalidField {
        facet: &'static str,
        field: String,
        expected: &'static str,
    },
}

/// One detected issue, as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub smell_type: String,
    /// 1-based line in the submitted source. `None` when absent or not positive.
    pub line_number: Option<u64>,
    pub detector: String,
    /// Raw severity label; see [`Finding::classification`].
    pub severity: Option<String>,
    pub description: String,
    pub suggestion: String,
}

impl Finding {
    pub fn classification(&self) -> Classification {
        severity::classify(self.severity.as_deref())
    }

    pub fn tier(&self) -> Tier {
        self.classification().tier
    }
}

/// Aggregate metrics, displayed as received.
///
/// A named metric is `None` when the service left it out, which it does
/// for sources it could not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub lines: Option<f64>,
    pub functions: Option<f64>,
    pub classes: Option<f64>,
    pub complexity: Option<f64>,
    pub avg_method_length: Option<f64>,
    pub max_nesting_depth: Option<f64>,
    /// Any further metrics the service sent (e.g. `comment_ratio`).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MetricsSnapshot {
    /// The six named metrics as `(field, value)` pairs in display order.
    pub fn named(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("lines", self.lines),
            ("functions", self.functions),
            ("classes", self.classes),
            ("complexity", self.complexity),
            ("avg_method_length", self.avg_method_length),
            ("max_nesting_depth", self.max_nesting_depth),
        ]
    }
}

/// Class probabilities reported alongside a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub clean: f64,
    pub smell: f64,
}

/// Binary "has code smell" classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    pub has_smell: bool,
    /// Stored as received; not clamped. See [`format_confidence`].
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
    /// Set by the service when its model failed and it fell back to a
    /// default prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The three validated facets of one successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub findings: Vec<Finding>,
    pub metrics: MetricsSnapshot,
    pub prediction: MlPrediction,
}

/// Results of the last successful analysis.
///
/// Only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultModel {
    findings: Vec<Finding>,
    metrics: Option<MetricsSnapshot>,
    prediction: Option<MlPrediction>,
}

impl ResultModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_response(response: AnalysisResponse) -> Self {
        let mut model = Self::new();
        model.replace(response.findings, response.metrics, response.prediction);
        model
    }

    /// Swap in all three facets at once.
    pub fn replace(
        &mut self,
        findings: Vec<Finding>,
        metrics: MetricsSnapshot,
        prediction: MlPrediction,
    ) {
        *self = Self {
            findings,
            metrics: Some(metrics),
            prediction: Some(prediction),
        };
    }

    /// Findings in service order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_ref()
    }

    pub fn prediction(&self) -> Option<&MlPrediction> {
        self.prediction.as_ref()
    }

    /// True until the first successful analysis.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none() && self.prediction.is_none() && self.findings.is_empty()
    }

    /// Number of findings per tier, indexed by [`Tier::rank`].
    pub fn tier_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for finding in &self.findings {
            counts[finding.tier().rank()] += 1;
        }
        counts
    }
}

/// Format a confidence in [0, 1] as a percentage with one decimal.
///
/// Out-of-range values are clamped for display only.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence.clamp(0.0, 1.0) * 100.0)
}

/// Validate a raw response body.
pub fn parse_response(body: &str) -> Result<AnalysisResponse, MalformedResponse> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| MalformedResponse::NotJson(e.to_string()))?;
    parse_value(&value)
}

/// Validate an already-decoded response body.
pub fn parse_value(value: &Value) -> Result<AnalysisResponse, MalformedResponse> {
    let root = value.as_object().ok_or(MalformedResponse::NotAnObject)?;

    let smells = facet(root, "smells")?
        .as_array()
        .ok_or(MalformedResponse::InvalidFacet {
            facet: "smells",
            expected: "an array",
        })?;
    let findings = smells
        .iter()
        .enumerate()
        .map(|(index, item)| parse_finding(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    let metrics = parse_metrics(object_facet(root, "metrics")?)?;
    let prediction = parse_prediction(object_facet(root, "ml_prediction")?)?;

    Ok(AnalysisResponse {
        findings,
        metrics,
        prediction,
    })
}

/// Fetch a top-level facet; `null` counts as missing.
fn facet<'a>(root: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, MalformedResponse> {
    match root.get(name) {
        None | Some(Value::Null) => Err(MalformedResponse::MissingFacet(name)),
        Some(value) => Ok(value),
    }
}

fn object_facet<'a>(
    root: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a Map<String, Value>, MalformedResponse> {
    facet(root, name)?
        .as_object()
        .ok_or(MalformedResponse::InvalidFacet {
            facet: name,
            expected: "an object",
        })
}

fn parse_finding(index: usize, value: &Value) -> Result<Finding, MalformedResponse> {
    let obj = value.as_object().ok_or_else(|| MalformedResponse::InvalidField {
        facet: "smells",
        field: index.to_string(),
        expected: "an object",
    })?;

    Ok(Finding {
        smell_type: text(obj, "smell_type"),
        line_number: obj
            .get("line_number")
            .and_then(Value::as_u64)
            .filter(|line| *line > 0),
        detector: text(obj, "detector"),
        severity: obj
            .get("severity")
            .and_then(Value::as_str)
            .map(str::to_string),
        description: text(obj, "description"),
        suggestion: text(obj, "suggestion"),
    })
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number(
    obj: &Map<String, Value>,
    facet: &'static str,
    field: &str,
) -> Result<f64, MalformedResponse> {
    optional_number(obj, facet, field)?.ok_or_else(|| MalformedResponse::InvalidField {
        facet,
        field: field.to_string(),
        expected: "a number",
    })
}

/// A numeric field that may be absent or `null`, but not of another type.
fn optional_number(
    obj: &Map<String, Value>,
    facet: &'static str,
    field: &str,
) -> Result<Option<f64>, MalformedResponse> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| MalformedResponse::InvalidField {
                facet,
                field: field.to_string(),
                expected: "a number",
            }),
    }
}

fn parse_metrics(obj: &Map<String, Value>) -> Result<MetricsSnapshot, MalformedResponse> {
    let extra = obj
        .iter()
        .filter(|(key, _)| !METRIC_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(MetricsSnapshot {
        lines: optional_number(obj, "metrics", "lines")?,
        functions: optional_number(obj, "metrics", "functions")?,
        classes: optional_number(obj, "metrics", "classes")?,
        complexity: optional_number(obj, "metrics", "complexity")?,
        avg_method_length: optional_number(obj, "metrics", "avg_method_length")?,
        max_nesting_depth: optional_number(obj, "metrics", "max_nesting_depth")?,
        extra,
    })
}

fn parse_prediction(obj: &Map<String, Value>) -> Result<MlPrediction, MalformedResponse> {
    let has_smell = obj
        .get("has_smell")
        .and_then(Value::as_bool)
        .ok_or_else(|| MalformedResponse::InvalidField {
            facet: "ml_prediction",
            field: "has_smell".to_string(),
            expected: "a boolean",
        })?;
    let confidence = number(obj, "ml_prediction", "confidence")?;
    if !(0.0..=1.0).contains(&confidence) {
        warn!(confidence, "prediction confidence outside [0, 1]");
    }

    let probabilities = obj
        .get("probabilities")
        .and_then(|p| serde_json::from_value::<Probabilities>(p.clone()).ok());
    let error = obj
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(MlPrediction {
        has_smell,
        confidence,
        probabilities,
        error,
    })
}
