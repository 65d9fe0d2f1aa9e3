//! Graphic decision and specification.
//!
//! The model never returns executable code. It is asked for a declarative
//! chart specification (type, series, labels) which a fixed renderer draws;
//! anything that does not parse into [`ChartSpec`] is discarded.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::llm_client::LlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Declarative chart specification, the only contract between the model and
/// the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// A spec is renderable when every series is aligned with the category
    /// labels and, for pies, all slice values are non-negative.
    pub fn is_renderable(&self) -> bool {
        if self.labels.is_empty() || self.series.is_empty() {
            return false;
        }
        if !self.series.iter().all(|s| {
            s.values.len() == self.labels.len() && s.values.iter().all(|v| v.is_finite())
        }) {
            return false;
        }
        if self.kind == ChartKind::Pie {
            let slices = &self.series[0].values;
            if slices.iter().any(|v| *v < 0.0) || slices.iter().sum::<f64>() <= 0.0 {
                return false;
            }
        }
        true
    }
}

pub struct GraphicStage {
    llm: Arc<dyn LlmProvider>,
}

impl GraphicStage {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Asks the model whether a chart would add value. Any classifier
    /// failure means "no": an error path must never reach the renderer.
    pub async fn needs_graphic(&self, query: &str, response: &str) -> bool {
        let prompt = format!(
            "Decide whether the following answer would benefit from a chart.\n\
             Reply with exactly one word, yes or no.\n\n\
             Query: {}\nAnswer: {}",
            query, response
        );

        match self.llm.generate(&prompt).await {
            Ok(verdict) => verdict.trim().to_lowercase().starts_with("yes"),
            Err(e) => {
                tracing::warn!("Graphic classifier failed, assuming no chart: {}", e);
                false
            }
        }
    }

    /// Asks the model for a chart specification. Returns `None` on call
    /// failure, unparsable output, or a spec the renderer would reject.
    pub async fn generate_chart_spec(&self, query: &str, response: &str) -> Option<ChartSpec> {
        let prompt = format!(
            "Produce a chart specification for the data discussed below.\n\
             Respond with JSON only, no prose, matching this schema:\n\
             {{\"kind\": \"bar\"|\"line\"|\"pie\", \"title\": string, \
             \"x_label\": string, \"y_label\": string, \
             \"labels\": [string], \"series\": [{{\"name\": string, \"values\": [number]}}]}}\n\
             Every series must have exactly one value per label.\n\n\
             Query: {}\nAnswer: {}",
            query, response
        );

        let raw = match self.llm.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Chart spec generation failed: {}", e);
                return None;
            }
        };

        match parse_chart_spec(&raw) {
            Some(spec) => Some(spec),
            None => {
                tracing::warn!("Model returned an unrenderable chart spec, dropping it");
                None
            }
        }
    }
}

/// Parses a [`ChartSpec`] from model output, tolerating a fenced ```json
/// block around the payload.
pub fn parse_chart_spec(raw: &str) -> Option<ChartSpec> {
    let body = strip_code_fence(raw);
    let spec: ChartSpec = serde_json::from_str(body).ok()?;
    spec.is_renderable().then_some(spec)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") up to the first newline
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
