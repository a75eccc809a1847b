//! Serializable insight payload
//!
//! The single immutable record produced per analysis invocation, consumed by
//! persistence and reporting collaborators.

use crate::perf::PerformanceReport;
use crate::summary::Summary;
use crate::visual::VisualAnomaly;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Root insight record for one analysis invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightPayload {
    /// ISO-8601 UTC generation time
    pub timestamp: String,
    /// Id of the analyzed (latest) run
    pub run_id: String,
    pub performance_anomalies: PerformanceReport,
    pub visual_anomalies: Vec<VisualAnomaly>,
    pub summary: Summary,
}

impl InsightPayload {
    /// Assemble the payload, stamping the current UTC time
    pub fn new(
        run_id: String,
        performance_anomalies: PerformanceReport,
        visual_anomalies: Vec<VisualAnomaly>,
        summary: Summary,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            run_id,
            performance_anomalies,
            visual_anomalies,
            summary,
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
