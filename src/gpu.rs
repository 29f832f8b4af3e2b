//! GPU telemetry via the vendor query tool.
//!
//! Shells out to `nvidia-smi` and parses its CSV output. The parsing is
//! kept in a pure function so it can be tested with canned tool output,
//! including rows carrying not-applicable markers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Command;

use crate::check::ServiceStatus;

/// Temperature at or above which a reading is flagged as warning.
pub const TEMP_WARNING_C: f64 = 85.0;

const QUERY_FIELDS: &str =
    "index,name,utilization.gpu,utilization.memory,memory.used,memory.total,temperature.gpu,power.draw";

/// One parsed telemetry row.
///
/// Fields the tool reports as not applicable are `None`, serialized as
/// JSON null rather than zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuReading {
    pub index: u32,
    pub name: String,
    pub utilization_percent: Option<f64>,
    pub memory_utilization_percent: Option<f64>,
    pub temperature_c: Option<f64>,
    #[serde(rename = "memoryUsedMiB")]
    pub memory_used_mib: Option<f64>,
    #[serde(rename = "memoryTotalMiB")]
    pub memory_total_mib: Option<f64>,
    pub power_draw_w: Option<f64>,
    pub status: ServiceStatus,
    pub checked_at: DateTime<Utc>,
}

/// Result of one telemetry read: all readings plus an overall status.
#[derive(Debug, Clone, Serialize)]
pub struct GpuSweep {
    pub gpus: Vec<GpuReading>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GpuSweep {
    fn ok(gpus: Vec<GpuReading>) -> Self {
        Self {
            gpus,
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(detail: String) -> Self {
        Self {
            gpus: Vec::new(),
            status: "error".to_string(),
            error: Some(detail),
        }
    }
}

/// Query the vendor tool and parse its output.
///
/// A missing or failing tool yields an empty error sweep; nothing
/// escapes this boundary.
pub async fn read_gpu_readings() -> GpuSweep {
    let mut command = Command::new("nvidia-smi");
    command
        .arg(format!("--query-gpu={}", QUERY_FIELDS))
        .arg("--format=csv,noheader,nounits");
    let output = command.output().await;

    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            GpuSweep::ok(parse_query_output(&stdout, Utc::now()))
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            tracing::warn!("nvidia-smi exited non-zero: {}", stderr);
            GpuSweep::error(if stderr.is_empty() {
                format!("nvidia-smi exited with {}", out.status)
            } else {
                stderr
            })
        }
        Err(e) => {
            tracing::warn!("Failed to execute nvidia-smi: {}", e);
            GpuSweep::error(e.to_string())
        }
    }
}

/// Parse the tool's `csv,noheader,nounits` output into readings.
fn parse_query_output(raw: &str, checked_at: DateTime<Utc>) -> Vec<GpuReading> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(row, line)| parse_row(row, line, checked_at))
        .collect()
}

fn parse_row(row: usize, line: &str, checked_at: DateTime<Utc>) -> GpuReading {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let index = fields
        .first()
        .and_then(|s| s.parse().ok())
        .unwrap_or(row as u32);
    let name = fields
        .get(1)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("GPU {}", index));

    let utilization_percent = numeric_field(&fields, 2);
    let memory_utilization_percent = numeric_field(&fields, 3);
    let memory_used_mib = numeric_field(&fields, 4);
    let memory_total_mib = numeric_field(&fields, 5);
    let temperature_c = numeric_field(&fields, 6);
    let power_draw_w = numeric_field(&fields, 7);

    // An unknown temperature is not a warning signal.
    let status = match temperature_c {
        Some(t) if t >= TEMP_WARNING_C => ServiceStatus::Warning,
        _ => ServiceStatus::Up,
    };

    GpuReading {
        index,
        name,
        utilization_percent,
        memory_utilization_percent,
        temperature_c,
        memory_used_mib,
        memory_total_mib,
        power_draw_w,
        status,
        checked_at,
    }
}

/// Read a numeric field, mapping the tool's not-applicable markers to
/// absence instead of a number.
fn numeric_field(fields: &[&str], idx: usize) -> Option<f64> {
    let value = fields.get(idx)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("n/a") || value.eq_ignore_ascii_case("[n/a]")
    {
        return None;
    }
    value.parse().ok()
}
