//! Reporter - output formatting
//!
//! Supports two output formats:
//! - Text: one line per run (`<values> | final=<F>`), then a summary block
//! - JSON: one document holding every run and the summary

use std::io::{self, Write};

use super::collector::OutcomeSummary;
use crate::benchmark::RunOutcome;
use crate::config::OutputFormat;

/// Writes run outcomes to any sink
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    /// Create new reporter with specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Write every run, followed by the summary when there is more than one run
    pub fn report<W: Write>(
        &self,
        out: &mut W,
        outcomes: &[RunOutcome],
        summary: &OutcomeSummary,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                for outcome in outcomes {
                    self.write_run_line(out, outcome)?;
                }
                if outcomes.len() > 1 {
                    self.write_summary_text(out, summary)?;
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "runs": outcomes.iter().map(run_to_json).collect::<Vec<_>>(),
                    "summary": summary.to_json(),
                });
                let rendered = serde_json::to_string_pretty(&json)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(out, "{}", rendered)?;
            }
        }
        out.flush()
    }

    /// Observed values in completion order, then the final counter value
    pub fn write_run_line<W: Write>(&self, out: &mut W, outcome: &RunOutcome) -> io::Result<()> {
        writeln!(out, "{}", format_run_line(outcome))
    }

    fn write_summary_text<W: Write>(&self, out: &mut W, summary: &OutcomeSummary) -> io::Result<()> {
        writeln!(out)?;
        writeln!(
            out,
            "=== {} x {} workers ({}) ===",
            format_count(summary.runs),
            summary.worker_count,
            summary.mode
        )?;
        writeln!(
            out,
            "Linearizable: {} | Lost updates: {} | Distinct traces: {}",
            format_count(summary.linearizable_runs),
            format_count(summary.lossy_runs),
            format_count(summary.distinct_traces)
        )?;
        writeln!(
            out,
            "Final value: min={} mean={:.2} max={} | Lost per run: p50={} max={}",
            summary.min_final,
            summary.mean_final,
            summary.max_final,
            summary.p50_lost_updates,
            summary.max_lost_updates
        )?;
        writeln!(
            out,
            "Dispatch delay (us): p50={} p99={} max={}",
            summary.p50_dispatch_us, summary.p99_dispatch_us, summary.max_dispatch_us
        )
    }
}

/// `"0 0 1 2 | final=3"`
pub fn format_run_line(outcome: &RunOutcome) -> String {
    let values: Vec<String> = outcome
        .observations
        .iter()
        .map(|o| o.value.to_string())
        .collect();
    format!("{} | final={}", values.join(" "), outcome.final_value)
}

fn run_to_json(outcome: &RunOutcome) -> serde_json::Value {
    serde_json::json!({
        "run": outcome.run_index,
        "mode": outcome.mode,
        "workers": outcome.worker_count,
        "observed": outcome.observed_values(),
        "trace": outcome.observations,
        "final_value": outcome.final_value,
        "lost_updates": outcome.lost_updates(),
        "duplicates": outcome.duplicate_observations(),
        "linearizable": outcome.is_linearizable(),
        "duration_us": outcome.duration.as_micros() as u64
    })
}

/// Format large numbers with thousands separators
/// Examples: 1,234,567 or 987,654
pub fn format_count(value: u64) -> String {
    let s = value.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::orchestrator::new_delay_histogram;
    use crate::benchmark::VisibilityMode;
    use crate::metrics::trace::Observation;
    use std::time::Duration;

    fn outcome(run_index: u32, values: &[u64], final_value: u64) -> RunOutcome {
        RunOutcome {
            run_index,
            mode: VisibilityMode::None,
            worker_count: values.len(),
            observations: values
                .iter()
                .enumerate()
                .map(|(worker_id, &value)| Observation {
                    worker_id,
                    value,
                    dispatch_delay_us: 5,
                })
                .collect(),
            final_value,
            duration: Duration::from_micros(120),
            dispatch_histogram: new_delay_histogram(),
        }
    }

    #[test]
    fn test_run_line() {
        let o = outcome(0, &[0, 0, 1, 2, 2, 3, 4, 5, 6, 7], 8);
        assert_eq!(format_run_line(&o), "0 0 1 2 2 3 4 5 6 7 | final=8");
    }

    #[test]
    fn test_text_single_run_has_no_summary() {
        let outcomes = vec![outcome(0, &[0, 1, 2], 3)];
        let summary = OutcomeSummary::from_outcomes(VisibilityMode::None, 3, &outcomes);

        let mut buf = Vec::new();
        Reporter::new(OutputFormat::Text)
            .report(&mut buf, &outcomes, &summary)
            .unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "0 1 2 | final=3\n");
    }

    #[test]
    fn test_text_multiple_runs_with_summary() {
        let outcomes = vec![outcome(0, &[0, 1], 2), outcome(1, &[0, 0], 1)];
        let summary = OutcomeSummary::from_outcomes(VisibilityMode::None, 2, &outcomes);

        let mut buf = Vec::new();
        Reporter::new(OutputFormat::Text)
            .report(&mut buf, &outcomes, &summary)
            .unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "0 1 | final=2");
        assert_eq!(lines[1], "0 0 | final=1");
        assert!(text.contains("=== 2 x 2 workers (none) ==="));
        assert!(text.contains("Linearizable: 1 | Lost updates: 1"));
    }

    #[test]
    fn test_json_report() {
        let outcomes = vec![outcome(0, &[0, 0, 1], 2)];
        let summary = OutcomeSummary::from_outcomes(VisibilityMode::None, 3, &outcomes);

        let mut buf = Vec::new();
        Reporter::new(OutputFormat::Json)
            .report(&mut buf, &outcomes, &summary)
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["runs"][0]["observed"], serde_json::json!([0, 0, 1]));
        assert_eq!(json["runs"][0]["final_value"], 2);
        assert_eq!(json["runs"][0]["lost_updates"], 1);
        assert_eq!(json["runs"][0]["trace"][2]["worker_id"], 2);
        assert_eq!(json["runs"][0]["linearizable"], false);
        assert_eq!(json["summary"]["runs"], 1);
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(123), "123");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
