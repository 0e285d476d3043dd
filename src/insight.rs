//! LLM insight seam
//!
//! The dashboard's assistant forwards a prompt plus optional context to a
//! language model. Providers return text, and report failures as readable
//! text too, never as errors.

use std::fmt::Write;

use crate::storage::RecordStore;
use crate::Result;

pub trait InsightProvider {
    fn respond(&self, prompt: &str, context: &str) -> String;
}

/// Stand-in used when no model credentials are configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredInsights;

impl InsightProvider for UnconfiguredInsights {
    fn respond(&self, _prompt: &str, _context: &str) -> String {
        "API key not configured".to_string()
    }
}

/// Plain-text summary of every domain, for use as model context
pub fn insight_context(store: &RecordStore) -> Result<String> {
    let incidents = store.incident_summary()?;
    let datasets = store.dataset_summary()?;
    let tickets = store.ticket_summary()?;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Cybersecurity: {} incidents, {} open, {} critical",
        incidents.total, incidents.open, incidents.critical
    );
    if let Some(hours) = incidents.avg_resolution_hours {
        let _ = writeln!(out, "  average resolution: {:.1}h", hours);
    }
    for (severity, n) in &incidents.by_severity {
        let _ = writeln!(out, "  severity {}: {}", severity, n);
    }

    let _ = writeln!(
        out,
        "Data science: {} datasets, {} archived, {:.1} MB stored",
        datasets.total, datasets.archived, datasets.storage_mb
    );
    if let Some(quality) = datasets.avg_quality {
        let _ = writeln!(out, "  average quality: {:.2}", quality);
    }

    let _ = writeln!(
        out,
        "IT operations: {} tickets, {} open, {} urgent",
        tickets.total, tickets.open, tickets.urgent
    );
    for (priority, n) in &tickets.by_priority {
        let _ = writeln!(out, "  priority {}: {}", priority, n);
    }

    Ok(out)
}
