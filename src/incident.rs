//! Cyber incident vocabulary
//!
//! Severity and status are closed enumerations. The schema enforces them
//! with CHECK constraints; these types let intake code name them safely.

use crate::value::{Fields, IntoValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Incident severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    pub fn all() -> &'static [Severity] {
        &[Severity::Low, Severity::Medium, Severity::High, Severity::Critical]
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(Error::InvalidValue(format!("Unknown severity: {}", s))),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "Open",
            IncidentStatus::InProgress => "In Progress",
            IncidentStatus::Resolved => "Resolved",
            IncidentStatus::Closed => "Closed",
        }
    }

    pub fn all() -> &'static [IncidentStatus] {
        &[
            IncidentStatus::Open,
            IncidentStatus::InProgress,
            IncidentStatus::Resolved,
            IncidentStatus::Closed,
        ]
    }

    /// Resolved and closed incidents no longer need attention
    pub fn is_active(&self) -> bool {
        matches!(self, IncidentStatus::Open | IncidentStatus::InProgress)
    }
}

impl FromStr for IncidentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['_', '-'], " ").as_str() {
            "open" => Ok(IncidentStatus::Open),
            "in progress" => Ok(IncidentStatus::InProgress),
            "resolved" => Ok(IncidentStatus::Resolved),
            "closed" => Ok(IncidentStatus::Closed),
            _ => Err(Error::InvalidValue(format!("Unknown incident status: {}", s))),
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Intake payload for a new incident.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub title: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub category: Option<String>,
    pub assigned_to: Option<String>,
}

impl NewIncident {
    /// New open incident
    pub fn new(title: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: None,
            severity,
            status: IncidentStatus::Open,
            category: None,
            assigned_to: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: IncidentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn into_fields(self) -> Fields {
        crate::fields! {
            "title" => self.title,
            "description" => self.description,
            "severity" => self.severity.as_str(),
            "status" => self.status.as_str(),
            "category" => self.category,
            "assigned_to" => self.assigned_to,
        }
    }
}

impl IntoValue for Severity {
    fn into_value(self) -> rusqlite::types::Value {
        self.as_str().into_value()
    }
}

impl IntoValue for IncidentStatus {
    fn into_value(self) -> rusqlite::types::Value {
        self.as_str().into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_accepts_spellings() {
        assert_eq!("in progress".parse::<IncidentStatus>().unwrap(), IncidentStatus::InProgress);
        assert_eq!("In_Progress".parse::<IncidentStatus>().unwrap(), IncidentStatus::InProgress);
        assert!("Pending".parse::<IncidentStatus>().is_err());
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("Extreme".parse::<Severity>().is_err());
    }

    #[test]
    fn test_into_fields_keeps_null_columns() {
        let fields = NewIncident::new("Phishing", Severity::High)
            .with_category("Phishing")
            .into_fields();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields["status"], rusqlite::types::Value::Text("Open".into()));
        assert_eq!(fields["assigned_to"], rusqlite::types::Value::Null);
    }
}
