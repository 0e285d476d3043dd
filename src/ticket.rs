//! IT ticket vocabulary

use crate::value::{Fields, IntoValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }

    pub fn all() -> &'static [Priority] {
        &[Priority::Low, Priority::Medium, Priority::High, Priority::Urgent]
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(Error::InvalidValue(format!("Unknown priority: {}", s))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ticket workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    New,
    Assigned,
    InProgress,
    WaitingForUser,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "New",
            TicketStatus::Assigned => "Assigned",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::WaitingForUser => "Waiting for User",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
        }
    }

    pub fn all() -> &'static [TicketStatus] {
        &[
            TicketStatus::New,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::WaitingForUser,
            TicketStatus::Resolved,
            TicketStatus::Closed,
        ]
    }

    /// Tickets that still count as open on the dashboard
    pub fn is_open(&self) -> bool {
        !matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['_', '-'], " ").as_str() {
            "new" => Ok(TicketStatus::New),
            "assigned" => Ok(TicketStatus::Assigned),
            "in progress" => Ok(TicketStatus::InProgress),
            "waiting for user" | "waiting" => Ok(TicketStatus::WaitingForUser),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(Error::InvalidValue(format!("Unknown ticket status: {}", s))),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl IntoValue for Priority {
    fn into_value(self) -> rusqlite::types::Value {
        self.as_str().into_value()
    }
}

impl IntoValue for TicketStatus {
    fn into_value(self) -> rusqlite::types::Value {
        self.as_str().into_value()
    }
}

/// Intake payload for a new ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Option<String>,
}

impl NewTicket {
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: None,
            reporter: None,
            assignee: None,
            status: TicketStatus::New,
            priority,
            category: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn reported_by(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = Some(reporter.into());
        self
    }

    /// Assigning a ticket moves it out of `New`
    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        if self.status == TicketStatus::New {
            self.status = TicketStatus::Assigned;
        }
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn into_fields(self) -> Fields {
        crate::fields! {
            "title" => self.title,
            "description" => self.description,
            "reporter" => self.reporter,
            "assignee" => self.assignee,
            "status" => self.status,
            "priority" => self.priority,
            "category" => self.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigning_moves_ticket_out_of_new() {
        let ticket = NewTicket::new("VPN down", Priority::Urgent).assigned_to("mike_admin");
        assert_eq!(ticket.status, TicketStatus::Assigned);

        let waiting = NewTicket::new("Printer", Priority::Low)
            .with_status(TicketStatus::WaitingForUser)
            .assigned_to("mike_admin");
        assert_eq!(waiting.status, TicketStatus::WaitingForUser);
    }

    #[test]
    fn test_status_round_trips_through_display() {
        for status in TicketStatus::all() {
            assert_eq!(status.to_string().parse::<TicketStatus>().unwrap(), *status);
        }
        assert!(!TicketStatus::Closed.is_open());
        assert!(TicketStatus::WaitingForUser.is_open());
    }
}
