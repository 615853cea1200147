//! Cache types and data structures

use crate::error::{EssError, EssResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Queryable server resources.
///
/// This is the registry mutation callers name when declaring what a write
/// invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Employee,
    Payroll,
    Payslips,
    Leave,
    LeaveBalance,
    Loans,
    Benefits,
    Goals,
    Comments,
    Feedback,
    Appraisals,
    Assets,
    Reimbursements,
    Notifications,
    Attendance,
    Permissions,
}

impl Resource {
    /// Every resource, in display order
    pub const ALL: [Resource; 16] = [
        Self::Employee,
        Self::Payroll,
        Self::Payslips,
        Self::Leave,
        Self::LeaveBalance,
        Self::Loans,
        Self::Benefits,
        Self::Goals,
        Self::Comments,
        Self::Feedback,
        Self::Appraisals,
        Self::Assets,
        Self::Reimbursements,
        Self::Notifications,
        Self::Attendance,
        Self::Permissions,
    ];

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Payroll => "payroll",
            Self::Payslips => "payslips",
            Self::Leave => "leave",
            Self::LeaveBalance => "leave_balance",
            Self::Loans => "loans",
            Self::Benefits => "benefits",
            Self::Goals => "goals",
            Self::Comments => "comments",
            Self::Feedback => "feedback",
            Self::Appraisals => "appraisals",
            Self::Assets => "assets",
            Self::Reimbursements => "reimbursements",
            Self::Notifications => "notifications",
            Self::Attendance => "attendance",
            Self::Permissions => "permissions",
        }
    }

    /// Default read endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Employee => "/api/employee/profile",
            Self::Payroll => "/api/payroll",
            Self::Payslips => "/api/payroll/payslips",
            Self::Leave => "/api/leave",
            Self::LeaveBalance => "/api/leave/balance",
            Self::Loans => "/api/loans",
            Self::Benefits => "/api/benefits",
            Self::Goals => "/api/goals",
            Self::Comments => "/api/comments",
            Self::Feedback => "/api/feedback",
            Self::Appraisals => "/api/appraisals",
            Self::Assets => "/api/assets",
            Self::Reimbursements => "/api/reimbursements",
            Self::Notifications => "/api/notifications",
            Self::Attendance => "/api/attendance",
            Self::Permissions => "/api/permissions",
        }
    }

    /// Parse a space- or comma-delimited list such as `"goals comments"`.
    ///
    /// Unknown names are skipped.
    pub fn parse_list(list: &str) -> Vec<Resource> {
        let mut resources = Vec::new();
        for name in list
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
        {
            match name.parse::<Resource>() {
                Ok(resource) if !resources.contains(&resource) => resources.push(resource),
                Ok(_) => {}
                Err(_) => tracing::debug!(name, "ignoring unknown resource name"),
            }
        }
        resources
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = EssError;

    /// Accepts `leave_balance`, `leave-balance` and `leaveBalance`
    fn from_str(s: &str) -> EssResult<Self> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|resource| resource.name().replace('_', "") == wanted)
            .ok_or_else(|| EssError::invalid_input_field(format!("Unknown resource '{}'", s), "resource"))
    }
}

/// Resource plus query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub resource: Resource,
    /// Sorted by name so parameter order never splits an entry
    pub params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            params: Vec::new(),
        }
    }

    /// Add a parameter, replacing an existing one with the same name
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.params.binary_search_by(|(n, _)| n.as_str().cmp(&name)) {
            Ok(idx) => self.params[idx].1 = value,
            Err(idx) => self.params.insert(idx, (name, value)),
        }
        self
    }
}

impl From<Resource> for CacheKey {
    fn from(resource: Resource) -> Self {
        Self::new(resource)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource.name())?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// State of a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Value matches the server as of the last fetch
    Fresh,
    /// Invalidated, or fetched across an invalidation; next read re-fetches
    Stale,
    /// A fetch is in flight
    Fetching,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub fresh: usize,
    pub stale: usize,
    pub fetching: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

impl CacheStatistics {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total_requests = self.hits + self.misses;
        if total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / total_requests as f64
        }
    }
}
