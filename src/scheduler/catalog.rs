//! Recognised schedule kinds and their modifier limits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// A named recurrence category and its maximum modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    /// Kind name as passed to the scheduler tool (e.g. `"DAILY"`).
    pub name: String,
    /// Largest accepted modifier for this kind.
    pub max_modifier: u32,
}

impl ScheduleDefinition {
    /// Create a definition.
    pub fn new(name: impl Into<String>, max_modifier: u32) -> Self {
        Self {
            name: name.into(),
            max_modifier,
        }
    }

    /// Returns `true` if `modifier` is within `0..=max_modifier`.
    pub fn accepts(&self, modifier: i64) -> bool {
        modifier >= 0 && modifier <= i64::from(self.max_modifier)
    }
}

impl fmt::Display for ScheduleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Option: Name={} | MaximumValue={}",
            self.name, self.max_modifier
        )
    }
}

/// The fixed table of schedule kinds accepted by the scheduler tool.
pub fn standard_schedules() -> Vec<ScheduleDefinition> {
    [
        ("MINUTE", 1439),
        ("HOURLY", 23),
        ("DAILY", 365),
        ("WEEKLY", 52),
        ("MONTHLY", 12),
        ("ONCE", 0),
        ("ONLOGON", 0),
        ("ONIDLE", 0),
        ("ONEVENT", 0),
    ]
    .into_iter()
    .map(|(name, max)| ScheduleDefinition::new(name, max))
    .collect()
}

/// Immutable lookup table of [`ScheduleDefinition`]s.
///
/// Built once from configuration and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCatalog {
    definitions: Vec<ScheduleDefinition>,
}

impl ScheduleCatalog {
    /// Build a catalog, rejecting empty tables and case-insensitive duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the table is empty, a name is blank,
    /// or two names collide ignoring case.
    pub fn new(definitions: Vec<ScheduleDefinition>) -> Result<Self> {
        if definitions.is_empty() {
            return Err(TaskError::Config("schedule catalog is empty".to_owned()));
        }
        for (i, def) in definitions.iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(TaskError::Config(
                    "schedule catalog contains a blank name".to_owned(),
                ));
            }
            if definitions[..i]
                .iter()
                .any(|prev| prev.name.eq_ignore_ascii_case(&def.name))
            {
                return Err(TaskError::Config(format!(
                    "duplicate schedule kind in catalog: {}",
                    def.name
                )));
            }
        }
        Ok(Self { definitions })
    }

    /// Case-insensitive exact lookup.
    pub fn lookup(&self, kind: &str) -> Option<&ScheduleDefinition> {
        let kind = kind.trim();
        self.definitions
            .iter()
            .find(|def| def.name.eq_ignore_ascii_case(kind))
    }

    /// All definitions in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduleDefinition> {
        self.definitions.iter()
    }
}

impl Default for ScheduleCatalog {
    fn default() -> Self {
        Self {
            definitions: standard_schedules(),
        }
    }
}
