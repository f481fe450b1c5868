//! Identifier types for the line simulator
//!
//! This module contains the identifier types for products, machine types,
//! stations, work items and floating-pool workers. Unlike database keys these
//! identifiers are deterministic: two runs over the same configuration produce
//! exactly the same identifiers, which keeps run results comparable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier of a product (the thing a routing is defined for)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create a product identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Kind of machine an operation requires and a station provides
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineType(pub String);

impl MachineType {
    /// Create a machine type
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the machine type as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a single station instance, `"{machine_type}-{n}"` with `n` starting at 1
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub String);

impl StationId {
    /// Build the identifier of the `instance`-th (1-based) station of a machine type
    pub fn for_instance(machine_type: &MachineType, instance: usize) -> Self {
        Self(format!("{}-{}", machine_type, instance))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a work item, assigned in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkItemId(pub u64);

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WI_{:06}", self.0)
    }
}

/// Identifier of a floating-pool worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FLOAT_{:03}", self.0)
    }
}

impl Serialize for WorkerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WorkerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("FLOAT_").unwrap_or(&s);
        digits.parse::<u32>().map(WorkerId).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_id_for_instance() {
        let machine = MachineType::new("sewing");
        assert_eq!(StationId::for_instance(&machine, 1).as_str(), "sewing-1");
        assert_eq!(StationId::for_instance(&machine, 12).to_string(), "sewing-12");
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(WorkItemId(42).to_string(), "WI_000042");
        assert_eq!(WorkerId(3).to_string(), "FLOAT_003");
        assert_eq!(ProductId::from("P-100").to_string(), "P-100");
    }

    #[test]
    fn test_worker_id_serde() {
        let json = serde_json::to_string(&WorkerId(7)).unwrap();
        assert_eq!(json, "\"FLOAT_007\"");

        let parsed: WorkerId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, WorkerId(7));

        // Bare numbers are accepted as well
        let parsed: WorkerId = serde_json::from_str("\"9\"").unwrap();
        assert_eq!(parsed, WorkerId(9));
    }

    #[test]
    fn test_string_ids_serialize_transparently() {
        let json = serde_json::to_string(&MachineType::new("press")).unwrap();
        assert_eq!(json, "\"press\"");
    }
}
