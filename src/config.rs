//! Storage class configuration
//!
//! A class is a named provisioning policy: utilization watermarks, the size
//! of each new device, and bounds on the class's total footprint. The config
//! is the full set of classes, keyed by name and kept in declaration order
//! because the reconciler processes classes in that order.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Class
// =============================================================================

/// A named storage provisioning policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Unique class name
    pub name: String,

    /// Utilization percentage at or above which the class grows
    pub watermark_high: u32,

    /// Utilization percentage at or below which the class shrinks
    pub watermark_low: u32,

    /// Size in GB of each newly provisioned device
    pub disk_size_gb: i64,

    /// Lower bound on the class's total provisioned storage, in GB
    pub minimum_total_size_gb: i64,

    /// Upper bound on the class's total provisioned storage, in GB
    pub maximum_total_size_gb: i64,

    /// Opaque parameters forwarded verbatim to the cloud provider
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Class {
    /// Check the class's watermarks and size bounds for consistency
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config_invalid("<unnamed>", "class name is empty"));
        }
        if self.watermark_low == 0 || self.watermark_high >= 100 {
            return Err(Error::config_invalid(
                &self.name,
                format!(
                    "watermarks must lie in (0, 100), got low={} high={}",
                    self.watermark_low, self.watermark_high
                ),
            ));
        }
        if self.watermark_low >= self.watermark_high {
            return Err(Error::config_invalid(
                &self.name,
                format!(
                    "low watermark {} must be below high watermark {}",
                    self.watermark_low, self.watermark_high
                ),
            ));
        }
        if self.disk_size_gb <= 0 {
            return Err(Error::config_invalid(
                &self.name,
                format!("disk size must be positive, got {}", self.disk_size_gb),
            ));
        }
        if self.minimum_total_size_gb < 0 {
            return Err(Error::config_invalid(
                &self.name,
                format!(
                    "minimum total size cannot be negative, got {}",
                    self.minimum_total_size_gb
                ),
            ));
        }
        if self.minimum_total_size_gb > self.maximum_total_size_gb {
            return Err(Error::config_invalid(
                &self.name,
                format!(
                    "minimum total size {} exceeds maximum {}",
                    self.minimum_total_size_gb, self.maximum_total_size_gb
                ),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config
// =============================================================================

/// The full set of storage classes, in declaration order
///
/// Replaced wholesale on reconfiguration: a reconcile pass observes either
/// the old or the new config in full, never a mix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    classes: IndexMap<String, Class>,
}

impl Config {
    /// Build a config from a list of classes, validating each
    pub fn new(classes: impl IntoIterator<Item = Class>) -> Result<Self> {
        let mut config = Self::empty();
        for class in classes {
            config.insert(class)?;
        }
        Ok(config)
    }

    /// A config with no classes
    pub fn empty() -> Self {
        Self {
            classes: IndexMap::new(),
        }
    }

    /// Classes in declaration order
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    /// Look up a class by name
    pub fn get(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Add a class, replacing any existing class of the same name in place
    pub fn insert(&mut self, class: Class) -> Result<()> {
        class.validate()?;
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    /// Remove a class by name
    pub fn remove(&mut self, name: &str) -> Result<Class> {
        // shift_remove keeps the declaration order of the remaining classes
        self.classes
            .shift_remove(name)
            .ok_or_else(|| Error::ClassNotFound { name: name.into() })
    }

    /// Validate every class in the config
    pub fn validate(&self) -> Result<()> {
        for class in self.classes.values() {
            class.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gp2() -> Class {
        Class {
            name: "gp2".into(),
            watermark_high: 75,
            watermark_low: 25,
            disk_size_gb: 8,
            minimum_total_size_gb: 32,
            maximum_total_size_gb: 1024,
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn test_valid_class() {
        assert!(gp2().validate().is_ok());
    }

    #[test]
    fn test_watermark_ordering() {
        let mut class = gp2();
        class.watermark_low = 80;
        assert!(class.validate().is_err());

        class.watermark_low = 75;
        assert!(class.validate().is_err(), "equal watermarks are invalid");
    }

    #[test]
    fn test_watermark_range() {
        let mut class = gp2();
        class.watermark_low = 0;
        assert!(class.validate().is_err());

        let mut class = gp2();
        class.watermark_high = 100;
        assert!(class.validate().is_err());
    }

    #[test]
    fn test_size_bounds() {
        let mut class = gp2();
        class.disk_size_gb = 0;
        assert!(class.validate().is_err());

        let mut class = gp2();
        class.minimum_total_size_gb = 2048;
        assert!(class.validate().is_err(), "min above max is invalid");

        let mut class = gp2();
        class.minimum_total_size_gb = -1;
        assert!(class.validate().is_err());
    }

    #[test]
    fn test_config_declaration_order() {
        let mut io1 = gp2();
        io1.name = "io1".into();
        let mut st1 = gp2();
        st1.name = "st1".into();

        let config = Config::new([st1, gp2(), io1]).unwrap();
        let names: Vec<_> = config.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["st1", "gp2", "io1"]);
    }

    #[test]
    fn test_config_remove() {
        let mut config = Config::new([gp2()]).unwrap();
        assert!(config.remove("gp2").is_ok());
        assert!(matches!(
            config.remove("gp2"),
            Err(Error::ClassNotFound { .. })
        ));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut config = Config::new([gp2()]).unwrap();
        let mut updated = gp2();
        updated.watermark_high = 90;
        config.insert(updated).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("gp2").unwrap().watermark_high, 90);
    }

    #[test]
    fn test_insert_rejects_invalid() {
        let mut config = Config::empty();
        let mut bad = gp2();
        bad.name = String::new();
        assert!(config.insert(bad).is_err());
        assert!(config.is_empty());
    }
}
