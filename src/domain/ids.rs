//! Domain identifier types with validation
//!
//! Newtype wrappers for city object identifiers. The database primary key and
//! the GML identifier are different things and must not be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database primary key of a city object
///
/// # Examples
///
/// ```
/// use citykml::domain::ids::CityObjectId;
/// use std::str::FromStr;
///
/// let id = CityObjectId::from_str("4711").unwrap();
/// assert_eq!(id.get(), 4711);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CityObjectId(i64);

impl CityObjectId {
    /// Creates a new id; database keys are strictly positive
    pub fn new(id: i64) -> Result<Self, String> {
        if id <= 0 {
            return Err(format!("City object id must be positive, got {id}"));
        }
        Ok(Self(id))
    }

    /// Returns the raw key
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CityObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CityObjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("Invalid city object id '{s}': {e}"))?;
        Self::new(id)
    }
}

/// GML identifier of a city object
///
/// Used as the placemark name in exported bundles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GmlId(String);

impl GmlId {
    /// Creates a new GmlId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("GML id cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the GML id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GmlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GmlId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for GmlId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_object_id_valid() {
        let id = CityObjectId::new(42).unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_city_object_id_rejects_non_positive() {
        assert!(CityObjectId::new(0).is_err());
        assert!(CityObjectId::new(-3).is_err());
    }

    #[test]
    fn test_city_object_id_from_str() {
        assert_eq!(CityObjectId::from_str(" 17 ").unwrap().get(), 17);
        assert!(CityObjectId::from_str("abc").is_err());
    }

    #[test]
    fn test_gml_id_empty() {
        assert!(GmlId::new("").is_err());
        assert!(GmlId::new("   ").is_err());
    }

    #[test]
    fn test_gml_id_serialization() {
        let id = GmlId::new("BLDG_0003000e008c4dd6").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"BLDG_0003000e008c4dd6\"");
        let back: GmlId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
