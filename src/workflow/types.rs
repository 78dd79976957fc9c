use serde::{Deserialize, Serialize};
use std::fmt;

/// A selectable area of the world map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: String,
    pub location_code: String,
    pub name: String,
}

/// A selected region queued for lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    /// "<region name> - <location code>"
    pub name: String,
    pub code: String,
}

impl DisplayItem {
    pub fn from_region(region: &Region) -> Self {
        Self {
            name: format!("{} - {}", region.name, region.location_code),
            code: region.location_code.clone(),
        }
    }
}

/// Country data as returned by either lookup protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: String,
    pub code: String,
    pub population: u64,
}

/// How the dialog fetches its countries.
///
/// `GraphQl` is the default: any protocol choice other than the literal
/// `"REST"` selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    Rest,
    #[default]
    GraphQl,
}

impl Protocol {
    /// Map a free-form protocol choice onto a protocol
    pub fn from_choice(choice: &str) -> Self {
        if choice == "REST" {
            Protocol::Rest
        } else {
            Protocol::default()
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Rest => f.write_str("REST"),
            Protocol::GraphQl => f.write_str("GraphQL"),
        }
    }
}
