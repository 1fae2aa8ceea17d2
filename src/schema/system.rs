use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::body::Body;
use super::station::Station;
use super::values::ObjectId;

/// A star system snapshot with everything nested under it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub object_id: ObjectId,
    pub id64: u64,
    pub name: String,
    pub coords: Coords,
    pub allegiance: Option<String>,
    pub government: Option<String>,
    pub primary_economy: Option<String>,
    pub secondary_economy: Option<String>,
    pub security: Option<String>,
    pub population: u64,
    pub body_count: Option<u32>,
    pub controlling_faction: Option<ControllingFaction>,
    pub factions: Vec<Faction>,
    pub power_play: Option<PowerPlay>,
    /// When the snapshot was taken
    pub date: Option<DateTime<Utc>>,
    pub bodies: Vec<Body>,
    pub stations: Vec<Station>,
}

impl System {
    pub fn body(&self, id64: u64) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id64 == id64)
    }

    pub fn station(&self, name: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.name == name)
    }

    pub fn power_state(&self) -> Option<&PowerState> {
        self.power_play.as_ref().and_then(|p| p.state.as_ref())
    }

    /// Sum of faction influence. Not guaranteed to be 1.
    pub fn total_influence(&self) -> f64 {
        self.factions.iter().map(|f| f.influence).sum()
    }
}

/// Galactic coordinates in light years
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coords {
    pub fn distance_to(&self, other: &Coords) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllingFaction {
    pub name: String,
    pub government: Option<String>,
    pub allegiance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Faction {
    pub name: String,
    pub allegiance: Option<String>,
    pub government: Option<String>,
    /// Share of local influence in [0, 1]
    pub influence: f64,
    pub state: Option<String>,
}

/// Powerplay standing of a system
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPlay {
    pub controlling_power: Option<String>,
    pub state: Option<PowerState>,
    pub control_progress: Option<f64>,
    pub reinforcement: Option<u64>,
    pub undermining: Option<u64>,
    /// Powers with a presence in the system
    pub powers: Vec<String>,
    pub updated: PowerTimestamps,
}

/// Last update time of each Powerplay field
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerTimestamps {
    pub controlling_power: Option<DateTime<Utc>>,
    pub power_state: Option<DateTime<Utc>>,
    pub powers: Option<DateTime<Utc>>,
}

/// Powerplay control phase
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PowerState {
    Exploited,
    Fortified,
    Stronghold,
    Unoccupied,
    Prepared,
    InPrepareRadius,
    Contested,
    Other(String),
}

impl PowerState {
    pub fn parse(s: &str) -> Self {
        match s {
            "Exploited" => PowerState::Exploited,
            "Fortified" => PowerState::Fortified,
            "Stronghold" => PowerState::Stronghold,
            "Unoccupied" => PowerState::Unoccupied,
            "Prepared" => PowerState::Prepared,
            "InPrepareRadius" => PowerState::InPrepareRadius,
            "Contested" => PowerState::Contested,
            other => PowerState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PowerState::Exploited => "Exploited",
            PowerState::Fortified => "Fortified",
            PowerState::Stronghold => "Stronghold",
            PowerState::Unoccupied => "Unoccupied",
            PowerState::Prepared => "Prepared",
            PowerState::InPrepareRadius => "InPrepareRadius",
            PowerState::Contested => "Contested",
            PowerState::Other(s) => s,
        }
    }

    /// Exploited, Fortified or Stronghold
    pub fn is_controlled(&self) -> bool {
        matches!(
            self,
            PowerState::Exploited | PowerState::Fortified | PowerState::Stronghold
        )
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PowerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
