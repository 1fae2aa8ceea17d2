use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::values::{Counts, Opaque, Weights};

/// A star, planet or belt cluster inside a system
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub id64: u64,
    /// Index of the body within its system
    pub body_id: u32,
    pub name: String,
    pub distance_to_arrival: Option<f64>,
    pub orbit: Orbit,
    /// Orbital parents, innermost first
    pub parents: Vec<Parent>,
    /// Station stubs attached to the body, kept as-is
    pub stations: Vec<Opaque>,
    pub update_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub kind: BodyKind,
}

impl Body {
    pub fn star(&self) -> Option<&Star> {
        match &self.kind {
            BodyKind::Star(star) => Some(star),
            _ => None,
        }
    }

    pub fn planet(&self) -> Option<&Planet> {
        match &self.kind {
            BodyKind::Planet(planet) => Some(planet),
            _ => None,
        }
    }

    /// Belts of a star or rings of a planet
    pub fn rings(&self) -> &[Ring] {
        match &self.kind {
            BodyKind::Star(star) => &star.belts,
            BodyKind::Planet(planet) => &planet.rings,
            BodyKind::BeltCluster => &[],
        }
    }
}

/// Type-specific part of a body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum BodyKind {
    Star(Box<Star>),
    Planet(Box<Planet>),
    #[serde(rename = "Belt Cluster")]
    BeltCluster,
}

/// Keplerian orbital elements
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orbit {
    /// Days
    pub period: Option<f64>,
    /// Light seconds
    pub semi_major_axis: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,
    pub arg_of_periapsis: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub ascending_node: Option<f64>,
    pub mean_anomaly_updated: Option<DateTime<Utc>>,
}

/// One entry of a body's parent chain, e.g. `{"Star": 1}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    /// `Null` (barycentre), `Star` or `Planet`
    pub kind: String,
    pub body_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    /// Days
    pub period: Option<f64>,
    pub tidally_locked: Option<bool>,
    pub axial_tilt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Star {
    pub sub_type: Option<String>,
    pub main_star: Option<bool>,
    /// Millions of years
    pub age: Option<u64>,
    pub spectral_class: Option<String>,
    pub luminosity: Option<String>,
    pub absolute_magnitude: Option<f64>,
    pub solar_masses: Option<f64>,
    pub solar_radius: Option<f64>,
    /// Kelvin
    pub surface_temperature: Option<f64>,
    pub rotation: Rotation,
    pub belts: Vec<Ring>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub sub_type: Option<String>,
    pub is_landable: Option<bool>,
    pub gravity: Option<f64>,
    pub earth_masses: Option<f64>,
    /// Kilometres
    pub radius: Option<f64>,
    pub surface_temperature: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub volcanism_type: Option<String>,
    /// Not yet modelled, kept as stored
    pub atmosphere_type: Option<Opaque>,
    pub atmosphere_composition: Weights,
    /// Ice / Rock / Metal percentages
    pub solid_composition: Weights,
    pub terraforming_state: Option<String>,
    /// Surface material concentrations
    pub materials: Weights,
    pub signals: Option<BodySignals>,
    pub reserve_level: Option<ReserveLevel>,
    pub rotation: Rotation,
    pub rings: Vec<Ring>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodySignals {
    pub counts: Counts,
    /// Genus list of biological signals; domain unconfirmed
    pub genuses: Option<Opaque>,
    pub update_time: Option<DateTime<Utc>>,
}

/// A planetary ring or a stellar belt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ring {
    pub name: String,
    /// Composition, e.g. `Icy` or `Metal Rich`
    pub ring_type: String,
    /// Megatonnes
    pub mass: u64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub id64: Option<u64>,
    pub signals: Option<RingSignals>,
}

/// Mineral hotspot counts of a ring
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RingSignals {
    pub counts: Counts,
    pub update_time: Option<DateTime<Utc>>,
}

/// Resource richness of an extractable body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReserveLevel {
    Pristine,
    Major,
    Common,
    Low,
    Depleted,
    Other(String),
}

impl ReserveLevel {
    pub fn parse(s: &str) -> Self {
        match s {
            "Pristine" | "PristineResources" => ReserveLevel::Pristine,
            "Major" | "MajorResources" => ReserveLevel::Major,
            "Common" | "CommonResources" => ReserveLevel::Common,
            "Low" | "LowResources" => ReserveLevel::Low,
            "Depleted" | "DepletedResources" => ReserveLevel::Depleted,
            other => ReserveLevel::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReserveLevel::Pristine => "Pristine",
            ReserveLevel::Major => "Major",
            ReserveLevel::Common => "Common",
            ReserveLevel::Low => "Low",
            ReserveLevel::Depleted => "Depleted",
            ReserveLevel::Other(s) => s,
        }
    }
}

impl fmt::Display for ReserveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReserveLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
