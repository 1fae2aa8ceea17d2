use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::values::{Opaque, Weights};

/// A dockable station, outpost, settlement, carrier or megaship
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: u64,
    pub name: String,
    pub station_type: Option<StationType>,
    /// Light seconds from the arrival point
    pub distance_to_arrival: Option<f64>,
    pub controlling_faction: Option<String>,
    /// Domain unconfirmed; kept as-is
    pub controlling_faction_state: Option<Opaque>,
    pub primary_economy: Option<String>,
    /// Economy mix, in percent
    pub economies: Weights,
    pub government: Option<String>,
    pub services: BTreeSet<String>,
    pub update_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub kind: StationKind,
}

impl Station {
    pub fn has_service(&self, service: &str) -> bool {
        self.services.contains(service)
    }

    pub fn category(&self) -> StationCategory {
        self.kind.category()
    }

    pub fn landing_pads(&self) -> Option<&LandingPads> {
        self.kind.facilities().landing_pads.as_ref()
    }

    pub fn market(&self) -> Option<&Market> {
        self.kind.facilities().market.as_ref()
    }

    pub fn shipyard(&self) -> Option<&Shipyard> {
        self.kind.facilities().shipyard.as_ref()
    }

    pub fn outfitting(&self) -> Option<&Outfitting> {
        self.kind.facilities().outfitting.as_ref()
    }

    pub fn largest_pad(&self) -> Option<PadSize> {
        self.landing_pads().and_then(LandingPads::largest)
    }
}

/// Category-specific part of a station, chosen from its type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category")]
pub enum StationKind {
    Orbital(Box<Facilities>),
    Surface(Box<Facilities>),
    Carrier(Box<Facilities>),
    Megaship(Box<Facilities>),
    /// No type, or one not recognised
    Other(Box<Facilities>),
}

impl StationKind {
    pub fn new(station_type: Option<&StationType>, facilities: Facilities) -> Self {
        let facilities = Box::new(facilities);
        match station_type.map(StationType::category) {
            Some(StationCategory::Orbital) => StationKind::Orbital(facilities),
            Some(StationCategory::Surface) => StationKind::Surface(facilities),
            Some(StationCategory::Carrier) => StationKind::Carrier(facilities),
            Some(StationCategory::Megaship) => StationKind::Megaship(facilities),
            Some(StationCategory::Other) | None => StationKind::Other(facilities),
        }
    }

    pub fn category(&self) -> StationCategory {
        match self {
            StationKind::Orbital(_) => StationCategory::Orbital,
            StationKind::Surface(_) => StationCategory::Surface,
            StationKind::Carrier(_) => StationCategory::Carrier,
            StationKind::Megaship(_) => StationCategory::Megaship,
            StationKind::Other(_) => StationCategory::Other,
        }
    }

    pub fn facilities(&self) -> &Facilities {
        match self {
            StationKind::Orbital(f)
            | StationKind::Surface(f)
            | StationKind::Carrier(f)
            | StationKind::Megaship(f)
            | StationKind::Other(f) => f,
        }
    }
}

/// Docking and trade sub-structures. Each is `None` when the station lacks it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facilities {
    pub landing_pads: Option<LandingPads>,
    pub market: Option<Market>,
    pub shipyard: Option<Shipyard>,
    pub outfitting: Option<Outfitting>,
}

/// Station hull or installation kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StationType {
    Coriolis,
    Orbis,
    Ocellus,
    Dodec,
    Outpost,
    AsteroidBase,
    MegaShip,
    FleetCarrier,
    PlanetaryOutpost,
    PlanetaryPort,
    Settlement,
    ConstructionDepot,
    Other(String),
}

/// Coarse grouping of [`StationType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StationCategory {
    Orbital,
    Surface,
    Carrier,
    Megaship,
    Other,
}

impl StationType {
    pub fn parse(s: &str) -> Self {
        match s {
            "Coriolis Starport" => StationType::Coriolis,
            "Orbis Starport" => StationType::Orbis,
            "Ocellus Starport" => StationType::Ocellus,
            "Dodec Starport" => StationType::Dodec,
            "Outpost" => StationType::Outpost,
            "Asteroid base" | "Asteroid Base" => StationType::AsteroidBase,
            "Mega ship" | "Megaship" => StationType::MegaShip,
            "Drake-Class Carrier" | "Fleet Carrier" => StationType::FleetCarrier,
            "Planetary Outpost" => StationType::PlanetaryOutpost,
            "Planetary Port" => StationType::PlanetaryPort,
            "Odyssey Settlement" | "Settlement" => StationType::Settlement,
            "Space Construction Depot" | "Planetary Construction Depot" => {
                StationType::ConstructionDepot
            }
            other => StationType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StationType::Coriolis => "Coriolis Starport",
            StationType::Orbis => "Orbis Starport",
            StationType::Ocellus => "Ocellus Starport",
            StationType::Dodec => "Dodec Starport",
            StationType::Outpost => "Outpost",
            StationType::AsteroidBase => "Asteroid base",
            StationType::MegaShip => "Mega ship",
            StationType::FleetCarrier => "Drake-Class Carrier",
            StationType::PlanetaryOutpost => "Planetary Outpost",
            StationType::PlanetaryPort => "Planetary Port",
            StationType::Settlement => "Odyssey Settlement",
            StationType::ConstructionDepot => "Space Construction Depot",
            StationType::Other(s) => s,
        }
    }

    pub fn category(&self) -> StationCategory {
        match self {
            StationType::Coriolis
            | StationType::Orbis
            | StationType::Ocellus
            | StationType::Dodec
            | StationType::Outpost
            | StationType::AsteroidBase
            | StationType::ConstructionDepot => StationCategory::Orbital,
            StationType::PlanetaryOutpost
            | StationType::PlanetaryPort
            | StationType::Settlement => StationCategory::Surface,
            StationType::FleetCarrier => StationCategory::Carrier,
            StationType::MegaShip => StationCategory::Megaship,
            StationType::Other(_) => StationCategory::Other,
        }
    }
}

impl fmt::Display for StationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Landing pad size, ordered small to large
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PadSize {
    Small,
    Medium,
    Large,
}

/// Pad counts per size. A size missing from the document is `None`, not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LandingPads {
    pub small: Option<u32>,
    pub medium: Option<u32>,
    pub large: Option<u32>,
}

impl LandingPads {
    pub fn count(&self, size: PadSize) -> Option<u32> {
        match size {
            PadSize::Small => self.small,
            PadSize::Medium => self.medium,
            PadSize::Large => self.large,
        }
    }

    /// Largest size known to have a pad. Unknown counts are not assumed present.
    pub fn largest(&self) -> Option<PadSize> {
        [PadSize::Large, PadSize::Medium, PadSize::Small]
            .into_iter()
            .find(|size| self.count(*size).is_some_and(|n| n > 0))
    }

    /// Whether a ship needing `size` can dock.
    ///
    /// `None` when no fitting pad is known and some fitting size has an
    /// unknown count.
    pub fn accommodates(&self, size: PadSize) -> Option<bool> {
        let fitting = [PadSize::Small, PadSize::Medium, PadSize::Large]
            .into_iter()
            .filter(|s| *s >= size)
            .map(|s| self.count(s));

        let mut unknown = false;
        for count in fitting {
            match count {
                Some(n) if n > 0 => return Some(true),
                Some(_) => {}
                None => unknown = true,
            }
        }
        if unknown {
            None
        } else {
            Some(false)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub commodities: Vec<Commodity>,
    /// Domain unconfirmed; kept as-is
    pub prohibited_commodities: Option<Opaque>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Market {
    pub fn commodity(&self, name: &str) -> Option<&Commodity> {
        self.commodities
            .iter()
            .find(|c| c.name == name || c.symbol == name)
    }
}

/// One market line. Absent prices and volumes stay `None`, distinct from zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commodity {
    pub name: String,
    pub symbol: String,
    pub category: Option<String>,
    pub commodity_id: u64,
    pub demand: Option<u64>,
    pub supply: Option<u64>,
    pub buy_price: Option<u64>,
    pub sell_price: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipyard {
    pub ships: Vec<Ship>,
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub name: String,
    pub symbol: Option<String>,
    pub ship_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfitting {
    pub modules: Vec<Module>,
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    pub symbol: Option<String>,
    pub module_id: u64,
    pub class: u8,
    pub rating: String,
    pub category: Option<String>,
    /// Ship the module is restricted to, if any
    pub ship: Option<String>,
}
