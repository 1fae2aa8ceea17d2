//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use powerplay_extract::error::{CursorError, StoreError};
use powerplay_extract::filter::QueryFilter;
use powerplay_extract::pipeline::CancelToken;
use powerplay_extract::store::{Connector, DocumentCursor, DocumentStore, RawDocument};

pub const DATABASE: &str = "galaxyStations";
pub const COLLECTION: &str = "galaxyStations";
pub const POWER: &str = "Pranav Antal";
pub const STATES: [&str; 3] = ["Exploited", "Fortified", "Stronghold"];

/// Minimal valid system document
pub fn system_doc(id64: u64, name: &str, power: &str, state: &str) -> Value {
    json!({
        "_id": {"$oid": format!("65a1f0c2e4b0{:012x}", id64)},
        "id64": {"$numberLong": id64.to_string()},
        "name": name,
        "coords": {"x": -78.59375, "y": -149.625, "z": -340.53125},
        "allegiance": "Federation",
        "primaryEconomy": "Industrial",
        "population": {"$numberLong": "22780919"},
        "controllingPower": power,
        "powerState": state,
        "powers": [power],
        "date": "2025-02-11 10:15:00+00"
    })
}

/// A system with bodies and stations filled in
pub fn detailed_system_doc() -> Value {
    let mut doc = system_doc(3107509212, "Sol Reach", POWER, "Stronghold");
    doc["controllingFaction"] = json!({"name": "Reach Union", "government": "Democracy"});
    doc["factions"] = json!([
        {"name": "Reach Union", "influence": 0.62, "state": "Boom"},
        {"name": "Reach Pirates", "influence": 0.38}
    ]);
    doc["powerStateControlProgress"] = json!(0.43);
    doc["powerStateReinforcement"] = json!(1200);
    doc["powerStateUndermining"] = json!({"$numberLong": "80"});
    doc["timestamps"] = json!({"powerState": {"$date": "2025-02-11T10:15:00Z"}});
    doc["bodies"] = json!([
        {
            "id64": {"$numberLong": "3107509212"},
            "bodyId": 0,
            "name": "Sol Reach",
            "type": "Star",
            "subType": "G (White-Yellow) Star",
            "mainStar": true,
            "spectralClass": "G2",
            "solarMasses": 1.0
        },
        {
            "id64": {"$numberLong": "36031011651891932"},
            "bodyId": 1,
            "name": "Sol Reach 1",
            "type": "Planet",
            "subType": "Icy body",
            "isLandable": true,
            "reserveLevel": "PristineResources",
            "materials": {"Iron": 18.2, "Nickel": 13.8},
            "rings": [
                {"name": "Sol Reach 1 A Ring", "type": "Icy", "mass": {"$numberLong": "4200000000"},
                 "innerRadius": 64000.0, "outerRadius": 91000.0,
                 "signals": {"signals": {"Platinum": 2}, "updateTime": "2025-01-02 03:04:05+00"}}
            ],
            "signals": {"genuses": ["$Codex_Ent_Bacterial_Genus_Name;"], "signals": {"$SAA_SignalType_Geological;": 3}}
        }
    ]);
    doc["stations"] = json!([
        {
            "id": {"$numberLong": "3228342528"},
            "name": "Reach Hub",
            "type": "Coriolis Starport",
            "landingPads": {"small": 4, "medium": 6, "large": 2},
            "services": ["Market", "Shipyard", "Outfitting"],
            "market": {"commodities": [
                {"name": "Gold", "symbol": "Gold", "commodityId": 128049202, "buyPrice": 47000}
            ]}
        },
        {
            "id": 3228342529u64,
            "name": "Reach Outpost",
            "type": "Outpost",
            "landingPads": {"small": 2, "medium": 1}
        }
    ]);
    doc
}

/// Five documents, three held by `POWER` in a controlled state
pub fn fixture_documents() -> Vec<Value> {
    vec![
        system_doc(1001, "Alpha", POWER, "Exploited"),
        system_doc(1002, "Beta", "Aisling Duval", "Fortified"),
        detailed_system_doc(),
        system_doc(1004, "Delta", POWER, "Unoccupied"),
        system_doc(1005, "Epsilon", POWER, "Fortified"),
    ]
}

/// Names of the matching fixture documents in storage order
pub const MATCHING_NAMES: [&str; 3] = ["Alpha", "Sol Reach", "Epsilon"];

pub fn power_filter() -> QueryFilter {
    QueryFilter::power_control(POWER, &STATES).unwrap()
}

// =============================================================================
// Resource-tracking store double
// =============================================================================

/// What the double observed
#[derive(Debug, Default)]
pub struct Tracker {
    pub connects: AtomicUsize,
    pub stores_closed: AtomicUsize,
    pub cursors_opened: AtomicUsize,
    pub cursors_closed: AtomicUsize,
    /// Set when a document was pulled after the cursor was closed
    pub used_after_close: AtomicBool,
}

impl Tracker {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn stores_closed(&self) -> usize {
        self.stores_closed.load(Ordering::SeqCst)
    }

    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    pub fn cursors_closed(&self) -> usize {
        self.cursors_closed.load(Ordering::SeqCst)
    }

    /// Every opened store and cursor has been closed
    pub fn all_released(&self) -> bool {
        self.connects() == self.stores_closed() && self.cursors_opened() == self.cursors_closed()
    }
}

/// Store double that filters in process and records resource release
#[derive(Clone, Default)]
pub struct TrackingConnector {
    pub docs: Vec<Value>,
    pub tracker: Arc<Tracker>,
    /// Fail the ping
    pub refuse_ping: bool,
    /// Break the cursor with `Interrupted` after this many documents
    pub interrupt_after: Option<usize>,
    /// Trip this token once this many documents have been delivered
    pub cancel_after: Option<(usize, CancelToken)>,
}

impl TrackingConnector {
    pub fn new(docs: Vec<Value>) -> Self {
        Self {
            docs,
            ..Self::default()
        }
    }
}

impl Connector for TrackingConnector {
    type Store = TrackingStore;

    fn endpoint(&self) -> String {
        "tracking://test".to_string()
    }

    fn connect(&self, _database: &str) -> Result<TrackingStore, StoreError> {
        self.tracker.connects.fetch_add(1, Ordering::SeqCst);
        Ok(TrackingStore {
            config: self.clone(),
            closed: false,
        })
    }
}

pub struct TrackingStore {
    config: TrackingConnector,
    closed: bool,
}

impl DocumentStore for TrackingStore {
    fn ping(&self) -> Result<(), StoreError> {
        if self.config.refuse_ping {
            Err(StoreError::Ping("no reply".to_string()))
        } else {
            Ok(())
        }
    }

    fn find<'s>(
        &'s self,
        collection: &str,
        filter: &QueryFilter,
        _batch_size: usize,
    ) -> Result<Box<dyn DocumentCursor + 's>, StoreError> {
        if collection != COLLECTION {
            return Err(StoreError::UnknownCollection(collection.to_string()));
        }
        self.config.tracker.cursors_opened.fetch_add(1, Ordering::SeqCst);
        let docs = self
            .config
            .docs
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        Ok(Box::new(TrackingCursor {
            docs,
            delivered: 0,
            closed: false,
            config: &self.config,
        }))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.config.tracker.stores_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for TrackingStore {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct TrackingCursor<'s> {
    docs: Vec<Value>,
    delivered: usize,
    closed: bool,
    config: &'s TrackingConnector,
}

impl DocumentCursor for TrackingCursor<'_> {
    fn has_next(&mut self) -> Result<bool, CursorError> {
        if self.closed {
            self.config.tracker.used_after_close.store(true, Ordering::SeqCst);
            return Err(CursorError::Closed);
        }
        if self.config.interrupt_after == Some(self.delivered) {
            return Err(CursorError::Interrupted {
                position: self.delivered,
                reason: "connection reset".to_string(),
            });
        }
        Ok(self.delivered < self.docs.len())
    }

    fn next_document(&mut self) -> Result<RawDocument, CursorError> {
        if self.closed {
            self.config.tracker.used_after_close.store(true, Ordering::SeqCst);
            return Err(CursorError::Closed);
        }
        let body = self
            .docs
            .get(self.delivered)
            .cloned()
            .ok_or(CursorError::Exhausted)?;
        let position = self.delivered;
        self.delivered += 1;

        if let Some((after, token)) = &self.config.cancel_after {
            if self.delivered >= *after {
                token.cancel();
            }
        }
        Ok(RawDocument { position, body })
    }

    fn position(&self) -> usize {
        self.delivered
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.config.tracker.cursors_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for TrackingCursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
