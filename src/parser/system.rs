use serde_json::Value;

use super::body::decode_body;
use super::record::{document_id, DecodeResult, Record};
use super::station::decode_station;
use crate::schema::{
    ControllingFaction, Coords, Faction, PowerPlay, PowerState, PowerTimestamps, System,
};

/// Decode one raw system document into the typed model.
///
/// Pure and stateless; safe to call from several threads at once.
pub fn decode_system(doc: &Value) -> DecodeResult<System> {
    let id = document_id(doc);
    let rec = Record::root(doc, id.as_deref())?;

    let coords = match rec.record("coords")? {
        Some(c) => Coords {
            x: c.f64("x")?,
            y: c.f64("y")?,
            z: c.f64("z")?,
        },
        None => {
            return Err(rec.error_at(
                rec.path_of("coords"),
                crate::error::DecodeErrorKind::Missing,
            ))
        }
    };

    let controlling_faction = match rec.record("controllingFaction")? {
        Some(cf) => Some(ControllingFaction {
            name: cf.str("name")?,
            government: cf.opt_str("government")?,
            allegiance: cf.opt_str("allegiance")?,
        }),
        None => None,
    };

    Ok(System {
        object_id: rec.object_id("_id")?,
        id64: rec.u64("id64")?,
        name: rec.str("name")?,
        coords,
        allegiance: rec.opt_str("allegiance")?,
        government: rec.opt_str("government")?,
        primary_economy: rec.opt_str("primaryEconomy")?,
        secondary_economy: rec.opt_str("secondaryEconomy")?,
        security: rec.opt_str("security")?,
        population: rec.u64("population")?,
        body_count: rec.opt_u32("bodyCount")?,
        controlling_faction,
        factions: rec.each("factions", |f| {
            Ok(Faction {
                name: f.str("name")?,
                allegiance: f.opt_str("allegiance")?,
                government: f.opt_str("government")?,
                influence: f.f64("influence")?,
                state: f.opt_str("state")?,
            })
        })?,
        power_play: decode_power_play(&rec)?,
        date: rec.opt_timestamp("date")?,
        bodies: rec.each("bodies", decode_body)?,
        stations: rec.each("stations", decode_station)?,
    })
}

/// `None` when the system carries no Powerplay fields at all
fn decode_power_play(rec: &Record<'_>) -> DecodeResult<Option<PowerPlay>> {
    const KEYS: [&str; 6] = [
        "controllingPower",
        "powerState",
        "powerStateControlProgress",
        "powerStateReinforcement",
        "powerStateUndermining",
        "powers",
    ];
    if KEYS.iter().all(|key| rec.get(key).is_none()) {
        return Ok(None);
    }

    let updated = match rec.record("timestamps")? {
        Some(ts) => PowerTimestamps {
            controlling_power: ts.opt_timestamp("controllingPower")?,
            power_state: ts.opt_timestamp("powerState")?,
            powers: ts.opt_timestamp("powers")?,
        },
        None => PowerTimestamps::default(),
    };

    Ok(Some(PowerPlay {
        controlling_power: rec.opt_str("controllingPower")?,
        state: rec.opt_str("powerState")?.as_deref().map(PowerState::parse),
        control_progress: rec.opt_f64("powerStateControlProgress")?,
        reinforcement: rec.opt_u64("powerStateReinforcement")?,
        undermining: rec.opt_u64("powerStateUndermining")?,
        powers: rec.strings("powers")?,
        updated,
    }))
}
