use super::extended::parse_f64;
use super::record::{DecodeResult, Record};
use crate::schema::{
    Commodity, Facilities, LandingPads, Market, Module, Outfitting, Ship, Shipyard, Station,
    StationKind, StationType,
};

pub fn decode_station(rec: Record<'_>) -> DecodeResult<Station> {
    let id = rec.u64("id")?;
    let name = rec.str("name")?;
    let station_type = rec.opt_str("type")?.as_deref().map(StationType::parse);
    let facilities = decode_facilities(&rec)?;

    Ok(Station {
        id,
        name,
        kind: StationKind::new(station_type.as_ref(), facilities),
        station_type,
        distance_to_arrival: rec.opt_f64("distanceToArrival")?,
        controlling_faction: rec.opt_str("controllingFaction")?,
        controlling_faction_state: rec.opaque("controllingFactionState"),
        primary_economy: rec.opt_str("primaryEconomy")?,
        economies: rec.named("economies", parse_f64)?,
        government: rec.opt_str("government")?,
        services: rec.strings("services")?.into_iter().collect(),
        update_time: rec.opt_timestamp("updateTime")?,
    })
}

fn decode_facilities(rec: &Record<'_>) -> DecodeResult<Facilities> {
    let landing_pads = match rec.record("landingPads")? {
        Some(pads) => Some(LandingPads {
            small: pads.opt_u32("small")?,
            medium: pads.opt_u32("medium")?,
            large: pads.opt_u32("large")?,
        }),
        None => None,
    };

    Ok(Facilities {
        landing_pads,
        market: rec.record("market")?.map(decode_market).transpose()?,
        shipyard: rec.record("shipyard")?.map(decode_shipyard).transpose()?,
        outfitting: rec.record("outfitting")?.map(decode_outfitting).transpose()?,
    })
}

fn decode_market(rec: Record<'_>) -> DecodeResult<Market> {
    Ok(Market {
        commodities: rec.each("commodities", |c| {
            Ok(Commodity {
                name: c.str("name")?,
                symbol: c.str("symbol")?,
                category: c.opt_str("category")?,
                commodity_id: c.u64("commodityId")?,
                demand: c.opt_u64("demand")?,
                supply: c.opt_u64("supply")?,
                buy_price: c.opt_u64("buyPrice")?,
                sell_price: c.opt_u64("sellPrice")?,
            })
        })?,
        prohibited_commodities: rec.opaque("prohibitedCommodities"),
        update_time: rec.opt_timestamp("updateTime")?,
    })
}

fn decode_shipyard(rec: Record<'_>) -> DecodeResult<Shipyard> {
    Ok(Shipyard {
        ships: rec.each("ships", |s| {
            Ok(Ship {
                name: s.str("name")?,
                symbol: s.opt_str("symbol")?,
                ship_id: s.u64("shipId")?,
            })
        })?,
        update_time: rec.opt_timestamp("updateTime")?,
    })
}

fn decode_outfitting(rec: Record<'_>) -> DecodeResult<Outfitting> {
    Ok(Outfitting {
        modules: rec.each("modules", |m| {
            Ok(Module {
                name: m.str("name")?,
                symbol: m.opt_str("symbol")?,
                module_id: m.u64("moduleId")?,
                class: m.u8("class")?,
                rating: m.str("rating")?,
                category: m.opt_str("category")?,
                ship: m.opt_str("ship")?,
            })
        })?,
        update_time: rec.opt_timestamp("updateTime")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::schema::{PadSize, StationCategory};
    use serde_json::json;

    fn decode(doc: serde_json::Value) -> DecodeResult<Station> {
        let rec = Record::root(&doc, Some("42"))?;
        decode_station(rec)
    }

    #[test]
    fn test_station_without_shipyard() {
        let station = decode(json!({
            "name": "Smith Depot",
            "id": {"$numberLong": "3228342528"},
            "type": "Outpost",
            "controllingFaction": "Tionisla Crimson Dynamic",
            "controllingFactionState": null,
            "distanceToArrival": 812.4,
            "economies": {"Industrial": 60, "Refinery": 40},
            "services": ["Market", "Dock", "Market"],
            "landingPads": {"small": 4, "medium": 2},
            "market": {
                "commodities": [{
                    "name": "Gold",
                    "symbol": "Gold",
                    "category": "Metals",
                    "commodityId": 128049202,
                    "demand": 0,
                    "supply": 211,
                    "buyPrice": 46051,
                    "sellPrice": 45102
                }, {
                    "name": "Painite",
                    "symbol": "Painite",
                    "commodityId": 128668550
                }],
                "prohibitedCommodities": ["Narcotics", "Slaves"],
                "updateTime": "2025-01-03 09:12:40+00"
            }
        }))
        .unwrap();

        assert_eq!(station.id, 3228342528);
        assert_eq!(station.category(), StationCategory::Orbital);
        assert!(matches!(station.kind, StationKind::Orbital(_)));
        assert_eq!(station.largest_pad(), Some(PadSize::Medium));
        let pads = station.landing_pads().unwrap();
        assert_eq!(pads.large, None);
        assert_eq!(pads.accommodates(PadSize::Large), None);
        assert_eq!(station.services.len(), 2);
        assert!(station.has_service("Dock"));
        assert_eq!(station.controlling_faction_state, None);
        assert_eq!(station.shipyard(), None);
        assert_eq!(station.outfitting(), None);
        assert_eq!(station.economies.get("Refinery"), Some(&40.0));

        let market = station.market().unwrap();
        let gold = market.commodity("Gold").unwrap();
        assert_eq!(gold.demand, Some(0));
        let painite = market.commodity("Painite").unwrap();
        assert_eq!(painite.demand, None);
        assert_eq!(painite.sell_price, None);
        assert_eq!(
            market.prohibited_commodities.as_ref().unwrap().as_value(),
            &json!(["Narcotics", "Slaves"])
        );
    }

    #[test]
    fn test_shipyard_and_outfitting() {
        let station = decode(json!({
            "name": "Jameson Memorial",
            "id": 128666762,
            "type": "Orbis Starport",
            "shipyard": {"ships": [{"name": "Anaconda", "symbol": "Anaconda", "shipId": 128049363}]},
            "outfitting": {"modules": [{
                "name": "6A Shield Generator",
                "symbol": "Int_ShieldGenerator_Size6_Class5",
                "moduleId": 128064293,
                "class": 6,
                "rating": "A",
                "category": "internal"
            }, {
                "name": "Mining Lance",
                "moduleId": 128049381,
                "class": 1,
                "rating": "D",
                "ship": "Krait Mk II"
            }]}
        }))
        .unwrap();

        assert_eq!(station.shipyard().unwrap().ships[0].ship_id, 128049363);
        let modules = &station.outfitting().unwrap().modules;
        assert_eq!(modules[0].class, 6);
        assert_eq!(modules[0].ship, None);
        assert_eq!(modules[1].ship.as_deref(), Some("Krait Mk II"));
        assert_eq!(station.landing_pads(), None);
    }

    #[test]
    fn test_untyped_station_keeps_facilities() {
        let station = decode(json!({
            "name": "Unregistered Dock",
            "id": 11,
            "landingPads": {"small": 0, "medium": 0, "large": 0},
            "market": {"commodities": []}
        }))
        .unwrap();

        assert_eq!(station.station_type, None);
        assert_eq!(station.category(), StationCategory::Other);
        assert_eq!(station.largest_pad(), None);
        assert_eq!(
            station.landing_pads().unwrap().accommodates(PadSize::Small),
            Some(false)
        );
        assert!(station.market().unwrap().commodities.is_empty());
    }

    #[test]
    fn test_bad_commodity_id() {
        let err = decode(json!({
            "name": "Broken Hub",
            "id": 7,
            "market": {"commodities": [{"name": "Gold", "symbol": "Gold", "commodityId": "gold"}]}
        }))
        .unwrap_err();
        assert_eq!(err.field, "market.commodities[0].commodityId");
        assert!(matches!(err.kind, DecodeErrorKind::WrongType { .. }));
    }
}
