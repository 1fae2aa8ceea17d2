use super::extended::{parse_f64, parse_u64};
use super::record::{DecodeResult, Record};
use crate::error::DecodeErrorKind;
use crate::schema::{
    Body, BodyKind, BodySignals, Orbit, Parent, Planet, ReserveLevel, Ring, RingSignals, Rotation,
    Star,
};

pub fn decode_body(rec: Record<'_>) -> DecodeResult<Body> {
    let kind = match rec.str("type")?.as_str() {
        "Star" => BodyKind::Star(Box::new(decode_star(&rec)?)),
        "Planet" => BodyKind::Planet(Box::new(decode_planet(&rec)?)),
        other if is_belt_cluster(other) => BodyKind::BeltCluster,
        other => {
            return Err(rec.error_at(
                rec.path_of("type"),
                DecodeErrorKind::UnknownVariant(other.to_string()),
            ))
        }
    };

    Ok(Body {
        id64: rec.u64("id64")?,
        body_id: rec.u32("bodyId")?,
        name: rec.str("name")?,
        distance_to_arrival: rec.opt_f64("distanceToArrival")?,
        orbit: decode_orbit(&rec)?,
        parents: decode_parents(&rec)?,
        stations: rec.array("stations")?.iter().cloned().map(crate::schema::Opaque::new).collect(),
        update_time: rec.opt_timestamp("updateTime")?,
        kind,
    })
}

fn is_belt_cluster(kind: &str) -> bool {
    let normalized: String = kind
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    normalized == "beltcluster"
}

fn decode_orbit(rec: &Record<'_>) -> DecodeResult<Orbit> {
    let mean_anomaly_updated = match rec.record("timestamps")? {
        Some(ts) => ts.opt_timestamp("meanAnomaly")?,
        None => None,
    };

    Ok(Orbit {
        period: rec.opt_f64("orbitalPeriod")?,
        semi_major_axis: rec.opt_f64("semiMajorAxis")?,
        eccentricity: rec.opt_f64("orbitalEccentricity")?,
        inclination: rec.opt_f64("orbitalInclination")?,
        arg_of_periapsis: rec.opt_f64("argOfPeriapsis")?,
        mean_anomaly: rec.opt_f64("meanAnomaly")?,
        ascending_node: rec.opt_f64("ascendingNode")?,
        mean_anomaly_updated,
    })
}

/// `[{"Planet": 3}, {"Null": 1}, {"Star": 0}]`
fn decode_parents(rec: &Record<'_>) -> DecodeResult<Vec<Parent>> {
    rec.each("parents", |entry| {
        entry
            .entries()
            .map(|(kind, id)| {
                let body_id = parse_u64(id)
                    .and_then(|n| {
                        u32::try_from(n).map_err(|_| DecodeErrorKind::OutOfRange(n.to_string()))
                    })
                    .map_err(|k| entry.error_at(entry.path_of(kind), k))?;
                Ok(Parent {
                    kind: kind.clone(),
                    body_id,
                })
            })
            .collect::<DecodeResult<Vec<_>>>()
    })
    .map(|nested| nested.into_iter().flatten().collect())
}

fn decode_rotation(rec: &Record<'_>) -> DecodeResult<Rotation> {
    Ok(Rotation {
        period: rec.opt_f64("rotationalPeriod")?,
        tidally_locked: rec.opt_bool("rotationalPeriodTidallyLocked")?,
        axial_tilt: rec.opt_f64("axialTilt")?,
    })
}

fn decode_star(rec: &Record<'_>) -> DecodeResult<Star> {
    Ok(Star {
        sub_type: rec.opt_str("subType")?,
        main_star: rec.opt_bool("mainStar")?,
        age: rec.opt_u64("age")?,
        spectral_class: rec.opt_str("spectralClass")?,
        luminosity: rec.opt_str("luminosity")?,
        absolute_magnitude: rec.opt_f64("absoluteMagnitude")?,
        solar_masses: rec.opt_f64("solarMasses")?,
        solar_radius: rec.opt_f64("solarRadius")?,
        surface_temperature: rec.opt_f64("surfaceTemperature")?,
        rotation: decode_rotation(rec)?,
        belts: rec.each("belts", decode_ring)?,
    })
}

fn decode_planet(rec: &Record<'_>) -> DecodeResult<Planet> {
    let signals = match rec.record("signals")? {
        Some(signals) => Some(BodySignals {
            counts: signals.named("signals", parse_u64)?,
            genuses: signals.opaque("genuses"),
            update_time: signals.opt_timestamp("updateTime")?,
        }),
        None => None,
    };

    Ok(Planet {
        sub_type: rec.opt_str("subType")?,
        is_landable: rec.opt_bool("isLandable")?,
        gravity: rec.opt_f64("gravity")?,
        earth_masses: rec.opt_f64("earthMasses")?,
        radius: rec.opt_f64("radius")?,
        surface_temperature: rec.opt_f64("surfaceTemperature")?,
        surface_pressure: rec.opt_f64("surfacePressure")?,
        volcanism_type: rec.opt_str("volcanismType")?,
        atmosphere_type: rec.opaque("atmosphereType"),
        atmosphere_composition: rec.named("atmosphereComposition", parse_f64)?,
        solid_composition: rec.named("solidComposition", parse_f64)?,
        terraforming_state: rec.opt_str("terraformingState")?,
        materials: rec.named("materials", parse_f64)?,
        signals,
        reserve_level: rec.opt_str("reserveLevel")?.as_deref().map(ReserveLevel::parse),
        rotation: decode_rotation(rec)?,
        rings: rec.each("rings", decode_ring)?,
    })
}

fn decode_ring(rec: Record<'_>) -> DecodeResult<Ring> {
    let signals = match rec.record("signals")? {
        Some(signals) => Some(RingSignals {
            counts: signals.named("signals", parse_u64)?,
            update_time: signals.opt_timestamp("updateTime")?,
        }),
        None => None,
    };

    Ok(Ring {
        name: rec.str("name")?,
        ring_type: rec.str("type")?,
        mass: rec.u64("mass")?,
        inner_radius: rec.f64("innerRadius")?,
        outer_radius: rec.f64("outerRadius")?,
        id64: rec.opt_u64("id64")?,
        signals,
    })
}
