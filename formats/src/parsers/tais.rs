//! TAIS (Terminal Automation Information Service) parser.
//!
//! Root element `TATrackAndFlightPlan`, one `record` per tracked aircraft, each carrying an
//! optional `track` (kinematics) and an optional `flightPlan`.

use chrono::Utc;
use serde::Deserialize;

use super::Parser;
use crate::{AltitudeType, DomainEvent, FlightPlanData, ParseError, RawMessage, ServiceType, TrackPosition};

#[derive(Debug, Deserialize)]
#[serde(rename = "TATrackAndFlightPlan")]
struct TaisDoc {
    #[serde(rename = "@src", default)]
    src: String,
    #[serde(rename = "record", default)]
    records: Vec<TaisRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct TaisRecord {
    track: Option<TaisTrack>,
    #[serde(rename = "flightPlan")]
    flight_plan: Option<TaisFlightPlan>,
}

#[derive(Debug, Default, Deserialize)]
struct TaisTrack {
    #[serde(rename = "@trackNum")]
    track_num: Option<i64>,
    #[serde(rename = "@lat")]
    lat: Option<f64>,
    #[serde(rename = "@lon")]
    lon: Option<f64>,
    #[serde(rename = "@vx")]
    vx: Option<f64>,
    #[serde(rename = "@vy")]
    vy: Option<f64>,
    #[serde(rename = "@vRate")]
    v_rate: Option<i32>,
    #[serde(rename = "@reportedAltitude")]
    reported_altitude: Option<i32>,
    #[serde(rename = "@reportedBeaconCode")]
    reported_beacon_code: Option<String>,
    #[serde(rename = "@acAddress")]
    ac_address: Option<String>,
    #[serde(rename = "@onGround", default)]
    on_ground: bool,
    #[serde(rename = "@ident", default)]
    ident: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TaisFlightPlan {
    #[serde(rename = "@callsign")]
    callsign: Option<String>,
    #[serde(rename = "@acType")]
    ac_type: Option<String>,
    #[serde(rename = "@wakeCategory")]
    wake_category: Option<String>,
    #[serde(rename = "@equipmentSuffix")]
    equipment_suffix: Option<String>,
    #[serde(rename = "@flightRules")]
    flight_rules: Option<String>,
    #[serde(rename = "@origin")]
    origin: Option<String>,
    #[serde(rename = "@destination")]
    destination: Option<String>,
    #[serde(rename = "@entryFix")]
    entry_fix: Option<String>,
    #[serde(rename = "@exitFix")]
    exit_fix: Option<String>,
    #[serde(rename = "@route")]
    route: Option<String>,
    #[serde(rename = "@requestedAltitude")]
    requested_altitude: Option<i32>,
    #[serde(rename = "@assignedBeacon")]
    assigned_beacon: Option<String>,
    #[serde(rename = "@runway")]
    runway: Option<String>,
    #[serde(rename = "@scratchpad1")]
    scratchpad1: Option<String>,
    #[serde(rename = "@scratchpad2")]
    scratchpad2: Option<String>,
    #[serde(rename = "@ownerSector")]
    owner_sector: Option<String>,
    #[serde(rename = "@pendingHandoffSector")]
    pending_handoff_sector: Option<String>,
    #[serde(rename = "@lld")]
    lld: Option<String>,
}

pub struct TaisParser;

impl Parser for TaisParser {
    fn name(&self) -> &'static str {
        "tais"
    }

    fn can_parse(&self, service: ServiceType) -> bool {
        service == ServiceType::Tais
    }

    fn parse(&self, raw: &RawMessage) -> Result<Vec<DomainEvent>, ParseError> {
        let doc: TaisDoc =
            quick_xml::de::from_str(&raw.payload).map_err(|e| ParseError::MalformedXml(e.to_string()))?;

        let mut events = Vec::with_capacity(doc.records.len() * 2);
        for record in &doc.records {
            if let Some(track) = &record.track {
                if let (Some(lat), Some(lon)) = (track.lat, track.lon) {
                    events.push(DomainEvent::TrackPosition(track_position(track, &doc.src, lat, lon)));
                }
            }
            if let Some(plan) = &record.flight_plan {
                events.push(DomainEvent::FlightPlanData(Box::new(flight_plan(plan))));
            }
        }
        Ok(events)
    }
}

fn track_position(track: &TaisTrack, facility: &str, lat: f64, lon: f64) -> TrackPosition {
    let (ground_speed_kt, ground_track_deg) = ground_vector(track.vx, track.vy);
    TrackPosition {
        timestamp: Utc::now(),
        facility: facility.to_string(),
        track_num: track.track_num,
        lat,
        lon,
        altitude_ft: track.reported_altitude,
        altitude_type: AltitudeType::Unknown,
        ground_speed_kt,
        ground_track_deg,
        vertical_rate_fpm: track.v_rate,
        squawk: non_empty(track.reported_beacon_code.clone()),
        mode_s: mode_s(track.ac_address.as_deref()),
        on_ground: track.on_ground,
        ident: track.ident,
    }
}

fn flight_plan(plan: &TaisFlightPlan) -> FlightPlanData {
    FlightPlanData {
        timestamp: Utc::now(),
        callsign: non_empty(plan.callsign.clone()),
        aircraft_type: non_empty(plan.ac_type.clone()),
        wake_category: non_empty(plan.wake_category.clone()),
        equipment_suffix: unavailable_to_none(plan.equipment_suffix.clone()),
        flight_rules: non_empty(plan.flight_rules.clone()),
        origin: non_empty(plan.origin.clone()),
        destination: non_empty(plan.destination.clone()),
        entry_fix: non_empty(plan.entry_fix.clone()),
        exit_fix: non_empty(plan.exit_fix.clone()),
        route: non_empty(plan.route.clone()),
        requested_altitude: plan.requested_altitude,
        assigned_beacon: non_empty(plan.assigned_beacon.clone()),
        runway: non_empty(plan.runway.clone()),
        scratchpad1: non_empty(plan.scratchpad1.clone()),
        scratchpad2: non_empty(plan.scratchpad2.clone()),
        owner_sector: non_empty(plan.owner_sector.clone()),
        pending_handoff_sector: non_empty(plan.pending_handoff_sector.clone()),
        leader_line_direction: leader_line_direction(plan.lld.as_deref()),
        ..Default::default()
    }
}

/// Ground speed is `round(sqrt(vx^2 + vy^2))`; ground track is `atan2(vx, vy)` in degrees,
/// normalized to `[0, 360)`. A stationary target (`vx == vy == 0`) has speed zero and no
/// track heading.
fn ground_vector(vx: Option<f64>, vy: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (vx, vy) {
        (Some(vx), Some(vy)) if vx == 0.0 && vy == 0.0 => (Some(0.0), None),
        (Some(vx), Some(vy)) => {
            let speed = (vx * vx + vy * vy).sqrt().round();
            let track = vx.atan2(vy).to_degrees();
            let track = if track < 0.0 { track + 360.0 } else { track };
            (Some(speed), Some(track))
        }
        _ => (None, None),
    }
}

/// The literal value `"000000"` means no Mode-S address was assigned.
fn mode_s(ac_address: Option<&str>) -> Option<String> {
    match ac_address {
        Some("000000") => None,
        Some(addr) if !addr.is_empty() => Some(addr.to_uppercase()),
        _ => None,
    }
}

/// `lld` (leader-line direction) maps compass points to clock positions; anything else,
/// including the absence of a line, is unknown.
fn leader_line_direction(lld: Option<&str>) -> Option<u8> {
    match lld {
        Some("NW") => Some(1),
        Some("N") => Some(2),
        Some("NE") => Some(3),
        Some("W") => Some(4),
        Some("E") => Some(6),
        Some("SW") => Some(7),
        Some("S") => Some(8),
        Some("SE") => Some(9),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn unavailable_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty() && s != "unavailable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn track(payload: &str) -> Vec<DomainEvent> {
        TaisParser
            .parse(&RawMessage::new("swim.stdds.tais.out", ServiceType::Tais, payload))
            .expect("parses")
    }

    #[test]
    fn parses_position_and_flight_plan() {
        let xml = r#"<TATrackAndFlightPlan src="BOS">
            <record>
                <track trackNum="42" lat="42.3643" lon="-71.0052" vx="300" vy="400"
                       reportedAltitude="12000" reportedBeaconCode="1234" acAddress="ABC123"/>
                <flightPlan callsign="UAL123" lld="SE"/>
            </record>
        </TATrackAndFlightPlan>"#;
        let events = track(xml);
        assert_eq!(events.len(), 2);
        let DomainEvent::TrackPosition(pos) = &events[0] else { panic!("expected track position") };
        assert_eq!(pos.facility, "BOS");
        assert_eq!(pos.track_num, Some(42));
        assert_eq!(pos.ground_speed_kt, Some(500.0));
        assert_eq!(pos.mode_s.as_deref(), Some("ABC123"));
        assert_eq!(pos.squawk.as_deref(), Some("1234"));

        let DomainEvent::FlightPlanData(plan) = &events[1] else { panic!("expected flight plan") };
        assert_eq!(plan.callsign.as_deref(), Some("UAL123"));
        assert_eq!(plan.leader_line_direction, Some(9));
    }

    #[test]
    fn zero_velocity_has_no_heading() {
        let xml = r#"<TATrackAndFlightPlan src="BOS">
            <record><track lat="1.0" lon="2.0" vx="0" vy="0"/></record>
        </TATrackAndFlightPlan>"#;
        let events = track(xml);
        let DomainEvent::TrackPosition(pos) = &events[0] else { panic!("expected track position") };
        assert_eq!(pos.ground_speed_kt, Some(0.0));
        assert_eq!(pos.ground_track_deg, None);
    }

    #[test]
    fn all_zero_ac_address_is_no_mode_s() {
        assert_eq!(mode_s(Some("000000")), None);
    }

    #[rstest]
    #[case("NW", Some(1))]
    #[case("N", Some(2))]
    #[case("NE", Some(3))]
    #[case("W", Some(4))]
    #[case("E", Some(6))]
    #[case("SW", Some(7))]
    #[case("S", Some(8))]
    #[case("SE", Some(9))]
    #[case("X", None)]
    fn leader_line_direction_map(#[case] lld: &str, #[case] expected: Option<u8>) {
        assert_eq!(leader_line_direction(Some(lld)), expected);
    }

    #[test]
    fn unavailable_equipment_suffix_is_absent() {
        assert_eq!(unavailable_to_none(Some("unavailable".to_string())), None);
        assert_eq!(unavailable_to_none(Some("".to_string())), None);
        assert_eq!(unavailable_to_none(Some("L".to_string())), Some("L".to_string()));
    }

    #[test]
    fn record_without_coordinates_emits_no_track() {
        let xml = r#"<TATrackAndFlightPlan src="BOS">
            <record><track vx="0" vy="0"/></record>
        </TATrackAndFlightPlan>"#;
        assert!(track(xml).is_empty());
    }
}
