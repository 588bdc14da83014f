//! Wire envelopes sent to downstream clients over both the websocket and NDJSON bindings.
//!
//! [`Envelope::Track`] and [`Envelope::Surface`] carry the legacy-protocol shapes from
//! §3/§4.6 of the spec (TAIS track positions and ASDE-X surface movement, neither of which
//! has a GUFI) alongside the GUFI-keyed flight envelopes; both travel over the same per-client
//! queue and wire bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::FlightState;

/// One JSON message sent to a downstream client.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Snapshot { flights: Vec<FlightState> },
    Update { gufi: String, fields: BTreeMap<String, Value> },
    Remove { gufi: String },
    Stats { #[serde(rename = "msgTotal")] msg_total: u64, #[serde(rename = "msgRate")] msg_rate: f64, #[serde(rename = "activeFlights")] active_flights: usize },
    /// A legacy-protocol track position, keyed by the Identity Mapper's stable synthetic id
    /// rather than a GUFI.
    Track {
        #[serde(rename = "trackId")]
        track_id: u64,
        facility: String,
        lat: f64,
        lon: f64,
        #[serde(rename = "altitudeFeet", skip_serializing_if = "Option::is_none")]
        altitude_ft: Option<i32>,
        #[serde(rename = "groundSpeedKnots", skip_serializing_if = "Option::is_none")]
        ground_speed_kt: Option<f64>,
        #[serde(rename = "groundTrackDegrees", skip_serializing_if = "Option::is_none")]
        ground_track_deg: Option<f64>,
        #[serde(rename = "modeSCode", skip_serializing_if = "Option::is_none")]
        mode_s: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        squawk: Option<String>,
        #[serde(rename = "onGround")]
        on_ground: bool,
    },
    /// An ASDE-X surface movement report, facility-scoped on the reporting airport.
    Surface {
        airport: String,
        #[serde(rename = "trackId")]
        track_id: String,
        lat: f64,
        lon: f64,
        full: bool,
    },
    /// A departure milestone (gate-out / taxi / takeoff), broadcast to all clients.
    Departure {
        callsign: String,
        airport: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        runway: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_envelope_round_trips() {
        let mut fields = BTreeMap::new();
        fields.insert("callsign".to_string(), Value::String("UAL123".to_string()));
        let env = Envelope::Update { gufi: "G1".to_string(), fields };
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"type\":\"update\""));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        match back {
            Envelope::Update { gufi, .. } => assert_eq!(gufi, "G1"),
            _ => panic!("expected update"),
        }
    }
}
