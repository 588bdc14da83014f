use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ServiceType;

/// One raw broker payload, immutable once received.
#[derive(Clone, Debug)]
pub struct RawMessage {
    pub received_at: DateTime<Utc>,
    pub topic: String,
    pub service: ServiceType,
    pub payload: String,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, service: ServiceType, payload: impl Into<String>) -> Self {
        Self {
            received_at: Utc::now(),
            topic: topic.into(),
            service,
            payload: payload.into(),
        }
    }
}

/// How an altitude value was derived.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AltitudeType {
    Pressure,
    True,
    #[default]
    Unknown,
}

/// What kind of surface target an ASDE-X report describes.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum TargetType {
    Aircraft,
    Vehicle,
    #[default]
    Unknown,
}

/// The eleven FIXM message kinds the SFDPS parser understands, driving the handoff state
/// machine in the flight-state store.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
pub enum SfdpsMsgKind {
    /// Track and history, position-only update.
    Th,
    /// Track and history, position-only update (alternate source).
    Hz,
    /// Ownership transfer, used to detect handoff completion.
    Oh,
    /// Flight plan amendment.
    Fh,
    /// Handoff proposed.
    Hp,
    /// Handoff initiated by transferring controller.
    Hu,
    /// Handoff accepted.
    Ah,
    /// Handoff cancelled/rejected.
    Hx,
    /// Flight plan cancelled.
    Cl,
    /// Flight plan filed/created.
    Lh,
    /// Non-position update (e.g. remarks).
    Np,
}

impl SfdpsMsgKind {
    /// Whether this message kind carries only a position/kinematics update and should not
    /// drive the handoff state machine.
    pub fn is_position_only(self) -> bool {
        matches!(self, SfdpsMsgKind::Th | SfdpsMsgKind::Hz | SfdpsMsgKind::Np)
    }
}

/// One normalized radar track position.
#[derive(Clone, Debug, Default)]
pub struct TrackPosition {
    pub timestamp: DateTime<Utc>,
    pub facility: String,
    /// Terminal-radar track number, used by the legacy identity mapper together with
    /// `mode_s` and `facility`.
    pub track_num: Option<i64>,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: Option<i32>,
    pub altitude_type: AltitudeType,
    pub ground_speed_kt: Option<f64>,
    pub ground_track_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    pub squawk: Option<String>,
    pub mode_s: Option<String>,
    pub on_ground: bool,
    pub ident: bool,
}

/// Flight-plan data, and for SFDPS, the state-merge fields consumed by the flight-state
/// store (handoff/ownership/identity). Every field besides the identity keys is optional:
/// `None` means "no update" per the merge rule in the flight-state store.
#[derive(Clone, Debug, Default)]
pub struct FlightPlanData {
    pub timestamp: DateTime<Utc>,
    /// Globally-unique flight identifier; the flight-state store's primary key. Required
    /// for SFDPS events (events lacking it are dropped); absent for STDDS/TAIS plans that
    /// have no GUFI concept.
    pub gufi: Option<String>,
    pub fdps_gufi: Option<String>,
    pub callsign: Option<String>,
    pub computer_id: Option<String>,
    /// Facility that assigned `computer_id`, used to union-merge the per-facility CID map.
    pub computer_id_facility: Option<String>,
    pub aircraft_type: Option<String>,
    pub wake_category: Option<String>,
    pub equipment_suffix: Option<String>,
    pub flight_rules: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub entry_fix: Option<String>,
    pub exit_fix: Option<String>,
    pub route: Option<String>,
    pub requested_altitude: Option<i32>,
    pub assigned_beacon: Option<String>,
    pub runway: Option<String>,
    pub scratchpad1: Option<String>,
    pub scratchpad2: Option<String>,
    pub owner_sector: Option<String>,
    pub pending_handoff_sector: Option<String>,
    pub leader_line_direction: Option<u8>,
    pub controlling_facility: Option<String>,
    pub controlling_sector: Option<String>,
    pub reporting_facility: Option<String>,
    pub assigned_altitude: Option<i32>,
    pub interim_altitude: Option<i32>,
    pub reported_altitude: Option<i32>,
    /// Present only for SFDPS messages; drives the handoff state machine.
    pub msg_kind: Option<SfdpsMsgKind>,
    pub handoff_receiving: Option<String>,
    pub handoff_transferring: Option<String>,
    pub handoff_accepting: Option<String>,
}

/// A gate-out/taxi/takeoff event for one flight.
#[derive(Clone, Debug)]
pub struct Departure {
    pub timestamp: DateTime<Utc>,
    pub callsign: String,
    pub airport: String,
    pub runway: Option<String>,
    pub gate: Option<String>,
    pub gate_out: Option<DateTime<Utc>>,
    pub taxi_start: Option<DateTime<Utc>>,
    pub takeoff: Option<DateTime<Utc>>,
}

/// One ASDE-X surface-movement report.
#[derive(Clone, Debug)]
pub struct SurfaceMovement {
    pub timestamp: DateTime<Utc>,
    pub airport: String,
    pub asdex_track_id: String,
    pub target_type: TargetType,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: Option<i32>,
    pub ground_speed_kt: Option<f64>,
    pub heading_deg: Option<f64>,
    pub flight_id_xref: Option<String>,
    /// Distinguishes a full report (all fields populated) from a delta.
    pub full: bool,
}

/// A normalized event emitted by a parser, every variant timestamped and source-tagged.
#[derive(Clone, Debug)]
pub enum DomainEvent {
    TrackPosition(TrackPosition),
    FlightPlanData(Box<FlightPlanData>),
    Departure(Departure),
    SurfaceMovement(SurfaceMovement),
}

impl DomainEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::TrackPosition(e) => e.timestamp,
            DomainEvent::FlightPlanData(e) => e.timestamp,
            DomainEvent::Departure(e) => e.timestamp,
            DomainEvent::SurfaceMovement(e) => e.timestamp,
        }
    }
}
