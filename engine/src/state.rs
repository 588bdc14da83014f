//! The flight-state record, its handoff state machine and field-merge logic.
//!
//! Everything in this module is pure: the store actor in [`crate::actors::store`] is the only
//! thing that mutates a [`FlightState`], one message at a time.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swim_formats::{FlightPlanData, SfdpsMsgKind};

/// Bounded ring size for a flight's state-change log (spec: 50).
pub const EVENT_LOG_CAPACITY: usize = 50;

/// Post-completion window during which a fresh handoff cannot be proposed (spec open question,
/// resolved server-side): after this many seconds past [`FlightState::handoff_completed_at`]
/// the phase is folded back to [`HandoffPhase::Idle`].
pub const HANDOFF_COOLDOWN_SECS: i64 = 60;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightStatus {
    #[default]
    Active,
    Dropped,
    Cancelled,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HandoffPhase {
    #[default]
    Idle,
    Proposed,
    Completed,
}

/// One entry in a flight's bounded change log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub fields: Vec<String>,
}

/// The authoritative record for one flight, keyed by GUFI in the store's map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FlightState {
    pub gufi: String,
    pub fdps_gufi: Option<String>,
    pub callsign: Option<String>,
    pub computer_id: Option<String>,
    pub computer_ids: BTreeMap<String, String>,

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

    pub assigned_altitude: Option<i32>,
    pub interim_altitude: Option<i32>,
    pub reported_altitude: Option<i32>,

    pub controlling_facility: Option<String>,
    pub controlling_sector: Option<String>,
    pub reporting_facility: Option<String>,

    pub handoff_phase: HandoffPhase,
    pub handoff_receiving: Option<String>,
    pub handoff_transferring: Option<String>,
    pub handoff_accepting: Option<String>,
    #[serde(skip)]
    pub handoff_completed_at: Option<DateTime<Utc>>,

    pub status: FlightStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub event_log: VecDeque<StateChangeRecord>,
}

impl FlightState {
    pub fn new(gufi: String) -> Self {
        FlightState { gufi, ..Default::default() }
    }

    /// Applies one SFDPS flight-plan event: field merge, handoff state machine, event-log
    /// append. Returns the names of fields that changed (empty ⇒ no broadcast needed).
    pub fn apply(&mut self, event: &FlightPlanData, now: DateTime<Utc>) -> Vec<String> {
        self.last_seen = Some(now);
        let mut changed = self.merge_fields(event);
        if let Some(kind) = event.msg_kind {
            changed.extend(self.apply_handoff(kind, event, now));
        }
        if !changed.is_empty() {
            self.push_log(now, event.msg_kind, &changed);
        }
        changed
    }

    fn merge_fields(&mut self, event: &FlightPlanData) -> Vec<String> {
        let mut changed = Vec::new();
        macro_rules! merge {
            ($field:ident) => {
                if let Some(value) = &event.$field {
                    if self.$field.as_ref() != Some(value) {
                        self.$field = Some(value.clone());
                        changed.push(stringify!($field).to_string());
                    }
                }
            };
        }
        merge!(fdps_gufi);
        merge!(callsign);
        merge!(aircraft_type);
        merge!(wake_category);
        merge!(equipment_suffix);
        merge!(flight_rules);
        merge!(origin);
        merge!(destination);
        merge!(entry_fix);
        merge!(exit_fix);
        merge!(route);
        merge!(assigned_beacon);
        merge!(runway);
        merge!(scratchpad1);
        merge!(scratchpad2);
        merge!(owner_sector);
        merge!(pending_handoff_sector);
        merge!(controlling_facility);
        merge!(controlling_sector);
        merge!(reporting_facility);

        if let Some(value) = event.requested_altitude {
            if self.requested_altitude != Some(value) {
                self.requested_altitude = Some(value);
                changed.push("requested_altitude".to_string());
            }
        }
        if let Some(value) = event.assigned_altitude {
            if self.assigned_altitude != Some(value) {
                self.assigned_altitude = Some(value);
                changed.push("assigned_altitude".to_string());
            }
        }
        if let Some(value) = event.interim_altitude {
            if self.interim_altitude != Some(value) {
                self.interim_altitude = Some(value);
                changed.push("interim_altitude".to_string());
            }
        }
        if let Some(value) = event.reported_altitude {
            if self.reported_altitude != Some(value) {
                self.reported_altitude = Some(value);
                changed.push("reported_altitude".to_string());
            }
        }
        if let Some(value) = event.leader_line_direction {
            if self.leader_line_direction != Some(value) {
                self.leader_line_direction = Some(value);
                changed.push("leader_line_direction".to_string());
            }
        }

        // Per-facility CID map: set-once-per-facility, an overwrite is a reconciliation event.
        if let (Some(cid), Some(facility)) = (&event.computer_id, &event.computer_id_facility) {
            if self.computer_id.as_ref() != Some(cid) {
                self.computer_id = Some(cid.clone());
                changed.push("computer_id".to_string());
            }
            match self.computer_ids.get(facility) {
                Some(existing) if existing == cid => {}
                _ => {
                    self.computer_ids.insert(facility.clone(), cid.clone());
                    changed.push(format!("computer_ids.{facility}"));
                }
            }
        }

        changed
    }

    /// The handoff transition table from the spec's section 4.4; returns any fields the
    /// transition itself changed (independent of the plain field merge above).
    fn apply_handoff(&mut self, kind: SfdpsMsgKind, event: &FlightPlanData, now: DateTime<Utc>) -> Vec<String> {
        if kind == SfdpsMsgKind::Cl {
            self.status = FlightStatus::Cancelled;
            return vec!["status".to_string()];
        }
        if kind.is_position_only() {
            return Vec::new();
        }

        if self.handoff_phase == HandoffPhase::Completed {
            if let Some(completed_at) = self.handoff_completed_at {
                if now - completed_at >= Duration::seconds(HANDOFF_COOLDOWN_SECS) {
                    self.handoff_phase = HandoffPhase::Idle;
                    self.handoff_completed_at = None;
                }
            }
        }

        let mut changed = Vec::new();
        match (self.handoff_phase, kind) {
            (HandoffPhase::Idle, SfdpsMsgKind::Hp | SfdpsMsgKind::Hu | SfdpsMsgKind::Ah) => {
                self.set_handoff(event);
                self.handoff_phase = HandoffPhase::Proposed;
                changed.push("handoff_phase".to_string());
            }
            (HandoffPhase::Proposed, SfdpsMsgKind::Hx) => {
                self.clear_handoff();
                self.handoff_phase = HandoffPhase::Idle;
                changed.push("handoff_phase".to_string());
            }
            (HandoffPhase::Proposed, SfdpsMsgKind::Oh)
                if event.controlling_facility.is_some() && event.controlling_facility == self.handoff_receiving =>
            {
                self.clear_handoff();
                self.handoff_phase = HandoffPhase::Completed;
                self.handoff_completed_at = Some(now);
                changed.push("handoff_phase".to_string());
            }
            (HandoffPhase::Proposed, SfdpsMsgKind::Hp) if event.handoff_receiving != self.handoff_receiving => {
                self.set_handoff(event);
                changed.push("handoff_receiving".to_string());
            }
            _ => {}
        }
        changed
    }

    fn set_handoff(&mut self, event: &FlightPlanData) {
        if let Some(r) = &event.handoff_receiving {
            self.handoff_receiving = Some(r.clone());
        }
        if let Some(t) = &event.handoff_transferring {
            self.handoff_transferring = Some(t.clone());
        }
        if let Some(a) = &event.handoff_accepting {
            self.handoff_accepting = Some(a.clone());
        }
    }

    fn clear_handoff(&mut self) {
        self.handoff_receiving = None;
        self.handoff_transferring = None;
        self.handoff_accepting = None;
    }

    fn push_log(&mut self, now: DateTime<Utc>, kind: Option<SfdpsMsgKind>, fields: &[String]) {
        if self.event_log.len() >= EVENT_LOG_CAPACITY {
            self.event_log.pop_front();
        }
        self.event_log.push_back(StateChangeRecord {
            timestamp: now,
            kind: kind.map(|k| k.to_string()).unwrap_or_else(|| "update".to_string()),
            fields: fields.to_vec(),
        });
    }

    /// Renders the changed fields as a JSON map, for the `update` envelope.
    pub fn changed_fields_json(&self, changed: &[String]) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        let whole = serde_json::to_value(self).unwrap_or(Value::Null);
        let Value::Object(map) = whole else { return out };
        for field in changed {
            let key = field.split('.').next().unwrap_or(field);
            if let Some(value) = map.get(key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        out.insert("gufi".to_string(), Value::String(self.gufi.clone()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sfdps(kind: SfdpsMsgKind, gufi: &str) -> FlightPlanData {
        FlightPlanData { gufi: Some(gufi.to_string()), msg_kind: Some(kind), ..Default::default() }
    }

    #[test]
    fn handoff_proposal_then_completion_clears_fields() {
        let mut state = FlightState::new("G1".to_string());
        let now = Utc::now();

        let mut hp = sfdps(SfdpsMsgKind::Hp, "G1");
        hp.handoff_receiving = Some("ZNY".to_string());
        hp.handoff_transferring = Some("ZBW".to_string());
        let changed = state.apply(&hp, now);
        assert!(!changed.is_empty());
        assert_eq!(state.handoff_phase, HandoffPhase::Proposed);
        assert_eq!(state.handoff_receiving.as_deref(), Some("ZNY"));

        let mut oh = sfdps(SfdpsMsgKind::Oh, "G1");
        oh.controlling_facility = Some("ZNY".to_string());
        let changed = state.apply(&oh, now + Duration::seconds(5));
        assert!(!changed.is_empty());
        assert_eq!(state.handoff_phase, HandoffPhase::Completed);
        assert!(state.handoff_receiving.is_none());
        assert_eq!(state.event_log.len(), 2);
    }

    #[test]
    fn completed_phase_falls_back_to_idle_after_cooldown() {
        let mut state = FlightState::new("G1".to_string());
        let now = Utc::now();
        state.handoff_phase = HandoffPhase::Completed;
        state.handoff_completed_at = Some(now - Duration::seconds(61));

        let th = sfdps(SfdpsMsgKind::Th, "G1");
        state.apply(&th, now);
        // position-only events never transition the handoff machine themselves...
        assert_eq!(state.handoff_phase, HandoffPhase::Completed);

        let mut hp = sfdps(SfdpsMsgKind::Hp, "G1");
        hp.handoff_receiving = Some("ZDC".to_string());
        state.apply(&hp, now);
        assert_eq!(state.handoff_phase, HandoffPhase::Proposed);
    }

    #[test]
    fn cancel_sets_status_regardless_of_phase() {
        let mut state = FlightState::new("G1".to_string());
        let cl = sfdps(SfdpsMsgKind::Cl, "G1");
        let changed = state.apply(&cl, Utc::now());
        assert_eq!(state.status, FlightStatus::Cancelled);
        assert_eq!(changed, vec!["status".to_string()]);
    }

    #[test]
    fn computer_id_overwrite_for_same_facility_is_a_reconciliation_event() {
        let mut state = FlightState::new("G1".to_string());
        let mut first = sfdps(SfdpsMsgKind::Fh, "G1");
        first.computer_id = Some("C1".to_string());
        first.computer_id_facility = Some("ZNY".to_string());
        state.apply(&first, Utc::now());
        assert_eq!(state.computer_ids.get("ZNY"), Some(&"C1".to_string()));

        let mut second = sfdps(SfdpsMsgKind::Fh, "G1");
        second.computer_id = Some("C2".to_string());
        second.computer_id_facility = Some("ZNY".to_string());
        let changed = state.apply(&second, Utc::now());
        assert!(changed.iter().any(|f| f.starts_with("computer_ids.")));
        assert_eq!(state.computer_ids.get("ZNY"), Some(&"C2".to_string()));
    }

    #[test]
    fn event_log_ring_discards_oldest_on_overflow() {
        let mut state = FlightState::new("G1".to_string());
        for i in 0..EVENT_LOG_CAPACITY + 5 {
            let mut fh = sfdps(SfdpsMsgKind::Fh, "G1");
            fh.callsign = Some(format!("CS{i}"));
            state.apply(&fh, Utc::now());
        }
        assert_eq!(state.event_log.len(), EVENT_LOG_CAPACITY);
    }

    use proptest::prelude::*;

    proptest! {
        /// For any sequence of callsign updates (each either absent, meaning "no update", or a
        /// fresh value), the field converges to the last `Some` value in the sequence —
        /// the last-non-null-wins merge rule, independent of the handoff state machine.
        #[test]
        fn callsign_merge_is_last_non_null_wins(updates in proptest::collection::vec(proptest::option::of("[A-Z]{3,7}"), 0..20)) {
            let mut state = FlightState::new("G1".to_string());
            let now = Utc::now();
            for update in &updates {
                let mut event = sfdps(SfdpsMsgKind::Np, "G1");
                event.callsign = update.clone();
                state.apply(&event, now);
            }
            let expected = updates.into_iter().flatten().last();
            prop_assert_eq!(state.callsign, expected);
        }
    }
}
