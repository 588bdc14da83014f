//! SFDPS (FIXM flight data) parser.
//!
//! The broker delivers one of eleven message kinds, the root element itself named after the
//! kind (`TH`, `HZ`, `OH`, `FH`, `HP`, `HU`, `AH`, `HX`, `CL`, `LH`, `NP`). All eleven share
//! one attribute shape; which fields are populated depends on the kind. Only the GUFI is
//! required — a message missing it cannot be merged into the flight-state store and is
//! dropped.

use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use super::Parser;
use crate::{DomainEvent, FlightPlanData, ParseError, RawMessage, ServiceType, SfdpsMsgKind};

#[derive(Debug, Default, Deserialize)]
struct SfdpsMessage {
    #[serde(rename = "@gufi")]
    gufi: Option<String>,
    #[serde(rename = "@fdpsGufi")]
    fdps_gufi: Option<String>,
    #[serde(rename = "@callsign")]
    callsign: Option<String>,
    #[serde(rename = "@computerId")]
    computer_id: Option<String>,
    #[serde(rename = "@computerIdFacility")]
    computer_id_facility: Option<String>,
    #[serde(rename = "@controllingFacility")]
    controlling_facility: Option<String>,
    #[serde(rename = "@controllingSector")]
    controlling_sector: Option<String>,
    #[serde(rename = "@reportingFacility")]
    reporting_facility: Option<String>,
    #[serde(rename = "@receiving")]
    handoff_receiving: Option<String>,
    #[serde(rename = "@transferring")]
    handoff_transferring: Option<String>,
    #[serde(rename = "@accepting")]
    handoff_accepting: Option<String>,
    #[serde(rename = "@assignedAltitude")]
    assigned_altitude: Option<i32>,
    #[serde(rename = "@interimAltitude")]
    interim_altitude: Option<i32>,
    #[serde(rename = "@reportedAltitude")]
    reported_altitude: Option<i32>,
    #[serde(rename = "@route")]
    route: Option<String>,
    #[serde(rename = "@origin")]
    origin: Option<String>,
    #[serde(rename = "@destination")]
    destination: Option<String>,
}

pub struct SfdpsParser;

impl Parser for SfdpsParser {
    fn name(&self) -> &'static str {
        "sfdps"
    }

    fn can_parse(&self, service: ServiceType) -> bool {
        service == ServiceType::Sfdps
    }

    fn parse(&self, raw: &RawMessage) -> Result<Vec<DomainEvent>, ParseError> {
        let kind = root_tag_kind(&raw.payload)?;
        let msg: SfdpsMessage =
            quick_xml::de::from_str(&raw.payload).map_err(|e| ParseError::MalformedXml(e.to_string()))?;

        let Some(gufi) = msg.gufi.clone() else {
            return Err(ParseError::MissingField("gufi"));
        };

        Ok(vec![DomainEvent::FlightPlanData(Box::new(FlightPlanData {
            timestamp: Utc::now(),
            gufi: Some(gufi),
            fdps_gufi: msg.fdps_gufi,
            callsign: msg.callsign,
            computer_id: msg.computer_id,
            computer_id_facility: msg.computer_id_facility,
            route: msg.route,
            origin: msg.origin,
            destination: msg.destination,
            controlling_facility: msg.controlling_facility,
            controlling_sector: msg.controlling_sector,
            reporting_facility: msg.reporting_facility,
            assigned_altitude: msg.assigned_altitude,
            interim_altitude: msg.interim_altitude,
            reported_altitude: msg.reported_altitude,
            msg_kind: Some(kind),
            handoff_receiving: msg.handoff_receiving,
            handoff_transferring: msg.handoff_transferring,
            handoff_accepting: msg.handoff_accepting,
            ..Default::default()
        }))])
    }
}

/// The message kind is the root element's local name; this is a cheap pre-scan so the full
/// document can still be deserialized generically by [`SfdpsMessage`].
fn root_tag_kind(payload: &str) -> Result<SfdpsMsgKind, ParseError> {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => {
                let name = tag.local_name();
                let name = std::str::from_utf8(name.as_ref()).unwrap_or_default();
                return kind_from_str(name)
                    .ok_or_else(|| ParseError::InvalidValue { field: "root element", value: name.to_string() });
            }
            Ok(Event::Eof) => return Err(ParseError::MalformedXml("no root element".to_string())),
            Ok(_) => continue,
            Err(e) => return Err(ParseError::MalformedXml(e.to_string())),
        }
    }
}

fn kind_from_str(s: &str) -> Option<SfdpsMsgKind> {
    match s.to_ascii_uppercase().as_str() {
        "TH" => Some(SfdpsMsgKind::Th),
        "HZ" => Some(SfdpsMsgKind::Hz),
        "OH" => Some(SfdpsMsgKind::Oh),
        "FH" => Some(SfdpsMsgKind::Fh),
        "HP" => Some(SfdpsMsgKind::Hp),
        "HU" => Some(SfdpsMsgKind::Hu),
        "AH" => Some(SfdpsMsgKind::Ah),
        "HX" => Some(SfdpsMsgKind::Hx),
        "CL" => Some(SfdpsMsgKind::Cl),
        "LH" => Some(SfdpsMsgKind::Lh),
        "NP" => Some(SfdpsMsgKind::Np),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_handoff_proposal() {
        let xml = r#"<HP gufi="GUFI-1" callsign="UAL123" receiving="ZNY" transferring="ZBW" accepting="ZNY"/>"#;
        let events = SfdpsParser
            .parse(&RawMessage::new("swim.sfdps.out", ServiceType::Sfdps, xml))
            .expect("parses");
        assert_eq!(events.len(), 1);
        let DomainEvent::FlightPlanData(plan) = &events[0] else { panic!("expected flight plan") };
        assert_eq!(plan.gufi.as_deref(), Some("GUFI-1"));
        assert_eq!(plan.msg_kind, Some(SfdpsMsgKind::Hp));
        assert_eq!(plan.handoff_receiving.as_deref(), Some("ZNY"));
    }

    #[test]
    fn missing_gufi_is_dropped() {
        let xml = r#"<TH callsign="UAL123"/>"#;
        let err = SfdpsParser
            .parse(&RawMessage::new("swim.sfdps.out", ServiceType::Sfdps, xml))
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingField("gufi")));
    }

    #[test]
    fn unknown_root_element_is_malformed() {
        let xml = r#"<NOTAKIND gufi="G1"/>"#;
        assert!(SfdpsParser
            .parse(&RawMessage::new("swim.sfdps.out", ServiceType::Sfdps, xml))
            .is_err());
    }
}
