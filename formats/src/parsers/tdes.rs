//! TDES (Terminal Data Distribution, departures) parser.
//!
//! Root element `Departure`, one per gate-out/taxi/takeoff event.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::Parser;
use crate::{Departure, DomainEvent, ParseError, RawMessage, ServiceType};

#[derive(Debug, Deserialize)]
#[serde(rename = "Departure")]
struct DepartureDoc {
    #[serde(rename = "@callsign")]
    callsign: String,
    #[serde(rename = "@airport")]
    airport: String,
    #[serde(rename = "@runway")]
    runway: Option<String>,
    #[serde(rename = "@gate")]
    gate: Option<String>,
    #[serde(rename = "@gateOut")]
    gate_out: Option<DateTime<Utc>>,
    #[serde(rename = "@taxiStart")]
    taxi_start: Option<DateTime<Utc>>,
    #[serde(rename = "@takeoff")]
    takeoff: Option<DateTime<Utc>>,
}

pub struct TdesParser;

impl Parser for TdesParser {
    fn name(&self) -> &'static str {
        "tdes"
    }

    fn can_parse(&self, service: ServiceType) -> bool {
        service == ServiceType::Tdes
    }

    fn parse(&self, raw: &RawMessage) -> Result<Vec<DomainEvent>, ParseError> {
        let doc: DepartureDoc =
            quick_xml::de::from_str(&raw.payload).map_err(|e| ParseError::MalformedXml(e.to_string()))?;

        Ok(vec![DomainEvent::Departure(Departure {
            timestamp: Utc::now(),
            callsign: doc.callsign,
            airport: doc.airport,
            runway: doc.runway,
            gate: doc.gate,
            gate_out: doc.gate_out,
            taxi_start: doc.taxi_start,
            takeoff: doc.takeoff,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_departure() {
        let xml = r#"<Departure callsign="UAL123" airport="BOS" runway="04R" gateOut="2026-07-31T12:00:00Z"/>"#;
        let events = TdesParser
            .parse(&RawMessage::new("swim.stdds.tdes.out", ServiceType::Tdes, xml))
            .expect("parses");
        let DomainEvent::Departure(dep) = &events[0] else { panic!("expected departure") };
        assert_eq!(dep.callsign, "UAL123");
        assert_eq!(dep.runway.as_deref(), Some("04R"));
        assert!(dep.gate_out.is_some());
        assert!(dep.takeoff.is_none());
    }
}
