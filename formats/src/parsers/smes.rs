//! SMES (Surface Movement Event Service, ASDE-X) parser.
//!
//! Root element `ASDEXSurface`, one `target` per surface report.

use chrono::Utc;
use serde::Deserialize;

use super::Parser;
use crate::{DomainEvent, ParseError, RawMessage, ServiceType, SurfaceMovement, TargetType};

#[derive(Debug, Deserialize)]
#[serde(rename = "ASDEXSurface")]
struct SurfaceDoc {
    #[serde(rename = "@airport")]
    airport: String,
    #[serde(rename = "target", default)]
    targets: Vec<SurfaceTarget>,
}

#[derive(Debug, Deserialize)]
struct SurfaceTarget {
    #[serde(rename = "@trackId")]
    track_id: String,
    #[serde(rename = "@type", default)]
    target_type: TargetTypeAttr,
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
    #[serde(rename = "@altitude")]
    altitude_ft: Option<i32>,
    #[serde(rename = "@groundSpeed")]
    ground_speed_kt: Option<f64>,
    #[serde(rename = "@heading")]
    heading_deg: Option<f64>,
    #[serde(rename = "@flightIdXref")]
    flight_id_xref: Option<String>,
    #[serde(rename = "@full", default)]
    full: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TargetTypeAttr {
    Aircraft,
    Vehicle,
    #[default]
    #[serde(other)]
    Unknown,
}

impl From<TargetTypeAttr> for TargetType {
    fn from(value: TargetTypeAttr) -> Self {
        match value {
            TargetTypeAttr::Aircraft => TargetType::Aircraft,
            TargetTypeAttr::Vehicle => TargetType::Vehicle,
            TargetTypeAttr::Unknown => TargetType::Unknown,
        }
    }
}

pub struct SmesParser;

impl Parser for SmesParser {
    fn name(&self) -> &'static str {
        "smes"
    }

    fn can_parse(&self, service: ServiceType) -> bool {
        service == ServiceType::Smes
    }

    fn parse(&self, raw: &RawMessage) -> Result<Vec<DomainEvent>, ParseError> {
        let doc: SurfaceDoc =
            quick_xml::de::from_str(&raw.payload).map_err(|e| ParseError::MalformedXml(e.to_string()))?;

        Ok(doc
            .targets
            .into_iter()
            .map(|target| {
                DomainEvent::SurfaceMovement(SurfaceMovement {
                    timestamp: Utc::now(),
                    airport: doc.airport.clone(),
                    asdex_track_id: target.track_id,
                    target_type: target.target_type.into(),
                    lat: target.lat,
                    lon: target.lon,
                    altitude_ft: target.altitude_ft,
                    ground_speed_kt: target.ground_speed_kt,
                    heading_deg: target.heading_deg,
                    flight_id_xref: target.flight_id_xref,
                    full: target.full,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_targets() {
        let xml = r#"<ASDEXSurface airport="BOS">
            <target trackId="T1" type="aircraft" lat="42.36" lon="-71.0" full="true"/>
            <target trackId="T2" type="vehicle" lat="42.37" lon="-71.1"/>
        </ASDEXSurface>"#;
        let events = SmesParser
            .parse(&RawMessage::new("swim.stdds.smes.out", ServiceType::Smes, xml))
            .expect("parses");
        assert_eq!(events.len(), 2);
        let DomainEvent::SurfaceMovement(first) = &events[0] else { panic!("expected surface movement") };
        assert_eq!(first.airport, "BOS");
        assert_eq!(first.target_type, TargetType::Aircraft);
        assert!(first.full);
        let DomainEvent::SurfaceMovement(second) = &events[1] else { panic!("expected surface movement") };
        assert_eq!(second.target_type, TargetType::Vehicle);
        assert!(!second.full);
    }
}
