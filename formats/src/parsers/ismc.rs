//! ISMC (Integrated Surveillance and Mode-S Correlation) stub.
//!
//! Out of scope for normalized events, same rationale as [`super::apds`].

use super::Parser;
use crate::{DomainEvent, ParseError, RawMessage, ServiceType};

pub struct IsmcParser;

impl Parser for IsmcParser {
    fn name(&self) -> &'static str {
        "ismc"
    }

    fn can_parse(&self, service: ServiceType) -> bool {
        service == ServiceType::Ismc
    }

    fn parse(&self, _raw: &RawMessage) -> Result<Vec<DomainEvent>, ParseError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_service_but_emits_nothing() {
        let parser = IsmcParser;
        assert!(parser.can_parse(ServiceType::Ismc));
        let events = parser
            .parse(&RawMessage::new("swim.ismc.out", ServiceType::Ismc, "<anything/>"))
            .expect("never fails");
        assert!(events.is_empty());
    }
}
