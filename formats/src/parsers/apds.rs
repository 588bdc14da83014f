//! APDS (Aggregate Position Data Service) stub.
//!
//! Out of scope for normalized events: accepted so the broker consumer does not log every
//! APDS message as unclaimed, but never produces a [`DomainEvent`].

use super::Parser;
use crate::{DomainEvent, ParseError, RawMessage, ServiceType};

pub struct ApdsParser;

impl Parser for ApdsParser {
    fn name(&self) -> &'static str {
        "apds"
    }

    fn can_parse(&self, service: ServiceType) -> bool {
        service == ServiceType::Apds
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
        let parser = ApdsParser;
        assert!(parser.can_parse(ServiceType::Apds));
        let events = parser
            .parse(&RawMessage::new("swim.apds.out", ServiceType::Apds, "<anything/>"))
            .expect("never fails");
        assert!(events.is_empty());
    }
}
