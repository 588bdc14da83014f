//! One module per STDDS/SFDPS service, each translating its XML shape into [`DomainEvent`]s.
//!
//! A parser never touches shared state and never fails the pipeline: a malformed document
//! is logged and turned into zero events, not a propagated error.

mod apds;
mod ismc;
mod sfdps;
mod smes;
mod tais;
mod tdes;

use crate::{DomainEvent, ParseError, RawMessage, ServiceType};

/// A parser for one broker service. Implementations are stateless and safe to share.
pub trait Parser: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_parse(&self, service: ServiceType) -> bool;

    fn parse(&self, raw: &RawMessage) -> Result<Vec<DomainEvent>, ParseError>;
}

/// Builds the fixed set of parsers registered at startup, one per service type named in the
/// broker feed list.
pub fn registry() -> Vec<Box<dyn Parser>> {
    vec![
        Box::new(tais::TaisParser),
        Box::new(sfdps::SfdpsParser),
        Box::new(tdes::TdesParser),
        Box::new(smes::SmesParser),
        Box::new(apds::ApdsParser),
        Box::new(ismc::IsmcParser),
    ]
}

/// Runs `raw` through whichever registered parser claims its service, logging and dropping
/// the message on a parse error rather than propagating it.
pub fn dispatch(registry: &[Box<dyn Parser>], raw: &RawMessage) -> Vec<DomainEvent> {
    for parser in registry {
        if parser.can_parse(raw.service) {
            return match parser.parse(raw) {
                Ok(events) => events,
                Err(err) => {
                    tracing::warn!(parser = parser.name(), topic = %raw.topic, error = %err, "dropping malformed message");
                    Vec::new()
                }
            };
        }
    }
    tracing::debug!(service = %raw.service, topic = %raw.topic, "no parser registered for service");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_drops_unclaimed_service() {
        let reg = registry();
        let raw = RawMessage::new("swim.unknown.out", ServiceType::Unknown, "<x/>");
        assert!(dispatch(&reg, &raw).is_empty());
    }

    #[test]
    fn dispatch_drops_malformed_xml() {
        let reg = registry();
        let raw = RawMessage::new("swim.stdds.tais.out", ServiceType::Tais, "not xml at all <<");
        assert!(dispatch(&reg, &raw).is_empty());
    }
}
