use serde::{Deserialize, Serialize};

/// Which terminal-automation or en-route feed a raw payload came from, inferred from the
/// broker topic string.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq, Hash, strum::Display, Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ServiceType {
    Tais,
    Tdes,
    Smes,
    Apds,
    Ismc,
    Sfdps,
    #[default]
    Unknown,
}

impl ServiceType {
    /// Infers the service type from a topic substring match, case-insensitive, in the
    /// fixed precedence order given by the spec.
    pub fn from_topic(topic: &str) -> Self {
        let topic = topic.to_ascii_uppercase();
        if topic.contains("TAIS") {
            ServiceType::Tais
        } else if topic.contains("TDES") {
            ServiceType::Tdes
        } else if topic.contains("SMES") {
            ServiceType::Smes
        } else if topic.contains("APDS") {
            ServiceType::Apds
        } else if topic.contains("ISMC") {
            ServiceType::Ismc
        } else {
            ServiceType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_case_insensitively() {
        assert_eq!(ServiceType::from_topic("swim.stdds.tais.out"), ServiceType::Tais);
        assert_eq!(ServiceType::from_topic("SWIM.STDDS.Tdes.OUT"), ServiceType::Tdes);
        assert_eq!(ServiceType::from_topic("nothing-matching"), ServiceType::Unknown);
    }
}
