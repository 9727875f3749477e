use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::LbError;

/// A downstream server tier. Each tier exhibits a distinct failure regime
/// (raw error rate; error rate plus a fixed rate-limit; error rate plus a
/// dynamic rate-limit) and owns a disjoint block of ten ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    T1,
    T2,
    T3,
}

impl Tier {
    /// The ten ports that belong to this tier.
    pub fn ports(self) -> Range<u16> {
        match self {
            Tier::T1 => 4000..4010,
            Tier::T2 => 5000..5010,
            Tier::T3 => 6000..6010,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::T1 => "T1",
            Tier::T2 => "T2",
            Tier::T3 => "T3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = LbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T1" => Ok(Tier::T1),
            "T2" => Ok(Tier::T2),
            "T3" => Ok(Tier::T3),
            other => Err(LbError::Config(format!(
                "LB_CONFIG_TARGET must be one of T1, T2, T3, got: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_disjoint_blocks_of_ten() {
        assert_eq!(Tier::T1.ports(), 4000..4010);
        assert_eq!(Tier::T2.ports(), 5000..5010);
        assert_eq!(Tier::T3.ports(), 6000..6010);
    }

    #[test]
    fn parses_known_tiers() {
        assert_eq!("T1".parse::<Tier>().unwrap(), Tier::T1);
        assert_eq!("T2".parse::<Tier>().unwrap(), Tier::T2);
        assert_eq!("T3".parse::<Tier>().unwrap(), Tier::T3);
    }

    #[test]
    fn rejects_unknown_tier() {
        assert!("T9".parse::<Tier>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for tier in [Tier::T1, Tier::T2, Tier::T3] {
            assert_eq!(tier.to_string().parse::<Tier>().unwrap(), tier);
        }
    }
}
