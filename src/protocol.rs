use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

/// The ERDDAP data access protocol for a dataset.
///
/// Griddap datasets are multidimensional arrays indexed by coordinate
/// variables (time, depth, latitude, longitude); tabledap datasets are
/// row-oriented tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Griddap,
    Tabledap,
}

impl Protocol {
    /// URL path segment for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Griddap => "griddap",
            Protocol::Tabledap => "tabledap",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "griddap" => Ok(Protocol::Griddap),
            "tabledap" => Ok(Protocol::Tabledap),
            other => Err(anyhow!(
                "invalid ERDDAP protocol [{other}]; valid protocols are \"griddap\" and \"tabledap\""
            )),
        }
    }
}
