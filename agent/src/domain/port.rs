//! Host port selection for source deployments.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer};

/// Range scanned when a deployment asks for an automatically assigned port.
pub const AUTO_PORT_RANGE: RangeInclusive<u16> = 8001..=9000;

/// Port value the control plane sends to mean "pick one for me".
pub const AUTO_PORT_SENTINEL: u16 = 8000;

/// Port requested by a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortRequest {
    #[default]
    Auto,
    Fixed(u16),
}

impl PortRequest {
    /// Absent, `0` and [`AUTO_PORT_SENTINEL`] all request auto-assignment.
    #[must_use]
    pub fn from_wire(port: Option<u16>) -> Self {
        match port {
            None | Some(0 | AUTO_PORT_SENTINEL) => Self::Auto,
            Some(p) => Self::Fixed(p),
        }
    }
}

impl<'de> Deserialize<'de> for PortRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<u16>::deserialize(deserializer).map(Self::from_wire)
    }
}

/// Lowest port in `range` that is neither in `used` nor rejected by
/// `is_bindable`. Falls back to the range's lower bound when exhausted.
pub fn select_port(
    range: RangeInclusive<u16>,
    used: &HashSet<u16>,
    mut is_bindable: impl FnMut(u16) -> bool,
) -> u16 {
    let floor = *range.start();
    range
        .filter(|p| !used.contains(p))
        .find(|p| is_bindable(*p))
        .unwrap_or(floor)
}
