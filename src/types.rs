use std::str::FromStr;
use serde::Deserialize;

/// Order in which queued change events are removed during a drain pass.
///
/// - `Lifo`: take the most recently queued event first (default). Events
///   queued before a drain pass are observed newest-to-oldest.
/// - `Fifo`: take events in arrival order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainOrder {
    #[default]
    Lifo,
    Fifo,
}

impl FromStr for DrainOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lifo" => Ok(DrainOrder::Lifo),
            "fifo" => Ok(DrainOrder::Fifo),
            other => Err(format!(
                "invalid drain_order: {other} (expected \"lifo\" or \"fifo\")"
            )),
        }
    }
}
