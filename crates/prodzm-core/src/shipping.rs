use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    Pending,
    Shipped,
    InTransit,
    Delivered,
}

impl ShippingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ShippingStatus::Pending => "pending",
            ShippingStatus::Shipped => "shipped",
            ShippingStatus::InTransit => "in_transit",
            ShippingStatus::Delivered => "delivered",
        }
    }

    /// Whether a shipment in this status has left the warehouse, so
    /// `shipped_at` should be stamped.
    #[must_use]
    pub fn has_shipped(self) -> bool {
        !matches!(self, ShippingStatus::Pending)
    }

    #[must_use]
    pub fn is_delivered(self) -> bool {
        self == ShippingStatus::Delivered
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ShippingStatus::Pending),
            "shipped" => Ok(ShippingStatus::Shipped),
            "in_transit" => Ok(ShippingStatus::InTransit),
            "delivered" => Ok(ShippingStatus::Delivered),
            other => Err(CoreError::InvalidShippingStatus(other.to_string())),
        }
    }
}
