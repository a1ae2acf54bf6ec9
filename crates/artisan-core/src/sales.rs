use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl SaleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Paid => "paid",
            SaleStatus::Shipped => "shipped",
            SaleStatus::Delivered => "delivered",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    /// Allowed moves: pending → paid | cancelled, paid → shipped | cancelled,
    /// shipped → delivered. Delivered and cancelled are terminal.
    #[must_use]
    pub fn can_transition_to(self, next: SaleStatus) -> bool {
        matches!(
            (self, next),
            (SaleStatus::Pending, SaleStatus::Paid | SaleStatus::Cancelled)
                | (SaleStatus::Paid, SaleStatus::Shipped | SaleStatus::Cancelled)
                | (SaleStatus::Shipped, SaleStatus::Delivered)
        )
    }

    /// Cancelling returns reserved stock to the catalog.
    #[must_use]
    pub fn restores_stock(self) -> bool {
        self == SaleStatus::Cancelled
    }

    /// Short human-readable line used for client notifications.
    #[must_use]
    pub fn notification_text(self) -> &'static str {
        match self {
            SaleStatus::Pending => "Your order was received.",
            SaleStatus::Paid => "Your payment was confirmed.",
            SaleStatus::Shipped => "Your order is on its way.",
            SaleStatus::Delivered => "Your order was delivered.",
            SaleStatus::Cancelled => "Your order was cancelled.",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SaleStatus::Pending),
            "paid" => Ok(SaleStatus::Paid),
            "shipped" => Ok(SaleStatus::Shipped),
            "delivered" => Ok(SaleStatus::Delivered),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(CoreError::InvalidSaleStatus(other.to_string())),
        }
    }
}
