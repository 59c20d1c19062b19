//! Status and role enums.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pickup status of a submitted order.
///
/// Orders are created `Paid` and only ever move forward one step at a time:
/// `Paid -> Printed -> Collected`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Paid,
    Printed,
    Collected,
}

impl OrderStatus {
    /// The next status in the pickup flow, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Paid => Some(Self::Printed),
            Self::Printed => Some(Self::Collected),
            Self::Collected => None,
        }
    }

    /// Whether moving from `self` to `target` is a single forward step.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Whether the order still needs vendor attention.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Collected)
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Printed => "printed",
            Self::Collected => "collected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "printed" => Ok(Self::Printed),
            "collected" => Ok(Self::Collected),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Account role, chosen at registration and sent with every login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Places orders and picks them up.
    #[default]
    Student,
    /// Works the print queue: prints, verifies OTPs, hands orders over.
    Vendor,
    /// Read access to users and all orders.
    Admin,
}

impl Role {
    /// Whether this role sees every order rather than only its own.
    #[must_use]
    pub const fn sees_all_orders(self) -> bool {
        matches!(self, Self::Vendor | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Vendor => write!(f, "vendor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_one_step() {
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Printed));
        assert!(OrderStatus::Printed.can_transition_to(OrderStatus::Collected));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Collected));
        assert!(!OrderStatus::Printed.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Collected.can_transition_to(OrderStatus::Collected));
        assert_eq!(OrderStatus::Collected.next(), None);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Printed).ok().as_deref(),
            Some("\"printed\"")
        );
        assert_eq!("collected".parse(), Ok(OrderStatus::Collected));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Student, Role::Vendor, Role::Admin] {
            assert_eq!(role.to_string().parse(), Ok(role));
        }
        assert!(Role::Vendor.sees_all_orders());
        assert!(!Role::Student.sees_all_orders());
    }
}
