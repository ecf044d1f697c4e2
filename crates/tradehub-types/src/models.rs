use serde::{Deserialize, Serialize};

/// The three kinds of account that can authenticate. Doubles as the
/// sender role on chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Seller,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Seller => "SELLER",
            Role::Buyer => "BUYER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "SELLER" => Some(Role::Seller),
            "BUYER" => Some(Role::Buyer),
            _ => None,
        }
    }
}

/// The super admin is seeded once and cannot be created, edited, or
/// deleted through the admin-management endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "SUPER_ADMIN",
            AdminRole::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUPER_ADMIN" => Some(AdminRole::SuperAdmin),
            "ADMIN" => Some(AdminRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Pending,
    Active,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "PENDING",
            ListingStatus::Active => "ACTIVE",
            ListingStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ListingStatus::Pending),
            "ACTIVE" => Some(ListingStatus::Active),
            "REJECTED" => Some(ListingStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RfqStatus {
    Pending,
    Forwarded,
    Approved,
    Rejected,
    Closed,
}

impl RfqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RfqStatus::Pending => "PENDING",
            RfqStatus::Forwarded => "FORWARDED",
            RfqStatus::Approved => "APPROVED",
            RfqStatus::Rejected => "REJECTED",
            RfqStatus::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RfqStatus::Pending),
            "FORWARDED" => Some(RfqStatus::Forwarded),
            "APPROVED" => Some(RfqStatus::Approved),
            "REJECTED" => Some(RfqStatus::Rejected),
            "CLOSED" => Some(RfqStatus::Closed),
            _ => None,
        }
    }
}

/// A SELLER room pairs an admin with a seller around a product listing.
/// A BUYER room pairs an admin with a buyer around an RFQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomKind {
    Seller,
    Buyer,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Seller => "SELLER",
            RoomKind::Buyer => "BUYER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SELLER" => Some(RoomKind::Seller),
            "BUYER" => Some(RoomKind::Buyer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Open,
    Closed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Open => "OPEN",
            RoomStatus::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(RoomStatus::Open),
            "CLOSED" => Some(RoomStatus::Closed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Seller, Role::Buyer] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("INTERN"), None);
    }

    #[test]
    fn rfq_status_round_trips_through_str() {
        for status in [
            RfqStatus::Pending,
            RfqStatus::Forwarded,
            RfqStatus::Approved,
            RfqStatus::Rejected,
            RfqStatus::Closed,
        ] {
            assert_eq!(RfqStatus::from_str(status.as_str()), Some(status));
        }
    }
}
