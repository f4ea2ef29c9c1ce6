use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

/// The type used for primary keys in the database.
///
/// Keys are opaque random strings, so nothing about a key implies
/// ordering or lets a client guess a neighboring record.
pub type PrimaryKey = String;

/// Raised when a status value from the outside doesn't parse
#[derive(Debug, Error)]
#[error("{value} is not a valid {kind}")]
pub struct InvalidStatus {
    pub value: String,
    pub kind: &'static str,
}

/// A playslot account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    /// Unique per user, stored case-sensitively
    pub email: String,
    /// The argon2 hash, never serialized out of the server
    pub password: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Customer,
    Owner,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserData,
    /// The session is invalid once this instant has passed
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A bookable venue listed by an owner
#[derive(Debug, Clone)]
pub struct VenueData {
    pub id: PrimaryKey,
    /// References a user with the owner role. Advisory only, not
    /// enforced by the store.
    pub owner_id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub location: String,
    pub address: String,
    pub categories: Vec<String>,
    pub amenities: Vec<String>,
    pub price_per_hour: f64,
    pub images: Vec<String>,
    /// Mean of all review ratings, or 0 with no reviews
    pub rating: f64,
    /// Running sum of review ratings backing `rating`
    pub rating_sum: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
}

/// An advertised time window for a venue. Capacity marker only, a
/// booking is a separate record.
#[derive(Debug, Clone)]
pub struct SlotData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
}

/// A customer's reservation of a venue for a time window
#[derive(Debug, Clone)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    /// Snapshot of the venue name at booking time, not updated if
    /// the venue is renamed later
    pub venue_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_price: f64,
    pub contact_phone: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Opaque reference into the external payment system, set once
    /// a payment is recorded
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// A customer's review of a venue. Immutable once created.
#[derive(Debug, Clone)]
pub struct ReviewData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub rating: f64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Owner => "owner",
        }
    }
}

impl FromStr for UserRole {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "customer" => Ok(Self::Customer),
            "owner" => Ok(Self::Owner),
            other => Err(InvalidStatus {
                value: other.to_string(),
                kind: "role",
            }),
        }
    }
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Blocked => "blocked",
        }
    }

    /// Returns true if a slot may move from this status to `next`
    pub fn can_become(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Available, Self::Booked)
                | (Self::Available, Self::Blocked)
                | (Self::Booked, Self::Available)
                | (Self::Blocked, Self::Available)
        )
    }
}

impl FromStr for SlotStatus {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            "blocked" => Ok(Self::Blocked),
            other => Err(InvalidStatus {
                value: other.to_string(),
                kind: "slot status",
            }),
        }
    }
}

impl BookingStatus {
    /// The statuses a booking can be in before its time window
    pub const UPCOMING: [Self; 2] = [Self::Pending, Self::Confirmed];
    /// The statuses a booking settles into
    pub const SETTLED: [Self; 2] = [Self::Cancelled, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Returns true if a booking may move from this status to `next`.
    /// Cancelled and completed are terminal.
    pub fn can_become(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
        )
    }
}

impl FromStr for BookingStatus {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(InvalidStatus {
                value: other.to_string(),
                kind: "booking status",
            }),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(InvalidStatus {
                value: other.to_string(),
                kind: "payment status",
            }),
        }
    }
}
