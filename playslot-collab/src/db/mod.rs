use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type SharedDatabase = Arc<dyn Database>;

/// Listing operations return at most this many records
pub const RESULT_WINDOW: usize = 100;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and store playslot data.
///
/// Every write is a single record mutation, so the implementation's
/// native atomicity is the only synchronization point. The two
/// operations that need more than that, the booking overlap claim in
/// [`Database::create_booking`] and the rating increment in
/// [`Database::apply_review_to_venue`], must each happen atomically
/// within the implementation.
#[async_trait]
pub trait Database: Send + Sync {
    async fn user_by_id(&self, user_id: &str) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    /// Deleting an absent session is a no-op
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<()>;

    async fn venue_by_id(&self, venue_id: &str) -> Result<VenueData>;
    async fn create_venue(&self, new_venue: NewVenue) -> Result<VenueData>;
    async fn update_venue(&self, updated_venue: UpdatedVenue) -> Result<VenueData>;
    async fn venues_by_owner(&self, owner_id: &str) -> Result<Vec<VenueData>>;
    async fn search_venues(&self, search: VenueSearch) -> Result<Vec<VenueData>>;
    /// Folds one review rating into the venue aggregate as a single
    /// atomic increment of (rating_sum, total_reviews)
    async fn apply_review_to_venue(&self, venue_id: &str, rating: f64) -> Result<VenueData>;
    /// Overwrites the venue aggregate wholesale. Repair path only.
    async fn set_venue_rating(
        &self,
        venue_id: &str,
        rating_sum: f64,
        total_reviews: i64,
    ) -> Result<VenueData>;

    async fn slot_by_id(&self, slot_id: &str) -> Result<SlotData>;
    async fn create_slot(&self, new_slot: NewSlot) -> Result<SlotData>;
    async fn available_slots(&self, venue_id: &str, date: NaiveDate) -> Result<Vec<SlotData>>;
    /// Compare-and-set on the slot status. Fails with a conflict if
    /// the stored status is no longer `expected`.
    async fn update_slot_status(
        &self,
        slot_id: &str,
        expected: SlotStatus,
        new_status: SlotStatus,
    ) -> Result<SlotData>;

    async fn booking_by_id(&self, booking_id: &str) -> Result<BookingData>;
    /// Claims the booking's time window. Fails with a conflict if any
    /// pending or confirmed booking for the same venue and date
    /// overlaps the requested range.
    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData>;
    /// Bookings for a user whose status is one of `statuses`, most
    /// recent date first
    async fn bookings_for_user(
        &self,
        user_id: &str,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingData>>;
    async fn bookings_for_venue(&self, venue_id: &str) -> Result<Vec<BookingData>>;
    /// Compare-and-set on the booking status, like
    /// [`Database::update_slot_status`]
    async fn update_booking_status(
        &self,
        booking_id: &str,
        expected: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<BookingData>;
    /// Records the payment fields, and confirms the booking in the
    /// same write when `confirm` is set
    async fn update_booking_payment(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        payment_id: &str,
        confirm: bool,
    ) -> Result<BookingData>;

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData>;
    /// Reviews for a venue, newest first
    async fn reviews_for_venue(&self, venue_id: &str) -> Result<Vec<ReviewData>>;
    /// The (rating sum, review count) pair over every review of a
    /// venue, scanned from the reviews themselves
    async fn review_totals(&self, venue_id: &str) -> Result<(f64, i64)>;
}

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    /// Already hashed by the time it reaches the store
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewVenue {
    pub owner_id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub location: String,
    pub address: String,
    pub categories: Vec<String>,
    pub amenities: Vec<String>,
    pub price_per_hour: f64,
    pub images: Vec<String>,
}

/// A full replacement of a venue's listed fields. The rating
/// aggregate is owned by the review flow and is left untouched.
#[derive(Debug)]
pub struct UpdatedVenue {
    pub id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub location: String,
    pub address: String,
    pub categories: Vec<String>,
    pub amenities: Vec<String>,
    pub price_per_hour: f64,
    pub images: Vec<String>,
}

#[derive(Debug, Default)]
pub struct VenueSearch {
    /// Exact membership in the venue's categories
    pub category: Option<String>,
    /// Case-insensitive substring of the venue's location
    pub location: Option<String>,
}

#[derive(Debug)]
pub struct NewSlot {
    pub venue_id: PrimaryKey,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug)]
pub struct NewBooking {
    pub user_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub venue_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_price: f64,
    pub contact_phone: String,
}

#[derive(Debug)]
pub struct NewReview {
    pub user_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub rating: f64,
    pub comment: String,
}
