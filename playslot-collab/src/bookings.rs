use thiserror::Error;

use crate::{
    util::{parse_date, parse_time, ParseError},
    BookingData, BookingStatus, DatabaseError, NewBooking, PaymentStatus, SharedDatabase,
};

/// Creates bookings against venues and drives their status and
/// payment transitions
pub struct Bookings {
    db: SharedDatabase,
}

#[derive(Debug, Error)]
pub enum BookingError {
    /// The requested window is empty or runs backwards
    #[error("End time must be after start time")]
    InvalidTimeRange,
    #[error(transparent)]
    InvalidInput(#[from] ParseError),
    #[error("A booking cannot move from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A customer's request to reserve a venue for a time window. Dates
/// and times arrive as strings and are validated here.
#[derive(Debug)]
pub struct BookingRequest {
    pub user_id: String,
    pub venue_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub contact_phone: String,
}

impl Bookings {
    pub fn new(db: &SharedDatabase) -> Self {
        Self { db: db.clone() }
    }

    /// Creates a booking, pricing it from the venue's hourly rate and
    /// the requested duration. The store rejects the write if the
    /// window overlaps a live booking for the same venue and date, so
    /// two racing requests can't both reserve it.
    pub async fn create(&self, request: BookingRequest) -> Result<BookingData, BookingError> {
        let venue = self.db.venue_by_id(&request.venue_id).await?;

        let date = parse_date(&request.date)?;
        let start_time = parse_time(&request.start_time)?;
        let end_time = parse_time(&request.end_time)?;

        if end_time <= start_time {
            return Err(BookingError::InvalidTimeRange);
        }

        // Fractional hours are fine, 90 minutes is 1.5
        let duration_hours = (end_time - start_time).num_minutes() as f64 / 60.0;
        let total_price = duration_hours * venue.price_per_hour;

        self.db
            .create_booking(NewBooking {
                user_id: request.user_id,
                venue_id: request.venue_id,
                venue_name: venue.name,
                date,
                start_time,
                end_time,
                total_price,
                contact_phone: request.contact_phone,
            })
            .await
            .map_err(Into::into)
    }

    /// Moves a booking to a new status, if the transition is legal.
    /// The write is conditional on the status the decision was made
    /// against, so racing writers can't skip the table.
    pub async fn update_status(
        &self,
        booking_id: &str,
        new_status: BookingStatus,
    ) -> Result<BookingData, BookingError> {
        let booking = self.db.booking_by_id(booking_id).await?;

        if !booking.status.can_become(new_status) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: new_status,
            });
        }

        self.db
            .update_booking_status(booking_id, booking.status, new_status)
            .await
            .map_err(Into::into)
    }

    /// Records the outcome of a payment attempt. A completed payment
    /// also confirms the booking. The coupling is one-way, a failed
    /// payment never reverts a booking that's already confirmed.
    pub async fn record_payment(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        payment_id: &str,
    ) -> Result<BookingData, DatabaseError> {
        let confirm = payment_status == PaymentStatus::Completed;

        self.db
            .update_booking_payment(booking_id, payment_status, payment_id, confirm)
            .await
    }

    /// Lists a user's bookings, most recent date first. The
    /// "upcoming" bucket holds pending and confirmed bookings, any
    /// other bucket name selects the settled ones.
    pub async fn for_user(
        &self,
        user_id: &str,
        bucket: &str,
    ) -> Result<Vec<BookingData>, DatabaseError> {
        let statuses = if bucket == "upcoming" {
            &BookingStatus::UPCOMING
        } else {
            &BookingStatus::SETTLED
        };

        self.db.bookings_for_user(user_id, statuses).await
    }

    /// All bookings made against a venue, most recent date first
    pub async fn for_venue(&self, venue_id: &str) -> Result<Vec<BookingData>, DatabaseError> {
        self.db.bookings_for_venue(venue_id).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{Database, MemoryDatabase, NewVenue};

    async fn setup(price_per_hour: f64) -> (Bookings, SharedDatabase, String) {
        let db: SharedDatabase = Arc::new(MemoryDatabase::new());

        let venue = db
            .create_venue(NewVenue {
                owner_id: "owner".to_string(),
                name: "Northside Turf".to_string(),
                description: "5-a-side pitch".to_string(),
                location: "Northside".to_string(),
                address: "1 Pitch Lane".to_string(),
                categories: vec!["football".to_string()],
                amenities: vec![],
                price_per_hour,
                images: vec![],
            })
            .await
            .unwrap();

        (Bookings::new(&db), db, venue.id)
    }

    fn request(venue_id: &str, date: &str, start: &str, end: &str) -> BookingRequest {
        BookingRequest {
            user_id: "customer".to_string(),
            venue_id: venue_id.to_string(),
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            contact_phone: "555-0100".to_string(),
        }
    }

    #[tokio::test]
    async fn price_is_duration_times_hourly_rate() {
        let (bookings, _, venue_id) = setup(1500.0).await;

        let two_hours = bookings
            .create(request(&venue_id, "2025-06-01", "10:00", "12:00"))
            .await
            .unwrap();

        assert_eq!(two_hours.total_price, 3000.0);

        let half_hour = bookings
            .create(request(&venue_id, "2025-06-01", "14:00", "14:30"))
            .await
            .unwrap();

        assert_eq!(half_hour.total_price, 750.0);
    }

    #[tokio::test]
    async fn new_bookings_start_pending() {
        let (bookings, _, venue_id) = setup(800.0).await;

        let booking = bookings
            .create(request(&venue_id, "2025-06-01", "09:00", "10:30"))
            .await
            .unwrap();

        assert_eq!(booking.total_price, 1200.0);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.venue_name, "Northside Turf");
    }

    #[tokio::test]
    async fn backwards_windows_are_rejected_without_a_record() {
        let (bookings, db, venue_id) = setup(1000.0).await;

        let backwards = bookings
            .create(request(&venue_id, "2025-06-01", "12:00", "10:00"))
            .await;
        assert!(matches!(backwards, Err(BookingError::InvalidTimeRange)));

        let empty = bookings
            .create(request(&venue_id, "2025-06-01", "12:00", "12:00"))
            .await;
        assert!(matches!(empty, Err(BookingError::InvalidTimeRange)));

        let malformed = bookings
            .create(request(&venue_id, "2025-06-01", "noon", "13:00"))
            .await;
        assert!(matches!(malformed, Err(BookingError::InvalidInput(_))));

        let stored = db.bookings_for_venue(&venue_id).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn unknown_venues_are_rejected() {
        let (bookings, _, _) = setup(1000.0).await;

        let result = bookings
            .create(request("missing", "2025-06-01", "10:00", "11:00"))
            .await;

        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn overlapping_windows_cannot_both_be_booked() {
        let (bookings, _, venue_id) = setup(1000.0).await;

        bookings
            .create(request(&venue_id, "2025-06-01", "10:00", "12:00"))
            .await
            .unwrap();

        let overlapping = bookings
            .create(request(&venue_id, "2025-06-01", "11:00", "13:00"))
            .await;
        assert!(matches!(
            overlapping,
            Err(BookingError::Db(DatabaseError::Conflict { .. }))
        ));

        // Adjacent windows and other days are fine
        bookings
            .create(request(&venue_id, "2025-06-01", "12:00", "13:00"))
            .await
            .unwrap();
        bookings
            .create(request(&venue_id, "2025-06-02", "10:00", "12:00"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_claims_admit_exactly_one_winner() {
        let (bookings, _, venue_id) = setup(1000.0).await;
        let bookings = Arc::new(bookings);

        let a = {
            let bookings = bookings.clone();
            let req = request(&venue_id, "2025-06-01", "10:00", "12:00");
            tokio::spawn(async move { bookings.create(req).await })
        };
        let b = {
            let bookings = bookings.clone();
            let req = request(&venue_id, "2025-06-01", "11:00", "13:00");
            tokio::spawn(async move { bookings.create(req).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn only_legal_transitions_are_accepted() {
        let (bookings, _, venue_id) = setup(1000.0).await;

        let booking = bookings
            .create(request(&venue_id, "2025-06-01", "10:00", "11:00"))
            .await
            .unwrap();

        let skipped = bookings
            .update_status(&booking.id, BookingStatus::Completed)
            .await;
        assert!(matches!(
            skipped,
            Err(BookingError::InvalidTransition { .. })
        ));

        bookings
            .update_status(&booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();
        bookings
            .update_status(&booking.id, BookingStatus::Completed)
            .await
            .unwrap();

        // Completed is terminal
        let reopened = bookings
            .update_status(&booking.id, BookingStatus::Pending)
            .await;
        assert!(matches!(
            reopened,
            Err(BookingError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn completed_payment_confirms_the_booking() {
        let (bookings, _, venue_id) = setup(800.0).await;

        let booking = bookings
            .create(request(&venue_id, "2025-06-01", "09:00", "10:30"))
            .await
            .unwrap();

        let paid = bookings
            .record_payment(&booking.id, PaymentStatus::Completed, "pay_123")
            .await
            .unwrap();

        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(paid.payment_status, PaymentStatus::Completed);
        assert_eq!(paid.payment_id.as_deref(), Some("pay_123"));

        // The coupling is one-way. A later failure is recorded, but
        // the booking stays confirmed.
        let failed = bookings
            .record_payment(&booking.id, PaymentStatus::Failed, "pay_124")
            .await
            .unwrap();

        assert_eq!(failed.status, BookingStatus::Confirmed);
        assert_eq!(failed.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn buckets_split_live_and_settled_bookings() {
        let (bookings, _, venue_id) = setup(1000.0).await;

        let first = bookings
            .create(request(&venue_id, "2025-06-01", "10:00", "11:00"))
            .await
            .unwrap();
        let second = bookings
            .create(request(&venue_id, "2025-06-03", "10:00", "11:00"))
            .await
            .unwrap();
        let cancelled = bookings
            .create(request(&venue_id, "2025-06-02", "10:00", "11:00"))
            .await
            .unwrap();

        bookings
            .update_status(&cancelled.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let upcoming = bookings.for_user("customer", "upcoming").await.unwrap();
        let ids: Vec<_> = upcoming.iter().map(|b| b.id.as_str()).collect();

        // Most recent date first, cancelled excluded
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        let settled = bookings.for_user("customer", "past").await.unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].id, cancelled.id);
    }
}
