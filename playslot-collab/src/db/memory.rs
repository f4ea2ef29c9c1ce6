use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::util::random_string;
use crate::{
    BookingData, BookingStatus, Database, DatabaseError, DatabaseResult, NewBooking, NewReview,
    NewSession, NewSlot, NewUser, NewVenue, PaymentStatus, Result, ReviewData, SessionData,
    SlotData, SlotStatus, UpdatedVenue, UserData, VenueData, VenueSearch, RESULT_WINDOW,
};

/// Length of generated primary keys
const ID_LENGTH: usize = 24;

/// A session as stored, joined with its user on read
#[derive(Debug, Clone)]
struct StoredSession {
    user_id: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<String, UserData>,
    sessions: HashMap<String, StoredSession>,
    venues: HashMap<String, VenueData>,
    slots: HashMap<String, SlotData>,
    bookings: HashMap<String, BookingData>,
    reviews: HashMap<String, ReviewData>,
}

/// An in-memory database implementation for playslot.
///
/// Backs the test suite, and the server when no database url is
/// configured. A single lock guards all state, which makes the
/// booking claim and the rating increment trivially atomic.
#[derive(Default)]
pub struct MemoryDatabase {
    state: RwLock<State>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(resource: &'static str, identifier: &'static str) -> DatabaseError {
    DatabaseError::NotFound {
        resource,
        identifier,
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        self.state
            .read()
            .users
            .get(user_id)
            .cloned()
            .ok_or(not_found("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.state
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(not_found("user", "email"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.write();

        state
            .users
            .values()
            .find(|u| u.email == new_user.email)
            .map(|_| ())
            .ok_or(not_found("user", "email"))
            .conflict_or_ok("user", "email", &new_user.email)?;

        let user = UserData {
            id: random_string(ID_LENGTH),
            email: new_user.email,
            password: new_user.password,
            name: new_user.name,
            role: new_user.role,
            created_at: Utc::now(),
        };

        state.users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let state = self.state.read();

        let stored = state
            .sessions
            .get(token)
            .ok_or(not_found("session", "token"))?;

        let user = state
            .users
            .get(&stored.user_id)
            .cloned()
            .ok_or(not_found("user", "id"))?;

        Ok(SessionData {
            token: token.to_string(),
            user,
            expires_at: stored.expires_at,
            created_at: stored.created_at,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        {
            let mut state = self.state.write();

            state.sessions.insert(
                new_session.token.clone(),
                StoredSession {
                    user_id: new_session.user_id,
                    expires_at: new_session.expires_at,
                    created_at: Utc::now(),
                },
            );
        }

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        self.state.write().sessions.remove(token);
        Ok(())
    }

    async fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<()> {
        self.state
            .write()
            .sessions
            .retain(|_, s| s.expires_at > now);

        Ok(())
    }

    async fn venue_by_id(&self, venue_id: &str) -> Result<VenueData> {
        self.state
            .read()
            .venues
            .get(venue_id)
            .cloned()
            .ok_or(not_found("venue", "id"))
    }

    async fn create_venue(&self, new_venue: NewVenue) -> Result<VenueData> {
        let venue = VenueData {
            id: random_string(ID_LENGTH),
            owner_id: new_venue.owner_id,
            name: new_venue.name,
            description: new_venue.description,
            location: new_venue.location,
            address: new_venue.address,
            categories: new_venue.categories,
            amenities: new_venue.amenities,
            price_per_hour: new_venue.price_per_hour,
            images: new_venue.images,
            rating: 0.0,
            rating_sum: 0.0,
            total_reviews: 0,
            created_at: Utc::now(),
        };

        self.state
            .write()
            .venues
            .insert(venue.id.clone(), venue.clone());

        Ok(venue)
    }

    async fn update_venue(&self, updated_venue: UpdatedVenue) -> Result<VenueData> {
        let mut state = self.state.write();

        let venue = state
            .venues
            .get_mut(&updated_venue.id)
            .ok_or(not_found("venue", "id"))?;

        venue.name = updated_venue.name;
        venue.description = updated_venue.description;
        venue.location = updated_venue.location;
        venue.address = updated_venue.address;
        venue.categories = updated_venue.categories;
        venue.amenities = updated_venue.amenities;
        venue.price_per_hour = updated_venue.price_per_hour;
        venue.images = updated_venue.images;

        Ok(venue.clone())
    }

    async fn venues_by_owner(&self, owner_id: &str) -> Result<Vec<VenueData>> {
        Ok(self
            .state
            .read()
            .venues
            .values()
            .filter(|v| v.owner_id == owner_id)
            .take(RESULT_WINDOW)
            .cloned()
            .collect())
    }

    async fn search_venues(&self, search: VenueSearch) -> Result<Vec<VenueData>> {
        let location = search.location.as_deref().map(str::to_lowercase);

        Ok(self
            .state
            .read()
            .venues
            .values()
            .filter(|v| match &search.category {
                Some(category) => v.categories.iter().any(|c| c == category),
                None => true,
            })
            .filter(|v| match &location {
                Some(location) => v.location.to_lowercase().contains(location),
                None => true,
            })
            .take(RESULT_WINDOW)
            .cloned()
            .collect())
    }

    async fn apply_review_to_venue(&self, venue_id: &str, rating: f64) -> Result<VenueData> {
        let mut state = self.state.write();

        let venue = state
            .venues
            .get_mut(venue_id)
            .ok_or(not_found("venue", "id"))?;

        venue.rating_sum += rating;
        venue.total_reviews += 1;
        venue.rating = venue.rating_sum / venue.total_reviews as f64;

        Ok(venue.clone())
    }

    async fn set_venue_rating(
        &self,
        venue_id: &str,
        rating_sum: f64,
        total_reviews: i64,
    ) -> Result<VenueData> {
        let mut state = self.state.write();

        let venue = state
            .venues
            .get_mut(venue_id)
            .ok_or(not_found("venue", "id"))?;

        venue.rating_sum = rating_sum;
        venue.total_reviews = total_reviews;
        venue.rating = if total_reviews == 0 {
            0.0
        } else {
            rating_sum / total_reviews as f64
        };

        Ok(venue.clone())
    }

    async fn slot_by_id(&self, slot_id: &str) -> Result<SlotData> {
        self.state
            .read()
            .slots
            .get(slot_id)
            .cloned()
            .ok_or(not_found("slot", "id"))
    }

    async fn create_slot(&self, new_slot: NewSlot) -> Result<SlotData> {
        let slot = SlotData {
            id: random_string(ID_LENGTH),
            venue_id: new_slot.venue_id,
            date: new_slot.date,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            status: SlotStatus::Available,
            created_at: Utc::now(),
        };

        self.state.write().slots.insert(slot.id.clone(), slot.clone());

        Ok(slot)
    }

    async fn available_slots(&self, venue_id: &str, date: NaiveDate) -> Result<Vec<SlotData>> {
        Ok(self
            .state
            .read()
            .slots
            .values()
            .filter(|s| {
                s.venue_id == venue_id && s.date == date && s.status == SlotStatus::Available
            })
            .take(RESULT_WINDOW)
            .cloned()
            .collect())
    }

    async fn update_slot_status(
        &self,
        slot_id: &str,
        expected: SlotStatus,
        new_status: SlotStatus,
    ) -> Result<SlotData> {
        let mut state = self.state.write();

        let slot = state.slots.get_mut(slot_id).ok_or(not_found("slot", "id"))?;

        if slot.status != expected {
            return Err(DatabaseError::Conflict {
                resource: "slot",
                field: "status",
                value: expected.as_str().to_string(),
            });
        }

        slot.status = new_status;

        Ok(slot.clone())
    }

    async fn booking_by_id(&self, booking_id: &str) -> Result<BookingData> {
        self.state
            .read()
            .bookings
            .get(booking_id)
            .cloned()
            .ok_or(not_found("booking", "id"))
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let mut state = self.state.write();

        if !state.venues.contains_key(&new_booking.venue_id) {
            return Err(not_found("venue", "id"));
        }

        let overlaps = state.bookings.values().any(|b| {
            b.venue_id == new_booking.venue_id
                && b.date == new_booking.date
                && BookingStatus::UPCOMING.contains(&b.status)
                && b.start_time < new_booking.end_time
                && b.end_time > new_booking.start_time
        });

        if overlaps {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "time range",
                value: format!(
                    "{} {}-{}",
                    new_booking.date, new_booking.start_time, new_booking.end_time
                ),
            });
        }

        let booking = BookingData {
            id: random_string(ID_LENGTH),
            user_id: new_booking.user_id,
            venue_id: new_booking.venue_id,
            venue_name: new_booking.venue_name,
            date: new_booking.date,
            start_time: new_booking.start_time,
            end_time: new_booking.end_time,
            total_price: new_booking.total_price,
            contact_phone: new_booking.contact_phone,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            created_at: Utc::now(),
        };

        state.bookings.insert(booking.id.clone(), booking.clone());

        Ok(booking)
    }

    async fn bookings_for_user(
        &self,
        user_id: &str,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingData>> {
        let mut bookings: Vec<_> = self
            .state
            .read()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id && statuses.contains(&b.status))
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.date.cmp(&a.date));
        bookings.truncate(RESULT_WINDOW);

        Ok(bookings)
    }

    async fn bookings_for_venue(&self, venue_id: &str) -> Result<Vec<BookingData>> {
        let mut bookings: Vec<_> = self
            .state
            .read()
            .bookings
            .values()
            .filter(|b| b.venue_id == venue_id)
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.date.cmp(&a.date));
        bookings.truncate(RESULT_WINDOW);

        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        expected: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<BookingData> {
        let mut state = self.state.write();

        let booking = state
            .bookings
            .get_mut(booking_id)
            .ok_or(not_found("booking", "id"))?;

        if booking.status != expected {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "status",
                value: expected.as_str().to_string(),
            });
        }

        booking.status = new_status;

        Ok(booking.clone())
    }

    async fn update_booking_payment(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        payment_id: &str,
        confirm: bool,
    ) -> Result<BookingData> {
        let mut state = self.state.write();

        let booking = state
            .bookings
            .get_mut(booking_id)
            .ok_or(not_found("booking", "id"))?;

        booking.payment_status = payment_status;
        booking.payment_id = Some(payment_id.to_string());

        if confirm {
            booking.status = BookingStatus::Confirmed;
        }

        Ok(booking.clone())
    }

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData> {
        let review = ReviewData {
            id: random_string(ID_LENGTH),
            user_id: new_review.user_id,
            venue_id: new_review.venue_id,
            rating: new_review.rating,
            comment: new_review.comment,
            created_at: Utc::now(),
        };

        self.state
            .write()
            .reviews
            .insert(review.id.clone(), review.clone());

        Ok(review)
    }

    async fn reviews_for_venue(&self, venue_id: &str) -> Result<Vec<ReviewData>> {
        let mut reviews: Vec<_> = self
            .state
            .read()
            .reviews
            .values()
            .filter(|r| r.venue_id == venue_id)
            .cloned()
            .collect();

        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews.truncate(RESULT_WINDOW);

        Ok(reviews)
    }

    async fn review_totals(&self, venue_id: &str) -> Result<(f64, i64)> {
        let state = self.state.read();

        let totals = state
            .reviews
            .values()
            .filter(|r| r.venue_id == venue_id)
            .fold((0.0, 0), |(sum, count), r| (sum + r.rating, count + 1));

        Ok(totals)
    }
}
