use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::info;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, FromRow, PgPool};

use crate::util::random_string;
use crate::{
    BookingData, BookingStatus, Database, DatabaseError, DatabaseResult, IntoDatabaseError,
    NewBooking, NewReview, NewSession, NewSlot, NewUser, NewVenue, PaymentStatus, Result,
    ReviewData, SessionData, SlotData, SlotStatus, UpdatedVenue, UserData, VenueData, VenueSearch,
    RESULT_WINDOW,
};

/// Length of generated primary keys
const ID_LENGTH: usize = 24;

/// A postgres database implementation for playslot
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    password: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    user_id: String,
    email: String,
    password: String,
    name: String,
    role: String,
    user_created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct VenueRow {
    id: String,
    owner_id: String,
    name: String,
    description: String,
    location: String,
    address: String,
    categories: Vec<String>,
    amenities: Vec<String>,
    price_per_hour: f64,
    images: Vec<String>,
    rating: f64,
    rating_sum: f64,
    total_reviews: i64,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SlotRow {
    id: String,
    venue_id: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct BookingRow {
    id: String,
    user_id: String,
    venue_id: String,
    venue_name: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    total_price: f64,
    contact_phone: String,
    status: String,
    payment_status: String,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ReviewRow {
    id: String,
    user_id: String,
    venue_id: String,
    rating: f64,
    comment: String,
    created_at: DateTime<Utc>,
}

/// A stored status string no longer parsing means the row was
/// corrupted outside the application. Surfaced as internal.
fn parse_stored<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e: T::Err| DatabaseError::Internal(Box::new(e)))
}

impl TryFrom<UserRow> for UserData {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            email: row.email,
            password: row.password,
            name: row.name,
            role: parse_stored(&row.role)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<SessionRow> for SessionData {
    type Error = DatabaseError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Self {
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
            user: UserData {
                id: row.user_id,
                email: row.email,
                password: row.password,
                name: row.name,
                role: parse_stored(&row.role)?,
                created_at: row.user_created_at,
            },
        })
    }
}

impl From<VenueRow> for VenueData {
    fn from(row: VenueRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            location: row.location,
            address: row.address,
            categories: row.categories,
            amenities: row.amenities,
            price_per_hour: row.price_per_hour,
            images: row.images,
            rating: row.rating,
            rating_sum: row.rating_sum,
            total_reviews: row.total_reviews,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<SlotRow> for SlotData {
    type Error = DatabaseError;

    fn try_from(row: SlotRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            venue_id: row.venue_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: parse_stored(&row.status)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<BookingRow> for BookingData {
    type Error = DatabaseError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            venue_id: row.venue_id,
            venue_name: row.venue_name,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            total_price: row.total_price,
            contact_phone: row.contact_phone,
            status: parse_stored(&row.status)?,
            payment_status: parse_stored(&row.payment_status)?,
            payment_id: row.payment_id,
            created_at: row.created_at,
        })
    }
}

impl From<ReviewRow> for ReviewData {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            venue_id: row.venue_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

const SESSION_QUERY: &str = "
    SELECT
        sessions.token,
        sessions.expires_at,
        sessions.created_at,
        users.id AS user_id,
        users.email,
        users.password,
        users.name,
        users.role,
        users.created_at AS user_created_at
    FROM sessions
        INNER JOIN users ON sessions.user_id = users.id
    WHERE token = $1";

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?
            .try_into()
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))?
            .try_into()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, password, name, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(random_string(ID_LENGTH))
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(SESSION_QUERY)
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "token"))?
            .try_into()
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let token: (String,) = sqlx::query_as(
            "INSERT INTO sessions (token, user_id, expires_at, created_at)
             VALUES ($1, $2, $3, $4) RETURNING token",
        )
        .bind(&new_session.token)
        .bind(&new_session.user_id)
        .bind(new_session.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.session_by_token(&token.0).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn venue_by_id(&self, venue_id: &str) -> Result<VenueData> {
        sqlx::query_as::<_, VenueRow>("SELECT * FROM venues WHERE id = $1")
            .bind(venue_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("venue", "id"))
            .map(Into::into)
    }

    async fn create_venue(&self, new_venue: NewVenue) -> Result<VenueData> {
        sqlx::query_as::<_, VenueRow>(
            "INSERT INTO venues
                (id, owner_id, name, description, location, address,
                 categories, amenities, price_per_hour, images,
                 rating, rating_sum, total_reviews, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, 0, 0, $11)
             RETURNING *",
        )
        .bind(random_string(ID_LENGTH))
        .bind(&new_venue.owner_id)
        .bind(&new_venue.name)
        .bind(&new_venue.description)
        .bind(&new_venue.location)
        .bind(&new_venue.address)
        .bind(&new_venue.categories)
        .bind(&new_venue.amenities)
        .bind(new_venue.price_per_hour)
        .bind(&new_venue.images)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(Into::into)
    }

    async fn update_venue(&self, updated_venue: UpdatedVenue) -> Result<VenueData> {
        sqlx::query_as::<_, VenueRow>(
            "UPDATE venues SET
                name = $1,
                description = $2,
                location = $3,
                address = $4,
                categories = $5,
                amenities = $6,
                price_per_hour = $7,
                images = $8
             WHERE id = $9 RETURNING *",
        )
        .bind(&updated_venue.name)
        .bind(&updated_venue.description)
        .bind(&updated_venue.location)
        .bind(&updated_venue.address)
        .bind(&updated_venue.categories)
        .bind(&updated_venue.amenities)
        .bind(updated_venue.price_per_hour)
        .bind(&updated_venue.images)
        .bind(&updated_venue.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("venue", "id"))
        .map(Into::into)
    }

    async fn venues_by_owner(&self, owner_id: &str) -> Result<Vec<VenueData>> {
        let rows = sqlx::query_as::<_, VenueRow>(
            "SELECT * FROM venues WHERE owner_id = $1 LIMIT $2",
        )
        .bind(owner_id)
        .bind(RESULT_WINDOW as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_venues(&self, search: VenueSearch) -> Result<Vec<VenueData>> {
        let rows = sqlx::query_as::<_, VenueRow>(
            "SELECT * FROM venues
             WHERE ($1::text IS NULL OR $1 = ANY(categories))
               AND ($2::text IS NULL OR location ILIKE '%' || $2 || '%')
             LIMIT $3",
        )
        .bind(&search.category)
        .bind(&search.location)
        .bind(RESULT_WINDOW as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_review_to_venue(&self, venue_id: &str, rating: f64) -> Result<VenueData> {
        sqlx::query_as::<_, VenueRow>(
            "UPDATE venues SET
                rating_sum = rating_sum + $1,
                total_reviews = total_reviews + 1,
                rating = (rating_sum + $1) / (total_reviews + 1)
             WHERE id = $2 RETURNING *",
        )
        .bind(rating)
        .bind(venue_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("venue", "id"))
        .map(Into::into)
    }

    async fn set_venue_rating(
        &self,
        venue_id: &str,
        rating_sum: f64,
        total_reviews: i64,
    ) -> Result<VenueData> {
        sqlx::query_as::<_, VenueRow>(
            "UPDATE venues SET
                rating_sum = $1,
                total_reviews = $2,
                rating = CASE WHEN $2 = 0 THEN 0 ELSE $1 / $2 END
             WHERE id = $3 RETURNING *",
        )
        .bind(rating_sum)
        .bind(total_reviews)
        .bind(venue_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("venue", "id"))
        .map(Into::into)
    }

    async fn slot_by_id(&self, slot_id: &str) -> Result<SlotData> {
        sqlx::query_as::<_, SlotRow>("SELECT * FROM slots WHERE id = $1")
            .bind(slot_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("slot", "id"))?
            .try_into()
    }

    async fn create_slot(&self, new_slot: NewSlot) -> Result<SlotData> {
        sqlx::query_as::<_, SlotRow>(
            "INSERT INTO slots (id, venue_id, date, start_time, end_time, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(random_string(ID_LENGTH))
        .bind(&new_slot.venue_id)
        .bind(new_slot.date)
        .bind(new_slot.start_time)
        .bind(new_slot.end_time)
        .bind(SlotStatus::Available.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn available_slots(&self, venue_id: &str, date: NaiveDate) -> Result<Vec<SlotData>> {
        let rows = sqlx::query_as::<_, SlotRow>(
            "SELECT * FROM slots
             WHERE venue_id = $1 AND date = $2 AND status = $3
             LIMIT $4",
        )
        .bind(venue_id)
        .bind(date)
        .bind(SlotStatus::Available.as_str())
        .bind(RESULT_WINDOW as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_slot_status(
        &self,
        slot_id: &str,
        expected: SlotStatus,
        new_status: SlotStatus,
    ) -> Result<SlotData> {
        let row = sqlx::query_as::<_, SlotRow>(
            "UPDATE slots SET status = $1 WHERE id = $2 AND status = $3 RETURNING *",
        )
        .bind(new_status.as_str())
        .bind(slot_id)
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        match row {
            Some(row) => row.try_into(),
            // Either the slot is gone or a concurrent writer moved it
            None => {
                let _ = self.slot_by_id(slot_id).await?;

                Err(DatabaseError::Conflict {
                    resource: "slot",
                    field: "status",
                    value: expected.as_str().to_string(),
                })
            }
        }
    }

    async fn booking_by_id(&self, booking_id: &str) -> Result<BookingData> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("booking", "id"))?
            .try_into()
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Lock the venue row so concurrent claims for the same venue
        // serialize on it
        sqlx::query("SELECT id FROM venues WHERE id = $1 FOR UPDATE")
            .bind(&new_booking.venue_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.not_found_or("venue", "id"))?;

        let overlapping: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings
             WHERE venue_id = $1 AND date = $2
               AND status = ANY($3)
               AND start_time < $4 AND end_time > $5",
        )
        .bind(&new_booking.venue_id)
        .bind(new_booking.date)
        .bind(status_strings(&BookingStatus::UPCOMING))
        .bind(new_booking.end_time)
        .bind(new_booking.start_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        if overlapping > 0 {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "time range",
                value: format!(
                    "{} {}-{}",
                    new_booking.date, new_booking.start_time, new_booking.end_time
                ),
            });
        }

        let row = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO bookings
                (id, user_id, venue_id, venue_name, date, start_time, end_time,
                 total_price, contact_phone, status, payment_status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(random_string(ID_LENGTH))
        .bind(&new_booking.user_id)
        .bind(&new_booking.venue_id)
        .bind(&new_booking.venue_name)
        .bind(new_booking.date)
        .bind(new_booking.start_time)
        .bind(new_booking.end_time)
        .bind(new_booking.total_price)
        .bind(&new_booking.contact_phone)
        .bind(BookingStatus::Pending.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        row.try_into()
    }

    async fn bookings_for_user(
        &self,
        user_id: &str,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingData>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings
             WHERE user_id = $1 AND status = ANY($2)
             ORDER BY date DESC
             LIMIT $3",
        )
        .bind(user_id)
        .bind(status_strings(statuses))
        .bind(RESULT_WINDOW as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn bookings_for_venue(&self, venue_id: &str) -> Result<Vec<BookingData>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings
             WHERE venue_id = $1
             ORDER BY date DESC
             LIMIT $2",
        )
        .bind(venue_id)
        .bind(RESULT_WINDOW as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        expected: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<BookingData> {
        let row = sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET status = $1 WHERE id = $2 AND status = $3 RETURNING *",
        )
        .bind(new_status.as_str())
        .bind(booking_id)
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let _ = self.booking_by_id(booking_id).await?;

                Err(DatabaseError::Conflict {
                    resource: "booking",
                    field: "status",
                    value: expected.as_str().to_string(),
                })
            }
        }
    }

    async fn update_booking_payment(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        payment_id: &str,
        confirm: bool,
    ) -> Result<BookingData> {
        sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET
                payment_status = $1,
                payment_id = $2,
                status = CASE WHEN $3 THEN $4 ELSE status END
             WHERE id = $5 RETURNING *",
        )
        .bind(payment_status.as_str())
        .bind(payment_id)
        .bind(confirm)
        .bind(BookingStatus::Confirmed.as_str())
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("booking", "id"))?
        .try_into()
    }

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData> {
        sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO reviews (id, user_id, venue_id, rating, comment, created_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(random_string(ID_LENGTH))
        .bind(&new_review.user_id)
        .bind(&new_review.venue_id)
        .bind(new_review.rating)
        .bind(&new_review.comment)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(Into::into)
    }

    async fn reviews_for_venue(&self, venue_id: &str) -> Result<Vec<ReviewData>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT * FROM reviews
             WHERE venue_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(venue_id)
        .bind(RESULT_WINDOW as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn review_totals(&self, venue_id: &str) -> Result<(f64, i64)> {
        sqlx::query_as::<_, (f64, i64)>(
            "SELECT COALESCE(SUM(rating), 0), COUNT(*) FROM reviews WHERE venue_id = $1",
        )
        .bind(venue_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }
}

fn status_strings(statuses: &[BookingStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
