//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from collab data

use playslot_collab::{BookingData, ReviewData, SessionData, SlotData, UserData, VenueData};
use serde::Serialize;
use utoipa::ToSchema;

/// Format of calendar dates in responses
const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format of times of day in responses
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: String,
    email: String,
    name: String,
    role: &'static str,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Venue {
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
    total_reviews: i64,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Slot {
    id: String,
    venue_id: String,
    date: String,
    start_time: String,
    end_time: String,
    status: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Booking {
    id: String,
    user_id: String,
    venue_id: String,
    venue_name: String,
    date: String,
    start_time: String,
    end_time: String,
    total_price: f64,
    contact_phone: String,
    status: &'static str,
    payment_status: &'static str,
    payment_id: Option<String>,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Review {
    id: String,
    user_id: String,
    venue_id: String,
    rating: f64,
    comment: String,
    created_at: String,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.as_str(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl ToSerialized<AuthResult> for SessionData {
    fn to_serialized(&self) -> AuthResult {
        AuthResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Venue> for VenueData {
    fn to_serialized(&self) -> Venue {
        Venue {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            address: self.address.clone(),
            categories: self.categories.clone(),
            amenities: self.amenities.clone(),
            price_per_hour: self.price_per_hour,
            images: self.images.clone(),
            rating: self.rating,
            total_reviews: self.total_reviews,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl ToSerialized<Slot> for SlotData {
    fn to_serialized(&self) -> Slot {
        Slot {
            id: self.id.clone(),
            venue_id: self.venue_id.clone(),
            date: self.date.format(DATE_FORMAT).to_string(),
            start_time: self.start_time.format(TIME_FORMAT).to_string(),
            end_time: self.end_time.format(TIME_FORMAT).to_string(),
            status: self.status.as_str(),
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            venue_id: self.venue_id.clone(),
            venue_name: self.venue_name.clone(),
            date: self.date.format(DATE_FORMAT).to_string(),
            start_time: self.start_time.format(TIME_FORMAT).to_string(),
            end_time: self.end_time.format(TIME_FORMAT).to_string(),
            total_price: self.total_price,
            contact_phone: self.contact_phone.clone(),
            status: self.status.as_str(),
            payment_status: self.payment_status.as_str(),
            payment_id: self.payment_id.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl ToSerialized<Review> for ReviewData {
    fn to_serialized(&self) -> Review {
        Review {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            venue_id: self.venue_id.clone(),
            rating: self.rating,
            comment: self.comment.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
