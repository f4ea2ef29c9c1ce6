mod auth;
mod bookings;
mod db;
mod reviews;
mod slots;
mod venues;

pub mod util;

use std::sync::Arc;

pub use auth::*;
pub use bookings::*;
pub use db::*;
pub use reviews::*;
pub use slots::*;
pub use venues::*;

/// The playslot collab system, facilitating venue listings,
/// bookings, authentication, and reviews over a shared store.
pub struct Collab {
    pub auth: Auth,
    pub venues: Venues,
    pub slots: Slots,
    pub bookings: Bookings,
    pub reviews: Reviews,
}

impl Collab {
    pub fn new(database: SharedDatabase, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            auth: Auth::new(&database, provider),
            venues: Venues::new(&database),
            slots: Slots::new(&database),
            bookings: Bookings::new(&database),
            reviews: Reviews::new(&database),
        }
    }
}
