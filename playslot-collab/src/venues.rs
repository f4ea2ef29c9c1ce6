use crate::{DatabaseError, NewVenue, SharedDatabase, UpdatedVenue, VenueData, VenueSearch};

/// Thin pass-through persistence for venue listings. All the
/// interesting state lives with bookings and reviews.
pub struct Venues {
    db: SharedDatabase,
}

impl Venues {
    pub fn new(db: &SharedDatabase) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, new_venue: NewVenue) -> Result<VenueData, DatabaseError> {
        self.db.create_venue(new_venue).await
    }

    pub async fn by_id(&self, venue_id: &str) -> Result<VenueData, DatabaseError> {
        self.db.venue_by_id(venue_id).await
    }

    pub async fn update(&self, updated_venue: UpdatedVenue) -> Result<VenueData, DatabaseError> {
        self.db.update_venue(updated_venue).await
    }

    pub async fn by_owner(&self, owner_id: &str) -> Result<Vec<VenueData>, DatabaseError> {
        self.db.venues_by_owner(owner_id).await
    }

    pub async fn search(&self, search: VenueSearch) -> Result<Vec<VenueData>, DatabaseError> {
        self.db.search_venues(search).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::MemoryDatabase;

    fn setup() -> Venues {
        let db: SharedDatabase = Arc::new(MemoryDatabase::new());
        Venues::new(&db)
    }

    fn venue(name: &str, location: &str, category: &str) -> NewVenue {
        NewVenue {
            owner_id: "owner".to_string(),
            name: name.to_string(),
            description: String::new(),
            location: location.to_string(),
            address: String::new(),
            categories: vec![category.to_string()],
            amenities: vec![],
            price_per_hour: 1000.0,
            images: vec![],
        }
    }

    #[tokio::test]
    async fn search_matches_category_and_location() {
        let venues = setup();

        venues
            .create(venue("Northside Turf", "Northside", "football"))
            .await
            .unwrap();
        venues
            .create(venue("Dockside Arena", "Dockside", "cricket"))
            .await
            .unwrap();

        let by_category = venues
            .search(VenueSearch {
                category: Some("cricket".to_string()),
                location: None,
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "Dockside Arena");

        // Location matching is a case-insensitive substring
        let by_location = venues
            .search(VenueSearch {
                category: None,
                location: Some("north".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_location.len(), 1);
        assert_eq!(by_location[0].name, "Northside Turf");

        let all = venues.search(VenueSearch::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_listing_fields_but_not_the_rating() {
        let venues = setup();

        let created = venues
            .create(venue("Northside Turf", "Northside", "football"))
            .await
            .unwrap();

        let updated = venues
            .update(UpdatedVenue {
                id: created.id.clone(),
                name: "Northside Dome".to_string(),
                description: "now indoors".to_string(),
                location: created.location.clone(),
                address: created.address.clone(),
                categories: created.categories.clone(),
                amenities: created.amenities.clone(),
                price_per_hour: 1200.0,
                images: created.images.clone(),
            })
            .await
            .unwrap();

        assert_eq!(updated.name, "Northside Dome");
        assert_eq!(updated.price_per_hour, 1200.0);
        assert_eq!(updated.rating, created.rating);
        assert_eq!(updated.total_reviews, created.total_reviews);
    }

    #[tokio::test]
    async fn updating_an_unknown_venue_is_not_found() {
        let venues = setup();

        let result = venues
            .update(UpdatedVenue {
                id: "missing".to_string(),
                name: String::new(),
                description: String::new(),
                location: String::new(),
                address: String::new(),
                categories: vec![],
                amenities: vec![],
                price_per_hour: 0.0,
                images: vec![],
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
