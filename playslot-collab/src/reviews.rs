use crate::{DatabaseError, NewReview, ReviewData, SharedDatabase, VenueData};

/// Persists reviews and keeps the venue rating aggregate in step
/// with them
pub struct Reviews {
    db: SharedDatabase,
}

impl Reviews {
    pub fn new(db: &SharedDatabase) -> Self {
        Self { db: db.clone() }
    }

    /// Adds a review and folds its rating into the venue's running
    /// (sum, count) pair in one atomic increment. The venue is
    /// resolved up front so a bad id can't leave an orphaned review
    /// behind.
    pub async fn add(&self, new_review: NewReview) -> Result<ReviewData, DatabaseError> {
        let _ = self.db.venue_by_id(&new_review.venue_id).await?;

        let review = self.db.create_review(new_review).await?;

        self.db
            .apply_review_to_venue(&review.venue_id, review.rating)
            .await?;

        Ok(review)
    }

    /// Rebuilds the venue aggregate from a full scan of its reviews.
    /// Repair path for the gap between a review landing and the
    /// increment being applied, the increment is what normal writes
    /// use.
    pub async fn recompute(&self, venue_id: &str) -> Result<VenueData, DatabaseError> {
        let (rating_sum, total_reviews) = self.db.review_totals(venue_id).await?;

        self.db
            .set_venue_rating(venue_id, rating_sum, total_reviews)
            .await
    }

    /// Reviews for a venue, newest first
    pub async fn for_venue(&self, venue_id: &str) -> Result<Vec<ReviewData>, DatabaseError> {
        self.db.reviews_for_venue(venue_id).await
    }
}
