use thiserror::Error;

use crate::{
    util::{parse_date, parse_time, ParseError},
    DatabaseError, NewSlot, SharedDatabase, SlotData, SlotStatus,
};

/// Tracks the advertised time windows of venues. A slot marks
/// capacity only, reserving one is the booking engine's job.
pub struct Slots {
    db: SharedDatabase,
}

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("End time must be after start time")]
    InvalidTimeRange,
    #[error(transparent)]
    InvalidInput(#[from] ParseError),
    #[error("A slot cannot move from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: SlotStatus, to: SlotStatus },
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// An owner's request to advertise a time window
#[derive(Debug)]
pub struct SlotRequest {
    pub venue_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl Slots {
    pub fn new(db: &SharedDatabase) -> Self {
        Self { db: db.clone() }
    }

    /// Advertises a new window, starting out available
    pub async fn create(&self, request: SlotRequest) -> Result<SlotData, SlotError> {
        let date = parse_date(&request.date)?;
        let start_time = parse_time(&request.start_time)?;
        let end_time = parse_time(&request.end_time)?;

        if end_time <= start_time {
            return Err(SlotError::InvalidTimeRange);
        }

        self.db
            .create_slot(NewSlot {
                venue_id: request.venue_id,
                date,
                start_time,
                end_time,
            })
            .await
            .map_err(Into::into)
    }

    /// The still-available windows of a venue on a given date
    pub async fn available(&self, venue_id: &str, date: &str) -> Result<Vec<SlotData>, SlotError> {
        let date = parse_date(date)?;

        self.db
            .available_slots(venue_id, date)
            .await
            .map_err(Into::into)
    }

    /// Moves a slot to a new status, if the transition is legal. The
    /// write is conditional on the observed status, like bookings.
    pub async fn update_status(
        &self,
        slot_id: &str,
        new_status: SlotStatus,
    ) -> Result<SlotData, SlotError> {
        let slot = self.db.slot_by_id(slot_id).await?;

        if !slot.status.can_become(new_status) {
            return Err(SlotError::InvalidTransition {
                from: slot.status,
                to: new_status,
            });
        }

        self.db
            .update_slot_status(slot_id, slot.status, new_status)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::MemoryDatabase;

    fn setup() -> Slots {
        let db: SharedDatabase = Arc::new(MemoryDatabase::new());
        Slots::new(&db)
    }

    fn request(venue_id: &str, date: &str, start: &str, end: &str) -> SlotRequest {
        SlotRequest {
            venue_id: venue_id.to_string(),
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[tokio::test]
    async fn new_slots_are_available() {
        let slots = setup();

        let slot = slots
            .create(request("venue", "2025-06-01", "10:00", "11:00"))
            .await
            .unwrap();

        assert_eq!(slot.status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn listing_filters_by_venue_date_and_availability() {
        let slots = setup();

        let listed = slots
            .create(request("venue", "2025-06-01", "10:00", "11:00"))
            .await
            .unwrap();
        let booked = slots
            .create(request("venue", "2025-06-01", "11:00", "12:00"))
            .await
            .unwrap();
        slots
            .create(request("venue", "2025-06-02", "10:00", "11:00"))
            .await
            .unwrap();
        slots
            .create(request("other", "2025-06-01", "10:00", "11:00"))
            .await
            .unwrap();

        slots
            .update_status(&booked.id, SlotStatus::Booked)
            .await
            .unwrap();

        let available = slots.available("venue", "2025-06-01").await.unwrap();

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, listed.id);
    }

    #[tokio::test]
    async fn backwards_windows_are_rejected() {
        let slots = setup();

        let result = slots
            .create(request("venue", "2025-06-01", "11:00", "10:00"))
            .await;

        assert!(matches!(result, Err(SlotError::InvalidTimeRange)));
    }

    #[tokio::test]
    async fn only_legal_transitions_are_accepted() {
        let slots = setup();

        let slot = slots
            .create(request("venue", "2025-06-01", "10:00", "11:00"))
            .await
            .unwrap();

        slots
            .update_status(&slot.id, SlotStatus::Booked)
            .await
            .unwrap();

        // A booked slot can only be released, not blocked outright
        let blocked = slots.update_status(&slot.id, SlotStatus::Blocked).await;
        assert!(matches!(blocked, Err(SlotError::InvalidTransition { .. })));

        slots
            .update_status(&slot.id, SlotStatus::Available)
            .await
            .unwrap();
        slots
            .update_status(&slot.id, SlotStatus::Blocked)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_slots_are_not_found() {
        let slots = setup();

        let result = slots.update_status("missing", SlotStatus::Booked).await;

        assert!(matches!(
            result,
            Err(SlotError::Db(DatabaseError::NotFound { .. }))
        ));
    }
}
