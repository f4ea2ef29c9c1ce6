use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json,
};
use playslot_collab::{SlotRequest, SlotStatus};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewSlotSchema, ValidatedJson},
    serialized::{Slot, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/slots",
    tag = "slots",
    request_body = NewSlotSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Slot),
        (status = 400, description = "Malformed date or time, or an empty window")
    )
)]
pub(crate) async fn create_slot(
    _session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewSlotSchema>,
) -> ServerResult<impl IntoResponse> {
    let slot = context
        .collab
        .slots
        .create(SlotRequest {
            venue_id: body.venue_id,
            date: body.date,
            start_time: body.start_time,
            end_time: body.end_time,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(slot.to_serialized())))
}

#[derive(Deserialize, IntoParams)]
struct AvailableParams {
    date: String,
}

#[utoipa::path(
    get,
    path = "/slots/available/{venue_id}",
    tag = "slots",
    params(
        ("venue_id" = String, Path,),
        AvailableParams
    ),
    responses(
        (status = 200, body = Vec<Slot>),
        (status = 400, description = "Malformed date")
    )
)]
pub(crate) async fn available_slots(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
    Query(params): Query<AvailableParams>,
) -> ServerResult<Json<Vec<Slot>>> {
    let slots = context.collab.slots.available(&venue_id, &params.date).await?;

    Ok(Json(slots.to_serialized()))
}

#[derive(Deserialize, IntoParams)]
struct SlotStatusParams {
    status: String,
}

#[utoipa::path(
    put,
    path = "/slots/{id}/status",
    tag = "slots",
    params(
        ("id" = String, Path,),
        SlotStatusParams
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Slot),
        (status = 404, description = "No such slot"),
        (status = 409, description = "The slot cannot move to that status")
    )
)]
pub(crate) async fn update_slot_status(
    _session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Query(params): Query<SlotStatusParams>,
) -> ServerResult<Json<Slot>> {
    let new_status: SlotStatus = params.status.parse()?;

    let slot = context.collab.slots.update_status(&id, new_status).await?;

    Ok(Json(slot.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_slot))
        .route("/available/:venue_id", get(available_slots))
        .route("/:id/status", put(update_slot_status))
}
