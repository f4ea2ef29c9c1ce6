use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json,
};
use playslot_collab::{BookingRequest, BookingStatus, PaymentStatus};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewBookingSchema, ValidatedJson},
    serialized::{Booking, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = NewBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Booking),
        (status = 400, description = "Malformed date or time, or an empty window"),
        (status = 404, description = "No such venue"),
        (status = 409, description = "The window overlaps an existing booking")
    )
)]
pub(crate) async fn create_booking(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBookingSchema>,
) -> ServerResult<impl IntoResponse> {
    let booking = context
        .collab
        .bookings
        .create(BookingRequest {
            user_id: session.user().id,
            venue_id: body.venue_id,
            date: body.date,
            start_time: body.start_time,
            end_time: body.end_time,
            contact_phone: body.contact_phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(booking.to_serialized())))
}

#[derive(Deserialize, IntoParams)]
struct BucketParams {
    /// "upcoming" for pending and confirmed bookings, anything else
    /// for the settled ones
    #[serde(default)]
    status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/bookings/user/{user_id}",
    tag = "bookings",
    params(
        ("user_id" = String, Path,),
        BucketParams
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
pub(crate) async fn bookings_for_user(
    _session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<String>,
    Query(params): Query<BucketParams>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bucket = params.status.unwrap_or_else(|| "upcoming".to_string());

    let bookings = context.collab.bookings.for_user(&user_id, &bucket).await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bookings/venue/{venue_id}",
    tag = "bookings",
    params(
        ("venue_id" = String, Path,)
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
pub(crate) async fn bookings_for_venue(
    _session: Session,
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context.collab.bookings.for_venue(&venue_id).await?;

    Ok(Json(bookings.to_serialized()))
}

#[derive(Deserialize, IntoParams)]
struct BookingStatusParams {
    status: String,
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/status",
    tag = "bookings",
    params(
        ("id" = String, Path,),
        BookingStatusParams
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 404, description = "No such booking"),
        (status = 409, description = "The booking cannot move to that status")
    )
)]
pub(crate) async fn update_booking_status(
    _session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Query(params): Query<BookingStatusParams>,
) -> ServerResult<Json<Booking>> {
    let new_status: BookingStatus = params.status.parse()?;

    let booking = context
        .collab
        .bookings
        .update_status(&id, new_status)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[derive(Deserialize, IntoParams)]
struct PaymentParams {
    payment_status: String,
    payment_id: String,
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/payment",
    tag = "bookings",
    params(
        ("id" = String, Path,),
        PaymentParams
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 404, description = "No such booking")
    )
)]
pub(crate) async fn record_payment(
    _session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Query(params): Query<PaymentParams>,
) -> ServerResult<Json<Booking>> {
    let payment_status: PaymentStatus = params.payment_status.parse()?;

    let booking = context
        .collab
        .bookings
        .record_payment(&id, payment_status, &params.payment_id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/user/:user_id", get(bookings_for_user))
        .route("/venue/:venue_id", get(bookings_for_venue))
        .route("/:id/status", put(update_booking_status))
        .route("/:id/payment", put(record_payment))
}
