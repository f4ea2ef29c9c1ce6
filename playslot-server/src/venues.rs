use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use playslot_collab::{NewVenue, UpdatedVenue, VenueSearch};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewVenueSchema, ValidatedJson},
    serialized::{ToSerialized, Venue},
    Router,
};

#[utoipa::path(
    post,
    path = "/venues",
    tag = "venues",
    request_body = NewVenueSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Venue)
    )
)]
pub(crate) async fn create_venue(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewVenueSchema>,
) -> ServerResult<impl IntoResponse> {
    let venue = context
        .collab
        .venues
        .create(NewVenue {
            owner_id: session.user().id,
            name: body.name,
            description: body.description,
            location: body.location,
            address: body.address,
            categories: body.categories,
            amenities: body.amenities,
            price_per_hour: body.price_per_hour,
            images: body.images,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(venue.to_serialized())))
}

#[derive(serde::Deserialize, utoipa::IntoParams)]
struct SearchParams {
    category: Option<String>,
    location: Option<String>,
}

#[utoipa::path(
    get,
    path = "/venues/search",
    tag = "venues",
    params(SearchParams),
    responses(
        (status = 200, body = Vec<Venue>)
    )
)]
pub(crate) async fn search_venues(
    State(context): State<ServerContext>,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<Vec<Venue>>> {
    let venues = context
        .collab
        .venues
        .search(VenueSearch {
            category: params.category,
            location: params.location,
        })
        .await?;

    Ok(Json(venues.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/venues/{id}",
    tag = "venues",
    params(
        ("id" = String, Path,)
    ),
    responses(
        (status = 200, body = Venue),
        (status = 404, description = "No such venue")
    )
)]
pub(crate) async fn get_venue(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<Venue>> {
    let venue = context.collab.venues.by_id(&id).await?;

    Ok(Json(venue.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/venues/{id}",
    tag = "venues",
    request_body = NewVenueSchema,
    params(
        ("id" = String, Path,)
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Venue),
        (status = 404, description = "No such venue")
    )
)]
pub(crate) async fn update_venue(
    _session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<NewVenueSchema>,
) -> ServerResult<Json<Venue>> {
    let venue = context
        .collab
        .venues
        .update(UpdatedVenue {
            id,
            name: body.name,
            description: body.description,
            location: body.location,
            address: body.address,
            categories: body.categories,
            amenities: body.amenities,
            price_per_hour: body.price_per_hour,
            images: body.images,
        })
        .await?;

    Ok(Json(venue.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/venues/owner/{owner_id}",
    tag = "venues",
    params(
        ("owner_id" = String, Path,)
    ),
    responses(
        (status = 200, body = Vec<Venue>)
    )
)]
pub(crate) async fn venues_by_owner(
    State(context): State<ServerContext>,
    Path(owner_id): Path<String>,
) -> ServerResult<Json<Vec<Venue>>> {
    let venues = context.collab.venues.by_owner(&owner_id).await?;

    Ok(Json(venues.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_venue))
        .route("/search", get(search_venues))
        .route("/:id", get(get_venue).put(update_venue))
        .route("/owner/:owner_id", get(venues_by_owner))
}
