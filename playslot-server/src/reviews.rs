use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use playslot_collab::NewReview;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewReviewSchema, ValidatedJson},
    serialized::{Review, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/reviews",
    tag = "reviews",
    request_body = NewReviewSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Review),
        (status = 404, description = "No such venue")
    )
)]
pub(crate) async fn create_review(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewReviewSchema>,
) -> ServerResult<impl IntoResponse> {
    let review = context
        .collab
        .reviews
        .add(NewReview {
            user_id: session.user().id,
            venue_id: body.venue_id,
            rating: body.rating,
            comment: body.comment,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(review.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/reviews/venue/{venue_id}",
    tag = "reviews",
    params(
        ("venue_id" = String, Path,)
    ),
    responses(
        (status = 200, body = Vec<Review>)
    )
)]
pub(crate) async fn reviews_for_venue(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<Json<Vec<Review>>> {
    let reviews = context.collab.reviews.for_venue(&venue_id).await?;

    Ok(Json(reviews.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_review))
        .route("/venue/:venue_id", get(reviews_for_venue))
}
