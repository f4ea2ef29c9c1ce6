use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    /// "customer" or "owner"
    pub role: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub email: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalSessionSchema {
    #[validate(length(min = 1, max = 256))]
    pub session_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewVenueSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub description: String,
    #[validate(length(min = 1, max = 128))]
    pub location: String,
    pub address: String,
    #[validate(length(min = 1))]
    pub categories: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[validate(range(min = 0.01))]
    pub price_per_hour: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSlotSchema {
    #[validate(length(min = 1))]
    pub venue_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewBookingSchema {
    #[validate(length(min = 1))]
    pub venue_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub contact_phone: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewReviewSchema {
    #[validate(length(min = 1))]
    pub venue_id: String,
    /// Expected to be 1 through 5, recorded as given
    pub rating: f64,
    pub comment: String,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
