use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderName, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use playslot_collab::{Credentials, NewAccount, SessionData, UserData};
use serde_json::json;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{ExternalSessionSchema, LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{AuthResult, ToSerialized, User},
    Router,
};

/// Name of the cookie carrying the session token
const SESSION_COOKIE: &str = "session_token";
/// Cookie lifetime, matching the session's own expiry
const SESSION_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 7;

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> UserData {
        self.0.user.clone()
    }
}

/// Pulls the session token out of the request, preferring the cookie
/// over the Authorization header
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|x| x.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|pair| pair.trim().strip_prefix("session_token="))
        })
        .map(str::to_string);

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
    })
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = token_from_headers(&parts.headers)
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

        let session = context
            .collab
            .auth
            .session(&token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Session is invalid"))?;

        Ok(Self(session))
    }
}

fn set_cookie(token: &str) -> [(HeaderName, String); 1] {
    [(
        header::SET_COOKIE,
        format!(
            "{SESSION_COOKIE}={token}; Path=/; Max-Age={SESSION_COOKIE_MAX_AGE}; HttpOnly; Secure; SameSite=None"
        ),
    )]
}

fn clear_cookie() -> [(HeaderName, String); 1] {
    [(
        header::SET_COOKIE,
        format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=None"),
    )]
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 201, body = AuthResult),
        (status = 400, description = "Email is already registered")
    )
)]
pub(crate) async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<impl IntoResponse> {
    let role = body.role.parse()?;

    let session = context
        .collab
        .auth
        .register(NewAccount {
            email: body.email,
            password: body.password,
            name: body.name,
            role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        set_cookie(&session.token),
        Json(session.to_serialized()),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = AuthResult),
        (status = 401, description = "Invalid credentials")
    )
)]
pub(crate) async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<impl IntoResponse> {
    let session = context
        .collab
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok((set_cookie(&session.token), Json(session.to_serialized())))
}

#[utoipa::path(
    post,
    path = "/auth/google/callback",
    tag = "auth",
    request_body = ExternalSessionSchema,
    responses(
        (status = 200, body = AuthResult),
        (status = 401, description = "The provider rejected the session id")
    )
)]
pub(crate) async fn google_callback(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ExternalSessionSchema>,
) -> ServerResult<impl IntoResponse> {
    let session = context.collab.auth.external_login(&body.session_id).await?;

    Ok((set_cookie(&session.token), Json(session.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub(crate) async fn me(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session deleted, if it existed")
    )
)]
pub(crate) async fn logout(
    State(context): State<ServerContext>,
    headers: HeaderMap,
) -> ServerResult<impl IntoResponse> {
    if let Some(token) = token_from_headers(&headers) {
        context.collab.auth.logout(&token).await?;
    }

    Ok((clear_cookie(), Json(json!({ "message": "Logged out" }))))
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google/callback", post(google_callback))
        .route("/me", get(me))
        .route("/logout", post(logout))
}
