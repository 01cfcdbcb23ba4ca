//! Authentication route handlers.
//!
//! Email/password login and registration. Registration issues an email
//! verification token; the verify endpoint consumes it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sprig_core::Email;

use crate::db::tokens::TokenRepository;
use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::session::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Login/registration form data.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

/// Email verification query data.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error_message: String,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error_message: String,
}

/// Display the login page.
#[instrument]
pub async fn login_page() -> LoginTemplate {
    LoginTemplate {
        error_message: String::new(),
    }
}

/// Log a user in with email and password.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let service = AuthService::new(state.pool());

    match service.login_with_password(&form.email, &form.password).await {
        Ok(user) => {
            tracing::info!(user = %user.id, role = %user.role, "user logged in");
            set_current_user(
                &session,
                &CurrentUser {
                    id: user.id,
                    email: user.email,
                },
            )
            .await?;

            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => Ok(LoginTemplate {
            error_message: "Invalid email or password".to_string(),
        }
        .into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Display the registration page.
#[instrument]
pub async fn register_page() -> RegisterTemplate {
    RegisterTemplate {
        error_message: String::new(),
    }
}

/// Register a new account, sign it in, and issue a verification token.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let service = AuthService::new(state.pool());

    let user = match service
        .register_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(
            err @ (AuthError::UserAlreadyExists
            | AuthError::WeakPassword(_)
            | AuthError::InvalidEmail(_)),
        ) => {
            return Ok(RegisterTemplate {
                error_message: err.to_string(),
            }
            .into_response());
        }
        Err(other) => return Err(other.into()),
    };

    // The verification email is sent out-of-band; the token is logged so
    // operators can hand out verify links while the mailer is absent.
    let token = TokenRepository::new(state.pool())
        .generate(&user.email)
        .await?;
    tracing::info!(
        user = %user.id,
        verified = user.email_verified,
        token = %token.token,
        expires = %token.expires,
        "account created, verification token issued"
    );

    set_current_user(
        &session,
        &CurrentUser {
            id: user.id,
            email: user.email,
        },
    )
    .await?;

    Ok(Redirect::to("/").into_response())
}

/// Verify an email address from a token link.
#[instrument(skip(state, query))]
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Redirect, AppError> {
    let email = TokenRepository::new(state.pool())
        .consume(&query.token)
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid or expired token".to_string()))?;

    let email = Email::parse(&email)
        .map_err(|e| AppError::Internal(format!("invalid email in token store: {e}")))?;

    UserRepository::new(state.pool())
        .mark_email_verified(&email)
        .await?;

    Ok(Redirect::to("/auth/login"))
}

/// Log the current user out.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;

    Ok(Redirect::to("/"))
}
