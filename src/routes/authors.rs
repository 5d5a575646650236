use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::auth::{login_user, logout_user, set_flash, take_flash, verify_password, AuthUser};
use crate::error::AppError;
use crate::forms::register::{FieldView, RegisterForm, EMAIL_IN_USE};
use crate::models::{Recipe, User};
use crate::validation::FieldErrors;
use crate::AppState;

pub const REGISTERED_MESSAGE: &str = "Your user is created, please log in.";

#[derive(Template)]
#[template(path = "authors/register.html")]
struct RegisterTemplate {
    fields: Vec<FieldView>,
    has_errors: bool,
    static_hash: &'static str,
    user: Option<User>,
}

#[derive(Template)]
#[template(path = "authors/login.html")]
struct LoginTemplate {
    username: String,
    error: Option<String>,
    flash: Option<String>,
    static_hash: &'static str,
    user: Option<User>,
}

#[derive(Template)]
#[template(path = "authors/dashboard.html")]
struct DashboardTemplate {
    recipes: Vec<Recipe>,
    static_hash: &'static str,
    user: Option<User>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    username: String,
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors/register", get(register_page).post(register_submit))
        .route("/authors/login", get(login_page).post(login_submit))
        .route("/authors/logout", post(logout))
        .route("/authors/dashboard", get(dashboard))
}

fn render_register(form: &RegisterForm, errors: &FieldErrors) -> Result<Html<String>, AppError> {
    let template = RegisterTemplate {
        fields: form.field_views(errors),
        has_errors: !errors.is_empty(),
        static_hash: crate::STATIC_HASH,
        user: None,
    };
    Ok(Html(template.render()?))
}

async fn register_page() -> Result<impl IntoResponse, AppError> {
    render_register(&RegisterForm::default(), &FieldErrors::new())
}

async fn register_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let errors = form.validate(&state.db).await?;
    if !errors.is_empty() {
        return Ok(render_register(&form, &errors)?.into_response());
    }

    let new_user = form.clone().into_new_user()?;
    let user = match new_user.insert(&state.db).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration.
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let mut errors = FieldErrors::new();
            if e.message().contains("users.email") {
                errors.add("email", EMAIL_IN_USE);
            } else {
                errors.add("username", "A user with that username already exists.");
            }
            return Ok(render_register(&form, &errors)?.into_response());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    set_flash(&session, REGISTERED_MESSAGE).await?;
    Ok(Redirect::to("/authors/login").into_response())
}

async fn login_page(session: Session) -> Result<impl IntoResponse, AppError> {
    let template = LoginTemplate {
        username: String::new(),
        error: None,
        flash: take_flash(&session).await?,
        static_hash: crate::STATIC_HASH,
        user: None,
    };
    Ok(Html(template.render()?))
}

async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let found = User::find_with_password(&state.db, form.username.trim()).await?;

    match found {
        Some((user, hash)) if verify_password(form.password.trim(), &hash) => {
            tracing::info!(user_id = user.id, "user logged in");
            login_user(&session, user).await?;
            Ok(Redirect::to("/authors/dashboard").into_response())
        }
        _ => {
            tracing::debug!(username = %form.username, "login rejected");
            let template = LoginTemplate {
                username: form.username,
                error: Some("Invalid credentials".to_string()),
                flash: None,
                static_hash: crate::STATIC_HASH,
                user: None,
            };
            Ok(Html(template.render()?).into_response())
        }
    }
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    Ok(Redirect::to("/authors/login"))
}

async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let recipes = Recipe::list_by_author(&state.db, user.id).await?;

    let template = DashboardTemplate {
        recipes,
        static_hash: crate::STATIC_HASH,
        user: Some(user),
    };
    Ok(Html(template.render()?))
}
