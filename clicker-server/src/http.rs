use {
    std::path::PathBuf,
    axum::{
        Router,
        Json,
        Form,
        extract::{State, rejection::JsonRejection},
        http::{HeaderValue, StatusCode, header::{CACHE_CONTROL, EXPIRES, PRAGMA, SET_COOKIE}},
        response::{IntoResponse, Redirect, Response},
        routing::{get, post},
    },
    tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer},
    serde::Deserialize,
    tracing::{info, warn},
    clicker_core::{ErrorResponse, MineResponse, UpgradeKind, UpgradeRequest},
    crate::{
        database::{Database, DatabaseError, upgrades::UpgradeError},
        error::ServerError,
        pages::{self, UpgradeRow},
        password::{hash_password, verify_password},
        session::{Session, session_cookie},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub(crate) database: Database,
    password_cost: u8,
}

impl AppState {
    /// `password_cost` is the scrypt work factor, log2 of N.
    pub fn new(database: Database, password_cost: u8) -> Self {
        Self {
            database,
            password_cost,
        }
    }
}

pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/leaderboard", get(leaderboard))
        .route("/mine", post(mine))
        .route("/upgrade", post(upgrade));

    if let Some(static_dir) = static_dir {
        router = router.nest_service("/static", ServeDir::new(static_dir));
    }

    router
        .layer(SetResponseHeaderLayer::overriding(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate")))
        .layer(SetResponseHeaderLayer::overriding(EXPIRES, HeaderValue::from_static("0")))
        .layer(SetResponseHeaderLayer::overriding(PRAGMA, HeaderValue::from_static("no-cache")))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>, session: Session) -> Result<Response, ServerError> {
    let Some(user_id) = session.user_id() else {
        return Ok(redirect_to_login());
    };
    let Some(user) = state.database.user(user_id)? else {
        return Ok(redirect_to_login());
    };

    let levels = state.database.upgrade_levels(user_id)?;
    let upgrades = UpgradeKind::ALL.into_iter()
        .map(|kind| {
            let level = levels.get(&kind).copied().unwrap_or(0);
            UpgradeRow {
                kind,
                level,
                next_cost: kind.upgrade().cost_at(level),
            }
        })
        .collect();

    Ok(pages::game_page(&user, upgrades, take_flashes(&state, &session)?))
}

#[derive(Deserialize)]
struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirmation: String,
}

async fn register_form(State(state): State<AppState>, session: Session) -> Result<Response, ServerError> {
    Ok(pages::register_page(None, take_flashes(&state, &session)?))
}

async fn register(State(state): State<AppState>, session: Session, Form(form): Form<RegisterForm>) -> Result<Response, ServerError> {
    let rejected = |message: &str| -> Result<Response, ServerError> {
        Ok(pages::register_page(Some(message.to_owned()), take_flashes(&state, &session)?))
    };

    if form.username.is_empty() || form.password.is_empty() || form.confirmation.is_empty() {
        return rejected("Please fill out all fields.");
    }
    if form.password != form.confirmation {
        return rejected("Passwords do not match.");
    }

    let hash = hash_password(&form.password, state.password_cost)
        .ok_or(ServerError::PasswordHash { cost: state.password_cost })?;
    match state.database.create_user(&form.username, &hash) {
        Ok(user_id) => info!("registered user {user_id}"),
        Err(DatabaseError::UsernameTaken) => return rejected("Username already taken."),
        Err(err) => return Err(err.into()),
    }

    let cookie = flash(&state, &session, "Registered successfully!")?;
    Ok(redirect("/login", cookie))
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_form(State(state): State<AppState>, session: Session) -> Result<Response, ServerError> {
    Ok(pages::login_page(None, take_flashes(&state, &session)?))
}

async fn login(State(state): State<AppState>, session: Session, Form(form): Form<LoginForm>) -> Result<Response, ServerError> {
    let rejected = |message: &str| -> Result<Response, ServerError> {
        Ok(pages::login_page(Some(message.to_owned()), take_flashes(&state, &session)?))
    };

    if form.username.is_empty() || form.password.is_empty() {
        return rejected("Please fill out all fields.");
    }

    let user = match state.database.find_user_by_username(&form.username)? {
        Some(user) if verify_password(&user.hash, &form.password) => user,
        _ => {
            warn!("failed login attempt for {:?}", form.username);
            return rejected("Invalid username and/or password.");
        }
    };

    // a fresh token on every login, the previous one is discarded
    if let Some(token) = session.token() {
        state.database.delete_session(token)?;
    }
    let record = state.database.create_session(Some(user.id))?;
    state.database.push_flash(&record.token, "Logged in successfully!")?;

    Ok(redirect("/", Some(session_cookie(&record.token)?)))
}

async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, ServerError> {
    if let Some(token) = session.token() {
        state.database.delete_session(token)?;
    }
    let cookie = flash(&state, &Session::default(), "Logged out successfully!")?;
    Ok(redirect("/", cookie))
}

async fn leaderboard(State(state): State<AppState>, session: Session) -> Result<Response, ServerError> {
    let entries = state.database.leaderboard()?;
    Ok(pages::leaderboard_page(entries, session.user_id().is_some(), take_flashes(&state, &session)?))
}

async fn mine(State(state): State<AppState>, session: Session) -> Result<Response, ServerError> {
    let Some(user_id) = session.user_id() else {
        return Ok(redirect_to_login());
    };

    Ok(match state.database.mine(user_id)? {
        Some(blocks) => Json(MineResponse { blocks }).into_response(),
        None => redirect_to_login(),
    })
}

async fn upgrade(
    State(state): State<AppState>,
    session: Session,
    request: Result<Json<UpgradeRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Some(user_id) = session.user_id() else {
        return Ok(redirect_to_login());
    };
    let Json(request) = match request {
        Ok(v) => v,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let Ok(kind) = request.upgrade_type.parse::<UpgradeKind>() else {
        return Ok(bad_request("Invalid upgrade type"));
    };

    match state.database.purchase_upgrade(user_id, kind) {
        Ok(response) => {
            info!("user {user_id} bought {kind} level {}", response.level);
            Ok(Json(response).into_response())
        },
        Err(UpgradeError::NotEnoughBlocks { blocks, cost }) => {
            warn!("user {user_id} cannot afford {kind}: has {blocks}, needs {cost}");
            Ok(bad_request("Not enough blocks"))
        },
        Err(UpgradeError::UserNotFound) => Ok(redirect_to_login()),
        Err(UpgradeError::Database(err)) => Err(err.into()),
    }
}

fn take_flashes(state: &AppState, session: &Session) -> Result<Vec<String>, ServerError> {
    Ok(match session.token() {
        Some(token) => state.database.take_flashes(token)?,
        None => Vec::new(),
    })
}

/// Queues a flash message, starting a session if the request has none. Returns the cookie to set.
fn flash(state: &AppState, session: &Session, message: &str) -> Result<Option<HeaderValue>, ServerError> {
    Ok(match session.token() {
        Some(token) => {
            state.database.push_flash(token, message)?;
            None
        },
        None => {
            let record = state.database.create_session(None)?;
            state.database.push_flash(&record.token, message)?;
            Some(session_cookie(&record.token)?)
        }
    })
}

fn redirect(to: &str, cookie: Option<HeaderValue>) -> Response {
    let mut response = Redirect::to(to).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

fn redirect_to_login() -> Response {
    Redirect::to("/login").into_response()
}

fn bad_request(error: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response()
}
