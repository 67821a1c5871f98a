use {
    std::path::PathBuf,
    axum::{
        Router,
        body::{Body, to_bytes},
        http::{HeaderMap, Method, Request, StatusCode, header::{CACHE_CONTROL, CONTENT_TYPE, COOKIE, EXPIRES, LOCATION, PRAGMA, SET_COOKIE}},
    },
    tower::ServiceExt,
    serde_json::{Value, json},
    clicker_server::{AppState, ClickerServer, Database, ServerConfig, database::sessions::MAX_ANONYMOUS_SESSIONS, router},
};

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Drives the router in-process, carrying the session cookie between requests like a browser.
struct Browser {
    app: Router,
    session: Option<String>,
}

impl Browser {
    fn new(app: Router) -> Self {
        Self { app, session: None }
    }

    async fn send(&mut self, method: Method, path: &str, content_type: Option<&str>, body: Body) -> TestResponse {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(session) = &self.session {
            request = request.header(COOKIE, format!("session={session}"));
        }

        let response = self.app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let new_session = headers.get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .and_then(|v| v.strip_prefix("session="))
            .map(|v| v.to_owned());
        if new_session.is_some() {
            self.session = new_session;
        }

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, Body::empty()).await
    }

    async fn post_form(&mut self, path: &str, form: &str) -> TestResponse {
        self.send(Method::POST, path, Some("application/x-www-form-urlencoded"), Body::from(form.to_owned())).await
    }

    async fn post_json(&mut self, path: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some("application/json"), Body::from(body.to_string())).await
    }

    async fn mine(&mut self) -> TestResponse {
        self.send(Method::POST, "/mine", None, Body::empty()).await
    }
}

fn app() -> Router {
    app_with_config(ServerConfig {
        password_cost: 4,
        ..ServerConfig::default()
    })
}

fn app_with_config(config: ServerConfig) -> Router {
    ClickerServer::new(config).unwrap().router()
}

async fn register(browser: &mut Browser, username: &str, password: &str) -> TestResponse {
    browser.post_form("/register", &format!("username={username}&password={password}&confirmation={password}")).await
}

async fn signed_in(app: &Router, username: &str) -> Browser {
    let mut browser = Browser::new(app.clone());
    let response = register(&mut browser, username, "secret").await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);

    let response = browser.post_form("/login", &format!("username={username}&password=secret")).await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_eq!(Some("/"), response.location());
    browser
}

#[tokio::test]
async fn index_redirects_anonymous_to_login() {
    let response = Browser::new(app()).get("/").await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_eq!(Some("/login"), response.location());
}

#[tokio::test]
async fn register_requires_all_fields() {
    let mut browser = Browser::new(app());
    let response = browser.post_form("/register", "username=steve&password=&confirmation=").await;
    assert_eq!(StatusCode::OK, response.status);
    assert!(response.body.contains("Please fill out all fields."));

    let response = browser.post_form("/register", "").await;
    assert!(response.body.contains("Please fill out all fields."));
}

#[tokio::test]
async fn register_password_mismatch() {
    let response = Browser::new(app()).post_form("/register", "username=steve&password=a&confirmation=b").await;
    assert_eq!(StatusCode::OK, response.status);
    assert!(response.body.contains("Passwords do not match."));
}

#[tokio::test]
async fn register_duplicate_username() {
    let app = app();
    assert_eq!(StatusCode::SEE_OTHER, register(&mut Browser::new(app.clone()), "steve", "pw").await.status);

    let response = register(&mut Browser::new(app), "steve", "other").await;
    assert_eq!(StatusCode::OK, response.status);
    assert!(response.body.contains("Username already taken."));
}

#[tokio::test]
async fn register_flashes_once_on_login_page() {
    let mut browser = Browser::new(app());
    let response = register(&mut browser, "steve", "pw").await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_eq!(Some("/login"), response.location());
    assert!(browser.session.is_some());

    assert!(browser.get("/login").await.body.contains("Registered successfully!"));
    assert!(!browser.get("/login").await.body.contains("Registered successfully!"));
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = app();
    let mut browser = Browser::new(app.clone());
    register(&mut browser, "steve", "right").await;

    let response = browser.post_form("/login", "username=steve&password=wrong").await;
    assert_eq!(StatusCode::OK, response.status);
    assert!(response.body.contains("Invalid username and/or password."));

    let response = browser.post_form("/login", "username=nobody&password=right").await;
    assert!(response.body.contains("Invalid username and/or password."));

    let response = browser.post_form("/login", "username=steve").await;
    assert!(response.body.contains("Please fill out all fields."));
}

#[tokio::test]
async fn login_rotates_session_and_shows_game() {
    let app = app();
    let mut browser = Browser::new(app.clone());
    register(&mut browser, "steve", "secret").await;
    let anonymous_session = browser.session.clone();

    let response = browser.post_form("/login", "username=steve&password=secret").await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_ne!(anonymous_session, browser.session);

    let page = browser.get("/").await;
    assert_eq!(StatusCode::OK, page.status);
    assert!(page.body.contains(r#"id="counter""#));
    assert!(page.body.contains(r#"id="mine""#));
    assert!(page.body.contains("/static/clicker.js"));
    assert!(page.body.contains("Logged in successfully!"));
    assert!(page.body.contains("steve"));
    assert!(page.body.contains(r#"id="bps">1.0<"#));
}

#[tokio::test]
async fn login_invalidates_previous_token() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;
    let first_login = browser.session.clone();
    assert_eq!(StatusCode::OK, browser.get("/").await.status);

    let response = browser.post_form("/login", "username=steve&password=secret").await;
    assert_eq!(Some("/"), response.location());
    assert_ne!(first_login, browser.session);
    assert_eq!(StatusCode::OK, browser.get("/").await.status);

    let mut replayed = Browser::new(app);
    replayed.session = first_login;
    assert_eq!(Some("/login"), replayed.get("/").await.location());
    assert_eq!(StatusCode::SEE_OTHER, replayed.mine().await.status);
}

#[tokio::test]
async fn mine_requires_login() {
    let response = Browser::new(app()).mine().await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_eq!(Some("/login"), response.location());
}

#[tokio::test]
async fn mine_returns_running_total() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;

    let response = browser.mine().await;
    assert_eq!(StatusCode::OK, response.status);
    assert_eq!(Some("application/json"), response.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()));
    assert_eq!(json!({ "blocks": 1 }), response.json());

    assert_eq!(json!({ "blocks": 2 }), browser.mine().await.json());
}

#[tokio::test]
async fn players_mine_independently() {
    let app = app();
    let mut steve = signed_in(&app, "steve").await;
    let mut alex = signed_in(&app, "alex").await;

    steve.mine().await;
    steve.mine().await;
    assert_eq!(json!({ "blocks": 1 }), alex.mine().await.json());
    assert_eq!(json!({ "blocks": 3 }), steve.mine().await.json());
}

#[tokio::test]
async fn upgrade_requires_login() {
    let response = Browser::new(app()).post_json("/upgrade", json!({ "upgrade_type": "pickaxe" })).await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_eq!(Some("/login"), response.location());
}

#[tokio::test]
async fn upgrade_rejects_unknown_type() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;

    let response = browser.post_json("/upgrade", json!({ "upgrade_type": "diamond" })).await;
    assert_eq!(StatusCode::BAD_REQUEST, response.status);
    assert_eq!(json!({ "error": "Invalid upgrade type" }), response.json());

    let response = browser.post_json("/upgrade", json!({})).await;
    assert_eq!(StatusCode::BAD_REQUEST, response.status);
    assert_eq!(json!({ "error": "Invalid upgrade type" }), response.json());
}

#[tokio::test]
async fn upgrade_requires_enough_blocks() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;
    for _ in 0..9 {
        browser.mine().await;
    }

    let response = browser.post_json("/upgrade", json!({ "upgrade_type": "pickaxe" })).await;
    assert_eq!(StatusCode::BAD_REQUEST, response.status);
    assert_eq!(json!({ "error": "Not enough blocks" }), response.json());

    // nothing was spent
    assert_eq!(json!({ "blocks": 10 }), browser.mine().await.json());
}

#[tokio::test]
async fn pickaxe_upgrade_boosts_mining() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;
    for _ in 0..10 {
        browser.mine().await;
    }

    let response = browser.post_json("/upgrade", json!({ "upgrade_type": "pickaxe" })).await;
    assert_eq!(StatusCode::OK, response.status);
    assert_eq!(json!({ "blocks": 0, "bpc": 2, "bps": 1.0, "level": 1, "next_cost": 10 }), response.json());

    assert_eq!(json!({ "blocks": 2 }), browser.mine().await.json());

    let page = browser.get("/").await;
    assert!(page.body.contains(r#"id="level-pickaxe""#));
}

#[tokio::test]
async fn leaderboard_orders_by_blocks() {
    let app = app();
    let mut steve = signed_in(&app, "steve").await;
    let mut alex = signed_in(&app, "alex").await;
    steve.mine().await;
    for _ in 0..3 {
        alex.mine().await;
    }

    let response = Browser::new(app).get("/leaderboard").await;
    assert_eq!(StatusCode::OK, response.status);
    let alex_at = response.body.find("alex").unwrap();
    let steve_at = response.body.find("steve").unwrap();
    assert!(alex_at < steve_at, "alex should be ranked above steve");
}

#[tokio::test]
async fn logout_ends_session() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;
    assert_eq!(StatusCode::OK, browser.mine().await.status);

    let response = browser.get("/logout").await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert_eq!(Some("/"), response.location());

    assert_eq!(Some("/login"), browser.get("/").await.location());
    assert!(browser.get("/login").await.body.contains("Logged out successfully!"));
    assert_eq!(StatusCode::SEE_OTHER, browser.mine().await.status);
}

#[tokio::test]
async fn logout_invalidates_token() {
    let app = app();
    let mut browser = signed_in(&app, "steve").await;
    let logged_in = browser.session.clone();

    browser.get("/logout").await;
    assert_ne!(logged_in, browser.session);

    let mut replayed = Browser::new(app);
    replayed.session = logged_in;
    assert_eq!(StatusCode::SEE_OTHER, replayed.mine().await.status);
}

fn count_rows(path: &std::path::Path, table: &str) -> i64 {
    let connection = rusqlite::Connection::open(path).unwrap();
    connection.query_row(&format!("select count(*) from {table}"), [], |row| row.get(0)).unwrap()
}

#[tokio::test]
async fn anonymous_sessions_stay_bounded() {
    let path = std::env::temp_dir().join(format!("clicker-sessions-{}.sqlite", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let database = Database::new(&path).unwrap();
    database.run_migrations().unwrap();
    let app = router(AppState::new(database, 4), None);

    for _ in 0..MAX_ANONYMOUS_SESSIONS + 50 {
        let response = Browser::new(app.clone()).get("/logout").await;
        assert_eq!(StatusCode::SEE_OTHER, response.status);
    }
    assert_eq!(MAX_ANONYMOUS_SESSIONS, count_rows(&path, "sessions"));
    assert_eq!(MAX_ANONYMOUS_SESSIONS, count_rows(&path, "flashes"));

    // visitors that follow the redirect leave nothing behind
    let mut browser = Browser::new(app);
    browser.get("/logout").await;
    assert!(browser.get("/login").await.body.contains("Logged out successfully!"));
    assert_eq!(MAX_ANONYMOUS_SESSIONS - 1, count_rows(&path, "sessions"));

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn anonymous_logout_still_flashes() {
    let mut browser = Browser::new(app());
    let response = browser.get("/logout").await;
    assert_eq!(StatusCode::SEE_OTHER, response.status);
    assert!(browser.session.is_some());
    assert!(browser.get("/login").await.body.contains("Logged out successfully!"));
}

#[tokio::test]
async fn unknown_session_cookie_is_anonymous() {
    let mut browser = Browser::new(app());
    browser.session = Some("deadbeef".to_owned());
    assert_eq!(Some("/login"), browser.get("/").await.location());
}

#[tokio::test]
async fn responses_disable_caching() {
    let mut browser = Browser::new(app());
    for response in [browser.get("/").await, browser.get("/login").await, browser.mine().await] {
        assert_eq!("no-cache, no-store, must-revalidate", response.headers.get(CACHE_CONTROL).unwrap());
        assert_eq!("0", response.headers.get(EXPIRES).unwrap());
        assert_eq!("no-cache", response.headers.get(PRAGMA).unwrap());
    }
}

#[tokio::test]
async fn serves_static_client_bundle() {
    let app = app_with_config(ServerConfig {
        static_dir: Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")),
        password_cost: 4,
        ..ServerConfig::default()
    });

    let response = Browser::new(app).get("/static/clicker.js").await;
    assert_eq!(StatusCode::OK, response.status);
    assert!(response.body.contains("increment_blocks"));
}
