#![allow(dead_code)]

use axum::body::Body;
use http_body_util::BodyExt;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;

pub const STRONG_PASSWORD: &str = "Str0ngPassw0rd";

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub media_root: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let media_root = std::env::temp_dir().join(format!("recipes-media-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&media_root).unwrap();

        let router = recipes::build_app(pool.clone(), media_root.clone(), false)
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            media_root,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create a user directly in the database and return its id.
    /// The stored hash is not usable for login; use `register` for that.
    pub async fn create_user(&self, username: &str, email: &str) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (username, first_name, last_name, email, password, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind("Test")
        .bind("User")
        .bind(email)
        .bind("not-a-hash")
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test user")
        .last_insert_rowid()
    }

    pub async fn create_tag(&self, name: &str) -> i64 {
        sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
            .bind(name)
            .bind(name.to_lowercase().replace(' ', "-"))
            .execute(&self.db)
            .await
            .expect("Failed to create test tag")
            .last_insert_rowid()
    }

    pub async fn create_category(&self, name: &str) -> i64 {
        sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.db)
            .await
            .expect("Failed to create test category")
            .last_insert_rowid()
    }

    /// Insert a recipe row with the given cover and return its id.
    pub async fn create_recipe(
        &self,
        title: &str,
        author_id: Option<i64>,
        is_published: bool,
        cover: Option<&str>,
    ) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO recipes (title, description, slug, preparation_time, preparation_time_unit,
                                 is_published, cover, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind("A test recipe")
        .bind(title.to_lowercase().replace(' ', "-"))
        .bind(30)
        .bind("minutes")
        .bind(is_published)
        .bind(cover)
        .bind(author_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test recipe")
        .last_insert_rowid()
    }

    pub async fn tag_recipe(&self, recipe_id: i64, tag_id: i64) {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&self.db)
            .await
            .expect("Failed to tag recipe");
    }

    /// Write a file under the media root and return its relative path.
    pub fn write_media(&self, relative: &str) -> String {
        let path = self.media_root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"fake image bytes").unwrap();
        relative.to_string()
    }

    pub fn media_exists(&self, relative: &str) -> bool {
        self.media_root.join(relative).exists()
    }

    pub async fn stored_cover(&self, recipe_id: i64) -> Option<String> {
        let (cover,): (Option<String>,) = sqlx::query_as("SELECT cover FROM recipes WHERE id = ?")
            .bind(recipe_id)
            .fetch_one(&self.db)
            .await
            .unwrap();
        cover
    }

    /// Register through the form and log in, returning the session cookie.
    pub async fn register_and_login(&self, username: &str, email: &str) -> String {
        let body = format!(
            "username={username}&first_name=Jane&last_name=Doe&email={}&password={STRONG_PASSWORD}&confirm_password={STRONG_PASSWORD}",
            email.replace('@', "%40")
        );
        let resp = self.post_form("/authors/register", &body, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let resp = self
            .post_form(
                "/authors/login",
                &format!("username={username}&password={STRONG_PASSWORD}"),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        session_cookie(&resp)
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a POST form request with an optional session cookie.
    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    /// Send a JSON request with the given method.
    pub async fn send_json(&self, method: &str, uri: &str, body: serde_json::Value) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(req).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("DELETE")
            .body(Body::empty())
            .unwrap();
        self.request(req).await
    }

    /// Upload a single multipart file under the `cover` field.
    pub async fn upload_cover(&self, uri: &str, file_name: &str, bytes: &[u8]) -> Response {
        let boundary = "X-RECIPES-TEST-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"cover\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .uri(uri)
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.request(req).await
    }
}

/// Extract the session cookie pair from a response.
pub fn session_cookie(resp: &Response) -> String {
    resp.headers()
        .get("set-cookie")
        .expect("Response should set a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    let body = body_string(resp).await;
    serde_json::from_str(&body).unwrap_or_else(|e| panic!("invalid JSON {body:?}: {e}"))
}

/// Assert that a response is a redirect to the given location.
pub fn assert_redirect(resp: &Response, expected_location: &str) {
    assert!(
        resp.status().is_redirection(),
        "Expected redirect, got {}",
        resp.status()
    );
    let location = resp
        .headers()
        .get("location")
        .expect("Redirect should have location header")
        .to_str()
        .unwrap();
    assert_eq!(location, expected_location);
}
