#![allow(dead_code)]

use photoshare::config::Config;
use photoshare::routes;
use photoshare::state::AppState;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

/// A server bound to an ephemeral port with its own data directory.
pub struct TestServer {
    pub base_url: String,
    pub data_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut Config)) -> Self {
        let data_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        configure(&mut config);
        config.resolve_paths(data_dir.path());

        let state = AppState::init(config).expect("Failed to init app state");
        let app = routes::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            data_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn image_path(&self, file_name: &str) -> std::path::PathBuf {
        self.data_dir.path().join("images").join(file_name)
    }

    /// A fresh client with its own cookie jar.
    pub fn client(&self) -> Client {
        Client::builder().cookie_store(true).build().unwrap()
    }

    pub async fn register(&self, login_name: &str, password: &str, first: &str, last: &str) -> String {
        let response = self
            .client()
            .post(self.url("/user"))
            .json(&json!({
                "login_name": login_name,
                "password": password,
                "first_name": first,
                "last_name": last,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "register {}", login_name);
        let body: Value = response.json().await.unwrap();
        body["_id"].as_str().unwrap().to_string()
    }

    /// Register and log in, returning the logged-in client and the user id.
    pub async fn user(&self, login_name: &str) -> (Client, String) {
        let id = self
            .register(login_name, "pw1", &capitalize(login_name), "Tester")
            .await;
        let client = self.client();
        self.login(&client, login_name, "pw1").await;
        (client, id)
    }

    pub async fn login(&self, client: &Client, login_name: &str, password: &str) {
        let response = client
            .post(self.url("/admin/login"))
            .json(&json!({ "login_name": login_name, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "login {}", login_name);
    }

    /// Upload a small PNG. `sharing_list` is the raw form value, if any.
    pub async fn upload(&self, client: &Client, sharing_list: Option<&str>) -> Value {
        let response = self.upload_raw(client, sharing_list).await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    pub async fn upload_raw(&self, client: &Client, sharing_list: Option<&str>) -> reqwest::Response {
        let part = Part::bytes(b"\x89PNG\r\n\x1a\nfake".to_vec())
            .file_name("cat.png")
            .mime_str("image/png")
            .unwrap();
        let mut form = Form::new().part("photo", part);
        if let Some(sharing) = sharing_list {
            form = form.text("sharing_list", sharing.to_string());
        }
        client
            .post(self.url("/photos/new"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn get_json(&self, client: &Client, path: &str) -> Value {
        let response = client.get(self.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {}", path);
        response.json().await.unwrap()
    }

    pub async fn comment(&self, client: &Client, photo_id: &str, text: &str) -> reqwest::Response {
        client
            .post(self.url(&format!("/commentsOfPhoto/{}", photo_id)))
            .json(&json!({ "comment": text }))
            .send()
            .await
            .unwrap()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|v| v["_id"].as_str().unwrap().to_string())
        .collect()
}

pub fn counts_for<'a>(counts: &'a Value, user_id: &str) -> &'a Value {
    counts
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["_id"] == user_id)
        .unwrap()
}
