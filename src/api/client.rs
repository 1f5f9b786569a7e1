use super::models::{
    ChatHistoryMessage, ChatRoom, ChatRoomSummary, LoginRequest, LoginResponse,
    NicknameSuggestion, Product, SignupRequest, SignupResponse, UserInfo,
};
use crate::types::constants::{DEFAULT_API_BASE, SESSION_COOKIE};
use crate::types::{ChatError, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Cookie-authenticated client for the marketplace REST API.
///
/// Login stores the httpOnly `token` cookie in an internal jar; every later
/// call sends it back, and [`session_cookie`](Self::session_cookie) exposes
/// it for the WebSocket handshake.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    cookies: Arc<Jar>,
}

impl ApiClient {
    /// Client for the backend's local development address
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_API_BASE)
    }

    pub fn new(base: &str) -> Result<Self> {
        let base = normalize_base(base)?;
        let cookies = Arc::new(Jar::default());
        let http = Client::builder().cookie_provider(cookies.clone()).build()?;

        Ok(Self {
            http,
            base,
            cookies,
        })
    }

    /// Reuses a session token obtained elsewhere
    pub fn with_session_token(self, token: &str) -> Self {
        self.cookies
            .add_cookie_str(&format!("{}={}; Path=/", SESSION_COOKIE, token), &self.base);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `Cookie` header value the backend expects on the WebSocket handshake
    pub fn session_cookie(&self) -> Option<String> {
        let header = self.cookies.cookies(&self.base)?;
        header.to_str().ok().map(str::to_string)
    }

    /// Value of the `token` cookie alone
    pub fn session_token(&self) -> Option<String> {
        let cookie = self.session_cookie()?;
        cookie.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then(|| value.to_string())
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let response: LoginResponse = self
            .send_json(Method::POST, "users/login", &LoginRequest { email, password })
            .await?;

        if self.session_cookie().is_none()
            && let Some(token) = &response.token
        {
            self.cookies
                .add_cookie_str(&format!("{}={}; Path=/", SESSION_COOKIE, token), &self.base);
        }

        tracing::debug!("Logged in as {}", response.nickname);
        Ok(response)
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        nickname: &str,
    ) -> Result<SignupResponse> {
        let body = SignupRequest {
            email,
            password,
            nickname,
        };
        self.send_json(Method::POST, "users/signup", &body).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.execute(self.request(Method::POST, "users/logout")?).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<UserInfo> {
        self.get_json("users/me").await
    }

    pub async fn suggest_nickname(&self, base: &str) -> Result<NicknameSuggestion> {
        let request = self
            .request(Method::GET, "users/nickname/suggest")?
            .query(&[("base", base)]);
        read_json(self.execute(request).await?).await
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        self.get_json("products").await
    }

    pub async fn product(&self, product_id: u64) -> Result<Product> {
        self.get_json(&format!("products/{}", product_id)).await
    }

    /// Opens (or returns the existing) room between the caller and the
    /// product's seller
    pub async fn create_chat_room(&self, product_id: u64) -> Result<ChatRoom> {
        let request = self.request(Method::POST, &format!("chatrooms/{}", product_id))?;
        read_json(self.execute(request).await?).await
    }

    pub async fn chat_rooms(&self) -> Result<Vec<ChatRoomSummary>> {
        self.get_json("chatrooms").await
    }

    pub async fn chat_messages(&self, room_id: u64) -> Result<Vec<ChatHistoryMessage>> {
        self.get_json(&format!("chatrooms/{}/messages", room_id)).await
    }

    pub async fn mark_as_read(&self, room_id: u64) -> Result<()> {
        let request = self.request(Method::PATCH, &format!("chatrooms/{}/read", room_id))?;
        self.execute(request).await?;
        Ok(())
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        read_json(self.execute(self.request(Method::GET, path)?).await?).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.request(method, path)?.json(body);
        read_json(self.execute(request).await?).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} answered {}", url, status);

        Err(ChatError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn normalize_base(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ChatError::Connection(format!(
            "unsupported API scheme '{}', expected http or https",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Prefers the backend's `message` (or `error`) field, then the raw body,
/// then the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(text)) = fields.get(key) {
                return text.clone();
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}
