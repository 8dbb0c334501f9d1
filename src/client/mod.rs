//! HTTP client for the nearby API, used by the map controller and the
//! favorite toggles.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::auth::USER_ID_HEADER;
use crate::api::public::map::{EventPin, MapSearchQuery};
use crate::explore::ExploreCard;
use crate::favorites::{FavoriteKind, FavoriteMutation, ToggleError};
use crate::map::{MapConfig, PinSource};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Please sign in")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    user_id: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: None,
        }
    }

    /// Client for the server a map is configured to query.
    pub fn for_map(config: &MapConfig) -> Self {
        Self::new(&config.api_base_url)
    }

    /// Send requests as `user_id`, as the auth proxy would.
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");
        match &self.user_id {
            Some(user_id) => req.header(USER_ID_HEADER, user_id),
            None => req,
        }
    }

    async fn check(resp: Response) -> Result<Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                let message = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|v| v["error"].as_str().map(str::to_string))
                    .unwrap_or(body);
                Err(ClientError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let body = Self::check(resp).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn map_search(&self, query: &MapSearchQuery) -> Result<Vec<EventPin>, ClientError> {
        let resp = self
            .request(Method::GET, "/api/map/search")
            .query(query)
            .send()
            .await?;
        Self::json(resp).await
    }

    pub async fn explore(
        &self,
        search: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<ExploreCard>, ClientError> {
        let mut params = vec![];
        if let Some(search) = search {
            params.push(("search", search));
        }
        if let Some(category) = category {
            params.push(("category", category));
        }
        let resp = self
            .request(Method::GET, "/api/explore")
            .query(&params)
            .send()
            .await?;
        Self::json(resp).await
    }

    /// Calendar file for an event
    pub async fn event_ics(&self, event_id: &str, reminder_days: u32) -> Result<String, ClientError> {
        let path = format!("/api/events/{}/ics", urlencoding::encode(event_id));
        let resp = self
            .request(Method::GET, &path)
            .query(&[("reminderDays", reminder_days)])
            .send()
            .await?;
        Ok(Self::check(resp).await?.text().await?)
    }

    /// Flip membership server side and return the new state.
    pub async fn toggle_favorite(&self, kind: FavoriteKind, entity_id: &str) -> Result<bool, ClientError> {
        self.mutate(Method::POST, kind, entity_id).await
    }

    /// Set membership to `on` and return the resulting state. Idempotent.
    pub async fn put_favorite(
        &self,
        kind: FavoriteKind,
        entity_id: &str,
        on: bool,
    ) -> Result<bool, ClientError> {
        let method = if on { Method::PUT } else { Method::DELETE };
        self.mutate(method, kind, entity_id).await
    }

    async fn mutate(&self, method: Method, kind: FavoriteKind, entity_id: &str) -> Result<bool, ClientError> {
        let resp = self.request(method, &kind.path(entity_id)).send().await?;
        let body: Value = Self::json(resp).await?;
        body[kind.response_key()].as_bool().ok_or_else(|| {
            ClientError::Decode(format!("missing `{}` in {}", kind.response_key(), body))
        })
    }
}

#[async_trait]
impl PinSource for ApiClient {
    async fn search_pins(&self, query: &MapSearchQuery) -> anyhow::Result<Vec<EventPin>> {
        Ok(self.map_search(query).await?)
    }
}

#[async_trait]
impl FavoriteMutation for ApiClient {
    async fn set_favorite(&self, kind: FavoriteKind, entity_id: &str, on: bool) -> Result<bool, ToggleError> {
        self.put_favorite(kind, entity_id, on)
            .await
            .map_err(|err| match err {
                ClientError::Unauthorized => ToggleError::SignInRequired,
                ClientError::NotFound => ToggleError::NotFound(kind.label()),
                other => ToggleError::Failed(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Bounds, DistanceFilter};
    use crate::time_window::TimeFilter;
    use mockito::Matcher;

    #[tokio::test]
    async fn it_searches_pins_with_viewport_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/map/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("minLng".into(), "-81.0".into()),
                Matcher::UrlEncoded("maxLat".into(), "36.0".into()),
                Matcher::UrlEncoded("radius".into(), "10.0".into()),
                Matcher::UrlEncoded("when".into(), "this-week".into()),
                Matcher::UrlEncoded("tz".into(), "America/New_York".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{
                    "id": "e1",
                    "title": "Jazz Night",
                    "starts_at": "2024-06-15T22:00:00.000Z",
                    "ends_at": null,
                    "address": "1 Main St",
                    "latitude": 35.2,
                    "longitude": -80.8,
                    "vendorId": "v1",
                    "vendorName": "Blue Note",
                    "vendorSlug": "blue-note"
                }]"#,
            )
            .create_async()
            .await;

        let config = MapConfig {
            api_base_url: format!("{}/", server.url()),
            ..MapConfig::default()
        };
        let client = ApiClient::for_map(&config);
        let query = MapSearchQuery::for_viewport(
            Bounds::new(-81.0, 35.0, -80.0, 36.0).unwrap(),
            TimeFilter::ThisWeek,
            Some(DistanceFilter::miles(10.0).unwrap()),
            chrono_tz::America::New_York,
        );
        let pins = client.search_pins(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].vendor_slug.as_deref(), Some("blue-note"));
        assert_eq!(pins[0].description, None);
    }

    #[tokio::test]
    async fn it_sets_favorites_with_put_and_delete() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", "/api/events/e1/star")
            .match_header("x-user-id", "u1")
            .with_status(200)
            .with_body(r#"{"starred": true}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/vendors/v1/favorite")
            .match_header("x-user-id", "u1")
            .with_status(200)
            .with_body(r#"{"favorited": false}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).with_user("u1");
        assert!(client.set_favorite(FavoriteKind::Event, "e1", true).await.unwrap());
        assert!(!client.set_favorite(FavoriteKind::Vendor, "v1", false).await.unwrap());
        put.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn it_maps_unauthorized_to_sign_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/series/s1/follow")
            .with_status(401)
            .with_body(r#"{"error": "Please sign in"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        let result = client.set_favorite(FavoriteKind::Series, "s1", true).await;
        assert_eq!(result, Err(ToggleError::SignInRequired));
    }

    #[tokio::test]
    async fn it_reports_server_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/map/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": "Invalid bbox"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/events/missing/star")
            .with_status(404)
            .with_body(r#"{"error": "Event not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).with_user("u1");
        let err = client.map_search(&MapSearchQuery::default()).await.unwrap_err();
        assert!(
            matches!(&err, ClientError::Status { status: 400, message } if message == "Invalid bbox"),
            "{err:?}"
        );
        let err = client
            .toggle_favorite(FavoriteKind::Event, "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
    }

    #[tokio::test]
    async fn it_fetches_ics() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/events/e1/ics")
            .match_query(Matcher::UrlEncoded("reminderDays".into(), "3".into()))
            .with_status(200)
            .with_header("content-type", "text/calendar; charset=utf-8")
            .with_body("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        let ics = client.event_ics("e1", 3).await.unwrap();
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
    }
}
