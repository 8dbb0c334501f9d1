//! Integration tests for vendor favorites, series follows, and vendor pages

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serial_test::serial;

    use crate::test_utils::{send_json, test_app};

    #[tokio::test]
    #[serial]
    async fn it_toggles_vendor_favorites() {
        let (app, _db) = test_app().await;
        let uri = "/api/vendors/v1/favorite";

        let (status, body) = send_json(&app, "POST", uri, Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["favorited"], true);

        let (_, page) = send_json(&app, "GET", "/api/vendors/blue-note", Some("u1"), None).await;
        assert_eq!(page["is_favorite"], true);

        // Another user is unaffected
        let (_, page) = send_json(&app, "GET", "/api/vendors/blue-note", Some("u2"), None).await;
        assert_eq!(page["is_favorite"], false);

        let (_, body) = send_json(&app, "DELETE", uri, Some("u1"), None).await;
        assert_eq!(body["favorited"], false);
    }

    #[tokio::test]
    #[serial]
    async fn it_converges_after_a_double_toggle() {
        let (app, _db) = test_app().await;
        let uri = "/api/vendors/v2/favorite";
        send_json(&app, "POST", uri, Some("u1"), None).await;
        let (_, body) = send_json(&app, "POST", uri, Some("u1"), None).await;
        assert_eq!(body["favorited"], false);

        let (_, profile) = send_json(&app, "GET", "/api/profile", Some("u1"), None).await;
        assert!(profile["favorite_vendors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn it_follows_series() {
        let (app, _db) = test_app().await;
        let uri = "/api/series/s2/follow";

        let (status, body) = send_json(&app, "PUT", uri, Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["following"], true);

        let (_, body) = send_json(&app, "POST", uri, Some("u1"), None).await;
        assert_eq!(body["following"], false);

        let (status, body) = send_json(&app, "PUT", "/api/series/nope/follow", Some("u1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Series not found");

        let (status, _) = send_json(&app, "PUT", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn it_shows_vendor_pages_by_slug_or_id() {
        let (app, _db) = test_app().await;

        let (status, page) = send_json(&app, "GET", "/api/vendors/blue-note", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["name"], "Blue Note");
        assert_eq!(page["description"], "Live jazz");
        assert_eq!(page["is_favorite"], false);
        // jazz-now already started, old-show is past
        assert!(page["upcoming"].as_array().unwrap().is_empty());

        let (status, page) = send_json(&app, "GET", "/api/vendors/v1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["slug"], "blue-note");

        let (status, _) = send_json(&app, "GET", "/api/vendors/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
