//! Integration tests for the map search endpoint

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;
    use serial_test::serial;

    use crate::test_utils::{CLT, send, send_json, test_app};

    fn ids(body: &Value) -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|pin| pin["id"].as_str().unwrap().to_string())
            .collect()
    }

    const CAROLINAS: &str = "minLng=-82&minLat=34&maxLng=-78&maxLat=36.5";

    #[tokio::test]
    #[serial]
    async fn it_searches_the_viewport_for_today() {
        let (app, _db) = test_app().await;
        let (status, body) =
            send_json(&app, "GET", &format!("/api/map/search?{}", CAROLINAS), None, None).await;

        assert_eq!(status, StatusCode::OK);
        let found = ids(&body);
        assert!(found.contains(&"jazz-now".to_string()));
        assert!(found.contains(&"raleigh-now".to_string()));
        // Cancelled, past, and future events are excluded
        assert!(!found.contains(&"cancelled-now".to_string()));
        assert!(!found.contains(&"old-show".to_string()));
        assert!(!found.contains(&"market-later".to_string()));

        let jazz = body
            .as_array()
            .unwrap()
            .iter()
            .find(|pin| pin["id"] == "jazz-now")
            .unwrap();
        assert_eq!(jazz["vendorSlug"], "blue-note");
        assert_eq!(jazz["vendorName"], "Blue Note");
        assert_eq!(jazz["address"], "1 Main St, Charlotte");
    }

    #[tokio::test]
    #[serial]
    async fn it_widens_the_window_with_when() {
        let (app, _db) = test_app().await;
        let (_, body) = send_json(
            &app,
            "GET",
            &format!("/api/map/search?{}&when=anytime", CAROLINAS),
            None,
            None,
        )
        .await;
        let found = ids(&body);
        assert!(found.contains(&"market-later".to_string()));
        assert!(!found.contains(&"old-show".to_string()));
    }

    #[tokio::test]
    #[serial]
    async fn it_narrows_to_a_radius() {
        let (app, _db) = test_app().await;
        let uri = format!(
            "/api/map/search?{}&lat={}&lng={}&radius=20",
            CAROLINAS, CLT.0, CLT.1
        );
        let (status, body) = send_json(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["jazz-now"]);

        // Circle only
        let uri = format!("/api/map/search?lat={}&lng={}&radius=5", CLT.0, CLT.1);
        let (status, body) = send_json(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["jazz-now"]);
    }

    #[tokio::test]
    #[serial]
    async fn it_rejects_invalid_bounds() {
        let (app, _db) = test_app().await;

        for query in [
            "minLng=NaN&minLat=34&maxLng=-78&maxLat=36",
            "minLng=abc&minLat=34&maxLng=-78&maxLat=36",
            "minLng=&minLat=34&maxLng=-78&maxLat=36",
            "lat=north&lng=-80.8&radius=5",
            "lat=35.2&lng=-80.8&radius=far",
            "minLng=-82&minLat=-95&maxLng=-78&maxLat=36",
            "minLng=-82&minLat=34",
            "",
        ] {
            let (status, body) =
                send_json(&app, "GET", &format!("/api/map/search?{}", query), None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "query {:?}", query);
            assert_eq!(body["error"], "Invalid bbox");
        }
    }

    #[tokio::test]
    #[serial]
    async fn it_rejects_unknown_filters_and_timezones() {
        let (app, _db) = test_app().await;

        let (status, body) = send_json(
            &app,
            "GET",
            &format!("/api/map/search?{}&when=someday", CAROLINAS),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("someday"));

        let (status, body) = send_json(
            &app,
            "GET",
            &format!("/api/map/search?{}&tz=Mars/Olympus", CAROLINAS),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown timezone Mars/Olympus");

        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/map/search?{}&tz=America/New_York", CAROLINAS),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    #[serial]
    async fn it_normalizes_inverted_bounds() {
        let (app, _db) = test_app().await;
        let (status, body) = send_json(
            &app,
            "GET",
            "/api/map/search?minLng=-78&minLat=36.5&maxLng=-82&maxLat=34",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(ids(&body).contains(&"jazz-now".to_string()));
    }
}
