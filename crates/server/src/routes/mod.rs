use axum::Router;

use crate::Deployment;

pub mod artists;
pub mod collaborators;
pub mod currency;
pub mod events;
pub mod health;
pub mod invites;
pub mod notifications;
pub mod realtime;
pub mod users;

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let api = Router::new()
        .merge(users::router(deployment))
        .merge(artists::router(deployment))
        .merge(collaborators::router(deployment))
        .merge(events::router(deployment))
        .merge(invites::router(deployment))
        .merge(notifications::router(deployment))
        .merge(realtime::router(deployment))
        .merge(currency::router(deployment));

    Router::new()
        .merge(health::router(deployment))
        .nest("/api", api)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use std::time::Duration;

    use db::DBService;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{Deployment, app, auth::USER_ID_HEADER, config::Config};

    async fn test_app() -> axum::Router {
        let db = DBService::new_in_memory().await.unwrap();
        app(Deployment::from_parts(db, Config::default()))
    }

    async fn send(
        app: &axum::Router,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn register(app: &axum::Router, email: &str, name: &str) -> Uuid {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "email": email, "display_name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    fn id_of(body: &Value) -> String {
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn open_changes(app: &axum::Router, artist_id: &str, user: Uuid) -> (StatusCode, Body) {
        let request = Request::builder()
            .uri(format!("/api/artists/{artist_id}/changes"))
            .header(USER_ID_HEADER, user.to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        (response.status(), response.into_body())
    }

    /// Everything the change stream sends until it closes
    async fn read_to_end(body: &mut Body) -> String {
        let mut text = String::new();
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
                .await
                .expect("change stream stayed open");
            match frame {
                Some(frame) => {
                    if let Ok(data) = frame.unwrap().into_data() {
                        text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                None => return text,
            }
        }
    }

    async fn create_artist(app: &axum::Router, owner: Uuid, name: &str) -> String {
        let (status, artist) = send(
            app,
            Method::POST,
            "/api/artists",
            Some(owner),
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{artist}");
        id_of(&artist)
    }

    async fn create_event(app: &axum::Router, user: Uuid, artist_id: &str) -> String {
        let (status, event) = send(
            app,
            Method::POST,
            &format!("/api/artists/{artist_id}/events"),
            Some(user),
            Some(json!({
                "title": "Ensaio",
                "event_date": "2025-07-01",
                "start_time": "19:00:00",
                "tag": "rehearsal"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{event}");
        id_of(&event)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_requests_without_user_are_rejected() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/artists", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) =
            send(&app, Method::GET, "/api/artists", Some(Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let app = test_app().await;
        register(&app, "ana@example.com", "Ana").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "email": "ANA@example.com", "display_name": "Ana 2" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_sole_owner_must_transfer_before_leaving() {
        let app = test_app().await;
        let ana = register(&app, "ana@example.com", "Ana").await;
        let bia = register(&app, "bia@example.com", "Bia").await;

        let (status, artist) = send(
            &app,
            Method::POST,
            "/api/artists",
            Some(ana),
            Some(json!({ "name": "Banda Azul" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{artist}");
        let artist_id = id_of(&artist);

        // Cached list for Ana, invalidated later by the transfer
        let (_, listed) = send(&app, Method::GET, "/api/artists", Some(ana), None).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let (status, invite) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{artist_id}/invites"),
            Some(ana),
            Some(json!({ "email": "bia@example.com", "role": "editor" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{invite}");
        let invite_id = id_of(&invite);

        let (_, pending) = send(&app, Method::GET, "/api/invites", Some(bia), None).await;
        assert_eq!(pending["data"].as_array().unwrap().len(), 1);
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/invites/{invite_id}/accept"),
            Some(bia),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, assessment) = send(
            &app,
            Method::GET,
            &format!("/api/artists/{artist_id}/leave"),
            Some(ana),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(assessment["data"]["action"], "transfer_ownership");

        let (status, refused) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{artist_id}/leave"),
            Some(ana),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(refused["error_data"]["action"], "transfer_ownership");
        assert_eq!(refused["error_data"]["total_collaborators"], 2);

        let (status, transfer) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{artist_id}/transfer-ownership"),
            Some(ana),
            Some(json!({ "new_owner_id": bia, "leave": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{transfer}");
        assert_eq!(transfer["data"]["left"], true);

        let (_, listed) = send(&app, Method::GET, "/api/artists", Some(ana), None).await;
        assert!(listed["data"].as_array().unwrap().is_empty());

        let (_, listed) = send(&app, Method::GET, "/api/artists", Some(bia), None).await;
        assert_eq!(listed["data"][0]["role"], "owner");
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_events() {
        let app = test_app().await;
        let ana = register(&app, "ana@example.com", "Ana").await;
        let caio = register(&app, "caio@example.com", "Caio").await;
        let (_, artist) = send(
            &app,
            Method::POST,
            "/api/artists",
            Some(ana),
            Some(json!({ "name": "Trio" })),
        )
        .await;
        let artist_id = id_of(&artist);

        let (_, invite) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{artist_id}/invites"),
            Some(ana),
            Some(json!({ "email": "caio@example.com", "role": "viewer" })),
        )
        .await;
        send(
            &app,
            Method::POST,
            &format!("/api/invites/{}/accept", id_of(&invite)),
            Some(caio),
            None,
        )
        .await;

        let event = json!({
            "title": "Show no bar",
            "event_date": "2025-06-14",
            "start_time": "21:00:00",
            "value_cents": 150000
        });
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{artist_id}/events"),
            Some(caio),
            Some(event.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{artist_id}/events"),
            Some(ana),
            Some(event),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{created}");

        let (_, listed) = send(
            &app,
            Method::GET,
            &format!("/api/artists/{artist_id}/events?year=2025&month=6"),
            Some(caio),
            None,
        )
        .await;
        assert_eq!(listed["data"][0]["title"], "Show no bar");
        assert!(listed["data"][0]["value_cents"].is_null());

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/artists/{artist_id}/finances?year=2025&month=6"),
            Some(caio),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, finances) = send(
            &app,
            Method::GET,
            &format!("/api/artists/{artist_id}/finances?year=2025&month=6"),
            Some(ana),
            None,
        )
        .await;
        assert_eq!(finances["data"]["revenue_cents"], 150000);
    }

    #[tokio::test]
    async fn test_change_stream_closes_for_removed_collaborator() {
        let app = test_app().await;
        let ana = register(&app, "ana@example.com", "Ana").await;
        let bia = register(&app, "bia@example.com", "Bia").await;
        let caio = register(&app, "caio@example.com", "Caio").await;
        let watched = create_artist(&app, ana, "Banda Azul").await;
        let other = create_artist(&app, ana, "Banda Verde").await;

        let (_, invite) = send(
            &app,
            Method::POST,
            &format!("/api/artists/{watched}/invites"),
            Some(ana),
            Some(json!({ "email": "bia@example.com", "role": "editor" })),
        )
        .await;
        send(
            &app,
            Method::POST,
            &format!("/api/invites/{}/accept", id_of(&invite)),
            Some(bia),
            None,
        )
        .await;

        let (status, _) = open_changes(&app, &watched, caio).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, mut body) = open_changes(&app, &watched, bia).await;
        assert_eq!(status, StatusCode::OK);

        let elsewhere = create_event(&app, ana, &other).await;
        let seen = create_event(&app, ana, &watched).await;
        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/artists/{watched}/collaborators/{bia}"),
            Some(ana),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let after_removal = create_event(&app, ana, &watched).await;

        let text = read_to_end(&mut body).await;
        assert!(text.contains("event: events"), "{text}");
        assert!(text.contains(&seen), "{text}");
        assert!(text.contains("event: artist_collaborators"), "{text}");
        assert!(!text.contains(&elsewhere), "{text}");
        assert!(!text.contains(&after_removal), "{text}");
    }

    #[tokio::test]
    async fn test_change_stream_delivers_artist_deletion() {
        let app = test_app().await;
        let ana = register(&app, "ana@example.com", "Ana").await;
        let artist_id = create_artist(&app, ana, "Duo").await;

        let (_, listed) = send(&app, Method::GET, "/api/artists", Some(ana), None).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let (status, mut body) = open_changes(&app, &artist_id, ana).await;
        assert_eq!(status, StatusCode::OK);

        let (status, report) = send(
            &app,
            Method::DELETE,
            &format!("/api/artists/{artist_id}"),
            Some(ana),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{report}");

        let text = read_to_end(&mut body).await;
        assert!(text.contains("event: artists"), "{text}");
        assert!(text.contains(r#""kind":"delete""#), "{text}");

        let (_, listed) = send(&app, Method::GET, "/api/artists", Some(ana), None).await;
        assert!(listed["data"].as_array().unwrap().is_empty());
    }
}
