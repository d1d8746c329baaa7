//! Integration tests for resource handles using wiremock
//!
//! These tests drive the real client and handles against mocked endpoints,
//! checking request paths, verbs, parameters and how responses end up in (or
//! stay out of) the cached snapshot.

use nitrapi::resource::gameserver::Query;
use nitrapi::{
    AccessToken, CloudServer, CloudServerStatus, Error, Gameserver, GameserverStatus, Nitrapi,
    Service,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{bearer_token, body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> Nitrapi {
    Nitrapi::new(AccessToken::new("test-token").unwrap())
        .unwrap()
        .with_base_url(&server.uri())
        .unwrap()
        .with_application_name("test-app")
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": data}))
}

/// Serve one canned JSON response, then stop listening so later connects
/// are refused
async fn one_shot_server(body: serde_json::Value) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 8192];
        let _ = socket.read(&mut request).await.unwrap();
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

fn service(id: u64, status: &str, kind: &str) -> Service {
    serde_json::from_value(json!({"id": id, "status": status, "type": kind})).unwrap()
}

/// Tests for the refresh/hydration lifecycle
mod hydration_tests {
    use super::*;

    /// Test refresh installs the snapshot found under the resource key
    #[tokio::test]
    async fn test_refresh_hydrates_cloud_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cloud_server": {"status": "running", "hostname": "foo"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut cloud = CloudServer::new(client(&server).await, 42);
        assert!(cloud.hostname().is_none());

        cloud.refresh().await.expect("refresh should succeed");

        let status = cloud.cloud_server_status().expect("status should be set");
        assert_eq!(status, &CloudServerStatus::RUNNING);
        assert_eq!(status.to_string(), "running");
        assert_eq!(cloud.hostname(), Some("foo"));
        // Not part of the response, so still absent
        assert!(cloud.is_dynamic().is_none());
        assert!(cloud.hardware().is_none());
    }

    /// Test the `data` envelope is unwrapped before looking up the key
    #[tokio::test]
    async fn test_refresh_unwraps_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/7/gameservers"))
            .respond_with(ok(json!({"gameserver": {
                "status": "started",
                "game": "cs2",
                "slots": 12,
                "query": {"map": "de_dust2", "player_current": 4}
            }})))
            .mount(&server)
            .await;

        let mut gs = Gameserver::new(client(&server).await, 7);
        gs.refresh().await.unwrap();

        assert_eq!(gs.gameserver_status(), Some(&GameserverStatus::STARTED));
        assert_eq!(gs.game(), Some("cs2"));
        assert_eq!(gs.slots(), Some(12));
        assert_eq!(gs.query().and_then(|q| q.map.as_deref()), Some("de_dust2"));
    }

    /// Test unknown status tokens decode and keep their wire form
    #[tokio::test]
    async fn test_unknown_status_is_preserved() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/7/gameservers"))
            .respond_with(ok(json!({"gameserver": {"status": "quantum_tunneling"}})))
            .mount(&server)
            .await;

        let mut gs = Gameserver::new(client(&server).await, 7);
        gs.refresh().await.unwrap();

        let status = gs.gameserver_status().unwrap();
        assert!(!status.is_known());
        assert_eq!(status.to_string(), "quantum_tunneling");
    }

    /// Test a failed refresh keeps the previous snapshot readable
    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .respond_with(ok(json!({"cloud_server": {"hostname": "old"}})))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "status": "error",
                "message": "Maintenance"
            })))
            .mount(&server)
            .await;

        let mut cloud = CloudServer::new(client(&server).await, 42);
        cloud.refresh().await.unwrap();

        let err = cloud.refresh().await.expect_err("second refresh should fail");
        match err {
            Error::Api { status, ref message } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(message, "Maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(cloud.hostname(), Some("old"));
    }

    /// Test a failed first refresh leaves the handle unhydrated
    #[tokio::test]
    async fn test_failed_first_refresh_stays_unhydrated() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/9/gameservers"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "message": "Invalid token"
            })))
            .mount(&server)
            .await;

        let mut gs = Gameserver::new(client(&server).await, 9);
        let err = gs.refresh().await.unwrap_err();

        assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
        assert!(!err.is_decode());
        assert!(!gs.is_hydrated());
        assert!(gs.game().is_none());
    }

    /// Test an unreachable endpoint is a transport error, not a rejection
    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let api = Nitrapi::new(AccessToken::new("test-token").unwrap())
            .unwrap()
            .with_base_url("http://127.0.0.1:9")
            .unwrap();

        let mut cloud = CloudServer::new(api, 42);
        let err = cloud.refresh().await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(!err.is_decode());
        assert!(err.status().is_none());
        assert!(!cloud.is_hydrated());
    }

    /// Test a network failure after hydration keeps the previous snapshot
    #[tokio::test]
    async fn test_transport_failure_keeps_snapshot() {
        let snapshot = json!({"cloud_server": {"status": "running", "hostname": "foo"}});
        let (uri, served) = one_shot_server(snapshot).await;
        let api = Nitrapi::new(AccessToken::new("test-token").unwrap())
            .unwrap()
            .with_base_url(&uri)
            .unwrap();

        let mut cloud = CloudServer::new(api, 42);
        cloud.refresh().await.unwrap();
        served.await.unwrap();

        let err = cloud.refresh().await.expect_err("listener is gone");
        assert!(matches!(err, Error::Transport(_)));
        assert!(!err.is_decode());
        assert!(err.status().is_none());
        assert_eq!(cloud.hostname(), Some("foo"));
        assert_eq!(cloud.cloud_server_status(), Some(&CloudServerStatus::RUNNING));
    }

    /// Test timestamps in an unexpected format do not fail the refresh
    #[tokio::test]
    async fn test_numeric_timestamp_does_not_fail_refresh() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/7/gameservers"))
            .respond_with(ok(json!({"gameserver": {
                "game": "cs2",
                "game_specific": {"last_update": 1714540800}
            }})))
            .mount(&server)
            .await;

        let mut gs = Gameserver::new(client(&server).await, 7);
        gs.refresh().await.unwrap();

        assert_eq!(gs.game(), Some("cs2"));
        assert_eq!(gs.last_update().map(|t| t.timestamp()), Some(1714540800));
    }

    /// Test a body without the resource key is a decode error
    #[tokio::test]
    async fn test_missing_key_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .respond_with(ok(json!({"something_else": {}})))
            .mount(&server)
            .await;

        let mut cloud = CloudServer::new(client(&server).await, 42);
        let err = cloud.refresh().await.unwrap_err();

        assert!(err.is_decode());
        assert!(matches!(err, Error::MissingKey(ref key) if key == "cloud_server"));
        assert!(!cloud.is_hydrated());
    }

    /// Test a non-JSON success body is a decode error, not an API error
    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let mut cloud = CloudServer::new(client(&server).await, 42);
        let err = cloud.refresh().await.unwrap_err();
        assert!(err.is_decode());
        assert!(err.status().is_none());
    }

    /// Test active and suspended services are hydrated on load
    #[tokio::test]
    async fn test_load_hydrates_active_service() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/7/gameservers"))
            .respond_with(ok(json!({"gameserver": {"game": "mcr"}})))
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server).await;
        let active = Gameserver::load(api.clone(), &service(7, "active", "gameserver"))
            .await
            .unwrap();
        let suspended = Gameserver::load(api, &service(7, "suspended", "gameserver"))
            .await
            .unwrap();

        assert!(active.is_minecraft_game());
        assert!(suspended.is_hydrated());
    }

    /// Test other lifecycle states skip the initial fetch
    #[tokio::test]
    async fn test_load_skips_deleted_service() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .respond_with(ok(json!({"cloud_server": {}})))
            .expect(0)
            .mount(&server)
            .await;

        let deleted = service(42, "deleted", "cloud_server");
        let cloud = CloudServer::load(client(&server).await, &deleted)
            .await
            .unwrap();
        assert!(!cloud.is_hydrated());
        assert!(cloud.cloud_server_status().is_none());
    }

    /// Test pushed updates survive until the next refresh resets them
    #[tokio::test]
    async fn test_refresh_resets_pushed_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/7/gameservers"))
            .respond_with(ok(json!({"gameserver": {
                "status": "stopped",
                "query": {"server_name": "Test", "player_current": 0}
            }})))
            .mount(&server)
            .await;

        let mut gs = Gameserver::new(client(&server).await, 7);
        gs.refresh().await.unwrap();

        gs.update_status(GameserverStatus::STARTED);
        gs.update_query(Query {
            player_current: Some(3),
            ..Default::default()
        });
        assert_eq!(gs.gameserver_status(), Some(&GameserverStatus::STARTED));
        assert_eq!(gs.query().and_then(|q| q.player_current), Some(3));
        assert_eq!(gs.query().and_then(|q| q.server_name.as_deref()), Some("Test"));

        gs.refresh().await.unwrap();
        assert_eq!(gs.gameserver_status(), Some(&GameserverStatus::STOPPED));
        assert_eq!(gs.query().and_then(|q| q.player_current), Some(0));
    }
}

/// Tests for mutating operations and sub-resource fetches
mod operation_tests {
    use super::*;

    /// Test restoring a backup posts to the backup path without parameters
    #[tokio::test]
    async fn test_restore_backup_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers"))
            .respond_with(ok(json!({"cloud_server": {"status": "running"}})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/services/42/cloud_servers/backups/42/restore"))
            .and(bearer_token("test-token"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut cloud = CloudServer::new(client(&server).await, 42);
        cloud.refresh().await.unwrap();

        cloud.restore_backup("42").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let restore = requests
            .iter()
            .find(|r| r.method.as_str() == "POST")
            .expect("restore request");
        assert!(restore.body.is_empty());

        // Snapshot untouched by the action
        assert_eq!(cloud.cloud_server_status(), Some(&CloudServerStatus::RUNNING));
    }

    /// Test deleting a backup uses DELETE on the backup path
    #[tokio::test]
    async fn test_delete_backup_request() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/services/42/cloud_servers/backups/b-17"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let cloud = CloudServer::new(client(&server).await, 42);
        cloud.delete_backup("b-17").await.unwrap();
    }

    /// Test listing backups decodes the `backups` key
    #[tokio::test]
    async fn test_backups_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers/backups"))
            .respond_with(ok(json!({"backups": [
                {"id": 1, "created_at": "2024-05-01T03:00:00+00:00", "size": 1024},
                {"id": "nightly"}
            ]})))
            .mount(&server)
            .await;

        let cloud = CloudServer::new(client(&server).await, 42);
        let backups = cloud.backups().await.unwrap();

        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].id.as_deref(), Some("1"));
        assert!(backups[0].created_at.is_some());
        assert_eq!(backups[0].extra["size"], 1024);
        assert_eq!(backups[1].id.as_deref(), Some("nightly"));
    }

    /// Test installing a game without modpack sends exactly one parameter
    #[tokio::test]
    async fn test_install_game_without_modpack() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/7/gameservers/games/install"))
            .and(body_string("game=cs2"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let gs = Gameserver::new(client(&server).await, 7);
        gs.install_game("cs2", None).await.unwrap();
        assert!(!gs.is_hydrated());
    }

    /// Test installing a game with modpack sends both parameters
    #[tokio::test]
    async fn test_install_game_with_modpack() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/7/gameservers/games/install"))
            .and(body_string("game=cs2&modpack=pack1"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let gs = Gameserver::new(client(&server).await, 7);
        gs.install_game("cs2", Some("pack1")).await.unwrap();
    }

    /// Test restart announces the application name and the optional message
    #[tokio::test]
    async fn test_restart_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/7/gameservers/restart"))
            .and(body_string(
                "restart_message=brb&message=Server+restart+requested+%28test-app%29",
            ))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/services/7/gameservers/stop"))
            .and(body_string("message=Server+stop+requested+%28test-app%29"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let gs = Gameserver::new(client(&server).await, 7);
        gs.restart(Some("brb")).await.unwrap();
        gs.stop(None).await.unwrap();
    }

    /// Test uninstalling a game is a DELETE carrying the game parameter
    #[tokio::test]
    async fn test_uninstall_game_uses_delete() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/services/7/gameservers/games/uninstall"))
            .and(body_string("game=arkse"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let gs = Gameserver::new(client(&server).await, 7);
        gs.uninstall_game("arkse").await.unwrap();
    }

    /// Test stats hours are passed through unvalidated as a query parameter
    #[tokio::test]
    async fn test_stats_hours_passed_through() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/7/gameservers/stats"))
            .and(query_param("hours", "48"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "message": "hours must be between 1 and 24"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gs = Gameserver::new(client(&server).await, 7);
        let err = gs.stats(48).await.unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status.as_u16(), 400);
                assert!(message.contains("between 1 and 24"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Test nested response keys such as `console.url`
    #[tokio::test]
    async fn test_novnc_url_nested_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers/console"))
            .respond_with(ok(json!({"console": {"url": "https://vnc.example/abc"}})))
            .mount(&server)
            .await;

        let cloud = CloudServer::new(client(&server).await, 42);
        assert_eq!(cloud.novnc_url().await.unwrap(), "https://vnc.example/abc");
    }

    /// Test the users endpoint unwraps `users.users`
    #[tokio::test]
    async fn test_users_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/cloud_servers/user"))
            .respond_with(ok(json!({"users": {"users": [
                {
                    "username": "root",
                    "id": 0,
                    "home": "/root",
                    "groups": [{"id": 0, "name": "root"}]
                }
            ]}})))
            .mount(&server)
            .await;

        let cloud = CloudServer::new(client(&server).await, 42);
        let users = cloud.users().await.unwrap();
        assert_eq!(users[0].username.as_deref(), Some("root"));
        assert_eq!(users[0].groups[0].name.as_deref(), Some("root"));
    }

    /// Test PTR changes put the address in the path and the hostname in the form
    #[tokio::test]
    async fn test_change_ptr_entry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/42/cloud_servers/ptr/10.0.0.1"))
            .and(body_string("hostname=mail.example.com"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let cloud = CloudServer::new(client(&server).await, 42);
        cloud.change_ptr_entry("10.0.0.1", "mail.example.com").await.unwrap();
    }

    /// Test a missing support authorization surfaces the remote 404
    #[tokio::test]
    async fn test_support_authorization_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/42/support_authorization"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status": "error",
                "message": "No support authorization found"
            })))
            .mount(&server)
            .await;

        let cloud = CloudServer::new(client(&server).await, 42);
        let err = cloud.support_authorization().await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    }

    /// Test listing services
    #[tokio::test]
    async fn test_services_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(ok(json!({"services": [
                {"id": 42, "status": "active", "type": "cloud_server"},
                {"id": 7, "status": "deleted", "type": "gameserver"}
            ]})))
            .mount(&server)
            .await;

        let services = client(&server).await.services().await.unwrap();
        assert_eq!(services.len(), 2);
        assert!(services[0].is_cloud_server() && services[0].should_hydrate());
        assert!(services[1].is_gameserver() && !services[1].should_hydrate());
    }
}
