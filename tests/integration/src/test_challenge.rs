//! Challenge, anonymous access and forbid integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use sharedkey_auth::SharedKeyOptions;
    use sharedkey_http::SharedKeyHttpConfig;

    use crate::{ServerSetup, challenge, send_signed, signer, start_default_server, start_server};

    #[tokio::test]
    async fn test_should_send_bare_challenge_without_token() {
        let server = start_default_server().await;

        let response = reqwest::get(server.url("/api/orders")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&response), "SharedKey");
    }

    #[tokio::test]
    async fn test_should_ignore_other_schemes() {
        let server = start_default_server().await;
        let client = reqwest::Client::new();

        let response = client
            .get(server.url("/"))
            .header("authorization", "Bearer abc.def")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&response), "SharedKey");
    }

    #[tokio::test]
    async fn test_should_hide_error_details_when_disabled() {
        let server = start_server(ServerSetup {
            options: SharedKeyOptions {
                include_error_details: false,
                ..SharedKeyOptions::default()
            },
            ..ServerSetup::default()
        })
        .await;
        let client = reqwest::Client::new();

        let response = send_signed(&client, client.get(server.url("/")), &signer("wrong"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&response), "SharedKey");
    }

    #[tokio::test]
    async fn test_should_allow_anonymous_request_when_not_required() {
        let server = start_server(ServerSetup {
            http: SharedKeyHttpConfig {
                require_authentication: false,
            },
            ..ServerSetup::default()
        })
        .await;

        let response = reqwest::get(server.url("/public")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = response.json().await.unwrap();
        assert!(json["ticket"].is_null());
    }

    #[tokio::test]
    async fn test_should_forbid_authenticated_caller() {
        let server = start_server(ServerSetup {
            forbidden_prefix: Some("/admin".to_owned()),
            ..ServerSetup::default()
        })
        .await;
        let client = reqwest::Client::new();

        let response = send_signed(&client, client.get(server.url("/admin/users")), &signer("secret"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.bytes().await.unwrap().is_empty());
    }
}
