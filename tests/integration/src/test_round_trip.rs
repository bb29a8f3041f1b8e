//! Sign-then-verify integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use sharedkey_auth::{SharedKey, SignRequest};

    use crate::{ServerSetup, challenge, send_signed, signer, start_default_server, start_server};

    #[tokio::test]
    async fn test_should_accept_signed_post() {
        let server = start_default_server().await;
        let client = reqwest::Client::new();

        let response = send_signed(
            &client,
            client
                .post(server.url("/api/orders?expand=items"))
                .json(&serde_json::json!({ "id": 42 })),
            &signer("secret"),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["path"], "/api/orders");
        assert_eq!(json["ticket"]["scheme"], "SharedKey");
        assert_eq!(json["ticket"]["principal"]["name"], "primary");
        assert_eq!(json["ticket"]["validated"]["keyIndex"], 0);
        assert_eq!(json["ticket"]["validated"]["dateHeaderName"], "x-ts-date");
    }

    #[tokio::test]
    async fn test_should_accept_signed_get_without_body() {
        let server = start_default_server().await;
        let client = reqwest::Client::new();

        let response = send_signed(&client, client.get(server.url("/")), &signer("secret"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["bodyLength"], 0);
    }

    #[tokio::test]
    async fn test_should_reject_request_signed_with_other_key() {
        let server = start_default_server().await;
        let client = reqwest::Client::new();

        let response = send_signed(
            &client,
            client.post(server.url("/api/orders")).body("{}"),
            &signer("not-the-secret"),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            challenge(&response),
            "SharedKey error=\"invalid_token\", error_description=\"The signature is invalid\""
        );
    }

    #[tokio::test]
    async fn test_should_reject_request_with_tampered_path() {
        let server = start_default_server().await;
        let client = reqwest::Client::new();

        let mut request = client.get(server.url("/api/orders")).build().unwrap();
        request.sign_with(&signer("secret")).unwrap();
        *request.url_mut() = reqwest::Url::parse(&server.url("/api/admin")).unwrap();

        let response = client.execute(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_accept_old_and_new_keys_during_rotation() {
        let rotating = start_server(ServerSetup {
            keys: vec![
                SharedKey::from("old").with_id("2024"),
                SharedKey::from("new").with_id("2025"),
            ],
            ..ServerSetup::default()
        })
        .await;
        let client = reqwest::Client::new();

        for (key, id) in [("old", "2024"), ("new", "2025")] {
            let response = send_signed(&client, client.get(rotating.url("/")), &signer(key))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json: serde_json::Value = response.json().await.unwrap();
            assert_eq!(json["ticket"]["principal"]["name"], id);
        }

        let rotated = start_server(ServerSetup {
            keys: vec![SharedKey::from("new")],
            ..ServerSetup::default()
        })
        .await;
        let response = send_signed(&client, client.get(rotated.url("/")), &signer("old"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
