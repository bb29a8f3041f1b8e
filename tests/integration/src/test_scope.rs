//! Path scoping and custom header configuration integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use sharedkey_auth::{RequestSigner, SharedKey, SharedKeyOptions, SignerOptions};

    use crate::{ServerSetup, challenge, send_signed, signer, start_server};

    #[tokio::test]
    async fn test_should_only_validate_under_path_prefix() {
        let server = start_server(ServerSetup {
            options: SharedKeyOptions {
                path_prefix: Some("/secure".to_owned()),
                ..SharedKeyOptions::default()
            },
            ..ServerSetup::default()
        })
        .await;
        let client = reqwest::Client::new();

        let response = send_signed(
            &client,
            client.get(server.url("/secure/orders")),
            &signer("secret"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = send_signed(&client, client.get(server.url("/public/x")), &signer("secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&response), "SharedKey error=\"invalid_token\"");
    }

    #[tokio::test]
    async fn test_should_honor_custom_scheme_and_date_headers() {
        let server = start_server(ServerSetup {
            options: SharedKeyOptions {
                header_value_prefix: "HMAC".to_owned(),
                date_header_names: vec!["x-ts-date".to_owned(), "x-alt-date".to_owned()],
                ..SharedKeyOptions::default()
            },
            ..ServerSetup::default()
        })
        .await;
        let client = reqwest::Client::new();
        let signer = RequestSigner::with_options(
            SharedKey::from("secret"),
            SignerOptions {
                scheme: "HMAC".to_owned(),
                date_header_name: "x-alt-date".to_owned(),
            },
        )
        .unwrap();

        let response = send_signed(&client, client.get(server.url("/orders")), &signer)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["ticket"]["validated"]["dateHeaderName"], "x-alt-date");

        let response = send_signed(
            &client,
            client.get(server.url("/orders")),
            &crate::signer("secret"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&response), "HMAC");
    }
}
