//! Date header and freshness window integration tests.

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use reqwest::StatusCode;
    use sharedkey_auth::date::format_http_date;
    use sharedkey_auth::{RequestSigner, SharedKey, SignerOptions};

    use crate::{challenge, send_signed, signer, start_default_server};

    async fn send_dated(date: &str) -> reqwest::Response {
        let server = start_default_server().await;
        let client = reqwest::Client::new();
        send_signed(
            &client,
            client.get(server.url("/")).header("x-ts-date", date),
            &signer("secret"),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_should_accept_date_inside_window() {
        let date = format_http_date(Utc::now() - TimeDelta::minutes(4));
        let response = send_dated(&date).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_reject_stale_date() {
        let date = format_http_date(Utc::now() - TimeDelta::minutes(10));
        let response = send_dated(&date).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(challenge(&response).contains("is outside the allowed window"));
    }

    #[tokio::test]
    async fn test_should_reject_date_too_far_in_future() {
        let date = format_http_date(Utc::now() + TimeDelta::minutes(5));
        let response = send_dated(&date).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(challenge(&response).contains("is outside the allowed window"));
    }

    #[tokio::test]
    async fn test_should_report_unparseable_date() {
        let response = send_dated("yesterday").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(challenge(&response).contains("The date 'yesterday' is not a valid date"));
    }

    #[tokio::test]
    async fn test_should_report_missing_date_header() {
        let server = start_default_server().await;
        let client = reqwest::Client::new();
        let signer = RequestSigner::with_options(
            SharedKey::from("secret"),
            SignerOptions {
                date_header_name: "x-other-date".to_owned(),
                ..SignerOptions::default()
            },
        )
        .unwrap();

        let response = send_signed(&client, client.get(server.url("/")), &signer)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(challenge(&response).contains("The request has no date, expected one of: x-ts-date"));
    }
}
