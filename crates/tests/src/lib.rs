//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - wire shape shared by contracts and the HTTP transport
//! - config file -> dispatcher -> mock HTTP endpoint

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Batch, NormalizedRecord, SerializedItem};
    use serde_json::json;

    #[test]
    fn test_batch_wire_shape() {
        let mut properties = NormalizedRecord::new();
        properties.insert("address.city", json!("Oslo"));
        let items = [
            SerializedItem::encode("u1", &properties).unwrap(),
            SerializedItem::encode("u2", &NormalizedRecord::new()).unwrap(),
        ];

        let batch = Batch::from_items("users", "wk", &items).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&batch.to_json().unwrap()).unwrap();

        assert_eq!(
            body,
            json!({
                "collection": "users",
                "writeKey": "wk",
                "objects": [
                    {"id": "u1", "properties": {"address.city": "Oslo"}},
                    {"id": "u2", "properties": {}}
                ]
            })
        );
    }

    #[test]
    fn test_config_toml_json_agree() {
        let toml = r#"
write_key = "wk"
max_batch_count = 20
request_timeout_ms = 1000

[retry]
max_elapsed_ms = 2000
"#;
        let from_toml = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&from_toml).unwrap();
        let from_json = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        assert_eq!(from_toml, from_json);
        assert_eq!(from_json.max_batch_count, 20);
        assert_eq!(from_json.retry.max_elapsed_ms, 2000);
        assert_eq!(from_json.max_concurrent_sends, 10);
    }
}

#[cfg(test)]
mod e2e_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ClientConfig;
    use dispatcher::{Dispatcher, Record, SET_PATH};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn config_for(server_url: &str, extra: &str) -> ClientConfig {
        let toml = format!(
            r#"
endpoint = "{server_url}"
write_key = "wk"
{extra}
"#
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    /// Two collections, one batch each, drained by close
    #[tokio::test]
    async fn test_e2e_two_collections() {
        let mut server = Server::new_async().await;
        let users = server
            .mock("POST", SET_PATH)
            .match_header("content-type", "application/json")
            .match_header(
                "user-agent",
                format!("objects-dispatch/{}", dispatcher::VERSION).as_str(),
            )
            .match_body(Matcher::PartialJson(json!({
                "collection": "users",
                "writeKey": "wk",
                "objects": [
                    {"id": "u1", "properties": {"name": "Ada"}},
                    {"id": "u2", "properties": {"address.city": "Oslo"}}
                ]
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let accounts = server
            .mock("POST", SET_PATH)
            .match_body(Matcher::PartialJson(json!({"collection": "accounts"})))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let dispatcher = Dispatcher::new(config_for(&server.url(), "")).unwrap();
        dispatcher.submit(Record::new("users", "u1").with_attribute("name", "Ada"));
        dispatcher.submit(Record::new("accounts", "a1").with_attribute("plan", "pro"));
        dispatcher.submit(
            Record::new("users", "u2").with_attribute("address", json!({"city": "Oslo"})),
        );
        dispatcher.close().await;

        users.assert_async().await;
        accounts.assert_async().await;
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.batches_sent, 2);
        assert_eq!(metrics.items_sent, 3);
        assert_eq!(metrics.active_buffers, 2);
    }

    #[tokio::test]
    async fn test_e2e_count_split() {
        let mut server = Server::new_async().await;
        let events = server
            .mock("POST", SET_PATH)
            .match_body(Matcher::PartialJson(json!({"collection": "events"})))
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let dispatcher =
            Dispatcher::new(config_for(&server.url(), "max_batch_count = 100")).unwrap();
        for i in 0..150 {
            dispatcher.submit(Record::new("events", format!("e{i}")));
        }
        dispatcher.close().await;

        events.assert_async().await;
        assert_eq!(dispatcher.metrics().items_sent, 150);
    }

    /// A failing endpoint is retried, then the batch is dropped and close returns
    #[tokio::test]
    async fn test_e2e_endpoint_down() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("POST", SET_PATH)
            .with_status(500)
            .with_body("upstream unavailable")
            .expect_at_least(2)
            .create_async()
            .await;

        let extra = r#"
request_timeout_ms = 500

[retry]
initial_interval_ms = 50
max_interval_ms = 200
max_elapsed_ms = 600
"#;
        let dispatcher = Dispatcher::new(config_for(&server.url(), extra)).unwrap();
        dispatcher.submit(Record::new("users", "u1"));
        dispatcher.close().await;

        failing.assert_async().await;
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.batches_sent, 0);
        assert_eq!(metrics.batches_failed, 1);
        assert!(metrics.retries() >= 1);
    }

    #[tokio::test]
    async fn test_e2e_submit_after_close_sends_nothing() {
        let mut server = Server::new_async().await;
        let never = server
            .mock("POST", SET_PATH)
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let dispatcher = Dispatcher::new(config_for(&server.url(), "")).unwrap();
        dispatcher.close().await;
        dispatcher.submit(Record::new("users", "u1"));
        dispatcher.close().await;

        never.assert_async().await;
        assert_eq!(dispatcher.buffer_count(), 0);
    }
}
