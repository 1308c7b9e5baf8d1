//! Listing endpoints and liveness

mod harness;

use harness::config::ConfigBuilder;
use harness::mock_provider::MockProvider;
use harness::server::TestServer;

#[tokio::test]
async fn models_are_flattened_across_providers() {
    let mock = MockProvider::start().await.unwrap();
    let config = ConfigBuilder::new()
        .provider(&format!(
            "name = \"main\"\ntype = \"anthropic\"\nbase_url = \"{}\"\nmodels = [\"claude-sonnet-4-5\", \"claude-opus-4-1\"]\n",
            mock.base_url()
        ))
        .provider(&format!(
            "name = \"local\"\ntype = \"ollama\"\nbase_url = \"{}\"\nmodels = [\"qwen3:8b\"]\n",
            mock.base_url()
        ))
        .build()
        .unwrap();
    let server = TestServer::start(config).await.unwrap();

    let response = server.client().get(server.url("/v1/models")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["object"], "list");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["id"], "claude-sonnet-4-5");
    assert_eq!(data[0]["owned_by"], "main");
    assert_eq!(data[2]["id"], "qwen3:8b");
    assert_eq!(data[2]["owned_by"], "local");
}

#[tokio::test]
async fn providers_expose_state_hints_but_never_keys() {
    let mock = MockProvider::start().await.unwrap();
    let config = ConfigBuilder::new()
        .provider(&format!(
            "name = \"main\"\ntype = \"anthropic\"\nbase_url = \"{}\"\nkeys = [{{ key = \"sk-ant-secret-9999\" }}]\n",
            mock.base_url()
        ))
        .build()
        .unwrap();
    let server = TestServer::start(config).await.unwrap();

    let response = server.client().get(server.url("/v1/providers")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let text = response.text().await.unwrap();
    assert!(!text.contains("sk-ant-secret-9999"));

    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    let provider = &body["providers"][0];
    assert_eq!(provider["name"], "main");
    assert_eq!(provider["type"], "anthropic");
    assert_eq!(provider["health"], "closed");
    assert_eq!(provider["keys"], 1);
}

#[tokio::test]
async fn health_needs_no_auth() {
    let mock = MockProvider::start().await.unwrap();
    let config = ConfigBuilder::new()
        .auth("api_key = \"proxy-secret\"\nrequired = true\n")
        .provider(&format!(
            "name = \"main\"\ntype = \"anthropic\"\nbase_url = \"{}\"\n",
            mock.base_url()
        ))
        .build()
        .unwrap();
    let server = TestServer::start(config).await.unwrap();

    let health = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // Listing endpoints stay behind the gate
    let models = server.client().get(server.url("/v1/models")).send().await.unwrap();
    assert_eq!(models.status(), 401);
}
