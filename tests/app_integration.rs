use serde_json::{Value, json};
use std::fs;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tracing::info;

// Upstream mocks and config files shared by the tests
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_coingecko_mock(ids: &str, vs: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, ids, vs, mock_response).await;
        mock_server
    }

    pub async fn mount_price(mock_server: &MockServer, ids: &str, vs: &str, mock_response: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", ids))
            .and(query_param("vs_currencies", vs))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(mock_server)
            .await;
    }

    pub fn write_config(dir: &tempfile::TempDir, base_url: &str, extra: &str) -> std::path::PathBuf {
        let config_path = dir.path().join("config.yaml");
        let config_content = format!(
            r#"
providers:
  coingecko:
    base_url: "{base_url}/api/v3"
    timeout_secs: 2
    retries: 0
{extra}
"#
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl RunningServer {
    async fn start(config_path: &std::path::Path) -> Self {
        let config = finfaq::load_config(config_path.to_str()).expect("config loads");
        let state = finfaq::build_state(&config).expect("state builds");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(finfaq::server::serve_with_shutdown(listener, state, async move {
            let _ = rx.await;
        }));
        RunningServer {
            addr,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn faq_url(&self, question: &str) -> reqwest::Url {
        reqwest::Url::parse_with_params(&self.url("/faq"), &[("question", question)]).unwrap()
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .expect("server task panicked")
            .expect("server returned error");
    }
}

#[test_log::test(tokio::test)]
async fn test_full_service_flow_with_mock() {
    let mock_server =
        test_utils::create_coingecko_mock("bitcoin", "usd", r#"{"bitcoin":{"usd":65000}}"#).await;
    test_utils::mount_price(&mock_server, "doesnotexist", "usd", "{}").await;

    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(&dir, &mock_server.uri(), "");
    let server = RunningServer::start(&config_path).await;
    let client = reqwest::Client::new();

    let faq: Value = client
        .get(server.faq_url("What is a stock?"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    info!(?faq, "FAQ response");
    assert_eq!(
        faq,
        json!({ "answer": "A stock is a share in the ownership of a company." })
    );

    let stock = client
        .post(server.url("/stock"))
        .json(&json!({ "symbol": "bitcoin", "market": "usd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(stock.status(), reqwest::StatusCode::OK);
    let stock: Value = stock.json().await.unwrap();
    assert_eq!(
        stock,
        json!({ "symbol": "bitcoin", "market": "usd", "price": 65000 })
    );

    let crypto: Value = client
        .post(server.url("/crypto"))
        .json(&json!({ "symbol": "doesnotexist" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(crypto["price"], json!("Price not found"));
    assert_eq!(crypto["market"], json!("usd"));

    drop(client);
    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_upstream_failure_is_reported() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(&dir, &mock_server.uri(), "");
    let server = RunningServer::start(&config_path).await;

    let response = reqwest::Client::new()
        .post(server.url("/stock"))
        .json(&json!({ "symbol": "bitcoin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Failed to parse price response for bitcoin/usd"));

    // The service keeps answering after a failed lookup
    let faq = reqwest::Client::new()
        .get(server.faq_url("What is a bond?"))
        .send()
        .await
        .unwrap();
    assert_eq!(faq.status(), reqwest::StatusCode::OK);

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_concurrent_requests() {
    let mock_server =
        test_utils::create_coingecko_mock("ethereum", "usd", r#"{"ethereum":{"usd":3000}}"#).await;

    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(&dir, &mock_server.uri(), "");
    let server = RunningServer::start(&config_path).await;
    let client = reqwest::Client::new();

    let prices = (0..16).map(|i| {
        let symbol = if i % 2 == 0 { "ethereum" } else { "ETHEREUM" };
        client
            .post(server.url("/crypto"))
            .json(&json!({ "symbol": symbol }))
            .send()
    });
    let questions = (0..16).map(|_| {
        client
            .get(server.faq_url("What is staking?"))
            .send()
    });

    let (price_responses, faq_responses) = futures::future::join(
        futures::future::join_all(prices),
        futures::future::join_all(questions),
    )
    .await;

    for response in price_responses {
        let body: Value = response.unwrap().json().await.unwrap();
        assert_eq!(body["price"], json!(3000));
    }
    for response in faq_responses {
        let body: Value = response.unwrap().json().await.unwrap();
        assert_eq!(
            body["answer"],
            json!("Staking involves locking up cryptocurrency to support a blockchain network.")
        );
    }

    drop(client);
    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_custom_facts_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let facts_path = dir.path().join("facts.yaml");
    fs::write(
        &facts_path,
        r#"
- question: "What is a stock?"
  answer: "A share."
- question: "What is a stock?"
  answer: "A share."
"#,
    )
    .unwrap();
    let config_path = test_utils::write_config(
        &dir,
        "http://127.0.0.1:1",
        &format!("facts_path: \"{}\"", facts_path.display()),
    );

    let config = finfaq::load_config(config_path.to_str()).unwrap();
    let facts = finfaq::load_facts(&config).unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts.lookup("What is a stock?"), Some("A share."));
    assert_eq!(facts.lookup("What is a bond?"), None);

    let result = finfaq::run_command(
        finfaq::AppCommand::Faq {
            question: "What is a stock?".to_string(),
        },
        config_path.to_str(),
    )
    .await;
    assert!(result.is_ok(), "Faq command failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_malformed_facts_refuse_to_start() {
    let dir = tempfile::TempDir::new().unwrap();
    let facts_path = dir.path().join("facts.yaml");
    fs::write(
        &facts_path,
        r#"
- question: "What is a stock?"
  answer: "A share."
- question: "What is a bond?"
"#,
    )
    .unwrap();
    let config_path = test_utils::write_config(
        &dir,
        "http://127.0.0.1:1",
        &format!("facts_path: \"{}\"", facts_path.display()),
    );

    let result = finfaq::run_command(
        finfaq::AppCommand::Serve {
            bind: Some("127.0.0.1:0".parse().unwrap()),
        },
        config_path.to_str(),
    )
    .await;
    let err = result.expect_err("serve must not start with malformed facts");
    assert!(format!("{err:#}").contains("has no answer for question"));
}

#[test_log::test(tokio::test)]
async fn test_price_command_with_mock() {
    let mock_server =
        test_utils::create_coingecko_mock("bitcoin", "eur", r#"{"bitcoin":{"eur":59000.5}}"#).await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(&dir, &mock_server.uri(), "");

    let result = finfaq::run_command(
        finfaq::AppCommand::Price {
            symbol: "Bitcoin".to_string(),
            market: Some("EUR".to_string()),
        },
        config_path.to_str(),
    )
    .await;
    assert!(result.is_ok(), "Price command failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_price_command_fails_on_unreachable_source() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(&dir, "http://127.0.0.1:1", "");

    let result = finfaq::run_command(
        finfaq::AppCommand::Price {
            symbol: "bitcoin".to_string(),
            market: None,
        },
        config_path.to_str(),
    )
    .await;
    assert!(result.is_err());
}
