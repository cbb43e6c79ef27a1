use std::net::SocketAddr;
use std::time::Duration;

use lobstertrap_server::build_app;
use lobstertrap_server::config::{ServerConfig, TimingConfig};

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default (minutes-scale) phase timing.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server with second-scale phases, for tests that drive
    /// a game through its whole life.
    pub async fn with_fast_timing() -> Self {
        let config = ServerConfig {
            timing: TimingConfig {
                discussion_secs: 1,
                voting_secs: 1,
                reveal_secs: 1,
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url(), path)
    }
}

pub fn wallet(i: usize) -> String {
    format!("0x{:040x}", i + 1)
}

/// Register a player and return the credentials JSON.
pub async fn register(
    client: &reqwest::Client,
    server: &TestServer,
    name: &str,
    wallet: &str,
) -> serde_json::Value {
    let resp = client
        .post(server.api("/players/register"))
        .json(&serde_json::json!({ "name": name, "wallet": wallet }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "registration failed");
    resp.json().await.unwrap()
}

/// Register five players and return their credential JSONs.
pub async fn register_five(client: &reqwest::Client, server: &TestServer) -> Vec<serde_json::Value> {
    let mut creds = Vec::new();
    for i in 0..5 {
        creds.push(register(client, server, &format!("Player{i}"), &wallet(i)).await);
    }
    creds
}

/// Create a lobby as the first player and join the rest; returns the game
/// id. With five players the game is started on return.
pub async fn start_game(
    client: &reqwest::Client,
    server: &TestServer,
    creds: &[serde_json::Value],
    external_ref: Option<&str>,
) -> String {
    let resp = client
        .post(server.api("/games"))
        .bearer_auth(creds[0]["access_key"].as_str().unwrap())
        .json(&serde_json::json!({ "external_ref": external_ref }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let game: serde_json::Value = resp.json().await.unwrap();
    let game_id = game["id"].as_str().unwrap().to_string();

    for cred in &creds[1..] {
        let resp = client
            .post(server.api(&format!("/games/{game_id}/join")))
            .bearer_auth(cred["access_key"].as_str().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
    game_id
}

/// Fetch the game as seen by one player (or a spectator with no key).
pub async fn get_game(
    client: &reqwest::Client,
    server: &TestServer,
    game_id: &str,
    access_key: Option<&str>,
) -> serde_json::Value {
    let mut req = client.get(server.api(&format!("/games/{game_id}")));
    if let Some(key) = access_key {
        req = req.bearer_auth(key);
    }
    let resp = req.send().await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

/// Poll until the game reaches the wanted phase, with a wall-clock bound.
pub async fn wait_for_phase(
    client: &reqwest::Client,
    server: &TestServer,
    game_id: &str,
    phase: &str,
) -> serde_json::Value {
    for _ in 0..200 {
        let game = get_game(client, server, game_id, None).await;
        if game["phase"] == phase {
            return game;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("game never reached phase {phase}");
}
