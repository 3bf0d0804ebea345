//! Mock source API using wiremock.

#![allow(dead_code)]

use coldap_source::{SourceClient, SourceConfig};
use serde_json::{json, Value};
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER: &str = "sysread";
pub const PASSWORD: &str = "secret";

/// A mock source serving a fixed data set.
pub struct MockSource {
    server: MockServer,
}

impl MockSource {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn client(&self) -> SourceClient {
        SourceClient::new(&SourceConfig::new(self.uri(), USER, PASSWORD)).unwrap()
    }

    async fn mount(&self, route: &str, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(basic_auth(USER, PASSWORD))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn healthy(&self) {
        self.mount("/health", 200, json!({"status": "UP"})).await;
    }

    pub async fn unhealthy(&self) {
        self.mount("/health", 200, json!({"status": "DOWN"})).await;
    }

    /// Serve organisations, the collaboration listing and every detail.
    pub async fn serve(&self, organisations: Value, collaborations: Vec<Value>) {
        self.mount("/api/organisations/all", 200, organisations).await;

        let listing: Vec<Value> = collaborations
            .iter()
            .map(|co| {
                json!({
                    "id": co["id"],
                    "name": co["name"],
                    "organisation_id": co["organisation_id"],
                })
            })
            .collect();
        self.mount("/api/collaborations/all", 200, Value::Array(listing))
            .await;

        for co in collaborations {
            let route = format!("/api/collaborations/{}", co["id"]);
            self.mount(&route, 200, co).await;
        }
    }

    pub async fn serve_group(&self, group: Value) {
        let route = format!("/api/groups/{}", group["id"]);
        self.mount(&route, 200, group).await;
    }
}
