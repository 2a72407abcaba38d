#![allow(dead_code)]

use serde_json::{Map, Value, json};
use syno_station::client::{Capability, SynoClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const SID: &str = "sid-456";

/// Envelope with `success=true` around `data`
#[must_use]
pub fn success(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

/// Envelope with `success=false` and `code`
#[must_use]
pub fn failure(code: i32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": { "code": code } }))
}

/// `SYNO.API.Info` data listing every API of `capability` on `entry.cgi`
#[must_use]
pub fn api_info(capability: &Capability) -> Value {
    let entries: Map<String, Value> = capability
        .required_apis()
        .iter()
        .map(|api| {
            let max_version = if api == "SYNO.API.Auth" { 7 } else { 2 };
            (
                api.clone(),
                json!({ "path": "entry.cgi", "minVersion": 1, "maxVersion": max_version }),
            )
        })
        .collect();
    Value::Object(entries)
}

pub async fn setup_client(capability: Capability) -> (MockServer, SynoClient) {
    let server = MockServer::start().await;
    let client = SynoClient::builder()
        .host(server.uri())
        .capability(capability)
        .timeout(5_000)
        .build()
        .unwrap();
    (server, client)
}

/// Answers discovery for the client's declared APIs, expecting exactly one call
pub async fn mount_discovery(server: &MockServer, capability: &Capability) {
    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .and(query_param("api", "SYNO.API.Info"))
        .and(query_param("method", "query"))
        .respond_with(success(api_info(capability)))
        .expect(1)
        .mount(server)
        .await;
}

/// Accepts any login for `test` and issues [`SID`] with a session cookie
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("api", "SYNO.API.Auth"))
        .and(query_param("method", "login"))
        .and(query_param("account", "test"))
        .respond_with(
            success(json!({ "sid": SID, "is_portal_port": false }))
                .append_header("set-cookie", "id=cookie-1; path=/"),
        )
        .mount(server)
        .await;
}

/// Matches when the query keys appear exactly in this order
pub struct QueryOrderMatcher(Vec<String>);

/// Shorthand for [`QueryOrderMatcher`].
pub fn query_order<I, S>(keys: I) -> QueryOrderMatcher
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    QueryOrderMatcher(keys.into_iter().map(Into::into).collect())
}

impl Match for QueryOrderMatcher {
    fn matches(&self, request: &Request) -> bool {
        let query = request.url.query().unwrap_or_default();
        let keys: Vec<String> = form_urlencoded::parse(query.as_bytes())
            .map(|(k, _)| k.into_owned())
            .collect();
        keys == self.0
    }
}
