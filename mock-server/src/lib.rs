//! In-memory HTTP server used as the far end of integration tests.
//!
//! `/echo` reflects the request it received, so tests can check exactly what
//! a transport sent. The other routes serve fixed JSON in the shapes an
//! endpoint can declare: one object, an array, an array of arrays, or an
//! empty body with a chosen status.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/echo` saw.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    /// Raw query string, without the `?`.
    pub query: Option<String>,
    /// Headers in arrival order, names lowercased by the HTTP stack.
    pub headers: Vec<(String, String)>,
    /// `name=value` pairs parsed out of the `Cookie` header.
    pub cookies: Vec<(String, String)>,
    /// Request body as text; empty when none was sent.
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub owner: String,
    pub name: String,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u32,
    pub kind: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/repos/{owner}/{repo}", get(get_repo))
        .route("/events", get(list_events))
        .route("/pages", get(list_pages))
        .route("/status/{code}", any(status))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let mut echoed = Vec::new();
    let mut cookies = Vec::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        if *name == axum::http::header::COOKIE {
            cookies.extend(parse_cookie_header(&value));
        }
        echoed.push((name.as_str().to_string(), value));
    }
    tracing::debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: echoed,
        cookies,
        body,
    })
}

fn parse_cookie_header(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

async fn get_repo(Path((owner, repo)): Path<(String, String)>) -> Json<Repo> {
    Json(Repo {
        full_name: format!("{owner}/{repo}"),
        owner,
        name: repo,
    })
}

async fn list_events(Query(params): Query<HashMap<String, String>>) -> Json<Vec<Event>> {
    let kinds = ["push", "issue", "release"];
    let limit = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(kinds.len());
    Json(
        kinds
            .iter()
            .enumerate()
            .take(limit)
            .map(|(i, kind)| Event {
                id: i as u32 + 1,
                kind: kind.to_string(),
            })
            .collect(),
    )
}

async fn list_pages() -> Json<Vec<Vec<u32>>> {
    Json(vec![vec![1, 2], vec![3], vec![]])
}

async fn status(Path(code): Path<u16>) -> Result<StatusCode, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    if status.is_success() {
        Ok(status)
    } else {
        Err(status)
    }
}
