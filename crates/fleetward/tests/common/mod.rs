//! A stateful in-memory GitHub REST API behind the `HttpTransport` seam.
//!
//! Only the endpoints fleetward calls are routed. Mutations change state the
//! way GitHub does: protected or default branches cannot be deleted, creating
//! an existing ref is a 422, and the default branch must exist.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use fleetward::GitHubClient;
use fleetward::http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use fleetward::retry::RetryConfig;
use serde_json::{Value, json};

pub const API: &str = "https://github.test";

#[derive(Debug, Clone, Default)]
struct Repo {
    archived: bool,
    default_branch: String,
    branches: BTreeMap<String, String>,
    /// Protection as last PUT, in request shape.
    protection: HashMap<String, Value>,
    releases: Vec<String>,
}

#[derive(Default)]
struct State {
    repos: BTreeMap<(String, String), Repo>,
    requests: Vec<(HttpMethod, String)>,
    faults: Vec<(HttpMethod, String, u16)>,
}

#[derive(Clone, Default)]
pub struct FakeGitHub {
    state: Arc<Mutex<State>>,
}

fn respond(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("x-ratelimit-limit".to_string(), "5000".to_string()),
            ("x-ratelimit-remaining".to_string(), "4999".to_string()),
            ("x-ratelimit-reset".to_string(), "4102444800".to_string()),
        ],
        body: if body.is_null() {
            Vec::new()
        } else {
            body.to_string().into_bytes()
        },
    }
}

fn not_found() -> HttpResponse {
    respond(404, json!({"message": "Not Found"}))
}

fn unprocessable(message: &str) -> HttpResponse {
    respond(422, json!({"message": message}))
}

fn repo_json(owner: &str, name: &str, repo: &Repo) -> Value {
    json!({
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": {"login": owner},
        "archived": repo.archived,
        "default_branch": repo.default_branch,
    })
}

fn protection_json(put: &Value) -> Value {
    json!({
        "required_status_checks": put["required_status_checks"],
        "enforce_admins": {"enabled": put["enforce_admins"]},
        "required_pull_request_reviews": put["required_pull_request_reviews"],
        "required_conversation_resolution": {"enabled": put["required_conversation_resolution"]},
    })
}

fn query_param(query: &str, key: &str) -> Option<usize> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.parse().ok())
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A client wired to this fake, without pacing and with fast retries.
    pub fn client(&self) -> GitHubClient {
        GitHubClient::new_with_transport("test-token", None, Arc::new(self.clone()))
            .with_api_url(API)
            .with_retry_config(RetryConfig::disabled())
    }

    pub fn add_repo(&self, owner: &str, name: &str, branches: &[(&str, &str)]) {
        let repo = Repo {
            default_branch: "main".to_string(),
            branches: branches
                .iter()
                .map(|(b, sha)| (b.to_string(), sha.to_string()))
                .collect(),
            ..Repo::default()
        };
        self.state()
            .repos
            .insert((owner.to_string(), name.to_string()), repo);
    }

    pub fn add_release(&self, owner: &str, name: &str, tag: &str) {
        if let Some(repo) = self
            .state()
            .repos
            .get_mut(&(owner.to_string(), name.to_string()))
        {
            repo.releases.insert(0, tag.to_string());
        }
    }

    /// Answer every `method` request whose path starts with `path` with `status`.
    pub fn fail(&self, method: HttpMethod, path: &str, status: u16) {
        self.state().faults.push((method, path.to_string(), status));
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    pub fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.state().requests.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|(m, _)| m.is_mutation())
            .count()
    }

    pub fn branch_sha(&self, owner: &str, name: &str, branch: &str) -> Option<String> {
        self.state()
            .repos
            .get(&(owner.to_string(), name.to_string()))
            .and_then(|r| r.branches.get(branch).cloned())
    }

    pub fn default_branch(&self, owner: &str, name: &str) -> Option<String> {
        self.state()
            .repos
            .get(&(owner.to_string(), name.to_string()))
            .map(|r| r.default_branch.clone())
    }

    fn handle(&self, method: HttpMethod, path: &str, query: &str, body: &[u8]) -> HttpResponse {
        let mut state = self.state();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        if segments == ["rate_limit"] && method == HttpMethod::Get {
            let core = json!({"limit": 5000, "used": 1, "remaining": 4999, "reset": 4102444800_i64});
            return respond(200, json!({"resources": {"core": core}, "rate": core}));
        }

        if let ["orgs", org, "repos"] = segments.as_slice() {
            let per_page = query_param(query, "per_page").unwrap_or(30).max(1);
            let page = query_param(query, "page").unwrap_or(1).max(1);
            let items: Vec<Value> = state
                .repos
                .iter()
                .filter(|((owner, _), _)| owner == org)
                .skip((page - 1) * per_page)
                .take(per_page)
                .map(|((owner, name), repo)| repo_json(owner, name, repo))
                .collect();
            return respond(200, Value::Array(items));
        }

        let ["repos", owner, name, rest @ ..] = segments.as_slice() else {
            return not_found();
        };
        let key = (owner.to_string(), name.to_string());
        let Some(repo) = state.repos.get_mut(&key) else {
            return not_found();
        };
        let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        match (method, rest) {
            (HttpMethod::Get, []) => respond(200, repo_json(owner, name, repo)),
            (HttpMethod::Patch, []) => {
                let Some(branch) = payload["default_branch"].as_str() else {
                    return unprocessable("Validation Failed");
                };
                if !repo.branches.contains_key(branch) {
                    return unprocessable("Validation Failed");
                }
                repo.default_branch = branch.to_string();
                respond(200, repo_json(owner, name, repo))
            }
            (HttpMethod::Get, ["releases"]) => {
                let per_page = query_param(query, "per_page").unwrap_or(30);
                let releases: Vec<Value> = repo
                    .releases
                    .iter()
                    .take(per_page)
                    .map(|tag| json!({"tag_name": tag}))
                    .collect();
                respond(200, Value::Array(releases))
            }
            (HttpMethod::Get, ["git", "ref", "heads", branch]) => match repo.branches.get(*branch) {
                Some(sha) => respond(
                    200,
                    json!({"ref": format!("refs/heads/{branch}"), "object": {"sha": sha, "type": "commit"}}),
                ),
                None => not_found(),
            },
            (HttpMethod::Post, ["git", "refs"]) => {
                let (Some(full_ref), Some(sha)) = (payload["ref"].as_str(), payload["sha"].as_str())
                else {
                    return unprocessable("Invalid request");
                };
                let Some(branch) = full_ref.strip_prefix("refs/heads/") else {
                    return unprocessable("Reference name must start with refs/heads/");
                };
                if repo.branches.contains_key(branch) {
                    return unprocessable("Reference already exists");
                }
                repo.branches.insert(branch.to_string(), sha.to_string());
                respond(201, json!({"ref": full_ref, "object": {"sha": sha}}))
            }
            (HttpMethod::Delete, ["git", "refs", "heads", branch]) => {
                if !repo.branches.contains_key(*branch) {
                    return unprocessable("Reference does not exist");
                }
                if repo.protection.contains_key(*branch) {
                    return unprocessable("Cannot delete a protected branch");
                }
                if repo.default_branch == *branch {
                    return unprocessable("Cannot delete the default branch");
                }
                repo.branches.remove(*branch);
                respond(204, Value::Null)
            }
            (HttpMethod::Get, ["branches", branch, "protection"]) => {
                match repo.protection.get(*branch) {
                    Some(put) => respond(200, protection_json(put)),
                    None => respond(404, json!({"message": "Branch not protected"})),
                }
            }
            (HttpMethod::Put, ["branches", branch, "protection"]) => {
                if !repo.branches.contains_key(*branch) {
                    return respond(404, json!({"message": "Branch not found"}));
                }
                let response = protection_json(&payload);
                repo.protection.insert(branch.to_string(), payload);
                respond(200, response)
            }
            (HttpMethod::Delete, ["branches", branch, "protection"]) => {
                match repo.protection.remove(*branch) {
                    Some(_) => respond(204, Value::Null),
                    None => respond(404, json!({"message": "Branch not protected"})),
                }
            }
            _ => not_found(),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeGitHub {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let Some(path_and_query) = request.url.strip_prefix(API) else {
            return Err(HttpError::Transport(format!("unexpected host: {}", request.url)));
        };
        let (path, query) = path_and_query
            .split_once('?')
            .unwrap_or((path_and_query, ""));

        let fault = {
            let mut state = self.state();
            state.requests.push((request.method, path_and_query.to_string()));
            state
                .faults
                .iter()
                .find(|(m, prefix, _)| *m == request.method && path.starts_with(prefix.as_str()))
                .map(|(_, _, status)| *status)
        };
        if let Some(status) = fault {
            return Ok(respond(status, json!({"message": "injected failure"})));
        }

        Ok(self.handle(request.method, path, query, &request.body))
    }
}
