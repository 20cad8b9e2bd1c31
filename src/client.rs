use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Credentials, DEFAULT_URL};
use crate::error::{Error, Result};
use crate::request::Request;

/// The one seam the orchestration layer depends on: submit a request for a
/// dataset and leave the result at `target`.
pub trait DataClient {
    fn retrieve(&self, dataset: &str, request: &Request, target: &Path) -> Result<Retrieved>;
}

/// Outcome of a completed retrieval.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub target: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub key: String,
    pub verify_tls: bool,
    /// Upper bound on the pause between task polls.
    pub sleep_max: Duration,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            key: String::new(),
            verify_tls: true,
            sleep_max: Duration::from_secs(120),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientOptions {
    pub fn with_credentials(creds: Credentials) -> Self {
        Self {
            url: creds.url,
            key: creds.key,
            ..Self::default()
        }
    }
}

/// Blocking CDS API client: submit to `/resources/{dataset}`, poll
/// `/tasks/{request_id}` until the task settles, then download the result.
#[derive(Debug, Clone)]
pub struct CdsClient {
    opts: ClientOptions,
    http: HttpClient,
}

enum Auth {
    /// `uid:secret` keys go out as HTTP basic auth.
    Basic { user: String, password: String },
    /// Anything else is a personal access token (newer CDS deployments).
    Token(String),
}

fn auth_from_key(key: &str) -> Auth {
    match key.split_once(':') {
        Some((user, password)) => Auth::Basic {
            user: user.to_string(),
            password: password.to_string(),
        },
        None => Auth::Token(key.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaskState {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct Task {
    state: TaskState,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    content_length: Option<u64>,
    #[serde(default)]
    error: Option<TaskError>,
}

#[derive(Debug, Deserialize)]
struct TaskError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl TaskError {
    fn describe(&self) -> String {
        match (&self.message, &self.reason) {
            (Some(m), Some(r)) => format!("{m}: {r}"),
            (Some(m), None) => m.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) => "no error detail from service".to_string(),
        }
    }
}

impl CdsClient {
    pub fn new(opts: ClientOptions) -> Result<Self> {
        if opts.key.is_empty() {
            return Err(Error::Config("no CDS API key configured".into()));
        }
        // Validate the endpoint up front so a typo fails before submission.
        Url::parse(&opts.url)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("efas-discharge/0.1"));

        let mut builder = HttpClient::builder()
            .default_headers(headers)
            .timeout(opts.timeout);
        if !opts.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        Ok(Self { opts, http })
    }

    /// Convenience constructor using `CDSAPI_URL`/`CDSAPI_KEY` or `~/.cdsapirc`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::with_credentials(Credentials::resolve()?))
    }

    fn authed(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match auth_from_key(&self.opts.key) {
            Auth::Basic { user, password } => builder.basic_auth(user, Some(password)),
            Auth::Token(t) => builder.header("PRIVATE-TOKEN", t),
        }
    }

    fn api_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.opts.url.trim_end_matches('/'), suffix)
    }

    /// Task `location` may be an absolute download URL or a path relative to
    /// the API endpoint.
    fn resolve_location(&self, location: &str) -> Result<Url> {
        match Url::parse(location) {
            Ok(u) => Ok(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(&format!("{}/", self.opts.url.trim_end_matches('/')))?;
                Ok(base.join(location)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn parse_task(resp: reqwest::blocking::Response) -> Result<Task> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            if let Ok(task) = serde_json::from_str::<Task>(&body) {
                if let Some(err) = task.error {
                    return Err(Error::TaskFailed {
                        reason: err.describe(),
                    });
                }
            }
            return Err(Error::UnexpectedResponse(format!("{status}: {body}")));
        }
        Ok(resp.json()?)
    }

    fn poll_until_settled(&self, mut task: Task) -> Result<Task> {
        let mut sleep = Duration::from_secs(1);
        let mut last_state = task.state;

        while matches!(task.state, TaskState::Queued | TaskState::Running) {
            if task.state != last_state {
                info!(state = ?task.state, "task state changed");
                last_state = task.state;
            }

            let id = task.request_id.as_deref().ok_or_else(|| {
                Error::UnexpectedResponse("task is pending but has no request_id".into())
            })?;
            let poll_url = self.api_url(&format!("tasks/{id}"));

            thread::sleep(sleep);
            sleep = next_sleep(sleep, self.opts.sleep_max);

            debug!(%poll_url, "polling task");
            let resp = self.authed(self.http.get(&poll_url)).send()?;
            let id = id.to_string();
            task = Self::parse_task(resp)?;
            // Some deployments omit request_id from poll replies.
            task.request_id.get_or_insert(id);
        }

        Ok(task)
    }

    fn download(&self, location: &str, target: &Path, expected: Option<u64>) -> Result<Retrieved> {
        let url = self.resolve_location(location)?;
        info!(url = %url, target = %target.display(), "downloading result");

        let mut resp = self.http.get(url).send()?.error_for_status()?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(target)?;
        let size_bytes = resp.copy_to(&mut file)?;

        if let Some(expected) = expected {
            if expected != size_bytes {
                warn!(expected, got = size_bytes, "content length mismatch");
            }
        }
        info!(bytes = size_bytes, "download complete");

        Ok(Retrieved {
            target: target.to_path_buf(),
            size_bytes,
        })
    }
}

impl DataClient for CdsClient {
    fn retrieve(&self, dataset: &str, request: &Request, target: &Path) -> Result<Retrieved> {
        let submit_url = self.api_url(&format!("resources/{dataset}"));
        info!(dataset, target = %target.display(), "submitting retrieval request");

        let resp = self.authed(self.http.post(&submit_url)).json(request).send()?;
        let task = Self::parse_task(resp)?;
        let task = self.poll_until_settled(task)?;

        match task.state {
            TaskState::Completed => {
                let location = task.location.as_deref().ok_or_else(|| {
                    Error::UnexpectedResponse("completed task has no location".into())
                })?;
                self.download(location, target, task.content_length)
            }
            TaskState::Failed => Err(Error::TaskFailed {
                reason: task
                    .error
                    .map(|e| e.describe())
                    .unwrap_or_else(|| "no error detail from service".to_string()),
            }),
            // poll_until_settled only returns settled states
            TaskState::Queued | TaskState::Running => Err(Error::UnexpectedResponse(
                "task still pending after polling".into(),
            )),
        }
    }
}

fn next_sleep(current: Duration, max: Duration) -> Duration {
    current.mul_f64(1.5).min(max)
}
