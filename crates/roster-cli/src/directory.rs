//! Directory sources: the Slack Web API and member-list JSON files.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use roster_core::RosterError;
use roster_core::flatten::Record;
use roster_core::snapshot::DirectorySource;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `users.list` response page.
#[derive(Debug, Deserialize)]
struct UsersListPage {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<Record>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

impl UsersListPage {
    fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.trim())
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Outcome of one page request before retry handling.
enum PageOutcome {
    Page(UsersListPage),
    Throttled(Option<Duration>),
}

/// Paginated, throttle-aware `users.list` client.
pub struct SlackDirectory {
    agent: ureq::Agent,
    api_base: String,
    token: String,
    page_limit: u32,
    max_retries: u32,
    retry_delay: Duration,
    requests: Cell<usize>,
}

impl SlackDirectory {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        page_limit: u32,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            api_base: api_base.into(),
            token: token.into(),
            page_limit,
            max_retries,
            retry_delay,
            requests: Cell::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    fn users_list_url(&self) -> String {
        format!("{}/users.list", self.api_base.trim_end_matches('/'))
    }

    fn fetch_page(&self, cursor: Option<&str>) -> Result<PageOutcome, RosterError> {
        self.requests.set(self.requests.get() + 1);

        let mut request = self
            .agent
            .get(&self.users_list_url())
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("User-Agent", "roster-cli")
            .query("limit", &self.page_limit.to_string());
        if let Some(cursor) = cursor {
            request = request.query("cursor", cursor);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(429, response)) => {
                return Ok(PageOutcome::Throttled(retry_after(
                    response.header("Retry-After"),
                )));
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(RosterError::UpstreamTransport(format!(
                    "users.list returned HTTP {code}"
                )));
            }
            Err(err) => return Err(RosterError::UpstreamTransport(err.to_string())),
        };

        let page: UsersListPage = response.into_json().map_err(|err| {
            RosterError::UpstreamTransport(format!("failed to decode users.list response: {err}"))
        })?;

        if page.ok {
            return Ok(PageOutcome::Page(page));
        }
        match page.error.as_deref() {
            Some("ratelimited") => Ok(PageOutcome::Throttled(None)),
            other => Err(RosterError::UpstreamRejected {
                reason: other.unwrap_or("unknown_error").to_string(),
            }),
        }
    }

    fn fetch_page_with_retry(&self, cursor: Option<&str>) -> Result<UsersListPage, RosterError> {
        let mut attempt = 0;
        loop {
            match self.fetch_page(cursor)? {
                PageOutcome::Page(page) => return Ok(page),
                PageOutcome::Throttled(wait) => {
                    if attempt >= self.max_retries {
                        return Err(RosterError::UpstreamTransport(format!(
                            "users.list still throttled after {attempt} retries"
                        )));
                    }
                    attempt += 1;
                    let wait = wait.unwrap_or(self.retry_delay);
                    warn!(attempt, wait_secs = wait.as_secs(), "users.list throttled; backing off");
                    std::thread::sleep(wait);
                }
            }
        }
    }
}

impl DirectorySource for SlackDirectory {
    fn list_current_records(&self) -> Result<Vec<Record>, RosterError> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.fetch_page_with_retry(cursor.as_deref())?;
            let next = page.next_cursor().map(str::to_string);
            debug!(
                page_members = page.members.len(),
                has_more = next.is_some(),
                "fetched users.list page"
            );
            members.extend(page.members);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            requests = self.request_count(),
            members = members.len(),
            "users.list complete"
        );
        Ok(members)
    }
}

fn retry_after(header: Option<&str>) -> Option<Duration> {
    header
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Member list read from a JSON file: either a bare array of member objects
/// or a saved `users.list` response with a `members` array.
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectorySource for FileDirectory {
    fn list_current_records(&self) -> Result<Vec<Record>, RosterError> {
        let content = std::fs::read_to_string(&self.path).map_err(|err| {
            RosterError::UpstreamTransport(format!("failed to read {}: {err}", self.path.display()))
        })?;
        parse_member_list(&content).map_err(|reason| {
            RosterError::UpstreamTransport(format!("{}: {reason}", self.path.display()))
        })
    }
}

fn parse_member_list(content: &str) -> Result<Vec<Record>, String> {
    let value: Value = serde_json::from_str(content).map_err(|err| err.to_string())?;
    let members = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("members") {
            Some(Value::Array(items)) => items,
            _ => return Err("expected a `members` array".to_string()),
        },
        _ => return Err("expected an array of member objects".to_string()),
    };

    members
        .into_iter()
        .enumerate()
        .map(|(idx, member)| match member {
            Value::Object(record) => Ok(record),
            _ => Err(format!("member #{idx} is not an object")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{UsersListPage, parse_member_list, retry_after};
    use std::time::Duration;

    #[test]
    fn bare_array_and_response_object_both_parse() {
        let bare = parse_member_list(r#"[{"id": "U1"}, {"id": "U2"}]"#).expect("array");
        assert_eq!(bare.len(), 2);

        let wrapped =
            parse_member_list(r#"{"ok": true, "members": [{"id": "U1"}]}"#).expect("object");
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0]["id"], "U1");
    }

    #[test]
    fn non_object_members_are_rejected() {
        assert!(parse_member_list("[1, 2]").is_err());
        assert!(parse_member_list(r#"{"ok": true}"#).is_err());
        assert!(parse_member_list("\"nope\"").is_err());
    }

    #[test]
    fn empty_cursor_ends_pagination() {
        let last: UsersListPage = serde_json::from_str(
            r#"{"ok": true, "members": [], "response_metadata": {"next_cursor": ""}}"#,
        )
        .expect("page");
        assert_eq!(last.next_cursor(), None);

        let more: UsersListPage = serde_json::from_str(
            r#"{"ok": true, "members": [], "response_metadata": {"next_cursor": "dXNlcjpVMEc5V0ZYTlo="}}"#,
        )
        .expect("page");
        assert_eq!(more.next_cursor(), Some("dXNlcjpVMEc5V0ZYTlo="));

        let bare: UsersListPage = serde_json::from_str(r#"{"ok": true}"#).expect("page");
        assert_eq!(bare.next_cursor(), None);
    }

    #[test]
    fn rejected_page_carries_error_code() {
        let page: UsersListPage =
            serde_json::from_str(r#"{"ok": false, "error": "invalid_auth"}"#).expect("page");
        assert!(!page.ok);
        assert_eq!(page.error.as_deref(), Some("invalid_auth"));
    }

    #[test]
    fn retry_after_parses_whole_seconds() {
        assert_eq!(retry_after(Some("30")), Some(Duration::from_secs(30)));
        assert_eq!(retry_after(Some(" 2 ")), Some(Duration::from_secs(2)));
        assert_eq!(retry_after(Some("soon")), None);
        assert_eq!(retry_after(None), None);
    }
}
