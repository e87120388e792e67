//! What to do with a non-success API response.

use parchment_editor_core::Notice;
use serde_json::Value;

pub const LOGIN_PATH: &str = "/login";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to access this route";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired please login again!";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";
pub const FALLBACK_MESSAGE: &str = "Not Found";

/// Messages with which the backend reports an empty result as a 404.
const EMPTY_RESULT_MESSAGES: &[&str] = &["Data not found.", "No data found"];

/// Side effects and result for one failed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureAction {
    /// Navigate (replacing history) to this path.
    pub redirect: Option<&'static str>,
    /// Drop stored tokens from local and session storage.
    pub clear_tokens: bool,
    /// User-visible notifications, already deduplicated.
    pub notices: Vec<Notice>,
    /// Body to hand back to the caller as if the call had succeeded.
    pub data: Option<Value>,
}

impl FailureAction {
    fn notify(&mut self, notice: Notice) {
        if !self.notices.contains(&notice) {
            self.notices.push(notice);
        }
    }

    fn go_to_login(&mut self, current_path: &str) -> bool {
        if current_path == LOGIN_PATH {
            return false;
        }
        self.redirect = Some(LOGIN_PATH);
        true
    }
}

/// Decide how to react to an error response.
///
/// `current_path` is where the user is now; nothing redirects to the login
/// page from the login page itself.
pub fn classify_failure(
    status: u16,
    status_text: Option<&str>,
    body: &Value,
    current_path: &str,
) -> FailureAction {
    let mut action = FailureAction::default();
    let on_login = current_path == LOGIN_PATH;

    if status == 403 && action.go_to_login(current_path) {
        action.notify(Notice::error(FORBIDDEN_MESSAGE));
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty());

    match message {
        Some(message) if status == 404 && EMPTY_RESULT_MESSAGES.contains(&message) => {
            return FailureAction {
                data: Some(body.clone()),
                ..FailureAction::default()
            };
        }
        Some(_) if status == 401 => {
            action.clear_tokens = true;
            if action.go_to_login(current_path) {
                action.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
            } else {
                action.notify(Notice::error(INVALID_CREDENTIALS_MESSAGE));
            }
        }
        Some(_) if on_login => action.notify(Notice::error(INVALID_CREDENTIALS_MESSAGE)),
        Some(message) => action.notify(Notice::error(message)),
        None => {
            let first = body
                .get(0)
                .and_then(|item| item.get("message"))
                .and_then(Value::as_str);
            let fallback = first
                .or(status_text)
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK_MESSAGE);
            action.notify(Notice::error(fallback));
        }
    }

    let nested_status = body
        .get("error")
        .and_then(|error| error.get("status"))
        .and_then(Value::as_u64);
    if nested_status == Some(401) {
        action.clear_tokens = true;
        action.go_to_login(current_path);
    }

    if message.is_none() {
        let detail = body
            .get("error")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(|first| first.get("message"))
            .and_then(Value::as_str);
        if let Some(detail) = detail {
            action.notify(Notice::Info(detail.to_owned()));
        }
    }

    action
}
