//! Request description and the payload normalization applied before sending.

use bytes::Bytes;
use reqwest::Method;
use serde_json::{Map, Value};

/// A part of a multipart form body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        name: String,
        mime: String,
        bytes: Bytes,
    },
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Map<String, Value>),
    Form(Vec<(String, FormValue)>),
}

/// Everything needed to issue one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL.
    pub url: String,
    /// Overrides the configured base URL.
    pub base_url: Option<String>,
    pub query_params: Map<String, Value>,
    pub body: Body,
    /// Extra headers merged over the defaults.
    pub form_headers: Vec<(String, String)>,
    /// Send no default headers at all (the bearer token is still added).
    pub remove_headers: bool,
    /// Client IP forwarded in an `ip` header.
    pub ip: Option<String>,
    /// Explicit token; wins over the stored one when non-empty.
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            base_url: None,
            query_params: Map::new(),
            body: Body::Empty,
            form_headers: Vec::new(),
            remove_headers: false,
            ip: None,
            token: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn json(mut self, body: Map<String, Value>) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn form(mut self, parts: Vec<(String, FormValue)>) -> Self {
        self.body = Body::Form(parts);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_headers.push((name.into(), value.into()));
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Resolve `url` against the effective base URL.
    pub fn full_url(&self, default_base: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            return self.url.clone();
        }
        let base = self.base_url.as_deref().unwrap_or(default_base);
        match (base.ends_with('/'), self.url.starts_with('/')) {
            (true, true) => format!("{base}{}", &self.url[1..]),
            (false, false) if !self.url.is_empty() => format!("{base}/{}", self.url),
            _ => format!("{base}{}", self.url),
        }
    }

    /// Headers to send, in order.
    ///
    /// `stored_token` is only consulted when no explicit token was given.
    pub fn headers(&self, stored_token: Option<String>) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = Vec::new();
        if !self.remove_headers {
            if !matches!(self.body, Body::Form(_)) {
                headers.push(("content-type".into(), "application/json".into()));
            }
            if let Some(ip) = &self.ip {
                headers.push(("ip".into(), ip.clone()));
            }
            for (name, value) in &self.form_headers {
                set_header(&mut headers, name, value.clone());
            }
        }
        let token = self
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or(stored_token)
            .filter(|t| !t.is_empty());
        if let Some(token) = token {
            set_header(&mut headers, "authorization", format!("Bearer {token}"));
        }
        headers
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some((_, v)) => *v = value,
        None => headers.push((name.to_owned(), value)),
    }
}

/// Query parameters as sent: strings trimmed, empty strings and nulls
/// dropped, other scalars stringified.
pub fn normalize_query(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.trim().to_owned(),
                other => other.to_string(),
            };
            (!value.is_empty()).then(|| (key.clone(), value))
        })
        .collect()
}

/// JSON body as sent: top-level strings trimmed, everything else untouched.
pub fn normalize_body(body: &Map<String, Value>) -> Map<String, Value> {
    body.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(s.trim().to_owned()),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Form parts as sent: text fields holding the literal `"null"` dropped.
pub fn normalize_form(parts: &[(String, FormValue)]) -> Vec<(String, FormValue)> {
    parts
        .iter()
        .filter(|(_, value)| !matches!(value, FormValue::Text(text) if text == "null"))
        .cloned()
        .collect()
}
