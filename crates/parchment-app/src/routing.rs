//! Route table and the protected-route gate.
//!
//! Paths match exactly, segment by segment. A `:name` segment captures one
//! non-empty path segment. When several routes match, the one with the
//! most literal segments wins, so `/coming-soon` beats `/:slug`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const COMING_SOON_PATH: &str = "/coming-soon";

/// Page rendered for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    /// Template editor page.
    Home,
    Login,
    Unauthorized,
    ComingSoon,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: SmolStr,
    pub view: View,
    /// Empty means any authenticated user.
    #[serde(default)]
    pub allowed_roles: Vec<SmolStr>,
    #[serde(default)]
    pub is_public: bool,
}

impl RouteEntry {
    pub fn protected(path: impl Into<SmolStr>, view: View) -> Self {
        Self {
            path: path.into(),
            view,
            allowed_roles: Vec::new(),
            is_public: false,
        }
    }

    pub fn public(path: impl Into<SmolStr>, view: View) -> Self {
        Self {
            is_public: true,
            ..Self::protected(path, view)
        }
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.allowed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Captured parameters and the number of literal segments, when `path`
    /// matches this entry.
    fn match_path(&self, segments: &[&str]) -> Option<(Params, usize)> {
        let pattern = split_path(&self.path);
        if pattern.len() != segments.len() {
            return None;
        }
        let mut params = Params::new();
        let mut literals = 0;
        for (pat, seg) in pattern.iter().zip(segments) {
            match pat.strip_prefix(':') {
                Some(name) if !seg.is_empty() => {
                    params.insert(SmolStr::new(name), SmolStr::new(seg));
                }
                Some(_) => return None,
                None if pat == seg => literals += 1,
                None => return None,
            }
        }
        Some((params, literals))
    }
}

pub type Params = BTreeMap<SmolStr, SmolStr>;

/// Who is asking for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub role: SmolStr,
    pub authenticated: bool,
}

/// Outcome of gating a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render { view: View, params: Params },
    Redirect { to: &'static str, replace: bool },
}

impl Resolution {
    fn render(view: View, params: Params) -> Self {
        Self::Render { view, params }
    }

    pub fn view(&self) -> Option<View> {
        match self {
            Self::Render { view, .. } => Some(*view),
            Self::Redirect { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl Default for RouteTable {
    /// The template editor at `/` for any signed-in user, plus the login page.
    fn default() -> Self {
        Self::new(vec![
            RouteEntry::protected("/", View::Home),
            RouteEntry::public(LOGIN_PATH, View::Login),
        ])
    }
}

impl RouteTable {
    /// `entries` plus the fixed `/unauthorized` and `/coming-soon` pages.
    /// Those two are always reachable, signed in or not.
    pub fn new(mut entries: Vec<RouteEntry>) -> Self {
        entries.push(RouteEntry::public(UNAUTHORIZED_PATH, View::Unauthorized));
        entries.push(RouteEntry::public(COMING_SOON_PATH, View::ComingSoon));
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Best matching entry for `path`, ignoring any query or fragment.
    pub fn find(&self, path: &str) -> Option<(&RouteEntry, Params)> {
        let segments = split_path(path);
        let mut best: Option<(&RouteEntry, Params, usize)> = None;
        for entry in &self.entries {
            let Some((params, literals)) = entry.match_path(&segments) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, _, score)| literals > *score) {
                best = Some((entry, params, literals));
            }
        }
        best.map(|(entry, params, _)| (entry, params))
    }

    /// Gate `path` for `viewer`. Unmatched paths render [`View::NotFound`].
    pub fn resolve(&self, path: &str, viewer: &Viewer) -> Resolution {
        let Some((entry, params)) = self.find(path) else {
            return Resolution::render(View::NotFound, Params::new());
        };
        if entry.is_public {
            return Resolution::render(entry.view, params);
        }
        if !viewer.authenticated {
            tracing::debug!(path, "unauthenticated, redirecting to login");
            return Resolution::Redirect {
                to: LOGIN_PATH,
                replace: true,
            };
        }
        if !entry.allowed_roles.is_empty() && !entry.allowed_roles.contains(&viewer.role) {
            tracing::debug!(path, role = %viewer.role, "role not allowed");
            return Resolution::Redirect {
                to: UNAUTHORIZED_PATH,
                replace: true,
            };
        }
        Resolution::render(entry.view, params)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|seg| !seg.is_empty()).collect()
}
