use std::collections::BTreeMap;

use pingora_http::RequestHeader;

use crate::core::{Request, User};

/// Default name of the query parameter carrying the action.
pub const DEFAULT_ACTION_PARAM: &str = "action";

/// Snapshot of an inbound request bound to a controller route.
///
/// Route params take precedence over query params, so a route pattern
/// like `/notes/{action}` and a query string `?action=list` both select
/// an action.
#[derive(Clone, Debug, Default)]
pub struct HttpRequest {
    route_path: String,
    params: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    action_param: String,
    user: Option<User>,
}

impl HttpRequest {
    pub fn new(route_path: impl Into<String>) -> Self {
        Self {
            route_path: route_path.into(),
            action_param: DEFAULT_ACTION_PARAM.to_string(),
            ..Default::default()
        }
    }

    /// Build a request from a pingora request header and the matched route
    pub fn from_header(
        route_path: &str,
        params: BTreeMap<String, String>,
        req_header: &RequestHeader,
    ) -> Self {
        let mut request = Self::new(route_path);
        request.params = params;
        request.query = req_header.uri.query().map(parse_query).unwrap_or_default();
        request
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_action(self, action: impl Into<String>) -> Self {
        let name = self.action_param.clone();
        self.with_query(name, action)
    }

    pub fn with_action_param(mut self, name: impl Into<String>) -> Self {
        self.action_param = name.into();
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }
}

impl Request for HttpRequest {
    fn route_path(&self) -> &str {
        &self.route_path
    }

    fn action(&self) -> Option<&str> {
        self.param(&self.action_param).filter(|action| !action.is_empty())
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
    }

    fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

/// Splits a raw query string into key/value pairs. The first occurrence
/// of a key wins; key-only params map to an empty value.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    for item in query.split('&').filter(|item| !item.is_empty()) {
        let (k, v) = item.split_once('=').unwrap_or((item, ""));
        pairs
            .entry(k.to_string())
            .or_insert_with(|| v.trim().to_string());
    }
    pairs
}

/// Extracts the value of a specific query parameter from the request URI.
///
/// Returns the first occurrence of the parameter's value.
pub fn get_query_value<'a>(req_header: &'a RequestHeader, name: &str) -> Option<&'a str> {
    req_header.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| match pair.split_once('=') {
            Some((k, v)) if k == name => Some(v.trim()),
            None if pair == name => Some(""),
            _ => None,
        })
    })
}

/// Retrieves the value of a specific header from the request.
///
/// Returns `None` if the header is not present or its value is not valid UTF-8.
pub fn get_req_header_value<'a>(req_header: &'a RequestHeader, key: &str) -> Option<&'a str> {
    req_header
        .headers
        .get(key)
        .and_then(|value| value.to_str().ok())
}
