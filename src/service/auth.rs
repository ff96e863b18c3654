use std::collections::HashMap;

use pingora_http::RequestHeader;

use crate::{
    config,
    core::User,
    utils::request::{get_query_value, get_req_header_value},
};

/// Resolves the request user from an API key.
///
/// The key is read from the configured header first, then from the query
/// string. Unknown keys leave the request unauthenticated.
#[derive(Clone, Debug, Default)]
pub struct ApiKeyAuth {
    header: String,
    query: String,
    keys: HashMap<String, User>,
}

impl From<&config::Auth> for ApiKeyAuth {
    fn from(auth: &config::Auth) -> Self {
        Self {
            header: auth.header.clone(),
            query: auth.query.clone(),
            keys: auth.keys.clone(),
        }
    }
}

impl ApiKeyAuth {
    pub fn authenticate(&self, req_header: &RequestHeader) -> Option<User> {
        if self.keys.is_empty() {
            return None;
        }

        let key = get_req_header_value(req_header, &self.header)
            .or_else(|| get_query_value(req_header, &self.query))
            .filter(|key| !key.is_empty())?;

        let user = self.keys.get(key).cloned();
        if user.is_none() {
            log::debug!("Unknown API key presented");
        }
        user
    }
}
