use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;
use matchit::Router as MatchRouter;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_error::{Error, ErrorType::*, OrErr, Result};
use pingora_http::RequestHeader;
use pingora_proxy::{ProxyHttp, Session};

use crate::{
    config::{Config, LifecycleSettings},
    core::{Controller, ViewHelper},
    orchestration::{Lifecycle, LifecycleReport},
    utils::{
        flash::FlashStore, request::HttpRequest, response::BufferedResponse, view::ClockHelper,
    },
};

use super::auth::ApiKeyAuth;

/// Settings and helpers shared by every lifecycle the service creates
pub struct LifecycleDefaults {
    pub settings: Arc<LifecycleSettings>,
    pub helpers: Vec<Arc<dyn ViewHelper>>,
}

/// Type-erased controller route: builds and runs a fresh lifecycle per request
#[async_trait]
pub trait ControllerHandler: Send + Sync {
    async fn handle(
        &self,
        defaults: &LifecycleDefaults,
        request: &HttpRequest,
        response: &mut BufferedResponse,
    ) -> LifecycleReport;
}

struct ControllerFactory<C, F> {
    factory: F,
    _controller: PhantomData<fn() -> C>,
}

#[async_trait]
impl<C, F> ControllerHandler for ControllerFactory<C, F>
where
    C: Controller,
    F: Fn() -> C + Send + Sync + 'static,
{
    async fn handle(
        &self,
        defaults: &LifecycleDefaults,
        request: &HttpRequest,
        response: &mut BufferedResponse,
    ) -> LifecycleReport {
        let mut lifecycle = Lifecycle::new((self.factory)()).with_settings(defaults.settings.clone());
        for helper in &defaults.helpers {
            lifecycle = lifecycle.with_helper(helper.clone());
        }

        let mut flash = FlashStore::default();
        lifecycle.run(request, response, &mut flash).await
    }
}

struct ControllerRoute {
    pattern: String,
    handler: Arc<dyn ControllerHandler>,
}

/// Per-request access log state
pub struct RequestLog {
    route: Option<String>,
    status: Option<u16>,
    request_id: Option<String>,
    request_start: Instant,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self {
            route: None,
            status: None,
            request_id: None,
            request_start: Instant::now(),
        }
    }
}

/// Controller service.
///
/// Binds route patterns to controllers and answers every request by
/// running a controller lifecycle; nothing is proxied upstream.
pub struct ControllerService {
    matcher: MatchRouter<usize>,
    routes: Vec<ControllerRoute>,
    defaults: LifecycleDefaults,
    auth: ApiKeyAuth,
}

impl Default for ControllerService {
    fn default() -> Self {
        Self::new(LifecycleSettings::default(), ApiKeyAuth::default())
    }
}

impl ControllerService {
    pub fn new(settings: LifecycleSettings, auth: ApiKeyAuth) -> Self {
        Self {
            matcher: MatchRouter::new(),
            routes: Vec::new(),
            defaults: LifecycleDefaults {
                settings: Arc::new(settings),
                helpers: vec![Arc::new(ClockHelper)],
            },
            auth,
        }
    }

    pub fn add_helper(&mut self, helper: Arc<dyn ViewHelper>) {
        self.defaults.helpers.push(helper);
    }

    /// Bind a route pattern (matchit syntax, e.g. `/notes/{action}`) to a
    /// controller factory
    pub fn route<C, F>(&mut self, pattern: &str, factory: F) -> Result<()>
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.matcher
            .insert(pattern, self.routes.len())
            .or_err_with(ReadError, || format!("Invalid controller route {pattern}"))?;

        log::info!("Configuring controller route: {}", pattern);
        self.routes.push(ControllerRoute {
            pattern: pattern.to_string(),
            handler: Arc::new(ControllerFactory {
                factory,
                _controller: PhantomData,
            }),
        });
        Ok(())
    }

    pub fn route_patterns(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.pattern.as_str()).collect()
    }

    /// Match a request header to a route and build the lifecycle request
    pub fn match_request(&self, req_header: &RequestHeader) -> Option<(usize, HttpRequest)> {
        let matched = self.matcher.at(req_header.uri.path()).ok()?;
        let index = *matched.value;
        let params: BTreeMap<String, String> = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut request = HttpRequest::from_header(&self.routes[index].pattern, params, req_header)
            .with_action_param(self.defaults.settings.action_param.clone());
        request.set_user(self.auth.authenticate(req_header));

        Some((index, request))
    }

    /// Run the lifecycle of the route at `index`
    pub async fn dispatch(
        &self,
        index: usize,
        request: &HttpRequest,
    ) -> (LifecycleReport, BufferedResponse) {
        let mut response = BufferedResponse::default();
        let report = self.routes[index]
            .handler
            .handle(&self.defaults, request, &mut response)
            .await;
        (report, response)
    }
}

#[async_trait]
impl ProxyHttp for ControllerService {
    type CTX = RequestLog;

    fn new_ctx(&self) -> Self::CTX {
        Self::CTX::default()
    }

    /// Controllers answer every matched request in `request_filter`
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Error::e_explain(InternalError, "Controller routes have no upstream")
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let Some((index, request)) = self.match_request(session.req_header()) else {
            session
                .respond_error(StatusCode::NOT_FOUND.as_u16())
                .await?;
            ctx.status = Some(StatusCode::NOT_FOUND.as_u16());
            return Ok(true);
        };

        let (report, response) = self.dispatch(index, &request).await;

        ctx.route = Some(self.routes[index].pattern.clone());
        ctx.status = Some(response.status().as_u16());
        ctx.request_id = Some(report.request_id);

        response.flush_to(session).await?;
        Ok(true)
    }

    async fn logging(&self, session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX) {
        let elapsed = ctx.request_start.elapsed().as_millis();
        let path = session.req_header().uri.path();
        match e {
            Some(err) => log::error!(
                "{} {} failed after {}ms: {} [{}]",
                ctx.route.as_deref().unwrap_or("-"),
                path,
                elapsed,
                err,
                ctx.request_id.as_deref().unwrap_or("-")
            ),
            None => log::info!(
                "{} {} {} {}ms [{}]",
                ctx.route.as_deref().unwrap_or("-"),
                path,
                ctx.status.unwrap_or_default(),
                elapsed,
                ctx.request_id.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// Initializes the controller service from the given configuration.
pub fn build_controller_service(config: &Config) -> Result<ControllerService> {
    let mut service = ControllerService::new(config.lifecycle.clone(), ApiKeyAuth::from(&config.auth));
    crate::controllers::register_builtin(&mut service)?;
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config,
        core::{ExecutionState, LifecycleContext, LifecycleResult, User},
    };

    struct Hello;

    #[async_trait]
    impl Controller for Hello {
        async fn load(&mut self, cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
            if !cx.is_authenticated() {
                cx.terminate();
            }
            Ok(())
        }
    }

    fn service() -> ControllerService {
        let mut auth = config::Auth::default();
        auth.keys.insert(
            "key".into(),
            User {
                id: "1".into(),
                ..Default::default()
            },
        );

        let mut service =
            ControllerService::new(LifecycleSettings::default(), ApiKeyAuth::from(&auth));
        service.route("/hello", || Hello).unwrap();
        service.route("/hello/{action}", || Hello).unwrap();
        service
    }

    #[test]
    fn test_route_conflict() {
        let mut service = service();
        assert!(service.route("/hello", || Hello).is_err());
        assert_eq!(service.route_patterns(), vec!["/hello", "/hello/{action}"]);
    }

    #[test]
    fn test_match_request() {
        let service = service();

        let header = RequestHeader::build("GET", b"/hello/list?apikey=key", None).unwrap();
        let (index, request) = service.match_request(&header).unwrap();
        assert_eq!(index, 1);
        assert_eq!(crate::core::Request::action(&request), Some("list"));
        assert!(crate::core::Request::is_authenticated(&request));

        let header = RequestHeader::build("GET", b"/missing", None).unwrap();
        assert!(service.match_request(&header).is_none());
    }

    #[tokio::test]
    async fn test_dispatch() {
        let service = service();

        let header = RequestHeader::build("GET", b"/hello?apikey=key", None).unwrap();
        let (index, request) = service.match_request(&header).unwrap();
        let (report, response) = service.dispatch(index, &request).await;
        assert!(report.is_success());
        assert_eq!(response.body_str(), "OK");

        let header = RequestHeader::build("GET", b"/hello", None).unwrap();
        let (index, request) = service.match_request(&header).unwrap();
        let (report, response) = service.dispatch(index, &request).await;
        assert_eq!(report.state, ExecutionState::Terminated);
        assert!(response.body().is_empty());

        let header = RequestHeader::build("GET", b"/hello/delete?apikey=key", None).unwrap();
        let (index, request) = service.match_request(&header).unwrap();
        let (_, response) = service.dispatch(index, &request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
