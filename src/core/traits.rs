//! Core traits for the controller lifecycle
//!
//! The lifecycle consumes its collaborators (request, response, view,
//! flash store, view helpers) through these narrow interfaces, and user
//! code plugs into it by implementing [`Controller`].

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{
    context::{DataBag, LifecycleContext},
    error::{LifecycleError, LifecycleResult},
    registry::{ActionFn, ActionRegistry},
};

/// Authenticated principal attached to a request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Inbound request as seen by the lifecycle
pub trait Request: Send + Sync {
    /// Route pattern or path the request was bound to, used for diagnostics
    fn route_path(&self) -> &str;

    /// Requested action name, if any
    fn action(&self) -> Option<&str>;

    /// Route or query parameter lookup
    fn param(&self, name: &str) -> Option<&str>;

    /// Authenticated user, if any
    fn user(&self) -> Option<&User>;

    fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

/// Outbound response sink
pub trait Response: Send {
    fn set_status(&mut self, status: StatusCode);

    fn set_header(&mut self, name: &str, value: &str);

    /// Append bytes to the response body
    fn write(&mut self, body: Bytes);

    /// Signal stream completion
    fn end(&mut self);

    fn is_finished(&self) -> bool;

    /// Write a complete response: status, body, then end the stream
    fn send(&mut self, status: StatusCode, body: &str) {
        self.set_status(status);
        self.write(Bytes::copy_from_slice(body.as_bytes()));
        self.end();
    }
}

/// View-rendering target bound by a controller
#[async_trait]
pub trait View: Send {
    fn data(&self) -> &DataBag;

    fn data_mut(&mut self) -> &mut DataBag;

    /// Replace the whole data bag
    fn set_data(&mut self, data: DataBag);

    /// Attach a lifecycle error to the view
    fn set_error(&mut self, error: &LifecycleError);

    /// Render into the response
    async fn render(
        &mut self,
        response: &mut dyn Response,
        request: &dyn Request,
    ) -> LifecycleResult<()>;
}

/// Flash-message store, read once during render
pub trait FlashMessages: Send {
    fn get_messages(&mut self) -> JsonValue;
}

/// Helper injected into the view data bag at render time
pub trait ViewHelper: Send + Sync {
    fn name(&self) -> &str;

    fn value(&self) -> JsonValue;
}

/// User-overridable lifecycle hooks.
///
/// Every hook defaults to immediate success. A hook reports failure by
/// returning an error; it may also call [`LifecycleContext::terminate`]
/// to stop the pipeline at the next stage boundary.
#[async_trait]
pub trait Controller: Sized + Send + Sync + 'static {
    /// Register the actions this controller supports
    fn register_actions(&self, _actions: &mut ActionRegistry<Self>) {}

    /// Resolve a method identifier registered with `register_method`
    fn resolve_action(&self, _method: &str) -> Option<ActionFn<Self>> {
        None
    }

    async fn start(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    async fn pre_init(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    async fn init(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    async fn pre_load(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    /// Default load stage, used when no action is requested
    async fn load(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    async fn pre_render(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    /// Runs during terminal handling when the lifecycle was terminated
    async fn on_terminated(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }

    /// Always runs last
    async fn on_done(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        Ok(())
    }
}
