//! Request context management
//!
//! This module provides the [`LifecycleContext`] that holds per-request
//! lifecycle state and gives hooks access to the request collaborators.

use std::{any::Any, collections::HashMap};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{
    error::{LifecycleError, LifecycleResult},
    state::ExecutionState,
    traits::{FlashMessages, Request, Response, User, View},
};

/// Output data accumulated across stages and handed to the view
pub type DataBag = Map<String, JsonValue>;

/// Per-request lifecycle state shared by the engine and the hooks
pub struct LifecycleContext<'a> {
    pub(crate) request: &'a dyn Request,
    pub(crate) response: &'a mut dyn Response,
    pub(crate) flash: &'a mut dyn FlashMessages,

    /// Identifier of this run, used in log lines
    pub(crate) request_id: String,

    pub(crate) state: ExecutionState,
    pub(crate) captured_error: Option<LifecycleError>,
    pub(crate) view: Option<Box<dyn View>>,

    /// Output data for the view
    pub data: DataBag,

    /// Custom variables available to hooks (type-erased)
    vars: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl<'a> LifecycleContext<'a> {
    pub fn new(
        request: &'a dyn Request,
        response: &'a mut dyn Response,
        flash: &'a mut dyn FlashMessages,
    ) -> Self {
        Self {
            request,
            response,
            flash,
            request_id: uuid::Uuid::new_v4().to_string(),
            state: ExecutionState::default(),
            captured_error: None,
            view: None,
            data: DataBag::new(),
            vars: HashMap::new(),
        }
    }

    pub fn request(&self) -> &dyn Request {
        self.request
    }

    pub fn response(&mut self) -> &mut dyn Response {
        &mut *self.response
    }

    pub fn flash(&mut self) -> &mut dyn FlashMessages {
        &mut *self.flash
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn execution_state(&self) -> ExecutionState {
        self.state
    }

    /// Stop the lifecycle; remaining stages are skipped at the next boundary
    pub fn terminate(&mut self) {
        self.state = ExecutionState::Terminated;
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ExecutionState::Terminated
    }

    pub fn is_failed(&self) -> bool {
        self.state == ExecutionState::Failed
    }

    /// Record a stage error. A running lifecycle becomes `Failed`; an
    /// already stopped one keeps its state. The first error wins.
    pub fn analyze_lifecycle_error(&mut self, error: Option<LifecycleError>) {
        let Some(error) = error else {
            return;
        };

        if self.state.is_running() {
            self.state = ExecutionState::Failed;
        }
        if self.captured_error.is_none() {
            self.captured_error = Some(error);
        }
    }

    pub fn captured_error(&self) -> Option<&LifecycleError> {
        self.captured_error.as_ref()
    }

    /// Guard evaluated before every stage hook
    ///
    /// # Errors
    /// `Terminated` or `Failed` once the lifecycle has stopped running.
    pub fn check_propagation(&self) -> LifecycleResult<()> {
        match self.state {
            ExecutionState::Terminated => Err(LifecycleError::Terminated),
            ExecutionState::Failed => Err(LifecycleError::Failed),
            ExecutionState::Running => Ok(()),
        }
    }

    /// Bind a view for the render stage
    pub fn set_view(&mut self, view: Box<dyn View>) {
        self.view = Some(view);
    }

    pub fn view(&self) -> Option<&dyn View> {
        self.view.as_deref()
    }

    pub fn has_view(&self) -> bool {
        self.view.is_some()
    }

    /// Serialize a value into the output data bag
    pub fn set_data<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> LifecycleResult<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.into(), value);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.request.is_authenticated()
    }

    pub fn user(&self) -> Option<&User> {
        self.request.user()
    }

    /// Check whether the current user is an authenticated admin
    pub fn is_admin_user(&self) -> bool {
        self.is_authenticated() && self.request.user().is_some_and(|user| user.is_admin)
    }

    /// Store a typed value into the context
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.vars.insert(key.into(), Box::new(value));
    }

    /// Get a typed reference from the context
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.vars.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Get a string slice if the stored value is a `String`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get::<String>(key).map(|s| s.as_str())
    }

}
