//! Per-controller action registry
//!
//! Maps action names from the request to the handler that replaces the
//! default load stage. One registry belongs to one lifecycle instance and
//! is never shared between requests.

use std::collections::HashMap;

use futures::future::BoxFuture;
use log::debug;

use super::{
    context::LifecycleContext,
    error::{LifecycleError, LifecycleResult},
    traits::Controller,
};

/// Strongly typed action handler
pub type ActionFn<C> =
    for<'a, 'b> fn(&'a mut C, &'a mut LifecycleContext<'b>) -> BoxFuture<'a, LifecycleResult<()>>;

/// What an action name is bound to
pub enum ActionTarget<C> {
    /// Handler registered directly
    Handler(ActionFn<C>),

    /// Method identifier resolved through [`Controller::resolve_action`] at dispatch time
    Method(String),
}

impl<C> Clone for ActionTarget<C> {
    fn clone(&self) -> Self {
        match self {
            ActionTarget::Handler(handler) => ActionTarget::Handler(*handler),
            ActionTarget::Method(method) => ActionTarget::Method(method.clone()),
        }
    }
}

impl<C> std::fmt::Debug for ActionTarget<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionTarget::Handler(_) => f.write_str("Handler(..)"),
            ActionTarget::Method(method) => write!(f, "Method({method})"),
        }
    }
}

/// Registry of allowed actions for one controller
pub struct ActionRegistry<C> {
    actions: HashMap<String, ActionTarget<C>>,
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ActionRegistry<C> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Bind an action name to a handler, replacing any previous binding
    pub fn register_action(&mut self, name: impl Into<String>, handler: ActionFn<C>) {
        let name = name.into();
        debug!("Registering action handler: {}", name);
        self.actions.insert(name, ActionTarget::Handler(handler));
    }

    /// Bind an action name to a method identifier; the action name itself
    /// is used when `method` is `None`
    pub fn register_method(&mut self, name: impl Into<String>, method: Option<&str>) {
        let name = name.into();
        let method = method.map(str::to_string).unwrap_or_else(|| name.clone());
        debug!("Registering action {} -> {}", name, method);
        self.actions.insert(name, ActionTarget::Method(method));
    }

    /// Remove an action, returning its previous binding
    pub fn remove_action(&mut self, name: &str) -> Option<ActionTarget<C>> {
        debug!("Removing action: {}", name);
        self.actions.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ActionTarget<C>> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<C: Controller> ActionRegistry<C> {
    /// Resolve an action name to a callable handler
    ///
    /// # Errors
    /// `ActionNotAllowed` when the name is not registered, `ActionNotExists`
    /// when it is bound to a method the controller cannot resolve.
    pub fn resolve(&self, name: &str, controller: &C) -> LifecycleResult<ActionFn<C>> {
        match self.actions.get(name) {
            None => Err(LifecycleError::ActionNotAllowed(name.to_string())),
            Some(ActionTarget::Handler(handler)) => Ok(*handler),
            Some(ActionTarget::Method(method)) => controller
                .resolve_action(method)
                .ok_or_else(|| LifecycleError::ActionNotExists(method.clone())),
        }
    }
}
