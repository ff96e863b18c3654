//! Controller lifecycle execution
//!
//! This module drives one request through the fixed stage pipeline:
//! START, PRE_INIT, INIT, PRE_LOAD, LOAD, PRE_RENDER, RENDER, followed by
//! terminal handling.
//!
//! Stages run strictly one after another. Before each stage a guard checks
//! the execution state; a terminated or failed lifecycle jumps straight to
//! terminal handling. Cancellation is cooperative: `terminate()` only takes
//! effect at the next stage boundary. There is no timeout, so a hook that
//! never completes stalls its request.

use std::sync::Arc;

use log::{debug, warn};

use crate::{
    config::LifecycleSettings,
    core::{
        ActionFn, ActionRegistry, ActionTarget, Controller, EventBus, ExecutionState,
        FlashMessages, LifecycleContext, LifecycleError, LifecycleEvent, LifecycleResult,
        Request, Response, ViewHelper,
    },
};

use super::{dispatcher::dispatch_action, render, stage::Stage};

/// Outcome of one lifecycle run
#[derive(Debug)]
pub struct LifecycleReport {
    pub request_id: String,
    pub state: ExecutionState,
    /// First error recorded during the run, if any
    pub error: Option<LifecycleError>,
    /// Stages whose hooks completed successfully, in order
    pub stages: Vec<Stage>,
}

impl LifecycleReport {
    /// True when every stage ran and nothing failed
    pub fn is_success(&self) -> bool {
        self.state.is_running() && self.error.is_none() && self.stages.len() == Stage::ALL.len()
    }
}

/// One request-scoped controller lifecycle.
///
/// Owns the controller, its action registry, its event listeners and the
/// view helpers handed to the render stage. Never shared between requests.
pub struct Lifecycle<C: Controller> {
    controller: C,
    actions: ActionRegistry<C>,
    events: EventBus,
    helpers: Vec<Arc<dyn ViewHelper>>,
    settings: Arc<LifecycleSettings>,
}

impl<C: Controller> Lifecycle<C> {
    /// Create a lifecycle; the controller registers its own actions here
    pub fn new(controller: C) -> Self {
        let mut actions = ActionRegistry::new();
        controller.register_actions(&mut actions);

        Self {
            controller,
            actions,
            events: EventBus::new(),
            helpers: Vec::new(),
            settings: Arc::new(LifecycleSettings::default()),
        }
    }

    pub fn with_settings(mut self, settings: Arc<LifecycleSettings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_helper(mut self, helper: Arc<dyn ViewHelper>) -> Self {
        self.helpers.push(helper);
        self
    }

    pub fn register_action(&mut self, name: impl Into<String>, handler: ActionFn<C>) {
        self.actions.register_action(name, handler);
    }

    pub fn register_method(&mut self, name: impl Into<String>, method: Option<&str>) {
        self.actions.register_method(name, method);
    }

    pub fn remove_action(&mut self, name: &str) -> Option<ActionTarget<C>> {
        self.actions.remove_action(name)
    }

    pub fn actions(&self) -> &ActionRegistry<C> {
        &self.actions
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn into_controller(self) -> C {
        self.controller
    }

    /// Run the complete lifecycle. Never fails: every error ends up in the
    /// response and in the returned report.
    pub async fn run(
        &mut self,
        request: &dyn Request,
        response: &mut dyn Response,
        flash: &mut dyn FlashMessages,
    ) -> LifecycleReport {
        let mut cx = LifecycleContext::new(request, response, flash);
        let mut stages = Vec::with_capacity(Stage::ALL.len());

        let result = self.run_stages(&mut cx, &mut stages).await;
        self.finish(&mut cx, result).await;

        LifecycleReport {
            request_id: cx.request_id.clone(),
            state: cx.state,
            error: cx.captured_error.take(),
            stages,
        }
    }

    async fn run_stages(
        &mut self,
        cx: &mut LifecycleContext<'_>,
        completed: &mut Vec<Stage>,
    ) -> LifecycleResult<()> {
        for stage in Stage::ALL {
            cx.check_propagation()?;

            debug!(
                "@@ {} controller {} [{}]",
                stage.verb(),
                cx.request.route_path(),
                cx.request_id
            );
            let result = self.run_stage(stage, cx).await;

            for event in stage.events() {
                self.events.emit(*event);
            }

            result?;
            completed.push(stage);
        }

        self.events.emit(LifecycleEvent::PostRender);
        Ok(())
    }

    async fn run_stage(&mut self, stage: Stage, cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        match stage {
            Stage::Start => self.controller.start(cx).await,
            Stage::PreInit => self.controller.pre_init(cx).await,
            Stage::Init => self.controller.init(cx).await,
            Stage::PreLoad => self.controller.pre_load(cx).await,
            Stage::Load => {
                dispatch_action(&mut self.controller, &self.actions, cx, &self.settings).await
            }
            Stage::PreRender => self.controller.pre_render(cx).await,
            Stage::Render => render::render(cx, &self.helpers, &self.settings).await,
        }
    }

    /// Terminal handling: error rendering, then the final hooks. Errors
    /// from `on_terminated` and `on_done` are logged and dropped.
    async fn finish(&mut self, cx: &mut LifecycleContext<'_>, result: LifecycleResult<()>) {
        if let Err(e) = result {
            debug!("Controller {} stopped: {} [{}]", cx.request.route_path(), e, cx.request_id);
            cx.analyze_lifecycle_error(Some(e));

            if !cx.is_terminated() {
                render::render_error(cx, &self.settings).await;
            }
        }

        if cx.is_terminated() {
            match self.controller.on_terminated(cx).await {
                Ok(()) => debug!("@@@@ Controller termination handler [{}]", cx.request_id),
                Err(e) => warn!("Termination handler failed: {} [{}]", e, cx.request_id),
            }
        }

        match self.controller.on_done(cx).await {
            Ok(()) => debug!("@@@@ Controller finished [{}]", cx.request_id),
            Err(e) => warn!("Done handler failed: {} [{}]", e, cx.request_id),
        }
    }
}
