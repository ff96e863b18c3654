//! Load-stage action dispatch
//!
//! Without a requested action the controller's plain `load` hook runs.
//! Otherwise the action registry picks the handler; unknown or
//! unresolvable actions answer with an error response straight away and
//! fail the stage.

use log::{debug, warn};

use crate::{
    config::LifecycleSettings,
    core::{ActionRegistry, Controller, LifecycleContext, LifecycleResult},
};

pub(crate) async fn dispatch_action<C: Controller>(
    controller: &mut C,
    actions: &ActionRegistry<C>,
    cx: &mut LifecycleContext<'_>,
    settings: &LifecycleSettings,
) -> LifecycleResult<()> {
    let request = cx.request;
    let Some(action) = request.action() else {
        return controller.load(cx).await;
    };

    debug!("@@ Trying to load requested action: {}", action);
    let handler = match actions.resolve(action, controller) {
        Ok(handler) => handler,
        Err(e) => {
            warn!("{}: {} [{}]", e, action, cx.request_id);
            cx.response
                .send(settings.error_status_code(), &e.to_string());
            return Err(e);
        }
    };

    handler(controller, cx).await.inspect_err(|e| {
        warn!("Failed to execute action {}. [{}]", action, e);
    })
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use http::StatusCode;

    use super::*;
    use crate::{
        core::{ActionFn, LifecycleError, Response},
        utils::{flash::FlashStore, request::HttpRequest, response::BufferedResponse},
    };

    #[derive(Default)]
    struct Notes {
        calls: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl Controller for Notes {
        fn resolve_action(&self, method: &str) -> Option<ActionFn<Self>> {
            (method == "showList").then_some(show_list as ActionFn<Self>)
        }

        async fn load(&mut self, _cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
            self.calls.push("load");
            Ok(())
        }
    }

    fn show_list<'a>(
        notes: &'a mut Notes,
        _cx: &'a mut LifecycleContext<'_>,
    ) -> BoxFuture<'a, LifecycleResult<()>> {
        Box::pin(async move {
            notes.calls.push("showList");
            Ok(())
        })
    }

    fn failing<'a>(
        _notes: &'a mut Notes,
        _cx: &'a mut LifecycleContext<'_>,
    ) -> BoxFuture<'a, LifecycleResult<()>> {
        Box::pin(async { Err(LifecycleError::hook("storage offline")) })
    }

    async fn dispatch(
        notes: &mut Notes,
        actions: &ActionRegistry<Notes>,
        request: &HttpRequest,
    ) -> (LifecycleResult<()>, BufferedResponse) {
        let mut response = BufferedResponse::default();
        let mut flash = FlashStore::default();
        let mut cx = LifecycleContext::new(request, &mut response, &mut flash);
        let result = dispatch_action(notes, actions, &mut cx, &LifecycleSettings::default()).await;
        drop(cx);
        (result, response)
    }

    #[tokio::test]
    async fn test_no_action_uses_load() {
        let mut notes = Notes::default();
        let actions = ActionRegistry::new();

        let (result, response) = dispatch(&mut notes, &actions, &HttpRequest::new("/notes")).await;
        assert!(result.is_ok());
        assert_eq!(notes.calls, vec!["load"]);
        assert!(!response.is_finished());
    }

    #[tokio::test]
    async fn test_registered_method_is_invoked() {
        let mut notes = Notes::default();
        let mut actions = ActionRegistry::new();
        actions.register_method("list", Some("showList"));

        let request = HttpRequest::new("/notes").with_action("list");
        let (result, _) = dispatch(&mut notes, &actions, &request).await;
        assert!(result.is_ok());
        assert_eq!(notes.calls, vec!["showList"]);
    }

    #[tokio::test]
    async fn test_unregistered_action() {
        let mut notes = Notes::default();
        let mut actions = ActionRegistry::new();
        actions.register_action("list", show_list);

        let request = HttpRequest::new("/notes").with_action("delete");
        let (result, response) = dispatch(&mut notes, &actions, &request).await;
        assert!(matches!(result, Err(LifecycleError::ActionNotAllowed(_))));
        assert!(notes.calls.is_empty());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_str(), "Specified action is not allowed");
        assert!(response.is_finished());
    }

    #[tokio::test]
    async fn test_unresolvable_method() {
        let mut notes = Notes::default();
        let mut actions = ActionRegistry::new();
        actions.register_method("archive", None);

        let request = HttpRequest::new("/notes").with_action("archive");
        let (result, response) = dispatch(&mut notes, &actions, &request).await;
        assert!(matches!(result, Err(LifecycleError::ActionNotExists(ref m)) if m == "archive"));
        assert!(notes.calls.is_empty());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_str(), "Specified action is not exists");
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let mut notes = Notes::default();
        let mut actions = ActionRegistry::new();
        actions.register_action("sync", failing);

        let request = HttpRequest::new("/notes").with_action("sync");
        let (result, response) = dispatch(&mut notes, &actions, &request).await;
        assert!(matches!(result, Err(LifecycleError::Hook(ref m)) if m == "storage offline"));
        // handler errors leave the response to terminal handling
        assert!(!response.is_finished());
    }
}
