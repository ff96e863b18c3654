use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;
use serde::Serialize;

use crate::{
    core::{
        ActionFn, ActionRegistry, Controller, ErrorContext, LifecycleContext, LifecycleResult,
    },
    hook_error,
    utils::view::JsonView,
};

pub const ROUTE: &str = "/notes";
pub const ACTION_ROUTE: &str = "/notes/{action}";

const PAGE_TITLE: &str = "page_title";

#[derive(Clone, Debug, Serialize)]
pub struct Note {
    pub id: u32,
    pub title: String,
    pub archived: bool,
}

/// Read-only notes controller.
///
/// Without an action it renders a summary; `list` and `show` are bound to
/// handlers directly and `admin` is resolved by method name.
pub struct NotesController {
    notes: Vec<Note>,
}

impl Default for NotesController {
    fn default() -> Self {
        Self::new()
    }
}

impl NotesController {
    pub fn new() -> Self {
        Self::with_notes(vec![
            Note {
                id: 1,
                title: "Welcome".to_string(),
                archived: false,
            },
            Note {
                id: 2,
                title: "Release checklist".to_string(),
                archived: true,
            },
        ])
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    fn active(&self) -> Vec<&Note> {
        self.notes.iter().filter(|n| !n.archived).collect()
    }
}

#[async_trait]
impl Controller for NotesController {
    fn register_actions(&self, actions: &mut ActionRegistry<Self>) {
        actions.register_action("list", show_list);
        actions.register_action("show", show_note);
        actions.register_method("admin", Some("adminPanel"));
    }

    fn resolve_action(&self, method: &str) -> Option<ActionFn<Self>> {
        match method {
            "adminPanel" => Some(admin_panel),
            _ => None,
        }
    }

    async fn init(&mut self, cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        cx.set_view(Box::new(JsonView::new()));
        Ok(())
    }

    async fn load(&mut self, cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        cx.set_data("total", self.notes.len())?;
        cx.set_data("active", self.active().len())
    }

    async fn pre_render(&mut self, cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        let title = cx.get_str(PAGE_TITLE).unwrap_or("Notes").to_string();
        cx.set_data("title", title)
    }
}

fn show_list<'a>(
    notes: &'a mut NotesController,
    cx: &'a mut LifecycleContext<'_>,
) -> BoxFuture<'a, LifecycleResult<()>> {
    Box::pin(async move {
        let include_archived = cx.request().param("archived") == Some("true");
        let list: Vec<&Note> = if include_archived {
            notes.notes.iter().collect()
        } else {
            notes.active()
        };
        cx.set_data("notes", list)
    })
}

fn show_note<'a>(
    notes: &'a mut NotesController,
    cx: &'a mut LifecycleContext<'_>,
) -> BoxFuture<'a, LifecycleResult<()>> {
    Box::pin(async move {
        let id = cx
            .request()
            .param("id")
            .ok_or_else(|| hook_error!("Note id is required"))?
            .parse::<u32>()
            .with_context("Invalid note id")?;

        let note = notes
            .notes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| hook_error!("Note {} not found", id))?;
        cx.set(PAGE_TITLE, note.title.clone());
        cx.set_data("note", note)
    })
}

fn admin_panel<'a>(
    notes: &'a mut NotesController,
    cx: &'a mut LifecycleContext<'_>,
) -> BoxFuture<'a, LifecycleResult<()>> {
    Box::pin(async move {
        if !cx.is_admin_user() {
            cx.response().send(StatusCode::FORBIDDEN, "Forbidden");
            cx.terminate();
            return Ok(());
        }

        let archived = notes.notes.iter().filter(|n| n.archived).count();
        cx.set_data("archived", archived)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value as JsonValue};

    use super::*;
    use crate::{
        core::{ExecutionState, User},
        orchestration::{Lifecycle, LifecycleReport},
        utils::{flash::FlashStore, request::HttpRequest, response::BufferedResponse},
    };

    async fn run(request: HttpRequest) -> (LifecycleReport, BufferedResponse) {
        let mut lifecycle = Lifecycle::new(NotesController::new());
        let mut response = BufferedResponse::default();
        let mut flash = FlashStore::default();
        let report = lifecycle.run(&request, &mut response, &mut flash).await;
        (report, response)
    }

    fn body(response: &BufferedResponse) -> JsonValue {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_summary() {
        let (report, response) = run(HttpRequest::new(ROUTE)).await;
        assert!(report.is_success());
        assert_eq!(body(&response)["data"]["total"], json!(2));
        assert_eq!(body(&response)["data"]["active"], json!(1));
        assert_eq!(body(&response)["data"]["title"], json!("Notes"));
    }

    #[tokio::test]
    async fn test_show_note_sets_title() {
        let request = HttpRequest::new(ACTION_ROUTE)
            .with_param("action", "show")
            .with_query("id", "1");
        let (report, response) = run(request).await;

        assert!(report.is_success());
        assert_eq!(body(&response)["data"]["note"]["id"], json!(1));
        assert_eq!(body(&response)["data"]["title"], json!("Welcome"));
    }

    #[tokio::test]
    async fn test_list_action() {
        let request = HttpRequest::new(ACTION_ROUTE).with_param("action", "list");
        let (report, response) = run(request).await;
        assert!(report.is_success());
        assert_eq!(body(&response)["data"]["notes"][0]["title"], json!("Welcome"));
        assert!(body(&response)["data"].get("total").is_none());

        let request = HttpRequest::new(ACTION_ROUTE)
            .with_param("action", "list")
            .with_query("archived", "true");
        let (_, response) = run(request).await;
        assert_eq!(body(&response)["data"]["notes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_show_missing_note_renders_error_view() {
        let request = HttpRequest::new(ACTION_ROUTE)
            .with_param("action", "show")
            .with_query("id", "42");
        let (report, response) = run(request).await;

        assert_eq!(report.state, ExecutionState::Failed);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&response)["error"], json!("Note 42 not found"));

        let request = HttpRequest::new(ACTION_ROUTE)
            .with_param("action", "show")
            .with_query("id", "first");
        let (report, _) = run(request).await;
        let message = report.error.unwrap().to_string();
        assert!(message.starts_with("Invalid note id: "));
    }

    #[tokio::test]
    async fn test_admin_requires_admin_user() {
        let request = HttpRequest::new(ACTION_ROUTE).with_param("action", "admin");
        let (report, response) = run(request).await;
        assert_eq!(report.state, ExecutionState::Terminated);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = HttpRequest::new(ACTION_ROUTE)
            .with_param("action", "admin")
            .with_user(User {
                id: "1".into(),
                name: "root".into(),
                is_admin: true,
            });
        let (report, response) = run(request).await;
        assert!(report.is_success());
        assert_eq!(body(&response)["data"]["archived"], json!(1));
    }
}
