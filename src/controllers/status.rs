use async_trait::async_trait;

use crate::core::{Controller, LifecycleContext, LifecycleResult};

pub const ROUTE: &str = "/status";

/// Liveness endpoint: binds no view, so the render stage acknowledges
/// with the plain body.
#[derive(Default)]
pub struct StatusController;

#[async_trait]
impl Controller for StatusController {
    async fn on_done(&mut self, cx: &mut LifecycleContext<'_>) -> LifecycleResult<()> {
        log::trace!("Status check served [{}]", cx.request_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        orchestration::Lifecycle,
        utils::{flash::FlashStore, request::HttpRequest, response::BufferedResponse},
    };

    #[tokio::test]
    async fn test_status_acknowledges() {
        let mut lifecycle = Lifecycle::new(StatusController);
        let mut response = BufferedResponse::default();
        let mut flash = FlashStore::default();

        let report = lifecycle
            .run(&HttpRequest::new(ROUTE), &mut response, &mut flash)
            .await;

        assert!(report.is_success());
        assert_eq!(response.body_str(), "OK");
    }
}
