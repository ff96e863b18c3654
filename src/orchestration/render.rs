//! Render-stage dispatch and error rendering

use std::sync::Arc;

use http::StatusCode;
use log::{debug, error};

use crate::{
    config::LifecycleSettings,
    core::{LifecycleContext, LifecycleResult, ViewHelper},
};

/// Render the bound view, or acknowledge with a plain body when there is none.
pub(crate) async fn render(
    cx: &mut LifecycleContext<'_>,
    helpers: &[Arc<dyn ViewHelper>],
    settings: &LifecycleSettings,
) -> LifecycleResult<()> {
    let Some(mut view) = cx.view.take() else {
        cx.response.send(StatusCode::OK, &settings.ack_body);
        return Ok(());
    };

    // The view and the lifecycle share one data bag after this point.
    if cx.data.is_empty() {
        cx.data = view.data().clone();
    } else {
        view.set_data(cx.data.clone());
    }

    if let Some(error) = &cx.captured_error {
        view.set_error(error);
    }

    for helper in helpers {
        let value = helper.value();
        cx.data.insert(helper.name().to_string(), value.clone());
        view.data_mut().insert(helper.name().to_string(), value);
    }

    let messages = cx.flash.get_messages();
    cx.data.insert(settings.flash_key.clone(), messages.clone());
    view.data_mut().insert(settings.flash_key.clone(), messages);

    let result = view.render(&mut *cx.response, cx.request).await;
    // A failed render leaves the response open for error rendering
    if result.is_ok() {
        cx.response.end();
    }
    cx.view = Some(view);
    result
}

/// Write the captured error to the response.
///
/// Skipped when a response was already completed (for example by the
/// action dispatcher).
pub(crate) async fn render_error(cx: &mut LifecycleContext<'_>, settings: &LifecycleSettings) {
    let Some(err) = cx.captured_error.as_ref() else {
        return;
    };

    if cx.response.is_finished() {
        debug!("Response already sent, not rendering error: {}", err);
        return;
    }

    if let Some(view) = cx.view.as_mut() {
        view.set_error(err);
        match view.render(&mut *cx.response, cx.request).await {
            Ok(()) => {
                cx.response.end();
                return;
            }
            Err(e) => error!("Failed to render error view: {}", e),
        }
    }

    if !cx.response.is_finished() {
        cx.response.send(settings.error_status_code(), &err.to_string());
    }
}
