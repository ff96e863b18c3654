//! Built-in controllers served by the binary

pub mod notes;
pub mod status;

use pingora_error::Result;

use crate::service::http::ControllerService;

/// Bind the built-in controllers to their routes
pub fn register_builtin(service: &mut ControllerService) -> Result<()> {
    service.route(status::ROUTE, status::StatusController::default)?;
    service.route(notes::ROUTE, notes::NotesController::new)?;
    service.route(notes::ACTION_ROUTE, notes::NotesController::new)?;
    Ok(())
}
