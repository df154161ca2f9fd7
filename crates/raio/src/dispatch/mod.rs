//! Routing of extracted attachments to their handlers.
//!
//! Images go to a [`Presenter`] that shows them on the display; every other
//! attachment is only logged.

pub mod dispatcher;
pub mod presenter;

pub use dispatcher::{DispatchReport, Dispatcher, Route};
pub use presenter::{CommandPresenter, Presenter, PresenterError};
