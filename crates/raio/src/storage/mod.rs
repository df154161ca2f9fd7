pub mod attachments;

pub use attachments::{AttachmentStore, SaveOutcome, SavedFile};
