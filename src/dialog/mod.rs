pub mod confirm_dialog;
pub mod import_dialog;
pub mod message_dialog;

pub use confirm_dialog::ConfirmDialog;
pub use import_dialog::ImportDialog;
pub use message_dialog::MessageDialog;
