//! Pipeline actions - the work each stage does.

pub mod enhance_titles;
pub mod fetch_videos;
pub mod notify_error;
pub mod resolve_channel;
pub mod send_email;
pub mod submit;

pub use enhance_titles::EnhanceContent;
pub use fetch_videos::FetchItems;
pub use notify_error::{notify_error, ErrorNotice};
pub use resolve_channel::ResolveChannel;
pub use send_email::Notify;
pub use submit::{submit_job, SubmitError, Submission};
