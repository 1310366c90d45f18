//! Topic names connecting the pipeline stages.

/// Intake → ResolveChannel
pub const SUBMIT: &str = "submit";

pub const CHANNEL_RESOLVED: &str = "channel.resolved";
pub const CHANNEL_ERROR: &str = "channel.error";

pub const FETCHED_ITEMS: &str = "fetched.items";
pub const FETCHED_ITEMS_ERROR: &str = "fetched.items.error";

pub const ENHANCED_CONTENT: &str = "enhanced.content";
pub const ENHANCED_CONTENT_ERROR: &str = "enhanced.content.error";

/// Notify succeeded. Nothing subscribes.
pub const EMAIL_SENT: &str = "email.sent";

/// ErrorNotifier delivered the failure email. Nothing subscribes.
pub const ERROR_NOTIFIED: &str = "error.notified";

/// Topics the error notifier listens on.
pub const ERROR_TOPICS: [&str; 3] = [CHANNEL_ERROR, FETCHED_ITEMS_ERROR, ENHANCED_CONTENT_ERROR];
