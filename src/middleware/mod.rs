pub mod guard;
pub mod navigation;

pub use guard::require_session;
pub use navigation::{is_protected_path, login_redirect, navigation_guard};
