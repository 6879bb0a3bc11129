pub mod user_context;

pub use user_context::{make_span_with_user, CurrentUser, USER_ID_HEADER};
