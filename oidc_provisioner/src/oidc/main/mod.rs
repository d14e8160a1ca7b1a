mod core;
mod userinfo;
mod utils;

pub use userinfo::fetch_profile;
pub use utils::{clear_state_cookie, verify_login_state};

pub(crate) use utils::get_client;
