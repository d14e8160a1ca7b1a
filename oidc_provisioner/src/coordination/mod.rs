mod account;
mod errors;
mod login;
mod secondary;

pub use account::{build_account_request, provision_primary_account, resolve_display_name};
pub use errors::CoordinationError;
pub use login::{
    AuthenticationResult, LoginStage, begin_login, complete_login, get_authorized_core,
    login_client, login_host, post_authorized_core, provision_login,
};
pub use secondary::{provision_secondary_account, select_result, wanted_domain};
