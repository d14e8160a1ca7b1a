mod errors;
mod provisioner;
mod storage;
mod types;

pub use errors::ProvisioningError;
pub use provisioner::Provisioner;
pub use storage::SqlProvisioner;
pub use types::{
    AccountRequest, AccountResult, AuthenticationProvider, NewAuthentication,
    NewAuthenticationProvider, NewTeam, NewUser, Team, TeamProvisionRequest, TeamRequest, User,
    UserAuthentication, UserProvisionRequest, UserRole,
};
