mod resolver;

pub use resolver::{
    PrimaryTenant, TeamDomain, derive_team_domain, ensure_secondary_tenant, resolve_primary,
};
