pub mod gate;
pub mod models;
pub mod token;

pub use gate::{
    AllowedRoles, AuthError, CurrentUser, authenticate, authorize, check_admin, check_roles,
    is_admin,
};
pub use models::{Claims, Credentials, Principal, Role};
pub use token::{TokenError, TokenKeys, has_token_shape};
