pub mod auth;
pub mod extract;
pub mod trace;
pub mod validated_json;

pub use auth::RequireKeyAuth;
pub use extract::{ApiPath, ApiQuery};
pub use validated_json::ValidatedJson;
