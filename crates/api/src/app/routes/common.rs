use axum::http::Method;

use warden_auth::PermissionLevel;
use warden_core::RbacResult;

use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Level an HTTP method needs on the area's module.
///
/// Reads need `read`; every mutation, deletes included, needs `write`, which
/// is the highest level the seeded roles hold.
pub fn required_level(method: &Method) -> PermissionLevel {
    if method == Method::GET || method == Method::HEAD {
        PermissionLevel::Read
    } else {
        PermissionLevel::Write
    }
}

/// Gate the caller on a protected area, addressed by its module name.
pub async fn guard(
    services: &AppServices,
    principal: &PrincipalContext,
    module: &str,
    required: PermissionLevel,
) -> RbacResult<()> {
    services.gate.require_named(principal.user_id(), module, required).await
}
