/// Authorization helpers and permission checks
///
/// Kutubxona uses three role tiers plus an ownership refinement:
///
/// 1. **Role tiers**: `User < MaterialAdmin < SuperAdmin`, checked per route group
/// 2. **Ownership**: a material admin may only list, edit, delete, and inspect
///    materials they uploaded
/// 3. **Upload types**: a material admin may only upload books and apps
/// 4. **Role changes**: only between `User` and `MaterialAdmin`, never on self
///    and never on another super admin
///
/// Every check here is a pure function over the caller's identity and the
/// row in question; handlers load rows and map failures to responses.
///
/// # Example
///
/// ```
/// use kutubxona_shared::auth::authorization::{require_upload_type, AuthzError};
/// use kutubxona_shared::auth::middleware::AuthContext;
/// use kutubxona_shared::models::material::MaterialType;
/// use kutubxona_shared::models::user::Role;
///
/// let scoped = AuthContext { user_id: 7, name: "Bob".into(), role: Role::MaterialAdmin };
///
/// assert!(require_upload_type(&scoped, MaterialType::Book).is_ok());
/// assert!(matches!(
///     require_upload_type(&scoped, MaterialType::Video),
///     Err(AuthzError::TypeNotPermitted(MaterialType::Video))
/// ));
/// ```

use super::middleware::AuthContext;
use crate::models::material::{Material, MaterialFilter, MaterialType};
use crate::models::user::{Role, User};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is below the required tier
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole { required: Role, actual: Role },

    /// Material admin acting on a material uploaded by someone else
    #[error("Material {0} belongs to another user")]
    NotOwner(i64),

    /// Material admin uploading a type reserved for super admins
    #[error("Uploading {0} materials is not permitted")]
    TypeNotPermitted(MaterialType),

    /// Super admin trying to change their own role
    #[error("Cannot change your own role")]
    SelfTarget,

    /// Trying to change the role of a super admin
    #[error("Cannot change another super admin")]
    SuperAdminTarget,
}

/// Which materials a caller may see in the admin panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialScope {
    /// Every material
    All,

    /// Only materials uploaded by this user
    OwnedBy(i64),
}

impl MaterialScope {
    /// Converts the scope into a listing filter
    pub fn filter(&self) -> MaterialFilter {
        match self {
            MaterialScope::All => MaterialFilter::default(),
            MaterialScope::OwnedBy(user_id) => MaterialFilter {
                uploaded_by: Some(*user_id),
                ..Default::default()
            },
        }
    }
}

/// Checks that the caller holds at least `required`
///
/// # Errors
///
/// Returns `AuthzError::InsufficientRole` when the caller's role is lower
pub fn require_role(auth: &AuthContext, required: Role) -> Result<(), AuthzError> {
    if !auth.role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        });
    }

    Ok(())
}

/// Checks that the caller may edit, delete, or inspect `material`
///
/// Super admins may act on any material. Material admins only on their own.
/// Plain users never reach material management routes, but are rejected here
/// as well.
pub fn require_material_access(auth: &AuthContext, material: &Material) -> Result<(), AuthzError> {
    require_role(auth, Role::MaterialAdmin)?;

    if auth.role.is_ownership_scoped() && !material.is_owned_by(auth.user_id) {
        return Err(AuthzError::NotOwner(material.id));
    }

    Ok(())
}

/// Checks that the caller may upload a material of `material_type`
pub fn require_upload_type(
    auth: &AuthContext,
    material_type: MaterialType,
) -> Result<(), AuthzError> {
    require_role(auth, Role::MaterialAdmin)?;

    let permitted = match auth.role {
        Role::SuperAdmin => true,
        _ => matches!(material_type, MaterialType::Book | MaterialType::App),
    };

    if !permitted {
        return Err(AuthzError::TypeNotPermitted(material_type));
    }

    Ok(())
}

/// Visibility of materials in the admin panel for the caller
pub fn material_scope(auth: &AuthContext) -> MaterialScope {
    if auth.role.is_ownership_scoped() {
        MaterialScope::OwnedBy(auth.user_id)
    } else {
        MaterialScope::All
    }
}

/// Computes the new role for a role toggle by `auth` on `target`
///
/// Toggles between `User` and `MaterialAdmin`.
///
/// # Errors
///
/// - `InsufficientRole` unless the caller is a super admin
/// - `SelfTarget` when the caller targets themselves
/// - `SuperAdminTarget` when the target is a super admin
pub fn toggle_target_role(auth: &AuthContext, target: &User) -> Result<Role, AuthzError> {
    require_role(auth, Role::SuperAdmin)?;

    if target.id == auth.user_id {
        return Err(AuthzError::SelfTarget);
    }

    match target.role {
        Role::SuperAdmin => Err(AuthzError::SuperAdminTarget),
        Role::MaterialAdmin => Ok(Role::User),
        Role::User => Ok(Role::MaterialAdmin),
    }
}
