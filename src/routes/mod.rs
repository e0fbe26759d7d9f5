/// Router Module Index
///
/// Routes are split by the access they require. The split is enforced with router
/// layers in `create_router`, so a handler cannot end up in a weaker router by accident.

/// Anonymous, read-only content plus the login gateway.
pub mod public;

/// Any signed-in identity, regardless of role.
pub mod authenticated;

/// Management sections under `/admin/`, behind the role gate.
pub mod admin;
