/// Handler Module Index
///
/// Handlers are grouped the same way as the routers that mount them.

/// Anonymous read access plus the login gateway.
pub mod public;

/// Any signed-in identity.
pub mod account;

/// Management sections. Every handler here runs behind the admin gate.
pub mod admin;
