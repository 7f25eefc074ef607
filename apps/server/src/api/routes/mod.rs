pub mod admin;
pub mod public;

pub use admin::admin_routes;
pub use public::public_routes;
