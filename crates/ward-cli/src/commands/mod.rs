pub mod auth;
pub mod dispatch;
pub mod profile;
pub mod rls;
pub mod run;
pub mod schema;
pub mod shared;
