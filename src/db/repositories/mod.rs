pub mod call;
pub mod user;
