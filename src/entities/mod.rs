pub mod prelude;

pub mod call_records;
pub mod users;
