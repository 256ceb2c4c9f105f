pub use super::call_records::Entity as CallRecords;
pub use super::users::Entity as Users;
