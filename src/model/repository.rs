/// Module that holds the repositories for the database access.
pub mod account;
pub mod character;
