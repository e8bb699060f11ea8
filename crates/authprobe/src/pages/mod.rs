//! Concrete page objects of the application under test.

pub mod home;
pub mod login;

pub use home::{HomeLocators, HomePage};
pub use login::{LoginLocators, LoginPage};
