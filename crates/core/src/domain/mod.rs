pub mod character;
pub mod parameter;
pub mod session;
