pub mod authority;
pub mod profile;
pub mod template;
