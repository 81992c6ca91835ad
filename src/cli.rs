pub mod command;
pub mod dump;
pub mod formats;
pub mod info;
