pub mod entry;
pub mod list;
pub mod paths;
