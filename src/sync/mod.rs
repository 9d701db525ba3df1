pub mod store;
pub mod webdav;

#[cfg(test)]
pub(crate) mod memory;
