// Library exports for testing
// The binary (main.rs) imports these as well

pub mod app;
pub mod cache;
pub mod error;
pub mod logger;
pub mod probe;
pub mod settings;

#[cfg(test)]
mod tests;
