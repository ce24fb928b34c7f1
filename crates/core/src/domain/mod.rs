pub mod analysis;
pub mod settings;
