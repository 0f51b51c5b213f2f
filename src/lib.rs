pub mod api;
pub mod capture;
pub mod config;
pub mod errors;
pub mod images;
pub mod inference;
pub mod logs;
pub mod manual;
pub mod meals;
pub mod state;

#[cfg(test)]
mod testing;
