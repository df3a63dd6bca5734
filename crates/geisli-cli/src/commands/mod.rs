pub mod config;
pub mod decode;

mod display;
mod util;
