#![deny(warnings)]
pub mod game;
pub mod model;
pub mod scoring;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "pokersquares"
    }

    pub const fn codename() -> &'static str {
        "Monte Carlo Squares"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
