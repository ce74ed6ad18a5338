#![deny(warnings)]
pub mod game;
pub mod inference;
pub mod model;
pub mod sim;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "mystery-box"
    }

    pub const fn codename() -> &'static str {
        "Bayesian Boxes"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
