pub mod bridge;
pub mod init;
pub mod utils;
pub mod watch;

pub use bridge::bridge;
pub use init::init;
pub use watch::{check, watch};
