mod exec;
mod fs;
mod network;
mod process;

pub use exec::*;
pub use fs::*;
pub use network::*;
pub use process::*;
