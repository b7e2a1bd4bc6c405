//! Channels to long-running in-process tasks.

pub use ws_manager_chan::*;

mod ws_manager_chan;
