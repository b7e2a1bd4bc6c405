//! All the database models live here.

pub use account::*;
pub use friendship::*;
pub use message::*;
pub use post::*;

mod account;
mod friendship;
mod message;
mod post;
