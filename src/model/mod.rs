pub mod config;
pub mod index;
pub mod list;
pub mod task;
pub mod view;

pub use config::*;
pub use index::*;
pub use list::*;
pub use task::*;
pub use view::*;
