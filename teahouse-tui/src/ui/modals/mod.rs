// Modal rendering modules
mod utils;
mod components;
mod dialogs;
mod forms;
mod help;
mod search;
mod thread;

// Re-export all public functions
pub use dialogs::*;
pub use forms::*;
pub use help::*;
pub use search::*;
pub use thread::*;
