pub mod records;
pub mod system;

// Re-export handler functions for use in routing
pub use records::delete as record_delete;
pub use records::get as record_get;
pub use records::list as table_list;
pub use records::patch as record_patch;
pub use records::post as table_post;
pub use system::{health, root};
