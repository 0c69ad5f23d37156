// Dataset sources: where raw bid tables come from.

pub mod file;
pub mod traits;

pub use file::FileSource;
pub use traits::{DatasetSource, SourceFile};
