pub mod error;
pub mod listing;
pub mod reader;
pub mod source;
pub mod transform;

pub use error::{ReadError, SourceError, TransformError};
pub use listing::list_candidates;
pub use reader::{read_file, read_path};
pub use source::FolderSource;
pub use transform::Transformer;
