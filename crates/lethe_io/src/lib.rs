mod source;
mod writer;

pub use source::ImageSource;
pub use writer::{write_new, write_replace};
