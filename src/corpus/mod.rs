pub mod api;
pub mod archive;
pub mod files;
pub mod strings;

pub use api::{generate, PayloadContext};
pub use files::{generate_all, load_corpus, mime_for, prepare_corpus, write_corpus, CorpusFile, CorpusOptions, DefectClass, FileFormat};
