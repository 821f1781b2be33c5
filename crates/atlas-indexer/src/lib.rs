//! Archive intake, tree walking, classification and symbol extraction

pub mod archive;
pub mod classify;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod resolver;
pub mod walker;


pub use archive::{Extraction, extract_archive, prepare_workdir};
pub use classify::{classify, classify_component, classify_path};
pub use extractor::{
    ContentExtractor, ExtractedFile, ExtractionStats, FileMetadata, LinkKind, RawLink,
    SymbolExtractor,
};
pub use languages::{AssistedExtractor, PythonExtractor};
pub use parser_pool::{ParseRequest, ParseResult, ParserPool, create_parser_pool};
pub use resolver::{ReferenceResolver, ResolutionStats, ResolvedLink};
pub use walker::{ProjectStructure, StructureWalker};
