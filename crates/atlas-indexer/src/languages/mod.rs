//! Symbol extractors: native Python, LLM-assisted for everything else

pub mod assisted;
pub mod python;

pub use assisted::AssistedExtractor;
pub use python::PythonExtractor;
