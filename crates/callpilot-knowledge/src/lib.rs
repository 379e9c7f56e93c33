//! Knowledge-base builds for a tenant's voice assistant.
//!
//! [`build_knowledge_base`] runs the whole pipeline: crawl the business
//! website, clean each page, pack the text into size-bounded files, upload
//! them with [`VoiceClient`], and persist the file rows and summary.

pub mod error;
pub mod pipeline;
pub mod upload;

pub use error::KnowledgeError;
pub use pipeline::{
    build_knowledge_base, KnowledgeBuildRequest, KnowledgeFileSummary, KnowledgeOutcome,
};
pub use upload::VoiceClient;
