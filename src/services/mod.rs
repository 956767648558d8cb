pub mod encoder;
pub mod ingestion;
pub mod media;
pub mod scratch;
