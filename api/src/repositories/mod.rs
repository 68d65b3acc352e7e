pub mod metadata_repository;

pub use metadata_repository::{
    FileMetadataRepository, InMemoryMetadataRepository, MetadataRepository,
};
