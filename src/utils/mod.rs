// Utilities shared by the walker, the ingestor and the retriever

pub mod paths;
