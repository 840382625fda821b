pub mod critique;
pub mod ingest;
pub mod search;
pub mod status;
