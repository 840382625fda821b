pub mod config;
pub mod corpus;
pub mod knowledge;
pub mod logging;
pub mod outcome;
