pub mod clients;
pub mod collection;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod indexer;
pub mod logging;
pub mod merge;
pub mod report;
pub mod resource;
pub mod stats;
pub mod validate;
pub mod xml;
