// lib.rs
pub mod aligner;
pub mod catalog;
pub mod concord;
pub mod faidx;
pub mod hits;
pub mod report;
pub mod sampler;
pub mod sequence_index;
pub mod store;
