pub mod fastq;
pub mod file;
pub mod histogram;
pub mod peaks;
pub mod plotting;
pub mod quality;
pub mod sequence;
pub mod stats;
