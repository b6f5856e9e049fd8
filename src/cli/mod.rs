pub mod args;

use clap::Parser;
pub use args::{Arguments, Module, QualityMetric};

pub fn parse() -> Arguments {
    Arguments::parse()
}
