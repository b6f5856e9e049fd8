use clap::{Parser, ValueEnum};
use crate::config::defs::{DEFAULT_MIN_LENGTH, DEFAULT_MIN_MEAN_QUALITY, DEFAULT_NEST_PREFIX, FASTQ_EXT};

#[derive(Debug, Clone, ValueEnum, Default, PartialEq)]
pub enum Module {
    #[default]
    #[value(name = "filter_fastqs")]
    FilterFastqs,
    #[value(name = "histogram_stats")]
    HistogramStats,
    #[value(name = "gzip_fastqs")]
    GzipFastqs,
    #[value(name = "prune_empty_dirs")]
    PruneEmptyDirs,
    #[value(name = "nest_files")]
    NestFiles,
}

/// How per-base Phred scores are reduced to one score per read.
#[derive(Debug, Clone, ValueEnum, Default, PartialEq)]
pub enum QualityMetric {
    #[default]
    Mean,
    Median,
    ErrorCorrected,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "plasmid-pipelines", version, about = "Nanopore plasmid read filtering and construct-length estimation")]
pub struct Arguments {

    #[arg(short, long, value_enum, default_value = "filter_fastqs")]
    pub module: Module,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(short = 'i', long = "input", help = "Input root directory (searched recursively for .fastq files)")]
    pub input_dir: Option<String>,

    #[arg(short = 'o', long = "out", help = "Output directory. A bare name is created next to the input directory; if not specified, '<input>_filtered' is used.")]
    pub out: Option<String>,

    #[arg(short = 'l', long, default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: usize,

    #[arg(short = 'q', long, default_value_t = DEFAULT_MIN_MEAN_QUALITY)]
    pub min_mean_quality: f64,

    #[arg(long, default_value = "mean", value_enum)]
    pub quality_metric: QualityMetric,

    #[arg(long, default_value_t = false, help = "Skip PNG rendering of histograms")]
    pub no_plots: bool,

    #[arg(long, default_value_t = false)]
    pub no_compress: bool,

    #[arg(long, default_value_t = false)]
    pub keep_uncompressed: bool,

    #[arg(long, default_value_t = false)]
    pub no_summary: bool,

    #[arg(long, default_value_t = false, help = "Abort the batch on the first file that cannot be processed")]
    pub fail_fast: bool,

    #[arg(long, default_value = DEFAULT_NEST_PREFIX)] // barcode kit prefix written by the demultiplexer
    pub prefix: String,

    #[arg(long, default_value = FASTQ_EXT)]
    pub extension: String,
}
