use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use log::{self, LevelFilter, debug, info, error};
use env_logger::Builder;
use plasmid_pipelines::cli::parse;
use plasmid_pipelines::cli::args::Module;
use plasmid_pipelines::config::defs::{BatchConfig, PipelineError, RunConfig};
use plasmid_pipelines::pipelines::{batch, summary};
use plasmid_pipelines::utils::file::{gzip_fastqs, nest_files, prune_empty_dirs};


fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n Plasmid Pipelines\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}\n", dir);

    let module = args.module.clone();
    let run_config = RunConfig {
        cwd: dir,
        args,
        log_level,
    };
    debug!("Running {:?} at log level {}", module, run_config.log_level);

    if let Err(e) = match module {
        Module::FilterFastqs => filter_fastqs_run(&run_config),
        Module::HistogramStats => histogram_stats_run(&run_config),
        Module::GzipFastqs => gzip_fastqs_run(&run_config),
        Module::PruneEmptyDirs => prune_empty_dirs_run(&run_config),
        Module::NestFiles => nest_files_run(&run_config),
    } {
        error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}


fn filter_fastqs_run(run_config: &RunConfig) -> Result<(), PipelineError> {
    let config = BatchConfig::from_args(&run_config.args, &run_config.cwd)?;
    let report = batch::process_directory(&config)?;

    for (output, estimate) in report.estimates() {
        match estimate {
            Some(length) => println!("{}\t{:.1}", output.display(), length),
            None => println!("{}\tNA", output.display()),
        }
    }
    if let Some(summary_path) = &report.summary_path {
        info!("Histogram summary: {}", summary_path.display());
    }
    Ok(())
}

fn histogram_stats_run(run_config: &RunConfig) -> Result<(), PipelineError> {
    let root = input_dir(run_config)?;
    summary::extract_histogram_stats(&root)?;
    Ok(())
}

fn gzip_fastqs_run(run_config: &RunConfig) -> Result<(), PipelineError> {
    let root = input_dir(run_config)?;
    let compressed = gzip_fastqs(&root, run_config.args.keep_uncompressed)?;
    info!("Compressed {} file(s) under {}", compressed.len(), root.display());
    Ok(())
}

fn prune_empty_dirs_run(run_config: &RunConfig) -> Result<(), PipelineError> {
    let root = input_dir(run_config)?;
    let removed = prune_empty_dirs(&root)?;
    info!("Removed {} empty director(ies) under {}", removed.len(), root.display());
    Ok(())
}

fn nest_files_run(run_config: &RunConfig) -> Result<(), PipelineError> {
    let root = input_dir(run_config)?;
    let args = &run_config.args;
    let moved = nest_files(&root, &args.prefix, &args.extension)?;
    info!("Nested {} file(s) under {}", moved.len(), root.display());
    Ok(())
}


/// Resolves `-i` against the working directory and checks it is a directory.
///
/// # Arguments
/// * `run_config` - Parsed arguments and working directory.
///
/// # Returns
/// Absolute path to the input directory.
fn input_dir(run_config: &RunConfig) -> Result<PathBuf, PipelineError> {
    let raw = run_config
        .args
        .input_dir
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidConfig("Input directory required (-i)".to_string()))?;
    let path = PathBuf::from(raw);
    let path = if path.is_absolute() {
        path
    } else {
        run_config.cwd.join(path)
    };
    if !path.is_dir() {
        return Err(PipelineError::InvalidConfig(format!("{} is not a directory", path.display())));
    }
    Ok(path)
}
