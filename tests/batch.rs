use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;
use plasmid_pipelines::config::defs::{BatchConfig, FilterConfig, SUMMARY_FILE, SUMMARY_HEADER};
use plasmid_pipelines::pipelines::batch::{process_directory, FileOutcome};
use plasmid_pipelines::pipelines::filter::filter_fastq;
use plasmid_pipelines::utils::fastq::{fastq_records, FastqRecord};
use plasmid_pipelines::utils::histogram::read_report;
use plasmid_pipelines::utils::quality::mean_quality;
use plasmid_pipelines::utils::sequence::write_synthetic_fastq;


fn record(id: &str, length: usize) -> String {
    format!("@{}\n{}\n+\n{}\n", id, "G".repeat(length), "I".repeat(length))
}

fn read_all(path: &Path) -> Result<Vec<FastqRecord>> {
    Ok(fastq_records(path)?.collect::<Result<Vec<_>, _>>()?)
}

fn quiet_config(input: &Path) -> BatchConfig {
    let mut config = BatchConfig::new(input);
    config.filter.render_visuals = false;
    config
}


#[test]
fn test_three_reads_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("demultiplexed");
    fs::create_dir_all(input.join("barcode01"))?;
    fs::write(
        input.join("barcode01/reads.fastq"),
        [record("a", 400), record("b", 600), record("c", 650)].concat(),
    )?;

    let mut config = quiet_config(&input);
    config.compress = false;
    let report = process_directory(&config)?;

    let out_sample = dir.path().join("demultiplexed_filtered/barcode01");
    let kept = read_all(&out_sample.join("reads_filtered.fastq"))?;
    assert_eq!(kept.iter().map(|r| r.len()).collect::<Vec<_>>(), vec![600, 650]);

    let lengths = read_report(&out_sample.join("histograms/reads_read_lengths.txt"))?;
    assert_eq!(lengths.iter().map(|r| r.count).sum::<u64>(), 3);
    let qualities = read_report(&out_sample.join("histograms/reads_quality_scores.txt"))?;
    assert_eq!(qualities.iter().map(|r| r.count).sum::<u64>(), 3);

    assert_eq!(report.outcomes.len(), 1);
    assert!(report.failed_files().is_empty());
    Ok(())
}

#[test]
fn test_empty_sample_does_not_stop_batch() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("runs");
    fs::create_dir_all(input.join("empty_sample"))?;
    fs::create_dir_all(input.join("good_sample"))?;
    fs::write(input.join("empty_sample/reads.fastq"), "")?;
    fs::write(input.join("good_sample/reads.fastq"), [record("a", 700), record("b", 900)].concat())?;

    let report = process_directory(&quiet_config(&input))?;
    let out = dir.path().join("runs_filtered");

    let empty_key = out.join("empty_sample/reads_filtered.fastq");
    assert!(matches!(
        report.outcomes.get(&empty_key),
        Some(FileOutcome::NoEstimate { report: None, .. })
    ));
    assert_eq!(report.estimates().get(&empty_key), Some(&None));
    assert!(report.failed_files().is_empty());

    // Both outputs compressed, including the empty one
    assert!(out.join("empty_sample/reads_filtered.fastq.gz").exists());
    assert!(out.join("good_sample/reads_filtered.fastq.gz").exists());
    assert!(!out.join("good_sample/reads_filtered.fastq").exists());
    assert_eq!(report.compressed.len(), 2);

    // The empty sample contributes no summary rows
    let summary = fs::read_to_string(out.join(SUMMARY_FILE))?;
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], SUMMARY_HEADER);
    assert_eq!(lines.len(), 3);
    assert!(lines[1..].iter().all(|l| l.starts_with("good_sample\t")));
    assert_eq!(report.summary_path, Some(out.join(SUMMARY_FILE)));
    Ok(())
}

#[test]
fn test_construct_length_from_two_clusters() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("plasmids");
    fs::create_dir_all(input.join("sample_a"))?;

    let clusters = [
        (449, 10), (450, 30), (451, 10),
        (4998, 20), (4999, 40), (5000, 80), (5001, 40), (5002, 20),
    ];
    let mut lengths: Vec<usize> = clusters
        .iter()
        .flat_map(|&(len, n)| std::iter::repeat_n(len, n))
        .collect();
    let mut rng = StdRng::seed_from_u64(42);
    // Interleave so file order carries no signal
    for i in (1..lengths.len()).rev() {
        lengths.swap(i, rng.random_range(0..=i));
    }
    {
        let mut writer = BufWriter::new(File::create(input.join("sample_a/reads.fastq"))?);
        write_synthetic_fastq(&mut writer, &lengths, 30.0, 3.0, &mut rng)?;
    }

    let report = process_directory(&quiet_config(&input))?;
    let estimates: Vec<Option<f64>> = report.estimates().into_values().collect();
    assert_eq!(estimates.len(), 1);
    let estimate = estimates[0].expect("construct length should be called");
    assert!((estimate - 5000.0).abs() <= 1.0, "estimate {}", estimate);
    Ok(())
}

#[test]
fn test_output_matches_filter_predicate() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("mixed.fastq");
    let output = dir.path().join("mixed_filtered.fastq");

    let mut rng = StdRng::seed_from_u64(1234);
    let lengths: Vec<usize> = (0..300).map(|_| rng.random_range(0..1200)).collect();
    {
        let mut writer = BufWriter::new(File::create(&input)?);
        write_synthetic_fastq(&mut writer, &lengths, 12.0, 6.0, &mut rng)?;
    }

    let config = FilterConfig { render_visuals: false, ..Default::default() };
    let outcome = filter_fastq(&input, &output, dir.path(), &config)?;

    let expected: Vec<FastqRecord> = read_all(&input)?
        .into_iter()
        .filter(|r| r.len() >= config.min_length && mean_quality(&r.quality) >= config.min_mean_quality)
        .collect();
    let written = read_all(&output)?;
    assert_eq!(written, expected);
    assert_eq!(outcome.report.passed_both, written.len());
    assert_eq!(outcome.report.total, 300);
    assert_eq!(outcome.length_histogram.total(), 300);
    assert_eq!(outcome.quality_histogram.total(), 300);
    Ok(())
}

#[test]
fn test_nested_tree_is_mirrored() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("in");
    fs::create_dir_all(input.join("plate1/barcode05"))?;
    fs::create_dir_all(input.join("plate1/no_reads_here"))?;
    fs::write(input.join("plate1/barcode05/pass.fastq"), record("x", 800))?;
    fs::write(input.join("plate1/barcode05/readme.txt"), "not a sequence file")?;

    let mut config = quiet_config(&input);
    config.output_directory_name = Some("filtered_demultiplexed_fastqs".to_string());
    let report = process_directory(&config)?;

    let out = dir.path().join("filtered_demultiplexed_fastqs");
    assert_eq!(report.output_root, out);
    assert!(out.join("plate1/no_reads_here").is_dir());
    assert!(out.join("plate1/barcode05/histograms/pass_read_lengths.txt").exists());
    assert!(out.join("plate1/barcode05/pass_filtered.fastq.gz").exists());
    assert!(!out.join("plate1/barcode05/readme.txt").exists());
    Ok(())
}
