use std::io::{self, Write};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use crate::config::defs::PHRED_OFFSET;

const MAX_PHRED: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DNA {
    A,
    C,
    G,
    T,
}

impl DNA {
    /// Convert nucleotide to its character representation.
    pub fn to_char(&self) -> char {
        match self {
            DNA::A => 'A',
            DNA::C => 'C',
            DNA::G => 'G',
            DNA::T => 'T',
        }
    }

    /// Get all possible nucleotides as a static slice.
    pub fn all() -> &'static [DNA] {
        &[DNA::A, DNA::C, DNA::G, DNA::T]
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> DNA {
        let all = DNA::all();
        all[rng.random_range(0..all.len())]
    }

    /// Generate a random sequence of nucleotides of the given length.
    pub fn random_sequence<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
        (0..length).map(|_| DNA::random(rng).to_char()).collect()
    }
}

fn phred33(score: u8) -> u8 {
    score + PHRED_OFFSET
}

/// Phred+33 string whose per-base scores are drawn from N(mean, stdev),
/// redrawn until they fall in [0, 40].
pub fn normal_phred_qual_string<R: Rng + ?Sized>(length: usize, mean: f32, stdev: f32, rng: &mut R) -> String {
    let normal = match Normal::new(mean, stdev) {
        Ok(normal) => normal,
        // Non-finite or negative spread: every base at the clamped mean
        Err(_) => return (phred33(mean.clamp(0.0, MAX_PHRED) as u8) as char).to_string().repeat(length),
    };
    (0..length)
        .map(|_| {
            let mut raw_phred = normal.sample(rng);
            while !(0.0..=MAX_PHRED).contains(&raw_phred) {
                raw_phred = normal.sample(rng);
            }
            phred33(raw_phred as u8) as char
        })
        .collect()
}

/// Writes one synthetic read per entry of `lengths`, named `@read<N>`.
///
/// # Arguments
/// * `writer` - Destination.
/// * `lengths` - Read lengths, written in order.
/// * `mean_q`, `stdev_q` - Per-base quality distribution.
/// * `rng` - Randomness source; seed it for reproducible fixtures.
pub fn write_synthetic_fastq<W: Write, R: Rng + ?Sized>(
    writer: &mut W,
    lengths: &[usize],
    mean_q: f32,
    stdev_q: f32,
    rng: &mut R,
) -> io::Result<()> {
    for (i, &length) in lengths.iter().enumerate() {
        writeln!(writer, "@read{}", i + 1)?;
        writeln!(writer, "{}", DNA::random_sequence(length, rng))?;
        writeln!(writer, "+")?;
        writeln!(writer, "{}", normal_phred_qual_string(length, mean_q, stdev_q, rng))?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::utils::fastq::FastqRecords;

    #[test]
    fn test_random_nucleotide() {
        let mut rng = StdRng::seed_from_u64(7);
        let dna = DNA::random(&mut rng);
        assert!(matches!(
            dna,
            DNA::A | DNA::C | DNA::G | DNA::T
        ));
    }

    #[test]
    fn test_random_sequence() {
        let mut rng = StdRng::seed_from_u64(7);
        let seq = DNA::random_sequence(10, &mut rng);
        assert_eq!(seq.len(), 10);
        assert!(seq.chars().all(|c| "ACGT".contains(c)));
    }

    #[test]
    fn test_qual_string_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let quals = normal_phred_qual_string(500, 20.0, 8.0, &mut rng);
        assert_eq!(quals.len(), 500);
        assert!(quals.bytes().all(|b| (b'!'..=b'I').contains(&b)));
    }

    #[test]
    fn test_synthetic_fastq_parses() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = Vec::new();
        write_synthetic_fastq(&mut out, &[5, 0, 12], 30.0, 2.0, &mut rng)?;
        let lengths: Vec<usize> = FastqRecords::new(out.as_slice())
            .map(|r| r.map(|r| r.len()))
            .collect::<Result<_, _>>()?;
        assert_eq!(lengths, vec![5, 0, 12]);
        Ok(())
    }
}
