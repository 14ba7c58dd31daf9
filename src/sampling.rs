/*! Sentence sampling.

- [reservoir_sample] samples `k` items from a stream of unknown length (Algorithm R),
- [sample_conllu]/[multi_sample] sample sentences of CoNLL-U files, labelling them with their origin,
- [sub_sample] samples sentences across already sampled files, proportionally to their sentence counts,
- [sample_blocks] samples labelled blocks of a single file.

Every function takes its random generator so that runs can be reproduced with a seed.
!*/
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution};
use rayon::prelude::*;

use crate::conllu::{BlockReader, ConlluReader};
use crate::error::Error;

/// Sample `k` items uniformly from `items`.
///
/// Returns every item (in order) if there are fewer than `k`.
pub fn reservoir_sample<I, T, R>(items: I, k: usize, rng: &mut R) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    R: Rng + ?Sized,
{
    let mut ret = Vec::new();
    let mut seen = 0;
    for (i, item) in items.into_iter().enumerate() {
        if i % 1000 == 0 && i > 0 {
            debug!("reservoir: {} items seen", i);
        }
        seen = i + 1;
        if i < k {
            ret.push(item);
        } else {
            let j = rng.gen_range(1..=i + 1);
            if j <= k {
                ret[j - 1] = item;
            }
        }
    }
    debug!("reservoir: sampled {} out of {} items", ret.len(), seen);
    ret
}

/// File name of `path`, lossily converted.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sample `k` sentences of `src` and write them to `dst` as CoNLL-U,
/// each labelled with `<file name>__<index in src>`.
///
/// Returns the number of written sentences.
pub fn sample_conllu<R: Rng + ?Sized>(
    k: usize,
    src: &Path,
    dst: &Path,
    rng: &mut R,
) -> Result<usize, Error> {
    let name = file_name(src);
    let sentences = ConlluReader::from_path(src)?
        .enumerate()
        .map(|(i, s)| s.map(|s| (format!("{}__{}", name, i + 1), s)));
    let sample = itertools::process_results(sentences, |it| reservoir_sample(it, k, rng))?;

    let blocks: Vec<String> = sample
        .iter()
        .map(|(label, s)| s.to_conllu(Some(label.as_str())))
        .collect();
    let mut f = File::create(dst)?;
    writeln!(f, "{}", blocks.join("\n\n"))?;
    Ok(sample.len())
}

/// Read a file list: one file name per line, empty lines ignored.
pub fn read_file_list(path: &Path) -> Result<Vec<String>, Error> {
    let f = BufReader::new(File::open(path)?);
    let mut ret = Vec::new();
    for line in f.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            ret.push(line.to_string());
        }
    }
    Ok(ret)
}

/// Names of the files of `dir`, sorted.
pub fn list_dir(dir: &Path) -> Result<Vec<String>, Error> {
    let pattern = dir.join("*");
    let mut ret = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let entry = entry?;
        if entry.is_file() {
            ret.push(file_name(&entry));
        }
    }
    ret.sort();
    Ok(ret)
}

/// Run [sample_conllu] on each file of `files` (relative to `src_dir`), in parallel.
///
/// Outputs are written in `dst_dir`, named after the file name up to its first `.`.
/// When a seed is given, the i-th file is sampled with seed `seed + i`.
/// Returns the total number of sampled sentences.
pub fn multi_sample(
    k: usize,
    files: &[String],
    src_dir: &Path,
    dst_dir: &Path,
    seed: Option<u64>,
) -> Result<usize, Error> {
    fs::create_dir_all(dst_dir)?;
    let start = Instant::now();

    let results: Vec<Result<usize, Error>> = files
        .par_iter()
        .enumerate()
        .map(|(i, filename)| {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s.wrapping_add(i as u64)),
                None => StdRng::from_entropy(),
            };
            let src = src_dir.join(filename);
            let name = filename.split('.').next().unwrap_or(filename);
            let dst = dst_dir.join(name);

            info!("{} => start!", filename);
            let file_start = Instant::now();
            let nb = sample_conllu(k, &src, &dst, &mut rng)?;
            info!(
                "{} => {} sentences, time elapsed: {:.2}m",
                filename,
                nb,
                file_start.elapsed().as_secs_f64() / 60.0
            );
            Ok(nb)
        })
        .collect();

    let mut total = 0;
    let mut errors = Vec::new();
    for r in results {
        match r {
            Ok(nb) => total += nb,
            Err(e) => {
                error!("{}", e);
                errors.push(e);
            }
        }
    }
    info!(
        "total time elapsed: {:.2}m",
        start.elapsed().as_secs_f64() / 60.0
    );

    match errors.into_iter().next() {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

/// Draw the number of outcomes of each category among `n` trials,
/// category probabilities being proportional to `weights`.
///
/// Draws are done category by category, from a binomial distribution conditioned on previous draws.
pub fn multinomial<R: Rng + ?Sized>(
    n: u64,
    weights: &[f64],
    rng: &mut R,
) -> Result<Vec<u64>, Error> {
    if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
        return Err(Error::Sampling(format!("invalid weights: {:?}", weights)));
    }
    let mut mass: f64 = weights.iter().sum();
    if mass <= 0.0 {
        return Err(Error::Sampling("weights sum to zero".to_string()));
    }

    let mut remaining = n;
    let mut ret = Vec::with_capacity(weights.len());
    for (i, w) in weights.iter().enumerate() {
        if i == weights.len() - 1 {
            ret.push(remaining);
            break;
        }
        let draw = if remaining == 0 || mass <= 0.0 {
            0
        } else {
            let p = (w / mass).clamp(0.0, 1.0);
            Binomial::new(remaining, p)?.sample(rng)
        };
        ret.push(draw);
        remaining -= draw;
        mass -= w;
    }
    Ok(ret)
}

/// Read a count file: `<file name>\t<count>` lines.
pub fn read_counts(path: &Path) -> Result<Vec<(String, u64)>, Error> {
    let f = BufReader::new(File::open(path)?);
    let mut ret = Vec::new();
    for (line_no, line) in f.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.trim().split('\t');
        let (name, count) = match (parts.next(), parts.next()) {
            (Some(name), Some(count)) => (name, count),
            _ => {
                return Err(Error::Sampling(format!(
                    "{:?}:{}: expected <file>\\t<count>",
                    path,
                    line_no + 1
                )))
            }
        };
        let count = count.trim().parse::<u64>().map_err(|_| {
            Error::Sampling(format!(
                "{:?}:{}: invalid count {:?}",
                path,
                line_no + 1,
                count
            ))
        })?;
        ret.push((name.to_string(), count));
    }
    Ok(ret)
}

/// Sample `n` blocks among files of `files_dir`, proportionally to the counts of `count_file`.
///
/// Each file of the count file is looked up in `files_dir` by its name up to the first `.`.
/// Blocks are sampled without replacement, it is an error to draw more blocks than a file has.
pub fn sub_sample<R: Rng + ?Sized>(
    n: u64,
    count_file: &Path,
    files_dir: &Path,
    rng: &mut R,
) -> Result<Vec<String>, Error> {
    let counts = read_counts(count_file)?;
    let weights: Vec<f64> = counts.iter().map(|(_, c)| *c as f64).collect();
    let draws = multinomial(n, &weights, rng)?;

    let mut ret = Vec::new();
    for ((filename, _), nb) in counts.iter().zip(draws) {
        if nb == 0 {
            continue;
        }
        let name = filename.split('.').next().unwrap_or(filename);
        let path: PathBuf = files_dir.join(name);
        let blocks: Vec<String> = BlockReader::from_path(&path)?
            .map(|b| b.map(|b| b.text()))
            .collect::<Result<_, _>>()?;
        let nb = nb as usize;
        if blocks.len() < nb {
            return Err(Error::Sampling(format!(
                "{:?} has {} blocks, {} requested",
                path,
                blocks.len(),
                nb
            )));
        }
        debug!("{:?}: sampling {} out of {} blocks", path, nb, blocks.len());
        ret.extend(
            rand::seq::index::sample(rng, blocks.len(), nb)
                .into_iter()
                .map(|i| blocks[i].clone()),
        );
    }
    Ok(ret)
}

/// Label each block of `path` with `<base name>_<7 digits 1-based index>` and sample `n` of them.
pub fn sample_blocks<R: Rng + ?Sized>(
    path: &Path,
    n: usize,
    rng: &mut R,
) -> Result<Vec<String>, Error> {
    let name = file_name(path);
    let blocks: Vec<String> = BlockReader::from_path(path)?
        .enumerate()
        .map(|(i, b)| b.map(|b| format!("# {}_{:07}\n{}", name, i + 1, b.text())))
        .collect::<Result<_, _>>()?;
    if blocks.len() < n {
        return Err(Error::Sampling(format!(
            "{:?} has {} blocks, {} requested",
            path,
            blocks.len(),
            n
        )));
    }
    Ok(rand::seq::index::sample(rng, blocks.len(), n)
        .into_iter()
        .map(|i| blocks[i].clone())
        .collect())
}
