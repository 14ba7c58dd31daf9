/*! Inter-annotator agreement.

Statistics computed over loaded [Results]:

- mean pairwise agreement: proportion of answer pairs about the same predicate that agree,
- Fleiss' kappa over the answer distributions of all predicates,
- mean Cohen's kappa between workers of the same HIT.
!*/
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;

use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::analysis::{PredicateAnswers, Results};
use crate::error::Error;

/// Fleiss' kappa of a subjects × categories count matrix.
///
/// Subjects may have a varying number of ratings; those rated less than twice are ignored.
/// Returns `None` when there is nothing to compute on or when agreement by chance is certain.
pub fn fleiss_kappa(rows: &[Vec<usize>]) -> Option<f64> {
    let rows: Vec<&Vec<usize>> = rows.iter().filter(|r| r.iter().sum::<usize>() >= 2).collect();
    if rows.is_empty() {
        return None;
    }
    let nb_categories = rows.iter().map(|r| r.len()).max().unwrap_or(0);

    let mut totals = vec![0usize; nb_categories];
    let mut p_bar = 0.0;
    for row in &rows {
        let n: usize = row.iter().sum();
        let agreeing: usize = row.iter().map(|c| c * c).sum::<usize>() - n;
        p_bar += agreeing as f64 / (n * (n - 1)) as f64;
        for (total, count) in totals.iter_mut().zip(row.iter()) {
            *total += count;
        }
    }
    p_bar /= rows.len() as f64;

    let nb_ratings: usize = totals.iter().sum();
    let p_e: f64 = totals
        .iter()
        .map(|t| {
            let p = *t as f64 / nb_ratings as f64;
            p * p
        })
        .sum();

    if (1.0 - p_e).abs() < f64::EPSILON {
        return None;
    }
    Some((p_bar - p_e) / (1.0 - p_e))
}

/// Unweighted Cohen's kappa between two raters.
///
/// Returns `None` if ratings have different lengths or are empty.
/// Two raters that only use the same single label agree perfectly.
pub fn cohen_kappa(a: &[u8], b: &[u8]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let n = a.len() as f64;
    let labels: BTreeSet<u8> = a.iter().chain(b.iter()).copied().collect();

    let p_o = a.iter().zip(b).filter(|(x, y)| x == y).count() as f64 / n;
    let p_e: f64 = labels
        .iter()
        .map(|l| {
            let pa = a.iter().filter(|x| *x == l).count() as f64 / n;
            let pb = b.iter().filter(|x| *x == l).count() as f64 / n;
            pa * pb
        })
        .sum();

    if (1.0 - p_e).abs() < f64::EPSILON {
        return Some(1.0);
    }
    Some((p_o - p_e) / (1.0 - p_e))
}

/// Proportion of agreeing answer pairs.
pub fn pairwise_agreement(results: &Results) -> Option<f64> {
    let (agreeing, total) = results
        .values()
        .flat_map(|sent| sent.answer_pairs())
        .fold((0usize, 0usize), |(agreeing, total), (a, b)| {
            (agreeing + usize::from(a == b), total + 1)
        });
    if total == 0 {
        return None;
    }
    Some(agreeing as f64 / total as f64)
}

/// Fleiss' kappa over all predicates.
pub fn fleiss_kappa_of(results: &Results) -> Option<f64> {
    let rows: Vec<Vec<usize>> = results
        .values()
        .flat_map(|sent| sent.answers().map(|(_, distr, _)| distr.to_vec()))
        .collect();
    debug!("fleiss kappa over {} predicates", rows.len());
    fleiss_kappa(&rows)
}

/// Predicates grouped by the HIT they were asked in.
fn predicates_by_hit(results: &Results) -> BTreeMap<&str, Vec<&PredicateAnswers>> {
    let mut by_hit: BTreeMap<&str, Vec<&PredicateAnswers>> = BTreeMap::new();
    for pred in results.values().flat_map(|sent| sent.predicates.values()) {
        by_hit.entry(pred.hit_id.as_str()).or_default().push(pred);
    }
    by_hit
}

/// Mean Cohen's kappa between every pair of workers of each HIT, and the number of HITs.
///
/// A pair of workers is compared over the predicates both of them answered.
pub fn cohen_kappa_by_hit(results: &Results) -> (Option<f64>, usize) {
    let by_hit = predicates_by_hit(results);
    let mut kappas = Vec::new();

    for preds in by_hit.values() {
        let workers: BTreeSet<&str> = preds
            .iter()
            .flat_map(|p| p.workers.keys().map(String::as_str))
            .collect();

        for (w1, w2) in workers.iter().tuple_combinations() {
            let (a, b): (Vec<u8>, Vec<u8>) = preds
                .iter()
                .filter_map(|p| match (p.workers.get(*w1), p.workers.get(*w2)) {
                    (Some(x), Some(y)) => Some((x.answer, y.answer)),
                    _ => None,
                })
                .unzip();
            match cohen_kappa(&a, &b) {
                Some(k) => kappas.push(k),
                None => debug!("workers {} and {} share no predicate", w1, w2),
            }
        }
    }

    if kappas.is_empty() {
        return (None, by_hit.len());
    }
    let mean = kappas.iter().sum::<f64>() / kappas.len() as f64;
    (Some(mean), by_hit.len())
}

/// Landis & Koch interpretation of a kappa value.
pub fn interpret_kappa(kappa: f64) -> &'static str {
    if kappa < 0.0 {
        "poor"
    } else if kappa <= 0.20 {
        "slight"
    } else if kappa <= 0.40 {
        "fair"
    } else if kappa <= 0.60 {
        "moderate"
    } else if kappa <= 0.80 {
        "substantial"
    } else {
        "almost perfect"
    }
}

/// Agreement statistics of a results file.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub sentences: usize,
    pub predicates: usize,
    pub hits: usize,
    pub pairwise_agreement: Option<f64>,
    pub fleiss_kappa: Option<f64>,
    pub cohen_kappa: Option<f64>,
}

impl Report {
    pub fn new(results: &Results) -> Self {
        let predicates = results.values().map(|s| s.predicates.len()).sum();
        let (cohen_kappa, hits) = cohen_kappa_by_hit(results);
        let report = Self {
            sentences: results.len(),
            predicates,
            hits,
            pairwise_agreement: pairwise_agreement(results),
            fleiss_kappa: fleiss_kappa_of(results),
            cohen_kappa,
        };
        if report.fleiss_kappa.is_none() {
            warn!("fleiss kappa is undefined for these results");
        }
        report
    }
}

fn write_stat(f: &mut fmt::Formatter<'_>, name: &str, value: Option<f64>, kappa: bool) -> fmt::Result {
    match value {
        Some(v) if kappa => writeln!(f, "{}: {:.6} ({})", name, v, interpret_kappa(v)),
        Some(v) => writeln!(f, "{}: {:.6}", name, v),
        None => writeln!(f, "{}: undefined", name),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} sentences, {} predicates, {} hits",
            self.sentences, self.predicates, self.hits
        )?;
        write_stat(f, "pairwise agreement", self.pairwise_agreement, false)?;
        write_stat(f, "fleiss kappa", self.fleiss_kappa, true)?;
        write_stat(f, "cohen kappa (mean by hit)", self.cohen_kappa, true)
    }
}

/// Score of a single predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateScore {
    pub sent_id: String,
    pub pred_id: String,
    pub mean: f64,
    /// Answers, space separated.
    pub answers: String,
}

/// Per predicate scores, by descending mean.
pub fn score_table(results: &Results) -> Vec<PredicateScore> {
    results
        .values()
        .flat_map(|sent| {
            sent.predicates.values().filter_map(move |pred| {
                pred.mean().map(|mean| PredicateScore {
                    sent_id: sent.sent_id.clone(),
                    pred_id: pred.pred_id.clone(),
                    mean,
                    answers: pred.answers().iter().join(" "),
                })
            })
        })
        .sorted_by(|a, b| b.mean.total_cmp(&a.mean))
        .collect()
}

/// Write scores as csv.
pub fn write_scores<W: Write>(w: W, scores: &[PredicateScore]) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(w);
    for score in scores {
        writer.serialize(score)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::load_results;
    use crate::analysis::tests::{hit, results_csv};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn fleiss_textbook() {
        let rows = vec![
            vec![0, 0, 0, 0, 14],
            vec![0, 2, 6, 4, 2],
            vec![0, 0, 3, 5, 6],
            vec![0, 3, 9, 2, 0],
            vec![2, 2, 8, 1, 1],
            vec![7, 7, 0, 0, 0],
            vec![3, 2, 6, 3, 0],
            vec![2, 5, 3, 2, 2],
            vec![6, 5, 2, 1, 0],
            vec![0, 2, 2, 3, 7],
        ];
        let k = fleiss_kappa(&rows).unwrap();
        assert!(close(k, 0.2099), "{}", k);
    }

    #[test]
    fn fleiss_undefined() {
        assert_eq!(fleiss_kappa(&[]), None);
        assert_eq!(fleiss_kappa(&[vec![0, 1]]), None);
        // everybody always answers 1
        assert_eq!(fleiss_kappa(&[vec![0, 3], vec![0, 3]]), None);
    }

    #[test]
    fn fleiss_perfect() {
        let k = fleiss_kappa(&[vec![3, 0], vec![0, 3]]).unwrap();
        assert!(close(k, 1.0));
    }

    #[test]
    fn cohen() {
        let k = cohen_kappa(&[1, 1, 0, 0], &[1, 0, 0, 0]).unwrap();
        assert!(close(k, 0.5), "{}", k);
        assert_eq!(cohen_kappa(&[1, 1], &[1, 1]), Some(1.0));
        assert_eq!(cohen_kappa(&[1], &[1, 0]), None);
        assert_eq!(cohen_kappa(&[], &[]), None);
        let k = cohen_kappa(&[1, 0], &[0, 1]).unwrap();
        assert!(close(k, -1.0));
    }

    #[test]
    fn interpretation() {
        assert_eq!(interpret_kappa(-0.1), "poor");
        assert_eq!(interpret_kappa(0.21), "fair");
        assert_eq!(interpret_kappa(0.9), "almost perfect");
    }

    fn results() -> Results {
        let h1 = hit(&[
            ("q_1", "s1", "pred.normal.1.0"),
            ("q_2", "s1", "pred.normal.3.2"),
            ("q_3", "s2", "pred.normal.0.1"),
            ("q_4", "s2", "pred.normal.4.1"),
        ]);
        let csv = results_csv(&[
            (h1.as_str(), "w1", vec!["1", "1", "0", "0"]),
            (h1.as_str(), "w2", vec!["1", "0", "0", "0"]),
        ]);
        load_results(csv.as_bytes()).unwrap()
    }

    #[test]
    fn statistics() {
        let r = results();
        assert_eq!(pairwise_agreement(&r), Some(0.75));

        let (k, hits) = cohen_kappa_by_hit(&r);
        assert_eq!(hits, 1);
        assert!(close(k.unwrap(), 0.5));

        let report = Report::new(&r);
        assert_eq!(report.sentences, 2);
        assert_eq!(report.predicates, 4);
        assert!(report.fleiss_kappa.is_some());
        let text = report.to_string();
        assert!(text.contains("pairwise agreement: 0.750000"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["hits"], 1);
    }

    #[test]
    fn empty_results() {
        let r = Results::new();
        assert_eq!(pairwise_agreement(&r), None);
        assert_eq!(cohen_kappa_by_hit(&r), (None, 0));
        assert!(Report::new(&r).to_string().contains("undefined"));
    }

    #[test]
    fn scores() {
        let r = results();
        let scores = score_table(&r);
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0].mean, 1.0);
        assert_eq!(scores[0].answers, "1 1");
        assert_eq!(scores[3].mean, 0.0);
        assert!(scores.windows(2).all(|w| w[0].mean >= w[1].mean));

        let mut buf = Vec::new();
        write_scores(&mut buf, &scores).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("sent_id,pred_id,mean,answers\n"));
    }
}
