/*! HIT results loading.

Results are csv files with one row per (HIT, worker) assignment. Relevant columns are:

- `Input.json_variables`: the HIT row, as generated,
- `WorkerId`,
- `Answer.correctness_<questionID>`: `0` or `1` for each question of the HIT.

Answers are grouped by sentence, then by predicate, then by worker.
Only questions about normal predicates are kept.
!*/
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use itertools::Itertools;
use log::{debug, info};

use crate::error::Error;
use crate::hit::HitQuestion;

pub const INPUT_COLUMN: &str = "Input.json_variables";
pub const WORKER_COLUMN: &str = "WorkerId";
pub const ANSWER_PREFIX: &str = "Answer.correctness_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub worker_id: String,
    pub answer: u8,
}

impl Worker {
    /// Parse a correctness answer, which has to be `0` or `1`.
    pub fn new(worker_id: &str, answer: &str) -> Result<Self, Error> {
        match answer.trim() {
            "0" => Ok(Self {
                worker_id: worker_id.to_string(),
                answer: 0,
            }),
            "1" => Ok(Self {
                worker_id: worker_id.to_string(),
                answer: 1,
            }),
            other => Err(Error::InvalidAnswer {
                worker: worker_id.to_string(),
                answer: other.to_string(),
            }),
        }
    }
}

/// Answers of workers about a single predicate.
#[derive(Debug, Clone)]
pub struct PredicateAnswers {
    /// Raw `Input.json_variables` of the HIT the predicate was asked in.
    pub hit_id: String,
    pub pred_id: String,
    pub pred_html: String,
    pub question: HitQuestion,
    /// Pretty print of the predicate, with tabs and newlines restored.
    pub pprint: Option<String>,
    /// Workers by id.
    pub workers: BTreeMap<String, Worker>,
}

impl PredicateAnswers {
    fn new(hit_id: &str, question: &HitQuestion) -> Self {
        let pprint = if question.pprint.is_empty() {
            None
        } else {
            Some(question.pprint.replace("\\t", "\t").replace("\\n", "\n"))
        };
        Self {
            hit_id: hit_id.to_string(),
            pred_id: question.pred_id.clone(),
            pred_html: question.predicate.clone(),
            question: question.clone(),
            pprint,
            workers: BTreeMap::new(),
        }
    }

    /// Answers, in worker id order.
    pub fn answers(&self) -> Vec<u8> {
        self.workers.values().map(|w| w.answer).collect()
    }

    /// Number of `0` and `1` answers.
    pub fn distribution(&self) -> [usize; 2] {
        let mut distr = [0, 0];
        for w in self.workers.values() {
            distr[w.answer as usize] += 1;
        }
        distr
    }

    /// Mean answer, `None` if nobody answered.
    pub fn mean(&self) -> Option<f64> {
        if self.workers.is_empty() {
            return None;
        }
        let sum: usize = self.workers.values().map(|w| w.answer as usize).sum();
        Some(sum as f64 / self.workers.len() as f64)
    }
}

/// Predicates asked about a sentence.
#[derive(Debug, Clone)]
pub struct SentenceAnswers {
    pub sent_id: String,
    pub sentence_html: String,
    /// Predicates keyed by predicate id and html statement.
    pub predicates: BTreeMap<String, PredicateAnswers>,
}

impl SentenceAnswers {
    fn new(question: &HitQuestion) -> Self {
        Self {
            sent_id: question.sentence_id.clone(),
            sentence_html: question.sentence.clone(),
            predicates: BTreeMap::new(),
        }
    }

    fn add_worker(&mut self, hit_id: &str, question: &HitQuestion, worker: Worker) {
        let key = format!("{}{}", question.pred_id, question.predicate);
        let pred = self
            .predicates
            .entry(key)
            .or_insert_with(|| PredicateAnswers::new(hit_id, question));
        pred.workers.insert(worker.worker_id.clone(), worker);
    }

    /// Predicates along with their answer distribution and answers.
    pub fn answers(&self) -> impl Iterator<Item = (&PredicateAnswers, [usize; 2], Vec<u8>)> {
        self.predicates
            .values()
            .map(|pred| (pred, pred.distribution(), pred.answers()))
    }

    /// Every pair of answers given about the same predicate.
    pub fn answer_pairs(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.predicates
            .values()
            .flat_map(|pred| pred.answers().into_iter().tuple_combinations())
    }
}

/// Sentences by id.
pub type Results = BTreeMap<String, SentenceAnswers>;

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, Error> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

/// Load HIT results.
pub fn load_results<R: Read>(r: R) -> Result<Results, Error> {
    let mut reader = csv::Reader::from_reader(r);
    let headers = reader.headers()?.clone();
    let input_idx = column(&headers, INPUT_COLUMN)?;
    let worker_idx = column(&headers, WORKER_COLUMN)?;
    let answer_columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.strip_prefix(ANSWER_PREFIX).map(|qid| (qid, i)))
        .collect();

    let mut results = Results::new();
    let mut nb_rows = 0;
    for record in reader.records() {
        let record = record?;
        nb_rows += 1;
        let hit_id = &record[input_idx];
        let worker_id = &record[worker_idx];
        let questions: Vec<HitQuestion> = serde_json::from_str(hit_id)?;

        for question in questions
            .iter()
            .filter(|q| q.pred_id.contains("normal"))
        {
            let answer_idx = answer_columns
                .get(question.question_id.as_str())
                .ok_or_else(|| {
                    Error::MissingColumn(format!("{}{}", ANSWER_PREFIX, question.question_id))
                })?;
            let worker = Worker::new(worker_id, &record[*answer_idx])?;

            results
                .entry(question.sentence_id.clone())
                .or_insert_with(|| SentenceAnswers::new(question))
                .add_worker(hit_id, question, worker);
        }
    }

    debug!("read {} assignments", nb_rows);
    info!("loaded answers for {} sentences", results.len());
    Ok(results)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a HIT row holding questions `(questionID, sentenceID, pred_id)`.
    pub(crate) fn hit(questions: &[(&str, &str, &str)]) -> String {
        let qs: Vec<HitQuestion> = questions
            .iter()
            .map(|(qid, sid, pid)| HitQuestion {
                question_id: qid.to_string(),
                sentence_id: sid.to_string(),
                pred_id: pid.to_string(),
                predicate: format!("<span>{}</span>", pid),
                pprint: "\\t?a saw ?b\\n\\t\\t?a: John".to_string(),
                ..Default::default()
            })
            .collect();
        serde_json::to_string(&qs).unwrap()
    }

    /// Build a results file from `(hit, worker, answers to q_1, q_2…)` rows.
    pub(crate) fn results_csv(rows: &[(&str, &str, Vec<&str>)]) -> String {
        let nb_answers = rows.iter().map(|r| r.2.len()).max().unwrap_or(0);
        let mut w = csv::Writer::from_writer(Vec::new());
        let mut header = vec![INPUT_COLUMN.to_string(), WORKER_COLUMN.to_string()];
        header.extend((1..=nb_answers).map(|i| format!("{}q_{}", ANSWER_PREFIX, i)));
        w.write_record(&header).unwrap();
        for (hit, worker, answers) in rows {
            let mut record = vec![hit.to_string(), worker.to_string()];
            record.extend(answers.iter().map(|a| a.to_string()));
            record.resize(header.len(), String::new());
            w.write_record(&record).unwrap();
        }
        String::from_utf8(w.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn grouping() {
        let h = hit(&[
            ("q_1", "s1", "pred.normal.1.0.2"),
            ("q_2", "s1", "pred.amod.3.2"),
            ("q_3", "s2", "pred.normal.0.1"),
        ]);
        let csv = results_csv(&[
            (h.as_str(), "w1", vec!["1", "0", "1"]),
            (h.as_str(), "w2", vec!["0", "1", "1"]),
        ]);
        let results = load_results(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);

        let s1 = &results["s1"];
        // amod question is ignored
        assert_eq!(s1.predicates.len(), 1);
        let (pred, distr, answers) = s1.answers().next().unwrap();
        assert_eq!(pred.pred_id, "pred.normal.1.0.2");
        assert_eq!(pred.hit_id, h);
        assert_eq!(distr, [1, 1]);
        assert_eq!(answers, vec![1, 0]);
        assert_eq!(pred.pprint.as_deref(), Some("\t?a saw ?b\n\t\t?a: John"));
        assert_eq!(s1.answer_pairs().collect::<Vec<_>>(), vec![(1, 0)]);

        assert_eq!(results["s2"].answers().next().unwrap().1, [0, 2]);
    }

    #[test]
    fn same_worker_replaces_answer() {
        let h = hit(&[("q_1", "s1", "pred.normal.1.0")]);
        let csv = results_csv(&[(h.as_str(), "w1", vec!["0"]), (h.as_str(), "w1", vec!["1"])]);
        let results = load_results(csv.as_bytes()).unwrap();
        assert_eq!(results["s1"].answers().next().unwrap().2, vec![1]);
    }

    #[test]
    fn invalid_answer() {
        let h = hit(&[("q_1", "s1", "pred.normal.1.0")]);
        let csv = results_csv(&[(h.as_str(), "w1", vec!["yes"])]);
        assert!(matches!(
            load_results(csv.as_bytes()),
            Err(Error::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn missing_columns() {
        let csv = "WorkerId\nw1\n";
        assert!(matches!(
            load_results(csv.as_bytes()),
            Err(Error::MissingColumn(c)) if c == INPUT_COLUMN
        ));

        let h = hit(&[("q_1", "s1", "pred.normal.1.0"), ("q_2", "s1", "pred.normal.2.0")]);
        let csv = results_csv(&[(h.as_str(), "w1", vec!["1"])]);
        // only q_1 is answered
        assert!(matches!(
            load_results(csv.as_bytes()),
            Err(Error::MissingColumn(_))
        ));
    }
}
