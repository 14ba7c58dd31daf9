//! HIT generation pipeline
//!
//! Generates HIT files from CoNLL-U parses.
//!
//! # Processing
//! 1. Sentences are read and PTB bracket tokens are converted back to plain brackets.
//! 1. Predicates are extracted from each sentence. Sentences with no predicate are skipped.
//! 1. For question HITs, each (normal, by default) predicate becomes a question,
//!    holding the sentence with highlighted predicate and arguments and the statement of the predicate.
//!    For entailment HITs, each sentence becomes an item holding the statements of its predicates.
//! 1. Items are batched into rows of the HIT csv file.
use std::io::Write;
use std::path::PathBuf;

use log::{debug, info};

use crate::batch::{BatchSummary, BatchWriter, DEFAULT_BATCH_SIZE};
use crate::conllu::{ConlluReader, Sentence};
use crate::error::Error;
use crate::extract::Extractor;
use crate::hit::{entailment_item, EntailmentItem, HitQuestion};
use crate::predicate::PredicateType;
use crate::render::{highlight_sentence, Palette};
use crate::text::html_escape;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Number of items per csv row.
    pub batch_size: usize,
    /// Write the last batch even if it is not full.
    pub flush_partial: bool,
    /// Ask questions about every predicate type, not only normal ones.
    pub all_types: bool,
    /// Stop after writing this many rows.
    pub max_rows: Option<usize>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_partial: false,
            all_types: false,
            max_rows: None,
        }
    }
}

pub struct Generator<E: Extractor> {
    src: PathBuf,
    dst: PathBuf,
    extractor: E,
    palette: Palette,
    options: GenerateOptions,
}

impl<E: Extractor> Generator<E> {
    pub fn new(
        src: PathBuf,
        dst: PathBuf,
        extractor: E,
        palette: Palette,
        options: GenerateOptions,
    ) -> Self {
        debug!("generation options: {:?}", options);
        Self {
            src,
            dst,
            extractor,
            palette,
            options,
        }
    }

    fn max_reached(&self, rows: usize) -> bool {
        self.options.max_rows.map(|max| rows >= max).unwrap_or(false)
    }

    /// Generate question HITs from `src` into `dst`.
    pub fn run(&self) -> Result<BatchSummary, Error> {
        info!("generating questions from {:?}", self.src);
        let sentences = ConlluReader::from_path(&self.src)?;
        let mut writer = BatchWriter::from_path(&self.dst, self.options.batch_size)?;
        self.questions(sentences, &mut writer)?;
        let summary = writer.finish(self.options.flush_partial)?;
        info!(
            "{:?}: {} rows, {} questions ({} dropped)",
            self.dst, summary.rows, summary.items, summary.dropped
        );
        Ok(summary)
    }

    /// Generate entailment HITs from `src` into `dst`.
    pub fn run_entailments(&self) -> Result<BatchSummary, Error> {
        info!("generating entailments from {:?}", self.src);
        let sentences = ConlluReader::from_path(&self.src)?;
        let mut writer = BatchWriter::from_path(&self.dst, self.options.batch_size)?;
        self.entailments(sentences, &mut writer)?;
        let summary = writer.finish(self.options.flush_partial)?;
        info!(
            "{:?}: {} rows, {} sentences ({} dropped)",
            self.dst, summary.rows, summary.items, summary.dropped
        );
        Ok(summary)
    }

    /// Push a question for each predicate of each sentence.
    pub fn questions<I, W>(
        &self,
        sentences: I,
        writer: &mut BatchWriter<W, HitQuestion>,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<Sentence, Error>>,
        W: Write,
    {
        for sentence in sentences {
            let mut sentence = sentence?;
            sentence.normalize_ptb();
            let preds = self.extractor.extract(&sentence);
            if preds.is_empty() {
                debug!("[{}] no predicate", sentence.id);
                continue;
            }

            let tokens: Vec<String> = sentence
                .tokens
                .iter()
                .map(|tk| html_escape(&tk.text))
                .collect();

            for pred in preds
                .iter()
                .filter(|p| self.options.all_types || p.kind == PredicateType::Normal)
            {
                let html_sentence = highlight_sentence(&tokens, pred, &self.palette);
                let question = HitQuestion::new(
                    writer.next_index(),
                    &sentence,
                    html_sentence,
                    pred,
                    &self.palette,
                );
                if writer.push(question)? && self.max_reached(writer.rows()) {
                    info!("reached {} rows, stopping", writer.rows());
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Push an entailment item for each sentence that has at least one statement.
    pub fn entailments<I, W>(
        &self,
        sentences: I,
        writer: &mut BatchWriter<W, EntailmentItem>,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<Sentence, Error>>,
        W: Write,
    {
        for sentence in sentences {
            let mut sentence = sentence?;
            sentence.normalize_ptb();
            let preds = self.extractor.extract(&sentence);
            if let Some(item) = entailment_item(&sentence, &preds) {
                if writer.push(item)? && self.max_reached(writer.rows()) {
                    info!("reached {} rows, stopping", writer.rows());
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::extract::{DependencyExtractor, ExtractOptions};

    const SENTENCES: &str = "# sent_id = s1
1\tJohn\tJohn\tPROPN\tNNP\t_\t2\tnsubj\t_\t_
2\tsaw\tsee\tVERB\tVBD\t_\t0\troot\t_\t_
3\tMary\tMary\tPROPN\tNNP\t_\t2\tobj\t_\t_

# sent_id = s2
1\tShe\tshe\tPRON\tPRP\t_\t2\tnsubj\t_\t_
2\tleft\tleave\tVERB\tVBD\t_\t0\troot\t_\t_
3\t-LRB-\t-LRB-\tPUNCT\t-LRB-\t_\t4\tpunct\t_\t_
4\tearly\tearly\tADV\tRB\t_\t2\tadvmod\t_\t_
5\t-RRB-\t-RRB-\tPUNCT\t-RRB-\t_\t4\tpunct\t_\t_

# sent_id = s3
1\tthe\tthe\tDET\tDT\t_\t2\tdet\t_\t_
2\tend\tend\tNOUN\tNN\t_\t0\troot\t_\t_
";

    fn generator(options: GenerateOptions) -> Generator<DependencyExtractor> {
        Generator::new(
            PathBuf::new(),
            PathBuf::new(),
            DependencyExtractor::new(ExtractOptions::hits()),
            Palette::default(),
            options,
        )
    }

    fn questions(options: GenerateOptions) -> Vec<Vec<HitQuestion>> {
        let g = generator(options.clone());
        let mut w = BatchWriter::new(Vec::new(), options.batch_size).unwrap();
        g.questions(ConlluReader::new(Cursor::new(SENTENCES)), &mut w)
            .unwrap();
        w.finish(options.flush_partial).unwrap();
        let buf = w.into_inner().unwrap();
        csv::Reader::from_reader(buf.as_slice())
            .records()
            .map(|r| serde_json::from_str(&r.unwrap()[0]).unwrap())
            .collect()
    }

    #[test]
    fn one_question_per_predicate() {
        let rows = questions(GenerateOptions {
            batch_size: 1,
            ..Default::default()
        });
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].sentence_id, "s1");
        assert_eq!(rows[0][0].question_id, "q_1");
        assert_eq!(rows[1][0].sentence_id, "s2");
        // brackets are normalized before rendering
        assert_eq!(rows[1][0].sentence, "She left ( early )");
    }

    #[test]
    fn partial_batch_dropped() {
        let rows = questions(GenerateOptions::default());
        assert!(rows.is_empty());

        let rows = questions(GenerateOptions {
            flush_partial: true,
            ..Default::default()
        });
        assert_eq!(rows.len(), 1);
        let ids: Vec<&str> = rows[0].iter().map(|q| q.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q_1", "q_2"]);
    }

    #[test]
    fn max_rows() {
        let rows = questions(GenerateOptions {
            batch_size: 1,
            max_rows: Some(1),
            ..Default::default()
        });
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn entailment_rows() {
        let g = generator(GenerateOptions::default());
        let mut w = BatchWriter::new(Vec::new(), 2).unwrap();
        g.entailments(ConlluReader::new(Cursor::new(SENTENCES)), &mut w)
            .unwrap();
        let summary = w.finish(false).unwrap();
        // `She` is a PRP subject, only s1 yields an entailment
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn malformed_input_fails() {
        let g = generator(GenerateOptions::default());
        let mut w = BatchWriter::new(Vec::new(), 5).unwrap();
        let res = g.questions(ConlluReader::new(Cursor::new("1\tbroken")), &mut w);
        assert!(matches!(res, Err(Error::Conllu { .. })));
    }
}
