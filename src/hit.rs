/*! HIT elements.

A HIT row holds several questions, serialized as a JSON array in the `json_variables` column of the HIT csv file.

Keys are emitted in sorted order (field declaration order follows it) so that files stay stable across runs.
!*/
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conllu::Sentence;
use crate::predicate::{Item, Predicate};
use crate::render::{format_pred, Palette};
use crate::text::html_escape;

/// Root tags of arguments that make a predicate unusable as an entailment.
const NON_ENTAILING_TAGS: [&str; 7] = ["DET", "PROP", "DT", "WDT", "PDT", "EX", "PRP"];

/// A question asking a worker whether a predicate is correct.
///
/// Also used to read questions back from result files,
/// where missing fields are defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitQuestion {
    pub html_sentence: String,
    pub pprint: String,
    pub pred_id: String,
    pub predicate: String,
    #[serde(rename = "questionID")]
    pub question_id: String,
    pub sentence: String,
    #[serde(rename = "sentenceID")]
    pub sentence_id: String,
}

impl HitQuestion {
    /// Build the question for `pred`.
    ///
    /// - `qid` is the 1-based index of the question in its row,
    /// - `html_sentence` is the sentence with highlighted predicate and arguments.
    pub fn new(
        qid: usize,
        sentence: &Sentence,
        html_sentence: String,
        pred: &Predicate,
        palette: &Palette,
    ) -> Self {
        let pprint = pred
            .format(sentence, true)
            .replace('\t', "\\t")
            .replace('\n', "\\n");
        let predicate = format!(
            r#"<div class=\"statement_for_predicate\">{}</div>"#,
            format_pred(pred, sentence, false, palette)
        );
        Self {
            html_sentence,
            pprint: html_escape(&pprint),
            pred_id: pred.identifier(),
            predicate,
            question_id: format!("q_{}", qid),
            sentence: html_escape(&sentence.text()),
            sentence_id: sentence.id.clone(),
        }
    }
}

/// Entailment statements of a sentence: `sentence`, `sentenceID` and `entail_1`…`entail_n` keys.
pub type EntailmentItem = BTreeMap<String, String>;

/// Statement of a predicate in word order, or `None` if one of its arguments
/// is clausal or rooted at a determiner/pronoun-like tag.
pub fn entailment(pred: &Predicate, sentence: &Sentence) -> Option<String> {
    let mut items = Vec::new();
    for item in pred.items() {
        match item {
            Item::Argument(i) => {
                let arg = &pred.arguments[i];
                let excluded = sentence
                    .token(arg.root)
                    .map(|tk| {
                        NON_ENTAILING_TAGS.contains(&tk.tag.as_str())
                            || NON_ENTAILING_TAGS.contains(&tk.xpos.as_str())
                    })
                    .unwrap_or(false);
                if excluded || pred.is_clausal_argument(arg, sentence) {
                    return None;
                }
                items.push(arg.phrase(sentence));
            }
            Item::Token(pos) => items.push(sentence.token(pos)?.text.clone()),
        }
    }

    let text = items.join(" ");
    let mut chars = text.chars();
    let first = chars.next()?;
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    Some(html_escape(&capitalized))
}

/// Entailment item of a sentence, `None` if no predicate yields a statement.
pub fn entailment_item(sentence: &Sentence, preds: &[Predicate]) -> Option<EntailmentItem> {
    let mut item = EntailmentItem::new();
    item.insert("sentence".to_string(), html_escape(&sentence.text()));
    item.insert("sentenceID".to_string(), sentence.id.clone());

    let statements = preds.iter().filter_map(|pred| entailment(pred, sentence));
    for (i, statement) in statements.enumerate() {
        item.insert(format!("entail_{}", i + 1), statement);
    }

    if item.len() > 2 {
        Some(item)
    } else {
        None
    }
}
