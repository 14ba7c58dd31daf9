/*! Predicate-argument structures.

A [Predicate] is a set of tokens of a sentence (its root included) and a list of [Argument]s, each being a set of tokens too.
Tokens are referred to by their position in the [Sentence] they come from.
!*/
use std::fmt;

use itertools::Itertools;

use crate::conllu::Sentence;

/// Relations of arguments that are clauses rather than phrases.
pub const CLAUSAL_RELATIONS: [&str; 3] = ["ccomp", "csubj", "xcomp"];

/// Kind of predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateType {
    /// Verbal or copular predicate, in word order.
    Normal,
    /// Possessive: `?a poss ?b`.
    Poss,
    /// Adjectival modifier: `?a is/are <adjective>`.
    Amod,
    /// Apposition: `?a is/are <appositive>`.
    Appos,
}

impl PredicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateType::Normal => "normal",
            PredicateType::Poss => "poss",
            PredicateType::Amod => "amod",
            PredicateType::Appos => "appos",
        }
    }
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub root: usize,
    /// Sorted, unique positions.
    pub tokens: Vec<usize>,
    /// Names of the extraction rules that produced the argument.
    pub rules: Vec<String>,
}

impl Argument {
    pub fn new(root: usize, tokens: Vec<usize>, rules: Vec<String>) -> Self {
        Self {
            root,
            tokens: normalize(tokens),
            rules,
        }
    }

    /// Argument text, tokens joined by spaces.
    pub fn phrase(&self, sentence: &Sentence) -> String {
        texts(&self.tokens, sentence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub root: usize,
    /// Sorted, unique positions. Empty for [PredicateType::Poss].
    pub tokens: Vec<usize>,
    pub kind: PredicateType,
    /// Sorted by root position.
    pub arguments: Vec<Argument>,
    pub rules: Vec<String>,
}

impl Predicate {
    pub fn new(
        root: usize,
        tokens: Vec<usize>,
        kind: PredicateType,
        mut arguments: Vec<Argument>,
        rules: Vec<String>,
    ) -> Self {
        arguments.sort_by_key(|arg| arg.root);
        Self {
            root,
            tokens: normalize(tokens),
            kind,
            arguments,
            rules,
        }
    }

    /// Stable identifier: `pred.<type>.<root>.<argument roots>`.
    pub fn identifier(&self) -> String {
        format!(
            "pred.{}.{}.{}",
            self.kind,
            self.root,
            self.arguments.iter().map(|arg| arg.root).join(".")
        )
    }

    pub fn has_token(&self, position: usize) -> bool {
        self.tokens.binary_search(&position).is_ok()
    }

    /// An argument is clausal when its relation is exactly one of [CLAUSAL_RELATIONS]
    /// (subtyped relations such as `csubj:pass` are not) and it is directly governed
    /// by one of the tokens of a [PredicateType::Normal] predicate.
    pub fn is_clausal_argument(&self, arg: &Argument, sentence: &Sentence) -> bool {
        if self.kind != PredicateType::Normal {
            return false;
        }
        match sentence.token(arg.root) {
            Some(tk) => {
                CLAUSAL_RELATIONS.contains(&tk.gov_rel.as_str())
                    && tk.gov.map(|g| self.has_token(g)).unwrap_or(false)
            }
            None => false,
        }
    }

    /// The argument the modifier is about, for [PredicateType::Amod] and [PredicateType::Appos]:
    /// the one rooted at the governor of the predicate root,
    /// falling back on the first argument.
    pub fn governor_argument(&self, sentence: &Sentence) -> Option<usize> {
        let gov = sentence.token(self.root).and_then(|tk| tk.gov);
        self.arguments
            .iter()
            .position(|arg| Some(arg.root) == gov)
            .or(if self.arguments.is_empty() { None } else { Some(0) })
    }

    /// Predicate tokens and arguments merged in word order.
    /// Arguments are ordered by their root position.
    pub fn items(&self) -> Vec<Item> {
        let mut items: Vec<(usize, Item)> = self
            .tokens
            .iter()
            .map(|pos| (*pos, Item::Token(*pos)))
            .chain(
                self.arguments
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| (arg.root, Item::Argument(i))),
            )
            .collect();
        items.sort_by_key(|(pos, _)| *pos);
        items.into_iter().map(|(_, item)| item).collect()
    }

    /// Predicate in a one-line form, arguments replaced by their names.
    pub fn name(&self, sentence: &Sentence) -> String {
        let names = argument_names(self.arguments.len());
        match self.kind {
            PredicateType::Poss => {
                let a = names.first().map(String::as_str).unwrap_or("?");
                let b = names.get(1).map(String::as_str).unwrap_or("?");
                format!("{} poss {}", a, b)
            }
            PredicateType::Amod | PredicateType::Appos => {
                let gov = self.governor_argument(sentence);
                let mut ret = vec![
                    gov.map(|i| names[i].clone()).unwrap_or_else(|| "?".to_string()),
                    "is/are".to_string(),
                ];
                ret.extend(self.items().into_iter().filter_map(|item| match item {
                    Item::Argument(i) if Some(i) == gov => None,
                    Item::Argument(i) => Some(names[i].clone()),
                    Item::Token(pos) => sentence.token(pos).map(|tk| tk.text.clone()),
                }));
                ret.join(" ")
            }
            PredicateType::Normal => self
                .items()
                .into_iter()
                .filter_map(|item| match item {
                    Item::Argument(i) => Some(names[i].clone()),
                    Item::Token(pos) => sentence.token(pos).map(|tk| tk.text.clone()),
                })
                .join(" "),
        }
    }

    /// Multi-line description of the predicate and its arguments.
    ///
    /// ```text
    /// <indent>?a saw ?b<indent>[saw-root,rules]
    /// <indent><indent>?a: John<indent>[John-nsubj,rules]
    /// <indent><indent>?b: Mary<indent>[Mary-obj,rules]
    /// ```
    /// Rules in brackets are only present when `track_rule` is set.
    pub fn format(&self, sentence: &Sentence, track_rule: bool) -> String {
        const INDENT: &str = "\t";
        let names = argument_names(self.arguments.len());
        let mut lines = Vec::with_capacity(self.arguments.len() + 1);

        let verbose = if track_rule {
            rule_annotation(sentence, self.root, &self.rules, INDENT)
        } else {
            String::new()
        };
        lines.push(format!("{}{}{}", INDENT, self.name(sentence), verbose));

        for (arg, name) in self.arguments.iter().zip(names.iter()) {
            let phrase = if self.is_clausal_argument(arg, sentence) {
                format!("SOMETHING := {}", arg.phrase(sentence))
            } else {
                arg.phrase(sentence)
            };
            let verbose = if track_rule {
                rule_annotation(sentence, arg.root, &arg.rules, INDENT)
            } else {
                String::new()
            };
            lines.push(format!("{}{}{}: {}{}", INDENT, INDENT, name, phrase, verbose));
        }
        lines.join("\n")
    }
}

/// Element of a predicate in word order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    /// Position of a predicate token.
    Token(usize),
    /// Index of an argument in [Predicate::arguments].
    Argument(usize),
}

/// Argument names: `?a` to `?z`, then `?a1` to `?z1`, `?a2`…
pub fn argument_names(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let letter = (b'a' + (i % 26) as u8) as char;
            if i >= 26 {
                format!("?{}{}", letter, i / 26)
            } else {
                format!("?{}", letter)
            }
        })
        .collect()
}

fn rule_annotation(sentence: &Sentence, root: usize, rules: &[String], indent: &str) -> String {
    let (text, rel) = sentence
        .token(root)
        .map(|tk| (tk.text.as_str(), tk.gov_rel.as_str()))
        .unwrap_or(("", ""));
    let rules = rules.iter().sorted().join(",");
    format!("{}[{}-{},{}]", indent, text, rel, rules)
}

fn texts(positions: &[usize], sentence: &Sentence) -> String {
    positions
        .iter()
        .filter_map(|pos| sentence.token(*pos))
        .map(|tk| tk.text.as_str())
        .join(" ")
}

fn normalize(mut positions: Vec<usize>) -> Vec<usize> {
    positions.sort_unstable();
    positions.dedup();
    positions
}
