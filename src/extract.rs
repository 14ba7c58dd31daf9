/*! Predicate-argument extraction.

Extraction is done through the [Extractor] trait, so that the HIT pipeline does not depend on a given extraction algorithm.

[DependencyExtractor] is a rule based extractor working on Universal Dependencies relations:

1. Predicate roots are found (tokens with a subject, clause heads, relative clauses, conjuncts of predicates…).
1. Each predicate gathers its tokens (auxiliaries, copulas, negations, particles and case markers of oblique arguments)
   and its arguments (core and oblique dependents).
1. Modifier predicates ([PredicateType::Amod], [PredicateType::Appos], [PredicateType::Poss]) are added
   when their resolution is enabled.

Every predicate and argument keeps track of the rules that produced it.
!*/
use std::collections::HashMap;

use log::debug;

use crate::conllu::{Sentence, Token};
use crate::predicate::{Argument, Predicate, PredicateType};

const SUBJECTS: [&str; 5] = ["nsubj", "csubj", "nsubjpass", "csubjpass", "expl"];
const OBJECTS: [&str; 4] = ["obj", "dobj", "iobj", "ccomp"];
const OBLIQUES: [&str; 2] = ["obl", "nmod"];
const CLAUSE_HEADS: [&str; 5] = ["root", "ccomp", "csubj", "advcl", "parataxis"];
const NEGATIONS: [&str; 3] = ["not", "n't", "never"];
const RELATIVE_PRONOUNS: [&str; 5] = ["who", "whom", "which", "that", "whose"];

/// Extracts predicate-argument structures from a parsed sentence.
pub trait Extractor {
    fn extract(&self, sentence: &Sentence) -> Vec<Predicate>;
}

/// Options of [DependencyExtractor].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Only keep core arguments and drop auxiliaries from predicates.
    pub simple: bool,
    /// Treat open clausal complements (`xcomp`) as independent predicates.
    pub cut: bool,
    pub resolve_relcl: bool,
    pub resolve_amod: bool,
    pub resolve_poss: bool,
    pub resolve_appos: bool,
    pub resolve_conj: bool,
}

impl ExtractOptions {
    /// Options used for HIT generation: every resolution rule enabled.
    pub fn hits() -> Self {
        Self {
            simple: false,
            cut: false,
            resolve_relcl: true,
            resolve_amod: true,
            resolve_poss: true,
            resolve_appos: true,
            resolve_conj: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyExtractor {
    options: ExtractOptions,
}

impl DependencyExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    fn is_subject(tk: &Token) -> bool {
        SUBJECTS.contains(&tk.base_rel())
    }

    fn is_verbal(tk: &Token) -> bool {
        matches!(tk.tag.as_str(), "VERB" | "ADJ")
            || tk.tag.starts_with("VB")
            || tk.tag.starts_with("JJ")
    }

    fn is_negation(tk: &Token) -> bool {
        tk.gov_rel == "neg"
            || (tk.gov_rel == "advmod" && NEGATIONS.contains(&tk.text.to_lowercase().as_str()))
    }

    fn is_predicate_token(&self, tk: &Token) -> bool {
        match tk.base_rel() {
            "aux" | "auxpass" => !self.options.simple,
            "cop" | "neg" | "prt" => true,
            "compound" => tk.gov_rel == "compound:prt",
            _ => Self::is_negation(tk),
        }
    }

    fn is_oblique(tk: &Token) -> bool {
        OBLIQUES.contains(&tk.base_rel()) && tk.gov_rel != "nmod:poss"
    }

    fn is_argument(&self, tk: &Token) -> bool {
        Self::is_subject(tk)
            || OBJECTS.contains(&tk.base_rel())
            || (tk.base_rel() == "xcomp" && !self.options.cut)
            || (Self::is_oblique(tk) && !self.options.simple)
    }

    /// Rule name of a predicate root, if the token is one.
    fn root_rule(&self, sentence: &Sentence, tk: &Token) -> Option<&'static str> {
        if sentence.dependents(tk.position).any(Self::is_subject) {
            Some("subject")
        } else if CLAUSE_HEADS.contains(&tk.base_rel()) && Self::is_verbal(tk) {
            Some("clause")
        } else if self.options.cut && tk.base_rel() == "xcomp" && Self::is_verbal(tk) {
            Some("xcomp")
        } else if self.options.resolve_relcl && tk.gov_rel == "acl:relcl" {
            Some("relcl")
        } else {
            None
        }
    }

    /// Positions of normal predicate roots and the rule that found them.
    fn find_roots(&self, sentence: &Sentence) -> Vec<(usize, &'static str)> {
        let mut rules: Vec<Option<&'static str>> = sentence
            .tokens
            .iter()
            .map(|tk| self.root_rule(sentence, tk))
            .collect();

        // conjuncts of predicates are predicates too
        if self.options.resolve_conj {
            let mut changed = true;
            while changed {
                changed = false;
                for tk in &sentence.tokens {
                    if rules[tk.position].is_some() || tk.base_rel() != "conj" {
                        continue;
                    }
                    if let Some(gov) = tk.gov {
                        if rules[gov].is_some() && Self::is_verbal(tk) {
                            rules[tk.position] = Some("conj");
                            changed = true;
                        }
                    }
                }
            }
        }

        rules
            .into_iter()
            .enumerate()
            .filter_map(|(pos, rule)| rule.map(|r| (pos, r)))
            .collect()
    }

    /// Argument rooted at `root`, excluding material of the predicate rooted at `pred_root`.
    fn argument(
        &self,
        sentence: &Sentence,
        root: usize,
        pred_root: usize,
        drop_case: bool,
        rule: &str,
    ) -> Argument {
        let tokens = sentence.subtree_pruned(root, |dep| {
            dep.position == pred_root
                || dep.gov_rel == "punct"
                || (drop_case && dep.gov == Some(root) && dep.base_rel() == "case")
                || (self.options.resolve_relcl && dep.gov_rel == "acl:relcl")
                || (self.options.resolve_conj
                    && dep.gov == Some(root)
                    && matches!(dep.base_rel(), "cc" | "conj"))
        });
        Argument::new(root, tokens, vec![rule.to_string()])
    }

    fn normal_predicate(&self, sentence: &Sentence, root: usize, rule: &str) -> Predicate {
        let mut tokens = vec![root];
        let mut arguments = Vec::new();

        for dep in sentence.dependents(root) {
            if self.is_predicate_token(dep) {
                tokens.push(dep.position);
            } else if self.is_argument(dep) {
                let oblique = Self::is_oblique(dep);
                if oblique {
                    // case markers belong to the predicate: "?a went to ?b"
                    tokens.extend(
                        sentence
                            .dependents(dep.position)
                            .filter(|tk| tk.base_rel() == "case")
                            .map(|tk| tk.position),
                    );
                }
                arguments.push(self.argument(sentence, dep.position, root, oblique, &dep.gov_rel));
            }
        }

        let mut rules = vec![rule.to_string()];
        let relcl = sentence
            .token(root)
            .filter(|tk| self.options.resolve_relcl && tk.gov_rel == "acl:relcl");
        if let Some(relcl) = relcl {
            if let Some(noun) = relcl.gov {
                let noun_arg = self.argument(sentence, noun, root, false, "relcl_noun");
                let pronoun = arguments.iter().position(|arg| {
                    sentence
                        .token(arg.root)
                        .map(|tk| RELATIVE_PRONOUNS.contains(&tk.text.to_lowercase().as_str()))
                        .unwrap_or(false)
                });
                match pronoun {
                    Some(i) => arguments[i] = noun_arg,
                    None => arguments.push(noun_arg),
                }
                rules.push("resolve_relcl".to_string());
            }
        }

        Predicate::new(root, tokens, PredicateType::Normal, arguments, rules)
    }

    /// Subject of the closest governing predicate, for conjuncts and controlled clauses without one.
    fn borrow_subject(predicates: &mut [Predicate], sentence: &Sentence, index: &HashMap<usize, usize>) {
        for i in 0..predicates.len() {
            let root = predicates[i].root;
            let borrows = predicates[i].rules.iter().any(|r| r == "conj" || r == "xcomp");
            let has_subject = predicates[i].arguments.iter().any(|arg| {
                sentence.token(arg.root).map(Self::is_subject).unwrap_or(false)
                    || arg.rules.iter().any(|r| r == "borrow_subj")
            });
            if !borrows || has_subject {
                continue;
            }

            // walk up conj/xcomp chains until a predicate with a subject is found
            let mut gov = sentence.token(root).and_then(|tk| tk.gov);
            let mut borrowed = None;
            for _ in 0..sentence.len() {
                let g = match gov {
                    Some(g) => g,
                    None => break,
                };
                if let Some(&j) = index.get(&g) {
                    borrowed = predicates[j]
                        .arguments
                        .iter()
                        .find(|arg| sentence.token(arg.root).map(Self::is_subject).unwrap_or(false))
                        .cloned();
                    if borrowed.is_some() {
                        break;
                    }
                }
                gov = sentence.token(g).and_then(|tk| tk.gov);
            }

            if let Some(mut subject) = borrowed {
                debug!("{} borrows subject {}", root, subject.root);
                subject.rules = vec!["borrow_subj".to_string()];
                let pred = &mut predicates[i];
                pred.arguments.push(subject);
                pred.arguments.sort_by_key(|arg| arg.root);
            }
        }
    }

    fn modifier_predicates(&self, sentence: &Sentence, normal_roots: &[usize]) -> Vec<Predicate> {
        let mut ret = Vec::new();
        for tk in &sentence.tokens {
            if normal_roots.contains(&tk.position) {
                continue;
            }
            let gov = match tk.gov {
                Some(g) => g,
                None => continue,
            };

            if self.options.resolve_amod && tk.base_rel() == "amod" {
                let arg = self.argument(sentence, gov, tk.position, false, "amod_gov");
                ret.push(Predicate::new(
                    tk.position,
                    vec![tk.position],
                    PredicateType::Amod,
                    vec![arg],
                    vec!["resolve_amod".to_string()],
                ));
            } else if self.options.resolve_appos && tk.base_rel() == "appos" {
                let tokens = sentence.subtree_pruned(tk.position, |dep| dep.gov_rel == "punct");
                let arg = self.argument(sentence, gov, tk.position, false, "appos_gov");
                ret.push(Predicate::new(
                    tk.position,
                    tokens,
                    PredicateType::Appos,
                    vec![arg],
                    vec!["resolve_appos".to_string()],
                ));
            } else if self.options.resolve_poss
                && (tk.gov_rel == "nmod:poss" || tk.gov_rel == "poss")
            {
                let possessor = self.argument(sentence, tk.position, gov, true, "possessor");
                let possessee = self.argument(sentence, gov, tk.position, false, "possessee");
                ret.push(Predicate::new(
                    tk.position,
                    vec![],
                    PredicateType::Poss,
                    vec![possessor, possessee],
                    vec!["resolve_poss".to_string()],
                ));
            }
        }
        ret
    }
}

impl Extractor for DependencyExtractor {
    fn extract(&self, sentence: &Sentence) -> Vec<Predicate> {
        let roots = self.find_roots(sentence);
        let mut predicates: Vec<Predicate> = roots
            .iter()
            .map(|(root, rule)| self.normal_predicate(sentence, *root, rule))
            .collect();

        let index: HashMap<usize, usize> = predicates
            .iter()
            .enumerate()
            .map(|(i, pred)| (pred.root, i))
            .collect();
        Self::borrow_subject(&mut predicates, sentence, &index);

        let normal_roots: Vec<usize> = roots.iter().map(|(root, _)| *root).collect();
        predicates.extend(self.modifier_predicates(sentence, &normal_roots));
        predicates.sort_by_key(|pred| pred.root);

        debug!(
            "[{}] {} predicates extracted",
            sentence.id,
            predicates.len()
        );
        predicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::tests::sentence;

    fn extract(s: &Sentence) -> Vec<Predicate> {
        DependencyExtractor::new(ExtractOptions::hits()).extract(s)
    }

    #[test]
    fn simple_clause() {
        let s = sentence(&[
            ("John", "PROPN", 2, "nsubj"),
            ("saw", "VERB", 0, "root"),
            ("Mary", "PROPN", 2, "obj"),
            (".", "PUNCT", 2, "punct"),
        ]);
        let preds = extract(&s);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].identifier(), "pred.normal.1.0.2");
        assert_eq!(preds[0].name(&s), "?a saw ?b");
    }

    #[test]
    fn oblique_case_in_predicate() {
        let s = sentence(&[
            ("She", "PRON", 2, "nsubj"),
            ("went", "VERB", 0, "root"),
            ("to", "ADP", 5, "case"),
            ("the", "DET", 5, "det"),
            ("park", "NOUN", 2, "obl"),
        ]);
        let preds = extract(&s);
        assert_eq!(preds.len(), 1);
        let p = &preds[0];
        assert_eq!(p.tokens, vec![1, 2]);
        assert_eq!(p.arguments[1].tokens, vec![3, 4]);
        assert_eq!(p.name(&s), "?a went to ?b");
    }

    #[test]
    fn simple_drops_obliques_and_aux() {
        let s = sentence(&[
            ("She", "PRON", 3, "nsubj"),
            ("has", "AUX", 3, "aux"),
            ("gone", "VERB", 0, "root"),
            ("home", "NOUN", 3, "obl"),
        ]);
        let options = ExtractOptions {
            simple: true,
            ..ExtractOptions::hits()
        };
        let preds = DependencyExtractor::new(options).extract(&s);
        assert_eq!(preds[0].tokens, vec![2]);
        assert_eq!(preds[0].arguments.len(), 1);

        let preds = extract(&s);
        assert_eq!(preds[0].tokens, vec![1, 2]);
        assert_eq!(preds[0].arguments.len(), 2);
    }

    #[test]
    fn conjunction_borrows_subject() {
        let s = sentence(&[
            ("John", "PROPN", 2, "nsubj"),
            ("sang", "VERB", 0, "root"),
            ("and", "CCONJ", 4, "cc"),
            ("danced", "VERB", 2, "conj"),
        ]);
        let preds = extract(&s);
        assert_eq!(preds.len(), 2);
        let danced = &preds[1];
        assert_eq!(danced.root, 3);
        assert!(danced.rules.contains(&"conj".to_string()));
        assert_eq!(danced.arguments.len(), 1);
        assert_eq!(danced.arguments[0].root, 0);
        assert_eq!(danced.arguments[0].rules, vec!["borrow_subj".to_string()]);

        let options = ExtractOptions {
            resolve_conj: false,
            ..ExtractOptions::hits()
        };
        assert_eq!(DependencyExtractor::new(options).extract(&s).len(), 1);
    }

    #[test]
    fn relative_clause() {
        let s = sentence(&[
            ("the", "DET", 2, "det"),
            ("man", "NOUN", 5, "nsubj"),
            ("who", "PRON", 4, "nsubj"),
            ("left", "VERB", 2, "acl:relcl"),
            ("smiled", "VERB", 0, "root"),
        ]);
        let preds = extract(&s);
        let left = preds.iter().find(|p| p.root == 3).unwrap();
        assert_eq!(left.arguments.len(), 1);
        assert_eq!(left.arguments[0].root, 1);
        assert_eq!(left.arguments[0].tokens, vec![0, 1]);

        // the relative clause is not part of the subject of the main clause
        let smiled = preds.iter().find(|p| p.root == 4).unwrap();
        assert_eq!(smiled.arguments[0].tokens, vec![0, 1]);
    }

    #[test]
    fn modifiers() {
        let s = sentence(&[
            ("John", "PROPN", 3, "nmod:poss"),
            ("'s", "PART", 1, "case"),
            ("car", "NOUN", 5, "nsubj"),
            ("red", "ADJ", 3, "amod"),
            ("broke", "VERB", 0, "root"),
        ]);
        let preds = extract(&s);
        let kinds: Vec<PredicateType> = preds.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PredicateType::Poss, PredicateType::Amod, PredicateType::Normal]
        );

        let poss = &preds[0];
        assert!(poss.tokens.is_empty());
        assert_eq!(poss.arguments[0].tokens, vec![0]);
        assert_eq!(poss.arguments[1].root, 2);

        let amod = &preds[1];
        assert_eq!(amod.arguments[0].tokens, vec![0, 1, 2]);
        assert_eq!(amod.name(&s), "?a is/are red");

        let options = ExtractOptions::default();
        let preds = DependencyExtractor::new(options).extract(&s);
        assert_eq!(preds.len(), 1);
    }

    #[test]
    fn clausal_complement() {
        let s = sentence(&[
            ("I", "PRON", 2, "nsubj"),
            ("think", "VERB", 0, "root"),
            ("it", "PRON", 4, "nsubj"),
            ("works", "VERB", 2, "ccomp"),
        ]);
        let preds = extract(&s);
        assert_eq!(preds.len(), 2);
        let think = &preds[0];
        assert!(think.is_clausal_argument(&think.arguments[1], &s));
        assert_eq!(think.arguments[1].tokens, vec![2, 3]);
    }
}
