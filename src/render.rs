/*! HTML rendering of predicates and arguments.

Rendered strings are meant to be embedded in the HIT template of the crowdsourcing platform.
Attribute quotes are backslash-escaped (`id=\"rcorner\"`) since the template substitutes them inside a JavaScript string.

Colors are provided by a [Palette]:
- the predicate has its own color,
- arguments cycle through a list of colors, by their position order,
- special words (`is/are`, `has/have`, `SOMETHING`) use a neutral color.
!*/
use crate::conllu::Sentence;
use crate::predicate::{argument_names, Item, Predicate, PredicateType};
use crate::text::html_escape;

pub const CLOSE_SPAN: &str = "</span>";

/// Colors used for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub pred: String,
    pub args: Vec<String>,
    pub special: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            pred: "#dab3ff".to_string(),
            args: [
                "#fb8072", "#ffffb3", "#8dd3c7", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
                "#d9d9d9",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            special: "#ffffff".to_string(),
        }
    }
}

impl Palette {
    /// Color of the `i`-th argument (0-based), cycling through available colors.
    pub fn arg(&self, i: usize) -> &str {
        if self.args.is_empty() {
            &self.special
        } else {
            &self.args[i % self.args.len()]
        }
    }
}

/// Opening tag of a highlighting span.
pub fn open_span(color: &str) -> String {
    format!(r#"<span id=\"rcorner\" style=\"background-color:{}\">"#, color)
}

/// `text` wrapped in a highlighting span.
pub fn span(color: &str, text: &str) -> String {
    format!("{}{}{}", open_span(color), text, CLOSE_SPAN)
}

/// Role of a token in a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Pred,
    Arg(usize),
}

impl Role {
    fn color<'a>(&self, palette: &'a Palette) -> &'a str {
        match self {
            Role::Pred => &palette.pred,
            Role::Arg(i) => palette.arg(*i),
        }
    }
}

/// Highlight the predicate and its arguments in the sentence.
///
/// `tokens` are the (already escaped) texts of the sentence tokens.
/// Each run of contiguous tokens sharing a role is wrapped in a single span.
/// Predicate tokens take precedence over argument tokens,
/// and earlier arguments over later ones when argument spans overlap.
/// Predicate tokens of [PredicateType::Poss] predicates are not highlighted.
pub fn highlight_sentence(tokens: &[String], pred: &Predicate, palette: &Palette) -> String {
    let mut roles: Vec<Option<Role>> = vec![None; tokens.len()];

    let mut assign = |positions: &[usize], role: Role| {
        for pos in positions {
            if let Some(slot) = roles.get_mut(*pos) {
                if slot.is_none() {
                    *slot = Some(role);
                }
            }
        }
    };
    if pred.kind != PredicateType::Poss {
        assign(&pred.tokens, Role::Pred);
    }
    for (i, arg) in pred.arguments.iter().enumerate() {
        assign(&arg.tokens, Role::Arg(i));
    }

    let mut ret = Vec::with_capacity(tokens.len());
    for (pos, text) in tokens.iter().enumerate() {
        let role = roles[pos];
        let prev = if pos > 0 { roles[pos - 1] } else { None };
        let next = roles.get(pos + 1).copied().flatten();

        let mut s = String::with_capacity(text.len());
        if let Some(r) = role {
            if prev != role {
                s.push_str(&open_span(r.color(palette)));
            }
        }
        s.push_str(text);
        if role.is_some() && next != role {
            s.push_str(CLOSE_SPAN);
        }
        ret.push(s);
    }
    ret.join(" ")
}

/// Render the `i`-th argument of `pred`.
///
/// Clausal arguments are introduced by a `SOMETHING := ` prefix.
pub fn format_arg(pred: &Predicate, i: usize, sentence: &Sentence, palette: &Palette) -> String {
    let arg = &pred.arguments[i];
    let phrase = span(palette.arg(i), &html_escape(&arg.phrase(sentence)));
    if pred.is_clausal_argument(arg, sentence) {
        format!("{} := {}", span(&palette.special, "SOMETHING"), phrase)
    } else {
        phrase
    }
}

/// Render a possessive predicate: `<possessor> has/have <possessee>`.
pub fn format_poss(
    pred: &Predicate,
    sentence: &Sentence,
    placeholder: bool,
    palette: &Palette,
) -> String {
    let names = argument_names(pred.arguments.len());
    let has = span(&palette.special, "has/have");
    let mut ret: Vec<String> = (0..pred.arguments.len().min(2))
        .map(|i| {
            if placeholder {
                names[i].clone()
            } else {
                format_arg(pred, i, sentence, palette)
            }
        })
        .collect();
    ret.insert(ret.len().min(1), has);
    ret.join(" ")
}

/// Render the statement of a predicate, its tokens and arguments in word order.
///
/// Predicate tokens are highlighted, with spans closed and reopened at each discontinuity.
/// With `placeholder`, arguments are rendered by their names (`?a`, `?b`…) instead of their phrase.
///
/// [PredicateType::Amod] and [PredicateType::Appos] predicates start with the argument they modify,
/// followed by `is/are`.
pub fn format_pred(
    pred: &Predicate,
    sentence: &Sentence,
    placeholder: bool,
    palette: &Palette,
) -> String {
    let names = argument_names(pred.arguments.len());
    let render_arg = |i: usize| -> String {
        if placeholder {
            names[i].clone()
        } else {
            format_arg(pred, i, sentence, palette)
        }
    };

    let mut ret: Vec<String> = Vec::new();
    let mut skip = None;
    match pred.kind {
        PredicateType::Poss => return format_poss(pred, sentence, placeholder, palette),
        PredicateType::Amod | PredicateType::Appos => {
            // word order is changed for `is/are` statements
            if let Some(gov) = pred.governor_argument(sentence) {
                ret.push(render_arg(gov));
                skip = Some(gov);
            }
            ret.push(span(&palette.special, "is/are"));
        }
        PredicateType::Normal => (),
    }

    let mut last_pred: Option<(usize, usize)> = None;
    for item in pred.items() {
        match item {
            Item::Argument(i) if Some(i) == skip => (),
            Item::Argument(i) => ret.push(render_arg(i)),
            Item::Token(pos) => {
                let text = sentence
                    .token(pos)
                    .map(|tk| html_escape(&tk.text))
                    .unwrap_or_default();
                match last_pred {
                    Some((last_pos, _)) if pos == last_pos + 1 => ret.push(text),
                    Some((_, last_index)) => {
                        ret[last_index].push_str(CLOSE_SPAN);
                        ret.push(format!("{}{}", open_span(&palette.pred), text));
                    }
                    None => ret.push(format!("{}{}", open_span(&palette.pred), text)),
                }
                last_pred = Some((pos, ret.len() - 1));
            }
        }
    }
    if let Some((_, last_index)) = last_pred {
        ret[last_index].push_str(CLOSE_SPAN);
    }
    ret.join(" ")
}
