/*! CoNLL-U reading and writing.

Sentences are blank-line separated blocks of tab-separated rows.
Blocks are first read as raw lines by [BlockReader], then parsed into [Sentence] by [ConlluReader].

Gzip compressed files (`.gz`) are transparently decompressed by [open].
!*/
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};

use flate2::read::MultiGzDecoder;
use log::debug;

use crate::error::Error;
use crate::text::ptb_token;

/// A single word of a parsed sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// 0-based position in the sentence.
    pub position: usize,
    pub text: String,
    pub lemma: String,
    /// Universal POS tag.
    pub tag: String,
    /// Language specific POS tag.
    pub xpos: String,
    /// 0-based position of the governor, `None` for the root.
    pub gov: Option<usize>,
    pub gov_rel: String,
}

impl Token {
    /// Relation without its subtype (`nsubj:pass` -> `nsubj`).
    pub fn base_rel(&self) -> &str {
        self.gov_rel.split(':').next().unwrap_or("")
    }
}

/// A dependency parsed sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub id: String,
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(id: String, tokens: Vec<Token>) -> Self {
        Self { id, tokens }
    }

    /// Token texts, space separated.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|tk| tk.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, position: usize) -> Option<&Token> {
        self.tokens.get(position)
    }

    /// Direct dependents of the token at `position`, in word order.
    pub fn dependents(&self, position: usize) -> impl Iterator<Item = &Token> {
        self.tokens
            .iter()
            .filter(move |tk| tk.gov == Some(position))
    }

    /// Positions of the subtree rooted at `position` (included), sorted.
    ///
    /// Dependents whose relation matches `prune` are not descended into.
    pub fn subtree_pruned<F>(&self, position: usize, prune: F) -> Vec<usize>
    where
        F: Fn(&Token) -> bool,
    {
        let mut seen = vec![false; self.tokens.len()];
        let mut stack = vec![position];
        let mut ret = Vec::new();
        while let Some(pos) = stack.pop() {
            if pos >= seen.len() || seen[pos] {
                continue;
            }
            seen[pos] = true;
            ret.push(pos);
            for dep in self.dependents(pos) {
                if !prune(dep) {
                    stack.push(dep.position);
                }
            }
        }
        ret.sort_unstable();
        ret
    }

    /// Positions of the subtree rooted at `position` (included), sorted.
    pub fn subtree(&self, position: usize) -> Vec<usize> {
        self.subtree_pruned(position, |_| false)
    }

    /// Replace PTB bracket tokens (`-LRB-`…) by their plain form.
    pub fn normalize_ptb(&mut self) {
        for tk in self.tokens.iter_mut() {
            let plain = ptb_token(&tk.text);
            if plain != tk.text {
                tk.text = plain.to_string();
            }
        }
    }

    /// Serialize as a CoNLL-U block, with an optional first comment line.
    ///
    /// FEATS, DEPS and MISC are not kept and are written as `_`.
    pub fn to_conllu(&self, label: Option<&str>) -> String {
        let mut lines = Vec::with_capacity(self.tokens.len() + 1);
        if let Some(label) = label {
            lines.push(format!("# {}", label));
        }
        for tk in &self.tokens {
            let head = tk.gov.map(|g| g + 1).unwrap_or(0);
            lines.push(format!(
                "{}\t{}\t{}\t{}\t{}\t_\t{}\t{}\t_\t_",
                tk.position + 1,
                tk.text,
                tk.lemma,
                tk.tag,
                tk.xpos,
                head,
                tk.gov_rel
            ));
        }
        lines.join("\n")
    }
}

/// Raw sentence block: the 1-based line number of its first line and its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub first_line: usize,
    pub lines: Vec<String>,
}

impl Block {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Open a file for buffered reading, decompressing it if it ends with `.gz`.
pub fn open(path: &Path) -> Result<Box<dyn BufRead + Send>, Error> {
    let f = File::open(path)?;
    let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    if is_gz {
        debug!("opening {:?} as gzip", path);
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// Reader that yields blank-line separated blocks.
///
/// Runs of blank lines (or whitespace-only lines) count as a single separator.
pub struct BlockReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl BlockReader<Box<dyn BufRead + Send>> {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        Ok(Self::new(open(path)?))
    }
}

impl<R: BufRead> Iterator for BlockReader<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut ret = Vec::new();
        let mut first_line = 0;
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(Error::Io(e))),
            };
            // cut at empty line
            if line.trim().is_empty() {
                if ret.is_empty() {
                    continue;
                }
                return Some(Ok(Block {
                    first_line,
                    lines: ret,
                }));
            }
            if ret.is_empty() {
                first_line = self.line_no;
            }
            ret.push(line);
        }

        // close eventual last block
        if ret.is_empty() {
            None
        } else {
            Some(Ok(Block {
                first_line,
                lines: ret,
            }))
        }
    }
}

/// Parse a `HEAD` or `ID` column.
fn parse_index(value: &str, line: usize, column: &str) -> Result<usize, Error> {
    value.parse::<usize>().map_err(|_| Error::Conllu {
        line,
        reason: format!("{} is not an integer: {:?}", column, value),
    })
}

/// Parse a block into a [Sentence].
///
/// `sent_num` is the 1-based index of the sentence in its file,
/// used to name sentences that carry no comment.
pub fn parse_block(block: &Block, sent_num: usize) -> Result<Sentence, Error> {
    let mut sent_id = None;
    let mut rows = Vec::new();

    for (offset, line) in block.lines.iter().enumerate() {
        let line_no = block.first_line + offset;
        if let Some(comment) = line.strip_prefix('#') {
            if let Some(id) = comment.trim_start().strip_prefix("sent_id") {
                let id = id.trim_start();
                let id = id.strip_prefix('=').unwrap_or(id);
                sent_id = Some(id.trim().to_string());
            } else if sent_id.is_none() && !comment.contains(" = ") {
                // the first bare comment is the sample label
                sent_id = Some(comment.trim().to_string());
            }
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != 10 {
            return Err(Error::Conllu {
                line: line_no,
                reason: format!("expected 10 columns, got {}", columns.len()),
            });
        }
        // multiword tokens and empty nodes
        if columns[0].contains('-') || columns[0].contains('.') {
            continue;
        }
        parse_index(columns[0], line_no, "ID")?;
        let head = parse_index(columns[6], line_no, "HEAD")?;
        rows.push((line_no, columns, head));
    }

    if rows.is_empty() {
        return Err(Error::Conllu {
            line: block.first_line,
            reason: "sentence without tokens".to_string(),
        });
    }

    let nb_tokens = rows.len();
    let mut tokens = Vec::with_capacity(nb_tokens);
    for (position, (line_no, columns, head)) in rows.into_iter().enumerate() {
        if head > nb_tokens {
            return Err(Error::Conllu {
                line: line_no,
                reason: format!("HEAD {} out of sentence of {} tokens", head, nb_tokens),
            });
        }
        tokens.push(Token {
            position,
            text: columns[1].to_string(),
            lemma: columns[2].to_string(),
            tag: columns[3].to_string(),
            xpos: columns[4].to_string(),
            gov: head.checked_sub(1),
            gov_rel: columns[7].to_string(),
        });
    }

    let id = sent_id.unwrap_or_else(|| format!("sent_{}", sent_num));
    Ok(Sentence::new(id, tokens))
}

/// Iterates over the [Sentence]s of a CoNLL-U stream.
pub struct ConlluReader<R> {
    blocks: BlockReader<R>,
    sent_num: usize,
}

impl<R: BufRead> ConlluReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            blocks: BlockReader::new(reader),
            sent_num: 0,
        }
    }
}

impl ConlluReader<Box<dyn BufRead + Send>> {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        Ok(Self::new(open(path)?))
    }
}

impl<R: BufRead> Iterator for ConlluReader<R> {
    type Item = Result<Sentence, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.next()?;
        self.sent_num += 1;
        Some(block.and_then(|b| parse_block(&b, self.sent_num)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_SENTENCES: &str = "# sent_id = s1
# text = John saw Mary .
1\tJohn\tJohn\tPROPN\tNNP\t_\t2\tnsubj\t_\t_
2\tsaw\tsee\tVERB\tVBD\t_\t0\troot\t_\t_
3\tMary\tMary\tPROPN\tNNP\t_\t2\tobj\t_\t_
4\t.\t.\tPUNCT\t.\t_\t2\tpunct\t_\t_


# newswire.comm__3
1\t-LRB-\t-LRB-\tPUNCT\t-LRB-\t_\t2\tpunct\t_\t_
2\tthree\tthree\tNUM\tCD\t_\t0\troot\t_\t_
3\t-RRB-\t-RRB-\tPUNCT\t-RRB-\t_\t2\tpunct\t_\t_
";

    #[test]
    fn test_blocks() {
        let blocks: Vec<Block> = BlockReader::new(Cursor::new(TWO_SENTENCES))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].first_line, 1);
        assert_eq!(blocks[0].lines.len(), 6);
        assert_eq!(blocks[1].first_line, 9);
        assert_eq!(blocks[1].lines.len(), 4);
    }

    #[test]
    fn test_blocks_no_trailing_newline() {
        let blocks: Vec<Block> = BlockReader::new(Cursor::new("a\nb\n\nc"))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(blocks[0].text(), "a\nb");
        assert_eq!(blocks[1].text(), "c");
    }

    #[test]
    fn test_parse() {
        let sentences: Vec<Sentence> = ConlluReader::new(Cursor::new(TWO_SENTENCES))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sentences.len(), 2);

        let s = &sentences[0];
        assert_eq!(s.id, "s1");
        assert_eq!(s.text(), "John saw Mary .");
        assert_eq!(s.tokens[0].gov, Some(1));
        assert_eq!(s.tokens[1].gov, None);
        assert_eq!(s.tokens[2].gov_rel, "obj");
        assert_eq!(s.tokens[2].tag, "PROPN");

        // first comment is used as id when there is no sent_id
        assert_eq!(sentences[1].id, "newswire.comm__3");
    }

    #[test]
    fn test_default_id() {
        // metadata comments are not ids
        let text = "# text = a\n1\ta\ta\tX\tX\t_\t0\troot\t_\t_\n\n1\tb\tb\tX\tX\t_\t0\troot\t_\t_";
        let ids: Vec<String> = ConlluReader::new(Cursor::new(text))
            .map(|s| s.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["sent_1", "sent_2"]);
    }

    #[test]
    fn test_first_bare_comment_id() {
        let text = "# f.comm_0000001\n# newpar\n1\ta\ta\tX\tX\t_\t0\troot\t_\t_";
        let s = ConlluReader::new(Cursor::new(text))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(s.id, "f.comm_0000001");

        // sent_id still wins over an earlier label
        let text = "# label\n# sent_id = s9\n1\ta\ta\tX\tX\t_\t0\troot\t_\t_";
        let s = ConlluReader::new(Cursor::new(text))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(s.id, "s9");
    }

    #[test]
    fn test_skip_multiword() {
        let text = "1-2\tdel\t_\t_\t_\t_\t_\t_\t_\t_
1\tde\tde\tADP\t_\t_\t2\tcase\t_\t_
2\tel\tel\tDET\t_\t_\t0\troot\t_\t_
2.1\tx\tx\tX\t_\t_\t_\t_\t_\t_";
        let s = ConlluReader::new(Cursor::new(text))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.tokens[1].position, 1);
    }

    #[test]
    fn test_malformed() {
        let text = "# sent_id = bad\n1\tonly\tthree";
        let err = ConlluReader::new(Cursor::new(text)).next().unwrap();
        match err {
            Err(Error::Conllu { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }

        let text = "1\ta\ta\tX\tX\t_\tz\troot\t_\t_";
        assert!(ConlluReader::new(Cursor::new(text)).next().unwrap().is_err());

        let text = "1\ta\ta\tX\tX\t_\t7\troot\t_\t_";
        assert!(ConlluReader::new(Cursor::new(text)).next().unwrap().is_err());

        // ids that look like multiword ranges are still checked for columns
        let text = "1-2 del\n1\ta\ta\tX\tX\t_\t0\troot\t_\t_";
        match ConlluReader::new(Cursor::new(text)).next().unwrap() {
            Err(Error::Conllu { line, .. }) => assert_eq!(line, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_normalize_and_dump() {
        let mut s = ConlluReader::new(Cursor::new(TWO_SENTENCES))
            .nth(1)
            .unwrap()
            .unwrap();
        s.normalize_ptb();
        assert_eq!(s.text(), "( three )");
        let dumped = s.to_conllu(Some("f.comm__2"));
        let mut lines = dumped.lines();
        assert_eq!(lines.next(), Some("# f.comm__2"));
        assert_eq!(lines.next(), Some("1\t(\t-LRB-\tPUNCT\t-LRB-\t_\t2\tpunct\t_\t_"));
        assert_eq!(lines.nth(0), Some("2\tthree\tthree\tNUM\tCD\t_\t0\troot\t_\t_"));
    }

    #[test]
    fn test_subtree() {
        let s = ConlluReader::new(Cursor::new(TWO_SENTENCES))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(s.subtree(1), vec![0, 1, 2, 3]);
        assert_eq!(s.subtree(2), vec![2]);
        assert_eq!(
            s.subtree_pruned(1, |tk| tk.gov_rel == "punct"),
            vec![0, 1, 2]
        );
        let deps: Vec<usize> = s.dependents(1).map(|tk| tk.position).collect();
        assert_eq!(deps, vec![0, 2, 3]);
    }
}
