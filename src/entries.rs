/*! Sample entries.

Sampled sentences are labelled `<document>.<ext>__<sentence index>`.
An [Entry] locates a sentence back into its source document, so that other annotations of the same sentence
(e.g. constituency parses) can be retrieved.

Entries are grouped by *file entry* (the lowercased first 14 characters of the label) and serialized one
group per line:

```text
<file entry>\t\t<sort id>\t<document>\t<index>\t\t<sort id>\t<document>\t<index>…
```
!*/
use std::collections::{BTreeMap, HashSet};
use std::io::Read;

use itertools::Itertools;
use log::debug;

use crate::analysis::INPUT_COLUMN;
use crate::conllu::BlockReader;
use crate::error::Error;
use crate::hit::HitQuestion;

const FILE_ENTRY_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    /// `<document>.<4 digits index>`
    pub sort_id: String,
    pub comm_id: String,
    pub sent_i: usize,
}

impl Entry {
    pub fn new(comm_id: String, sent_i: usize) -> Self {
        Self {
            sort_id: format!("{}.{:04}", comm_id, sent_i),
            comm_id,
            sent_i,
        }
    }

    /// Parse a `<document>.<ext>__<index>` label.
    pub fn from_label(label: &str) -> Result<Self, Error> {
        let invalid = || Error::Custom(format!("invalid sample label: {:?}", label));
        let (comm_id, sent_i) = label.rsplit_once("__").ok_or_else(invalid)?;
        let sent_i = sent_i.trim().parse::<usize>().map_err(|_| invalid())?;
        let comm_id = comm_id
            .rsplit_once('.')
            .map(|(id, _)| id)
            .unwrap_or(comm_id);
        Ok(Self::new(comm_id.to_string(), sent_i))
    }
}

/// Entries of a sample file, from the label on the first line of each block, sorted.
pub fn entries_from_samples(text: &str) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    for block in BlockReader::new(text.as_bytes()) {
        let block = block?;
        let first = block.lines.first().map(String::as_str).unwrap_or_default();
        let label = first.strip_prefix("# ").ok_or_else(|| Error::Conllu {
            line: block.first_line,
            reason: "block without label".to_string(),
        })?;
        entries.push(Entry::from_label(label)?);
    }
    entries.sort();
    Ok(entries)
}

/// File entry of a sentence id.
pub fn file_entry(sent_id: &str) -> String {
    sent_id
        .chars()
        .take(FILE_ENTRY_LEN)
        .collect::<String>()
        .to_lowercase()
}

/// Entries of the sentences of a HIT file, grouped by file entry and sorted.
pub fn entries_from_hits<R: Read>(r: R) -> Result<BTreeMap<String, Vec<Entry>>, Error> {
    let mut reader = csv::Reader::from_reader(r);
    let input_idx = reader
        .headers()?
        .iter()
        .position(|h| h == INPUT_COLUMN)
        .ok_or_else(|| Error::MissingColumn(INPUT_COLUMN.to_string()))?;

    let mut seen = HashSet::new();
    let mut entries: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let questions: Vec<HitQuestion> = serde_json::from_str(&record[input_idx])?;
        for q in questions {
            if !seen.insert(q.sentence_id.clone()) {
                continue;
            }
            let entry = Entry::from_label(&q.sentence_id)?;
            entries
                .entry(file_entry(&q.sentence_id))
                .or_default()
                .push(entry);
        }
    }

    for group in entries.values_mut() {
        group.sort();
    }
    debug!("{} sentences in {} file entries", seen.len(), entries.len());
    Ok(entries)
}

/// Serialize grouped entries, one group per line.
pub fn format_entries(entries: &BTreeMap<String, Vec<Entry>>) -> String {
    entries
        .iter()
        .map(|(file_entry, group)| {
            let items = group
                .iter()
                .map(|e| format!("{}\t{}\t{}", e.sort_id, e.comm_id, e.sent_i))
                .join("\t\t");
            format!("{}\t\t{}", file_entry, items)
        })
        .join("\n")
}

/// Load grouped entries. Empty lines are ignored.
pub fn load_entries<'a, I>(lines: I) -> Result<BTreeMap<String, Vec<Entry>>, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ret = BTreeMap::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut items = line.split("\t\t");
        let file_entry = items.next().unwrap_or_default().to_string();
        let mut group = Vec::new();
        for item in items {
            let invalid = || Error::Custom(format!("invalid entry: {:?}", item));
            let (sort_id, comm_id, sent_i) = match item.split('\t').collect::<Vec<_>>()[..] {
                [sort_id, comm_id, sent_i] => (sort_id, comm_id, sent_i),
                _ => return Err(invalid()),
            };
            let sent_i = sent_i.trim().parse::<usize>().map_err(|_| invalid())?;
            group.push(Entry {
                sort_id: sort_id.to_string(),
                comm_id: comm_id.to_string(),
                sent_i,
            });
        }
        ret.insert(file_entry, group);
    }
    Ok(ret)
}
