//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

use predpatt_hits::extract::ExtractOptions;
use predpatt_hits::generate::GenerateOptions;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "predpatt-hits",
    about = "crowdsourcing HITs for predicate-argument structures."
)]
/// Holds every command that is callable by the `predpatt-hits` command.
pub enum PredpattHits {
    #[structopt(about = "Generate question HITs from a CoNLL-U file")]
    Generate(Generate),
    #[structopt(about = "Generate entailment HITs from a CoNLL-U file")]
    Entail(Entail),
    #[structopt(about = "Compute agreement statistics of HIT results")]
    Analyze(Analyze),
    #[structopt(about = "Reservoir sample sentences of CoNLL-U files")]
    Sample(Sample),
    #[structopt(about = "Sample sentences across files, proportionally to their sentence counts")]
    SubSample(SubSample),
    #[structopt(about = "Label and sample blocks of a file")]
    SampleBlocks(SampleBlocks),
    #[structopt(about = "List sample entries of a HIT file")]
    Entries(Entries),
}

#[derive(Debug, StructOpt)]
/// Generate command and parameters.
/// ```sh
/// USAGE:
///     predpatt-hits generate [FLAGS] [OPTIONS] <src> <dst>
///
/// FLAGS:
///         --all-types        ask questions about every predicate type, not only normal ones
///         --cut              treat open clausal complements as independent predicates
///         --flush-partial    write the last batch even if it is not full
///         --simple           only keep core arguments
///
/// OPTIONS:
///     -b, --batch-size <batch-size>    number of questions per row [default: 5]
///         --max-rows <max-rows>        stop after writing this many rows
/// ```
pub struct Generate {
    #[structopt(parse(from_os_str), help = "source CoNLL-U file (may be gzipped)")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "destination HIT csv file")]
    pub dst: PathBuf,
    #[structopt(
        short = "b",
        long = "batch-size",
        default_value = "5",
        help = "number of questions per row"
    )]
    pub batch_size: usize,
    #[structopt(long = "flush-partial", help = "write the last batch even if it is not full")]
    pub flush_partial: bool,
    #[structopt(
        long = "all-types",
        help = "ask questions about every predicate type, not only normal ones"
    )]
    pub all_types: bool,
    #[structopt(long = "max-rows", help = "stop after writing this many rows")]
    pub max_rows: Option<usize>,
    #[structopt(long = "simple", help = "only keep core arguments")]
    pub simple: bool,
    #[structopt(
        long = "cut",
        help = "treat open clausal complements as independent predicates"
    )]
    pub cut: bool,
}

impl Generate {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            simple: self.simple,
            cut: self.cut,
            ..ExtractOptions::hits()
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            batch_size: self.batch_size,
            flush_partial: self.flush_partial,
            all_types: self.all_types,
            max_rows: self.max_rows,
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct Entail {
    #[structopt(parse(from_os_str), help = "source CoNLL-U file (may be gzipped)")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "destination HIT csv file")]
    pub dst: PathBuf,
    #[structopt(
        short = "b",
        long = "batch-size",
        default_value = "5",
        help = "number of sentences per row"
    )]
    pub batch_size: usize,
    #[structopt(long = "flush-partial", help = "write the last batch even if it is not full")]
    pub flush_partial: bool,
    #[structopt(long = "max-rows", help = "stop after writing this many rows")]
    pub max_rows: Option<usize>,
}

impl Entail {
    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            batch_size: self.batch_size,
            flush_partial: self.flush_partial,
            all_types: true,
            max_rows: self.max_rows,
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct Analyze {
    #[structopt(parse(from_os_str), help = "HIT results csv file")]
    pub results: PathBuf,
    #[structopt(long = "json", help = "print the report as JSON")]
    pub json: bool,
    #[structopt(
        long = "scores",
        parse(from_os_str),
        help = "write per predicate scores to this csv file"
    )]
    pub scores: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
pub struct Sample {
    #[structopt(help = "number of sentences to sample per file")]
    pub k: usize,
    #[structopt(
        parse(from_os_str),
        help = "source CoNLL-U file, or directory with --file-list"
    )]
    pub src: PathBuf,
    #[structopt(
        parse(from_os_str),
        help = "destination file, or directory with --file-list"
    )]
    pub dst: PathBuf,
    #[structopt(
        long = "file-list",
        parse(from_os_str),
        help = "sample each file listed (one name per line) in src. Use '-' to sample every file of src"
    )]
    pub file_list: Option<PathBuf>,
    #[structopt(long = "seed", help = "random seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, StructOpt)]
pub struct SubSample {
    #[structopt(help = "number of sentences to sample")]
    pub n: u64,
    #[structopt(parse(from_os_str), help = "file of <file name>\\t<sentence count> lines")]
    pub count_file: PathBuf,
    #[structopt(parse(from_os_str), help = "directory of sampled files")]
    pub files_dir: PathBuf,
    #[structopt(
        long = "dst",
        parse(from_os_str),
        help = "destination file. Leave blank for stdout."
    )]
    pub dst: Option<PathBuf>,
    #[structopt(long = "seed", help = "random seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, StructOpt)]
pub struct SampleBlocks {
    #[structopt(parse(from_os_str), help = "source file")]
    pub src: PathBuf,
    #[structopt(short = "n", default_value = "100", help = "number of blocks to sample")]
    pub n: usize,
    #[structopt(long = "seed", help = "random seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, StructOpt)]
pub struct Entries {
    #[structopt(parse(from_os_str), help = "HIT (or HIT results) csv file")]
    pub hits: PathBuf,
}
