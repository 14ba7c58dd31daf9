//! # predpatt-hits
//!
//! Crowdsourcing tasks (HITs) for the evaluation of predicate-argument structures extracted from
//! dependency parses, and analysis of the answers of workers.
//!
//! ## Getting started
//!
//! ```sh
//! predpatt-hits 0.1.0
//! crowdsourcing HITs for predicate-argument structures.
//!
//! USAGE:
//!     predpatt-hits <SUBCOMMAND>
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!
//! SUBCOMMANDS:
//!     analyze          Compute agreement statistics of HIT results
//!     entail           Generate entailment HITs from a CoNLL-U file
//!     entries          List sample entries of a HIT file
//!     generate         Generate question HITs from a CoNLL-U file
//!     help             Prints this message or the help of the given subcommand(s)
//!     sample           Reservoir sample sentences of CoNLL-U files
//!     sample-blocks    Label and sample blocks of a file
//!     sub-sample       Sample sentences across files, proportionally to their sentence counts
//! ```
//!
//! Logging is controlled by `RUST_LOG` (e.g. `RUST_LOG=info`).

use std::fs::File;
use std::io::{self, BufReader, Write};

use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

use predpatt_hits::agreement::{score_table, write_scores, Report};
use predpatt_hits::analysis::load_results;
use predpatt_hits::entries::{entries_from_hits, format_entries};
use predpatt_hits::error::Error;
use predpatt_hits::extract::{DependencyExtractor, ExtractOptions};
use predpatt_hits::generate::Generator;
use predpatt_hits::render::Palette;
use predpatt_hits::sampling;

#[macro_use]
extern crate log;

mod cli;

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let opt = cli::PredpattHits::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::PredpattHits::Generate(g) => {
            let extractor = DependencyExtractor::new(g.extract_options());
            let options = g.generate_options();
            let generator = Generator::new(g.src, g.dst, extractor, Palette::default(), options);
            generator.run()?;
        }

        cli::PredpattHits::Entail(e) => {
            let extractor = DependencyExtractor::new(ExtractOptions::hits());
            let options = e.generate_options();
            let generator = Generator::new(e.src, e.dst, extractor, Palette::default(), options);
            generator.run_entailments()?;
        }

        cli::PredpattHits::Analyze(a) => {
            let results = load_results(BufReader::new(File::open(&a.results)?))?;
            let report = Report::new(&results);
            if a.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }

            if let Some(path) = a.scores {
                let scores = score_table(&results);
                write_scores(File::create(&path)?, &scores)?;
                info!("wrote {} predicate scores to {:?}", scores.len(), path);
            }
        }

        cli::PredpattHits::Sample(s) => {
            match s.file_list {
                Some(list) => {
                    let files = if list.as_os_str() == "-" {
                        sampling::list_dir(&s.src)?
                    } else {
                        sampling::read_file_list(&list)?
                    };
                    let total = sampling::multi_sample(s.k, &files, &s.src, &s.dst, s.seed)?;
                    info!("sampled {} sentences from {} files", total, files.len());
                }
                None => {
                    let nb = sampling::sample_conllu(s.k, &s.src, &s.dst, &mut rng(s.seed))?;
                    info!("sampled {} sentences", nb);
                }
            };
        }

        cli::PredpattHits::SubSample(s) => {
            let blocks =
                sampling::sub_sample(s.n, &s.count_file, &s.files_dir, &mut rng(s.seed))?;
            match s.dst {
                Some(dst) => writeln!(File::create(dst)?, "{}", blocks.join("\n\n"))?,
                None => writeln!(io::stdout().lock(), "{}", blocks.join("\n\n"))?,
            };
        }

        cli::PredpattHits::SampleBlocks(s) => {
            let blocks = sampling::sample_blocks(&s.src, s.n, &mut rng(s.seed))?;
            writeln!(io::stdout().lock(), "{}", blocks.join("\n\n"))?;
        }

        cli::PredpattHits::Entries(e) => {
            let entries = entries_from_hits(BufReader::new(File::open(&e.hits)?))?;
            writeln!(io::stdout().lock(), "{}", format_entries(&entries))?;
        }
    };
    Ok(())
}
