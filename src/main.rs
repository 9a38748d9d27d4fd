use clap::Parser;
use log::{error, info, warn};
use matecheck::aligner::{index_assembly, AlignerStream};
use matecheck::catalog::SequenceCatalog;
use matecheck::concord::ConcordanceEvaluator;
use matecheck::faidx::FastaIndex;
use matecheck::report::{ReportSink, TsvReport};
use matecheck::sampler::{sample_pairs, separation_levels};
use matecheck::store::{FragmentStore, StoreKey};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::PathBuf;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Path to the reference FASTA (a .fai index is created if missing)
    #[clap(short = 'r', long, value_parser)]
    reference: String,

    /// Number of fragment pairs to request per separation level
    #[clap(short = 'n', long, value_parser, default_value_t = 10000)]
    read_count: u64,

    /// Smallest separation (insert size) to test
    #[clap(long, value_parser, default_value_t = 100)]
    min_separation: u64,

    /// Largest separation to test; levels double from the minimum while <= this
    #[clap(long, value_parser, default_value_t = 102400)]
    max_separation: u64,

    /// Seed for the pseudo-random source, applied once for the whole run
    #[clap(short = 's', long, value_parser, default_value_t = 42)]
    seed: u64,

    /// Directory for persisted fragment files
    #[clap(short = 'd', long, value_parser, default_value = "matecheck_store")]
    store_dir: String,

    /// Label woven into artifact file names (purely cosmetic)
    #[clap(long, value_parser, default_value = "ref")]
    tag: String,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Estimate assembly accuracy from simulated mate-pair concordance.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Simulate and persist fragment pairs for every separation level
    Simulate {
        #[clap(flatten)]
        common: CommonOpts,
    },
    /// Simulate, align against an assembly and report concordance ratios
    Evaluate {
        #[clap(flatten)]
        common: CommonOpts,

        /// Path to the assembly (or its database) the mates are aligned against
        #[clap(short = 'a', long, value_parser)]
        assembly: String,

        /// Aligner command template; the assembly and the fragment file are appended as arguments, tabular hits are read from its stdout
        #[clap(long, value_parser)]
        aligner: String,

        /// Database indexer command template, run once over the assembly before alignment
        #[clap(long, value_parser)]
        indexer: Option<String>,

        /// Report file (one `<separation>\t<ratio>` row per level); stdout if omitted
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Simulate { common } => {
            let mut run = Run::prepare(&common)?;
            run.simulate_all()
        }
        Args::Evaluate {
            common,
            assembly,
            aligner,
            indexer,
            output,
        } => {
            let mut run = Run::prepare(&common)?;

            if let Some(indexer) = &indexer {
                index_assembly(indexer, &assembly)?;
            }

            let mut sink: Box<dyn ReportSink> = match &output {
                Some(path) => Box::new(TsvReport::create(path)?),
                None => Box::new(TsvReport::new(io::stdout())),
            };

            run.evaluate_all(&assembly, &aligner, sink.as_mut())?;
            sink.finish()
        }
    }
}

/// One invocation: reference index, catalog, store and the single seeded
/// random source shared by all separation levels.
struct Run {
    index: FastaIndex,
    catalog: SequenceCatalog,
    store: FragmentStore,
    rng: StdRng,
    levels: Vec<u64>,
    read_count: u64,
    seed: u64,
}

impl Run {
    fn prepare(common: &CommonOpts) -> io::Result<Self> {
        // Initialize logger based on verbosity
        env_logger::Builder::new()
            .filter_level(match common.verbose {
                0 => log::LevelFilter::Error,
                1 => log::LevelFilter::Info,
                _ => log::LevelFilter::Debug,
            })
            .init();

        let index = FastaIndex::from_path(&common.reference)?;
        let catalog = SequenceCatalog::from_fasta_index(&index)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        info!(
            "Loaded {} reference sequences, {} bp total",
            catalog.len(),
            catalog.total_length()
        );

        let levels = separation_levels(common.min_separation, common.max_separation);
        if levels.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "No separation levels between {} and {}",
                    common.min_separation, common.max_separation
                ),
            ));
        }

        let store = FragmentStore::new(&common.store_dir, &common.tag)?;

        // Seeded once; every level consumes from this one draw stream, in
        // increasing-separation order.
        let rng = StdRng::seed_from_u64(common.seed);

        Ok(Run {
            index,
            catalog,
            store,
            rng,
            levels,
            read_count: common.read_count,
            seed: common.seed,
        })
    }

    /// Get or create the persisted fragment pairs for one level.
    fn level_pairs(&mut self, separation: u64) -> io::Result<(u64, PathBuf)> {
        let key = StoreKey {
            seed: self.seed,
            separation,
            read_count: self.read_count,
        };
        let Run {
            index,
            catalog,
            store,
            rng,
            read_count,
            ..
        } = self;
        let read_count = *read_count;
        store.get_or_create(&key, &*index, || {
            sample_pairs(catalog, separation, read_count, rng)
        })
    }

    fn simulate_all(&mut self) -> io::Result<()> {
        for separation in self.levels.clone() {
            let (pair_count, path) = self.level_pairs(separation)?;
            info!(
                "separation {}: {} pairs at {}",
                separation,
                pair_count,
                path.display()
            );
        }
        Ok(())
    }

    fn evaluate_all(
        &mut self,
        assembly: &str,
        aligner_cmd: &str,
        sink: &mut dyn ReportSink,
    ) -> io::Result<()> {
        for separation in self.levels.clone() {
            let (pair_count, frag_path) = self.level_pairs(separation)?;
            if pair_count == 0 {
                warn!("separation {separation}: no pairs could be generated; skipping level");
                continue;
            }

            let mut stream = AlignerStream::spawn(aligner_cmd, assembly, &frag_path)?;
            let mut evaluator = ConcordanceEvaluator::new(separation, pair_count);

            match evaluator.collect_stream(stream.reader()) {
                Ok(()) => {
                    stream.finish()?;
                    let result = evaluator.finish();
                    info!(
                        "separation {}: {}/{} concordant ({:.4})",
                        separation,
                        result.concordant,
                        result.total_pairs,
                        result.ratio()
                    );
                    sink.write_row(&result)?;
                }
                Err(e) => {
                    // A corrupted level gets no ratio at all; a partial one
                    // would be misleading. Later levels still run.
                    error!("separation {separation}: {e}; level discarded");
                }
            }
        }
        Ok(())
    }
}
