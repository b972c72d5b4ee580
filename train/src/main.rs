use std::fs::{self, File};
use std::io::{prelude::*, stderr};
use std::path::{Path, PathBuf};

use clap::Parser;
use severity::{InfoGainRanker, LiblinearLearner, SolverType, StopWords, Trainer};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(about = "A program to train symptom severity models.")]
struct Args {
    /// Training documents, one report per file. Directories are read recursively.
    #[arg(long, required = true)]
    corpus: Vec<PathBuf>,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// A stop-word file, one word per line
    #[arg(long)]
    stop_words: Option<PathBuf>,

    /// Tokens occurring fewer times than this in the corpus are not used as attributes
    #[arg(long, default_value = "2")]
    min_term_count: usize,

    /// The number of attributes kept by feature selection (0 keeps all)
    #[arg(long, default_value = "1000")]
    attributes: usize,

    /// Order the dictionary by first occurrence instead of corpus frequency
    #[arg(long)]
    no_sort: bool,

    /// The epsilon stopping criterion for classifier training
    #[arg(long, default_value = "0.01")]
    eps: f64,

    /// The cost hyperparameter for classifier training
    #[arg(long, default_value = "1.0")]
    cost: f64,

    /// The solver. {0, 1, 2, 3, 4, 5, 6, 7} (see LIBLINEAR documentation for more details)
    #[arg(long, default_value = "0")]
    solver: SolverType,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> walkdir::Result<()> {
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stop_words = args
        .stop_words
        .as_ref()
        .map_or_else(StopWords::new, StopWords::load);

    let mut trainer = Trainer::new(args.min_term_count)?
        .stop_words(stop_words)
        .sort_by_frequency(!args.no_sort)
        .attributes_to_keep(args.attributes);

    eprintln!("Loading dataset...");
    let mut files = vec![];
    for path in &args.corpus {
        collect_files(path, &mut files)?;
    }
    for (i, path) in files.iter().enumerate() {
        if i % 100 == 0 {
            eprint!("# of documents: {i}\r");
            stderr().flush()?;
        }
        let text = fs::read_to_string(path)?;
        trainer.push_text(&text);
    }
    eprintln!(
        "# of documents: {} ({} without a known class were skipped)",
        trainer.n_documents(),
        trainer.n_dropped(),
    );

    eprintln!("Start training...");
    let learner = LiblinearLearner::new(args.eps, args.cost, args.solver);
    let model = trainer.train(&InfoGainRanker, &learner)?;
    eprintln!(
        "Finish training. # of attributes: {} / {}",
        model.selection_mask().len(),
        model.dictionary().len(),
    );

    let mut f = zstd::Encoder::new(File::create(args.model)?, 19)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
