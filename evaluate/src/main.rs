use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use severity::{Predictor, RecordExtractor, Severity, TrainedModel};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the accuracy of severity models.")]
struct Args {
    /// The model file to use when classifying reports
    #[arg(long)]
    model: PathBuf,

    /// Annotated reports, one per file. Directories are read recursively.
    #[arg(required = true)]
    input: Vec<PathBuf>,
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

    eprintln!("Loading model file...");
    let f = zstd::Decoder::new(BufReader::new(File::open(args.model)?))?;
    let model = TrainedModel::read(f)?;
    let predictor = Predictor::new(model)?;
    let extractor = RecordExtractor::new()?;

    let mut files = vec![];
    for path in &args.input {
        collect_files(path, &mut files)?;
    }

    // confusion[reference][hypothesis]
    let mut confusion = [[0usize; Severity::N_CODES]; Severity::N_CODES];
    let mut n_skipped = 0;
    for path in files {
        let record = extractor.extract(&fs::read_to_string(&path)?);
        if !record.label().is_known() {
            n_skipped += 1;
            continue;
        }
        let hypothesis = predictor.predict_record(&record)?;
        confusion[usize::from(record.label().code())][usize::from(hypothesis.code())] += 1;
    }
    if n_skipped != 0 {
        eprintln!("Skipped {n_skipped} documents without a known class");
    }

    let n_total: usize = confusion.iter().flatten().sum();
    let n_correct: usize = (0..Severity::N_CODES).map(|i| confusion[i][i]).sum();
    println!("Accuracy: {}", n_correct as f64 / n_total as f64);
    println!("Class\tPrecision\tRecall\tF1");
    for cls in &Severity::ALL[..Severity::N_CODES - 1] {
        let i = usize::from(cls.code());
        let n_tp = confusion[i][i];
        let n_hyp: usize = confusion.iter().map(|row| row[i]).sum();
        let n_ref: usize = confusion[i].iter().sum();
        let precision = n_tp as f64 / n_hyp as f64;
        let recall = n_tp as f64 / n_ref as f64;
        let f1 = 2. * precision * recall / (precision + recall);
        println!("{cls}\t{precision}\t{recall}\t{f1}");
    }
    println!();
    print!("ref\\hyp");
    for cls in Severity::ALL {
        print!("\t{cls}");
    }
    println!();
    for (cls, row) in Severity::ALL.iter().zip(&confusion).take(Severity::N_CODES - 1) {
        print!("{cls}");
        for n in row {
            print!("\t{n}");
        }
        println!();
    }

    Ok(())
}
