use std::fs::{self, File};
use std::io::{prelude::*, stdin, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use severity::{Document, Predictor, TrainedModel, METADATA_KEY};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(about = "A program to classify reports by symptom severity.")]
struct Args {
    /// The model file to use when classifying reports
    #[arg(long)]
    model: PathBuf,

    /// Reports to classify, one per file. Directories are read recursively.
    /// A single report is read from stdin when no file is given.
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

    eprintln!("Start classification");
    let start = Instant::now();
    let mut n_documents = 0;
    if args.input.is_empty() {
        let mut text = String::new();
        stdin().read_to_string(&mut text)?;
        let mut doc = Document::new(text);
        predictor.annotate(&mut doc)?;
        println!("{}", doc.metadata(METADATA_KEY).unwrap_or_default());
        n_documents += 1;
    } else {
        let mut files = vec![];
        for path in &args.input {
            collect_files(path, &mut files)?;
        }
        for path in files {
            let mut doc = Document::new(fs::read_to_string(&path)?);
            predictor.annotate(&mut doc)?;
            println!(
                "{}\t{}",
                path.display(),
                doc.metadata(METADATA_KEY).unwrap_or_default()
            );
            n_documents += 1;
        }
    }
    let duration = start.elapsed();
    eprintln!("Elapsed: {} [sec]", duration.as_secs_f64());
    eprintln!(
        "Speed: {} [documents/sec]",
        n_documents as f64 / duration.as_secs_f64()
    );

    Ok(())
}
