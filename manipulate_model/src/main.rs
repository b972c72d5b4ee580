use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use severity::{Severity, TrainedModel, FORMAT_VERSION};

#[derive(Parser, Debug)]
#[command(about = "A program to inspect trained severity models.")]
struct Args {
    /// Input path of the model file
    #[arg(long)]
    model_in: PathBuf,

    /// Output the dictionary and the attribute weights contained in the model.
    #[arg(long)]
    dump_dict: Option<PathBuf>,
}

#[derive(Serialize)]
struct DictionaryRecordFlatten<'a> {
    token: &'a str,
    index: usize,
    selected: bool,
    absent: Option<f64>,
    mild: Option<f64>,
    moderate: Option<f64>,
    severe: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Loading model file...");
    let f = zstd::Decoder::new(BufReader::new(File::open(args.model_in)?))?;
    let model = TrainedModel::read(f)?;

    let classifier = model.classifier();
    let mask = model.selection_mask();
    eprintln!("Format version: {FORMAT_VERSION}");
    eprintln!("# of tokens: {}", model.dictionary().len());
    eprintln!("# of selected attributes: {}", mask.len());
    eprintln!(
        "Classes: {}",
        classifier
            .classes()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    if let Some(path) = args.dump_dict {
        eprintln!("Saving dictionary file...");
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        // Position of each dictionary index within the classifier attributes.
        let mut positions = vec![None; model.dictionary().len()];
        for (pos, &i) in mask.indices().iter().enumerate() {
            positions[usize::try_from(i)?] = Some(pos);
        }
        let weight = |cls: Severity, pos: Option<usize>| {
            pos.and_then(|pos| Some(classifier.class_weights(cls)?[pos]))
        };
        for (index, token) in model.dictionary().tokens().iter().enumerate() {
            let pos = positions[index];
            wtr.serialize(DictionaryRecordFlatten {
                token,
                index,
                selected: pos.is_some(),
                absent: weight(Severity::Absent, pos),
                mild: weight(Severity::Mild, pos),
                moderate: weight(Severity::Moderate, pos),
                severe: weight(Severity::Severe, pos),
            })?;
        }
        wtr.flush()?;
    }

    Ok(())
}
