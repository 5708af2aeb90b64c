use clap::Parser;
use musicxml_humdrum::{
    convert_musicxml_to_humdrum, ConversionError, ConversionSettings, ConversionStatus,
    ParseError,
};
use std::io::{self, Read, Write};
use std::path::PathBuf;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(AppError::Conversion(ConversionError::Parse(ParseError::InvalidXml {
            description,
            offset,
        }))) => {
            eprintln!("XML syntax error at byte offset {offset}: {description}");
            1
        }
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            2
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("musicxml2hum=info,musicxml_humdrum=warn"),
    )
    .init();

    let args = CliArgs::parse();

    let mut settings = match &args.settings {
        Some(path) => {
            log::info!("Using settings from {path:?}");
            ConversionSettings::from_json_file(path)?
        }
        None => ConversionSettings::default(),
    };
    if args.no_reference_records {
        settings.reference_records = false;
    }
    if args.no_part_labels {
        settings.part_labels = false;
    }

    let musicxml = read_input(&args.input)?;
    let result = convert_musicxml_to_humdrum(&musicxml, Some(settings))?;

    if result.status() == ConversionStatus::WithWarnings {
        log::info!("Conversion finished with {} warnings", result.warnings.len());
        if args.warnings_json {
            let json = serde_json::to_string_pretty(&result.warnings)
                .map_err(|err| AppError::Output(err.to_string()))?;
            eprintln!("{json}");
        }
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, &result.humdrum_source)?;
            log::info!("Wrote {path:?}");
        }
        None => io::stdout().write_all(result.humdrum_source.as_bytes())?,
    }

    Ok(())
}

/// `-` reads standard input
fn read_input(input: &str) -> Result<String, AppError> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    let path = PathBuf::from(input);
    if !path.exists() {
        return Err(AppError::Input(format!("Input file not found {path:?}")));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[derive(Parser, Debug)]
#[command(version, about = "Convert MusicXML to Humdrum **kern", long_about = None)]
pub struct CliArgs {
    /// MusicXML file to convert, or `-` for standard input.
    input: String,
    /// Write Humdrum to this file instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON file with conversion settings.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Do not emit !!!COM / !!!OTL reference records.
    #[arg(long, default_value_t = false)]
    no_reference_records: bool,
    /// Do not emit *part, *staff and *I interpretation lines.
    #[arg(long, default_value_t = false)]
    no_part_labels: bool,
    /// Print the warning list as JSON on standard error.
    #[arg(long, default_value_t = false)]
    warnings_json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),
    #[error("input error: {0}")]
    Input(String),
    #[error("output error: {0}")]
    Output(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
