// src/comms/input.rs

//! Input option parsing.
//!
//! The event source is described by `key:value` options, as on the command
//! line of the tracer's rules tool:
//!
//! ```text
//! file:stdin            read events from standard input
//! file:./events.json    read events from a file
//! format:json           newline-delimited JSON events (the only format)
//! ```

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
};

use thiserror::Error;

pub const INPUT_HELP: &str = "\
tracker-rules <config.toml> with [input] options = [\"<key:value>\", ...]

Specify key:value pairs for the tracer event input. The following keys are available:

'file'   - Input file source. A relative or absolute path, or 'stdin' for standard input.
'format' - Input format. The only supported format is 'json' at the moment.

Examples:

options = [\"file:./events.json\", \"format:json\"]
options = [\"file:stdin\", \"format:json\"]
";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no tracker input options specified")]
    NoOptions,

    #[error("user has requested help text")]
    Help,

    #[error("invalid input-tracker option: {0}")]
    Malformed(String),

    #[error("empty key or value passed: key: >{key}< value: >{value}<")]
    Empty { key: String, value: String },

    #[error("invalid input-tracker option key: {0}")]
    UnknownKey(String),

    #[error("invalid Tracker input file: {0}")]
    InvalidFile(String),

    #[error("invalid tracker input format specified: {0}")]
    InvalidFormat(String),

    #[error("could not set up input source: no input format specified")]
    NoFormat,

    #[error("I/O error opening input: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    pub source: InputSource,
    pub format: InputFormat,
}

impl InputOptions {
    /// Parse the option list. Later options override earlier ones; a missing
    /// `file` means stdin, a missing `format` is an error.
    pub fn parse<S: AsRef<str>>(options: &[S]) -> Result<Self, InputError> {
        if options.is_empty() {
            return Err(InputError::NoOptions);
        }

        let mut source = InputSource::Stdin;
        let mut format = None;

        for opt in options {
            let opt = opt.as_ref();
            if opt == "help" {
                return Err(InputError::Help);
            }

            let kv: Vec<&str> = opt.split(':').collect();
            let [key, value] = kv[..] else {
                return Err(InputError::Malformed(opt.to_string()));
            };
            if key.is_empty() || value.is_empty() {
                return Err(InputError::Empty { key: key.into(), value: value.into() });
            }

            match key {
                "file" => source = parse_file(value)?,
                "format" => format = Some(parse_format(value)?),
                other => return Err(InputError::UnknownKey(other.into())),
            }
        }

        let format = format.ok_or(InputError::NoFormat)?;
        Ok(Self { source, format })
    }

    /// Open the configured source for line reading.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>, InputError> {
        Ok(match &self.source {
            InputSource::Stdin => Box::new(BufReader::new(io::stdin())),
            InputSource::File(path) => Box::new(BufReader::new(File::open(path)?)),
        })
    }
}

fn parse_file(value: &str) -> Result<InputSource, InputError> {
    if value == "stdin" {
        return Ok(InputSource::Stdin);
    }
    let path = PathBuf::from(value);
    if !path.is_file() {
        return Err(InputError::InvalidFile(value.into()));
    }
    Ok(InputSource::File(path))
}

fn parse_format(value: &str) -> Result<InputFormat, InputError> {
    match value.to_uppercase().as_str() {
        "JSON" => Ok(InputFormat::Json),
        other => Err(InputError::InvalidFormat(other.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(opts: &[&str]) -> String {
        InputOptions::parse(opts).unwrap_err().to_string()
    }

    #[test]
    fn rejects_bad_options() {
        let cases: &[(&[&str], &str)] = &[
            (&[], "no tracker input options specified"),
            (&["file:/iabxfdoabs22do2b"], "invalid Tracker input file: /iabxfdoabs22do2b"),
            (&["file:"], "empty key or value passed: key: >file< value: ><"),
            (&[":"], "empty key or value passed: key: >< value: ><"),
            (&["format:xml"], "invalid tracker input format specified: XML"),
            (&["shmoo:hello"], "invalid input-tracker option key: shmoo"),
            (&["A"], "invalid input-tracker option: A"),
            (&["a:b:c"], "invalid input-tracker option: a:b:c"),
            (&["file:stdin"], "could not set up input source: no input format specified"),
            (&["help"], "user has requested help text"),
        ];
        for (opts, want) in cases {
            assert_eq!(err(opts), *want, "options {opts:?}");
        }
    }

    #[test]
    fn accepts_stdin_and_files() {
        let opts = InputOptions::parse(&["file:stdin", "format:JSON"]).unwrap();
        assert_eq!(opts, InputOptions { source: InputSource::Stdin, format: InputFormat::Json });

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let opts = InputOptions::parse(&[format!("file:{path}"), "format:json".to_string()]).unwrap();
        assert_eq!(opts.source, InputSource::File(PathBuf::from(&path)));
    }
}
