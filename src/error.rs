use super::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("`transform` requires a fitted boilerplate set; call `fit` first")]
  NotFitted,
  #[error("failed to read dataset file `{}`", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("malformed record at index {index}")]
  MalformedRecord {
    index: usize,
    #[source]
    source: serde_json::Error,
  },
  #[error("record at index {index} is missing field `{field}`")]
  MissingField { index: usize, field: String },
  #[error("record index {index} is out of range for {len} records")]
  OutOfRange { index: usize, len: usize },
  #[error("a worker thread panicked during {phase}")]
  Worker { phase: &'static str },
}
