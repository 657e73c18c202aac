mod dataset;
mod deboiler;
mod document;
mod error;
mod json_lines;
mod options;
mod page;
mod signature;
mod text;
mod transform;
mod worker;

use {
  document::Document,
  ego_tree::{iter::Edge, NodeId, NodeRef},
  html5ever::serialize::{
    serialize, Serialize as HtmlSerialize, SerializeOpts, Serializer,
    TraversalScope,
  },
  page::ParsedPage,
  regex::Regex,
  scraper::{Html, Node},
  serde::{Deserialize, Serialize},
  std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Read, Seek, SeekFrom},
    mem,
    ops::Range,
    panic,
    path::{Path, PathBuf},
    sync::{
      atomic::{AtomicUsize, Ordering},
      mpsc::{sync_channel, Receiver, SyncSender},
      Arc, LazyLock,
    },
    thread,
    time::Instant,
  },
  tracing::{debug, info, warn},
  worker::ChunkOutcome,
  xxhash_rust::xxh3::xxh3_128,
};

pub use crate::{
  dataset::{Dataset, MemoryDataset, RawPage},
  deboiler::Deboiler,
  error::Error,
  json_lines::{JsonLinesDataset, JsonLinesOptions, JsonLinesOptionsBuilder},
  options::{
    DeboilerOptions, DeboilerOptionsBuilder, Mode, DEFAULT_CANDIDATE_TAGS,
  },
  page::CleanedPage,
  signature::Signature,
  transform::Transform,
};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
