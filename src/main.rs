use {
  anyhow::{bail, Context},
  clap::{Parser, ValueEnum},
  deboiler::{
    Dataset, Deboiler, DeboilerOptions, JsonLinesDataset, JsonLinesOptions,
    Mode,
  },
  std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process,
    sync::Arc,
  },
  tracing_subscriber::EnvFilter,
};

#[derive(Clone, Copy, ValueEnum)]
enum ModeArgument {
  /// Re-parse pages during transform, allowing parallel workers
  Memory,
  /// Cache parsed pages between fit and transform, single worker
  Performance,
}

#[derive(Parser)]
#[command(name = "deboiler")]
#[command(
  about = "Strip domain-level boilerplate from a JSON-lines crawl",
  long_about = None
)]
struct Arguments {
  /// Path to the JSON-lines crawl of one domain
  #[arg(value_name = "INPUT")]
  input: PathBuf,

  /// Where to write cleaned pages as JSON lines (default: stdout)
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,

  #[arg(long, value_enum, default_value = "memory")]
  mode: ModeArgument,

  /// Worker threads (memory mode only)
  #[arg(short, long, default_value_t = 1)]
  workers: usize,

  /// Discard page pairs whose signature IoU exceeds this threshold
  #[arg(long, default_value_t = 0.9)]
  iou_max: f64,

  /// Pairs that must share a subtree before it counts as boilerplate
  #[arg(long, default_value_t = 1)]
  min_occurrences: u32,

  /// Domain label used in diagnostics
  #[arg(long, default_value = "")]
  domain: String,

  /// Emit cleaned pages in completion order instead of dataset order
  #[arg(long)]
  unordered: bool,

  /// Record field holding the page url
  #[arg(long, default_value = "url")]
  url_key: String,

  /// Record field holding the raw page html
  #[arg(long, default_value = "html")]
  content_key: String,

  /// Record field holding the http status; 2xx records are kept
  #[arg(long, default_value = "status")]
  status_key: String,
}

impl Arguments {
  fn run(self) -> Result {
    let mode = match self.mode {
      ModeArgument::Memory => Mode::Memory {
        workers: self.workers,
      },
      ModeArgument::Performance => {
        if self.workers > 1 {
          bail!("performance mode caches parsed pages and runs a single worker");
        }

        Mode::Performance
      }
    };

    let dataset_options = JsonLinesOptions::builder()
      .url_key(self.url_key)
      .content_key(self.content_key)
      .status_key(Some(self.status_key))
      .build();

    let dataset: Arc<dyn Dataset> = Arc::new(
      JsonLinesDataset::open_with(&self.input, dataset_options)
        .with_context(|| {
          format!("failed to index crawl file `{}`", self.input.display())
        })?,
    );

    let options = DeboilerOptions::builder()
      .mode(mode)
      .domain(self.domain)
      .iou_max(self.iou_max)
      .min_occurrences(self.min_occurrences)
      .preserve_order(!self.unordered)
      .build();

    let mut deboiler = Deboiler::new(options);

    deboiler
      .fit(dataset.as_ref())
      .context("boilerplate discovery failed")?;

    let mut writer: BufWriter<Box<dyn Write>> = match &self.output {
      Some(path) => {
        let file = File::create(path).with_context(|| {
          format!("failed to create output file `{}`", path.display())
        })?;

        BufWriter::new(Box::new(file))
      }
      None => BufWriter::new(Box::new(io::stdout())),
    };

    for page in deboiler.transform(dataset)? {
      let page = page.context("page cleaning failed")?;

      serde_json::to_writer(&mut writer, &page)?;
      writer.write_all(b"\n")?;
    }

    writer.flush()?;

    Ok(())
  }
}

type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  if let Err(error) = Arguments::parse().run() {
    eprintln!("error: {error}");
    process::exit(1);
  }
}
