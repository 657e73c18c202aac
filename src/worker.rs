use super::*;

/// What one fit worker learned from its chunk of adjacent pairs.
///
/// Skipped pages are keyed by url: a boundary page belongs to two
/// chunks, so merging outcomes must not count it twice.
#[derive(Debug, Default)]
pub(crate) struct ChunkOutcome {
  pub(crate) occurrences: HashMap<Signature, u32>,
  pub(crate) similar_pairs: usize,
  pub(crate) skipped_pages: HashSet<String>,
}

impl ChunkOutcome {
  pub(crate) fn absorb(&mut self, other: Self) {
    for (signature, count) in other.occurrences {
      *self.occurrences.entry(signature).or_insert(0) += count;
    }

    self.similar_pairs += other.similar_pairs;
    self.skipped_pages.extend(other.skipped_pages);
  }
}

/// Splits `0..count` into at most `parts` contiguous, near-even,
/// non-empty ranges.
pub(crate) fn partition(count: usize, parts: usize) -> Vec<Range<usize>> {
  if count == 0 {
    return Vec::new();
  }

  let parts = parts.clamp(1, count);
  let base = count / parts;
  let extra = count % parts;

  let mut ranges = Vec::with_capacity(parts);
  let mut start = 0;

  for part in 0..parts {
    let length = base + usize::from(part < extra);
    ranges.push(start..start + length);
    start += length;
  }

  ranges
}

/// Spawns the cleaner pool for a parallel transform.
///
/// Workers claim record indices from a shared cursor, parse and clean
/// each page locally, and push `(index, page)` over a bounded channel.
/// A record that cannot be read is reported as `None` so the receiver
/// can keep its index accounting. Workers stop as soon as the receiver
/// hangs up.
pub(crate) fn spawn_cleaners(
  dataset: Arc<dyn Dataset>,
  boilerplate: Arc<HashSet<Signature>>,
  candidate_tags: Arc<HashSet<String>>,
  workers: usize,
) -> (
  Receiver<(usize, Option<CleanedPage>)>,
  Vec<thread::JoinHandle<()>>,
) {
  let len = dataset.len();
  let cursor = Arc::new(AtomicUsize::new(0));
  let (sender, receiver) = sync_channel(workers * 2);

  let handles = (0..workers)
    .map(|_| {
      let dataset = Arc::clone(&dataset);
      let boilerplate = Arc::clone(&boilerplate);
      let candidate_tags = Arc::clone(&candidate_tags);
      let cursor = Arc::clone(&cursor);
      let sender: SyncSender<(usize, Option<CleanedPage>)> = sender.clone();

      thread::spawn(move || loop {
        let index = cursor.fetch_add(1, Ordering::Relaxed);

        if index >= len {
          break;
        }

        let cleaned = match dataset.get(index) {
          Ok(raw) => Some(
            ParsedPage::parse(&raw.url, &raw.content, &candidate_tags)
              .clean(&boilerplate, &candidate_tags),
          ),
          Err(error) => {
            warn!(index, %error, "skipping unreadable record");
            None
          }
        };

        if sender.send((index, cleaned)).is_err() {
          break;
        }
      })
    })
    .collect();

  (receiver, handles)
}
