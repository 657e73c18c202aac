use super::*;

/// Discovers the boilerplate subtrees of one crawled domain and strips
/// them from every page.
///
/// `fit` walks adjacent pairs of the URL-sorted page list and accumulates
/// the signatures shared within each pair; `transform` then removes every
/// candidate subtree whose signature was accumulated.
pub struct Deboiler {
  options: DeboilerOptions,
  boilerplate: HashSet<Signature>,
  cache: HashMap<String, ParsedPage>,
  fitted: bool,
}

impl Deboiler {
  pub fn new(options: DeboilerOptions) -> Self {
    Self {
      options,
      boilerplate: HashSet::new(),
      cache: HashMap::new(),
      fitted: false,
    }
  }

  pub fn options(&self) -> &DeboilerOptions {
    &self.options
  }

  /// The frozen domain boilerplate set. Empty until `fit` has run.
  pub fn boilerplate(&self) -> &HashSet<Signature> {
    &self.boilerplate
  }

  /// Identifies the boilerplate subtrees shared across the dataset.
  ///
  /// Datasets of fewer than two pages yield an empty boilerplate set.
  ///
  /// # Errors
  ///
  /// Returns an error when a worker thread panics. Unreadable records are
  /// logged and skipped instead.
  pub fn fit(&mut self, dataset: &dyn Dataset) -> Result<&mut Self> {
    let started = Instant::now();

    self.boilerplate.clear();
    self.cache.clear();

    let urls = dataset.urls();

    let outcome = if urls.len() < 2 {
      ChunkOutcome::default()
    } else {
      let index = urls
        .iter()
        .enumerate()
        .map(|(position, url)| (url.clone(), position))
        .collect::<HashMap<String, usize>>();

      let mut sorted = urls.clone();
      sorted.sort_unstable();

      match self.options.mode {
        Mode::Performance => self.fit_cached(dataset, &urls, &sorted),
        Mode::Memory { workers } => {
          Self::fit_streaming(dataset, &sorted, &index, &self.options, workers)?
        }
      }
    };

    let discovered = outcome.occurrences.len();

    self.boilerplate = outcome
      .occurrences
      .into_iter()
      .filter(|(_, count)| *count >= self.options.min_occurrences)
      .map(|(signature, _)| signature)
      .collect();

    let below_threshold = discovered - self.boilerplate.len();

    if below_threshold > 0 {
      debug!(
        count = below_threshold,
        "shared subtrees below the occurrence threshold"
      );
    }

    if outcome.similar_pairs > 0 {
      debug!(
        count = outcome.similar_pairs,
        "near-duplicate pairs excluded from discovery"
      );
    }

    if !outcome.skipped_pages.is_empty() {
      warn!(
        count = outcome.skipped_pages.len(),
        "unreadable pages contributed no signatures"
      );
    }

    info!(
      domain = self.options.domain_label(),
      boilerplate = self.boilerplate.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "boilerplate discovery finished"
    );

    self.fitted = true;

    Ok(self)
  }

  /// Streams cleaned pages for the whole dataset, in its natural order.
  ///
  /// # Errors
  ///
  /// Returns `Error::NotFitted` when called before `fit`.
  pub fn transform(&mut self, dataset: Arc<dyn Dataset>) -> Result<Transform> {
    if !self.fitted {
      return Err(Error::NotFitted);
    }

    let boilerplate = Arc::new(self.boilerplate.clone());
    let candidate_tags = Arc::new(self.options.candidate_tags.clone());
    let domain = self.options.domain_label().to_string();

    match self.options.mode {
      Mode::Performance => Ok(Transform::cached(
        dataset,
        mem::take(&mut self.cache),
        boilerplate,
        candidate_tags,
        domain,
      )),
      Mode::Memory { workers } => {
        let workers = workers.clamp(1, dataset.len().max(1));

        if workers == 1 {
          Ok(Transform::sequential(
            dataset,
            boilerplate,
            candidate_tags,
            domain,
          ))
        } else {
          Ok(Transform::parallel(
            dataset,
            boilerplate,
            candidate_tags,
            domain,
            workers,
            self.options.preserve_order,
          ))
        }
      }
    }
  }

  // Memory mode: slide a two-page window over each chunk of the sorted
  // url list, keeping only signature sets in memory.
  fn fit_streaming(
    dataset: &dyn Dataset,
    sorted: &[String],
    index: &HashMap<String, usize>,
    options: &DeboilerOptions,
    workers: usize,
  ) -> Result<ChunkOutcome> {
    let ranges = worker::partition(sorted.len() - 1, workers.max(1));

    if ranges.len() <= 1 {
      return Ok(Self::fit_chunk(dataset, sorted, index, options));
    }

    thread::scope(|scope| {
      let handles = ranges
        .iter()
        .map(|range| {
          // Pair p compares pages p and p + 1, so the chunk of pairs
          // range.start..range.end needs pages range.start..=range.end.
          // The overlap assigns each boundary pair to exactly one chunk.
          let chunk = &sorted[range.start..range.end + 1];

          // A panic is caught inside the thread; the scope would
          // otherwise re-raise it on exit instead of returning an error.
          scope.spawn(move || {
            panic::catch_unwind(panic::AssertUnwindSafe(|| {
              Self::fit_chunk(dataset, chunk, index, options)
            }))
            .map_err(|_| Error::Worker { phase: "fit" })
          })
        })
        .collect::<Vec<_>>();

      let mut merged = ChunkOutcome::default();

      for handle in handles {
        merged.absorb(
          handle.join().map_err(|_| Error::Worker { phase: "fit" })??,
        );
      }

      Ok(merged)
    })
  }

  fn fit_chunk(
    dataset: &dyn Dataset,
    urls: &[String],
    index: &HashMap<String, usize>,
    options: &DeboilerOptions,
  ) -> ChunkOutcome {
    let mut outcome = ChunkOutcome::default();

    if urls.len() < 2 {
      return outcome;
    }

    let mut previous =
      Self::representation(dataset, index, &urls[0], options, &mut outcome)
        .map(|signatures| (&urls[0], signatures));

    for url in &urls[1..] {
      let current =
        Self::representation(dataset, index, url, options, &mut outcome)
          .map(|signatures| (url, signatures));

      if let (Some((primary, a)), Some((secondary, b))) =
        (&previous, &current)
      {
        let (shared, too_similar) =
          shared_signatures(a, b, options.iou_max);

        if too_similar {
          outcome.similar_pairs += 1;

          debug!(
            primary = primary.as_str(),
            secondary = secondary.as_str(),
            "skipping near-duplicate pair"
          );
        } else {
          for signature in shared {
            *outcome.occurrences.entry(signature).or_insert(0) += 1;
          }
        }
      }

      previous = current;
    }

    outcome
  }

  fn representation(
    dataset: &dyn Dataset,
    index: &HashMap<String, usize>,
    url: &str,
    options: &DeboilerOptions,
    outcome: &mut ChunkOutcome,
  ) -> Option<HashSet<Signature>> {
    let &position = index.get(url)?;

    match dataset.get(position) {
      Ok(raw) => Some(
        ParsedPage::parse(&raw.url, &raw.content, &options.candidate_tags)
          .signatures,
      ),
      Err(error) => {
        warn!(url, %error, "skipping unreadable page");
        outcome.skipped_pages.insert(url.to_string());
        None
      }
    }
  }

  // Performance mode: parse every page once, keep the DOMs for
  // `transform`, and compare adjacent pairs out of the cache.
  fn fit_cached(
    &mut self,
    dataset: &dyn Dataset,
    urls: &[String],
    sorted: &[String],
  ) -> ChunkOutcome {
    let mut outcome = ChunkOutcome::default();

    for (position, url) in urls.iter().enumerate() {
      match dataset.get(position) {
        Ok(raw) => {
          self.cache.insert(
            url.clone(),
            ParsedPage::parse(&raw.url, &raw.content, &self.options.candidate_tags),
          );
        }
        Err(error) => {
          warn!(url = url.as_str(), %error, "skipping unreadable page");
          outcome.skipped_pages.insert(url.clone());
        }
      }
    }

    for pair in sorted.windows(2) {
      let [primary, secondary] = pair else {
        continue;
      };

      let (Some(a), Some(b)) =
        (self.cache.get(primary), self.cache.get(secondary))
      else {
        continue;
      };

      let (shared, too_similar) =
        shared_signatures(&a.signatures, &b.signatures, self.options.iou_max);

      if too_similar {
        outcome.similar_pairs += 1;

        debug!(
          primary = primary.as_str(),
          secondary = secondary.as_str(),
          "skipping near-duplicate pair"
        );
      } else {
        for signature in shared {
          *outcome.occurrences.entry(signature).or_insert(0) += 1;
        }
      }
    }

    outcome
  }
}

/// The signatures two pages have in common, guarded against
/// near-duplicate pages.
///
/// When the intersection-over-union of the two signature sets exceeds
/// `iou_max` the pages are considered near-identical and the pair is
/// reported as too similar with an empty shared set; marking the whole
/// shared template of a duplicated page as boilerplate would strip its
/// content entirely. An empty union has an IoU of zero.
pub(crate) fn shared_signatures(
  a: &HashSet<Signature>,
  b: &HashSet<Signature>,
  iou_max: f64,
) -> (HashSet<Signature>, bool) {
  let shared = a.intersection(b).copied().collect::<HashSet<Signature>>();

  let union = a.len() + b.len() - shared.len();

  let iou = if union == 0 {
    0.0
  } else {
    shared.len() as f64 / union as f64
  };

  if iou > iou_max {
    (HashSet::new(), true)
  } else {
    (shared, false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn signatures(values: Range<u128>) -> HashSet<Signature> {
    values.map(Signature).collect()
  }

  #[test]
  fn identical_signature_sets_are_rejected_as_near_duplicates() {
    let a = signatures(0..10);

    let (shared, too_similar) = shared_signatures(&a, &a.clone(), 0.9);

    assert!(too_similar);
    assert_eq!(shared, HashSet::new());
  }

  #[test]
  fn a_pair_exactly_at_the_threshold_is_kept() {
    let a = signatures(0..10);
    let b = signatures(0..9);

    // 9 shared out of 10 in the union
    let (shared, too_similar) = shared_signatures(&a, &b, 0.9);

    assert!(!too_similar);
    assert_eq!(shared, signatures(0..9));
  }

  #[test]
  fn empty_sides_share_nothing_without_counting_as_duplicates() {
    let empty = HashSet::new();
    let full = signatures(0..4);

    let (shared, too_similar) = shared_signatures(&empty, &full, 0.9);

    assert!(!too_similar);
    assert_eq!(shared, HashSet::new());

    let (shared, too_similar) = shared_signatures(&empty, &empty.clone(), 0.9);

    assert!(!too_similar);
    assert_eq!(shared, HashSet::new());
  }

  #[test]
  fn disjoint_sets_share_nothing() {
    let (shared, too_similar) =
      shared_signatures(&signatures(0..4), &signatures(4..8), 0.9);

    assert!(!too_similar);
    assert_eq!(shared, HashSet::new());
  }
}
