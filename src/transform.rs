use super::*;

/// A lazy, finite stream of cleaned pages.
///
/// Yields one `CleanedPage` per readable dataset record, in dataset
/// order by default. Dropping the stream mid-iteration hangs up the
/// worker channel and joins every cleaner thread.
pub struct Transform {
  inner: Inner,
  deltas: Vec<i64>,
  domain: String,
  started: Instant,
  finished: bool,
}

enum Inner {
  Sequential {
    dataset: Arc<dyn Dataset>,
    boilerplate: Arc<HashSet<Signature>>,
    candidate_tags: Arc<HashSet<String>>,
    next: usize,
  },
  Cached {
    dataset: Arc<dyn Dataset>,
    cache: HashMap<String, ParsedPage>,
    urls: Vec<String>,
    boilerplate: Arc<HashSet<Signature>>,
    candidate_tags: Arc<HashSet<String>>,
    next: usize,
  },
  Parallel {
    receiver: Option<Receiver<(usize, Option<CleanedPage>)>>,
    handles: Vec<thread::JoinHandle<()>>,
    pending: BTreeMap<usize, Option<CleanedPage>>,
    next: usize,
    received: usize,
    expected: usize,
    preserve_order: bool,
    failed: bool,
  },
}

impl Transform {
  pub(crate) fn sequential(
    dataset: Arc<dyn Dataset>,
    boilerplate: Arc<HashSet<Signature>>,
    candidate_tags: Arc<HashSet<String>>,
    domain: String,
  ) -> Self {
    Self::new(
      Inner::Sequential {
        dataset,
        boilerplate,
        candidate_tags,
        next: 0,
      },
      domain,
    )
  }

  pub(crate) fn cached(
    dataset: Arc<dyn Dataset>,
    cache: HashMap<String, ParsedPage>,
    boilerplate: Arc<HashSet<Signature>>,
    candidate_tags: Arc<HashSet<String>>,
    domain: String,
  ) -> Self {
    let urls = dataset.urls();

    Self::new(
      Inner::Cached {
        dataset,
        cache,
        urls,
        boilerplate,
        candidate_tags,
        next: 0,
      },
      domain,
    )
  }

  pub(crate) fn parallel(
    dataset: Arc<dyn Dataset>,
    boilerplate: Arc<HashSet<Signature>>,
    candidate_tags: Arc<HashSet<String>>,
    domain: String,
    workers: usize,
    preserve_order: bool,
  ) -> Self {
    let expected = dataset.len();

    let (receiver, handles) =
      worker::spawn_cleaners(dataset, boilerplate, candidate_tags, workers);

    Self::new(
      Inner::Parallel {
        receiver: Some(receiver),
        handles,
        pending: BTreeMap::new(),
        next: 0,
        received: 0,
        expected,
        preserve_order,
        failed: false,
      },
      domain,
    )
  }

  fn new(inner: Inner, domain: String) -> Self {
    Self {
      inner,
      deltas: Vec::new(),
      domain,
      started: Instant::now(),
      finished: false,
    }
  }

  fn finish(&mut self) {
    if self.finished {
      return;
    }

    self.finished = true;

    let mut deltas = mem::take(&mut self.deltas);

    info!(
      domain = self.domain.as_str(),
      pages = deltas.len(),
      elapsed_ms = self.started.elapsed().as_millis() as u64,
      "page cleaning finished"
    );

    if !deltas.is_empty() {
      info!(
        domain = self.domain.as_str(),
        mean = mean(&deltas),
        median = median(&mut deltas),
        "noise removed per page (characters)"
      );
    }
  }
}

impl Iterator for Transform {
  type Item = Result<CleanedPage>;

  fn next(&mut self) -> Option<Self::Item> {
    let item = self.inner.next_page();

    match &item {
      Some(Ok(page)) => {
        self
          .deltas
          .push(page.text.len() as i64 - page.cleaned_text.len() as i64);
      }
      Some(Err(_)) => {}
      None => self.finish(),
    }

    item
  }
}

impl Drop for Transform {
  fn drop(&mut self) {
    if let Inner::Parallel {
      receiver, handles, ..
    } = &mut self.inner
    {
      // Hanging up the channel makes every blocked sender bail out.
      receiver.take();

      for handle in handles.drain(..) {
        let _ = handle.join();
      }
    }
  }
}

impl Inner {
  fn next_page(&mut self) -> Option<Result<CleanedPage>> {
    match self {
      Self::Sequential {
        dataset,
        boilerplate,
        candidate_tags,
        next,
      } => {
        while *next < dataset.len() {
          let index = *next;
          *next += 1;

          match dataset.get(index) {
            Ok(raw) => {
              let page =
                ParsedPage::parse(&raw.url, &raw.content, candidate_tags)
                  .clean(boilerplate, candidate_tags);

              return Some(Ok(page));
            }
            Err(error) => {
              warn!(index, %error, "skipping unreadable record");
            }
          }
        }

        None
      }
      Self::Cached {
        dataset,
        cache,
        urls,
        boilerplate,
        candidate_tags,
        next,
      } => {
        while *next < urls.len() {
          let index = *next;
          *next += 1;

          // A cache miss (e.g. a second transform pass) falls back to
          // re-parsing the record.
          let page = match cache.remove(&urls[index]) {
            Some(page) => page,
            None => match dataset.get(index) {
              Ok(raw) => {
                ParsedPage::parse(&raw.url, &raw.content, candidate_tags)
              }
              Err(error) => {
                warn!(index, %error, "skipping unreadable record");
                continue;
              }
            },
          };

          return Some(Ok(page.clean(boilerplate, candidate_tags)));
        }

        None
      }
      Self::Parallel {
        receiver,
        pending,
        next,
        received,
        expected,
        preserve_order,
        failed,
        ..
      } => {
        if *failed {
          return None;
        }

        loop {
          if *preserve_order {
            match pending.remove(next) {
              Some(Some(page)) => {
                *next += 1;
                return Some(Ok(page));
              }
              Some(None) => {
                *next += 1;
                continue;
              }
              None => {}
            }
          }

          let Some(channel) = receiver.as_ref() else {
            return None;
          };

          match channel.recv() {
            Ok((index, page)) => {
              *received += 1;

              if *preserve_order {
                pending.insert(index, page);
              } else {
                match page {
                  Some(page) => return Some(Ok(page)),
                  None => continue,
                }
              }
            }
            Err(_) => {
              // All senders are gone; anything still missing was lost
              // to a dead worker.
              if *received < *expected {
                *failed = true;
                return Some(Err(Error::Worker { phase: "transform" }));
              }

              return None;
            }
          }
        }
      }
    }
  }
}

fn mean(values: &[i64]) -> f64 {
  values.iter().sum::<i64>() as f64 / values.len() as f64
}

fn median(values: &mut [i64]) -> f64 {
  values.sort_unstable();

  let middle = values.len() / 2;

  if values.len() % 2 == 0 {
    (values[middle - 1] + values[middle]) as f64 / 2.0
  } else {
    values[middle] as f64
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn mean_and_median_of_odd_sized_samples() {
    let mut values = vec![5, 1, 3];

    assert_eq!(mean(&values), 3.0);
    assert_eq!(median(&mut values), 3.0);
  }

  #[test]
  fn median_of_even_sized_samples_averages_the_middle() {
    let mut values = vec![4, 1, 3, 2];

    assert_eq!(median(&mut values), 2.5);
  }
}
