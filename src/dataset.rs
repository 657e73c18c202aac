use super::*;

/// A crawled page before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
  pub url: String,
  pub content: Vec<u8>,
}

impl RawPage {
  pub fn new(url: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
    Self {
      url: url.into(),
      content: content.into(),
    }
  }
}

/// Random access to the crawled pages of one domain.
///
/// `urls` must be index-aligned with `get`: `urls()[i]` is the url of the
/// record `get(i)` returns. Implementations are shared read-only across
/// worker threads.
pub trait Dataset: Send + Sync {
  fn len(&self) -> usize;

  fn get(&self, index: usize) -> Result<RawPage>;

  /// All urls in natural (index) order, without loading page bodies.
  fn urls(&self) -> Vec<String>;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// An in-memory dataset, mostly used in tests and small batches.
///
/// Pages with a repeated url keep the last occurrence, matching the
/// deduplication the JSON-lines index performs.
pub struct MemoryDataset {
  pages: Vec<RawPage>,
}

impl MemoryDataset {
  pub fn new(pages: Vec<RawPage>) -> Self {
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut deduplicated: Vec<RawPage> = Vec::with_capacity(pages.len());

    for page in pages {
      match by_url.get(&page.url) {
        Some(&position) => deduplicated[position] = page,
        None => {
          by_url.insert(page.url.clone(), deduplicated.len());
          deduplicated.push(page);
        }
      }
    }

    Self {
      pages: deduplicated,
    }
  }
}

impl Dataset for MemoryDataset {
  fn len(&self) -> usize {
    self.pages.len()
  }

  fn get(&self, index: usize) -> Result<RawPage> {
    self.pages.get(index).cloned().ok_or(Error::OutOfRange {
      index,
      len: self.pages.len(),
    })
  }

  fn urls(&self) -> Vec<String> {
    self.pages.iter().map(|page| page.url.clone()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn urls_preserve_natural_order() {
    let dataset = MemoryDataset::new(vec![
      RawPage::new("https://example.com/z", "<html></html>"),
      RawPage::new("https://example.com/a", "<html></html>"),
    ]);

    assert_eq!(
      dataset.urls(),
      vec!["https://example.com/z", "https://example.com/a"]
    );
  }

  #[test]
  fn duplicate_urls_keep_the_last_record() {
    let dataset = MemoryDataset::new(vec![
      RawPage::new("https://example.com/a", "<p>old</p>"),
      RawPage::new("https://example.com/b", "<p>b</p>"),
      RawPage::new("https://example.com/a", "<p>new</p>"),
    ]);

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.get(0).unwrap().content, b"<p>new</p>");
  }

  #[test]
  fn out_of_range_access_is_an_error() {
    let dataset = MemoryDataset::new(Vec::new());

    assert!(dataset.get(0).is_err());
  }
}
