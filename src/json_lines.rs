use super::*;

/// Field names and filtering for a JSON-lines crawl file.
///
/// Records are kept when the status field (if configured) is 2xx, the
/// content-type field (if configured) equals `text/html`, and the url and
/// content fields are present strings.
#[derive(Debug, Clone)]
pub struct JsonLinesOptions {
  pub url_key: String,
  pub content_key: String,
  pub status_key: Option<String>,
  pub content_type_key: Option<String>,
}

impl Default for JsonLinesOptions {
  fn default() -> Self {
    Self {
      url_key: "url".to_string(),
      content_key: "html".to_string(),
      status_key: Some("status".to_string()),
      content_type_key: None,
    }
  }
}

impl JsonLinesOptions {
  pub fn builder() -> JsonLinesOptionsBuilder {
    JsonLinesOptionsBuilder::default()
  }
}

#[derive(Default)]
pub struct JsonLinesOptionsBuilder {
  inner: JsonLinesOptions,
}

impl JsonLinesOptionsBuilder {
  pub fn url_key(self, url_key: impl Into<String>) -> Self {
    Self {
      inner: JsonLinesOptions {
        url_key: url_key.into(),
        ..self.inner
      },
    }
  }

  pub fn content_key(self, content_key: impl Into<String>) -> Self {
    Self {
      inner: JsonLinesOptions {
        content_key: content_key.into(),
        ..self.inner
      },
    }
  }

  pub fn status_key(self, status_key: Option<String>) -> Self {
    Self {
      inner: JsonLinesOptions {
        status_key,
        ..self.inner
      },
    }
  }

  pub fn content_type_key(self, content_type_key: Option<String>) -> Self {
    Self {
      inner: JsonLinesOptions {
        content_type_key,
        ..self.inner
      },
    }
  }

  pub fn build(self) -> JsonLinesOptions {
    self.inner
  }
}

struct IndexEntry {
  url: String,
  offset: u64,
  length: usize,
}

/// A JSON-lines crawl file with one record per line.
///
/// An offset index is built once at construction; every `get` opens its
/// own file handle and seeks, so worker threads never share a reader.
pub struct JsonLinesDataset {
  path: PathBuf,
  options: JsonLinesOptions,
  entries: Vec<IndexEntry>,
}

impl JsonLinesDataset {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, JsonLinesOptions::default())
  }

  pub fn open_with(
    path: impl AsRef<Path>,
    options: JsonLinesOptions,
  ) -> Result<Self> {
    let path = path.as_ref().to_path_buf();

    let file = File::open(&path).map_err(|source| Error::Io {
      path: path.clone(),
      source,
    })?;

    let mut reader = BufReader::new(file);
    let mut entries: Vec<IndexEntry> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut buffer = String::new();
    let mut offset = 0u64;
    let mut line_number = 0usize;

    loop {
      buffer.clear();

      let length = reader.read_line(&mut buffer).map_err(|source| {
        Error::Io {
          path: path.clone(),
          source,
        }
      })?;

      if length == 0 {
        break;
      }

      line_number += 1;

      match serde_json::from_str::<serde_json::Value>(&buffer) {
        Ok(record) => {
          if let Some(url) = Self::accepted_url(&record, &options) {
            let entry = IndexEntry {
              url: url.to_string(),
              offset,
              length,
            };

            // A recrawled url replaces its earlier record.
            match by_url.get(url) {
              Some(&position) => entries[position] = entry,
              None => {
                by_url.insert(url.to_string(), entries.len());
                entries.push(entry);
              }
            }
          }
        }
        Err(error) => {
          warn!(line = line_number, %error, "skipping malformed json line");
        }
      }

      offset += length as u64;
    }

    Ok(Self {
      path,
      options,
      entries,
    })
  }

  fn accepted_url<'r>(
    record: &'r serde_json::Value,
    options: &JsonLinesOptions,
  ) -> Option<&'r str> {
    let url = record.get(&options.url_key)?.as_str()?;

    record.get(&options.content_key)?.as_str()?;

    if let Some(key) = &options.status_key {
      let status = record.get(key)?.as_i64()?;

      if !(200..300).contains(&status) {
        return None;
      }
    }

    if let Some(key) = &options.content_type_key {
      if record.get(key)?.as_str()? != "text/html" {
        return None;
      }
    }

    Some(url)
  }
}

impl Dataset for JsonLinesDataset {
  fn len(&self) -> usize {
    self.entries.len()
  }

  fn get(&self, index: usize) -> Result<RawPage> {
    let entry = self.entries.get(index).ok_or(Error::OutOfRange {
      index,
      len: self.entries.len(),
    })?;

    let mut file = File::open(&self.path).map_err(|source| Error::Io {
      path: self.path.clone(),
      source,
    })?;

    file
      .seek(SeekFrom::Start(entry.offset))
      .map_err(|source| Error::Io {
        path: self.path.clone(),
        source,
      })?;

    let mut buffer = vec![0u8; entry.length];

    file.read_exact(&mut buffer).map_err(|source| Error::Io {
      path: self.path.clone(),
      source,
    })?;

    let record: serde_json::Value = serde_json::from_slice(&buffer)
      .map_err(|source| Error::MalformedRecord { index, source })?;

    let url = record
      .get(&self.options.url_key)
      .and_then(serde_json::Value::as_str)
      .ok_or_else(|| Error::MissingField {
        index,
        field: self.options.url_key.clone(),
      })?;

    let content = record
      .get(&self.options.content_key)
      .and_then(serde_json::Value::as_str)
      .ok_or_else(|| Error::MissingField {
        index,
        field: self.options.content_key.clone(),
      })?;

    Ok(RawPage::new(url, content))
  }

  fn urls(&self) -> Vec<String> {
    self.entries.iter().map(|entry| entry.url.clone()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use {pretty_assertions::assert_eq, std::fs};

  fn fixture(name: &str, lines: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
      "deboiler-{}-{}.jsonl",
      std::process::id(),
      name
    ));

    fs::write(&path, lines.join("\n") + "\n").unwrap();

    path
  }

  #[test]
  fn index_filters_and_survives_malformed_lines() {
    let path = fixture(
      "filter",
      &[
        r#"{"url": "https://a.test/1", "html": "<p>one</p>", "status": 200}"#,
        r#"{"url": "https://a.test/2", "html": "<p>gone</p>", "status": 404}"#,
        "{ this is not json",
        r#"{"url": "https://a.test/3", "html": "<p>three</p>", "status": 200}"#,
      ],
    );

    let dataset = JsonLinesDataset::open(&path).unwrap();

    assert_eq!(dataset.urls(), vec!["https://a.test/1", "https://a.test/3"]);

    fs::remove_file(path).ok();
  }

  #[test]
  fn records_round_trip_through_the_offset_index() {
    let path = fixture(
      "roundtrip",
      &[
        r#"{"url": "https://a.test/1", "html": "<p>one</p>", "status": 200}"#,
        r#"{"url": "https://a.test/2", "html": "<p>two</p>", "status": 204}"#,
      ],
    );

    let dataset = JsonLinesDataset::open(&path).unwrap();

    let page = dataset.get(1).unwrap();

    assert_eq!(page.url, "https://a.test/2");
    assert_eq!(page.content, b"<p>two</p>");

    fs::remove_file(path).ok();
  }

  #[test]
  fn duplicate_urls_keep_the_last_record() {
    let path = fixture(
      "duplicates",
      &[
        r#"{"url": "https://a.test/1", "html": "<p>old</p>", "status": 200}"#,
        r#"{"url": "https://a.test/1", "html": "<p>new</p>", "status": 200}"#,
      ],
    );

    let dataset = JsonLinesDataset::open(&path).unwrap();

    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.get(0).unwrap().content, b"<p>new</p>");

    fs::remove_file(path).ok();
  }

  #[test]
  fn field_names_are_configurable() {
    let path = fixture(
      "fields",
      &[
        r#"{"page": "https://a.test/1", "body": "<p>one</p>", "kind": "text/html"}"#,
        r#"{"page": "https://a.test/2", "body": "<p>pdf</p>", "kind": "application/pdf"}"#,
      ],
    );

    let options = JsonLinesOptions::builder()
      .url_key("page")
      .content_key("body")
      .status_key(None)
      .content_type_key(Some("kind".to_string()))
      .build();

    let dataset = JsonLinesDataset::open_with(&path, options).unwrap();

    assert_eq!(dataset.urls(), vec!["https://a.test/1"]);
    assert_eq!(dataset.get(0).unwrap().content, b"<p>one</p>");

    fs::remove_file(path).ok();
  }
}
