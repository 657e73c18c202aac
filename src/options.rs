use super::*;

/// Tags whose subtrees are eligible to be boilerplate.
pub const DEFAULT_CANDIDATE_TAGS: [&str; 10] = [
  "aside", "div", "footer", "form", "header", "nav", "navigation", "ol",
  "section", "ul",
];

/// Cache policy for the fit/transform passes.
///
/// Performance mode keeps every parsed DOM in memory between `fit` and
/// `transform` and therefore always runs on a single worker; the variant
/// carries no worker count so the invalid combination cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Memory { workers: usize },
  Performance,
}

impl Default for Mode {
  fn default() -> Self {
    Self::Memory { workers: 1 }
  }
}

#[derive(Debug, Clone)]
pub struct DeboilerOptions {
  pub mode: Mode,
  pub domain: String,
  pub iou_max: f64,
  pub min_occurrences: u32,
  pub candidate_tags: HashSet<String>,
  pub preserve_order: bool,
}

impl Default for DeboilerOptions {
  fn default() -> Self {
    Self {
      mode: Mode::default(),
      domain: String::new(),
      iou_max: 0.9,
      min_occurrences: 1,
      candidate_tags: DEFAULT_CANDIDATE_TAGS
        .iter()
        .map(ToString::to_string)
        .collect(),
      preserve_order: true,
    }
  }
}

impl DeboilerOptions {
  pub fn builder() -> DeboilerOptionsBuilder {
    DeboilerOptionsBuilder::default()
  }

  pub(crate) fn domain_label(&self) -> &str {
    if self.domain.is_empty() {
      "<unnamed domain>"
    } else {
      &self.domain
    }
  }
}

#[derive(Default)]
pub struct DeboilerOptionsBuilder {
  inner: DeboilerOptions,
}

impl DeboilerOptionsBuilder {
  pub fn mode(self, mode: Mode) -> Self {
    Self {
      inner: DeboilerOptions { mode, ..self.inner },
    }
  }

  pub fn domain(self, domain: impl Into<String>) -> Self {
    Self {
      inner: DeboilerOptions {
        domain: domain.into(),
        ..self.inner
      },
    }
  }

  pub fn iou_max(self, iou_max: f64) -> Self {
    Self {
      inner: DeboilerOptions {
        iou_max,
        ..self.inner
      },
    }
  }

  pub fn min_occurrences(self, min_occurrences: u32) -> Self {
    Self {
      inner: DeboilerOptions {
        min_occurrences,
        ..self.inner
      },
    }
  }

  pub fn candidate_tags<I, S>(self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: DeboilerOptions {
        candidate_tags: tags.into_iter().map(Into::into).collect(),
        ..self.inner
      },
    }
  }

  pub fn preserve_order(self, preserve_order: bool) -> Self {
    Self {
      inner: DeboilerOptions {
        preserve_order,
        ..self.inner
      },
    }
  }

  pub fn build(self) -> DeboilerOptions {
    self.inner
  }
}
