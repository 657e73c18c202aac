use super::*;

/// A parsed page: its DOM plus the eager set of candidate signatures.
///
/// The signature set is all pair comparison needs; the DOM is kept around
/// so performance mode can clean without re-parsing.
pub(crate) struct ParsedPage {
  pub(crate) url: String,
  pub(crate) html: Html,
  pub(crate) signatures: HashSet<Signature>,
}

impl ParsedPage {
  /// Parsing is total: undecodable bytes are replaced and malformed
  /// markup is repaired, so real-world crawl output never fails here.
  pub(crate) fn parse(
    url: &str,
    content: &[u8],
    candidate_tags: &HashSet<String>,
  ) -> Self {
    let html = Html::parse_document(&String::from_utf8_lossy(content));

    let signatures = Document::new(&html)
      .candidates(candidate_tags)
      .into_iter()
      .map(|(_, signature)| signature)
      .collect();

    Self {
      url: url.to_string(),
      html,
      signatures,
    }
  }

  /// Removes every candidate subtree whose signature is in the domain
  /// boilerplate set and extracts the output record.
  ///
  /// Title, raw text and breadcrumbs come from the page as crawled;
  /// cleaned text, headings and lists from the page after removal.
  /// Matches are collected before any node is detached, so nested
  /// removals cannot invalidate the traversal.
  pub(crate) fn clean(
    mut self,
    boilerplate: &HashSet<Signature>,
    candidate_tags: &HashSet<String>,
  ) -> CleanedPage {
    let document = Document::new(&self.html);

    let title = document.title();
    let text = document.text();
    let breadcrumbs = document.breadcrumbs();

    let matches = document
      .candidates(candidate_tags)
      .into_iter()
      .filter(|(_, signature)| boilerplate.contains(signature))
      .map(|(id, _)| id)
      .collect::<Vec<NodeId>>();

    for id in matches {
      // Detaching a node whose ancestor is already detached is a no-op.
      if let Some(mut node) = self.html.tree.get_mut(id) {
        node.detach();
      }
    }

    let document = Document::new(&self.html);

    CleanedPage {
      url: self.url,
      title,
      text,
      cleaned_text: document.text(),
      cleaned_html: document.html(),
      headings: document.headings(),
      lists: document.lists(),
      breadcrumbs,
    }
  }
}

/// Everything extracted from one page by `transform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedPage {
  pub url: String,
  pub title: String,
  pub text: String,
  pub cleaned_text: String,
  pub cleaned_html: String,
  pub headings: String,
  pub lists: String,
  pub breadcrumbs: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn default_tags() -> HashSet<String> {
    DEFAULT_CANDIDATE_TAGS
      .iter()
      .map(ToString::to_string)
      .collect()
  }

  #[test]
  fn cleaning_removes_matching_subtrees_only() {
    let tags = default_tags();

    let page = ParsedPage::parse(
      "https://example.com/a",
      b"<html><head><title>A</title></head><body>\
        <nav><a href='/'>Home</a></nav>\
        <div>article body</div>\
        </body></html>",
      &tags,
    );

    let nav_signature = *ParsedPage::parse(
      "probe",
      b"<html><body><nav><a href='/x'>Home</a></nav></body></html>",
      &tags,
    )
    .signatures
    .iter()
    .next()
    .unwrap();

    let boilerplate = HashSet::from([nav_signature]);

    let cleaned = page.clean(&boilerplate, &tags);

    assert_eq!(cleaned.title, "A");
    assert_eq!(cleaned.text, "Home\narticle body");
    assert_eq!(cleaned.cleaned_text, "article body");
    assert!(!cleaned.cleaned_html.contains("<nav>"));
    assert!(cleaned.cleaned_html.contains("<div>article body</div>"));
  }

  #[test]
  fn cleaning_with_an_empty_set_changes_nothing() {
    let tags = default_tags();

    let page = ParsedPage::parse(
      "https://example.com/a",
      b"<html><body><div>kept</div></body></html>",
      &tags,
    );

    let cleaned = page.clean(&HashSet::new(), &tags);

    assert_eq!(cleaned.text, cleaned.cleaned_text);
    assert!(cleaned.cleaned_html.contains("<div>kept</div>"));
  }
}
