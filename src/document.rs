use super::*;

const BREADCRUMB_HINTS: [&str; 3] = ["breadcrumbs", "breadcrumb", "crumb"];

const MAX_BREADCRUMBS_LENGTH: usize = 200;

/// Read-only view over a parsed page.
#[derive(Clone, Copy)]
pub(crate) struct Document<'a> {
  html: &'a Html,
}

impl<'a> Document<'a> {
  pub(crate) fn new(html: &'a Html) -> Self {
    Self { html }
  }

  pub(crate) fn root(&self) -> NodeRef<'a, Node> {
    self.html.tree.root()
  }

  pub(crate) fn html_element(&self) -> Option<NodeRef<'a, Node>> {
    self.root().children().find(
      |child| matches!(child.value(), Node::Element(el) if el.name() == "html"),
    )
  }

  pub(crate) fn body_element(&self) -> Option<NodeRef<'a, Node>> {
    self.html_element()?.children().find(
      |child| matches!(child.value(), Node::Element(el) if el.name() == "body"),
    )
  }

  /// All subtrees eligible to be boilerplate, in document order.
  ///
  /// Nested candidates are all returned; removing an ancestor later
  /// implicitly removes its descendants.
  pub(crate) fn candidates(
    &self,
    tags: &HashSet<String>,
  ) -> Vec<(NodeId, Signature)> {
    self
      .root()
      .descendants()
      .filter(|node| {
        matches!(node.value(), Node::Element(el) if tags.contains(el.name()))
      })
      .map(|node| (node.id(), Signature::of(node)))
      .collect()
  }

  /// Serializes the whole document back to HTML, doctype included.
  pub(crate) fn html(&self) -> String {
    serialize_subtree(self.root(), TraversalScope::ChildrenOnly(None))
  }

  /// Visible text of the page body, normalized.
  pub(crate) fn text(&self) -> String {
    match self.body_element() {
      Some(body) => text::normalize_text(&text::block_text(body)),
      None => String::new(),
    }
  }

  pub(crate) fn title(&self) -> String {
    self
      .html_element()
      .and_then(|html| {
        html.children().find(
          |child| matches!(child.value(), Node::Element(el) if el.name() == "head"),
        )
      })
      .and_then(|head| {
        head.children().find(
          |child| matches!(child.value(), Node::Element(el) if el.name() == "title"),
        )
      })
      .map(|title| text::normalize_text(&text::block_text(title)))
      .unwrap_or_default()
  }

  /// Text of every `h1`-`h6` element, one heading per line.
  pub(crate) fn headings(&self) -> String {
    let headings = self
      .root()
      .descendants()
      .filter(|node| {
        matches!(
          node.value(),
          Node::Element(el) if matches!(
            el.name(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
          )
        )
      })
      .map(|node| text::normalize_text(&text::block_text(node)))
      .filter(|text| !text.is_empty())
      .collect::<Vec<String>>();

    headings.join("\n")
  }

  /// Text of every `ul` and `ol` element.
  pub(crate) fn lists(&self) -> String {
    let lists = self
      .root()
      .descendants()
      .filter(|node| {
        matches!(node.value(), Node::Element(el) if matches!(el.name(), "ul" | "ol"))
      })
      .map(|node| text::block_text(node).trim().to_string())
      .collect::<Vec<String>>();

    text::normalize_text(&lists.join("\n\n"))
  }

  /// The most complete breadcrumb trail on the page.
  ///
  /// Elements are matched by attribute values mentioning a breadcrumb
  /// hint, most specific hint first; the longest extracted text no longer
  /// than `MAX_BREADCRUMBS_LENGTH` wins.
  pub(crate) fn breadcrumbs(&self) -> String {
    for hint in BREADCRUMB_HINTS {
      let matches = self
        .root()
        .descendants()
        .filter(|node| {
          matches!(
            node.value(),
            Node::Element(el) if el.name() != "body"
              && el.attrs.iter().any(|(_, value)| value.contains(hint))
          )
        })
        .collect::<Vec<NodeRef<'a, Node>>>();

      if matches.is_empty() {
        continue;
      }

      return matches
        .into_iter()
        .map(|node| text::normalize_text(&text::block_text(node)))
        .filter(|text| !text.is_empty() && text.len() <= MAX_BREADCRUMBS_LENGTH)
        .max_by_key(String::len)
        .unwrap_or_default();
    }

    String::new()
  }
}

fn serialize_subtree(
  node: NodeRef<'_, Node>,
  traversal_scope: TraversalScope,
) -> String {
  let mut bytes = Vec::new();

  let options = SerializeOpts {
    scripting_enabled: false,
    traversal_scope,
    create_missing_parent: false,
  };

  if serialize(&mut bytes, &Subtree(node), options).is_err() {
    return String::new();
  }

  String::from_utf8(bytes).unwrap_or_default()
}

struct Subtree<'a>(NodeRef<'a, Node>);

impl HtmlSerialize for Subtree<'_> {
  fn serialize<S: Serializer>(
    &self,
    serializer: &mut S,
    traversal_scope: TraversalScope,
  ) -> io::Result<()> {
    let children_only =
      traversal_scope == TraversalScope::ChildrenOnly(None);

    for edge in self.0.traverse() {
      match edge {
        Edge::Open(node) => {
          if node == self.0 && children_only {
            continue;
          }

          match node.value() {
            Node::Doctype(doctype) => {
              serializer.write_doctype(doctype.name())?;
            }
            Node::Comment(comment) => serializer.write_comment(comment)?,
            Node::Text(text) => serializer.write_text(text)?,
            Node::ProcessingInstruction(instruction) => {
              serializer.write_processing_instruction(
                &instruction.target,
                &instruction.data,
              )?;
            }
            Node::Element(element) => {
              serializer.start_elem(
                element.name.clone(),
                element.attrs.iter().map(|(name, value)| (name, &value[..])),
              )?;
            }
            _ => {}
          }
        }
        Edge::Close(node) => {
          if node == self.0 && children_only {
            continue;
          }

          if let Some(element) = node.value().as_element() {
            serializer.end_elem(element.name.clone())?;
          }
        }
      }
    }

    Ok(())
  }
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
  fn candidates_are_yielded_in_document_order_with_nesting() {
    let html = Html::parse_document(
      "<body><header><nav>menu</nav></header><div>content</div></body>",
    );

    let document = Document::new(&html);

    let names = document
      .candidates(&default_tags())
      .into_iter()
      .map(|(id, _)| {
        html.tree.get(id).unwrap().value().as_element().unwrap().name().to_string()
      })
      .collect::<Vec<String>>();

    assert_eq!(names, vec!["header", "nav", "div"]);
  }

  #[test]
  fn title_is_extracted_from_the_head() {
    let html = Html::parse_document(
      "<html><head><title> Acme  Widgets </title></head><body></body></html>",
    );

    assert_eq!(Document::new(&html).title(), "Acme Widgets");
  }

  #[test]
  fn headings_are_collected_in_order() {
    let html = Html::parse_document(
      "<body><h1>Top</h1><p>text</p><h2>Sub</h2><h3></h3></body>",
    );

    assert_eq!(Document::new(&html).headings(), "Top\nSub");
  }

  #[test]
  fn lists_are_collected() {
    let html = Html::parse_document(
      "<body><ul><li>a</li><li>b</li></ul><ol><li>c</li></ol></body>",
    );

    assert_eq!(Document::new(&html).lists(), "* a\n* b\n* c");
  }

  #[test]
  fn breadcrumbs_prefer_the_most_specific_hint() {
    let html = Html::parse_document(
      "<body>\
       <div class='crumb'>Home / Misc</div>\
       <div class='site-breadcrumbs'>Home / Products / Widgets</div>\
       </body>",
    );

    assert_eq!(
      Document::new(&html).breadcrumbs(),
      "Home / Products / Widgets"
    );
  }

  #[test]
  fn oversized_breadcrumbs_are_ignored() {
    let long = "x".repeat(300);

    let html = Html::parse_document(&format!(
      "<body><div class='breadcrumbs'>{long}</div></body>"
    ));

    assert_eq!(Document::new(&html).breadcrumbs(), "");
  }

  #[test]
  fn serialization_preserves_document_structure() {
    let html = Html::parse_document(
      "<!DOCTYPE html><html><head></head>\
       <body><p class='x'>hi<br>there</p><!-- note --></body></html>",
    );

    let output = Document::new(&html).html();

    assert!(output.starts_with("<!DOCTYPE html>"));
    assert!(output.contains("<p class=\"x\">hi<br>there</p>"));
    assert!(output.contains("<!-- note -->"));
  }
}
