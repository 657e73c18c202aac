use super::*;

// Delimiters for the canonical string. Control characters cannot occur in
// tag names and are stripped from text runs, so a tag marker can never be
// forged by page content.
const OPEN_MARK: char = '\u{1}';
const CLOSE_MARK: char = '\u{3}';
const TEXT_MARK: char = '\u{4}';

/// An attribute-insensitive fingerprint of a DOM subtree.
///
/// Two subtrees that differ only in attribute values hash to the same
/// signature; any difference in tag names, child order, child count or
/// visible text produces a different one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(pub(crate) u128);

impl Signature {
  pub(crate) fn of(node: NodeRef<'_, Node>) -> Self {
    Self(xxh3_128(canonical_string(node).as_bytes()))
  }
}

impl fmt::Debug for Signature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Signature({self})")
  }
}

impl fmt::Display for Signature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:032x}", self.0)
  }
}

/// Serializes a subtree into the canonical form that signatures hash.
///
/// Pre-order walk: an open marker with the tag name, the children in
/// order, a close marker. Text runs are whitespace-collapsed and prefixed
/// with a text marker; empty runs, comments, doctypes and processing
/// instructions are omitted. Attributes are never emitted.
pub(crate) fn canonical_string(node: NodeRef<'_, Node>) -> String {
  let mut output = String::new();
  push_canonical(node, &mut output);
  output
}

fn push_canonical(node: NodeRef<'_, Node>, output: &mut String) {
  match node.value() {
    Node::Element(element) => {
      output.push(OPEN_MARK);
      output.push_str(element.name());

      for child in node.children() {
        push_canonical(child, output);
      }

      output.push(CLOSE_MARK);
    }
    Node::Text(text) => {
      let collapsed = canonical_text(text);

      if !collapsed.is_empty() {
        output.push(TEXT_MARK);
        output.push_str(&collapsed);
      }
    }
    Node::Document | Node::Fragment => {
      for child in node.children() {
        push_canonical(child, output);
      }
    }
    _ => {}
  }
}

// Whitespace runs collapse to a single space, control characters are
// dropped, leading and trailing whitespace is trimmed.
fn canonical_text(text: &str) -> String {
  let mut collapsed = String::with_capacity(text.len());
  let mut last_was_space = false;

  for ch in text.chars() {
    if ch.is_whitespace() {
      if !last_was_space {
        collapsed.push(' ');
        last_was_space = true;
      }
    } else if !ch.is_control() {
      collapsed.push(ch);
      last_was_space = false;
    }
  }

  collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn first_signature(html: &str, tag: &str) -> Signature {
    let html = Html::parse_document(html);

    let node = html
      .tree
      .root()
      .descendants()
      .find(|node| {
        matches!(node.value(), Node::Element(el) if el.name() == tag)
      })
      .expect("tag should be present");

    Signature::of(node)
  }

  #[test]
  fn attribute_changes_do_not_change_the_signature() {
    assert_eq!(
      first_signature("<nav><a href='/a'>Home</a></nav>", "nav"),
      first_signature(
        "<nav class='main' id='top'><a href='/b'>Home</a></nav>",
        "nav"
      ),
    );
  }

  #[test]
  fn descendant_attribute_changes_do_not_change_the_signature() {
    assert_eq!(
      first_signature("<footer><div><a href='/x'>About</a></div></footer>", "footer"),
      first_signature("<footer><div><a href='/y'>About</a></div></footer>", "footer"),
    );
  }

  #[test]
  fn tag_name_changes_the_signature() {
    assert_ne!(
      first_signature("<div><span>x</span></div>", "div"),
      first_signature("<div><em>x</em></div>", "div"),
    );
  }

  #[test]
  fn child_order_changes_the_signature() {
    assert_ne!(
      first_signature("<div><p>a</p><p>b</p></div>", "div"),
      first_signature("<div><p>b</p><p>a</p></div>", "div"),
    );
  }

  #[test]
  fn child_count_changes_the_signature() {
    assert_ne!(
      first_signature("<ul><li>a</li></ul>", "ul"),
      first_signature("<ul><li>a</li><li>a</li></ul>", "ul"),
    );
  }

  #[test]
  fn visible_text_changes_the_signature() {
    assert_ne!(
      first_signature("<div>today</div>", "div"),
      first_signature("<div>tomorrow</div>", "div"),
    );
  }

  #[test]
  fn whitespace_runs_collapse() {
    assert_eq!(
      first_signature("<div>  a \n\t b </div>", "div"),
      first_signature("<div>a b</div>", "div"),
    );
  }

  #[test]
  fn comments_are_omitted() {
    assert_eq!(
      first_signature("<div><!-- decoration -->a</div>", "div"),
      first_signature("<div>a</div>", "div"),
    );
  }

  #[test]
  fn text_cannot_impersonate_markup() {
    let html = Html::parse_document("<div>p</div>");

    let div = html
      .tree
      .root()
      .descendants()
      .find(|node| {
        matches!(node.value(), Node::Element(el) if el.name() == "div")
      })
      .unwrap();

    assert_eq!(canonical_string(div), "\u{1}div\u{4}p\u{3}");

    assert_ne!(
      first_signature("<div><p></p></div>", "div"),
      first_signature("<div>p</div>", "div"),
    );
  }
}
