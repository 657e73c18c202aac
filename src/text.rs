use super::*;

static SPACE_RUNS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

// Text from these tags continues the current line.
const INLINE_TAGS: [&str; 18] = [
  "a", "b", "bdo", "button", "cite", "del", "em", "font", "i", "label",
  "mark", "s", "span", "strong", "sub", "sup", "tt", "u",
];

// No text is extracted from these subtrees.
const SKIPPED_TAGS: [&str; 5] = ["button", "form", "noscript", "script", "style"];

const LIST_MARKER: &str = "* ";

/// Extracts the visible text under `node`, unnormalized.
///
/// Block-level elements open and close a line, inline elements keep text
/// continuity, `li` items are marked with `* ` and `<br>` breaks the line.
pub(crate) fn block_text(node: NodeRef<'_, Node>) -> String {
  let mut output = String::new();
  push_block_text(node, &mut output);
  output
}

fn push_block_text(node: NodeRef<'_, Node>, output: &mut String) {
  for child in node.children() {
    match child.value() {
      Node::Text(text) => output.push_str(text),
      Node::Element(element) => {
        let name = element.name();

        if SKIPPED_TAGS.contains(&name) {
          continue;
        }

        let is_block = !INLINE_TAGS.contains(&name);

        if is_block {
          output.push('\n');
        }

        if name == "li" {
          output.push_str(LIST_MARKER);
        }

        if name == "br" {
          output.push('\n');
        } else {
          push_block_text(child, output);
        }

        if is_block {
          output.push('\n');
        }
      }
      _ => {}
    }
  }
}

/// Collapses space runs, trims every line and drops blank lines, so
/// paragraph boundaries survive as single newlines.
pub(crate) fn normalize_text(text: &str) -> String {
  SPACE_RUNS
    .replace_all(text, " ")
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .collect::<Vec<&str>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn body_text(html: &str) -> String {
    let html = Html::parse_document(html);

    let body = html
      .tree
      .root()
      .descendants()
      .find(|node| {
        matches!(node.value(), Node::Element(el) if el.name() == "body")
      })
      .unwrap();

    normalize_text(&block_text(body))
  }

  #[test]
  fn inline_tags_keep_text_continuity() {
    assert_eq!(
      body_text("<body><p>Hello <b>brave</b> <a href='/w'>world</a>!</p></body>"),
      "Hello brave world!"
    );
  }

  #[test]
  fn block_tags_break_lines() {
    assert_eq!(
      body_text("<body><p>first</p><p>second</p></body>"),
      "first\nsecond"
    );
  }

  #[test]
  fn list_items_are_marked() {
    assert_eq!(
      body_text("<body>Shopping<ul><li>milk</li><li>bread</li></ul></body>"),
      "Shopping\n* milk\n* bread"
    );
  }

  #[test]
  fn line_breaks_are_preserved() {
    assert_eq!(body_text("<body><p>one<br>two</p></body>"), "one\ntwo");
  }

  #[test]
  fn script_and_form_subtrees_are_skipped() {
    assert_eq!(
      body_text(
        "<body><script>var x = 1;</script><form><input value='q'>Search\
         </form><p>kept</p></body>"
      ),
      "kept"
    );
  }

  #[test]
  fn whitespace_is_normalized() {
    assert_eq!(
      body_text("<body><p>  spaced \t out  </p>\n\n<p>next</p></body>"),
      "spaced out\nnext"
    );
  }
}
