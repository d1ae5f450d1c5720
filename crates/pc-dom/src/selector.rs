//! CSS Selectors
//!
//! Parsing and matching for the selector subset used by `querySelectorAll`,
//! `matches` and `closest`: selector lists, the four combinators, type and
//! universal selectors, `#id`, `.class` and attribute selectors.

use crate::{DomTree, NodeId};

/// Selector parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unexpected end of selector")]
    UnexpectedEnd,
}

/// Comma-separated list of complex selectors
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, left to right
#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    /// `None` for `*` or an omitted type
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeSelector {
    name: String,
    matcher: Option<AttributeMatcher>,
}

#[derive(Debug, Clone, PartialEq)]
enum AttributeMatcher {
    /// [attr=value]
    Exact(String),
    /// [attr~=value]
    Includes(String),
    /// [attr|=value]
    DashMatch(String),
    /// [attr^=value]
    Prefix(String),
    /// [attr$=value]
    Suffix(String),
    /// [attr*=value]
    Substring(String),
}

impl AttributeSelector {
    fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(val)) = (&self.matcher, value) else {
            return self.matcher.is_none() && value.is_some();
        };
        match matcher {
            AttributeMatcher::Exact(expected) => val == expected,
            AttributeMatcher::Includes(expected) => val.split_whitespace().any(|w| w == expected),
            AttributeMatcher::DashMatch(expected) => {
                val == expected
                    || val
                        .strip_prefix(expected.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttributeMatcher::Prefix(expected) => !expected.is_empty() && val.starts_with(expected.as_str()),
            AttributeMatcher::Suffix(expected) => !expected.is_empty() && val.ends_with(expected.as_str()),
            AttributeMatcher::Substring(expected) => !expected.is_empty() && val.contains(expected.as_str()),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(elem) = tree.get(node).and_then(|n| n.as_element()) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !elem.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.ids.iter().all(|id| elem.id.as_deref() == Some(id.as_str()))
            && self.classes.iter().all(|c| elem.classes.contains(c))
            && self.attrs.iter().all(|a| a.matches(elem.get_attr(&a.name)))
    }
}

impl ComplexSelector {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.matches_at(tree, self.compounds.len() - 1, node)
    }

    fn matches_at(&self, tree: &DomTree, index: usize, node: NodeId) -> bool {
        if !self.compounds[index].matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Descendant => tree
                .ancestors(node)
                .any(|a| self.matches_at(tree, index - 1, a)),
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|p| self.matches_at(tree, index - 1, p)),
            Combinator::NextSibling => tree
                .preceding_element_siblings(node)
                .next()
                .is_some_and(|s| self.matches_at(tree, index - 1, s)),
            Combinator::SubsequentSibling => tree
                .preceding_element_siblings(node)
                .any(|s| self.matches_at(tree, index - 1, s)),
        }
    }
}

impl SelectorList {
    /// Parse a selector list such as `"ul > li.item, [data-toggle]"`
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse_list()
    }

    /// Whether `node` (an element) matches any selector in the list
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(tree, node))
    }

    /// Descendants of `scope` matching the list, in document order
    pub fn query_all(&self, tree: &DomTree, scope: NodeId) -> Vec<NodeId> {
        tree.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(tree, n))
            .collect()
    }

    /// First descendant of `scope` matching the list
    pub fn query_first(&self, tree: &DomTree, scope: NodeId) -> Option<NodeId> {
        tree.descendants(scope)
            .into_iter()
            .find(|&n| self.matches(tree, n))
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::UnexpectedChar { ch, offset: self.pos },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Returns true if any whitespace was skipped
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(ComplexSelector { compounds, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                universal = true;
            }
            Some(ch) if is_ident_start(ch) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                ident.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?);
            } else if is_ident_char(ch) {
                self.pos += 1;
                ident.push(ch);
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.unexpected());
        }
        Ok(ident)
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let operator = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeSelector { name, matcher: None });
            }
            Some('=') => None,
            Some(op @ ('~' | '|' | '^' | '$' | '*')) => {
                self.pos += 1;
                Some(op)
            }
            _ => return Err(self.unexpected()),
        };
        self.expect('=')?;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        None => return Err(SelectorError::UnexpectedEnd),
                        Some(ch) if ch == quote => break,
                        Some('\\') => value.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?),
                        Some(ch) => value.push(ch),
                    }
                }
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        self.expect(']')?;

        let matcher = match operator {
            None => AttributeMatcher::Exact(value),
            Some('~') => AttributeMatcher::Includes(value),
            Some('|') => AttributeMatcher::DashMatch(value),
            Some('^') => AttributeMatcher::Prefix(value),
            Some('$') => AttributeMatcher::Suffix(value),
            Some(_) => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector { name, matcher: Some(matcher) })
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_forms() {
        assert!(SelectorList::parse("div").is_ok());
        assert!(SelectorList::parse(".item").is_ok());
        assert!(SelectorList::parse("#main").is_ok());
        assert!(SelectorList::parse("*").is_ok());
        assert!(SelectorList::parse("a[href^='https']").is_ok());
        assert!(SelectorList::parse("ul > li + li ~ li, .x .y").is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SelectorList::parse(""), Err(SelectorError::Empty));
        assert_eq!(SelectorList::parse("   "), Err(SelectorError::Empty));
        assert_eq!(SelectorList::parse("div >"), Err(SelectorError::UnexpectedEnd));
        assert_eq!(SelectorList::parse("[x"), Err(SelectorError::UnexpectedEnd));
        assert!(matches!(
            SelectorList::parse("div, , p"),
            Err(SelectorError::UnexpectedChar { ch: ',', .. })
        ));
        assert!(matches!(
            SelectorList::parse("a)"),
            Err(SelectorError::UnexpectedChar { ch: ')', offset: 1 })
        ));
    }

    #[test]
    fn test_attribute_matchers() {
        let dash = AttributeSelector {
            name: "lang".into(),
            matcher: Some(AttributeMatcher::DashMatch("en".into())),
        };
        assert!(dash.matches(Some("en")));
        assert!(dash.matches(Some("en-GB")));
        assert!(!dash.matches(Some("english")));

        let includes = AttributeSelector {
            name: "rel".into(),
            matcher: Some(AttributeMatcher::Includes("next".into())),
        };
        assert!(includes.matches(Some("prev next")));
        assert!(!includes.matches(Some("nextpage")));

        let present = AttributeSelector { name: "hidden".into(), matcher: None };
        assert!(present.matches(Some("")));
        assert!(!present.matches(None));
    }

    #[test]
    fn test_combinators_match() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let first = tree.create_element("li");
        let second = tree.create_element("li");
        tree.append_child(tree.root(), ul).unwrap();
        tree.append_child(ul, first).unwrap();
        tree.append_child(ul, second).unwrap();

        let child = SelectorList::parse("ul > li").unwrap();
        assert_eq!(child.query_all(&tree, tree.root()), vec![first, second]);

        let adjacent = SelectorList::parse("li + li").unwrap();
        assert_eq!(adjacent.query_all(&tree, tree.root()), vec![second]);

        let descendant = SelectorList::parse("ul li").unwrap();
        assert!(descendant.matches(&tree, first));
        assert!(descendant.query_all(&tree, first).is_empty());
    }
}
