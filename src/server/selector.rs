//!
//! The subset of CSS selectors the server page understands:
//! comma separated groups of compound selectors made of a tag name,
//! `*`, `#id`, `.class` and `[attr]`, `[attr=v]`, `[attr^=v]` conditions.
//!
//! Combinators are not supported; the server page has no nesting.
//!

use crate::error::Error;

use super::ServerElement;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub universal: bool,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrCondition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList(pub Vec<Compound>);

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self, Error> {
        let mut groups = vec![];

        for group in split_groups(selector)? {
            groups.push(parse_compound(group.trim(), selector)?);
        }

        Ok(Self(groups))
    }

    pub fn matches(&self, element: &ServerElement) -> bool {
        self.0.iter().any(|compound| compound.matches(element))
    }
}

impl Compound {
    fn matches(&self, element: &ServerElement) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(element.tag_name()) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if element.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        self.attrs.iter().all(|condition| match condition {
            AttrCondition::Exists { key } => element.attribute(key).is_some(),
            AttrCondition::Eq { key, value } => element.attribute(key).as_ref() == Some(value),
            AttrCondition::StartsWith { key, value } => element
                .attribute(key)
                .map(|attr| !value.is_empty() && attr.starts_with(value.as_str()))
                .unwrap_or(false),
        })
    }
}

fn invalid(selector: &str) -> Error {
    Error::InvalidSelector(selector.to_string())
}

fn split_groups(selector: &str) -> Result<Vec<&str>, Error> {
    let mut groups = vec![];
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut bracket_depth = 0usize;

    for (i, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), ch) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => bracket_depth += 1,
            (None, ']') => {
                if bracket_depth == 0 {
                    return Err(invalid(selector));
                }
                bracket_depth -= 1;
            }
            (None, ',') if bracket_depth == 0 => {
                groups.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() || bracket_depth != 0 {
        return Err(invalid(selector));
    }

    groups.push(&selector[start..]);

    Ok(groups)
}

fn parse_compound(part: &str, selector: &str) -> Result<Compound, Error> {
    if part.is_empty() {
        return Err(invalid(selector));
    }

    let bytes = part.as_bytes();
    let mut compound = Compound::default();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'*' if i == 0 => {
                compound.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(part, i + 1).ok_or_else(|| invalid(selector))?;
                if compound.id.replace(id).is_some() {
                    return Err(invalid(selector));
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(part, i + 1).ok_or_else(|| invalid(selector))?;
                compound.classes.push(class);
                i = next;
            }
            b'[' => {
                let (condition, next) = parse_attr_condition(part, i, selector)?;
                compound.attrs.push(condition);
                i = next;
            }
            _ if i == 0 => {
                let (tag, next) = parse_ident(part, i).ok_or_else(|| invalid(selector))?;
                compound.tag = Some(tag);
                i = next;
            }
            // Whitespace or a combinator inside a group
            _ => return Err(invalid(selector)),
        }
    }

    Ok(compound)
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut end = start;

    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }

    if end == start {
        None
    } else {
        Some((src[start..end].to_string(), end))
    }
}

fn parse_attr_condition(
    src: &str,
    open_bracket: usize,
    selector: &str,
) -> Result<(AttrCondition, usize), Error> {
    let bytes = src.as_bytes();
    let skip_whitespace = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    let (key, next) =
        parse_ident(src, skip_whitespace(open_bracket + 1)).ok_or_else(|| invalid(selector))?;
    let key = key.to_ascii_lowercase();
    let mut i = skip_whitespace(next);

    let starts_with = match bytes.get(i) {
        Some(b']') => return Ok((AttrCondition::Exists { key }, i + 1)),
        Some(b'=') => {
            i += 1;
            false
        }
        Some(b'^') if bytes.get(i + 1) == Some(&b'=') => {
            i += 2;
            true
        }
        _ => return Err(invalid(selector)),
    };

    i = skip_whitespace(i);

    let (value, next) = match bytes.get(i) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            let close = src[i + 1..]
                .find(quote as char)
                .ok_or_else(|| invalid(selector))?;
            let value = src[i + 1..i + 1 + close].to_string();
            (value, i + close + 2)
        }
        _ => parse_ident(src, i).ok_or_else(|| invalid(selector))?,
    };

    i = skip_whitespace(next);
    if bytes.get(i) != Some(&b']') {
        return Err(invalid(selector));
    }

    let condition = if starts_with {
        AttrCondition::StartsWith { key, value }
    } else {
        AttrCondition::Eq { key, value }
    };

    Ok((condition, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_anchor_selector() {
        let list = SelectorList::parse("a[href^=\"#\"]").unwrap();

        assert_eq!(
            list.0,
            vec![Compound {
                tag: Some("a".into()),
                attrs: vec![AttrCondition::StartsWith {
                    key: "href".into(),
                    value: "#".into(),
                }],
                ..Compound::default()
            }]
        );
    }

    #[test]
    fn parse_class_groups() {
        let list = SelectorList::parse(".about-card, .project-card,.skill-tag").unwrap();
        let classes: Vec<_> = list.0.iter().map(|c| c.classes[0].as_str()).collect();

        assert_eq!(classes, vec!["about-card", "project-card", "skill-tag"]);
    }

    #[test]
    fn parse_compound_with_id_and_classes() {
        let list = SelectorList::parse("section#about.card.wide").unwrap();

        assert_eq!(list.0[0].tag.as_deref(), Some("section"));
        assert_eq!(list.0[0].id.as_deref(), Some("about"));
        assert_eq!(list.0[0].classes, vec!["card", "wide"]);
    }

    #[test]
    fn rejects_invalid_selectors() {
        for selector in ["#", "", ".", "a,", "div p", "a > b", "[href", "a[href^='#]"] {
            assert!(
                matches!(SelectorList::parse(selector), Err(Error::InvalidSelector(_))),
                "{:?} should be rejected",
                selector
            );
        }
    }
}
