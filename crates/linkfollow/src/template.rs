//! URI template expansion
//!
//! Supports the subset of RFC 6570 that hypermedia links use in practice:
//! simple string expansion (`{id}`, `{a,b}`), form-style query expansion
//! (`{?id,format}`) and query continuation (`{&page}`). Values are scalars;
//! list and associative values, prefix and explode modifiers are rejected.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::error::TemplateError;
use crate::params::{ParamValue, Parameters};

/// Everything except RFC 3986 unreserved characters gets percent-encoded
pub(crate) const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static VARNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2})(?:[A-Za-z0-9_.]|%[0-9A-Fa-f]{2})*$")
        .expect("valid variable name pattern")
});

/// Result of expanding a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Concrete URI
    pub uri: String,
    /// Names referenced by a placeholder, whether or not a value was bound
    pub consumed: BTreeSet<String>,
}

impl Expansion {
    /// Bindings of `parameters` that no placeholder referenced
    pub fn unconsumed(&self, parameters: &Parameters) -> Parameters {
        parameters.filtered(|name| !self.consumed.contains(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Query,
    QueryContinuation,
}

#[derive(Debug)]
struct Placeholder<'a> {
    operator: Operator,
    names: Vec<&'a str>,
}

impl<'a> Placeholder<'a> {
    fn parse(expression: &'a str, offset: usize) -> Result<Self, TemplateError> {
        let (operator, list) = match expression.chars().next() {
            None => return Err(TemplateError::Empty(offset)),
            Some('?') => (Operator::Query, &expression[1..]),
            Some('&') => (Operator::QueryContinuation, &expression[1..]),
            Some(c @ ('+' | '#' | '.' | '/' | ';' | '=' | ',' | '!' | '@' | '|')) => {
                return Err(TemplateError::UnsupportedOperator(c))
            }
            Some(_) => (Operator::Simple, expression),
        };

        if list.is_empty() {
            return Err(TemplateError::Empty(offset));
        }

        let names = list
            .split(',')
            .map(|name| {
                if VARNAME.is_match(name) {
                    Ok(name)
                } else {
                    Err(TemplateError::InvalidName(name.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { operator, names })
    }

    fn expand_into(&self, uri: &mut String, parameters: &Parameters) {
        let defined = self.names.iter().filter_map(|name| {
            parameters
                .get(name)
                .and_then(ParamValue::render)
                .map(|value| (*name, utf8_percent_encode(&value, UNRESERVED).to_string()))
        });

        match self.operator {
            Operator::Simple => {
                let values: Vec<String> = defined.map(|(_, value)| value).collect();
                uri.push_str(&values.join(","));
            }
            Operator::Query | Operator::QueryContinuation => {
                let pairs: Vec<String> = defined
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                if pairs.is_empty() {
                    return;
                }
                if self.operator == Operator::QueryContinuation || uri.contains('?') {
                    uri.push('&');
                } else {
                    uri.push('?');
                }
                uri.push_str(&pairs.join("&"));
            }
        }
    }
}

/// Expand `template` with `parameters`
///
/// Unbound or [`ParamValue::Absent`] names expand to an empty string in a
/// simple placeholder and are left out of a query placeholder.
pub fn expand(template: &str, parameters: &Parameters) -> Result<Expansion, TemplateError> {
    let mut uri = String::with_capacity(template.len());
    let mut consumed = BTreeSet::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(|c: char| c == '{' || c == '}') {
        if rest[start..].starts_with('}') {
            return Err(TemplateError::UnexpectedClose(offset + start));
        }
        uri.push_str(&rest[..start]);

        let close = rest[start..]
            .find('}')
            .ok_or(TemplateError::Unclosed(offset + start))?;
        let expression = &rest[start + 1..start + close];
        if expression.contains('{') {
            return Err(TemplateError::Unclosed(offset + start));
        }

        let placeholder = Placeholder::parse(expression, offset + start)?;
        placeholder.expand_into(&mut uri, parameters);
        consumed.extend(placeholder.names.iter().map(|name| name.to_string()));

        offset += start + close + 1;
        rest = &rest[start + close + 1..];
    }
    uri.push_str(rest);

    Ok(Expansion { uri, consumed })
}

/// Whether `target` contains template syntax, well formed or not
pub fn is_templated(target: &str) -> bool {
    target.contains(['{', '}'])
}

#[cfg(test)]
mod tests {
    use percent_encoding::percent_decode_str;

    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> Parameters {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_simple_placeholder() {
        let expansion = expand(
            "http://example.org/customer/{id}",
            &params(&[("id", 45.into())]),
        )
        .expect("valid template");

        assert_eq!(expansion.uri, "http://example.org/customer/45");
        assert!(expansion.consumed.contains("id"));
    }

    #[test]
    fn test_query_placeholder() {
        let expansion = expand("http://host/customer{?id}", &params(&[("id", 45.into())]))
            .expect("valid template");
        assert_eq!(expansion.uri, "http://host/customer?id=45");
    }

    #[test]
    fn test_query_placeholder_multiple_names() {
        let expansion = expand(
            "http://host/search{?q,page,exact}",
            &params(&[
                ("exact", true.into()),
                ("q", "red shoes".into()),
                ("page", 2.into()),
            ]),
        )
        .expect("valid template");
        assert_eq!(
            expansion.uri,
            "http://host/search?q=red%20shoes&page=2&exact=true"
        );
    }

    #[test]
    fn test_query_placeholder_after_existing_query() {
        let expansion = expand(
            "http://host/customer?format=xml{?id}",
            &params(&[("id", 45.into())]),
        )
        .expect("valid template");
        assert_eq!(expansion.uri, "http://host/customer?format=xml&id=45");

        let expansion = expand(
            "http://host/list{?page}{?size}",
            &params(&[("page", 1.into()), ("size", 20.into())]),
        )
        .expect("valid template");
        assert_eq!(expansion.uri, "http://host/list?page=1&size=20");
    }

    #[test]
    fn test_query_continuation() {
        let expansion = expand(
            "http://host/list?sort=asc{&page}",
            &params(&[("page", 3.into())]),
        )
        .expect("valid template");
        assert_eq!(expansion.uri, "http://host/list?sort=asc&page=3");
    }

    #[test]
    fn test_missing_values() {
        let expansion = expand(
            "http://host/{tenant}/items{?page,size}",
            &params(&[("size", 10.into())]),
        )
        .expect("valid template");
        assert_eq!(expansion.uri, "http://host//items?size=10");

        let expansion = expand(
            "http://host/items{?page}",
            &params(&[("page", ParamValue::Absent)]),
        )
        .expect("valid template");
        assert_eq!(expansion.uri, "http://host/items");
        assert!(expansion.consumed.contains("page"));
    }

    #[test]
    fn test_unconsumed_parameters() {
        let bindings = params(&[("id", 45.into()), ("format", "xml".into())]);
        let expansion = expand("http://host/customer/{id}", &bindings).expect("valid template");
        let rest = expansion.unconsumed(&bindings);

        assert_eq!(rest.len(), 1);
        assert_eq!(rest.get("format"), Some(&ParamValue::from("xml")));
    }

    #[test]
    fn test_bare_placeholders_round_trip() {
        let values = ["plain", "with space", "ümlaut", "a/b", "50%", "x.y-z_~"];
        for value in values {
            let bindings = params(&[("a", value.into()), ("b", 7.into())]);
            let expansion =
                expand("http://host/{a}/items/{b}", &bindings).expect("valid template");

            let path = expansion
                .uri
                .strip_prefix("http://host/")
                .expect("host prefix is preserved");
            let segments: Vec<String> = path
                .split('/')
                .map(|s| {
                    percent_decode_str(s)
                        .decode_utf8()
                        .expect("valid utf-8")
                        .into_owned()
                })
                .collect();
            assert_eq!(segments, vec![value.to_string(), "items".into(), "7".into()]);
        }
    }

    #[test]
    fn test_malformed_templates() {
        let empty = Parameters::new();
        assert_eq!(
            expand("http://host/{id", &empty),
            Err(TemplateError::Unclosed(12))
        );
        assert_eq!(
            expand("http://host/id}", &empty),
            Err(TemplateError::UnexpectedClose(14))
        );
        assert_eq!(expand("http://host/{}", &empty), Err(TemplateError::Empty(12)));
        assert_eq!(expand("http://host/{?}", &empty), Err(TemplateError::Empty(12)));
        assert_eq!(
            expand("http://host/{+path}", &empty),
            Err(TemplateError::UnsupportedOperator('+'))
        );
        assert_eq!(
            expand("http://host/{list*}", &empty),
            Err(TemplateError::InvalidName("list*".to_string()))
        );
        assert_eq!(
            expand("http://host/{a{b}", &empty),
            Err(TemplateError::Unclosed(12))
        );
    }

    #[test]
    fn test_no_placeholders() {
        let expansion = expand("http://host/plain?x=1", &Parameters::new()).expect("valid");
        assert_eq!(expansion.uri, "http://host/plain?x=1");
        assert!(expansion.consumed.is_empty());
        assert!(!is_templated("http://host/plain?x=1"));
        assert!(is_templated("http://host/{id}"));
        assert!(is_templated("http://host/id}"));
    }
}
