//! Query string merge

use percent_encoding::{percent_decode_str, utf8_percent_encode};

use crate::params::{ParamValue, Parameters};
use crate::template::UNRESERVED;

/// Split `uri` into `(base, query, fragment)`
///
/// `query` excludes the `?`, `fragment` keeps its `#`.
fn split(uri: &str) -> (&str, Option<&str>, &str) {
    let (rest, fragment) = match uri.find('#') {
        Some(i) => (&uri[..i], &uri[i..]),
        None => (uri, ""),
    };
    match rest.find('?') {
        Some(i) => (&rest[..i], Some(&rest[i + 1..]), fragment),
        None => (rest, None, fragment),
    }
}

/// `uri` with every `{...}` placeholder removed
///
/// An unclosed `{` drops the rest of the input.
fn literal_part(uri: &str) -> String {
    let mut literal = String::with_capacity(uri.len());
    let mut rest = uri;
    while let Some(start) = rest.find('{') {
        literal.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(close) => rest = &rest[start + close + 1..],
            None => return literal,
        }
    }
    literal.push_str(rest);
    literal
}

fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    percent_decode_str(&component)
        .decode_utf8_lossy()
        .into_owned()
}

/// Raw `name[=value]` pair as found in the query string
#[derive(Debug)]
struct Pair {
    name: String,
    raw: String,
}

impl Pair {
    fn parse(raw: &str) -> Self {
        let name = raw.split_once('=').map_or(raw, |(name, _)| name);
        Self {
            name: decode(name),
            raw: raw.to_string(),
        }
    }

    fn encoded(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            raw: format!(
                "{}={}",
                utf8_percent_encode(name, UNRESERVED),
                utf8_percent_encode(value, UNRESERVED)
            ),
        }
    }
}

/// Overlay `parameters` on the query string of `uri`
///
/// Existing names are replaced where they stand, new names are appended in
/// insertion order and [`ParamValue::Absent`] deletes every occurrence of a
/// name. Pairs that are not touched are copied byte for byte.
pub fn merge_query(uri: &str, parameters: &Parameters) -> String {
    let (base, query, fragment) = split(uri);

    let mut pairs: Vec<Pair> = query
        .unwrap_or_default()
        .split('&')
        .filter(|raw| !raw.is_empty())
        .map(Pair::parse)
        .collect();

    for (name, value) in parameters.iter() {
        match value.render() {
            None => pairs.retain(|pair| pair.name != name),
            Some(value) => {
                let replacement = Pair::encoded(name, &value);
                match pairs.iter().position(|pair| pair.name == name) {
                    Some(first) => {
                        pairs[first] = replacement;
                        let mut index = 0;
                        pairs.retain(|pair| {
                            let keep = index <= first || pair.name != name;
                            index += 1;
                            keep
                        });
                    }
                    None => pairs.push(replacement),
                }
            }
        }
    }

    let mut merged = base.to_string();
    if !pairs.is_empty() {
        merged.push('?');
        merged.push_str(
            &pairs
                .iter()
                .map(|pair| pair.raw.as_str())
                .collect::<Vec<_>>()
                .join("&"),
        );
    }
    merged.push_str(fragment);
    merged
}

/// Decoded query parameters of `uri`, in order of appearance
///
/// A name that occurs more than once keeps its first position and its last
/// value. Names without `=` are bound to an empty string. Template
/// placeholders are skipped, only literal pairs are read.
pub fn query_parameters(uri: &str) -> Parameters {
    let literal = literal_part(uri);
    let (_, query, _) = split(&literal);
    query
        .unwrap_or_default()
        .split('&')
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.split_once('=') {
            Some((name, value)) => (decode(name), ParamValue::String(decode(value))),
            None => (decode(raw), ParamValue::String(String::new())),
        })
        .collect()
}
