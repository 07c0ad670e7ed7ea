//! Link parameters

use std::fmt;

/// Scalar value bound to a link parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Text value
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Marks the parameter for removal from the query string
    Absent,
}

impl ParamValue {
    /// Whether this is the removal marker
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Textual form used on the wire, `None` for [`ParamValue::Absent`]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Absent => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render().unwrap_or_default())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    Self::Integer(value.into())
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

// Values outside the `i64` range keep their decimal text, which renders the same.
macro_rules! impl_from_wide_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    i64::try_from(value)
                        .map(Self::Integer)
                        .unwrap_or_else(|_| Self::String(value.to_string()))
                }
            }
        )*
    };
}

impl_from_wide_integer!(i128, isize, u64, u128, usize);

impl<T> From<Option<T>> for ParamValue
where
    T: Into<ParamValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Absent)
    }
}

/// Ordered name to value bindings
///
/// Insertion order is kept; inserting an existing name replaces its value in
/// place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(Vec<(String, ParamValue)>);

impl Parameters {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, keeping the position of an existing binding
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    /// Builder form of [`Parameters::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Mark `name` for removal
    ///
    /// The binding is kept as [`ParamValue::Absent`] so that a query merge
    /// deletes the name from the target instead of leaving it untouched.
    pub fn remove(&mut self, name: &str) {
        self.insert(name, ParamValue::Absent);
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether `name` is bound, including removal markers
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no bindings
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bindings whose names satisfy `keep`, order preserved
    pub fn filtered<F>(&self, keep: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        Self(
            self.0
                .iter()
                .filter(|(n, _)| keep(n))
                .cloned()
                .collect(),
        )
    }

    /// Overlay `other` on top of `self`
    pub fn merged(&self, other: &Parameters) -> Self {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.insert(name, value.clone());
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl IntoIterator for Parameters {
    type Item = (String, ParamValue);
    type IntoIter = std::vec::IntoIter<(String, ParamValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
