//! Case-insensitive, multi-valued header collection.
//!
//! [`HeaderBag`] is the header container embedded in every message-family
//! value. Names are validated and case-folded through [`http::HeaderName`],
//! values are validated through [`http::HeaderValue`] and kept as strings in
//! the order they were added.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::protocol::InvalidArgument;

/// Ordered mapping from a lowercase header name to its values.
///
/// Names keep the position of their first insertion; removing a name does not
/// reorder the others. The original case of a name is not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag {
    entries: Vec<(HeaderName, Vec<String>)>,
}

/// Conversion into the list of values of a single header.
///
/// A single string becomes a one-element list.
pub trait IntoHeaderValues {
    fn into_header_values(self) -> Vec<String>;
}

impl IntoHeaderValues for &str {
    fn into_header_values(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoHeaderValues for String {
    fn into_header_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoHeaderValues for &String {
    fn into_header_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoHeaderValues for Vec<String> {
    fn into_header_values(self) -> Vec<String> {
        self
    }
}

impl IntoHeaderValues for Vec<&str> {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl IntoHeaderValues for &[&str] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|value| (*value).to_owned()).collect()
    }
}

impl<const N: usize> IntoHeaderValues for [&str; N] {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from `(name, value)` pairs, repeated names accumulate values.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] for an invalid name or value.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, InvalidArgument>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: IntoHeaderValues,
    {
        let mut bag = Self::new();
        for (name, value) in pairs {
            bag.append(name.as_ref(), value)?;
        }
        Ok(bag)
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive presence check.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Values of `name` in insertion order, empty if the header is absent.
    pub fn get(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(index) => &self.entries[index].1,
            None => &[],
        }
    }

    /// Values of `name` joined with `", "`, empty if the header is absent.
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Iterates over `(lowercase name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Replaces every value of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] for an invalid name or value, leaving the bag unchanged.
    pub fn set<V: IntoHeaderValues>(&mut self, name: &str, values: V) -> Result<(), InvalidArgument> {
        let header_name = parse_name(name)?;
        let values = parse_values(&header_name, values)?;

        match self.position(name) {
            Some(index) => self.entries[index].1 = values,
            None => self.entries.push((header_name, values)),
        }
        Ok(())
    }

    /// Appends values to `name`, behaving like [`HeaderBag::set`] if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] for an invalid name or value, leaving the bag unchanged.
    pub fn append<V: IntoHeaderValues>(&mut self, name: &str, values: V) -> Result<(), InvalidArgument> {
        let header_name = parse_name(name)?;
        let mut values = parse_values(&header_name, values)?;

        match self.position(name) {
            Some(index) => self.entries[index].1.append(&mut values),
            None => self.entries.push((header_name, values)),
        }
        Ok(())
    }

    /// Removes `name` entirely, returning its values if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(header_name, _)| header_name.as_str().eq_ignore_ascii_case(name))
    }
}

fn parse_name(name: &str) -> Result<HeaderName, InvalidArgument> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| InvalidArgument::header_name(name))
}

fn parse_values<V: IntoHeaderValues>(name: &HeaderName, values: V) -> Result<Vec<String>, InvalidArgument> {
    let values = values.into_header_values();
    if let Some(invalid) = values.iter().find(|value| HeaderValue::from_str(value).is_err()) {
        return Err(InvalidArgument::header_value(name, invalid));
    }
    Ok(values)
}

impl<'a> IntoIterator for &'a HeaderBag {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Copies the headers into a `http::HeaderMap`, one entry per value.
impl TryFrom<&HeaderBag> for HeaderMap {
    type Error = InvalidArgument;

    fn try_from(bag: &HeaderBag) -> Result<Self, Self::Error> {
        let mut map = HeaderMap::with_capacity(bag.len());
        for (name, values) in &bag.entries {
            for value in values {
                let header_value = HeaderValue::from_str(value).map_err(|_| InvalidArgument::header_value(name, value))?;
                map.append(name.clone(), header_value);
            }
        }
        Ok(map)
    }
}

/// Collects the headers of a `http::HeaderMap`, rejecting values that are not visible ASCII.
impl TryFrom<&HeaderMap> for HeaderBag {
    type Error = InvalidArgument;

    fn try_from(map: &HeaderMap) -> Result<Self, Self::Error> {
        let mut bag = HeaderBag::new();
        for (name, value) in map {
            let value = value.to_str().map_err(|_| InvalidArgument::header_value(name, String::from_utf8_lossy(value.as_bytes())))?;
            bag.append(name.as_str(), value)?;
        }
        Ok(bag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut bag = HeaderBag::new();
        bag.set("X-Foo", "a").unwrap();

        assert!(bag.contains("x-foo"));
        assert!(bag.contains("X-FOO"));
        assert_eq!(bag.get("X-FOO"), ["a"]);
        assert!(!bag.contains("x-bar"));
        assert!(bag.get("x-bar").is_empty());
    }

    #[test]
    fn test_names_are_folded() {
        let bag = HeaderBag::from_pairs([("Content-Type", "text/plain")]).unwrap();
        let names: Vec<_> = bag.iter().map(|(name, _)| name).collect();

        assert_eq!(names, ["content-type"]);
    }

    #[test]
    fn test_append_and_line() {
        let mut bag = HeaderBag::new();
        bag.append("x-powered-by", "PHP").unwrap();
        bag.append("X-Powered-By", "Stark").unwrap();

        assert_eq!(bag.get("x-powered-by"), ["PHP", "Stark"]);
        assert_eq!(bag.get_line("x-powered-by"), "PHP, Stark");
        assert_eq!(bag.get_line("missing"), "");
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut bag = HeaderBag::from_pairs([("a", "1"), ("b", "2"), ("a", "3")]).unwrap();
        bag.set("A", vec!["4", "5"]).unwrap();

        let entries: Vec<_> = bag.iter().collect();
        assert_eq!(entries, [("a", &["4".to_owned(), "5".to_owned()][..]), ("b", &["2".to_owned()][..])]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut bag = HeaderBag::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]).unwrap();

        assert_eq!(bag.remove("B"), Some(vec!["2".to_owned()]));
        assert_eq!(bag.remove("b"), None);

        let names: Vec<_> = bag.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_invalid_input_leaves_bag_unchanged() {
        let mut bag = HeaderBag::from_pairs([("a", "1")]).unwrap();

        assert!(matches!(bag.set("bad name", "x"), Err(InvalidArgument::HeaderName(_))));
        assert!(matches!(bag.append("a", ["2", "bad\r\nvalue"]), Err(InvalidArgument::HeaderValue { .. })));
        assert_eq!(bag.get("a"), ["1"]);
    }

    #[test]
    fn test_http_header_map_conversion() {
        let bag = HeaderBag::from_pairs([("accept", "text/html"), ("Accept", "application/json"), ("host", "example.com")]).unwrap();

        let map = HeaderMap::try_from(&bag).unwrap();
        assert_eq!(map.get_all(http::header::ACCEPT).iter().count(), 2);
        assert_eq!(map.get(http::header::HOST).unwrap(), "example.com");

        let back = HeaderBag::try_from(&map).unwrap();
        assert_eq!(back.get("accept"), ["text/html", "application/json"]);
    }
}
