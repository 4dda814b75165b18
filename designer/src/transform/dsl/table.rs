//! Variable table.
//!
//! Ordered mapping from variable name to its value sequence. Insertion order
//! follows definition order; later definitions read earlier variables but
//! never mutate them in place.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One value of a variable. `None` is the null marker.
pub type Cell = Option<String>;

/// The value sequence of a variable.
pub type Values = Vec<Cell>;

/// Named value sequences in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    entries: Vec<(String, Values)>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of `name`, if defined.
    pub fn get(&self, name: &str) -> Option<&[Cell]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Store `values` under `name`.
    ///
    /// A redefined variable keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, values: Values) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((name, values)),
        }
    }

    /// Remove `name`; a no-op when absent.
    pub fn remove(&mut self, name: &str) -> Option<Values> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Cell])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Values)> {
        self.entries.iter_mut().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest value sequence, 0 for an empty table.
    pub fn max_len(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).max().unwrap_or(0)
    }

    /// Value of every variable at `index`, in table order.
    pub fn row(&self, index: usize) -> Vec<(&str, Option<&str>)> {
        self.entries
            .iter()
            .filter_map(|(n, v)| v.get(index).map(|cell| (n.as_str(), cell.as_deref())))
            .collect()
    }
}

impl Serialize for VariableTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// Build a value sequence from plain strings.
pub fn values<I, S>(items: I) -> Values
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(|s| Some(s.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_definition_order() {
        let mut table = VariableTable::new();
        table.insert("svs", values(["a", "b"]));
        table.insert("subject", values(["sub-01"]));
        table.insert("svs", values(["c"]));

        let names: Vec<_> = table.names().collect();
        assert_eq!(names, vec!["svs", "subject"]);
        assert_eq!(table.get("svs").unwrap(), &[Some("c".to_string())]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut table = VariableTable::new();
        table.insert("voi", values(["acc"]));
        assert!(table.remove("missing").is_none());
        assert!(table.remove("voi").is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_row_and_max_len() {
        let mut table = VariableTable::new();
        table.insert("a", values(["x", "y"]));
        table.insert("b", vec![Some("1".into()), None]);

        assert_eq!(table.max_len(), 2);
        assert_eq!(table.row(1), vec![("a", Some("y")), ("b", None)]);
    }

    #[test]
    fn test_serialize_as_ordered_map() {
        let mut table = VariableTable::new();
        table.insert("z", values(["1"]));
        table.insert("a", vec![None]);

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"z":["1"],"a":[null]}"#);
    }
}
