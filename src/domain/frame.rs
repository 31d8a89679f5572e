//! Ordered collection of derived columns over one instrument's history.

use crate::domain::column::ColumnKey;
use crate::domain::error::SignalError;
use crate::domain::series::Series;

/// Read/append access to named columns of equal length.
///
/// Implemented by [`FeatureFrame`] (rows are bars of one instrument) and by
/// [`Snapshot`](crate::domain::snapshot::Snapshot) (rows are instruments), so
/// the enhancement and composite code runs unchanged on either.
pub trait ColumnStore {
    fn row_count(&self) -> usize;
    fn column(&self, key: &ColumnKey) -> Option<Series>;
    fn set_column(&mut self, key: ColumnKey, values: Series) -> Result<(), SignalError>;

    fn has_column(&self, key: &ColumnKey) -> bool {
        self.column(key).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    len: usize,
    columns: Vec<(ColumnKey, Series)>,
}

impl FeatureFrame {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Appends a column, or replaces it in place if the key already exists.
    pub fn insert(&mut self, key: ColumnKey, values: Series) -> Result<(), SignalError> {
        if values.len() != self.len {
            return Err(SignalError::data(format!(
                "column {} has {} rows, frame has {}",
                key,
                values.len(),
                self.len
            )));
        }
        match self.columns.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((key, values)),
        }
        Ok(())
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&Series> {
        self.columns.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn contains(&self, key: &ColumnKey) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnKey, &Series)> {
        self.columns.iter().map(|(k, s)| (k, s))
    }

    /// Column-wise concatenation; `other`'s columns follow this frame's.
    pub fn merge(&mut self, other: FeatureFrame) -> Result<(), SignalError> {
        for (key, values) in other.columns {
            self.insert(key, values)?;
        }
        Ok(())
    }

    /// Values `bars_ago` rows before the last one, in column order.
    pub fn row_from_end(&self, bars_ago: usize) -> Vec<(ColumnKey, Option<f64>)> {
        let idx = self.len.checked_sub(bars_ago + 1);
        self.columns
            .iter()
            .map(|(k, s)| (k.clone(), idx.and_then(|i| s.get(i))))
            .collect()
    }

    pub fn last_row(&self) -> Vec<(ColumnKey, Option<f64>)> {
        self.row_from_end(0)
    }
}

impl ColumnStore for FeatureFrame {
    fn row_count(&self) -> usize {
        self.len
    }

    fn column(&self, key: &ColumnKey) -> Option<Series> {
        self.get(key).cloned()
    }

    fn set_column(&mut self, key: ColumnKey, values: Series) -> Result<(), SignalError> {
        self.insert(key, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column::ColumnVariant;

    fn key(name: &str) -> ColumnKey {
        ColumnKey::base(name, "1D")
    }

    #[test]
    fn insert_preserves_order_and_replaces_in_place() {
        let mut frame = FeatureFrame::new(2);
        frame.insert(key("RSI"), Series::from_values(&[1.0, 2.0])).unwrap();
        frame.insert(key("CMF"), Series::from_values(&[3.0, 4.0])).unwrap();
        frame.insert(key("RSI"), Series::from_values(&[5.0, 6.0])).unwrap();

        let names: Vec<String> = frame.keys().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["RSI_1D", "CMF_1D"]);
        assert_eq!(frame.get(&key("RSI")).unwrap().last(), Some(6.0));
    }

    #[test]
    fn insert_rejects_length_mismatch() {
        let mut frame = FeatureFrame::new(3);
        assert!(frame.insert(key("RSI"), Series::from_values(&[1.0])).is_err());
        assert!(frame.is_empty());
    }

    #[test]
    fn merge_appends_columns() {
        let mut a = FeatureFrame::new(1);
        a.insert(key("RSI"), Series::from_values(&[1.0])).unwrap();
        let mut b = FeatureFrame::new(1);
        b.insert(key("VOLUME"), Series::from_values(&[9.0])).unwrap();
        a.merge(b).unwrap();
        assert_eq!(a.width(), 2);
        assert!(a.contains(&key("VOLUME")));
    }

    #[test]
    fn last_row_and_row_from_end() {
        let mut frame = FeatureFrame::new(3);
        frame
            .insert(key("RSI"), Series::new(vec![Some(1.0), Some(2.0), None]))
            .unwrap();
        assert_eq!(frame.last_row(), vec![(key("RSI"), None)]);
        assert_eq!(frame.row_from_end(1), vec![(key("RSI"), Some(2.0))]);
        assert_eq!(frame.row_from_end(5), vec![(key("RSI"), None)]);
    }

    #[test]
    fn column_store_view() {
        let mut frame = FeatureFrame::new(1);
        let avg = key("RSI").with_variant(ColumnVariant::Avg);
        frame.set_column(avg.clone(), Series::from_values(&[4.0])).unwrap();
        assert!(frame.has_column(&avg));
        assert_eq!(frame.row_count(), 1);
        assert_eq!(frame.column(&avg), Some(Series::from_values(&[4.0])));
    }
}
