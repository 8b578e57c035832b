use crate::calc::{self, Totals};
use crate::error::BudgetError;
use crate::model::{CategoryId, FieldKey, LineItem};
use crate::schema::{schema, FieldSchema};
use serde::{Deserialize, Serialize};

/// Who submitted the budget and for which year.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub org: String,
    pub year: String,
    pub user: String,
}

impl Metadata {
    pub fn new(org: impl Into<String>, year: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            year: year.into(),
            user: user.into(),
        }
    }
}

/// The rows of one fund category, in insertion order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Section {
    category: CategoryId,
    items: Vec<LineItem>,
}

impl Section {
    pub fn new(category: CategoryId) -> Self {
        Self {
            category,
            items: Vec::new(),
        }
    }

    pub fn with_items(category: CategoryId, items: Vec<LineItem>) -> Self {
        Self { category, items }
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn schema(&self) -> &'static FieldSchema {
        schema(self.category)
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [LineItem] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends `item` and recomputes the section.
    pub fn push(&mut self, item: LineItem) -> Totals {
        self.items.push(item);
        calc::recompute(self)
    }

    /// Appends a blank row so that the section has something to edit.
    pub fn ensure_row(&mut self) {
        if self.items.is_empty() {
            self.items.push(LineItem::new());
        }
    }

    /// Sets a user-entered field of row `index` and recomputes the section.
    pub fn set(
        &mut self,
        index: usize,
        key: FieldKey,
        value: impl Into<String>,
    ) -> Result<Totals, BudgetError> {
        self.check_editable(key)?;
        let len = self.items.len();
        let category = self.category;
        let item = self
            .items
            .get_mut(index)
            .ok_or(BudgetError::RowIndex {
                category,
                index,
                len,
            })?;
        item.set_raw(key, value);
        Ok(calc::recompute(self))
    }

    /// Removes row `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Result<LineItem, BudgetError> {
        if index >= self.items.len() {
            return Err(BudgetError::RowIndex {
                category: self.category,
                index,
                len: self.items.len(),
            });
        }
        let item = self.items.remove(index);
        calc::recompute(self);
        Ok(item)
    }

    /// Returns an error unless `key` is a user-entered field of this category.
    pub fn check_editable(&self, key: FieldKey) -> Result<(), BudgetError> {
        let schema = self.schema();
        if !schema.contains(key) {
            return Err(BudgetError::UnknownField {
                category: self.category,
                field: key.to_string(),
            });
        }
        if schema.is_derived(key) {
            return Err(BudgetError::DerivedField {
                category: self.category,
                field: key,
            });
        }
        Ok(())
    }
}

/// One organization's budget submission: metadata plus one section per category, in form order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Dataset {
    metadata: Metadata,
    sections: Vec<Section>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(Metadata::default())
    }
}

impl Dataset {
    /// Creates a dataset whose sections have no rows.
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            sections: CategoryId::ALL.iter().map(|&c| Section::new(c)).collect(),
        }
    }

    /// Creates a dataset with one blank, editable row per category.
    pub fn blank(metadata: Metadata) -> Self {
        let mut dataset = Self::new(metadata);
        dataset.ensure_rows();
        dataset
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, category: CategoryId) -> &Section {
        &self.sections[category.index()]
    }

    pub fn section_mut(&mut self, category: CategoryId) -> &mut Section {
        &mut self.sections[category.index()]
    }

    /// Replaces the rows of `category`.
    pub fn set_items(&mut self, category: CategoryId, items: Vec<LineItem>) {
        self.sections[category.index()] = Section::with_items(category, items);
    }

    /// Gives every empty section a single blank row.
    pub fn ensure_rows(&mut self) {
        self.sections.iter_mut().for_each(Section::ensure_row);
    }

    /// Recomputes every section, returning the totals in form order.
    pub fn recompute(&mut self) -> Vec<Totals> {
        self.sections.iter_mut().map(calc::recompute).collect()
    }

    /// Counts the rows that carry a name across all sections.
    pub fn named_items(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.items())
            .filter(|i| i.has_name())
            .count()
    }

    /// Whether any user-entered field of any row holds a value.
    pub fn has_content(&self) -> bool {
        self.sections.iter().any(|s| {
            let schema = s.schema();
            s.items().iter().any(|i| i.has_raw_content(schema))
        })
    }
}
