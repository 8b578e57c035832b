//! Types that represent the core data model, such as `Dataset`, `Section` and `LineItem`.
mod amount;
mod category;
mod dataset;
mod field;
mod line_item;

pub use amount::{group_thousands, plain, strip_grouping, Amount, AmountError};
pub use category::CategoryId;
pub use dataset::{Dataset, Metadata, Section};
pub use field::FieldKey;
pub use line_item::{Cell, LineItem};
