//! Spreadsheet export. Each category becomes a block of rows: the title, the field labels, one
//! row per line item and a totals row, followed by an empty separator row.

use crate::model::{plain, Dataset};
use crate::schema::label_for;
use crate::Result;
use anyhow::Context;

/// Writes `dataset` as CSV. Derived fields hold their computed values.
pub fn to_csv(dataset: &Dataset) -> Result<String> {
    let mut dataset = dataset.clone();
    let totals = dataset.recompute();

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let meta = dataset.metadata();
    writer.write_record([
        "機關",
        meta.org.as_str(),
        "年度",
        meta.year.as_str(),
        "填表人",
        meta.user.as_str(),
    ])?;
    writer.write_record([""])?;

    for (section, totals) in dataset.sections().iter().zip(&totals) {
        let schema = section.schema();
        writer.write_record([schema.title])?;
        writer.write_record(schema.fields.iter().map(|&k| label_for(schema.id, k).as_str()))?;
        for item in section.items().iter().filter(|i| i.has_name()) {
            writer.write_record(schema.fields.iter().map(|&k| item.text(k)))?;
        }
        let mut total_row = vec![String::from("合計")];
        total_row.extend(totals.iter().map(|(_, v)| plain(v)));
        writer.write_record(&total_row)?;
        writer.write_record([""])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("{}", e.error()))
        .context("Unable to finish writing CSV")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryId, FieldKey, LineItem, Metadata};

    #[test]
    fn test_to_csv() {
        let mut d = Dataset::new(Metadata::new("嘉義縣", "114", "陳先生"));
        d.set_items(
            CategoryId::Db,
            vec![
                LineItem::from_raw([
                    (FieldKey::Name, "債務基金"),
                    (FieldKey::Source, "500"),
                    (FieldKey::Use, "200"),
                    (FieldKey::Begin, "1000"),
                    (FieldKey::Remit, "50"),
                ]),
                LineItem::from_raw([(FieldKey::Source, "1")]),
            ],
        );
        let csv = to_csv(&d).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "機關,嘉義縣,年度,114,填表人,陳先生");
        assert!(lines.contains(&"三、債務基金"));
        assert!(lines.contains(&"基金名稱,基金來源,基金用途,本期賸餘(短絀),期初基金餘額,解繳公庫,期末基金餘額"));
        assert!(lines.contains(&"債務基金,500,200,300,1000,50,1250"));
        // the unnamed row is not listed but still counts towards the totals
        assert!(lines.contains(&"合計,501,200,301,1000,50,1251"));
    }
}
