//! Tabular export.
//!
//! One row per record. Absent attributes are empty cells. Every distinct
//! specification key becomes its own column after the fixed ones, in the
//! order keys were first seen across the batch. A key that matches a fixed
//! column is headed `spec:<key>`.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;

use garden_scrape_catalog_models::ItemRecord;

use crate::ExportError;

/// Fixed leading columns.
pub const BASE_COLUMNS: &[&str] = &[
    "name",
    "price",
    "sku",
    "description",
    "source_url",
    "image_url",
    "image_path",
];

/// Distinct specification keys across `records`, in first-seen order.
#[must_use]
pub fn spec_columns(records: &[ItemRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .flat_map(|r| r.specifications.iter().map(|(key, _)| key))
        .filter(|key| seen.insert(*key))
        .map(str::to_owned)
        .collect()
}

/// Header for a specification column.
#[must_use]
pub fn spec_header(key: &str) -> Cow<'_, str> {
    if BASE_COLUMNS.contains(&key) {
        Cow::Owned(format!("spec:{key}"))
    } else {
        Cow::Borrowed(key)
    }
}

fn row(record: &ItemRecord, spec_keys: &[String]) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut cells = vec![
        text(&record.name),
        text(&record.price),
        text(&record.sku),
        text(&record.description),
        record.source_url.clone(),
        text(&record.image_url),
        record
            .image_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    ];
    cells.extend(
        spec_keys
            .iter()
            .map(|key| record.specifications.get(key).unwrap_or_default().to_owned()),
    );
    cells
}

/// Writes `records` to `path` as CSV, replacing any existing file.
///
/// Returns the number of data rows written.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] if the file cannot be created or written.
pub fn write_csv(records: &[ItemRecord], path: &Path) -> Result<usize, ExportError> {
    let spec_keys = spec_columns(records);
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(
        BASE_COLUMNS
            .iter()
            .map(|column| Cow::Borrowed(*column))
            .chain(spec_keys.iter().map(|key| spec_header(key)))
            .map(Cow::into_owned),
    )?;
    for record in records {
        writer.write_record(row(record, &spec_keys))?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} row(s) with {} specification column(s) to {}",
        records.len(),
        spec_keys.len(),
        path.display()
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use garden_scrape_catalog_models::Specifications;

    use super::*;

    fn record(name: &str, specs: &[(&str, &str)]) -> ItemRecord {
        ItemRecord {
            name: Some(name.to_owned()),
            specifications: specs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<Specifications>(),
            ..ItemRecord::empty(&format!("https://shop.test/p/{name}"))
        }
    }

    #[test]
    fn spec_columns_keep_first_seen_order() {
        let records = vec![
            record("a", &[("Days", "60"), ("Height", "1m")]),
            record("b", &[("Spacing", "30cm"), ("Days", "55")]),
        ];
        assert_eq!(spec_columns(&records), vec!["Days", "Height", "Spacing"]);
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = std::env::temp_dir().join("garden_scrape_csv_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("items.csv");

        let mut first = record("Kale", &[("Days", "60")]);
        first.price = Some("$3.00".to_owned());
        first.image_path = Some(PathBuf::from("images/Kale.jpg"));
        let second = record("Basil, Genovese", &[("Height", "45cm")]);

        let rows = write_csv(&[first, second], &path).unwrap();
        assert_eq!(rows, 2);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines[0],
            "name,price,sku,description,source_url,image_url,image_path,Days,Height"
        );
        assert_eq!(
            lines[1],
            "Kale,$3.00,,,https://shop.test/p/Kale,,images/Kale.jpg,60,"
        );
        assert_eq!(
            lines[2],
            "\"Basil, Genovese\",,,,\"https://shop.test/p/Basil, Genovese\",,,,45cm"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn colliding_spec_keys_are_prefixed() {
        let dir = std::env::temp_dir().join("garden_scrape_csv_collide");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("items.csv");

        let mut item = record("Kale", &[("price", "bulk only"), ("Days", "60")]);
        item.price = Some("$3.00".to_owned());
        write_csv(&[item], &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines[0],
            "name,price,sku,description,source_url,image_url,image_path,spec:price,Days"
        );
        assert_eq!(
            lines[1],
            "Kale,$3.00,,,https://shop.test/p/Kale,,,bulk only,60"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_batch_writes_header_only() {
        let dir = std::env::temp_dir().join("garden_scrape_csv_empty");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("items.csv");

        assert_eq!(write_csv(&[], &path).unwrap(), 0);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            BASE_COLUMNS.join(",")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
