//! Record set transcoding for the bulk submission endpoint
//!
//! The registrar reads and writes host records under different field names:
//! a fetched record arrives as
//!
//! ```text
//! { Name: "@", Type: "URL", Address: "...", MXPref: "10", TTL: "100" }
//! ```
//!
//! but must be submitted back as
//!
//! ```text
//! { HostName: "@", RecordType: "URL", Address: "...", MXPref: "10", TTL: "100" }
//! ```
//!
//! and the submission endpoint identifies repeated records by parallel
//! numbered parameter families (`HostName1`, `HostName2`, ...) rather than
//! nested structures. This module owns both transforms.

use dockdns_core::traits::HostRecord;

/// Ordered wire fields of one record
pub type FieldMap = Vec<(String, String)>;

/// Fields that are never position-suffixed in the numbered encoding
const NO_SUFFIX_FIELDS: &[&str] = &["EmailType"];

/// Read-shape → write-shape field renames
const READ_TO_WRITE: &[(&str, &str)] = &[("Name", "HostName"), ("Type", "RecordType")];

/// The read-shape wire fields of a host record
pub fn read_fields(record: &HostRecord) -> FieldMap {
    vec![
        ("Name".to_string(), record.name.clone()),
        ("Type".to_string(), record.record_type.as_wire().to_string()),
        ("Address".to_string(), record.address.clone()),
        ("MXPref".to_string(), record.mx_pref.to_string()),
        ("TTL".to_string(), record.ttl.to_string()),
    ]
}

/// Apply the fixed read→write rename table.
///
/// Fields absent from the table pass through unchanged. Idempotent: a
/// record that was already renamed has no source keys left to rename.
pub fn rename_read_to_write(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(key, value)| {
            match READ_TO_WRITE.iter().find(|(from, _)| *from == key) {
                Some((_, to)) => ((*to).to_string(), value),
                None => (key, value),
            }
        })
        .collect()
}

/// Flatten a sequence of records into numbered parameters.
///
/// Each field key gains a 1-based suffix reflecting the record's position,
/// except keys in the do-not-suffix allowlist, which are emitted as-is.
pub fn to_numbered_params(records: &[FieldMap]) -> FieldMap {
    records
        .iter()
        .enumerate()
        .flat_map(|(index, fields)| {
            fields.iter().map(move |(key, value)| {
                if NO_SUFFIX_FIELDS.contains(&key.as_str()) {
                    (key.clone(), value.clone())
                } else {
                    (format!("{}{}", key, index + 1), value.clone())
                }
            })
        })
        .collect()
}

/// Full submission encoding: read fields → write renames → numbering
pub fn write_params(records: &[HostRecord]) -> FieldMap {
    let write_shapes: Vec<FieldMap> = records
        .iter()
        .map(|record| rename_read_to_write(read_fields(record)))
        .collect();

    to_numbered_params(&write_shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockdns_core::traits::RecordType;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn numbering_suffixes_by_position() {
        let numbered = to_numbered_params(&[
            fields(&[("HostName", "a")]),
            fields(&[("HostName", "b")]),
        ]);

        assert_eq!(numbered, fields(&[("HostName1", "a"), ("HostName2", "b")]));
    }

    #[test]
    fn numbering_handles_heterogeneous_records() {
        let numbered = to_numbered_params(&[
            fields(&[("foo", "bar"), ("cat", "purr")]),
            fields(&[("foo", "buz")]),
            fields(&[("cat", "meow")]),
        ]);

        assert_eq!(
            numbered,
            fields(&[
                ("foo1", "bar"),
                ("cat1", "purr"),
                ("foo2", "buz"),
                ("cat3", "meow"),
            ])
        );
    }

    #[test]
    fn allowlisted_fields_are_never_suffixed() {
        let numbered = to_numbered_params(&[fields(&[
            ("HostName", "@"),
            ("EmailType", "MX"),
        ])]);

        assert_eq!(numbered, fields(&[("HostName1", "@"), ("EmailType", "MX")]));
    }

    #[test]
    fn rename_converts_read_shape_to_write_shape() {
        let renamed = rename_read_to_write(fields(&[
            ("Name", "@"),
            ("Type", "URL"),
            ("Address", "http://news.ycombinator.com"),
        ]));

        assert_eq!(
            renamed,
            fields(&[
                ("HostName", "@"),
                ("RecordType", "URL"),
                ("Address", "http://news.ycombinator.com"),
            ])
        );
    }

    #[test]
    fn rename_is_idempotent() {
        let once = rename_read_to_write(fields(&[("Name", "@"), ("Type", "URL")]));
        let twice = rename_read_to_write(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn write_params_composes_rename_and_numbering() {
        let records = vec![
            HostRecord {
                name: "@".to_string(),
                record_type: RecordType::Url,
                address: "http://example.com".to_string(),
                mx_pref: 10,
                ttl: 100,
            },
            HostRecord::a_record("app", "1.2.3.4"),
        ];

        let params = write_params(&records);

        assert!(params.contains(&("HostName1".to_string(), "@".to_string())));
        assert!(params.contains(&("RecordType1".to_string(), "URL".to_string())));
        assert!(params.contains(&("HostName2".to_string(), "app".to_string())));
        assert!(params.contains(&("Address2".to_string(), "1.2.3.4".to_string())));
        assert!(params.contains(&("TTL2".to_string(), "1799".to_string())));
        // No read-shape key survives.
        assert!(!params.iter().any(|(k, _)| k.starts_with("Name")));
    }
}
