//! Extracted visitor record and user edits

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Length of the national identity number
pub const ID_NUMBER_LEN: usize = 16;

static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("failed to compile regex")
});

/// Structured fields read off an ID card. Unmatched fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedRecord {
    /// 16-digit national identity number (NIK)
    pub id_number: String,
    pub full_name: String,
    pub birthplace: String,
    /// `DD-MM-YYYY`
    pub birth_date: String,
    pub address: String,
}

impl ExtractedRecord {
    /// True when the id number is a clean 16-digit value: the only signal that
    /// ends a scan
    pub fn is_confident(&self) -> bool {
        is_valid_id_number(&self.id_number)
    }

    pub fn get(&self, field: RecordField) -> &str {
        match field {
            RecordField::IdNumber => &self.id_number,
            RecordField::FullName => &self.full_name,
            RecordField::Birthplace => &self.birthplace,
            RecordField::BirthDate => &self.birth_date,
            RecordField::Address => &self.address,
        }
    }

    /// Apply a user correction in place
    pub fn apply_edit(&mut self, edit: RecordEdit) {
        let RecordEdit { field, value } = edit;
        let value = match field {
            RecordField::BirthDate => normalize_birth_date(&value),
            _ => value.trim().to_string(),
        };
        match field {
            RecordField::IdNumber => self.id_number = value,
            RecordField::FullName => self.full_name = value,
            RecordField::Birthplace => self.birthplace = value,
            RecordField::BirthDate => self.birth_date = value,
            RecordField::Address => self.address = value,
        }
    }
}

/// Exactly 16 ASCII digits
pub fn is_valid_id_number(value: &str) -> bool {
    value.len() == ID_NUMBER_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

/// Accept `YYYY-MM-DD` from date pickers and store it as `DD-MM-YYYY`
fn normalize_birth_date(value: &str) -> String {
    let value = value.trim();
    match ISO_DATE_RE.captures(value) {
        Some(caps) => format!("{}-{}-{}", &caps[3], &caps[2], &caps[1]),
        None => value.to_string(),
    }
}

/// Editable record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    IdNumber,
    FullName,
    Birthplace,
    BirthDate,
    Address,
}

impl RecordField {
    pub const ALL: [RecordField; 5] = [
        RecordField::IdNumber,
        RecordField::FullName,
        RecordField::Birthplace,
        RecordField::BirthDate,
        RecordField::Address,
    ];

    /// Form label
    pub fn label(&self) -> &'static str {
        match self {
            RecordField::IdNumber => "NIK",
            RecordField::FullName => "Nama",
            RecordField::Birthplace => "Tempat Lahir",
            RecordField::BirthDate => "Tanggal Lahir",
            RecordField::Address => "Alamat",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "nik" | "id_number" | "id" => Ok(RecordField::IdNumber),
            "nama" | "name" | "full_name" => Ok(RecordField::FullName),
            "tempat_lahir" | "tempatlahir" | "birthplace" => Ok(RecordField::Birthplace),
            "tanggal_lahir" | "tanggallahir" | "birth_date" | "dob" => Ok(RecordField::BirthDate),
            "alamat" | "address" => Ok(RecordField::Address),
            other => Err(format!(
                "unknown field '{other}' \
                 (expected nik, nama, tempat_lahir, tanggal_lahir or alamat)"
            )),
        }
    }
}

/// A single field correction, parsed from `FIELD=VALUE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEdit {
    pub field: RecordField,
    pub value: String,
}

impl FromStr for RecordEdit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
        Ok(RecordEdit {
            field: field.parse()?,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_id_number() {
        assert!(is_valid_id_number("3275010101900001"));
        assert!(!is_valid_id_number("327501010190000"));
        assert!(!is_valid_id_number("32750101019000012"));
        assert!(!is_valid_id_number("327501010190000O"));
        assert!(!is_valid_id_number(""));
    }

    #[test]
    fn test_default_record_has_all_fields_empty() {
        let record = ExtractedRecord::default();
        for field in RecordField::ALL {
            assert_eq!(record.get(field), "");
        }
        assert!(!record.is_confident());
    }

    #[test]
    fn test_parse_edit() {
        let edit: RecordEdit = "nama=Budi Santoso".parse().unwrap();
        assert_eq!(edit.field, RecordField::FullName);
        assert_eq!(edit.value, "Budi Santoso");

        let edit: RecordEdit = "alamat=JL A = B".parse().unwrap();
        assert_eq!(edit.value, "JL A = B");

        assert!("nama".parse::<RecordEdit>().is_err());
        assert!("golongan_darah=O".parse::<RecordEdit>().is_err());
    }

    #[test]
    fn test_field_aliases() {
        assert_eq!("NIK".parse::<RecordField>().unwrap(), RecordField::IdNumber);
        assert_eq!("birth-date".parse::<RecordField>().unwrap(), RecordField::BirthDate);
        assert_eq!("tempat_lahir".parse::<RecordField>().unwrap(), RecordField::Birthplace);
    }

    #[test]
    fn test_apply_edit_trims() {
        let mut record = ExtractedRecord::default();
        record.apply_edit(RecordEdit {
            field: RecordField::IdNumber,
            value: " 3275010101900001 ".to_string(),
        });
        assert_eq!(record.id_number, "3275010101900001");
        assert!(record.is_confident());
    }

    #[test]
    fn test_birth_date_edit_accepts_iso() {
        let mut record = ExtractedRecord::default();
        record.apply_edit("tanggal_lahir=1985-08-17".parse().unwrap());
        assert_eq!(record.birth_date, "17-08-1985");

        record.apply_edit("tanggal_lahir=17-08-1985".parse().unwrap());
        assert_eq!(record.birth_date, "17-08-1985");

        record.apply_edit("tanggal_lahir=".parse().unwrap());
        assert_eq!(record.birth_date, "");
    }

    #[test]
    fn test_record_json_uses_field_names() {
        let record = ExtractedRecord {
            id_number: "3275010101900001".to_string(),
            full_name: "BUDI".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id_number"], "3275010101900001");
        assert_eq!(json["address"], "");

        let parsed: ExtractedRecord = serde_json::from_str(r#"{"full_name":"SITI"}"#).unwrap();
        assert_eq!(parsed.full_name, "SITI");
        assert_eq!(parsed.id_number, "");
    }
}
