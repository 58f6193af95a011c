//! Invoice reference extraction from free-text gateway fields.
//!
//! The gateway echoes our reference back inside a human-edited notes field,
//! so the `Provider:{uuid}` marker can be surrounded by arbitrary text. Every
//! occurrence is tried until one parses.

use uuid::Uuid;

use numera_shared::types::InvoiceId;

/// The marker preceding the invoice id in the notes field.
const REFERENCE_MARKER: &str = "Provider:";

/// Length of a canonical hyphenated UUID.
const UUID_LEN: usize = 36;

/// Scans a free-text notes field for a `Provider:{uuid}` reference.
///
/// Returns the first occurrence that parses as a UUID, or `None`.
#[must_use]
pub fn extract_invoice_reference(notes: &str) -> Option<InvoiceId> {
    let mut rest = notes;
    while let Some(pos) = rest.find(REFERENCE_MARKER) {
        let after = rest[pos + REFERENCE_MARKER.len()..].trim_start();
        if after.len() >= UUID_LEN {
            if let Ok(uuid) = Uuid::parse_str(&after[..UUID_LEN]) {
                return Some(InvoiceId::from_uuid(uuid));
            }
        }
        rest = &rest[pos + REFERENCE_MARKER.len()..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0192d7c8-1111-7000-8000-000000000042";

    #[test]
    fn test_extracts_bare_reference() {
        let notes = format!("Provider:{ID}");
        let found = extract_invoice_reference(&notes).unwrap();
        assert_eq!(found.to_string(), ID);
    }

    #[test]
    fn test_extracts_reference_inside_prose() {
        let notes = format!("Renewal for March. Provider:{ID} -- collected via portal.");
        assert!(extract_invoice_reference(&notes).is_some());
    }

    #[test]
    fn test_tolerates_space_after_marker() {
        let notes = format!("Provider: {ID}");
        assert!(extract_invoice_reference(&notes).is_some());
    }

    #[test]
    fn test_skips_broken_marker_and_finds_later_one() {
        let notes = format!("Provider:not-a-uuid then Provider:{ID}");
        assert!(extract_invoice_reference(&notes).is_some());
    }

    #[test]
    fn test_missing_marker_yields_none() {
        assert!(extract_invoice_reference("no reference here").is_none());
    }

    #[test]
    fn test_truncated_uuid_yields_none() {
        assert!(extract_invoice_reference("Provider:0192d7c8-1111").is_none());
    }

    #[test]
    fn test_empty_notes_yields_none() {
        assert!(extract_invoice_reference("").is_none());
    }
}
