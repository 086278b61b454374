//! Simulated invoice documents for the reference runtime.
//!
//! All data in this module is hardcoded and fictional.

use serde_json::{json, Value};

// ── Invoice table (mock) ──────────────────────────────────────────────────────

struct MockInvoice {
    number: &'static str,
    vendor: &'static str,
    date: &'static str,
    lines: &'static [(&'static str, u32, f64)],
}

const INVOICES: &[MockInvoice] = &[
    MockInvoice {
        number: "INV-1",
        vendor: "Harbor Office Supply",
        date: "2026-03-02",
        lines: &[("Copy paper, 10 reams", 1, 60.0), ("Toner cartridge", 1, 40.0)],
    },
    MockInvoice {
        number: "INV-2",
        vendor: "Northgate Logistics",
        date: "2026-03-09",
        lines: &[("Pallet freight, zone 3", 3, 450.0), ("Liftgate fee", 1, 75.5)],
    },
    MockInvoice {
        number: "INV-3",
        vendor: "Cedar Ridge IT Services",
        date: "2026-03-15",
        lines: &[("Monthly support retainer", 1, 1800.0)],
    },
];

fn find(number: &str) -> Option<&'static MockInvoice> {
    INVOICES.iter().find(|inv| inv.number.eq_ignore_ascii_case(number))
}

/// Invoice numbers known to the mock tables.
pub fn known_invoices() -> Vec<&'static str> {
    INVOICES.iter().map(|inv| inv.number).collect()
}

/// The raw text of an invoice, as a scanner or email body would deliver it.
///
/// Unknown numbers yield a document with no line items.
pub fn invoice_document(number: &str) -> String {
    let Some(inv) = find(number) else {
        return format!("INVOICE {number}\n(no line items)\n");
    };

    let mut doc = format!("INVOICE {}\nFrom: {}\nDate: {}\n\n", inv.number, inv.vendor, inv.date);
    for (desc, qty, unit) in inv.lines {
        doc.push_str(&format!("{desc:<32} {qty:>3} x {unit:>9.2}\n"));
    }
    doc.push_str(&format!("\nTOTAL DUE: {:.2}\n", total(inv)));
    doc
}

fn total(inv: &MockInvoice) -> f64 {
    inv.lines.iter().map(|(_, qty, unit)| f64::from(*qty) * unit).sum()
}

/// The structured fields an extraction model should return for `number`.
pub fn extracted_invoice(number: &str) -> Option<Value> {
    let inv = find(number)?;
    let line_items: Vec<Value> = inv
        .lines
        .iter()
        .map(|(desc, qty, unit)| json!({ "description": desc, "quantity": qty, "unit_price": unit }))
        .collect();
    Some(json!({
        "invoice_number": inv.number,
        "vendor": inv.vendor,
        "date": inv.date,
        "total": total(inv),
        "line_items": line_items,
    }))
}

/// Pull the first `INV-<digits>` token out of free text.
pub fn find_invoice_number(text: &str) -> Option<String> {
    let start = text.find("INV-")?;
    let digits: String = text[start + 4..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("INV-{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_mentions_number_and_total() {
        let doc = invoice_document("INV-1");
        assert!(doc.starts_with("INVOICE INV-1"));
        assert!(doc.contains("TOTAL DUE: 100.00"));
    }

    #[test]
    fn extraction_matches_document() {
        let inv = extracted_invoice("inv-2").unwrap();
        assert_eq!(inv["invoice_number"], json!("INV-2"));
        assert_eq!(inv["total"], json!(1425.5));
        assert_eq!(inv["line_items"].as_array().unwrap().len(), 2);
        assert!(extracted_invoice("INV-404").is_none());
    }

    #[test]
    fn finds_invoice_number_in_text() {
        assert_eq!(find_invoice_number("please process INV-3 today"), Some("INV-3".to_string()));
        assert_eq!(find_invoice_number("INV-x"), None);
        assert_eq!(find_invoice_number("nothing here"), None);
    }
}
