// apps/hospital_app/src/services/pdf.rs

//! Prescription rendering with `printpdf`. Builtin Helvetica only, A4 pages,
//! a fresh page whenever the cursor reaches the bottom margin.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use serde::Serialize;
use std::io::BufWriter;
use tracing::{debug, instrument};

use crate::errors::AppError;
use crate::models::{Prescription, PrescriptionMedicine, PrescriptionTest};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const INDENT: f32 = 25.0;
const WRAP_CHARS: usize = 90;

/// Everything printed on a prescription, already flattened to text.
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionDocument {
  pub title: String,
  pub patient_name: String,
  pub doctor_name: String,
  pub issued_on: String,
  pub medicines: Vec<String>,
  pub tests: Vec<String>,
  pub extra_information: Option<String>,
}

impl PrescriptionDocument {
  pub fn build(
    prescription: &Prescription,
    patient_name: Option<&str>,
    doctor_name: Option<&str>,
    medicines: &[PrescriptionMedicine],
    tests: &[PrescriptionTest],
  ) -> Self {
    let medicines = medicines
      .iter()
      .map(|m| {
        let details: Vec<&str> = [&m.quantity, &m.dosage, &m.frequency, &m.duration, &m.instruction]
          .into_iter()
          .filter_map(|v| v.as_deref())
          .filter(|v| !v.trim().is_empty())
          .collect();
        if details.is_empty() {
          m.medicine_name.clone()
        } else {
          format!("{} ({})", m.medicine_name, details.join(", "))
        }
      })
      .collect();
    let tests = tests
      .iter()
      .map(|t| match t.description.as_deref() {
        Some(d) if !d.trim().is_empty() => format!("{}: {}", t.test_name, d),
        _ => t.test_name.clone(),
      })
      .collect();
    Self {
      title: "Prescription".to_string(),
      patient_name: patient_name.unwrap_or("Unknown patient").to_string(),
      doctor_name: doctor_name.unwrap_or("Unknown doctor").to_string(),
      issued_on: prescription.created_at.format("%Y-%m-%d").to_string(),
      medicines,
      tests,
      extra_information: prescription.extra_information.clone(),
    }
  }
}

struct Cursor<'a> {
  doc: &'a PdfDocumentReference,
  layer: PdfLayerReference,
  y: f32,
  pages: usize,
}

impl Cursor<'_> {
  fn write(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef, advance: f32) {
    if self.y - advance < BOTTOM {
      let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
      self.layer = self.doc.get_page(page).get_layer(layer);
      self.y = TOP;
      self.pages += 1;
    }
    self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    self.y -= advance;
  }

  fn gap(&mut self, mm: f32) {
    self.y -= mm;
  }
}

fn pdf_err(stage: &str) -> impl Fn(printpdf::Error) -> AppError + '_ {
  move |e| AppError::Pdf(format!("{stage}: {e}"))
}

#[instrument(name = "pdf::render_prescription_pdf", skip_all, fields(medicines = doc.medicines.len(), tests = doc.tests.len()))]
pub fn render_prescription_pdf(doc: &PrescriptionDocument) -> Result<Vec<u8>, AppError> {
  let (pdf, page1, layer1) = PdfDocument::new(&doc.title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
  let font = pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err("font"))?;
  let bold = pdf.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err("font"))?;

  let mut cursor = Cursor {
    doc: &pdf,
    layer: pdf.get_page(page1).get_layer(layer1),
    y: TOP,
    pages: 1,
  };

  cursor.write(&doc.title, 16.0, LEFT, &bold, 10.0);
  cursor.write(&format!("Patient: {}", doc.patient_name), 10.0, LEFT, &font, 5.0);
  cursor.write(&format!("Doctor: {}", doc.doctor_name), 10.0, LEFT, &font, 5.0);
  cursor.write(&format!("Date: {}", doc.issued_on), 10.0, LEFT, &font, 5.0);
  cursor.gap(6.0);

  cursor.write("MEDICINES:", 11.0, LEFT, &bold, 6.0);
  if doc.medicines.is_empty() {
    cursor.write("None", 9.0, INDENT, &font, 4.5);
  }
  for (i, medicine) in doc.medicines.iter().enumerate() {
    for line in wrap_text(&format!("{}. {}", i + 1, medicine), WRAP_CHARS) {
      cursor.write(&line, 9.0, INDENT, &font, 4.5);
    }
  }
  cursor.gap(4.0);

  cursor.write("TESTS:", 11.0, LEFT, &bold, 6.0);
  if doc.tests.is_empty() {
    cursor.write("None", 9.0, INDENT, &font, 4.5);
  }
  for (i, test) in doc.tests.iter().enumerate() {
    for line in wrap_text(&format!("{}. {}", i + 1, test), WRAP_CHARS) {
      cursor.write(&line, 9.0, INDENT, &font, 4.5);
    }
  }

  if let Some(extra) = doc.extra_information.as_deref().filter(|e| !e.trim().is_empty()) {
    cursor.gap(4.0);
    cursor.write("NOTES:", 11.0, LEFT, &bold, 6.0);
    for line in wrap_text(extra, WRAP_CHARS) {
      cursor.write(&line, 9.0, INDENT, &font, 4.5);
    }
  }

  let pages = cursor.pages;
  drop(cursor);

  let mut buf = BufWriter::new(Vec::new());
  pdf.save(&mut buf).map_err(pdf_err("save"))?;
  let bytes = buf
    .into_inner()
    .map_err(|e| AppError::Pdf(format!("buffer: {e}")))?;
  debug!(pages, bytes = bytes.len(), "Prescription PDF rendered.");
  Ok(bytes)
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();

  for word in text.split_whitespace() {
    if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
      lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(word);
  }
  if !current.is_empty() {
    lines.push(current);
  }
  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use uuid::Uuid;

  fn prescription(extra: Option<&str>) -> Prescription {
    Prescription {
      id: Uuid::new_v4(),
      patient_id: Uuid::new_v4(),
      doctor_id: Uuid::new_v4(),
      extra_information: extra.map(str::to_string),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn empty_prescription_is_still_a_pdf() {
    let doc = PrescriptionDocument::build(&prescription(None), None, None, &[], &[]);
    let bytes = render_prescription_pdf(&doc).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[test]
  fn long_prescription_spills_onto_more_pages() {
    let p = prescription(Some(&"Take with water. ".repeat(40)));
    let tests: Vec<PrescriptionTest> = (0..120)
      .map(|i| PrescriptionTest {
        id: Uuid::new_v4(),
        prescription_id: p.id,
        test_info_id: Uuid::new_v4(),
        test_name: format!("Panel {i}"),
        description: Some("fasting".to_string()),
      })
      .collect();
    let doc = PrescriptionDocument::build(&p, Some("Rahim"), Some("Dr. Karim"), &[], &tests);
    let long = render_prescription_pdf(&doc).unwrap();
    let short = render_prescription_pdf(&PrescriptionDocument::build(&p, None, None, &[], &[])).unwrap();
    assert!(long.starts_with(b"%PDF"));
    assert!(long.len() > short.len());
  }

  #[test]
  fn medicine_details_are_flattened() {
    let p = prescription(None);
    let med = PrescriptionMedicine {
      id: Uuid::new_v4(),
      prescription_id: p.id,
      medicine_name: "Napa".to_string(),
      quantity: Some("10".to_string()),
      dosage: Some("500mg".to_string()),
      frequency: None,
      duration: Some("".to_string()),
      instruction: Some("after meal".to_string()),
    };
    let doc = PrescriptionDocument::build(&p, None, None, &[med], &[]);
    assert_eq!(doc.medicines, vec!["Napa (10, 500mg, after meal)".to_string()]);
  }

  #[test]
  fn wrap_respects_width() {
    let lines = wrap_text("one two three four five", 9);
    assert_eq!(lines, vec!["one two", "three", "four five"]);
    assert_eq!(wrap_text("", 10), vec![String::new()]);
  }
}
