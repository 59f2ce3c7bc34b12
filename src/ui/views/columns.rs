//! Table columns per screen. Each column reads one JSON pointer from a row.

use labq::resource::screens::ResourceSpec;

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub title: &'static str,
  pub pointer: &'static str,
  pub width: u16,
  /// Colour the cell by lab status
  pub status: bool,
}

const fn col(title: &'static str, pointer: &'static str, width: u16) -> Column {
  Column {
    title,
    pointer,
    width,
    status: false,
  }
}

const fn status_col(pointer: &'static str) -> Column {
  Column {
    title: "Status",
    pointer,
    width: 16,
    status: true,
  }
}

const REQUESTS: &[Column] = &[
  col("Order", "/orderNumber", 14),
  col("Patient", "/patient", 24),
  col("Urgency", "/urgency", 10),
  status_col("/status"),
  col("Requested", "/dateCreated", 20),
  col("Location", "/atLocation", 20),
];

const SAMPLES: &[Column] = &[
  col("Accession", "/accessionNumber", 14),
  col("Type", "/sampleType", 18),
  status_col("/status"),
  col("Collected", "/collectionDate", 20),
  col("Location", "/atLocation", 20),
  col("Tests", "/tests", 6),
];

const RESULTS: &[Column] = &[
  col("Order", "/orderNumber", 14),
  col("Test", "/testConcept", 24),
  col("Patient", "/patient", 24),
  status_col("/status"),
  col("Completed", "/completedDate", 20),
];

const WORKSHEETS: &[Column] = &[
  col("Worksheet", "/worksheetNo", 14),
  col("Test", "/testConcept", 24),
  status_col("/status"),
  col("Date", "/worksheetDate", 20),
  col("Responsible", "/responsiblePerson", 20),
];

const REFERRALS: &[Column] = &[
  col("Name", "/name", 28),
  col("Acronym", "/acronym", 10),
  col("Active", "/enabled", 8),
  col("System", "/system", 8),
];

const STORAGE: &[Column] = &[
  col("Name", "/name", 28),
  col("Location", "/atLocation", 24),
  col("Capacity", "/capacity", 10),
  col("Active", "/active", 8),
];

const FALLBACK: &[Column] = &[col("Name", "/display", 40), col("Uuid", "/uuid", 36)];

pub fn columns_for(spec: &ResourceSpec) -> &'static [Column] {
  match spec.name {
    "requests" => REQUESTS,
    "samples" => SAMPLES,
    "results" => RESULTS,
    "worksheets" => WORKSHEETS,
    "referrals" => REFERRALS,
    "storage" => STORAGE,
    _ => FALLBACK,
  }
}
