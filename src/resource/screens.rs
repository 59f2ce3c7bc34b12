//! Laboratory list screens: endpoint path plus the closed set of filter
//! fields each screen may set.

use crate::filter::FilterField;

/// Aggregate counters shown on the lab dashboard. Invalidated (debounced)
/// whenever any list is refreshed.
pub const DASHBOARD_METRICS_PATH: &str = "/labmanagement/dashboard-metrics";

/// A paged collection endpoint and the filter fields it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
  /// Short name used by the command palette.
  pub name: &'static str,
  pub title: &'static str,
  pub path: &'static str,
  pub fields: &'static [FilterField],
}

impl ResourceSpec {
  pub fn field(&self, name: &str) -> Option<&'static FilterField> {
    self.fields.iter().find(|field| field.name == name)
  }
}

pub const TEST_REQUESTS: ResourceSpec = ResourceSpec {
  name: "requests",
  title: "Test Requests",
  path: "/labmanagement/test-request",
  fields: &[
    FilterField::text("status"),
    FilterField::text("urgency"),
    FilterField::text("patient"),
    FilterField::date("minActivatedDate"),
    FilterField::date("maxActivatedDate"),
    FilterField::flag("referredIn"),
  ],
};

pub const SAMPLES: ResourceSpec = ResourceSpec {
  name: "samples",
  title: "Samples",
  path: "/labmanagement/sample",
  fields: &[
    FilterField::text("status"),
    FilterField::text("location"),
    FilterField::date("minCollectionDate"),
    FilterField::date("maxCollectionDate"),
    FilterField::flag("includeTests"),
  ],
};

pub const TEST_RESULTS: ResourceSpec = ResourceSpec {
  name: "results",
  title: "Test Results",
  path: "/labmanagement/test-result",
  fields: &[
    FilterField::text("status"),
    FilterField::text("testConcept"),
    FilterField::date("minCompletedDate"),
    FilterField::date("maxCompletedDate"),
    FilterField::flag("pendingApproval"),
  ],
};

pub const WORKSHEETS: ResourceSpec = ResourceSpec {
  name: "worksheets",
  title: "Worksheets",
  path: "/labmanagement/worksheet",
  fields: &[
    FilterField::text("status"),
    FilterField::date("minDate"),
    FilterField::date("maxDate"),
  ],
};

pub const REFERRAL_LOCATIONS: ResourceSpec = ResourceSpec {
  name: "referrals",
  title: "Referral Locations",
  path: "/labmanagement/referral-location",
  fields: &[FilterField::flag("active"), FilterField::flag("system")],
};

pub const STORAGE: ResourceSpec = ResourceSpec {
  name: "storage",
  title: "Storage",
  path: "/labmanagement/storage",
  fields: &[FilterField::text("location"), FilterField::flag("active")],
};

/// Every list screen, in palette order.
pub const SCREENS: &[ResourceSpec] = &[
  TEST_REQUESTS,
  SAMPLES,
  TEST_RESULTS,
  WORKSHEETS,
  REFERRAL_LOCATIONS,
  STORAGE,
];

pub fn find_screen(name: &str) -> Option<&'static ResourceSpec> {
  SCREENS.iter().find(|screen| screen.name == name)
}
