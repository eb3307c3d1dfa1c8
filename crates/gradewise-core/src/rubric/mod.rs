//! Rubric descriptors.
//!
//! Rubrics are structured data validated against an embedded JSON Schema.
//! This module handles parsing YAML/JSON rubrics and resolving their
//! grading scale, including the legacy `grading_scale_type` form.

mod descriptor;
mod schema;

pub use descriptor::{Criterion, RubricDescriptor, RubricError};
pub use schema::validate_rubric_schema;
