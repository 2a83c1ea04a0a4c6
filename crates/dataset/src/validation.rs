//! Consistency checks for COCO detection documents.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::model::CocoDataset;

/// Segments per annotation from which a warning is raised
pub const MANY_SEGMENTS: usize = 3;
/// Fewer coordinate values than this cannot form a usable polygon
pub const MIN_SEGMENT_VALUES: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueCode {
    DuplicateImageId,
    DuplicateAnnotationId,
    MissingImageRef,
    MissingCategoryRef,
    ManySegments,
    ShortSegment,
}

#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.severity, self.code, self.message)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// No errors; warnings allowed
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// Check id uniqueness, references and segment shapes.
pub fn validate_dataset(dataset: &CocoDataset) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut image_ids: HashMap<u64, usize> = HashMap::new();
    for (index, image) in dataset.images.iter().enumerate() {
        if let Some(first) = image_ids.insert(image.id, index) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "image id {} used by {} and {}",
                    image.id, dataset.images[first].file_name, image.file_name
                ),
            ));
        }
    }

    let category_ids: HashSet<u32> = dataset.categories.iter().map(|c| c.id).collect();
    let mut annotation_ids = HashSet::new();

    for annotation in &dataset.annotations {
        if !annotation_ids.insert(annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!("annotation id {} is not unique", annotation.id),
            ));
        }
        if !image_ids.contains_key(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!(
                    "annotation {} references missing image {}",
                    annotation.id, annotation.image_id
                ),
            ));
        }
        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "annotation {} references missing category {}",
                    annotation.id, annotation.category_id
                ),
            ));
        }

        if annotation.segmentation.len() >= MANY_SEGMENTS {
            report.add(ValidationIssue::warning(
                IssueCode::ManySegments,
                format!(
                    "annotation {} has {} segments",
                    annotation.id,
                    annotation.segmentation.len()
                ),
            ));
        }
        for segment in &annotation.segmentation {
            if segment.len() < MIN_SEGMENT_VALUES {
                report.add(ValidationIssue::warning(
                    IssueCode::ShortSegment,
                    format!(
                        "annotation {} has a segment with only {} values",
                        annotation.id,
                        segment.len()
                    ),
                ));
            }
        }
    }

    report
}
