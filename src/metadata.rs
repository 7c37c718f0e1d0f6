use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableMetadata {
    pub name: String,
    pub department: String,
    pub program: String,
    pub semester: u8,
    pub section: String,
}

impl Default for TimetableMetadata {
    fn default() -> Self {
        Self {
            name: "New Timetable".to_string(),
            department: "General".to_string(),
            program: "BS".to_string(),
            semester: 1,
            section: "A".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimetableMetadataError {
    BlankName,
    SemesterOutOfRange(u8),
}

impl fmt::Display for TimetableMetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimetableMetadataError::BlankName => write!(f, "timetable name must not be blank"),
            TimetableMetadataError::SemesterOutOfRange(semester) => {
                write!(f, "semester {semester} is outside 1-12")
            }
        }
    }
}

impl std::error::Error for TimetableMetadataError {}

impl TimetableMetadata {
    pub fn validate(&self) -> Result<(), TimetableMetadataError> {
        if self.name.trim().is_empty() {
            return Err(TimetableMetadataError::BlankName);
        }
        if !(1..=12).contains(&self.semester) {
            return Err(TimetableMetadataError::SemesterOutOfRange(self.semester));
        }
        Ok(())
    }

    /// "3rd Semester", "11th Semester".
    pub fn semester_label(&self) -> String {
        let suffix = match (self.semester % 10, self.semester % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        format!("{}{} Semester", self.semester, suffix)
    }
}
