use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::assets::{AssetEntity, AssetRef, AssetSet, AssetSlot, EntityDescriptor};
use crate::modules::records::Document;
use crate::modules::staging::UploadIntake;
use crate::modules::storage::{folder_path, AssetKind};
use crate::shared::validation::validated;

/// Syllabus PDF for one semester of a programme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Syllabus {
    pub id: Uuid,
    pub department: String,
    pub programme: String,
    pub semester: u8,
    pub regulation: Option<String>,
    pub pdf: AssetRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct SyllabusDraft {
    #[validate(length(min = 1, max = 128))]
    pub department: String,
    #[validate(length(min = 1, max = 255))]
    pub programme: String,
    #[validate(range(min = 1, max = 12, message = "Semester must be 1-12"))]
    pub semester: u8,
    pub regulation: Option<String>,
}

#[derive(Debug, Default, Validate)]
pub struct SyllabusPatch {
    #[validate(length(min = 1, max = 128))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub programme: Option<String>,
    #[validate(range(min = 1, max = 12, message = "Semester must be 1-12"))]
    pub semester: Option<u8>,
    pub regulation: Option<String>,
}

impl Document for Syllabus {
    const COLLECTION: &'static str = "syllabi";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for Syllabus {
    type Draft = SyllabusDraft;
    type Patch = SyllabusPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "syllabus",
        required_fields: &["department", "programme", "semester"],
        slots: &[AssetSlot::required("pdf", AssetKind::Document)],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        let semester: u8 = fields
            .parse("semester")?
            .ok_or_else(|| AppError::Validation("Field 'semester' is required".into()))?;

        validated(SyllabusDraft {
            department: fields.required("department")?,
            programme: fields.required("programme")?,
            semester,
            regulation: fields.text("regulation"),
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("syllabus", &[&draft.department])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            department: draft.department,
            programme: draft.programme,
            semester: draft.semester,
            regulation: draft.regulation,
            pdf: assets.require("pdf")?,
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(SyllabusPatch {
            department: fields.text("department"),
            programme: fields.text("programme"),
            semester: fields.parse("semester")?,
            regulation: fields.text("regulation"),
        })
    }

    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(programme) = patch.programme {
            self.programme = programme;
        }
        if let Some(semester) = patch.semester {
            self.semester = semester;
        }
        if patch.regulation.is_some() {
            self.regulation = patch.regulation;
        }
        if let Some(pdf) = assets.take("pdf") {
            self.pdf = pdf;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("syllabus", &[&self.department])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        vec![&self.pdf]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::staging::FormFields;

    #[test]
    fn test_semester_must_be_numeric() {
        let fields: FormFields = [
            ("department", "Civil"),
            ("programme", "B.E. Civil Engineering"),
            ("semester", "third"),
        ]
        .into_iter()
        .collect();

        let err = Syllabus::parse_draft(&UploadIntake::new(fields)).unwrap_err();

        assert!(err.to_string().contains("semester"));
    }

    #[test]
    fn test_semester_range() {
        let fields: FormFields = [
            ("department", "Civil"),
            ("programme", "B.E. Civil Engineering"),
            ("semester", "13"),
        ]
        .into_iter()
        .collect();

        assert!(Syllabus::parse_draft(&UploadIntake::new(fields)).is_err());
    }
}
