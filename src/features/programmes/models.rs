use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::Result;
use crate::features::assets::{AssetEntity, AssetRef, AssetSet, EntityDescriptor};
use crate::modules::records::Document;
use crate::modules::staging::UploadIntake;
use crate::modules::storage::folder_path;
use crate::shared::validation::validated;

/// Academic programme offered by a department. Carries no assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Programme {
    pub id: Uuid,
    pub department: String,
    pub name: String,
    /// Degree awarded, e.g. "B.Tech"
    pub degree: String,
    pub duration_years: Option<u8>,
    pub intake: Option<u32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct ProgrammeDraft {
    #[validate(length(min = 1, max = 128, message = "Department must be 1-128 characters"))]
    pub department: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "Degree must be 1-64 characters"))]
    pub degree: String,
    #[validate(range(min = 1, max = 10, message = "Duration must be 1-10 years"))]
    pub duration_years: Option<u8>,
    pub intake: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Validate)]
pub struct ProgrammePatch {
    #[validate(length(min = 1, max = 128, message = "Department must be 1-128 characters"))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Degree must be 1-64 characters"))]
    pub degree: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Duration must be 1-10 years"))]
    pub duration_years: Option<u8>,
    pub intake: Option<u32>,
    pub description: Option<String>,
}

impl Document for Programme {
    const COLLECTION: &'static str = "programmes";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for Programme {
    type Draft = ProgrammeDraft;
    type Patch = ProgrammePatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "programme",
        required_fields: &["department", "name", "degree"],
        slots: &[],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        validated(ProgrammeDraft {
            department: fields.required("department")?,
            name: fields.required("name")?,
            degree: fields.required("degree")?,
            duration_years: fields.parse("duration_years")?,
            intake: fields.parse("intake")?,
            description: fields.text("description"),
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("programmes", &[&draft.department])
    }

    fn assemble(draft: Self::Draft, _assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            department: draft.department,
            name: draft.name,
            degree: draft.degree,
            duration_years: draft.duration_years,
            intake: draft.intake,
            description: draft.description,
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(ProgrammePatch {
            department: fields.text("department"),
            name: fields.text("name"),
            degree: fields.text("degree"),
            duration_years: fields.parse("duration_years")?,
            intake: fields.parse("intake")?,
            description: fields.text("description"),
        })
    }

    fn apply(&mut self, patch: Self::Patch, _assets: AssetSet) -> Result<()> {
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(degree) = patch.degree {
            self.degree = degree;
        }
        if patch.duration_years.is_some() {
            self.duration_years = patch.duration_years;
        }
        if patch.intake.is_some() {
            self.intake = patch.intake;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("programmes", &[&self.department])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::modules::staging::FormFields;

    #[test]
    fn test_duration_is_range_checked() {
        let fields: FormFields = [
            ("department", "Mechanical"),
            ("name", "Mechanical Engineering"),
            ("degree", "B.E."),
            ("duration_years", "12"),
        ]
        .into_iter()
        .collect();

        let result = Programme::parse_draft(&UploadIntake::new(fields));

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let fields: FormFields = [
            ("department", "Mechanical"),
            ("name", "Mechanical Engineering"),
            ("degree", "B.E."),
            ("intake", "120"),
        ]
        .into_iter()
        .collect();
        let draft = Programme::parse_draft(&UploadIntake::new(fields)).unwrap();
        let mut programme = Programme::assemble(draft, AssetSet::default()).unwrap();

        let patch_fields: FormFields = [("degree", "B.Tech")].into_iter().collect();
        let patch = Programme::parse_patch(&UploadIntake::new(patch_fields)).unwrap();
        programme.apply(patch, AssetSet::default()).unwrap();

        assert_eq!(programme.degree, "B.Tech");
        assert_eq!(programme.intake, Some(120));
        assert_eq!(programme.name, "Mechanical Engineering");
    }
}
