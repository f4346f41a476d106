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

const FILE_SLOT: &str = "file";
const LINK_FIELD: &str = "link";

/// Where a study material lives: an uploaded file or an external link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MaterialSource {
    Uploaded { asset: AssetRef },
    Linked { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudyMaterial {
    pub id: Uuid,
    pub department: String,
    pub subject: String,
    pub title: String,
    pub semester: Option<u8>,
    pub source: MaterialSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct StudyMaterialDraft {
    #[validate(length(min = 1, max = 128))]
    pub department: String,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(range(min = 1, max = 12, message = "Semester must be 1-12"))]
    pub semester: Option<u8>,
    /// Set for linked material; `None` means the `file` slot carries it
    #[validate(url(message = "Link must be a valid URL"))]
    pub link: Option<String>,
}

#[derive(Debug, Default, Validate)]
pub struct StudyMaterialPatch {
    #[validate(length(min = 1, max = 128))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(range(min = 1, max = 12, message = "Semester must be 1-12"))]
    pub semester: Option<u8>,
    #[validate(url(message = "Link must be a valid URL"))]
    pub link: Option<String>,
}

/// Exactly one of a file and a link may be given; `required` demands one
fn check_source(intake: &UploadIntake, required: bool) -> Result<()> {
    let has_file = intake.has_file(FILE_SLOT);
    let has_link = intake.fields.contains(LINK_FIELD);

    match (has_file, has_link) {
        (true, true) => Err(AppError::Validation(
            "Provide either a file or a link, not both".to_string(),
        )),
        (false, false) if required => Err(AppError::Validation(
            "Either a file or a link is required".to_string(),
        )),
        _ => Ok(()),
    }
}

impl Document for StudyMaterial {
    const COLLECTION: &'static str = "study_materials";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for StudyMaterial {
    type Draft = StudyMaterialDraft;
    type Patch = StudyMaterialPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "study-material",
        required_fields: &["department", "subject", "title"],
        slots: &[AssetSlot::optional(FILE_SLOT, AssetKind::Auto)],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        check_source(intake, true)?;

        let fields = &intake.fields;
        validated(StudyMaterialDraft {
            department: fields.required("department")?,
            subject: fields.required("subject")?,
            title: fields.required("title")?,
            semester: fields.parse("semester")?,
            link: fields.text(LINK_FIELD),
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("study_materials", &[&draft.department, &draft.subject])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let source = match draft.link {
            Some(url) => MaterialSource::Linked { url },
            None => MaterialSource::Uploaded {
                asset: assets.require(FILE_SLOT)?,
            },
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            department: draft.department,
            subject: draft.subject,
            title: draft.title,
            semester: draft.semester,
            source,
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        check_source(intake, false)?;

        let fields = &intake.fields;
        validated(StudyMaterialPatch {
            department: fields.text("department"),
            subject: fields.text("subject"),
            title: fields.text("title"),
            semester: fields.parse("semester")?,
            link: fields.text(LINK_FIELD),
        })
    }

    /// A new file or link replaces the current source, whichever variant it is
    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(subject) = patch.subject {
            self.subject = subject;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if patch.semester.is_some() {
            self.semester = patch.semester;
        }

        if let Some(asset) = assets.take(FILE_SLOT) {
            self.source = MaterialSource::Uploaded { asset };
        } else if let Some(url) = patch.link {
            self.source = MaterialSource::Linked { url };
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("study_materials", &[&self.department, &self.subject])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        match &self.source {
            MaterialSource::Uploaded { asset } => vec![asset],
            MaterialSource::Linked { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::staging::FormFields;
    use crate::shared::test_helpers::{staged_file, staging_area};
    use serde_json::json;

    fn fields() -> FormFields {
        [
            ("department", "CS"),
            ("subject", "Data Structures"),
            ("title", "Unit 1 notes"),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_file_and_link_are_exclusive() {
        let (_dir, staging) = staging_area();
        let mut fields = fields();
        fields.insert("link", "https://example.edu/notes");
        let intake = UploadIntake::new(fields).with_file("file", staged_file(&staging, "n.pdf").await);

        let err = StudyMaterial::parse_draft(&intake).unwrap_err();

        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_source_is_required_on_create() {
        let err = StudyMaterial::parse_draft(&UploadIntake::new(fields())).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_linked_material_owns_no_assets() {
        let mut fields = fields();
        fields.insert("link", "https://example.edu/notes");
        let draft = StudyMaterial::parse_draft(&UploadIntake::new(fields)).unwrap();
        assert_eq!(
            StudyMaterial::draft_folder(&draft),
            "study_materials/cs/data_structures"
        );

        let material = StudyMaterial::assemble(draft, AssetSet::default()).unwrap();

        assert!(material.owned_assets().is_empty());
        assert_eq!(
            serde_json::to_value(&material.source).unwrap(),
            json!({"type": "linked", "url": "https://example.edu/notes"})
        );
    }

    #[test]
    fn test_invalid_link_rejected() {
        let mut fields = fields();
        fields.insert("link", "not a url");

        assert!(StudyMaterial::parse_draft(&UploadIntake::new(fields)).is_err());
    }
}
