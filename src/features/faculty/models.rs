use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::Result;
use crate::features::assets::{AssetEntity, AssetRef, AssetSet, AssetSlot, EntityDescriptor};
use crate::modules::records::Document;
use crate::modules::staging::UploadIntake;
use crate::modules::storage::{folder_path, AssetKind};
use crate::shared::validation::validated;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Faculty {
    pub id: Uuid,
    pub department: String,
    pub name: String,
    pub designation: String,
    pub qualification: Option<String>,
    pub email: Option<String>,
    pub photo: Option<AssetRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct FacultyDraft {
    #[validate(length(min = 1, max = 128, message = "Department must be 1-128 characters"))]
    pub department: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 128, message = "Designation must be 1-128 characters"))]
    pub designation: String,
    pub qualification: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Default, Validate)]
pub struct FacultyPatch {
    #[validate(length(min = 1, max = 128, message = "Department must be 1-128 characters"))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 128, message = "Designation must be 1-128 characters"))]
    pub designation: Option<String>,
    pub qualification: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Drop the current photo without replacing it
    pub remove_photo: bool,
}

impl Document for Faculty {
    const COLLECTION: &'static str = "faculty";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for Faculty {
    type Draft = FacultyDraft;
    type Patch = FacultyPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "faculty",
        required_fields: &["department", "name", "designation"],
        slots: &[AssetSlot::optional("photo", AssetKind::Image)],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        validated(FacultyDraft {
            department: fields.required("department")?,
            name: fields.required("name")?,
            designation: fields.required("designation")?,
            qualification: fields.text("qualification"),
            email: fields.text("email"),
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("faculty", &[&draft.department])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            department: draft.department,
            name: draft.name,
            designation: draft.designation,
            qualification: draft.qualification,
            email: draft.email,
            photo: assets.take("photo"),
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(FacultyPatch {
            department: fields.text("department"),
            name: fields.text("name"),
            designation: fields.text("designation"),
            qualification: fields.text("qualification"),
            email: fields.text("email"),
            remove_photo: fields.parse("remove_photo")?.unwrap_or(false),
        })
    }

    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(designation) = patch.designation {
            self.designation = designation;
        }
        if patch.qualification.is_some() {
            self.qualification = patch.qualification;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.remove_photo {
            self.photo = None;
        }
        if let Some(photo) = assets.take("photo") {
            self.photo = Some(photo);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("faculty", &[&self.department])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        self.photo.iter().collect()
    }
}
