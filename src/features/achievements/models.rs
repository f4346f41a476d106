use chrono::{DateTime, NaiveDate, Utc};
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

/// Departmental achievement: a certificate or report PDF plus a display image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Achievement {
    pub id: Uuid,
    pub department: String,
    pub title: String,
    pub description: Option<String>,
    pub achieved_on: Option<NaiveDate>,
    pub pdf: AssetRef,
    pub image: AssetRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct AchievementDraft {
    #[validate(length(min = 1, max = 128, message = "Department must be 1-128 characters"))]
    pub department: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    pub description: Option<String>,
    pub achieved_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Validate)]
pub struct AchievementPatch {
    #[validate(length(min = 1, max = 128, message = "Department must be 1-128 characters"))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    pub description: Option<String>,
    pub achieved_on: Option<NaiveDate>,
}

impl Document for Achievement {
    const COLLECTION: &'static str = "achievements";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for Achievement {
    type Draft = AchievementDraft;
    type Patch = AchievementPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "achievement",
        required_fields: &["department", "title"],
        slots: &[
            AssetSlot::required("pdf", AssetKind::Document),
            AssetSlot::required("image", AssetKind::Image),
        ],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        validated(AchievementDraft {
            department: fields.required("department")?,
            title: fields.required("title")?,
            description: fields.text("description"),
            achieved_on: fields.parse("achieved_on")?,
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("achievements", &[&draft.department])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            department: draft.department,
            title: draft.title,
            description: draft.description,
            achieved_on: draft.achieved_on,
            pdf: assets.require("pdf")?,
            image: assets.require("image")?,
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(AchievementPatch {
            department: fields.text("department"),
            title: fields.text("title"),
            description: fields.text("description"),
            achieved_on: fields.parse("achieved_on")?,
        })
    }

    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(achieved_on) = patch.achieved_on {
            self.achieved_on = Some(achieved_on);
        }
        if let Some(pdf) = assets.take("pdf") {
            self.pdf = pdf;
        }
        if let Some(image) = assets.take("image") {
            self.image = image;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("achievements", &[&self.department])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        vec![&self.pdf, &self.image]
    }
}
