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

/// Downloadable item linked from the site's quick-access panel
/// (circulars, forms, timetables).
///
/// The file's storage id is persisted with it and used verbatim on delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuickAccessItem {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub display_order: i32,
    pub file: AssetRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct QuickAccessDraft {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(max = 64))]
    pub category: String,
    pub display_order: i32,
}

#[derive(Debug, Default, Validate)]
pub struct QuickAccessPatch {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 64))]
    pub category: Option<String>,
    pub display_order: Option<i32>,
}

impl Document for QuickAccessItem {
    const COLLECTION: &'static str = "quick_access";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for QuickAccessItem {
    type Draft = QuickAccessDraft;
    type Patch = QuickAccessPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "quick-access",
        required_fields: &["title"],
        slots: &[AssetSlot::required("file", AssetKind::Auto)],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        validated(QuickAccessDraft {
            title: fields.required("title")?,
            category: fields
                .text("category")
                .unwrap_or_else(|| "general".to_string()),
            display_order: fields.parse("display_order")?.unwrap_or(0),
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("quick_access", &[&draft.category])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: draft.title,
            category: draft.category,
            display_order: draft.display_order,
            file: assets.require("file")?,
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(QuickAccessPatch {
            title: fields.text("title"),
            category: fields.text("category"),
            display_order: fields.parse("display_order")?,
        })
    }

    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(display_order) = patch.display_order {
            self.display_order = display_order;
        }
        if let Some(file) = assets.take("file") {
            self.file = file;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("quick_access", &[&self.category])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        vec![&self.file]
    }
}
