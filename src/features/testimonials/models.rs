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
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    /// Batch, designation or company of the author
    pub role: Option<String>,
    pub message: String,
    pub rating: Option<u8>,
    pub display_order: i32,
    pub photo: Option<AssetRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct TestimonialDraft {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub role: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    pub display_order: i32,
}

#[derive(Debug, Default, Validate)]
pub struct TestimonialPatch {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub role: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    pub display_order: Option<i32>,
}

impl Document for Testimonial {
    const COLLECTION: &'static str = "testimonials";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl AssetEntity for Testimonial {
    type Draft = TestimonialDraft;
    type Patch = TestimonialPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "testimonial",
        required_fields: &["name", "message"],
        slots: &[AssetSlot::optional("photo", AssetKind::Image)],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        validated(TestimonialDraft {
            name: fields.required("name")?,
            role: fields.text("role"),
            message: fields.required("message")?,
            rating: fields.parse("rating")?,
            display_order: fields.parse("display_order")?.unwrap_or(0),
        })
    }

    // Testimonials are not grouped by department
    fn draft_folder(_draft: &Self::Draft) -> String {
        folder_path("testimonials", &[])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name,
            role: draft.role,
            message: draft.message,
            rating: draft.rating,
            display_order: draft.display_order,
            photo: assets.take("photo"),
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(TestimonialPatch {
            name: fields.text("name"),
            role: fields.text("role"),
            message: fields.text("message"),
            rating: fields.parse("rating")?,
            display_order: fields.parse("display_order")?,
        })
    }

    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if patch.role.is_some() {
            self.role = patch.role;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if patch.rating.is_some() {
            self.rating = patch.rating;
        }
        if let Some(display_order) = patch.display_order {
            self.display_order = display_order;
        }
        if let Some(photo) = assets.take("photo") {
            self.photo = Some(photo);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("testimonials", &[])
    }

    fn owned_assets(&self) -> Vec<&AssetRef> {
        self.photo.iter().collect()
    }
}
