use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::Result;
use crate::features::assets::{
    AssetEntity, AssetRef, AssetSet, AssetSlot, ElementDescriptor, ElementOwner, EntityDescriptor,
};
use crate::modules::records::{Collection, Document};
use crate::modules::staging::UploadIntake;
use crate::modules::storage::{folder_path, AssetKind};
use crate::shared::validation::validated;

/// Gallery album. The `photos` array is the only record of which photos
/// exist; a photo's image is deleted together with its entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Album {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub cover: Option<AssetRef>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Photo {
    pub id: Uuid,
    pub caption: Option<String>,
    pub image: AssetRef,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
pub struct AlbumDraft {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 128))]
    pub category: String,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Validate)]
pub struct AlbumPatch {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub category: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
}

#[derive(Debug, Validate)]
pub struct PhotoDraft {
    #[validate(length(max = 500, message = "Caption must not exceed 500 characters"))]
    pub caption: Option<String>,
}

impl Document for Album {
    const COLLECTION: &'static str = "albums";
    const ELEMENT_ARRAY: Option<&'static str> = Some(<Self as Collection>::ELEMENTS_FIELD);

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Collection for Album {
    type Element = Photo;

    const ELEMENTS_FIELD: &'static str = "photos";

    fn element_id(element: &Photo) -> Uuid {
        element.id
    }

    fn elements(&self) -> &[Photo] {
        &self.photos
    }

    fn elements_mut(&mut self) -> &mut Vec<Photo> {
        &mut self.photos
    }
}

impl AssetEntity for Album {
    type Draft = AlbumDraft;
    type Patch = AlbumPatch;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        entity: "album",
        required_fields: &["title", "category"],
        slots: &[AssetSlot::optional("cover", AssetKind::Image)],
    };

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft> {
        let fields = &intake.fields;
        validated(AlbumDraft {
            title: fields.required("title")?,
            category: fields.required("category")?,
            description: fields.text("description"),
            event_date: fields.parse("event_date")?,
        })
    }

    fn draft_folder(draft: &Self::Draft) -> String {
        folder_path("gallery", &[&draft.category])
    }

    fn assemble(draft: Self::Draft, mut assets: AssetSet) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: draft.title,
            category: draft.category,
            description: draft.description,
            event_date: draft.event_date,
            cover: assets.take("cover"),
            photos: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch> {
        let fields = &intake.fields;
        validated(AlbumPatch {
            title: fields.text("title"),
            category: fields.text("category"),
            description: fields.text("description"),
            event_date: fields.parse("event_date")?,
        })
    }

    fn apply(&mut self, patch: Self::Patch, mut assets: AssetSet) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.event_date.is_some() {
            self.event_date = patch.event_date;
        }
        if let Some(cover) = assets.take("cover") {
            self.cover = Some(cover);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn folder(&self) -> String {
        folder_path("gallery", &[&self.category])
    }

    /// Cover plus every photo image
    fn owned_assets(&self) -> Vec<&AssetRef> {
        self.cover
            .iter()
            .chain(self.photos.iter().map(|p| &p.image))
            .collect()
    }
}

impl ElementOwner for Album {
    type ElementDraft = PhotoDraft;

    const ELEMENT: ElementDescriptor = ElementDescriptor {
        required_fields: &[],
        slot: AssetSlot::required("image", AssetKind::Image),
    };

    fn parse_element(intake: &UploadIntake) -> Result<PhotoDraft> {
        validated(PhotoDraft {
            caption: intake.fields.text("caption"),
        })
    }

    fn assemble_element(draft: PhotoDraft, image: AssetRef) -> Photo {
        Photo {
            id: Uuid::new_v4(),
            caption: draft.caption,
            image,
            uploaded_at: Utc::now(),
        }
    }

    fn element_asset(element: &Photo) -> &AssetRef {
        &element.image
    }

    fn element_folder(&self) -> String {
        folder_path("gallery", &[&self.category, &self.title])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> AssetRef {
        AssetRef {
            storage_id: id.to_string(),
            url: format!("http://blobs.test/campus/{}", id),
            kind: AssetKind::Image,
        }
    }

    fn album() -> Album {
        let draft = AlbumDraft {
            title: "Sports Day 2024".to_string(),
            category: "Events".to_string(),
            description: None,
            event_date: None,
        };
        Album::assemble(draft, AssetSet::default()).unwrap()
    }

    #[test]
    fn test_owned_assets_cover_the_subtree() {
        let mut album = album();
        album.cover = Some(asset("gallery/events/cover.jpg"));
        album.photos.push(Album::assemble_element(
            PhotoDraft { caption: None },
            asset("gallery/events/sports_day_2024/a.jpg"),
        ));
        album.photos.push(Album::assemble_element(
            PhotoDraft {
                caption: Some("Relay".to_string()),
            },
            asset("gallery/events/sports_day_2024/b.jpg"),
        ));

        let ids: Vec<&str> = album
            .owned_assets()
            .into_iter()
            .map(|a| a.storage_id.as_str())
            .collect();

        assert_eq!(
            ids,
            vec![
                "gallery/events/cover.jpg",
                "gallery/events/sports_day_2024/a.jpg",
                "gallery/events/sports_day_2024/b.jpg",
            ]
        );
    }

    #[test]
    fn test_photo_folder_nests_under_album() {
        let album = album();
        assert_eq!(album.folder(), "gallery/events");
        assert_eq!(album.element_folder(), "gallery/events/sports_day_2024");
    }

    #[test]
    fn test_find_element() {
        let mut album = album();
        let photo = Album::assemble_element(PhotoDraft { caption: None }, asset("x.jpg"));
        let id = photo.id;
        album.elements_mut().push(photo);

        assert!(album.find_element(id).is_some());
        assert!(album.find_element(Uuid::new_v4()).is_none());
    }
}
