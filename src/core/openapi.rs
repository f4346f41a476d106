use utoipa::{Modify, OpenApi};

use crate::features::achievements::Achievement;
use crate::features::albums::{Album, Photo};
use crate::features::assets::AssetRef;
use crate::features::faculty::Faculty;
use crate::features::programmes::Programme;
use crate::features::quick_access::QuickAccessItem;
use crate::features::study_materials::models::{MaterialSource, StudyMaterial};
use crate::features::syllabi::Syllabus;
use crate::features::testimonials::Testimonial;
use crate::modules::storage::AssetKind;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(
            // Shared
            Meta,
            AssetRef,
            AssetKind,
            // Records
            Programme,
            Faculty,
            Album,
            Photo,
            Achievement,
            Syllabus,
            StudyMaterial,
            MaterialSource,
            Testimonial,
            QuickAccessItem,
            // Envelopes
            ApiResponse<Programme>,
            ApiResponse<Vec<Programme>>,
            ApiResponse<Faculty>,
            ApiResponse<Vec<Faculty>>,
            ApiResponse<Album>,
            ApiResponse<Vec<Album>>,
            ApiResponse<Photo>,
            ApiResponse<Achievement>,
            ApiResponse<Vec<Achievement>>,
            ApiResponse<Syllabus>,
            ApiResponse<Vec<Syllabus>>,
            ApiResponse<StudyMaterial>,
            ApiResponse<Vec<StudyMaterial>>,
            ApiResponse<Testimonial>,
            ApiResponse<Vec<Testimonial>>,
            ApiResponse<QuickAccessItem>,
            ApiResponse<Vec<QuickAccessItem>>,
        )
    ),
    tags(
        (name = "programmes", description = "Academic programmes"),
        (name = "faculty", description = "Faculty profiles with optional photo"),
        (name = "albums", description = "Gallery albums and their photos"),
        (name = "achievements", description = "Departmental achievements (PDF + image)"),
        (name = "syllabi", description = "Semester syllabus PDFs"),
        (name = "study-materials", description = "Uploaded or linked study material"),
        (name = "testimonials", description = "Testimonials with optional photo"),
        (name = "quick-access", description = "Quick-access downloads"),
    ),
    info(
        title = "Campus CMS API",
        version = "0.1.0",
        description = "Content management API for the institutional website",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_schemas_are_registered() {
        let mut openapi = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Test CMS".to_string(),
            version: "9.9.9".to_string(),
            description: "test".to_string(),
        }
        .modify(&mut openapi);

        let schemas = &openapi.components.as_ref().unwrap().schemas;
        for name in ["Album", "Photo", "StudyMaterial", "MaterialSource", "AssetRef"] {
            assert!(schemas.contains_key(name), "missing schema {}", name);
        }
        assert_eq!(openapi.info.title, "Test CMS");
    }
}
