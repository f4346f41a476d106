//! Declarative asset shape of each entity kind
//!
//! The coordinator reads an entity's `EntityDescriptor` to validate a request
//! before any side effect; the `AssetEntity` hooks turn validated input and
//! uploaded assets into records.

use std::collections::BTreeMap;

use crate::core::error::{AppError, Result};
use crate::features::assets::models::AssetRef;
use crate::modules::records::{Collection, Document};
use crate::modules::staging::UploadIntake;
use crate::modules::storage::AssetKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSlot {
    /// Form field carrying the file, also the key in `AssetSet`
    pub name: &'static str,
    pub kind: AssetKind,
    pub required: bool,
}

impl AssetSlot {
    pub const fn required(name: &'static str, kind: AssetKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: AssetKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub entity: &'static str,
    pub required_fields: &'static [&'static str],
    pub slots: &'static [AssetSlot],
}

impl EntityDescriptor {
    pub fn slot(&self, name: &str) -> Option<&AssetSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Required fields and required files are present; no unknown files
    pub fn validate_create(&self, intake: &UploadIntake) -> Result<()> {
        check_requirements(self.required_fields, self.slots, intake)
    }

    /// Only known files are attached
    pub fn validate_files(&self, intake: &UploadIntake) -> Result<()> {
        check_requirements(&[], self.slots, intake)
    }
}

/// Shape of one element of a collection-owning entity
#[derive(Debug, Clone, Copy)]
pub struct ElementDescriptor {
    pub required_fields: &'static [&'static str],
    pub slot: AssetSlot,
}

impl ElementDescriptor {
    pub fn validate(&self, intake: &UploadIntake) -> Result<()> {
        check_requirements(
            self.required_fields,
            std::slice::from_ref(&self.slot),
            intake,
        )
    }
}

fn check_requirements(
    required_fields: &[&str],
    slots: &[AssetSlot],
    intake: &UploadIntake,
) -> Result<()> {
    let mut problems = Vec::new();

    let missing_fields: Vec<&str> = required_fields
        .iter()
        .copied()
        .filter(|f| !intake.fields.contains(f))
        .collect();
    if !missing_fields.is_empty() {
        problems.push(format!(
            "missing required field(s): {}",
            missing_fields.join(", ")
        ));
    }

    let missing_files: Vec<&str> = slots
        .iter()
        .filter(|s| s.required && !intake.has_file(s.name))
        .map(|s| s.name)
        .collect();
    if !missing_files.is_empty() {
        problems.push(format!(
            "missing required file(s): {}",
            missing_files.join(", ")
        ));
    }

    let unknown_files: Vec<&str> = intake
        .file_names()
        .filter(|name| !slots.iter().any(|s| s.name == *name))
        .collect();
    if !unknown_files.is_empty() {
        problems.push(format!("unexpected file(s): {}", unknown_files.join(", ")));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

/// Assets uploaded during one request, keyed by slot name
#[derive(Debug, Default)]
pub struct AssetSet(BTreeMap<&'static str, AssetRef>);

impl AssetSet {
    pub fn insert(&mut self, slot: &'static str, asset: AssetRef) {
        self.0.insert(slot, asset);
    }

    pub fn take(&mut self, slot: &str) -> Option<AssetRef> {
        self.0.remove(slot)
    }

    pub fn require(&mut self, slot: &str) -> Result<AssetRef> {
        self.take(slot)
            .ok_or_else(|| AppError::Validation(format!("File '{}' is required", slot)))
    }

    pub fn refs(&self) -> Vec<AssetRef> {
        self.0.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Entity-specific configuration consumed by the asset coordinator
pub trait AssetEntity: Document {
    /// Validated input for a new record
    type Draft: Send;
    /// Validated field changes for an existing record
    type Patch: Default + Send;

    const DESCRIPTOR: EntityDescriptor;

    fn parse_draft(intake: &UploadIntake) -> Result<Self::Draft>;

    /// Folder new assets of this draft are uploaded to
    fn draft_folder(draft: &Self::Draft) -> String;

    fn assemble(draft: Self::Draft, assets: AssetSet) -> Result<Self>;

    fn parse_patch(intake: &UploadIntake) -> Result<Self::Patch>;

    /// Apply field changes and put newly uploaded assets in their slots
    fn apply(&mut self, patch: Self::Patch, assets: AssetSet) -> Result<()>;

    fn folder(&self) -> String;

    /// Every asset this record owns, including those of embedded elements
    fn owned_assets(&self) -> Vec<&AssetRef>;
}

/// Entity owning an ordered collection of asset-carrying elements
pub trait ElementOwner: AssetEntity + Collection {
    type ElementDraft: Send;

    const ELEMENT: ElementDescriptor;

    fn parse_element(intake: &UploadIntake) -> Result<Self::ElementDraft>;

    fn assemble_element(draft: Self::ElementDraft, asset: AssetRef) -> Self::Element;

    fn element_asset(element: &Self::Element) -> &AssetRef;

    fn element_folder(&self) -> String;
}
