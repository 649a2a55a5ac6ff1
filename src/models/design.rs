//! Design objects held by the service-layer repositories
//!
//! Templates, slots, sites, content types, searches and display formats are
//! keyed by numeric GUID and versioned for optimistic locking. They travel in
//! archives as service-generated XML produced with quick-xml's serde support.

use crate::error::{DeployError, DeployResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Common behaviour of repository-backed design objects
pub trait DesignObject: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Root element name used in service-generated XML
    const ROOT: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
    fn name(&self) -> &str;
    fn version(&self) -> Option<i32>;
    fn set_version(&mut self, version: Option<i32>);
}

macro_rules! design_object {
    ($ty:ident, $root:literal) => {
        impl DesignObject for $ty {
            const ROOT: &'static str = $root;

            fn id(&self) -> u64 {
                self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = id;
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn version(&self) -> Option<i32> {
                self.version
            }

            fn set_version(&mut self, version: Option<i32>) {
                self.version = version;
            }
        }
    };
}

fn default_true() -> bool {
    true
}

/// Assembly template (or legacy variant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default)]
    pub is_variant: bool,
    /// Slots contained by the template
    #[serde(rename = "slotId", default)]
    pub slot_ids: Vec<u64>,
    /// Global template wrapping the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_template_id: Option<u64>,
}

impl Template {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            is_variant: false,
            slot_ids: Vec::new(),
            global_template_id: None,
        }
    }
}

design_object!(Template, "Template");

/// Allowed content type/template pair of a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssociation {
    pub content_type_id: u64,
    pub template_id: u64,
}

/// Template slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(rename = "association", default)]
    pub associations: Vec<SlotAssociation>,
}

impl Slot {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            associations: Vec::new(),
        }
    }
}

design_object!(Slot, "Slot");

/// Publishing site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    /// Root folder path of the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_root: Option<String>,
    #[serde(rename = "templateId", default)]
    pub template_ids: Vec<u64>,
    /// Publishing contexts
    #[serde(rename = "contextId", default)]
    pub context_ids: Vec<u64>,
}

impl Site {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            folder_root: None,
            template_ids: Vec::new(),
            context_ids: Vec::new(),
        }
    }
}

design_object!(Site, "Site");

/// Content type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentType {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    /// Name of the content editor application
    pub editor_app: String,
    /// Backing table, when the type stores local fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workflow_id: Option<u64>,
    /// Inclusionary ("allowed") workflows
    #[serde(rename = "workflowId", default)]
    pub workflow_ids: Vec<u64>,
    #[serde(rename = "sharedGroup", default)]
    pub shared_groups: Vec<String>,
    /// Icon, only when explicitly specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_id: Option<u64>,
    #[serde(rename = "templateId", default)]
    pub template_ids: Vec<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ContentType {
    pub fn new(id: u64, name: impl Into<String>, editor_app: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            editor_app: editor_app.into(),
            table_name: None,
            default_workflow_id: None,
            workflow_ids: Vec::new(),
            shared_groups: Vec::new(),
            icon_path: None,
            acl_id: None,
            template_ids: Vec::new(),
            enabled: true,
        }
    }
}

design_object!(ContentType, "ContentType");

/// Saved search or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Search {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_format_id: Option<u64>,
    /// Name of the display format on the source, used to match on the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_format_name: Option<String>,
    #[serde(rename = "communityId", default)]
    pub community_ids: Vec<u64>,
}

impl Search {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            is_view: false,
            display_format_id: None,
            display_format_name: None,
            community_ids: Vec::new(),
        }
    }
}

design_object!(Search, "Search");

/// Display format used by searches, views and folders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFormat {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(rename = "communityId", default)]
    pub community_ids: Vec<u64>,
}

impl DisplayFormat {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            community_ids: Vec::new(),
        }
    }
}

design_object!(DisplayFormat, "DisplayFormat");

/// Serialize a design object to service-generated XML
pub fn to_xml<T: DesignObject>(object: &T) -> DeployResult<String> {
    quick_xml::se::to_string_with_root(T::ROOT, object).map_err(|e| {
        DeployError::Unexpected(format!("Failed to serialize {}: {}", T::ROOT, e))
    })
}

/// Parse service-generated XML into a fresh design object
pub fn from_xml<T: DesignObject>(xml: &str) -> DeployResult<T> {
    quick_xml::de::from_str(xml)
        .map_err(|e| DeployError::Unexpected(format!("Failed to parse {}: {}", T::ROOT, e)))
}

/// Rehydrate an object from XML onto an existing instance, or a fresh one
///
/// The existing object's id and version survive the refresh so the save that
/// follows does not trip the repository's optimistic lock. A fresh object
/// starts without a version.
pub fn rehydrate<T: DesignObject>(existing: Option<T>, xml: &str) -> DeployResult<T> {
    let incoming: T = from_xml(xml)?;
    match existing {
        Some(current) => {
            let mut refreshed = incoming;
            refreshed.set_id(current.id());
            refreshed.set_version(current.version());
            Ok(refreshed)
        }
        None => {
            let mut fresh = incoming;
            fresh.set_version(None);
            Ok(fresh)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_xml_round_trip() {
        let mut template = Template::new(501, "rffSnTitleLink");
        template.slot_ids = vec![301, 302];
        template.global_template_id = Some(505);
        template.version = Some(3);

        let xml = to_xml(&template).unwrap();
        assert!(xml.starts_with("<Template>"));
        let parsed: Template = from_xml(&xml).unwrap();
        assert_eq!(parsed, template);
    }

    #[test]
    fn rehydrate_keeps_existing_version_and_id() {
        let mut incoming = Slot::new(301, "rffRelated");
        incoming.version = Some(9);
        incoming.associations.push(SlotAssociation {
            content_type_id: 311,
            template_id: 501,
        });
        let xml = to_xml(&incoming).unwrap();

        let mut existing = Slot::new(1301, "rffRelated");
        existing.version = Some(2);

        let refreshed = rehydrate(Some(existing), &xml).unwrap();
        assert_eq!(refreshed.id, 1301);
        assert_eq!(refreshed.version, Some(2));
        assert_eq!(refreshed.associations.len(), 1);

        let fresh: Slot = rehydrate(None, &xml).unwrap();
        assert_eq!(fresh.version, None);
        assert_eq!(fresh.id, 301);
    }
}
