//! Bridge organization/group titles in the source to target references.
//!
//! The source names organizations and groups by human-readable title; the
//! target wants ids. The reconciler keeps one title -> entity map per kind,
//! seeded from the target's listing and refreshed in place after every
//! create, so a title shared by many datasets is created exactly once.

use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::ckan::CatalogApi;
use crate::error::{BuildError, BuildResult, CkanResult};
use crate::logs::{log_info_indent, log_success};
use crate::models::{CatalogEntity, DatasetRecord, EntityKind, GroupRef, PackagePayload};

use super::catalog::Catalog;
use super::slug::slugify;

/// Title -> entity lookup for one entity kind.
#[derive(Debug, Clone)]
pub struct EntityIndex {
    kind: EntityKind,
    by_title: HashMap<String, CatalogEntity>,
}

impl EntityIndex {
    pub fn new(kind: EntityKind, entities: impl IntoIterator<Item = CatalogEntity>) -> Self {
        let mut index = Self {
            kind,
            by_title: HashMap::new(),
        };
        for entity in entities {
            index.insert(entity);
        }
        index
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Register an entity under its title (its name when the title is blank).
    pub fn insert(&mut self, entity: CatalogEntity) {
        let key = title_key(&entity);
        self.by_title.insert(key, entity);
    }

    pub fn get(&self, title: &str) -> Option<&CatalogEntity> {
        self.by_title.get(title.trim())
    }

    pub fn contains(&self, title: &str) -> bool {
        self.get(title).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    /// Referenced titles not present in the index, sorted and deduplicated.
    pub fn missing_titles<'t>(&self, referenced: impl IntoIterator<Item = &'t str>) -> BTreeSet<String> {
        referenced
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !self.contains(t))
            .map(String::from)
            .collect()
    }
}

fn title_key(entity: &CatalogEntity) -> String {
    let title = entity.title.trim();
    if title.is_empty() {
        entity.name.clone()
    } else {
        title.to_string()
    }
}

/// Organization and group lookups for one run.
#[derive(Debug, Clone)]
pub struct Reconciler {
    organizations: EntityIndex,
    groups: EntityIndex,
}

impl Reconciler {
    pub fn new(
        organizations: impl IntoIterator<Item = CatalogEntity>,
        groups: impl IntoIterator<Item = CatalogEntity>,
    ) -> Self {
        Self {
            organizations: EntityIndex::new(EntityKind::Organization, organizations),
            groups: EntityIndex::new(EntityKind::Group, groups),
        }
    }

    /// Seed the lookups from the target's current organizations and groups.
    pub async fn from_api<A: CatalogApi>(api: &A) -> CkanResult<Self> {
        let organizations = api.list_entities(EntityKind::Organization).await?;
        let groups = api.list_entities(EntityKind::Group).await?;
        Ok(Self::new(organizations, groups))
    }

    pub fn index(&self, kind: EntityKind) -> &EntityIndex {
        match kind {
            EntityKind::Organization => &self.organizations,
            EntityKind::Group => &self.groups,
        }
    }

    fn index_mut(&mut self, kind: EntityKind) -> &mut EntityIndex {
        match kind {
            EntityKind::Organization => &mut self.organizations,
            EntityKind::Group => &mut self.groups,
        }
    }

    /// Titles of `kind` referenced by the catalog but unknown to the target.
    pub fn missing(&self, kind: EntityKind, catalog: &Catalog) -> BTreeSet<String> {
        let referenced = catalog.iter().filter_map(|d| referenced_title(d, kind));
        self.index(kind).missing_titles(referenced)
    }

    /// Create every missing organization and group, registering each one.
    ///
    /// The first failed create aborts; entities created before it stay.
    pub async fn create_missing<A: CatalogApi>(
        &mut self,
        api: &A,
        catalog: &Catalog,
    ) -> CkanResult<Vec<CatalogEntity>> {
        let mut created = Vec::new();

        for kind in [EntityKind::Organization, EntityKind::Group] {
            for title in self.missing(kind, catalog) {
                // an earlier create in this loop may already cover it
                if self.index(kind).contains(&title) {
                    continue;
                }
                let name = entity_name(kind, &title);
                log_info_indent(format!("Creating {} '{}' ({})", kind.as_str(), title, name), 1);

                let mut entity = api.create_entity(kind, &name, &title).await?;
                if entity.title.trim().is_empty() {
                    entity.title = title.clone();
                }
                self.index_mut(kind).insert(entity.clone());
                created.push(entity);
            }
        }

        if !created.is_empty() {
            log_success(format!("Created {} organization(s)/group(s)", created.len()));
        }
        Ok(created)
    }

    /// Register missing titles locally without touching the target.
    ///
    /// The pending entity uses its slug name as id; CKAN accepts names
    /// wherever it accepts ids for organizations and groups.
    pub fn register_pending(&mut self, catalog: &Catalog) -> Vec<CatalogEntity> {
        let mut pending = Vec::new();

        for kind in [EntityKind::Organization, EntityKind::Group] {
            for title in self.missing(kind, catalog) {
                let name = entity_name(kind, &title);
                let entity = CatalogEntity {
                    id: name.clone(),
                    name,
                    title,
                };
                self.index_mut(kind).insert(entity.clone());
                pending.push(entity);
            }
        }

        pending
    }

    /// Resolve a dataset's titles into a `package_create` payload.
    ///
    /// `owner_org` and `groups` stay absent when the dataset named none.
    pub fn attach(&self, dataset: &DatasetRecord) -> BuildResult<PackagePayload> {
        let owner_org = match dataset.organization_title.as_deref() {
            Some(title) => Some(self.resolve(dataset, EntityKind::Organization, title)?.id.clone()),
            None => None,
        };
        let groups = match dataset.group_title.as_deref() {
            Some(title) => vec![GroupRef {
                id: self.resolve(dataset, EntityKind::Group, title)?.id.clone(),
            }],
            None => Vec::new(),
        };

        Ok(PackagePayload {
            name: dataset.name.clone(),
            title: dataset.title.clone(),
            tags: dataset.tags.clone(),
            license_id: dataset.license_id.clone(),
            owner_org,
            groups,
            private: dataset.private,
            notes: dataset.notes.clone(),
            maintainer: dataset.maintainer.clone(),
            maintainer_email: dataset.maintainer_email.clone(),
            url: dataset.url.clone(),
        })
    }

    /// Attach every dataset of the catalog, in catalog order.
    pub fn attach_all(&self, catalog: &Catalog) -> BuildResult<Vec<PackagePayload>> {
        catalog.iter().map(|d| self.attach(d)).collect()
    }

    fn resolve(
        &self,
        dataset: &DatasetRecord,
        kind: EntityKind,
        title: &str,
    ) -> BuildResult<&CatalogEntity> {
        self.index(kind)
            .get(title)
            .ok_or_else(|| BuildError::UnresolvedReference {
                dataset: dataset.id.clone(),
                kind: kind.as_str(),
                title: title.to_string(),
            })
    }
}

/// Target name for a new entity: the title's slug, or `{kind}-{uuid v5 of
/// the title}` when the title has nothing sluggable (non-Latin scripts).
pub fn entity_name(kind: EntityKind, title: &str) -> String {
    let slug = slugify(title);
    if !slug.is_empty() {
        return slug;
    }
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, title.trim().as_bytes());
    format!("{}-{}", kind.as_str(), id.simple())
}

fn referenced_title(dataset: &DatasetRecord, kind: EntityKind) -> Option<&str> {
    match kind {
        EntityKind::Organization => dataset.organization_title.as_deref(),
        EntityKind::Group => dataset.group_title.as_deref(),
    }
}
