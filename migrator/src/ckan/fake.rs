//! In-memory [`CatalogApi`] for unit tests.

use std::cell::{Cell, RefCell};

use super::CatalogApi;
use crate::error::{CkanError, CkanResult};
use crate::models::{
    CatalogEntity, CreatedPackage, CreatedResource, EntityKind, License, PackagePayload,
    ResourceUpload,
};

#[derive(Default)]
pub struct FakeCatalog {
    pub organizations: RefCell<Vec<CatalogEntity>>,
    pub groups: RefCell<Vec<CatalogEntity>>,
    pub licenses: Vec<License>,
    /// Every call as `action:detail`, in order.
    pub calls: RefCell<Vec<String>>,
    pub packages: RefCell<Vec<PackagePayload>>,
    /// Fail any call whose `action:detail` equals this.
    pub fail_on: Option<String>,
    pub next_id: Cell<u32>,
}

impl FakeCatalog {
    pub fn with_organizations(titles: &[&str]) -> Self {
        let fake = Self::default();
        for title in titles {
            let entity = fake.entity(title);
            fake.organizations.borrow_mut().push(entity);
        }
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn entity(&self, title: &str) -> CatalogEntity {
        CatalogEntity {
            id: self.next_id("ent"),
            name: crate::transform::slug::slugify(title),
            title: title.to_string(),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        format!("{prefix}-{id}")
    }

    fn record(&self, action: &str, detail: &str) -> CkanResult<()> {
        let call = format!("{action}:{detail}");
        self.calls.borrow_mut().push(call.clone());
        if self.fail_on.as_deref() == Some(call.as_str()) {
            return Err(CkanError::ActionFailed {
                action: action.to_string(),
                message: "Validation Error: name: already exists".into(),
            });
        }
        Ok(())
    }

    fn store(&self, kind: EntityKind) -> &RefCell<Vec<CatalogEntity>> {
        match kind {
            EntityKind::Organization => &self.organizations,
            EntityKind::Group => &self.groups,
        }
    }
}

impl CatalogApi for FakeCatalog {
    async fn list_entities(&self, kind: EntityKind) -> CkanResult<Vec<CatalogEntity>> {
        self.record(&format!("{}_list", kind.as_str()), "")?;
        Ok(self.store(kind).borrow().clone())
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        name: &str,
        title: &str,
    ) -> CkanResult<CatalogEntity> {
        self.record(&format!("{}_create", kind.as_str()), name)?;
        let entity = CatalogEntity {
            id: self.next_id(kind.as_str()),
            name: name.to_string(),
            title: title.to_string(),
        };
        self.store(kind).borrow_mut().push(entity.clone());
        Ok(entity)
    }

    async fn list_licenses(&self) -> CkanResult<Vec<License>> {
        self.record("license_list", "")?;
        Ok(self.licenses.clone())
    }

    async fn create_package(&self, package: &PackagePayload) -> CkanResult<CreatedPackage> {
        self.record("package_create", &package.name)?;
        self.packages.borrow_mut().push(package.clone());
        Ok(CreatedPackage {
            id: self.next_id("pkg"),
            name: package.name.clone(),
        })
    }

    async fn create_resource(
        &self,
        package_id: &str,
        resource: &ResourceUpload,
    ) -> CkanResult<CreatedResource> {
        self.record("resource_create", &format!("{package_id}/{}", resource.name))?;
        Ok(CreatedResource {
            id: self.next_id("res"),
            url: String::new(),
        })
    }
}
