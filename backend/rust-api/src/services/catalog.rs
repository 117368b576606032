use crate::models::Module;
use crate::repository::{RepoResult, Repository};

/// Ordered snapshot of every module, as the quiz generator sees it.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: Vec<Module>,
}

impl ModuleCatalog {
    /// `modules` must already be in catalog order.
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    pub async fn load(repo: &dyn Repository) -> RepoResult<Self> {
        Ok(Self::new(repo.list_modules().await?))
    }

    pub fn position(&self, module_id: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.id == module_id)
    }

    pub fn get(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    /// The other modules, starting right after `index` and wrapping around.
    pub fn successors(&self, index: usize) -> impl Iterator<Item = &Module> + '_ {
        let n = self.modules.len();
        (1..n).map(move |step| &self.modules[(index + step) % n])
    }
}
